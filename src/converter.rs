use crate::error::ImageError;
use crate::types::*;
use byteorder::{ByteOrder, LittleEndian};
use std::ops::Range;

/// Read-only view over the whole image. Every read is bounds-checked and
/// decoded little-endian whatever the host byte order is.
#[derive(Debug, Copy, Clone)]
pub struct Image<'a> {
    bytes: &'a [u8],
}

impl<'a> Image<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn read_bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], ImageError> {
        let out_of_bounds = ImageError::OutOfBounds {
            offset,
            len,
            image_len: self.bytes.len(),
        };
        let end = offset.checked_add(len).ok_or_else(|| out_of_bounds.clone())?;
        self.bytes.get(offset..end).ok_or(out_of_bounds)
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16, ImageError> {
        Ok(LittleEndian::read_u16(self.read_bytes(offset, 2)?))
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32, ImageError> {
        Ok(LittleEndian::read_u32(self.read_bytes(offset, 4)?))
    }
}

pub fn block_num_to_addr_range(block_num: usize, layout: &Layout) -> Range<usize> {
    layout.block_size * block_num..layout.block_size * (block_num + 1)
}

pub fn block_offset(block_num: u32, layout: &Layout) -> Result<usize, ImageError> {
    (block_num as usize)
        .checked_mul(layout.block_size)
        .ok_or(ImageError::BlockOutOfRange {
            block: block_num,
            total_blocks: layout.total_blocks,
        })
}

pub fn inode_num_to_addr_range(inode_num: usize, table_base: usize, layout: &Layout) -> Range<usize> {
    table_base + inode_num * layout.inode_size..table_base + (inode_num + 1) * layout.inode_size
}

pub fn dirent_offset(block_base: usize, entry_num: usize, layout: &Layout) -> usize {
    block_base + entry_num * layout.dirent_size()
}
