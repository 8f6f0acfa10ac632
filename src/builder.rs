//! Assembles well-formed images the way xv6's mkfs lays them out:
//!
//! ```text
//! | boot | super | log ... | inodes ... | bitmap ... | data ... |
//! ```
//!
//! Tests start from a consistent image and then damage it with the raw
//! editing helpers.

use crate::block::bitmap::set_block_bit;
use crate::block::inode::{decode_inode, encode_dir_entry, encode_indirect_block, encode_inode};
use crate::block::sblock::encode_superblock;
use crate::converter::{block_num_to_addr_range, inode_num_to_addr_range, Image};
use crate::error::BuildError;
use crate::types::*;
use byteorder::{ByteOrder, LittleEndian};
use log::trace;
use std::convert::TryFrom;

/// Log size used by xv6's mkfs.
pub const LOGSIZE: u32 = 30;

pub struct ImageBuilder {
    layout: Layout,
    sblock: Superblock,
    bytes: Vec<u8>,
    next_inum: u32,
    next_block: u32,
}

impl ImageBuilder {
    pub fn new(layout: Layout) -> Result<Self, BuildError> {
        Self::with_log(layout, LOGSIZE)
    }

    /// Formats an empty image with `nlog` log blocks and creates the root
    /// directory in inode 1.
    pub fn with_log(layout: Layout, nlog: u32) -> Result<Self, BuildError> {
        layout.validate()?;
        let inode_blocks = layout.inode_count / layout.inodes_per_block() as u32 + 1;
        let nmeta = 2 + nlog + inode_blocks + layout.bitmap_blocks as u32;
        if nmeta >= layout.total_blocks {
            return Err(BuildError::TooSmall {
                meta_blocks: nmeta,
                total_blocks: layout.total_blocks,
            });
        }
        let sblock = Superblock {
            size: layout.total_blocks,
            nblocks: layout.total_blocks - nmeta,
            ninodes: layout.inode_count,
            nlog,
            logstart: 2,
            inodestart: 2 + nlog,
            bmapstart: 2 + nlog + inode_blocks,
        };
        let mut builder = Self {
            layout,
            sblock,
            bytes: vec![0; layout.total_blocks as usize * layout.block_size],
            next_inum: ROOT_INODE,
            next_block: nmeta,
        };
        let sb_at = layout.superblock_offset();
        builder.bytes[sb_at..sb_at + SUPERBLOCK_SIZE].copy_from_slice(&encode_superblock(&sblock));
        for block in 0..nmeta {
            builder.set_bitmap_bit(block, true);
        }

        let root = builder.alloc_inode(T_DIR)?;
        builder.append_entry(root, ".", root)?;
        builder.append_entry(root, "..", root)?;
        Ok(builder)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn superblock(&self) -> &Superblock {
        &self.sblock
    }

    pub fn add_file(&mut self, parent: u32, name: &str, data: &[u8]) -> Result<u32, BuildError> {
        let inum = self.alloc_inode(T_FILE)?;
        self.append(inum, data)?;
        self.append_entry(parent, name, inum)?;
        Ok(inum)
    }

    pub fn add_dir(&mut self, parent: u32, name: &str) -> Result<u32, BuildError> {
        let inum = self.alloc_inode(T_DIR)?;
        self.append_entry(inum, ".", inum)?;
        self.append_entry(inum, "..", parent)?;
        self.append_entry(parent, name, inum)?;
        Ok(inum)
    }

    pub fn add_device(
        &mut self,
        parent: u32,
        name: &str,
        major: u16,
        minor: u16,
    ) -> Result<u32, BuildError> {
        let inum = self.alloc_inode(T_DEV)?;
        let mut inode = self.inode(inum);
        inode.major = major;
        inode.minor = minor;
        self.write_inode(inum, &inode);
        self.append_entry(parent, name, inum)?;
        Ok(inum)
    }

    /// Adds a hard link `name` in `dir` to `target`, bumping its link count.
    pub fn link(&mut self, dir: u32, name: &str, target: u32) -> Result<(), BuildError> {
        self.append_entry(dir, name, target)?;
        let mut inode = self.inode(target);
        inode.nlink += 1;
        self.write_inode(target, &inode);
        Ok(())
    }

    /// Takes the next data block and marks it in the bitmap.
    pub fn alloc_block(&mut self) -> Result<u32, BuildError> {
        if self.next_block >= self.layout.total_blocks {
            return Err(BuildError::NoFreeBlock);
        }
        let block = self.next_block;
        self.next_block += 1;
        self.set_bitmap_bit(block, true);
        Ok(block)
    }

    pub fn inode(&self, inum: u32) -> Inode {
        let table_base = self.sblock.inodestart as usize * self.layout.block_size;
        // Every slot lies inside the image built by `with_log`.
        decode_inode(&Image::new(&self.bytes), table_base, inum, &self.layout)
            .unwrap_or_else(|_| Inode::empty(&self.layout))
    }

    pub fn write_inode(&mut self, inum: u32, inode: &Inode) {
        let table_base = self.sblock.inodestart as usize * self.layout.block_size;
        let range = inode_num_to_addr_range(inum as usize, table_base, &self.layout);
        self.bytes[range].copy_from_slice(&encode_inode(inode, &self.layout));
    }

    pub fn set_bitmap_bit(&mut self, block: u32, in_use: bool) {
        let start = self.sblock.bmapstart as usize * self.layout.block_size;
        let end = start + self.layout.bitmap_blocks * self.layout.block_size;
        set_block_bit(&mut self.bytes[start..end], block, in_use);
    }

    pub fn write_dir_entry(&mut self, block: u32, index: usize, entry: &DirEntry) {
        let at = block_num_to_addr_range(block as usize, &self.layout).start
            + index * self.layout.dirent_size();
        let raw = encode_dir_entry(entry, &self.layout);
        self.bytes[at..at + raw.len()].copy_from_slice(&raw);
    }

    pub fn write_indirect_block(&mut self, block: u32, indirect: &IndirectBlock) {
        let range = block_num_to_addr_range(block as usize, &self.layout);
        self.bytes[range].copy_from_slice(&encode_indirect_block(indirect, &self.layout));
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }

    fn alloc_inode(&mut self, r#type: u16) -> Result<u32, BuildError> {
        if self.next_inum >= self.layout.inode_count {
            return Err(BuildError::NoFreeInode);
        }
        let inum = self.next_inum;
        self.next_inum += 1;
        let mut inode = Inode::empty(&self.layout);
        inode.r#type = r#type;
        inode.nlink = 1;
        self.write_inode(inum, &inode);
        trace!("allocated inode {} of type {}", inum, r#type);
        Ok(inum)
    }

    fn append_entry(&mut self, dir: u32, name: &str, inum: u32) -> Result<(), BuildError> {
        let entry = DirEntry {
            inum: u16::try_from(inum).map_err(|_| BuildError::InodeNotAddressable(inum))?,
            name: name.as_bytes().to_vec(),
        };
        self.append(dir, &encode_dir_entry(&entry, &self.layout))
    }

    /// Appends `data` to the end of the inode's content, allocating direct
    /// blocks first and then the indirect block and its entries.
    fn append(&mut self, inum: u32, mut data: &[u8]) -> Result<(), BuildError> {
        let bs = self.layout.block_size;
        let mut inode = self.inode(inum);
        while !data.is_empty() {
            let fbn = inode.size as usize / bs;
            let block = self.block_for(&mut inode, fbn)?;
            let off = inode.size as usize % bs;
            let n = data.len().min(bs - off);
            let at = block as usize * bs + off;
            self.bytes[at..at + n].copy_from_slice(&data[..n]);
            inode.size += n as u32;
            data = &data[n..];
        }
        self.write_inode(inum, &inode);
        Ok(())
    }

    fn block_for(&mut self, inode: &mut Inode, fbn: usize) -> Result<u32, BuildError> {
        let n_direct = self.layout.n_direct;
        if fbn < n_direct {
            if inode.addrs[fbn] == 0 {
                inode.addrs[fbn] = self.alloc_block()?;
            }
            return Ok(inode.addrs[fbn]);
        }
        let slot = fbn - n_direct;
        if slot >= self.layout.addrs_per_block() {
            return Err(BuildError::FileTooLarge);
        }
        if inode.addrs[n_direct] == 0 {
            inode.addrs[n_direct] = self.alloc_block()?;
        }
        let indirect_at = inode.addrs[n_direct] as usize * self.layout.block_size + 4 * slot;
        let mut block = LittleEndian::read_u32(&self.bytes[indirect_at..indirect_at + 4]);
        if block == 0 {
            block = self.alloc_block()?;
            LittleEndian::write_u32(&mut self.bytes[indirect_at..indirect_at + 4], block);
        }
        Ok(block)
    }
}
