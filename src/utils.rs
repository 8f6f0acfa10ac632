use crate::block::bitmap::is_block_in_use;
use crate::block::inode::{decode_dir_entry, decode_indirect_block, decode_inode};
use crate::block::sblock::decode_superblock;
use crate::converter::{block_offset, Image};
use crate::error::ImageError;
use crate::types::*;
use log::warn;
use std::ops::Range;

/// An image together with its geometry and decoded superblock.
#[derive(Debug, Copy, Clone)]
pub struct FsView<'a> {
    pub img: Image<'a>,
    pub layout: Layout,
    pub sblock: Superblock,
}

impl<'a> FsView<'a> {
    pub fn open(bytes: &'a [u8], layout: Layout) -> Result<Self, ImageError> {
        layout.validate()?;
        let img = Image::new(bytes);
        let sblock = decode_superblock(&img, layout.superblock_offset())?;
        if sblock.size != layout.total_blocks {
            warn!(
                "superblock reports {} blocks, checking with {}",
                sblock.size, layout.total_blocks
            );
        }
        if sblock.ninodes != layout.inode_count {
            warn!(
                "superblock reports {} inodes, checking with {}",
                sblock.ninodes, layout.inode_count
            );
        }
        let meta_end = sblock
            .bmapstart
            .saturating_add(layout.bitmap_blocks as u32);
        let available = layout.total_blocks.saturating_sub(meta_end);
        if sblock.nblocks > available {
            return Err(ImageError::DataRegionOverlapsMetadata {
                nblocks: sblock.nblocks,
                available,
            });
        }
        Ok(Self {
            img,
            layout,
            sblock,
        })
    }

    /// Block numbers a data block may legally have. `open` guarantees the
    /// range starts after the bitmap.
    pub fn data_blocks(&self) -> Range<u32> {
        self.layout.total_blocks - self.sblock.nblocks..self.layout.total_blocks
    }

    pub fn is_data_block(&self, block_num: u32) -> bool {
        self.data_blocks().contains(&block_num)
    }

    pub fn block_base(&self, block_num: u32) -> Result<usize, ImageError> {
        if block_num >= self.layout.total_blocks {
            return Err(ImageError::BlockOutOfRange {
                block: block_num,
                total_blocks: self.layout.total_blocks,
            });
        }
        block_offset(block_num, &self.layout)
    }

    pub fn block(&self, block_num: u32) -> Result<&'a [u8], ImageError> {
        let base = self.block_base(block_num)?;
        self.img.read_bytes(base, self.layout.block_size)
    }

    pub fn inode(&self, inode_num: u32) -> Result<Inode, ImageError> {
        if inode_num >= self.layout.inode_count {
            return Err(ImageError::InodeOutOfRange {
                inum: inode_num,
                inode_count: self.layout.inode_count,
            });
        }
        let table_base = block_offset(self.sblock.inodestart, &self.layout)?;
        decode_inode(&self.img, table_base, inode_num, &self.layout)
    }

    /// Decodes slots `0..inode_count`; slot 0 is kept so the table can be
    /// indexed by inode number.
    pub fn inode_table(&self) -> Result<Vec<Inode>, ImageError> {
        (0..self.layout.inode_count).map(|i| self.inode(i)).collect()
    }

    pub fn indirect_block(&self, block_num: u32) -> Result<IndirectBlock, ImageError> {
        decode_indirect_block(&self.img, self.block_base(block_num)?, &self.layout)
    }

    pub fn dir_entry(&self, block_num: u32, entry_num: usize) -> Result<DirEntry, ImageError> {
        decode_dir_entry(&self.img, self.block_base(block_num)?, entry_num, &self.layout)
    }

    /// Entries of one directory block, up to the first one naming inode 0.
    pub fn dir_entries(&self, block_num: u32) -> Result<Vec<DirEntry>, ImageError> {
        let mut entries = Vec::new();
        for i in 0..self.layout.dirents_per_block() {
            let entry = self.dir_entry(block_num, i)?;
            if entry.inum == 0 {
                break;
            }
            entries.push(entry);
        }
        Ok(entries)
    }

    pub fn block_in_use(&self, block_num: u32) -> Result<bool, ImageError> {
        self.block_base(block_num)?;
        let bitmap_base = block_offset(self.sblock.bmapstart, &self.layout)?;
        is_block_in_use(&self.img, bitmap_base, block_num)
    }

    /// Entries of the inode's indirect block, or nothing if it has none.
    pub fn indirect_addrs(&self, inode: &Inode) -> Result<Vec<u32>, ImageError> {
        match inode.indirect_addr() {
            0 => Ok(Vec::new()),
            block_num => Ok(self.indirect_block(block_num)?.addrs),
        }
    }

    /// Every non-zero data block address of the inode: direct slots in order,
    /// then the indirect block's entries in order. The indirect block itself
    /// is not included.
    pub fn data_addrs(&self, inode: &Inode) -> Result<Vec<u32>, ImageError> {
        let mut addrs: Vec<u32> = inode.direct_addrs().to_vec();
        addrs.extend(self.indirect_addrs(inode)?);
        addrs.retain(|&a| a != 0);
        Ok(addrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ImageBuilder;

    #[test]
    fn opens_a_formatted_image() {
        let img = ImageBuilder::new(Layout::default()).unwrap().build();
        let fs = FsView::open(&img, Layout::default()).unwrap();

        assert_eq!(fs.sblock.size, 1000);
        assert_eq!(fs.sblock.inodestart, 32);
        assert_eq!(fs.sblock.bmapstart, 58);
        assert_eq!(fs.data_blocks(), 59..1000);
        assert!(fs.inode(1).unwrap().is_dir());
    }

    #[test]
    fn root_directory_lists_dot_entries() {
        let img = ImageBuilder::new(Layout::default()).unwrap().build();
        let fs = FsView::open(&img, Layout::default()).unwrap();
        let root = fs.inode(ROOT_INODE).unwrap();

        let entries = fs.dir_entries(root.addrs[0]).unwrap();

        assert_eq!(entries.len(), 2);
        assert!(entries[0].name_is("."));
        assert!(entries[1].name_is(".."));
        assert!(fs.block_in_use(root.addrs[0]).unwrap());
    }

    #[test]
    fn data_addrs_include_indirect_entries() {
        let layout = Layout::default();
        let mut b = ImageBuilder::new(layout).unwrap();
        let inum = b.add_file(ROOT_INODE, "big", &vec![7u8; 14 * 512]).unwrap();
        let img = b.build();
        let fs = FsView::open(&img, layout).unwrap();
        let inode = fs.inode(inum).unwrap();

        let addrs = fs.data_addrs(&inode).unwrap();

        assert_eq!(addrs.len(), 14);
        assert_ne!(inode.indirect_addr(), 0);
        assert!(!addrs.contains(&inode.indirect_addr()));
    }

    #[test]
    fn lookups_outside_geometry_are_rejected() {
        let img = ImageBuilder::new(Layout::default()).unwrap().build();
        let fs = FsView::open(&img, Layout::default()).unwrap();

        assert!(matches!(
            fs.inode(200),
            Err(ImageError::InodeOutOfRange { inum: 200, .. })
        ));
        assert!(matches!(
            fs.block(1000),
            Err(ImageError::BlockOutOfRange { block: 1000, .. })
        ));
    }

    #[test]
    fn data_region_reaching_into_metadata_is_rejected() {
        let mut img = ImageBuilder::new(Layout::default()).unwrap().build();
        // superblock field 2 is nblocks
        img[512 + 4..512 + 8].copy_from_slice(&942u32.to_le_bytes());

        assert_eq!(
            FsView::open(&img, Layout::default()).unwrap_err(),
            ImageError::DataRegionOverlapsMetadata {
                nblocks: 942,
                available: 941
            }
        );
    }

    #[test]
    fn truncated_image_is_malformed() {
        let img = vec![0u8; 600];
        assert!(matches!(
            FsView::open(&img, Layout::default()),
            Err(ImageError::OutOfBounds { .. })
        ));
    }
}
