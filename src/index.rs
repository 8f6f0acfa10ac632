//! Image-wide maps built from one pass over the inode table.

use crate::error::ImageError;
use crate::types::Inode;
use crate::utils::FsView;
use log::trace;

/// Which blocks are referenced by some allocated inode, indexed by block
/// number and bounded by the image's block count.
#[derive(Debug, Clone)]
pub struct BlockUsageMap {
    used: Vec<bool>,
}

impl BlockUsageMap {
    pub fn new(total_blocks: u32) -> Self {
        Self {
            used: vec![false; total_blocks as usize],
        }
    }

    /// Marks every non-zero direct address, the indirect block and every
    /// non-zero entry of the indirect block of each allocated inode.
    pub fn build(fs: &FsView, inodes: &[Inode]) -> Result<Self, ImageError> {
        let mut map = Self::new(fs.layout.total_blocks);
        for inode in inodes.iter().skip(1).filter(|i| i.is_allocated()) {
            for &addr in inode.direct_addrs().iter().filter(|&&a| a != 0) {
                map.mark(addr)?;
            }
            if inode.indirect_addr() != 0 {
                map.mark(inode.indirect_addr())?;
                for addr in fs.indirect_addrs(inode)?.into_iter().filter(|&a| a != 0) {
                    map.mark(addr)?;
                }
            }
        }
        Ok(map)
    }

    pub fn mark(&mut self, block_num: u32) -> Result<(), ImageError> {
        let total_blocks = self.used.len() as u32;
        match self.used.get_mut(block_num as usize) {
            Some(slot) => {
                *slot = true;
                Ok(())
            }
            None => Err(ImageError::BlockOutOfRange {
                block: block_num,
                total_blocks,
            }),
        }
    }

    pub fn is_used(&self, block_num: u32) -> bool {
        self.used.get(block_num as usize).copied().unwrap_or(false)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RefMode {
    /// Record only that an inode is named somewhere.
    Set,
    /// Count every entry naming an inode.
    Increment,
}

/// Directory references per inode number, bounded by the inode count.
/// Entries naming an inode past the table are kept aside in `dangling`.
#[derive(Debug, Clone)]
pub struct InodeRefMap {
    refs: Vec<u32>,
    dangling: Vec<u32>,
}

impl InodeRefMap {
    pub fn new(inode_count: u32) -> Self {
        Self {
            refs: vec![0; inode_count as usize],
            dangling: Vec::new(),
        }
    }

    /// Walks the data blocks of every directory inode, direct blocks first
    /// then those listed in the indirect block. Each block is read from its
    /// first entry up to the first entry naming inode 0.
    pub fn build(fs: &FsView, inodes: &[Inode], mode: RefMode) -> Result<Self, ImageError> {
        let mut map = Self::new(fs.layout.inode_count);
        for (dir_inum, inode) in inodes.iter().enumerate().skip(1) {
            if !inode.is_dir() {
                continue;
            }
            for block_num in fs.data_addrs(inode)? {
                for entry in fs.dir_entries(block_num)? {
                    trace!(
                        "dir {} block {} names inode {}",
                        dir_inum,
                        block_num,
                        entry.inum
                    );
                    map.record(u32::from(entry.inum), mode);
                }
            }
        }
        Ok(map)
    }

    pub fn record(&mut self, inode_num: u32, mode: RefMode) {
        match self.refs.get_mut(inode_num as usize) {
            Some(count) => match mode {
                RefMode::Set => *count = 1,
                RefMode::Increment => *count += 1,
            },
            None => self.dangling.push(inode_num),
        }
    }

    pub fn count(&self, inode_num: u32) -> u32 {
        self.refs.get(inode_num as usize).copied().unwrap_or(0)
    }

    pub fn is_referenced(&self, inode_num: u32) -> bool {
        self.count(inode_num) > 0
    }

    /// Referenced inode numbers inside the table, ascending, slot 0 excluded.
    pub fn referenced(&self) -> impl Iterator<Item = u32> + '_ {
        self.refs
            .iter()
            .enumerate()
            .skip(1)
            .filter(|&(_, &c)| c > 0)
            .map(|(i, _)| i as u32)
    }

    /// Smallest inode number named by a directory but outside the table.
    pub fn first_dangling(&self) -> Option<u32> {
        self.dangling.iter().copied().min()
    }
}
