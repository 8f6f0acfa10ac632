//! The ordered consistency rules.
//!
//! Rules run one after another; each walks inode slots `1..inode_count` in
//! ascending order and, within an inode, its direct addresses before the
//! entries of its indirect block. The first failure ends the check.

use crate::error::{AddressKind, CheckError, ImageError, Violation};
use crate::index::{BlockUsageMap, InodeRefMap, RefMode};
use crate::types::*;
use crate::utils::FsView;
use log::{debug, info};

pub type RuleResult = Result<(), CheckError>;

/// Checks the image in `bytes` against `layout`. Returns `Ok(())` when every
/// rule holds.
pub fn check_image(bytes: &[u8], layout: Layout) -> RuleResult {
    let fs = FsView::open(bytes, layout)?;
    Checker::new(fs)?.run()
}

pub struct Checker<'a> {
    fs: FsView<'a>,
    /// Decoded once; index is the inode number.
    inodes: Vec<Inode>,
}

impl<'a> Checker<'a> {
    pub fn new(fs: FsView<'a>) -> Result<Self, ImageError> {
        let inodes = fs.inode_table()?;
        Ok(Self { fs, inodes })
    }

    pub fn run(&self) -> RuleResult {
        info!(
            "checking image: {} blocks, {} inodes, data blocks {:?}",
            self.fs.layout.total_blocks,
            self.fs.layout.inode_count,
            self.fs.data_blocks()
        );
        let rules: [(&str, fn(&Self) -> RuleResult); 11] = [
            ("inode types", Self::check_inode_types),
            ("address ranges", Self::check_addresses),
            ("root directory", Self::check_root),
            ("directory format", Self::check_dir_format),
            ("used blocks in bitmap", Self::check_used_blocks_marked),
            ("bitmap blocks in use", Self::check_marked_blocks_used),
            ("direct address reuse", Self::check_direct_reuse),
            ("indirect address reuse", Self::check_indirect_reuse),
            ("inodes referenced", Self::check_inodes_referenced),
            ("references allocated", Self::check_references_allocated),
            ("file link counts", Self::check_link_counts),
        ];
        for (n, (name, rule)) in rules.iter().enumerate() {
            if let Err(e) = rule(self) {
                debug!("rule {} ({}) failed: {:?}", n + 1, name, e);
                return Err(e);
            }
            debug!("rule {} ({}) passed", n + 1, name);
        }
        info!("image is consistent");
        Ok(())
    }

    fn slots(&self) -> impl Iterator<Item = (u32, &Inode)> {
        self.inodes
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, inode)| (i as u32, inode))
    }

    fn allocated(&self) -> impl Iterator<Item = (u32, &Inode)> {
        self.slots().filter(|(_, inode)| inode.is_allocated())
    }

    fn check_inode_types(&self) -> RuleResult {
        for (inum, inode) in self.slots() {
            if inode.is_allocated() && inode.kind().is_none() {
                return Err(Violation::BadInode {
                    inum,
                    raw_type: inode.r#type,
                }
                .into());
            }
        }
        Ok(())
    }

    fn check_addresses(&self) -> RuleResult {
        for (inum, inode) in self.allocated() {
            let bad = |block, kind| Violation::BadAddress { inum, block, kind };
            for &addr in inode.direct_addrs() {
                if addr != 0 && !self.fs.is_data_block(addr) {
                    return Err(bad(addr, AddressKind::Direct).into());
                }
            }
            let indirect = inode.indirect_addr();
            if indirect == 0 {
                continue;
            }
            if !self.fs.is_data_block(indirect) {
                return Err(bad(indirect, AddressKind::Indirect).into());
            }
            for addr in self.fs.indirect_addrs(inode)? {
                if addr != 0 && !self.fs.is_data_block(addr) {
                    return Err(bad(addr, AddressKind::Indirect).into());
                }
            }
        }
        Ok(())
    }

    fn check_root(&self) -> RuleResult {
        let root = &self.inodes[ROOT_INODE as usize];
        let first = root.direct_addrs()[0];
        if !root.is_dir() || first == 0 {
            return Err(Violation::RootDirectoryMissing.into());
        }
        let dot = self.fs.dir_entry(first, 0)?;
        let dotdot = self.fs.dir_entry(first, 1)?;
        let names_root = |e: &DirEntry, name: &str| e.name_is(name) && u32::from(e.inum) == ROOT_INODE;
        if !names_root(&dot, ".") || !names_root(&dotdot, "..") {
            return Err(Violation::RootDirectoryMissing.into());
        }
        Ok(())
    }

    fn check_dir_format(&self) -> RuleResult {
        for (inum, inode) in self.slots().filter(|(_, inode)| inode.is_dir()) {
            let first = inode.direct_addrs()[0];
            let not_formatted = Violation::DirectoryNotFormatted { inum };
            if first == 0 {
                return Err(not_formatted.into());
            }
            let dot = self.fs.dir_entry(first, 0)?;
            let dotdot = self.fs.dir_entry(first, 1)?;
            if !dot.name_is(".") || u32::from(dot.inum) != inum || !dotdot.name_is("..") {
                return Err(not_formatted.into());
            }
        }
        Ok(())
    }

    fn check_used_blocks_marked(&self) -> RuleResult {
        for (inum, inode) in self.allocated() {
            let indirect = inode.indirect_addr();
            let mut addrs: Vec<u32> = inode.addrs.clone();
            if indirect != 0 {
                addrs.extend(self.fs.indirect_addrs(inode)?);
            }
            for addr in addrs.into_iter().filter(|&a| a != 0) {
                if !self.fs.block_in_use(addr)? {
                    return Err(Violation::UsedBlockMarkedFree { inum, block: addr }.into());
                }
            }
        }
        Ok(())
    }

    fn check_marked_blocks_used(&self) -> RuleResult {
        let usage = BlockUsageMap::build(&self.fs, &self.inodes)?;
        for block in self.fs.data_blocks() {
            if self.fs.block_in_use(block)? && !usage.is_used(block) {
                return Err(Violation::FreeBlockMarkedUsed { block }.into());
            }
        }
        Ok(())
    }

    /// Direct slots and indirect block entries are both data addresses; each
    /// may appear once across the image.
    fn check_direct_reuse(&self) -> RuleResult {
        let mut seen = BlockUsageMap::new(self.fs.layout.total_blocks);
        for (inum, inode) in self.allocated() {
            for addr in self.fs.data_addrs(inode)? {
                if seen.is_used(addr) {
                    return Err(Violation::DirectAddressReused { inum, block: addr }.into());
                }
                seen.mark(addr)?;
            }
        }
        Ok(())
    }

    fn check_indirect_reuse(&self) -> RuleResult {
        let mut seen = BlockUsageMap::new(self.fs.layout.total_blocks);
        for (inum, inode) in self.allocated() {
            let addr = inode.indirect_addr();
            if addr == 0 {
                continue;
            }
            if seen.is_used(addr) {
                return Err(Violation::IndirectAddressReused { inum, block: addr }.into());
            }
            seen.mark(addr)?;
        }
        Ok(())
    }

    fn check_inodes_referenced(&self) -> RuleResult {
        let refs = InodeRefMap::build(&self.fs, &self.inodes, RefMode::Set)?;
        for (inum, _) in self.allocated() {
            if !refs.is_referenced(inum) {
                return Err(Violation::InodeNotInDirectory { inum }.into());
            }
        }
        Ok(())
    }

    fn check_references_allocated(&self) -> RuleResult {
        let refs = InodeRefMap::build(&self.fs, &self.inodes, RefMode::Set)?;
        for inum in refs.referenced() {
            if !self.inodes[inum as usize].is_allocated() {
                return Err(Violation::InodeReferencedButFree { inum }.into());
            }
        }
        if let Some(inum) = refs.first_dangling() {
            return Err(Violation::InodeReferencedButFree { inum }.into());
        }
        Ok(())
    }

    fn check_link_counts(&self) -> RuleResult {
        let counts = InodeRefMap::build(&self.fs, &self.inodes, RefMode::Increment)?;
        for (inum, inode) in self.slots() {
            if inode.kind() != Some(InodeType::File) {
                continue;
            }
            let refs = counts.count(inum);
            if u32::from(inode.nlink) != refs {
                return Err(Violation::BadFileLinkCount {
                    inum,
                    nlink: inode.nlink,
                    refs,
                }
                .into());
            }
        }
        Ok(())
    }
}
