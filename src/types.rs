use crate::error::ImageError;

// dinode.type
pub const T_FREE: u16 = 0;
pub const T_DIR: u16 = 1;
pub const T_FILE: u16 = 2;
pub const T_DEV: u16 = 3;

pub const ROOT_INODE: u32 = 1; // inode number of root directory("/")
pub const SUPERBLOCK_BLOCK: usize = 1; // block 0 is the boot block
pub const SUPERBLOCK_SIZE: usize = 7 * 4;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InodeType {
    Dir,
    File,
    Device,
}

impl InodeType {
    /// `None` for a free slot and for any value outside the known types.
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            T_DIR => Some(InodeType::Dir),
            T_FILE => Some(InodeType::File),
            T_DEV => Some(InodeType::Device),
            _ => None,
        }
    }
}

impl std::fmt::Display for InodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use InodeType::*;
        match self {
            Dir => write!(f, "directory"),
            File => write!(f, "file"),
            Device => write!(f, "device file"),
        }
    }
}

/// Geometry of the image being checked. Everything the decoders need to
/// locate a record lives here so synthetic images of any size can be used.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Size of file system image (blocks)
    pub total_blocks: u32,
    /// Number of inode slots, slot 0 included
    pub inode_count: u32,
    pub block_size: usize,
    /// Number of blocks in the free map region
    pub bitmap_blocks: usize,
    /// Direct addresses per inode; one indirect address follows them
    pub n_direct: usize,
    /// Width of the name field of a directory entry
    pub dir_name_len: usize,
    /// On-disk size of one inode record
    pub inode_size: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            total_blocks: 1000,
            inode_count: 200,
            block_size: 512,
            bitmap_blocks: 1,
            n_direct: 12,
            dir_name_len: 14,
            inode_size: 64,
        }
    }
}

impl Layout {
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.block_size == 0 || self.block_size % 4 != 0 {
            return Err(ImageError::InvalidLayout(
                "block size must be a non-zero multiple of 4",
            ));
        }
        if self.total_blocks == 0 || self.inode_count <= ROOT_INODE {
            return Err(ImageError::InvalidLayout(
                "image needs blocks and an inode table holding the root",
            ));
        }
        if self.n_direct == 0 || self.dir_name_len == 0 {
            return Err(ImageError::InvalidLayout(
                "direct address count and name length must be non-zero",
            ));
        }
        if self.inode_size < self.min_inode_size() {
            return Err(ImageError::InvalidLayout(
                "inode record too small for its address list",
            ));
        }
        if self.inode_size > self.block_size {
            return Err(ImageError::InvalidLayout(
                "inode record does not fit in a block",
            ));
        }
        if self.dirent_size() > self.block_size {
            return Err(ImageError::InvalidLayout(
                "directory entry does not fit in a block",
            ));
        }
        if self.bitmap_blocks * self.block_size * 8 < self.total_blocks as usize {
            return Err(ImageError::InvalidLayout(
                "bitmap region cannot cover every block",
            ));
        }
        Ok(())
    }

    /// type, major, minor, nlink (2 bytes each), size, then the addresses.
    pub fn min_inode_size(&self) -> usize {
        4 * 2 + 4 + 4 * (self.n_direct + 1)
    }

    pub fn dirent_size(&self) -> usize {
        2 + self.dir_name_len
    }

    pub fn dirents_per_block(&self) -> usize {
        self.block_size / self.dirent_size()
    }

    pub fn addrs_per_block(&self) -> usize {
        self.block_size / 4
    }

    pub fn inodes_per_block(&self) -> usize {
        self.block_size / self.inode_size
    }

    pub fn superblock_offset(&self) -> usize {
        SUPERBLOCK_BLOCK * self.block_size
    }
}

// Super Block
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Superblock {
    pub size: u32,       // Size of file system image (blocks)
    pub nblocks: u32,    // Number of data blocks
    pub ninodes: u32,    // Number of inodes.
    pub nlog: u32,       // Number of log blocks
    pub logstart: u32,   // Block number of first log block
    pub inodestart: u32, // Block number of first inode block
    pub bmapstart: u32,  // Block number of first free map block
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
    pub r#type: u16,      // file type
    pub major: u16,       // device id
    pub minor: u16,       // device id
    pub nlink: u16,       // number of links
    pub size: u32,        // file size
    pub addrs: Vec<u32>,  // n_direct data block references, then the indirect one
}

impl Inode {
    pub fn empty(layout: &Layout) -> Self {
        Self {
            r#type: T_FREE,
            major: 0,
            minor: 0,
            nlink: 0,
            size: 0,
            addrs: vec![0; layout.n_direct + 1],
        }
    }

    pub fn kind(&self) -> Option<InodeType> {
        InodeType::from_raw(self.r#type)
    }

    pub fn is_allocated(&self) -> bool {
        self.r#type != T_FREE
    }

    pub fn is_dir(&self) -> bool {
        self.r#type == T_DIR
    }

    pub fn direct_addrs(&self) -> &[u32] {
        &self.addrs[..self.addrs.len() - 1]
    }

    pub fn indirect_addr(&self) -> u32 {
        self.addrs[self.addrs.len() - 1]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectBlock {
    pub addrs: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub inum: u16,
    pub name: Vec<u8>,
}

impl DirEntry {
    /// Compares the fixed-width name field against `literal`. Bytes after the
    /// first NUL inside the field are ignored; nothing past the field is read.
    pub fn name_is(&self, literal: &str) -> bool {
        self.name_bytes() == literal.as_bytes()
    }

    pub fn name_bytes(&self) -> &[u8] {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or_else(|| self.name.len());
        &self.name[..end]
    }
}
