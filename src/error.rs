use thiserror::Error;

/// The image cannot be decoded: a read would leave the buffer, or a value
/// used as an index falls outside the configured geometry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("read of {len} bytes at offset {offset} exceeds image of {image_len} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        image_len: usize,
    },
    #[error("block {block} is outside the image of {total_blocks} blocks")]
    BlockOutOfRange { block: u32, total_blocks: u32 },
    #[error("inode {inum} is outside the inode table of {inode_count} slots")]
    InodeOutOfRange { inum: u32, inode_count: u32 },
    #[error("invalid layout: {0}")]
    InvalidLayout(&'static str),
    #[error("superblock claims {nblocks} data blocks but only {available} follow the bitmap")]
    DataRegionOverlapsMetadata { nblocks: u32, available: u32 },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AddressKind {
    Direct,
    Indirect,
}

impl std::fmt::Display for AddressKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressKind::Direct => write!(f, "direct"),
            AddressKind::Indirect => write!(f, "indirect"),
        }
    }
}

/// The first broken invariant found. `Display` gives the message reported to
/// the user; the fields carry the offending inode or block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("ERROR: bad inode.")]
    BadInode { inum: u32, raw_type: u16 },
    #[error("ERROR: bad {kind} address in inode.")]
    BadAddress {
        inum: u32,
        block: u32,
        kind: AddressKind,
    },
    #[error("ERROR: root directory does not exist.")]
    RootDirectoryMissing,
    #[error("ERROR: directory not properly formatted.")]
    DirectoryNotFormatted { inum: u32 },
    #[error("ERROR: address used by inode but marked free in bitmap.")]
    UsedBlockMarkedFree { inum: u32, block: u32 },
    #[error("ERROR: bitmap marks block in use but it is not in use.")]
    FreeBlockMarkedUsed { block: u32 },
    #[error("ERROR: direct address used more than once.")]
    DirectAddressReused { inum: u32, block: u32 },
    #[error("ERROR: indirect address used more than once.")]
    IndirectAddressReused { inum: u32, block: u32 },
    #[error("ERROR: inode marked use but not found in a directory.")]
    InodeNotInDirectory { inum: u32 },
    #[error("ERROR: inode referred to in directory but marked free.")]
    InodeReferencedButFree { inum: u32 },
    #[error("ERROR: bad reference count for file.")]
    BadFileLinkCount { inum: u32, nlink: u16, refs: u32 },
}

impl Violation {
    /// Number of the rule that failed, 1 through 11.
    pub fn rule(&self) -> u8 {
        use Violation::*;
        match self {
            BadInode { .. } => 1,
            BadAddress { .. } => 2,
            RootDirectoryMissing => 3,
            DirectoryNotFormatted { .. } => 4,
            UsedBlockMarkedFree { .. } => 5,
            FreeBlockMarkedUsed { .. } => 6,
            DirectAddressReused { .. } => 7,
            IndirectAddressReused { .. } => 8,
            InodeNotInDirectory { .. } => 9,
            InodeReferencedButFree { .. } => 10,
            BadFileLinkCount { .. } => 11,
        }
    }

    pub fn inum(&self) -> Option<u32> {
        use Violation::*;
        match *self {
            BadInode { inum, .. }
            | BadAddress { inum, .. }
            | DirectoryNotFormatted { inum }
            | UsedBlockMarkedFree { inum, .. }
            | DirectAddressReused { inum, .. }
            | IndirectAddressReused { inum, .. }
            | InodeNotInDirectory { inum }
            | InodeReferencedButFree { inum }
            | BadFileLinkCount { inum, .. } => Some(inum),
            RootDirectoryMissing | FreeBlockMarkedUsed { .. } => None,
        }
    }

    pub fn block(&self) -> Option<u32> {
        use Violation::*;
        match *self {
            BadAddress { block, .. }
            | UsedBlockMarkedFree { block, .. }
            | FreeBlockMarkedUsed { block }
            | DirectAddressReused { block, .. }
            | IndirectAddressReused { block, .. } => Some(block),
            _ => None,
        }
    }
}

/// Why a check did not report a consistent image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("{0}")]
    Violation(#[from] Violation),
    #[error("ERROR: malformed image: {0}")]
    Malformed(#[from] ImageError),
}

impl CheckError {
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            CheckError::Violation(v) => Some(v),
            CheckError::Malformed(_) => None,
        }
    }
}

/// Failures while assembling an image with `ImageBuilder`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("{meta_blocks} metadata blocks leave no data region in {total_blocks} blocks")]
    TooSmall { meta_blocks: u32, total_blocks: u32 },
    #[error("no free inode")]
    NoFreeInode,
    #[error("no free data block")]
    NoFreeBlock,
    #[error("file exceeds the direct and indirect address capacity")]
    FileTooLarge,
    #[error("inode {0} does not fit in a directory entry")]
    InodeNotAddressable(u32),
    #[error(transparent)]
    Layout(#[from] ImageError),
}

#[derive(Error, Debug)]
pub enum XcheckError {
    #[error("image not found")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Check(#[from] CheckError),
}

impl From<ImageError> for XcheckError {
    fn from(e: ImageError) -> Self {
        XcheckError::Check(CheckError::Malformed(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_reported_text() {
        let v = Violation::BadAddress {
            inum: 3,
            block: 9999,
            kind: AddressKind::Indirect,
        };
        assert_eq!(v.to_string(), "ERROR: bad indirect address in inode.");
        assert_eq!(v.rule(), 2);
        assert_eq!(v.inum(), Some(3));
        assert_eq!(v.block(), Some(9999));

        let v = Violation::BadFileLinkCount {
            inum: 4,
            nlink: 1,
            refs: 2,
        };
        assert_eq!(v.to_string(), "ERROR: bad reference count for file.");
        assert_eq!(v.rule(), 11);
        assert_eq!(v.block(), None);
    }

    #[test]
    fn check_error_wraps_both_classes() {
        let err: CheckError = Violation::RootDirectoryMissing.into();
        assert_eq!(err.to_string(), "ERROR: root directory does not exist.");
        assert_eq!(err.violation().map(Violation::rule), Some(3));

        let err: CheckError = ImageError::OutOfBounds {
            offset: 10,
            len: 4,
            image_len: 12,
        }
        .into();
        assert!(err.violation().is_none());
        assert_eq!(
            err.to_string(),
            "ERROR: malformed image: read of 4 bytes at offset 10 exceeds image of 12 bytes"
        );
    }
}
