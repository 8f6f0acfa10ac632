use crate::file::*;
use log::debug;
use memmap::Mmap;
use std::io;
use std::path::Path;

/// An opened image. Empty files cannot be mapped, so they are kept as an
/// empty buffer and left for the checker to reject.
pub enum ImageFile {
    Mapped(Mmap),
    Empty,
}

impl std::ops::Deref for ImageFile {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            ImageFile::Mapped(m) => &m[..],
            ImageFile::Empty => &[],
        }
    }
}

pub fn initialize<P: AsRef<Path>>(path: P) -> io::Result<ImageFile> {
    let path = path.as_ref();
    let len = get_file_size(path)?;
    let file = open_readable_file(path)?;
    debug!("mapping {} ({} bytes)", path.display(), len);
    if len == 0 {
        return Ok(ImageFile::Empty);
    }
    Ok(ImageFile::Mapped(get_memory_mapped_file(&file, len)?))
}
