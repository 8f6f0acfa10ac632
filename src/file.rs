use memmap::{Mmap, MmapOptions};
use std::fs::{metadata, File, OpenOptions};
use std::io;
use std::path::Path;

pub fn get_file_size<P: AsRef<Path>>(path: P) -> io::Result<usize> {
    Ok(metadata(path)?.len() as usize)
}

pub fn open_readable_file<P: AsRef<Path>>(path: P) -> io::Result<File> {
    OpenOptions::new().read(true).open(path)
}

/// Maps the first `len` bytes of `file` read-only.
pub fn get_memory_mapped_file(file: &File, len: usize) -> io::Result<Mmap> {
    unsafe { MmapOptions::new().len(len).map(file) }
}
