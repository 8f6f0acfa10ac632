use crate::converter::Image;
use crate::error::ImageError;
use crate::types::{Superblock, SUPERBLOCK_SIZE};
use byteorder::{ByteOrder, LittleEndian};

/// Reads the seven geometry fields, 4 bytes each, starting at `offset`.
pub fn decode_superblock(img: &Image, offset: usize) -> Result<Superblock, ImageError> {
    let field = |i: usize| img.read_u32(offset + 4 * i);
    Ok(Superblock {
        size: field(0)?,
        nblocks: field(1)?,
        ninodes: field(2)?,
        nlog: field(3)?,
        logstart: field(4)?,
        inodestart: field(5)?,
        bmapstart: field(6)?,
    })
}

pub fn encode_superblock(sb: &Superblock) -> [u8; SUPERBLOCK_SIZE] {
    let mut buf = [0; SUPERBLOCK_SIZE];
    let fields = [
        sb.size,
        sb.nblocks,
        sb.ninodes,
        sb.nlog,
        sb.logstart,
        sb.inodestart,
        sb.bmapstart,
    ];
    LittleEndian::write_u32_into(&fields, &mut buf);
    buf
}
