use crate::converter::{dirent_offset, inode_num_to_addr_range, Image};
use crate::error::ImageError;
use crate::types::*;
use byteorder::{ByteOrder, LittleEndian};

pub fn decode_inode(
    img: &Image,
    table_base: usize,
    inode_num: u32,
    layout: &Layout,
) -> Result<Inode, ImageError> {
    let start = inode_num_to_addr_range(inode_num as usize, table_base, layout).start;
    let mut addrs = Vec::with_capacity(layout.n_direct + 1);
    for i in 0..=layout.n_direct {
        addrs.push(img.read_u32(start + 12 + 4 * i)?);
    }
    Ok(Inode {
        r#type: img.read_u16(start)?,
        major: img.read_u16(start + 2)?,
        minor: img.read_u16(start + 4)?,
        nlink: img.read_u16(start + 6)?,
        size: img.read_u32(start + 8)?,
        addrs,
    })
}

/// Serializes an inode into one `inode_size` record. Missing address slots
/// are written as zero.
pub fn encode_inode(inode: &Inode, layout: &Layout) -> Vec<u8> {
    let mut buf = vec![0; layout.inode_size];
    LittleEndian::write_u16(&mut buf[0..2], inode.r#type);
    LittleEndian::write_u16(&mut buf[2..4], inode.major);
    LittleEndian::write_u16(&mut buf[4..6], inode.minor);
    LittleEndian::write_u16(&mut buf[6..8], inode.nlink);
    LittleEndian::write_u32(&mut buf[8..12], inode.size);
    for (i, addr) in inode.addrs.iter().take(layout.n_direct + 1).enumerate() {
        let at = 12 + 4 * i;
        LittleEndian::write_u32(&mut buf[at..at + 4], *addr);
    }
    buf
}

// for indirect reference
pub fn decode_indirect_block(
    img: &Image,
    block_base: usize,
    layout: &Layout,
) -> Result<IndirectBlock, ImageError> {
    let raw = img.read_bytes(block_base, layout.block_size)?;
    let mut addrs = vec![0; layout.addrs_per_block()];
    LittleEndian::read_u32_into(&raw[..4 * addrs.len()], &mut addrs);
    Ok(IndirectBlock { addrs })
}

pub fn encode_indirect_block(block: &IndirectBlock, layout: &Layout) -> Vec<u8> {
    let mut buf = vec![0; layout.block_size];
    let n = block.addrs.len().min(layout.addrs_per_block());
    LittleEndian::write_u32_into(&block.addrs[..n], &mut buf[..4 * n]);
    buf
}

pub fn decode_dir_entry(
    img: &Image,
    block_base: usize,
    entry_num: usize,
    layout: &Layout,
) -> Result<DirEntry, ImageError> {
    let start = dirent_offset(block_base, entry_num, layout);
    Ok(DirEntry {
        inum: img.read_u16(start)?,
        name: img.read_bytes(start + 2, layout.dir_name_len)?.to_vec(),
    })
}

/// Names longer than the field are cut; shorter ones are zero padded.
pub fn encode_dir_entry(entry: &DirEntry, layout: &Layout) -> Vec<u8> {
    let mut buf = vec![0; layout.dirent_size()];
    LittleEndian::write_u16(&mut buf[0..2], entry.inum);
    let n = entry.name.len().min(layout.dir_name_len);
    buf[2..2 + n].copy_from_slice(&entry.name[..n]);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_inode(layout: &Layout) -> Inode {
        let mut inode = Inode::empty(layout);
        inode.r#type = T_FILE;
        inode.major = 0x0102;
        inode.minor = 7;
        inode.nlink = 2;
        inode.size = 70_000;
        for (i, addr) in inode.addrs.iter_mut().enumerate() {
            *addr = 100 + i as u32;
        }
        inode
    }

    #[test]
    fn can_encode_and_decode_inodes() {
        let layout = Layout::default();
        let inode = sample_inode(&layout);
        let mut table = vec![0; layout.inode_size * 4];
        table[layout.inode_size * 3..].copy_from_slice(&encode_inode(&inode, &layout));

        let decoded = decode_inode(&Image::new(&table), 0, 3, &layout).unwrap();

        assert_eq!(decoded, inode);
        assert_eq!(decoded.direct_addrs().len(), 12);
        assert_eq!(decoded.indirect_addr(), 112);
    }

    #[test]
    fn inode_fields_sit_at_fixed_offsets() {
        let layout = Layout::default();
        let raw = encode_inode(&sample_inode(&layout), &layout);
        assert_eq!(&raw[0..2], &[2, 0]);
        assert_eq!(&raw[2..4], &[0x02, 0x01]);
        assert_eq!(&raw[8..12], &[0x70, 0x11, 0x01, 0x00]);
        assert_eq!(&raw[12..16], &[100, 0, 0, 0]);
        assert_eq!(&raw[60..64], &[112, 0, 0, 0]);
    }

    #[test]
    fn inode_beyond_buffer_is_malformed() {
        let layout = Layout::default();
        let table = vec![0; layout.inode_size * 2];
        assert!(decode_inode(&Image::new(&table), 0, 1, &layout).is_ok());
        assert!(matches!(
            decode_inode(&Image::new(&table), 0, 2, &layout),
            Err(ImageError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn can_encode_and_decode_indirect_blocks() {
        let layout = Layout::default();
        let block = IndirectBlock {
            addrs: (0..layout.addrs_per_block() as u32).map(|i| i * 3).collect(),
        };
        let mut buf = vec![0xff; layout.block_size];
        buf.extend(encode_indirect_block(&block, &layout));

        let decoded = decode_indirect_block(&Image::new(&buf), layout.block_size, &layout).unwrap();

        assert_eq!(decoded, block);
    }

    #[test]
    fn partial_indirect_block_is_malformed() {
        let layout = Layout::default();
        let buf = vec![0; layout.block_size + 100];
        assert!(decode_indirect_block(&Image::new(&buf), layout.block_size, &layout).is_err());
    }

    #[test]
    fn can_encode_and_decode_dir_entries() {
        let layout = Layout::default();
        let entry = DirEntry {
            inum: 513,
            name: b"README\0\0\0\0\0\0\0\0".to_vec(),
        };
        let mut block = vec![0; layout.block_size];
        block[32..48].copy_from_slice(&encode_dir_entry(&entry, &layout));

        let decoded = decode_dir_entry(&Image::new(&block), 0, 2, &layout).unwrap();

        assert_eq!(decoded, entry);
        assert!(decoded.name_is("README"));
        assert_eq!(&block[32..34], &[1, 2]);
    }

    #[test]
    fn dir_entry_past_end_is_malformed() {
        let layout = Layout::default();
        let block = vec![0; 40];
        assert!(decode_dir_entry(&Image::new(&block), 0, 1, &layout).is_ok());
        assert!(decode_dir_entry(&Image::new(&block), 0, 2, &layout).is_err());
    }
}
