use crate::converter::Image;
use crate::error::ImageError;

/// Reads the in-use bit of `block_num` from the free map starting at
/// `bitmap_base`. Bit `n % 8` of byte `n / 8`, least significant first.
pub fn is_block_in_use(img: &Image, bitmap_base: usize, block_num: u32) -> Result<bool, ImageError> {
    let byte = img.read_bytes(bitmap_base + block_num as usize / 8, 1)?[0];
    Ok((byte >> (block_num % 8)) & 1 == 1)
}

/// Sets or clears the bit of `block_num` in a free map region.
pub fn set_block_bit(bitmap: &mut [u8], block_num: u32, in_use: bool) {
    let byte = &mut bitmap[block_num as usize / 8];
    let mask = 1u8 << (block_num % 8);
    if in_use {
        *byte |= mask;
    } else {
        *byte &= !mask;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_read_and_write_values_to_bitmap() {
        let mut bmp = vec![0u8; 16];
        set_block_bit(&mut bmp, 2, true);
        set_block_bit(&mut bmp, 15, true);

        let img = Image::new(&bmp);
        assert!(!is_block_in_use(&img, 0, 0).unwrap());
        assert!(is_block_in_use(&img, 0, 2).unwrap());
        assert!(is_block_in_use(&img, 0, 15).unwrap());
        assert_eq!(bmp[0], 0b0000_0100);
        assert_eq!(bmp[1], 0b1000_0000);
    }

    #[test]
    fn can_toggle_block_between_free_and_used() {
        let mut bmp = vec![0xffu8; 2];
        set_block_bit(&mut bmp, 10, false);
        assert!(!is_block_in_use(&Image::new(&bmp), 0, 10).unwrap());
        assert!(is_block_in_use(&Image::new(&bmp), 0, 11).unwrap());
        set_block_bit(&mut bmp, 10, true);
        assert!(is_block_in_use(&Image::new(&bmp), 0, 10).unwrap());
    }

    #[test]
    fn bitmap_base_offsets_the_lookup() {
        let bmp = [0u8, 0, 0b0000_0001];
        assert!(is_block_in_use(&Image::new(&bmp), 2, 0).unwrap());
        assert!(!is_block_in_use(&Image::new(&bmp), 1, 0).unwrap());
    }

    #[test]
    fn lookup_past_the_image_is_malformed() {
        let bmp = [0u8; 4];
        assert!(is_block_in_use(&Image::new(&bmp), 0, 31).is_ok());
        assert!(is_block_in_use(&Image::new(&bmp), 0, 32).is_err());
    }
}
