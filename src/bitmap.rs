//! Conversion between `RT_BITMAP` resource data and bitmap files.
//!
//! Bitmap resources hold a device-independent bitmap without the 14-byte file header of a `.bmp` file.
//! The only part of that header which is not constant is the offset of the pixel data, which depends on the size of the color table.
//! See <https://learn.microsoft.com/en-us/windows/win32/gdi/bitmap-storage> for more information.

use std::borrow::Cow;

use log::{debug, trace};
use zerocopy::IntoBytes;

use crate::{constants::*, types::*, util::*};

/// Reconstruct a bitmap file from a device-independent bitmap.
///
/// # Returns
/// Returns the data unchanged if its header can not be read, describes an unsupported bit depth, or places the pixel data past the end of the file.
pub fn dib_to_bmp(dib: &[u8]) -> Cow<'_, [u8]> {
    let header = match read::<BitmapInfoHeader>(dib) {
        Ok(header) if header.size >= BITMAP_INFO_HEADER_SIZE => header,
        _ => {
            debug!("no bitmap info header, keeping {} bytes unchanged", dib.len());
            return Cow::Borrowed(dib);
        }
    };
    trace!("{:#x?}", header);

    let mut bits_offset = BITMAP_FILE_HEADER_SIZE as u64 + header.size as u64;
    // BI_BITFIELDS masks and clr_used on 16, 24 and 32 bpp bitmaps don't add to the offset in practice
    if header.compression != BI_PNG && header.compression != BI_JPEG {
        let colors = match header.bit_count {
            1 | 4 | 8 if header.clr_used == 0 => 1u64 << header.bit_count,
            1 | 4 | 8 | 16 | 24 | 32 => header.clr_used as u64,
            bit_count => {
                debug!("unsupported bit count {}, keeping bitmap unchanged", bit_count);
                return Cow::Borrowed(dib);
            }
        };
        bits_offset += colors * 4;
    }

    let file_size = (BITMAP_FILE_HEADER_SIZE + dib.len()) as u64;
    if bits_offset > file_size {
        debug!(
            "bitmap data offset {:#x?} outside file of size {:#x?}, keeping bitmap unchanged",
            bits_offset, file_size
        );
        return Cow::Borrowed(dib);
    }

    let file_header = BitmapFileHeader::new(file_size as u32, bits_offset as u32);
    let mut bmp = Vec::with_capacity(file_size as usize);
    bmp.extend_from_slice(file_header.as_bytes());
    bmp.extend_from_slice(dib);
    Cow::Owned(bmp)
}

/// Strip the file header of a bitmap file.
///
/// # Returns
/// Returns the data unchanged unless it starts with a bitmap file header whose size matches the data length.
pub fn bmp_to_dib(bmp: &[u8]) -> &[u8] {
    if bmp.len() > BITMAP_FILE_HEADER_SIZE {
        if let Ok(header) = read::<BitmapFileHeader>(bmp) {
            if header.magic == BITMAP_FILE_MAGIC && header.size as usize == bmp.len() {
                return &bmp[BITMAP_FILE_HEADER_SIZE..];
            }
        }
    }
    bmp
}
