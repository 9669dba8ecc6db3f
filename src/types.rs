//! Resource data types.
//!
//! These types are a one-to-one mapping of the fixed-layout little-endian headers found in resource data and the file containers they are exported to.
//! See <https://learn.microsoft.com/en-us/windows/win32/menurc/resource-file-formats> for more information.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::constants::*;

#[repr(C, packed(2))]
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
    Default,
)]
pub struct VersionU16 {
    pub major: u16,
    pub minor: u16,
}
#[repr(C, packed(4))]
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
    Default,
)]
pub struct VersionU32 {
    pub major: u32,
    pub minor: u32,
}

/// Leading fields of a `BITMAPINFOHEADER`.
/// `biClrImportant` is not part of the prefix since it is never needed to locate the pixel data.
#[repr(C, packed(2))]
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
    Default,
)]
pub struct BitmapInfoHeader {
    pub size:             u32,
    pub width:            i32,
    pub height:           i32,
    pub planes:           u16,
    pub bit_count:        u16,
    pub compression:      u32,
    pub size_image:       u32,
    pub x_pels_per_meter: i32,
    pub y_pels_per_meter: i32,
    pub clr_used:         u32,
}

#[repr(C, packed(2))]
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
)]
pub struct BitmapFileHeader {
    pub magic:       [u8; 2],
    pub size:        u32,
    pub reserved:    u32,
    pub bits_offset: u32,
}
impl BitmapFileHeader {
    pub fn new(size: u32, bits_offset: u32) -> Self {
        Self {
            magic: BITMAP_FILE_MAGIC,
            size,
            reserved: 0,
            bits_offset,
        }
    }
}

/// Header of icon and cursor directories, both in resource data and in ICO and CUR files.
#[repr(C, packed(2))]
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
    Default,
)]
pub struct IconDirectory {
    pub reserved: u16,
    pub type_:    u16,
    pub count:    u16,
}

/// Entry of an ICO or CUR file.
/// For cursors, `planes` and `bit_count` hold the hotspot coordinates.
#[repr(C, packed(2))]
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
    Default,
)]
pub struct IconFileEntry {
    pub width:       u8,
    pub height:      u8,
    pub color_count: u8,
    pub reserved:    u8,
    pub planes:      u16,
    pub bit_count:   u16,
    pub bytes:       u32,
    pub offset:      u32,
}

/// Entry of an `RT_GROUP_ICON` resource.
#[repr(C, packed(2))]
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
    Default,
)]
pub struct GroupIconDirectoryEntry {
    pub width:       u8,
    pub height:      u8,
    pub color_count: u8,
    pub reserved:    u8,
    pub planes:      u16,
    pub bit_count:   u16,
    pub bytes:       u32,
    pub id:          u16,
}

/// Entry of an `RT_GROUP_CURSOR` resource.
/// The height is twice the image height, accounting for the AND mask of monochrome cursors.
#[repr(C, packed(2))]
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
    Default,
)]
pub struct GroupCursorDirectoryEntry {
    pub width:     u16,
    pub height:    u16,
    pub planes:    u16,
    pub bit_count: u16,
    pub bytes:     u32,
    pub id:        u16,
}

/// Prefix of `RT_CURSOR` resource data.
#[repr(C, packed(2))]
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
    Default,
)]
pub struct CursorHotspot {
    pub x: u16,
    pub y: u16,
}

#[repr(C, packed(4))]
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct FixedFileInfo {
    pub signature:       u32,
    pub struct_version:  VersionU16,
    pub file_version:    VersionU32,
    pub product_version: VersionU32,
    pub file_flags_mask: u32,
    pub file_flags:      u32,
    pub file_os:         u32,
    pub file_type:       u32,
    pub file_subtype:    u32,
    pub file_date:       u64,
}
impl Default for FixedFileInfo {
    fn default() -> Self {
        Self {
            signature:       VS_FIXEDFILEINFO_SIGNATURE,
            struct_version:  VersionU16 { major: 0, minor: 1 },
            file_version:    VersionU32 { major: 0, minor: 0 },
            product_version: VersionU32 { major: 0, minor: 0 },
            file_flags_mask: VS_FFI_FILEFLAGSMASK,
            file_flags:      0x00000000,
            file_os:         VOS_NT_WINDOWS32,
            file_type:       VFT_APP,
            file_subtype:    0x00000000,
            file_date:       0x00000000,
        }
    }
}

#[repr(C, packed(2))]
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
    Default,
)]
pub struct VersionHeader {
    pub length:       u16,
    pub value_length: u16,
    pub type_:        u16,
}
