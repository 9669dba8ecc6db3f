//! Windows API and binary constants.

#![allow(non_upper_case_globals)]

pub type DWORD = u32;
pub type WORD = u16;
pub type LANGID = WORD;


// https://docs.microsoft.com/en-us/openspecs/windows_protocols/ms-lcid/a9eac961-e77d-41a6-90a5-ce1a8b0cdb9c
pub const LANGUAGE_ID_DEFAULT: LANGID = 0; // 0x0000, language neutral
pub const LANGUAGE_ID_EN_US: LANGID = 1033; // 0x0409, en-US
// https://docs.microsoft.com/en-us/openspecs/windows_protocols/ms-ucoderef/28fefe92-d66c-4b03-90a9-97b473223d43
pub const CODE_PAGE_ID_EN_US: WORD = 1200; // 0x04B0, UTF-16LE


// https://docs.microsoft.com/en-us/windows/win32/menurc/vs-versioninfo

pub const VS_VERSION_INFO_KEY: &str = "VS_VERSION_INFO";
pub const VS_STRING_FILE_INFO_KEY: &str = "StringFileInfo";
pub const VS_VAR_FILE_INFO_KEY: &str = "VarFileInfo";
pub const VS_TRANSLATION_KEY: &str = "Translation";

pub const VS_NODE_TYPE_BINARY: WORD = 0;
pub const VS_NODE_TYPE_TEXT: WORD = 1;


// https://docs.microsoft.com/en-us/windows/win32/api/verrsrc/ns-verrsrc-vs_fixedfileinfo

pub const VOS_NT_WINDOWS32: DWORD = 0x00040004;

pub const VFT_APP: DWORD = 0x00000001;

pub const VS_FF_DEBUG: DWORD = 0x00000001;
pub const VS_FF_PRERELEASE: DWORD = 0x00000002;
pub const VS_FF_PATCHED: DWORD = 0x00000004;
pub const VS_FF_PRIVATEBUILD: DWORD = 0x00000008;
pub const VS_FF_INFOINFERRED: DWORD = 0x00000010;
pub const VS_FF_SPECIALBUILD: DWORD = 0x00000020;
pub const VS_FFI_FILEFLAGSMASK: DWORD = 0x0000003F;

pub const VS_FIXEDFILEINFO_SIGNATURE: DWORD = 0xFEEF04BD;


// https://docs.microsoft.com/en-us/windows/win32/menurc/resource-types

pub const RT_CURSOR: WORD = 0x01;
pub const RT_BITMAP: WORD = 0x02;
pub const RT_ICON: WORD = 0x03;
pub const RT_MENU: WORD = 0x04;
pub const RT_DIALOG: WORD = 0x05;
pub const RT_STRING: WORD = 0x06;
pub const RT_FONTDIR: WORD = 0x07;
pub const RT_FONT: WORD = 0x08;
pub const RT_ACCELERATOR: WORD = 0x09;
pub const RT_RCDATA: WORD = 0x0A;
pub const RT_MESSAGETABLE: WORD = 0x0B;
pub const RT_GROUP_CURSOR: WORD = 0x0C;
pub const RT_GROUP_ICON: WORD = 0x0E;
pub const RT_VERSION: WORD = 0x10;
pub const RT_PLUGPLAY: WORD = 0x13;
pub const RT_VXD: WORD = 0x14;
pub const RT_ANICURSOR: WORD = 0x15;
pub const RT_ANIICON: WORD = 0x16;
pub const RT_HTML: WORD = 0x17;
pub const RT_MANIFEST: WORD = 0x18;


// https://learn.microsoft.com/en-us/windows/win32/api/wingdi/ns-wingdi-bitmapinfoheader

pub const BI_BITFIELDS: DWORD = 3;
pub const BI_PNG: DWORD = 4;
pub const BI_JPEG: DWORD = 5;

pub const BITMAP_FILE_MAGIC: [u8; 2] = *b"BM";
pub const BITMAP_FILE_HEADER_SIZE: usize = 14;
pub const BITMAP_INFO_HEADER_SIZE: DWORD = 40;


// https://learn.microsoft.com/en-us/previous-versions/ms997538(v=msdn.10)

pub const ICON_DIRECTORY_TYPE_ICON: WORD = 1;
pub const ICON_DIRECTORY_TYPE_CURSOR: WORD = 2;

pub const PNG_SIGNATURE: [u8; 8] = *b"\x89PNG\r\n\x1a\n";


// Resource directory layout.

pub const MANIFEST_FILE_NAME: &str = "winres.json";
pub const APP_MANIFEST_FILE_NAME: &str = "app.manifest";
pub const VERSION_INFO_FILE_NAME: &str = "info.json";
