//! Version information resource.
//!
//! The `RT_VERSION` resource is a tree of nodes, each with a 6-byte header, a UTF-16 key and a value, aligned to 32 bits.
//! The root `VS_VERSION_INFO` node holds the fixed file info and the `StringFileInfo` and `VarFileInfo` children.
//! See <https://learn.microsoft.com/en-us/windows/win32/menurc/vs-versioninfo> for more information.

use indexmap::IndexMap;
use log::{trace, warn};
use serde::{Deserialize, Serialize};
use zerocopy::IntoBytes;

use crate::{constants::*, errors::*, types::*, util::*};

// root, StringFileInfo, string table, string
const MAX_NODE_DEPTH: usize = 8;

const FILE_FLAGS: [(DWORD, &str); 6] = [
    (VS_FF_DEBUG, "Debug"),
    (VS_FF_PRERELEASE, "Prerelease"),
    (VS_FF_PATCHED, "Patched"),
    (VS_FF_PRIVATEBUILD, "PrivateBuild"),
    (VS_FF_INFOINFERRED, "InfoInferred"),
    (VS_FF_SPECIALBUILD, "SpecialBuild"),
];

/// Fixed part of the version information.
#[derive(Debug, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct FixedVersion {
    /// File version in the form `a.b.c.d`.
    #[serde(default)]
    pub file_version:    String,
    /// Product version in the form `a.b.c.d`.
    #[serde(default)]
    pub product_version: String,
    /// Comma separated file flags.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub flags:           String,
}

/// Version information.
///
/// The string tables are keyed by language as four hexadecimal digits, the code page is always UTF-16.
#[derive(Debug, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(default)]
    pub fixed: FixedVersion,
    #[serde(default)]
    pub info:  IndexMap<String, IndexMap<String, String>>,
}
impl VersionInfo {
    /// Parse version information from `RT_VERSION` resource data.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ResourceError> {
        let (root, _) = VersionNode::parse(data, 0)?;
        if root.key != VS_VERSION_INFO_KEY {
            return Err(ResourceError::InvalidVersionInfo(format!("unexpected root {:?}", root.key)));
        }

        let mut fixed = FixedVersion::default();
        if !root.value.is_empty() {
            let info = read::<FixedFileInfo>(&root.value)?;
            trace!("{:#x?}", info);
            if info.signature != VS_FIXEDFILEINFO_SIGNATURE {
                return Err(ResourceError::InvalidVersionInfo(format!(
                    "invalid fixed file info signature {:#x?}",
                    { info.signature }
                )));
            }
            fixed.file_version = format_version(info.file_version);
            fixed.product_version = format_version(info.product_version);
            fixed.flags = FILE_FLAGS
                .iter()
                .filter(|(flag, _)| info.file_flags & info.file_flags_mask & flag != 0)
                .map(|(_, name)| *name)
                .collect::<Vec<_>>()
                .join(",");
        }

        let mut info = IndexMap::new();
        for child in root.children.iter().filter(|child| child.key == VS_STRING_FILE_INFO_KEY) {
            for table in &child.children {
                // the table key is the language followed by the code page
                let lang = match table.key.get(0..4) {
                    Some(lang) if u16::from_str_radix(lang, 16).is_ok() => lang.to_uppercase(),
                    _ => {
                        warn!("ignoring string table with invalid key {:?}", table.key);
                        continue;
                    }
                };
                let strings = table
                    .children
                    .iter()
                    .map(|string| (string.key.clone(), read_u16_string(&string.value).0))
                    .collect::<IndexMap<_, _>>();
                info.insert(lang, strings);
            }
        }

        Ok(Self { fixed, info })
    }

    /// Build `RT_VERSION` resource data.
    ///
    /// # Returns
    /// Returns an error if a version, flag or language is invalid.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ResourceError> {
        let mut fixed = FixedFileInfo {
            file_version: parse_version(&self.fixed.file_version)?,
            product_version: parse_version(&self.fixed.product_version)?,
            ..Default::default()
        };
        for flag in self.fixed.flags.split(',').map(str::trim).filter(|flag| !flag.is_empty()) {
            let (value, _) = FILE_FLAGS
                .iter()
                .find(|(_, name)| name.eq_ignore_ascii_case(flag))
                .ok_or_else(|| ResourceError::InvalidVersionInfo(format!("unknown flag {:?}", flag)))?;
            fixed.file_flags |= *value;
        }

        let mut tables = Vec::with_capacity(self.info.len());
        let mut translations = Vec::with_capacity(self.info.len() * 4);
        for (lang, strings) in &self.info {
            let lang_id = u16::from_str_radix(lang, 16).map_err(|_| {
                ResourceError::InvalidVersionInfo(format!("invalid language {:?}", lang))
            })?;
            translations.extend_from_slice(&lang_id.to_le_bytes());
            translations.extend_from_slice(&CODE_PAGE_ID_EN_US.to_le_bytes());
            tables.push(VersionNode {
                key:      format!("{:04X}{:04X}", lang_id, CODE_PAGE_ID_EN_US),
                type_:    VS_NODE_TYPE_TEXT,
                value:    Vec::new(),
                children: strings
                    .iter()
                    .map(|(key, value)| VersionNode {
                        key:      key.clone(),
                        type_:    VS_NODE_TYPE_TEXT,
                        value:    string_to_u16(value),
                        children: Vec::new(),
                    })
                    .collect(),
            });
        }

        let root = VersionNode {
            key:      VS_VERSION_INFO_KEY.to_string(),
            type_:    VS_NODE_TYPE_BINARY,
            value:    fixed.as_bytes().to_vec(),
            children: vec![
                VersionNode {
                    key:      VS_STRING_FILE_INFO_KEY.to_string(),
                    type_:    VS_NODE_TYPE_TEXT,
                    value:    Vec::new(),
                    children: tables,
                },
                VersionNode {
                    key:      VS_VAR_FILE_INFO_KEY.to_string(),
                    type_:    VS_NODE_TYPE_TEXT,
                    value:    Vec::new(),
                    children: vec![VersionNode {
                        key:      VS_TRANSLATION_KEY.to_string(),
                        type_:    VS_NODE_TYPE_BINARY,
                        value:    translations,
                        children: Vec::new(),
                    }],
                },
            ],
        };
        root.build()
    }

    /// Returns the language of the first string table, if any.
    pub fn language(&self) -> Option<LANGID> {
        self.info.keys().find_map(|lang| u16::from_str_radix(lang, 16).ok())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
struct VersionNode {
    key:      String,
    type_:    u16,
    value:    Vec<u8>,
    children: Vec<VersionNode>,
}
impl VersionNode {
    /// Parse a node and its children.
    /// Returns the node and its length without trailing padding.
    fn parse(data: &[u8], depth: usize) -> Result<(Self, usize), ReadError> {
        if depth > MAX_NODE_DEPTH {
            return Err(ReadError(format!("version nodes nested deeper than {}", MAX_NODE_DEPTH)));
        }
        let header = read::<VersionHeader>(data)?;
        let length = header.length as usize;
        if length < 6 || length > data.len() {
            return Err(ReadError(format!(
                "version node length {} outside valid range {}",
                length,
                data.len()
            )));
        }
        let data = &data[..length];

        let (key, key_size) = read_u16_string(&data[6..]);
        let value_offset = aligned_to(6 + key_size, 4).min(length);
        let value_size = match header.type_ {
            // text values are sized in characters, some producers size them in bytes
            VS_NODE_TYPE_TEXT => (header.value_length as usize * 2).min(length - value_offset),
            _ => header.value_length as usize,
        };
        let value = data
            .get(value_offset..value_offset + value_size)
            .ok_or_else(|| ReadError(format!("version node {:?} value outside node", key)))?
            .to_vec();
        trace!("version node {:?} {:#x?} ({} bytes)", key, header, value.len());

        let mut children = Vec::new();
        let mut offset = aligned_to(value_offset + value_size, 4);
        while offset < length {
            let (child, child_length) = Self::parse(&data[offset..], depth + 1)?;
            children.push(child);
            offset = aligned_to(offset + child_length, 4);
        }

        Ok((
            Self {
                key,
                type_: header.type_,
                value,
                children,
            },
            length,
        ))
    }

    fn build(&self) -> Result<Vec<u8>, ResourceError> {
        let mut data = Vec::new();
        data.extend_from_slice(VersionHeader::default().as_bytes());
        data.extend(string_to_u16(&self.key));
        pad_to::<4>(&mut data);
        data.extend_from_slice(&self.value);
        for child in &self.children {
            pad_to::<4>(&mut data);
            data.extend(child.build()?);
        }
        let length = u16::try_from(data.len()).map_err(|_| {
            ResourceError::InvalidVersionInfo(format!(
                "version node {:?} of {} bytes exceeds the maximum size",
                self.key,
                data.len()
            ))
        })?;
        let header = VersionHeader {
            length,
            value_length: match self.type_ {
                VS_NODE_TYPE_TEXT => (self.value.len() / 2) as u16,
                _ => self.value.len() as u16,
            },
            type_:        self.type_,
        };
        data[..6].copy_from_slice(header.as_bytes());
        Ok(data)
    }
}

fn format_version(version: VersionU32) -> String {
    let (major, minor) = (version.major, version.minor);
    format!("{}.{}.{}.{}", major >> 16, major & 0xffff, minor >> 16, minor & 0xffff)
}

fn parse_version(version: &str) -> Result<VersionU32, ResourceError> {
    let mut parts = [0u32; 4];
    let version = version.trim();
    if !version.is_empty() {
        let split = version.split('.').collect::<Vec<_>>();
        if split.len() > 4 {
            return Err(ResourceError::InvalidVersionInfo(format!("invalid version {:?}", version)));
        }
        for (part, value) in parts.iter_mut().zip(split) {
            *part = value.trim().parse::<u16>().map_err(|_| {
                ResourceError::InvalidVersionInfo(format!("invalid version {:?}", version))
            })? as u32;
        }
    }
    Ok(VersionU32 {
        major: parts[0] << 16 | parts[1],
        minor: parts[2] << 16 | parts[3],
    })
}
