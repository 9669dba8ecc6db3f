//! Resource identifiers and their string form used in resource directories.
//!
//! Numeric identifiers are written as `#<decimal>`, standard resource types by their `RT_` mnemonic, and languages as four uppercase hex digits.
//! A name starting with `#` is kept as a name whenever the remainder is not a valid 16-bit integer, so `##1` is the name `##1` and not the id `1`.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::{constants::*, errors::*};

/// Resource name or numeric id.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Identifier {
    ID(u16),
    Name(String),
}
impl Identifier {
    /// Parse the string form of an identifier.
    ///
    /// # Returns
    /// Returns `None` if the string is empty.
    pub fn parse<S: AsRef<str>>(string: S) -> Option<Self> {
        let string = string.as_ref();
        if string.is_empty() {
            return None;
        }
        if let Some(number) = string.strip_prefix('#') {
            // ids are read as signed 16-bit values and reinterpreted
            if let Ok(id) = number.parse::<i16>() {
                return Some(Self::ID(id as u16));
            }
        }
        Some(Self::Name(string.to_string()))
    }

    /// Returns the name, or `None` for numeric ids.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::ID(_) => None,
            Self::Name(name) => Some(name),
        }
    }
}
impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::ID(id) => write!(f, "#{}", id),
            Self::Name(name) => f.write_str(name),
        }
    }
}
impl From<u16> for Identifier {
    fn from(id: u16) -> Self { Self::ID(id) }
}
impl From<&str> for Identifier {
    fn from(name: &str) -> Self { Self::Name(name.to_string()) }
}

/// Resource type.
///
/// Standard resource types are always represented by their own variant.
/// `ID` only holds numeric types outside the standard set.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ResourceType {
    Cursor,
    Bitmap,
    Icon,
    Menu,
    Dialog,
    StringTable,
    FontDir,
    Font,
    Accelerator,
    RcData,
    MessageTable,
    GroupCursor,
    GroupIcon,
    Version,
    PlugPlay,
    Vxd,
    AniCursor,
    AniIcon,
    Html,
    Manifest,
    ID(u16),
    Name(String),
}

static STANDARD_TYPES: [(ResourceType, WORD, &str); 20] = [
    (ResourceType::Cursor, RT_CURSOR, "RT_CURSOR"),
    (ResourceType::Bitmap, RT_BITMAP, "RT_BITMAP"),
    (ResourceType::Icon, RT_ICON, "RT_ICON"),
    (ResourceType::Menu, RT_MENU, "RT_MENU"),
    (ResourceType::Dialog, RT_DIALOG, "RT_DIALOG"),
    (ResourceType::StringTable, RT_STRING, "RT_STRING"),
    (ResourceType::FontDir, RT_FONTDIR, "RT_FONTDIR"),
    (ResourceType::Font, RT_FONT, "RT_FONT"),
    (ResourceType::Accelerator, RT_ACCELERATOR, "RT_ACCELERATOR"),
    (ResourceType::RcData, RT_RCDATA, "RT_RCDATA"),
    (ResourceType::MessageTable, RT_MESSAGETABLE, "RT_MESSAGETABLE"),
    (ResourceType::GroupCursor, RT_GROUP_CURSOR, "RT_GROUP_CURSOR"),
    (ResourceType::GroupIcon, RT_GROUP_ICON, "RT_GROUP_ICON"),
    (ResourceType::Version, RT_VERSION, "RT_VERSION"),
    (ResourceType::PlugPlay, RT_PLUGPLAY, "RT_PLUGPLAY"),
    (ResourceType::Vxd, RT_VXD, "RT_VXD"),
    (ResourceType::AniCursor, RT_ANICURSOR, "RT_ANICURSOR"),
    (ResourceType::AniIcon, RT_ANIICON, "RT_ANIICON"),
    (ResourceType::Html, RT_HTML, "RT_HTML"),
    (ResourceType::Manifest, RT_MANIFEST, "RT_MANIFEST"),
];

impl ResourceType {
    /// Returns the resource type for a numeric type id.
    pub fn from_id(id: WORD) -> Self {
        STANDARD_TYPES
            .iter()
            .find(|(_, standard, _)| *standard == id)
            .map(|(type_, ..)| type_.clone())
            .unwrap_or(Self::ID(id))
    }

    /// Returns the standard resource type for an `RT_` mnemonic.
    pub fn from_mnemonic<S: AsRef<str>>(mnemonic: S) -> Option<Self> {
        let mnemonic = mnemonic.as_ref();
        STANDARD_TYPES
            .iter()
            .find(|(.., name)| *name == mnemonic)
            .map(|(type_, ..)| type_.clone())
    }

    /// Returns the numeric type id, or `None` for named types.
    pub fn id(&self) -> Option<WORD> {
        match self {
            Self::ID(id) => Some(*id),
            Self::Name(_) => None,
            standard => STANDARD_TYPES
                .iter()
                .find(|(type_, ..)| type_ == standard)
                .map(|(_, id, _)| *id),
        }
    }

    /// Returns the `RT_` mnemonic of standard resource types.
    pub fn mnemonic(&self) -> Option<&'static str> {
        STANDARD_TYPES.iter().find(|(type_, ..)| type_ == self).map(|(.., name)| *name)
    }
}
impl Display for ResourceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::ID(id) => write!(f, "#{}", id),
            Self::Name(name) => f.write_str(name),
            standard => f.write_str(standard.mnemonic().unwrap_or_default()),
        }
    }
}
impl From<Identifier> for ResourceType {
    fn from(identifier: Identifier) -> Self {
        match identifier {
            Identifier::ID(id) => Self::from_id(id),
            Identifier::Name(name) => Self::Name(name),
        }
    }
}

/// Key of a single resource: type, name or id, and language.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ResourceKey {
    pub type_: ResourceType,
    pub id:    Identifier,
    pub lang:  LANGID,
}
impl ResourceKey {
    pub fn new<I: Into<Identifier>>(type_: ResourceType, id: I, lang: LANGID) -> Self {
        Self {
            type_,
            id: id.into(),
            lang,
        }
    }

    /// Returns the string form of the type, id and language.
    pub fn to_strings(&self) -> (String, String, String) {
        to_strings(&self.type_, &self.id, self.lang)
    }

    /// Parse a key from the string form of its type, id and language.
    pub fn from_strings(t: &str, r: &str, l: &str) -> Result<Self, IdentifierError> {
        let (type_, id, lang) = from_strings(t, r, l)?;
        Ok(Self { type_, id, lang })
    }
}
impl Display for ResourceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[{}][{}][{:04X}]", self.type_, self.id, self.lang)
    }
}

/// Returns the string form of a resource type, id and language.
pub fn to_strings(type_: &ResourceType, id: &Identifier, lang: LANGID) -> (String, String, String) {
    (type_.to_string(), id.to_string(), format!("{:04X}", lang))
}

/// Parse the string form of a resource type, id and language.
///
/// # Returns
/// Returns an error if the type or id is empty, or if the language is not a hexadecimal 16-bit value.
pub fn from_strings(
    t: &str, r: &str, l: &str,
) -> Result<(ResourceType, Identifier, LANGID), IdentifierError> {
    let type_ = match ResourceType::from_mnemonic(t) {
        Some(type_) => type_,
        None => Identifier::parse(t).ok_or(IdentifierError::InvalidType)?.into(),
    };
    let id = Identifier::parse(r).ok_or(IdentifierError::InvalidId)?;
    if l.is_empty() || !l.bytes().all(|c| c.is_ascii_hexdigit()) {
        return Err(IdentifierError::InvalidLanguage(l.to_string()));
    }
    let lang =
        LANGID::from_str_radix(l, 16).map_err(|_| IdentifierError::InvalidLanguage(l.to_string()))?;
    Ok((type_, id, lang))
}
