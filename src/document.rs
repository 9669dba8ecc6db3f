//! Manifest document of a resource directory.
//!
//! The document maps type, id and language strings to a value per resource.
//! Maps are sorted at every level, so the serialized document only depends on the resources it describes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{app_manifest::*, errors::*, identifier::*, version::*};

/// Ordered type, id and language mapping to a value per resource.
/// Import reads the values as plain JSON and decodes them per resource type with [`ManifestValue::decode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestDocument<V = ManifestValue> {
    types: BTreeMap<String, BTreeMap<String, BTreeMap<String, V>>>,
}
impl<V> Default for ManifestDocument<V> {
    fn default() -> Self {
        Self {
            types: BTreeMap::new(),
        }
    }
}
impl<V> ManifestDocument<V> {
    /// Insert the value of a resource, replacing an existing value with the same key.
    pub fn insert(&mut self, key: &ResourceKey, value: V) -> Option<V> {
        let (t, r, l) = key.to_strings();
        self.types.entry(t).or_default().entry(r).or_default().insert(l, value)
    }

    /// Returns `true` if the document holds a value of the given type string.
    pub fn contains_type(&self, t: &str) -> bool { self.types.contains_key(t) }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.types.values().flat_map(|ids| ids.values()).map(|langs| langs.len()).sum()
    }

    /// Returns `true` if the document holds no values.
    pub fn is_empty(&self) -> bool { self.types.is_empty() }

    /// Iterate over type, id and language strings and their values in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str, &V)> {
        self.types.iter().flat_map(|(t, ids)| {
            ids.iter().flat_map(move |(r, langs)| {
                langs.iter().map(move |(l, value)| (t.as_str(), r.as_str(), l.as_str(), value))
            })
        })
    }
}

/// Value of a single resource in the manifest document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ManifestValue {
    /// File name relative to the manifest document.
    File(String),
    Icon(IconDefinition),
    Cursor(CursorDefinition),
    Version(VersionInfo),
    AppManifest(AppManifest),
}
impl ManifestValue {
    /// Decode the value of a resource according to its type.
    ///
    /// # Returns
    /// Returns an error if the value does not have a shape valid for the resource type.
    pub fn decode(key: &ResourceKey, value: Value) -> Result<Self, ImportError> {
        match &key.type_ {
            ResourceType::Icon => Err(ImportError::DirectFrame("RT_ICON", "RT_GROUP_ICON")),
            ResourceType::Cursor => Err(ImportError::DirectFrame("RT_CURSOR", "RT_GROUP_CURSOR")),
            ResourceType::GroupIcon => IconDefinition::decode(&value)
                .map(Self::Icon)
                .map_err(|e| ImportError::InvalidIcon(format!("{} {}", key, e))),
            ResourceType::GroupCursor => CursorDefinition::decode(&value)
                .map(Self::Cursor)
                .map_err(|e| ImportError::InvalidCursor(format!("{} {}", key, e))),
            ResourceType::Version => Ok(Self::Version(serde_json::from_value(value)?)),
            ResourceType::Manifest if value.is_object() => {
                Ok(Self::AppManifest(serde_json::from_value(value)?))
            }
            _ => match value {
                Value::String(file) => Ok(Self::File(file)),
                _ => Err(ImportError::InvalidSet(format!("{} expected a file name", key))),
            },
        }
    }
}

/// Icon definition: an ICO or image file, or a list of image files combined into one icon.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IconDefinition {
    File(String),
    Images(Vec<String>),
}
impl IconDefinition {
    fn decode(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(file) => Ok(Self::File(file.clone())),
            Value::Array(files) if !files.is_empty() => files
                .iter()
                .map(|file| file.as_str().map(str::to_string).ok_or("expected a list of file names"))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Images)
                .map_err(str::to_string),
            _ => Err("expected a file name or a list of file names".into()),
        }
    }
}

/// Single cursor image with its hotspot.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct CursorFrame {
    pub x:     u16,
    pub y:     u16,
    pub image: String,
}
impl CursorFrame {
    fn decode(value: &Value) -> Result<Self, String> {
        let object = value.as_object().ok_or("expected an object with x, y and image")?;
        let coordinate = |name: &str| {
            object
                .get(name)
                .and_then(Value::as_f64)
                // fractional coordinates are truncated
                .filter(|value| (0.0..=u16::MAX as f64).contains(value))
                .map(|value| value as u16)
                .ok_or_else(|| format!("missing or invalid {:?}", name))
        };
        Ok(Self {
            x:     coordinate("x")?,
            y:     coordinate("y")?,
            image: object
                .get("image")
                .and_then(Value::as_str)
                .ok_or("missing or invalid \"image\"")?
                .to_string(),
        })
    }
}

/// Cursor definition: a CUR file, a single image with its hotspot, or a list of them.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CursorDefinition {
    File(String),
    Image(CursorFrame),
    Images(Vec<CursorFrame>),
}
impl CursorDefinition {
    fn decode(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(file) => Ok(Self::File(file.clone())),
            Value::Object(_) => CursorFrame::decode(value).map(Self::Image),
            Value::Array(frames) if !frames.is_empty() => {
                frames.iter().map(CursorFrame::decode).collect::<Result<_, _>>().map(Self::Images)
            }
            _ => Err("expected a file name, an image or a list of images".into()),
        }
    }
}
