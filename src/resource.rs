//! Resource stores.
//! A resource store holds raw resource data keyed by type, name or id, and language, and resolves the structured resources built from several entries.

use ahash::RandomState;
use debug_ignore::DebugIgnore;
use indexmap::IndexMap;
use log::{debug, trace, warn};

use crate::{
    app_manifest::*, constants::*, errors::*, icon::*, identifier::*, version::*,
};

/// Keyed resource data with typed access to icons, cursors, version information and the application manifest.
pub trait ResourceStore {
    /// Visit every entry in order. Returning `false` from `visit` stops the walk.
    fn walk(&self, visit: &mut dyn FnMut(&ResourceKey, &[u8]) -> bool);

    /// Get the raw data of an entry.
    fn get(&self, key: &ResourceKey) -> Option<&[u8]>;

    /// Set the raw data of an entry, replacing an existing entry with the same key.
    fn set(&mut self, key: &ResourceKey, data: Vec<u8>) -> Result<(), ResourceError>;

    /// Get the icon of an `RT_GROUP_ICON` entry.
    fn get_icon(&self, id: &Identifier, lang: LANGID) -> Result<Icon, ResourceError>;

    /// Set an icon as an `RT_GROUP_ICON` entry and its `RT_ICON` frames.
    fn set_icon(&mut self, id: &Identifier, lang: LANGID, icon: &Icon) -> Result<(), ResourceError>;

    /// Get the cursor of an `RT_GROUP_CURSOR` entry.
    fn get_cursor(&self, id: &Identifier, lang: LANGID) -> Result<Cursor, ResourceError>;

    /// Set a cursor as an `RT_GROUP_CURSOR` entry and its `RT_CURSOR` frames.
    fn set_cursor(
        &mut self, id: &Identifier, lang: LANGID, cursor: &Cursor,
    ) -> Result<(), ResourceError>;

    /// Get the version information, if any.
    fn get_version_info(&self) -> Result<Option<VersionInfo>, ResourceError>;

    /// Replace all version information.
    fn set_version_info(&mut self, info: &VersionInfo) -> Result<(), ResourceError>;

    /// Get the application manifest, if any.
    fn get_manifest(&self) -> Result<Option<AppManifest>, ResourceError>;

    /// Set the application manifest.
    fn set_manifest(&mut self, manifest: &AppManifest) -> Result<(), ResourceError>;
}

type Table<K, V> = IndexMap<K, V, RandomState>;

fn table<K, V>() -> Table<K, V> { IndexMap::with_hasher(RandomState::new()) }

/// In-memory resource store.
/// Entries are kept in insertion order.
#[derive(Debug, Clone)]
pub struct ResourceSet {
    types: Table<ResourceType, Table<Identifier, Table<LANGID, DebugIgnore<Vec<u8>>>>>,
}
impl Default for ResourceSet {
    fn default() -> Self { Self::new() }
}
impl ResourceSet {
    pub fn new() -> Self { Self { types: table() } }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.types.values().flat_map(|ids| ids.values()).map(|langs| langs.len()).sum()
    }

    /// Returns `true` if the set holds no entries.
    pub fn is_empty(&self) -> bool { self.types.is_empty() }

    /// Remove an entry, dropping tables left empty.
    /// # Returns
    /// The removed data.
    pub fn remove(&mut self, key: &ResourceKey) -> Option<Vec<u8>> {
        let ids = self.types.get_mut(&key.type_)?;
        let langs = ids.get_mut(&key.id)?;
        let data = langs.shift_remove(&key.lang)?;
        if langs.is_empty() {
            ids.shift_remove(&key.id);
        }
        if ids.is_empty() {
            self.types.shift_remove(&key.type_);
        }
        debug!("removed {}", key);
        Some(data.0)
    }

    /// Returns the entries of a type as pairs of id and language.
    fn keys_of(&self, type_: &ResourceType) -> Vec<(Identifier, LANGID)> {
        self.types
            .get(type_)
            .map(|ids| {
                ids.iter()
                    .flat_map(|(id, langs)| langs.keys().map(move |lang| (id.clone(), *lang)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the data of a frame in the given language, or in any language as a fallback.
    fn frame(&self, type_: &ResourceType, id: u16, lang: LANGID) -> Result<Vec<u8>, ResourceError> {
        let langs = self.types.get(type_).and_then(|ids| ids.get(&Identifier::ID(id)));
        if let Some(data) = langs.and_then(|langs| langs.get(&lang)) {
            return Ok(data.to_vec());
        }
        match langs.and_then(|langs| langs.iter().next()) {
            Some((other, data)) => {
                warn!(
                    "{} frame #{} not found in language {:04X}, using {:04X}",
                    type_, id, lang, other
                );
                Ok(data.to_vec())
            }
            None => Err(ResourceError::MissingResource(format!(
                "{}",
                ResourceKey::new(type_.clone(), id, lang)
            ))),
        }
    }

    /// Allocate the lowest unused frame ids of a type, starting at 1.
    fn frame_ids(&self, type_: &ResourceType, count: usize) -> Vec<u16> {
        let used = self.types.get(type_);
        (1..=u16::MAX)
            .filter(|&id| used.map_or(true, |ids| !ids.contains_key(&Identifier::ID(id))))
            .take(count)
            .collect()
    }

    /// Remove the frames referenced by a group, if the group exists.
    fn remove_frames(
        &mut self, group: &ResourceKey, frame_type: ResourceType,
        ids: fn(&[u8]) -> Result<Vec<u16>, ResourceError>,
    ) {
        let frames = match self.get(group).map(ids) {
            Some(Ok(frames)) => frames,
            Some(Err(e)) => {
                warn!("{} replacing unreadable group: {}", group, e);
                return;
            }
            None => return,
        };
        for frame in frames {
            self.remove(&ResourceKey::new(frame_type.clone(), frame, group.lang));
        }
    }
}

fn check_name(name: Option<&str>) -> Result<(), ResourceError> {
    match name {
        Some(name) if name.is_empty() || name.contains('\0') => {
            Err(ResourceError::InvalidName(name.to_string()))
        }
        _ => Ok(()),
    }
}

impl ResourceStore for ResourceSet {
    fn walk(&self, visit: &mut dyn FnMut(&ResourceKey, &[u8]) -> bool) {
        for (type_, ids) in &self.types {
            for (id, langs) in ids {
                for (lang, data) in langs {
                    if !visit(&ResourceKey::new(type_.clone(), id.clone(), *lang), data) {
                        return;
                    }
                }
            }
        }
    }

    fn get(&self, key: &ResourceKey) -> Option<&[u8]> {
        self.types
            .get(&key.type_)?
            .get(&key.id)?
            .get(&key.lang)
            .map(|data| data.as_slice())
    }

    fn set(&mut self, key: &ResourceKey, data: Vec<u8>) -> Result<(), ResourceError> {
        if let ResourceType::Name(name) = &key.type_ {
            check_name(Some(name))?;
        }
        check_name(key.id.name())?;
        trace!("setting {} ({} bytes)", key, data.len());
        self.types
            .entry(key.type_.clone())
            .or_insert_with(table)
            .entry(key.id.clone())
            .or_insert_with(table)
            .insert(key.lang, DebugIgnore(data));
        Ok(())
    }

    fn get_icon(&self, id: &Identifier, lang: LANGID) -> Result<Icon, ResourceError> {
        let key = ResourceKey::new(ResourceType::GroupIcon, id.clone(), lang);
        let group = self.get(&key).ok_or_else(|| ResourceError::MissingResource(key.to_string()))?;
        Icon::from_group(group, |frame| self.frame(&ResourceType::Icon, frame, lang))
    }

    fn set_icon(&mut self, id: &Identifier, lang: LANGID, icon: &Icon) -> Result<(), ResourceError> {
        if icon.images.is_empty() {
            return Err(ResourceError::InvalidIcon("no images".into()));
        }
        check_name(id.name())?;
        let key = ResourceKey::new(ResourceType::GroupIcon, id.clone(), lang);
        self.remove_frames(&key, ResourceType::Icon, icon_group_ids);

        let ids = self.frame_ids(&ResourceType::Icon, icon.images.len());
        if ids.len() < icon.images.len() {
            return Err(ResourceError::InvalidIcon("no free frame ids".into()));
        }
        for (image, &frame) in icon.images.iter().zip(&ids) {
            self.set(&ResourceKey::new(ResourceType::Icon, frame, lang), image.data().to_vec())?;
        }
        debug!("setting {} with {} frames", key, ids.len());
        self.set(&key, icon.group_data(&ids))
    }

    fn get_cursor(&self, id: &Identifier, lang: LANGID) -> Result<Cursor, ResourceError> {
        let key = ResourceKey::new(ResourceType::GroupCursor, id.clone(), lang);
        let group = self.get(&key).ok_or_else(|| ResourceError::MissingResource(key.to_string()))?;
        Cursor::from_group(group, |frame| self.frame(&ResourceType::Cursor, frame, lang))
    }

    fn set_cursor(
        &mut self, id: &Identifier, lang: LANGID, cursor: &Cursor,
    ) -> Result<(), ResourceError> {
        if cursor.images.is_empty() {
            return Err(ResourceError::InvalidCursor("no images".into()));
        }
        check_name(id.name())?;
        let key = ResourceKey::new(ResourceType::GroupCursor, id.clone(), lang);
        self.remove_frames(&key, ResourceType::Cursor, cursor_group_ids);

        let ids = self.frame_ids(&ResourceType::Cursor, cursor.images.len());
        if ids.len() < cursor.images.len() {
            return Err(ResourceError::InvalidCursor("no free frame ids".into()));
        }
        for (image, &frame) in cursor.images.iter().zip(&ids) {
            self.set(&ResourceKey::new(ResourceType::Cursor, frame, lang), Cursor::frame_data(image))?;
        }
        debug!("setting {} with {} frames", key, ids.len());
        self.set(&key, cursor.group_data(&ids))
    }

    fn get_version_info(&self) -> Result<Option<VersionInfo>, ResourceError> {
        match self.keys_of(&ResourceType::Version).into_iter().next() {
            Some((id, lang)) => {
                let key = ResourceKey::new(ResourceType::Version, id, lang);
                let data = self.get(&key).unwrap_or_default();
                VersionInfo::from_bytes(data).map(Some)
            }
            None => Ok(None),
        }
    }

    fn set_version_info(&mut self, info: &VersionInfo) -> Result<(), ResourceError> {
        let data = info.to_bytes()?;
        for (id, lang) in self.keys_of(&ResourceType::Version) {
            self.remove(&ResourceKey::new(ResourceType::Version, id, lang));
        }
        let lang = info.language().unwrap_or(LANGUAGE_ID_DEFAULT);
        self.set(&ResourceKey::new(ResourceType::Version, 1u16, lang), data)
    }

    fn get_manifest(&self) -> Result<Option<AppManifest>, ResourceError> {
        match self.keys_of(&ResourceType::Manifest).into_iter().next() {
            Some((id, lang)) => {
                let key = ResourceKey::new(ResourceType::Manifest, id, lang);
                let data = self.get(&key).unwrap_or_default();
                AppManifest::from_xml(data).map(Some)
            }
            None => Ok(None),
        }
    }

    fn set_manifest(&mut self, manifest: &AppManifest) -> Result<(), ResourceError> {
        self.set(
            &ResourceKey::new(ResourceType::Manifest, 1u16, LANGUAGE_ID_DEFAULT),
            manifest.to_xml(),
        )
    }
}
