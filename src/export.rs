//! Export of a resource store into a resource directory.

use std::{
    borrow::Cow,
    fs,
    path::{Path, PathBuf},
};

use log::{debug, error, info, trace};

use crate::{
    app_manifest::*, bitmap::*, constants::*, document::*, errors::*, identifier::*, resource::*,
    version::*,
};

/// Export configuration.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ExportOptions {
    /// Write the application manifest as a structured value into the manifest document instead of an XML file.
    pub manifest_in_document: bool,
}
impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            manifest_in_document: true,
        }
    }
}

/// Outcome of an export.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ExportReport {
    /// Path of the written manifest document, `None` if it could not be written.
    pub manifest: Option<PathBuf>,
    /// Number of resources written to the document.
    pub exported: usize,
    /// Number of resources skipped because they could not be exported.
    pub skipped:  usize,
}

/// Export every resource of a store into a directory, writing one file per resource and a `winres.json` manifest document referencing them.
///
/// Resources that fail to export are logged and left out of the document.
/// `RT_ICON` and `RT_CURSOR` frames are only exported as part of their groups.
///
/// # Returns
/// Returns a report of the export. The manifest path is `None` if the directory or the document could not be written.
pub fn export_resources<P: AsRef<Path>, S: ResourceStore + ?Sized>(
    dir: P, store: &S, options: &ExportOptions,
) -> ExportReport {
    let dir = dir.as_ref();
    let mut report = ExportReport::default();
    if let Err(e) = fs::create_dir_all(dir) {
        error!("failed to create {}: {}", dir.display(), e);
        return report;
    }

    let mut document = ManifestDocument::default();
    store.walk(&mut |key, data| {
        if matches!(key.type_, ResourceType::Icon | ResourceType::Cursor) {
            return true;
        }
        let first = !document.contains_type(&key.type_.to_string());
        match export_entry(dir, store, options, key, data, first) {
            Ok(value) => {
                document.insert(key, value);
                report.exported += 1;
            }
            Err(e) => {
                error!("{} {}", key, e);
                report.skipped += 1;
            }
        }
        true
    });

    let json = match serde_json::to_string_pretty(&document) {
        Ok(json) => json,
        Err(e) => {
            error!("failed to serialize manifest document: {}", e);
            return report;
        }
    };
    let path = dir.join(MANIFEST_FILE_NAME);
    if let Err(e) = fs::write(&path, json) {
        error!("failed to write {}: {}", path.display(), e);
        return report;
    }
    info!(
        "exported {} resources to {} ({} skipped)",
        report.exported,
        path.display(),
        report.skipped
    );
    report.manifest = Some(path);
    report
}

fn export_entry<S: ResourceStore + ?Sized>(
    dir: &Path, store: &S, options: &ExportOptions, key: &ResourceKey, data: &[u8], first: bool,
) -> Result<ManifestValue, ExportError> {
    trace!("{} exporting {} bytes", key, data.len());
    let contents = match key.type_ {
        ResourceType::GroupIcon => Cow::Owned(store.get_icon(&key.id, key.lang)?.to_ico()),
        ResourceType::GroupCursor => Cow::Owned(store.get_cursor(&key.id, key.lang)?.to_cur()),
        ResourceType::Bitmap => dib_to_bmp(data),
        ResourceType::Version => return Ok(ManifestValue::Version(VersionInfo::from_bytes(data)?)),
        ResourceType::Manifest if options.manifest_in_document => {
            return Ok(ManifestValue::AppManifest(AppManifest::from_xml(data)?));
        }
        _ => Cow::Borrowed(data),
    };

    let name = exported_name(first, data, &key.type_, &key.id, key.lang);
    let path = dir.join(&name);
    debug!("{} writing {} bytes to {}", key, contents.len(), path.display());
    fs::write(&path, contents)?;
    Ok(ManifestValue::File(name))
}

/// Returns the file name a resource is exported to.
///
/// `first` tells whether the resource is the first of its type, which gives the first version resource the plain `info.json` name.
pub fn exported_name(
    first: bool, data: &[u8], type_: &ResourceType, id: &Identifier, lang: LANGID,
) -> String {
    let (t, r, l) = to_strings(type_, id, lang);
    let (prefix, ext) = match type_ {
        ResourceType::Manifest if *id == Identifier::ID(1) && lang == LANGUAGE_ID_DEFAULT => {
            return APP_MANIFEST_FILE_NAME.to_string();
        }
        ResourceType::Manifest => (None, "manifest"),
        ResourceType::GroupIcon => (None, "ico"),
        ResourceType::GroupCursor => (None, "cur"),
        ResourceType::Bitmap => (None, "bmp"),
        ResourceType::AniCursor | ResourceType::AniIcon => (Some(t), "ani"),
        ResourceType::Version if first => return VERSION_INFO_FILE_NAME.to_string(),
        ResourceType::Version => (Some("info".to_string()), "json"),
        _ if is_png(data) => (Some(t), "png"),
        _ => (Some(t), "bin"),
    };
    match prefix {
        Some(prefix) => format!("{}_{}_{}.{}", prefix, r, l, ext),
        None => format!("{}_{}.{}", r, l, ext),
    }
}

#[cfg(feature = "images")]
fn is_png(data: &[u8]) -> bool {
    use image::{codecs::png::PngDecoder, ImageDecoder};

    if data.len() <= PNG_SIGNATURE.len() || !data.starts_with(&PNG_SIGNATURE) {
        return false;
    }
    match PngDecoder::new(std::io::Cursor::new(data)) {
        Ok(decoder) => {
            let (width, height) = decoder.dimensions();
            width != 0 && height != 0
        }
        Err(e) => {
            trace!("not a png image: {}", e);
            false
        }
    }
}

#[cfg(not(feature = "images"))]
fn is_png(_data: &[u8]) -> bool { false }
