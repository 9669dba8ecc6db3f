//! Import of a resource directory into a resource store.

use std::{
    fs,
    path::{Path, PathBuf},
};

#[cfg(feature = "images")]
use image::DynamicImage;
use log::{debug, info, trace};
use serde_json::Value;

use crate::{bitmap::*, document::*, errors::*, icon::*, identifier::*, resource::*};

/// Import every resource described by a manifest document into a store.
/// File names in the document are resolved relative to the directory of the document.
///
/// Resources are imported in the sorted order of their type, id and language strings.
/// The first error stops the import, resources imported before it stay in the store.
///
/// # Returns
/// Returns an error if the document can not be read, or if a resource can not be decoded, loaded or stored.
pub fn import_resources<P: AsRef<Path>, S: ResourceStore + ?Sized>(
    store: &mut S, manifest: P,
) -> Result<(), ImportError> {
    let manifest = manifest.as_ref();
    let dir = manifest.parent().unwrap_or_else(|| Path::new(""));
    debug!("reading {}", manifest.display());
    let document: ManifestDocument<Value> = serde_json::from_slice(&fs::read(manifest)?)?;

    for (t, r, l, value) in document.iter() {
        let key = ResourceKey::from_strings(t, r, l)?;
        trace!("{} importing", key);
        match ManifestValue::decode(&key, value.clone())? {
            ManifestValue::File(file) => {
                let data = fs::read(resolve(dir, &file))?;
                let data = match key.type_ {
                    ResourceType::Bitmap => bmp_to_dib(&data).to_vec(),
                    _ => data,
                };
                store.set(&key, data)?;
            }
            ManifestValue::Icon(definition) => {
                store.set_icon(&key.id, key.lang, &load_icon(dir, &definition)?)?
            }
            ManifestValue::Cursor(definition) => {
                store.set_cursor(&key.id, key.lang, &load_cursor(dir, &definition)?)?
            }
            ManifestValue::Version(info) => store.set_version_info(&info)?,
            ManifestValue::AppManifest(app_manifest) => store.set_manifest(&app_manifest)?,
        }
    }

    info!("imported {} resources from {}", document.len(), manifest.display());
    Ok(())
}

fn resolve(dir: &Path, file: &str) -> PathBuf {
    let path = dir.join(file);
    debug!("reading {}", path.display());
    path
}

fn load_icon(dir: &Path, definition: &IconDefinition) -> Result<Icon, ImportError> {
    match definition {
        IconDefinition::File(file)
            if Path::new(file)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("ico")) =>
        {
            Ok(Icon::from_ico(&fs::read(resolve(dir, file))?)?)
        }
        #[cfg(feature = "images")]
        IconDefinition::File(file) => Ok(Icon::from_resized_image(&load_image(dir, file)?)?),
        #[cfg(feature = "images")]
        IconDefinition::Images(files) => {
            let images =
                files.iter().map(|file| load_image(dir, file)).collect::<Result<Vec<_>, _>>()?;
            Ok(Icon::from_images(&images)?)
        }
        #[cfg(not(feature = "images"))]
        _ => Err(ImportError::InvalidIcon("image files require the images feature".into())),
    }
}

fn load_cursor(dir: &Path, definition: &CursorDefinition) -> Result<Cursor, ImportError> {
    match definition {
        CursorDefinition::File(file) => Ok(Cursor::from_cur(&fs::read(resolve(dir, file))?)?),
        #[cfg(feature = "images")]
        CursorDefinition::Image(frame) => load_cursor_images(dir, std::slice::from_ref(frame)),
        #[cfg(feature = "images")]
        CursorDefinition::Images(frames) => load_cursor_images(dir, frames),
        #[cfg(not(feature = "images"))]
        _ => Err(ImportError::InvalidCursor("image files require the images feature".into())),
    }
}

#[cfg(feature = "images")]
fn load_cursor_images(dir: &Path, frames: &[CursorFrame]) -> Result<Cursor, ImportError> {
    let images = frames
        .iter()
        .map(|frame| {
            Ok((load_image(dir, &frame.image)?, HotSpot {
                x: frame.x,
                y: frame.y,
            }))
        })
        .collect::<Result<Vec<_>, ImportError>>()?;
    Ok(Cursor::from_images(&images)?)
}

#[cfg(feature = "images")]
fn load_image(dir: &Path, file: &str) -> Result<DynamicImage, ImportError> {
    Ok(image::open(resolve(dir, file))?)
}
