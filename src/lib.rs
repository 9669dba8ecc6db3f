//! Resource **dir**ectories for Windows resource sets.
//!
//! Supports:
//! * Exporting a resource set into a directory of editable files and a `winres.json` manifest document
//! * Importing such a directory back into a resource set
//! * Icons, cursors, bitmaps, version information and application manifests as structured resources
//!
//! See [`export_resources`] and [`import_resources`] for the main entry points, and [`ResourceSet`] for the in-memory resource store.
//!
//! # Examples
//!
//! ### Export and import
//! ```
//! use resdir::*;
//!
//! let mut resources = ResourceSet::new();
//! resources.set_manifest(&AppManifest::default())?;
//!
//! // write the resources into a directory
//! let report = export_resources(DIRECTORY_PATH, &resources, &ExportOptions::default());
//!
//! // read them back into a new resource set
//! let mut imported = ResourceSet::new();
//! import_resources(&mut imported, report.manifest.unwrap())?;
//! ```
//!
//! ### Icon replacement
//! ```
//! use resdir::*;
//!
//! let icon = Icon::from_ico(&std::fs::read(ICON_PATH)?)?;
//! resources.set_icon(&Identifier::Name("APPICON".into()), LANGUAGE_ID_EN_US, &icon)?;
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg_hide))]
#![cfg_attr(docsrs, doc(cfg_hide(doc)))]

pub(crate) mod app_manifest;
pub(crate) mod bitmap;
pub(crate) mod document;
pub(crate) mod errors;
pub(crate) mod export;
pub(crate) mod icon;
pub(crate) mod identifier;
pub(crate) mod import;
pub(crate) mod resource;
pub(crate) mod util;
pub(crate) mod version;

pub mod constants;
pub mod types;

pub use crate::{
    app_manifest::*, bitmap::*, document::*, errors::*, export::*, icon::*, identifier::*,
    import::*, resource::*, version::*,
};
