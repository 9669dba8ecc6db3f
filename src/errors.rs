//! Errors specific to reading, writing or translating resources.

use std::io::Error as IOError;

#[cfg(feature = "images")]
use image::ImageError;
use serde_json::Error as JsonError;

/// Error that can occur when reading and parsing bytes.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ReadError(pub String);

/// Errors that can occur when parsing the string form of a resource identifier.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum IdentifierError {
    #[error("invalid type identifier")]
    InvalidType,
    #[error("invalid resource identifier")]
    InvalidId,
    #[error("invalid language identifier: {0:?}")]
    InvalidLanguage(String),
}

/// Errors that can occur when reading or modifying resource data.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("invalid resource name: {0:?}")]
    InvalidName(String),
    #[error("invalid bytes: {0}")]
    InvalidBytes(ReadError),
    #[error("invalid icon: {0}")]
    InvalidIcon(String),
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("invalid version info: {0}")]
    InvalidVersionInfo(String),
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
    #[error("missing resource: {0}")]
    MissingResource(String),
    #[cfg(feature = "images")]
    #[error("image error: {0}")]
    ImageError(ImageError),
    #[error("io error: {0}")]
    IOError(IOError),
}
impl From<ReadError> for ResourceError {
    fn from(error: ReadError) -> Self { ResourceError::InvalidBytes(error) }
}
#[cfg(feature = "images")]
impl From<ImageError> for ResourceError {
    fn from(error: ImageError) -> Self { ResourceError::ImageError(error) }
}
impl From<IOError> for ResourceError {
    fn from(error: IOError) -> Self { ResourceError::IOError(error) }
}

/// Errors that can occur when importing a resource directory into a resource store.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("{0}")]
    InvalidIdentifier(IdentifierError),
    #[error("cannot import {0} resources directly, use {1} instead")]
    DirectFrame(&'static str, &'static str),
    #[error("invalid resource set definition: {0}")]
    InvalidSet(String),
    #[error("invalid icon definition: {0}")]
    InvalidIcon(String),
    #[error("invalid cursor definition: {0}")]
    InvalidCursor(String),
    #[error("{0}")]
    Resource(ResourceError),
    #[error("invalid json: {0}")]
    Json(JsonError),
    #[cfg(feature = "images")]
    #[error("image error: {0}")]
    ImageError(ImageError),
    #[error("io error: {0}")]
    IOError(IOError),
}
impl From<IdentifierError> for ImportError {
    fn from(error: IdentifierError) -> Self { ImportError::InvalidIdentifier(error) }
}
impl From<ResourceError> for ImportError {
    fn from(error: ResourceError) -> Self { ImportError::Resource(error) }
}
impl From<JsonError> for ImportError {
    fn from(error: JsonError) -> Self { ImportError::Json(error) }
}
#[cfg(feature = "images")]
impl From<ImageError> for ImportError {
    fn from(error: ImageError) -> Self { ImportError::ImageError(error) }
}
impl From<IOError> for ImportError {
    fn from(error: IOError) -> Self { ImportError::IOError(error) }
}

/// Errors that can occur when exporting a single resource.
/// Export logs these and skips the resource.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("{0}")]
    Resource(ResourceError),
    #[error("io error: {0}")]
    IOError(IOError),
}
impl From<ResourceError> for ExportError {
    fn from(error: ResourceError) -> Self { ExportError::Resource(error) }
}
impl From<IOError> for ExportError {
    fn from(error: IOError) -> Self { ExportError::IOError(error) }
}
