//! Icon and cursor resources.
//!
//! Icons and cursors are stored as a group resource (`RT_GROUP_ICON`, `RT_GROUP_CURSOR`) referencing one frame resource (`RT_ICON`, `RT_CURSOR`) per image.
//! Outside of a resource set they are represented as ICO and CUR files.
//! See <https://learn.microsoft.com/en-us/previous-versions/ms997538(v=msdn.10)> for more information.

use debug_ignore::DebugIgnore;
#[cfg(feature = "images")]
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat};
use log::trace;
use zerocopy::IntoBytes;

use crate::{constants::*, errors::*, types::*, util::*};

/// Sizes of the frames generated for icons created from a single image.
pub const ICON_SIZES: [u32; 5] = [256, 64, 48, 32, 16];

/// Hotspot of a cursor image.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct HotSpot {
    pub x: u16,
    pub y: u16,
}

/// Single image of an icon or cursor.
/// The data is either a PNG image or a device-independent bitmap with an AND mask.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct IconImage {
    /// Width in pixels, 1 to 256.
    pub width:       u16,
    /// Height in pixels, 1 to 256.
    pub height:      u16,
    pub color_count: u8,
    pub planes:      u16,
    pub bit_count:   u16,
    pub data:        DebugIgnore<Vec<u8>>,
}
impl IconImage {
    /// Create an image from PNG or bitmap data, reading the dimensions from the data header.
    pub fn from_data(data: Vec<u8>) -> Result<Self, ResourceError> {
        let (width, height, planes, bit_count) = if data.starts_with(&PNG_SIGNATURE) {
            // IHDR is always the first chunk
            let width = data.get(16..20).map(|d| u32::from_be_bytes([d[0], d[1], d[2], d[3]]));
            let height = data.get(20..24).map(|d| u32::from_be_bytes([d[0], d[1], d[2], d[3]]));
            match (width, height) {
                (Some(width), Some(height)) => (width, height, 1, 32),
                _ => return Err(ResourceError::InvalidIcon("truncated png header".into())),
            }
        } else {
            let header = read::<BitmapInfoHeader>(&data)?;
            // the height includes the AND mask
            (
                header.width.unsigned_abs(),
                header.height.unsigned_abs() / 2,
                header.planes,
                header.bit_count,
            )
        };
        if !(1..=256).contains(&width) || !(1..=256).contains(&height) {
            return Err(ResourceError::InvalidIcon(format!(
                "image size {}x{} outside valid range",
                width, height
            )));
        }
        Ok(Self {
            width: width as u16,
            height: height as u16,
            color_count: color_count(bit_count),
            planes,
            bit_count,
            data: data.into(),
        })
    }

    /// Returns the raw image data.
    pub fn data(&self) -> &[u8] { &self.data }

    #[cfg(feature = "images")]
    fn from_image(image: &DynamicImage) -> Result<Self, ResourceError> {
        let mut data = Vec::new();
        DynamicImage::ImageRgba8(image.to_rgba8())
            .write_to(&mut std::io::Cursor::new(&mut data), ImageFormat::Png)?;
        Self::from_data(data)
    }

    fn file_entry(&self, planes: u16, bit_count: u16) -> IconFileEntry {
        IconFileEntry {
            width: dimension_byte(self.width),
            height: dimension_byte(self.height),
            color_count: self.color_count,
            reserved: 0,
            planes,
            bit_count,
            bytes: self.data.len() as u32,
            offset: 0,
        }
    }
}

/// Single image of a cursor with its hotspot.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CursorImage {
    pub hotspot: HotSpot,
    pub image:   IconImage,
}

/// Icon with one or more images.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct Icon {
    pub images: Vec<IconImage>,
}
impl Icon {
    /// Parse an icon from the contents of an ICO file.
    pub fn from_ico(data: &[u8]) -> Result<Self, ResourceError> {
        let images = read_container(data, ICON_DIRECTORY_TYPE_ICON)
            .map_err(ResourceError::InvalidIcon)?
            .into_iter()
            .map(|(entry, data)| IconImage {
                width:       entry_dimension(entry.width),
                height:      entry_dimension(entry.height),
                color_count: entry.color_count,
                planes:      entry.planes,
                bit_count:   entry.bit_count,
                data:        data.to_vec().into(),
            })
            .collect();
        Ok(Self { images })
    }

    /// Build the contents of an ICO file.
    pub fn to_ico(&self) -> Vec<u8> {
        write_container(
            ICON_DIRECTORY_TYPE_ICON,
            self.images
                .iter()
                .map(|image| (image.file_entry(image.planes, image.bit_count), image.data())),
        )
    }

    /// Create an icon with one frame per image.
    ///
    /// # Returns
    /// Returns an error if an image is larger than 256x256 pixels or no image is given.
    #[cfg(feature = "images")]
    pub fn from_images(images: &[DynamicImage]) -> Result<Self, ResourceError> {
        if images.is_empty() {
            return Err(ResourceError::InvalidIcon("no images".into()));
        }
        let images = images.iter().map(IconImage::from_image).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { images })
    }

    /// Create an icon with frames of the standard sizes from a single image.
    /// The image is never scaled up, an image smaller than every standard size becomes the only frame.
    #[cfg(feature = "images")]
    pub fn from_resized_image(image: &DynamicImage) -> Result<Self, ResourceError> {
        let (width, height) = image.dimensions();
        let largest = width.max(height);
        let mut images = ICON_SIZES
            .iter()
            .filter(|&&size| size <= largest)
            .map(|&size| {
                trace!("resizing {}x{} icon image to {}", width, height, size);
                IconImage::from_image(&image.resize(size, size, FilterType::Lanczos3))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if images.is_empty() {
            images.push(IconImage::from_image(image)?);
        }
        Ok(Self { images })
    }

    /// Read an icon from `RT_GROUP_ICON` resource data, loading each `RT_ICON` frame by id.
    pub(crate) fn from_group<F: FnMut(u16) -> Result<Vec<u8>, ResourceError>>(
        data: &[u8], mut frame: F,
    ) -> Result<Self, ResourceError> {
        let images = read_icon_group(data)?
            .into_iter()
            .map(|entry| {
                trace!("{:#x?}", entry);
                Ok(IconImage {
                    width:       entry_dimension(entry.width),
                    height:      entry_dimension(entry.height),
                    color_count: entry.color_count,
                    planes:      entry.planes,
                    bit_count:   entry.bit_count,
                    data:        frame(entry.id)?.into(),
                })
            })
            .collect::<Result<Vec<_>, ResourceError>>()?;
        Ok(Self { images })
    }

    /// Build the `RT_GROUP_ICON` resource data for the given frame ids.
    pub(crate) fn group_data(&self, ids: &[u16]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(
            IconDirectory {
                reserved: 0,
                type_:    ICON_DIRECTORY_TYPE_ICON,
                count:    self.images.len() as u16,
            }
            .as_bytes(),
        );
        for (image, &id) in self.images.iter().zip(ids) {
            let entry = GroupIconDirectoryEntry {
                width: dimension_byte(image.width),
                height: dimension_byte(image.height),
                color_count: image.color_count,
                reserved: 0,
                planes: image.planes,
                bit_count: image.bit_count,
                bytes: image.data.len() as u32,
                id,
            };
            data.extend_from_slice(entry.as_bytes());
        }
        data
    }
}

/// Cursor with one or more images.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct Cursor {
    pub images: Vec<CursorImage>,
}
impl Cursor {
    /// Parse a cursor from the contents of a CUR file.
    pub fn from_cur(data: &[u8]) -> Result<Self, ResourceError> {
        let entries =
            read_container(data, ICON_DIRECTORY_TYPE_CURSOR).map_err(ResourceError::InvalidCursor)?;
        let mut images = Vec::with_capacity(entries.len());
        for (entry, data) in entries {
            let mut image = IconImage::from_data(data.to_vec())
                .map_err(|e| ResourceError::InvalidCursor(e.to_string()))?;
            image.width = entry_dimension(entry.width);
            image.height = entry_dimension(entry.height);
            images.push(CursorImage {
                // planes and bit count hold the hotspot in cursor files
                hotspot: HotSpot {
                    x: entry.planes,
                    y: entry.bit_count,
                },
                image,
            });
        }
        Ok(Self { images })
    }

    /// Build the contents of a CUR file.
    pub fn to_cur(&self) -> Vec<u8> {
        write_container(
            ICON_DIRECTORY_TYPE_CURSOR,
            self.images.iter().map(|cursor| {
                (cursor.image.file_entry(cursor.hotspot.x, cursor.hotspot.y), cursor.image.data())
            }),
        )
    }

    /// Create a cursor with one frame per image and hotspot.
    ///
    /// # Returns
    /// Returns an error if an image is larger than 256x256 pixels or no image is given.
    #[cfg(feature = "images")]
    pub fn from_images(images: &[(DynamicImage, HotSpot)]) -> Result<Self, ResourceError> {
        if images.is_empty() {
            return Err(ResourceError::InvalidCursor("no images".into()));
        }
        let images = images
            .iter()
            .map(|(image, hotspot)| {
                Ok(CursorImage {
                    hotspot: *hotspot,
                    image:   IconImage::from_image(image)?,
                })
            })
            .collect::<Result<Vec<_>, ResourceError>>()?;
        Ok(Self { images })
    }

    /// Read a cursor from `RT_GROUP_CURSOR` resource data, loading each `RT_CURSOR` frame by id.
    pub(crate) fn from_group<F: FnMut(u16) -> Result<Vec<u8>, ResourceError>>(
        data: &[u8], mut frame: F,
    ) -> Result<Self, ResourceError> {
        let mut images = Vec::new();
        for entry in read_cursor_group(data)? {
            trace!("{:#x?}", entry);
            let mut data = frame(entry.id)?;
            let hotspot = read::<CursorHotspot>(&data)?;
            let bit_count = entry.bit_count;
            images.push(CursorImage {
                hotspot: HotSpot {
                    x: hotspot.x,
                    y: hotspot.y,
                },
                image:   IconImage {
                    width: entry.width,
                    // the group height includes the AND mask
                    height: entry.height / 2,
                    color_count: color_count(bit_count),
                    planes: entry.planes,
                    bit_count,
                    data: data.split_off(4).into(),
                },
            });
        }
        Ok(Self { images })
    }

    /// Build the `RT_GROUP_CURSOR` resource data for the given frame ids.
    pub(crate) fn group_data(&self, ids: &[u16]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(
            IconDirectory {
                reserved: 0,
                type_:    ICON_DIRECTORY_TYPE_CURSOR,
                count:    self.images.len() as u16,
            }
            .as_bytes(),
        );
        for (cursor, &id) in self.images.iter().zip(ids) {
            let entry = GroupCursorDirectoryEntry {
                width: cursor.image.width,
                height: cursor.image.height * 2,
                planes: cursor.image.planes,
                bit_count: cursor.image.bit_count,
                bytes: cursor.image.data.len() as u32 + 4,
                id,
            };
            data.extend_from_slice(entry.as_bytes());
        }
        data
    }

    /// Build the `RT_CURSOR` resource data of a single image.
    pub(crate) fn frame_data(cursor: &CursorImage) -> Vec<u8> {
        let mut data = Vec::with_capacity(cursor.image.data.len() + 4);
        data.extend_from_slice(
            CursorHotspot {
                x: cursor.hotspot.x,
                y: cursor.hotspot.y,
            }
            .as_bytes(),
        );
        data.extend_from_slice(cursor.image.data());
        data
    }
}

/// Returns the `RT_ICON` frame ids referenced by `RT_GROUP_ICON` resource data.
pub(crate) fn icon_group_ids(data: &[u8]) -> Result<Vec<u16>, ResourceError> {
    Ok(read_icon_group(data)?.iter().map(|entry| entry.id).collect())
}

/// Returns the `RT_CURSOR` frame ids referenced by `RT_GROUP_CURSOR` resource data.
pub(crate) fn cursor_group_ids(data: &[u8]) -> Result<Vec<u16>, ResourceError> {
    Ok(read_cursor_group(data)?.iter().map(|entry| entry.id).collect())
}

fn read_icon_group(data: &[u8]) -> Result<Vec<GroupIconDirectoryEntry>, ResourceError> {
    let count = read_group_header(data, ICON_DIRECTORY_TYPE_ICON)?;
    (0..count)
        .map(|index| {
            let offset = 6 + index * 14;
            read::<GroupIconDirectoryEntry>(data.get(offset..).unwrap_or_default())
                .map_err(ResourceError::from)
        })
        .collect()
}

fn read_cursor_group(data: &[u8]) -> Result<Vec<GroupCursorDirectoryEntry>, ResourceError> {
    let count = read_group_header(data, ICON_DIRECTORY_TYPE_CURSOR)?;
    (0..count)
        .map(|index| {
            let offset = 6 + index * 14;
            read::<GroupCursorDirectoryEntry>(data.get(offset..).unwrap_or_default())
                .map_err(ResourceError::from)
        })
        .collect()
}

fn read_group_header(data: &[u8], type_: u16) -> Result<usize, ResourceError> {
    let header = read::<IconDirectory>(data)?;
    trace!("{:#x?}", header);
    if header.reserved != 0 || header.type_ != type_ {
        return Err(ResourceError::InvalidBytes(ReadError(format!(
            "invalid group directory type {}",
            { header.type_ }
        ))));
    }
    Ok(header.count as usize)
}

fn read_container(data: &[u8], type_: u16) -> Result<Vec<(IconFileEntry, &[u8])>, String> {
    let header = read::<IconDirectory>(data).map_err(|e| e.to_string())?;
    if header.reserved != 0 || header.type_ != type_ {
        return Err("invalid file header".into());
    }
    if header.count == 0 {
        return Err("no images".into());
    }
    let mut images = Vec::with_capacity(header.count as usize);
    for index in 0..header.count as usize {
        let offset = 6 + index * 16;
        let entry = read::<IconFileEntry>(data.get(offset..).unwrap_or_default())
            .map_err(|e| e.to_string())?;
        trace!("{:#x?}", entry);
        let start = entry.offset as usize;
        let end = start + entry.bytes as usize;
        let image = data
            .get(start..end)
            .ok_or_else(|| format!("image {} data outside file", index))?;
        images.push((entry, image));
    }
    Ok(images)
}

fn write_container<'a, I: ExactSizeIterator<Item = (IconFileEntry, &'a [u8])>>(
    type_: u16, images: I,
) -> Vec<u8> {
    let count = images.len();
    let mut entries = Vec::with_capacity(6 + count * 16);
    let mut data = Vec::new();
    entries.extend_from_slice(
        IconDirectory {
            reserved: 0,
            type_,
            count: count as u16,
        }
        .as_bytes(),
    );
    let mut offset = (6 + count * 16) as u32;
    for (mut entry, image) in images {
        entry.offset = offset;
        entries.extend_from_slice(entry.as_bytes());
        data.extend_from_slice(image);
        offset += image.len() as u32;
    }
    entries.extend(data);
    entries
}

fn color_count(bit_count: u16) -> u8 {
    if bit_count < 8 {
        1 << bit_count
    } else {
        0
    }
}

fn dimension_byte(dimension: u16) -> u8 {
    if dimension >= 256 {
        0
    } else {
        dimension as u8
    }
}

fn entry_dimension(dimension: u8) -> u16 {
    if dimension == 0 {
        256
    } else {
        dimension as u16
    }
}
