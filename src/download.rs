use crate::archive::{assemble, default_archive_filename, ArchiveEntry, AssembledArchive};
use crate::error::{CompressionError, Result};
use crate::item::{CompressedImage, ImageItem};
use chrono::NaiveDate;
use std::path::Path;

/// What "download all" hands back to the user.
#[derive(Debug, Clone)]
pub enum Download {
    /// Exactly one compressed item: its bytes, untouched
    Single {
        file_name: String,
        mime_type: &'static str,
        bytes: Vec<u8>,
    },
    /// Several compressed items packed into one ZIP
    Archive {
        file_name: String,
        archive: AssembledArchive,
    },
}

impl Download {
    pub fn file_name(&self) -> &str {
        match self {
            Download::Single { file_name, .. } | Download::Archive { file_name, .. } => file_name,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Download::Single { bytes, .. } => bytes,
            Download::Archive { archive, .. } => &archive.bytes,
        }
    }
}

/// Routes the compressed subset of `items` to a download.
///
/// A single compressed item is delivered directly and never goes through the
/// archive assembler.
///
/// # Arguments
/// * `items` - The whole batch; only `Compressed` items are used
/// * `today` - Date stamped into the archive name
///
/// # Returns
/// * `Ok(Download::Single)` - One compressed item, its bytes untouched
/// * `Ok(Download::Archive)` - Several, packed by [`assemble`]
/// * `Err(CompressionError::InvalidInput)` - Nothing compressed
/// * `Err(CompressionError::Archive)` - The ZIP writer failed
pub fn prepare_download(items: &[ImageItem], today: NaiveDate) -> Result<Download> {
    let compressed: Vec<(&ImageItem, &CompressedImage)> = items
        .iter()
        .filter_map(|item| item.compressed().map(|image| (item, image)))
        .collect();

    match compressed.as_slice() {
        [] => Err(CompressionError::InvalidInput(
            "No compressed images to download".to_string(),
        )),
        [(item, image)] => Ok(Download::Single {
            file_name: single_file_name(item.name(), image.codec.extension()),
            mime_type: image.codec.mime_type(),
            bytes: image.bytes.clone(),
        }),
        many => {
            let entries: Vec<ArchiveEntry<'_>> = many
                .iter()
                .map(|(item, image)| {
                    ArchiveEntry::raw(item.name(), &image.bytes, image.codec.mime_type())
                })
                .collect();
            Ok(Download::Archive {
                file_name: default_archive_filename(today),
                archive: assemble(&entries)?,
            })
        }
    }
}

/// `compressed-<stem>.<ext>`, with the extension of the codec actually produced.
///
/// # Arguments
/// * `original_name` - Name the item was submitted under
/// * `extension` - Extension of the output codec
///
/// # Returns
/// * File name, using `image` as the stem when the original has none
pub fn single_file_name(original_name: &str, extension: &str) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_string());
    format!("compressed-{}.{}", stem, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_file_name() {
        assert_eq!(single_file_name("photo.png", "webp"), "compressed-photo.webp");
        assert_eq!(single_file_name("archive.tar.gz", "jpg"), "compressed-archive.tar.jpg");
        assert_eq!(single_file_name("", "png"), "compressed-image.png");
    }

    #[test]
    fn test_nothing_compressed_is_invalid_input() {
        let items = vec![ImageItem::new("a.png", "image/png", vec![1, 2, 3])];
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(matches!(
            prepare_download(&items, date),
            Err(CompressionError::InvalidInput(_))
        ));
        assert!(matches!(
            prepare_download(&[], date),
            Err(CompressionError::InvalidInput(_))
        ));
    }
}
