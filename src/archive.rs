//! Packs compressed buffers into a single ZIP download.

use crate::constants::{
    mime_subtype, ARCHIVE_COMPRESSION_LEVEL, ARCHIVE_FILE_PREFIX, ARCHIVE_MEMBER_PREFIX,
    MEMBER_TOKEN_LEN,
};
use crate::data_url;
use crate::error::{CompressionError, Result};
use crate::item::ImageItem;
use chrono::{NaiveDate, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Where an entry's bytes come from
#[derive(Debug, Clone)]
pub enum EntrySource<'a> {
    /// Compressed bytes and the MIME type they were encoded as
    Raw { bytes: &'a [u8], mime_type: &'a str },
    /// A `data:` URL carrying both
    Encoded(&'a str),
    /// Nothing to pack
    Missing,
}

#[derive(Debug, Clone)]
pub struct ArchiveEntry<'a> {
    /// Used in logs and skip reports only, never as a member name
    pub label: String,
    pub source: EntrySource<'a>,
}

impl<'a> ArchiveEntry<'a> {
    pub fn raw(label: impl Into<String>, bytes: &'a [u8], mime_type: &'a str) -> Self {
        Self {
            label: label.into(),
            source: EntrySource::Raw { bytes, mime_type },
        }
    }

    pub fn encoded(label: impl Into<String>, url: &'a str) -> Self {
        Self {
            label: label.into(),
            source: EntrySource::Encoded(url),
        }
    }

    pub fn missing(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            source: EntrySource::Missing,
        }
    }
}

/// An entry that could not be decoded and was left out of the archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEntry {
    pub index: usize,
    pub label: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct AssembledArchive {
    pub bytes: Vec<u8>,
    /// Member names in write order
    pub members: Vec<String>,
    pub skipped: Vec<SkippedEntry>,
}

/// Writes every usable entry into one ZIP, Deflate level 9.
///
/// Entries without bytes are passed over. Encoded entries that fail to decode
/// are skipped and listed in [`AssembledArchive::skipped`]; the rest still go
/// in. Writer failures abort the whole archive.
///
/// # Returns
/// * `Err(CompressionError::InvalidInput)` when `entries` is empty or nothing usable remains
/// * `Err(CompressionError::Archive)` when the ZIP writer fails
pub fn assemble(entries: &[ArchiveEntry<'_>]) -> Result<AssembledArchive> {
    if entries.is_empty() {
        return Err(CompressionError::InvalidInput(
            "No images provided".to_string(),
        ));
    }

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(ARCHIVE_COMPRESSION_LEVEL));
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut namer = MemberNamer::default();
    let mut members = Vec::new();
    let mut skipped = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        let (mime_type, bytes): (Cow<'_, str>, Cow<'_, [u8]>) = match &entry.source {
            EntrySource::Raw { bytes, mime_type } => {
                (Cow::Borrowed(*mime_type), Cow::Borrowed(*bytes))
            }
            EntrySource::Encoded(url) => match data_url::decode(url) {
                Ok((mime_type, bytes)) => (Cow::Owned(mime_type), Cow::Owned(bytes)),
                Err(e) => {
                    warn!(index, label = %entry.label, error = %e, "Skipping archive entry");
                    skipped.push(SkippedEntry {
                        index,
                        label: entry.label.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            },
            EntrySource::Missing => {
                debug!(index, label = %entry.label, "No bytes for archive entry");
                continue;
            }
        };

        if bytes.is_empty() {
            debug!(index, label = %entry.label, "No bytes for archive entry");
            continue;
        }

        let name = namer.next_name(&extension_for(&mime_type));
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| CompressionError::Archive(format!("Failed to start {}: {}", name, e)))?;
        writer
            .write_all(&bytes)
            .map_err(|e| CompressionError::Archive(format!("Failed to write {}: {}", name, e)))?;
        members.push(name);
    }

    if members.is_empty() {
        return Err(CompressionError::InvalidInput(
            "No valid images to archive".to_string(),
        ));
    }

    let bytes = writer
        .finish()
        .map_err(|e| CompressionError::Archive(format!("Failed to finish archive: {}", e)))?
        .into_inner();

    info!(
        members = members.len(),
        skipped = skipped.len(),
        size = bytes.len(),
        "Assembled archive"
    );

    Ok(AssembledArchive {
        bytes,
        members,
        skipped,
    })
}

/// Member file extension for a MIME type: its subtype, or `bin`.
pub fn extension_for(mime_type: &str) -> String {
    let subtype = mime_subtype(mime_type);
    if subtype.is_empty() {
        "bin".to_string()
    } else {
        subtype.replace(['/', '\\'], "_")
    }
}

/// `compressed-images-YYYY-MM-DD.zip`
pub fn default_archive_filename(date: NaiveDate) -> String {
    format!("{}-{}.zip", ARCHIVE_FILE_PREFIX, date.format("%Y-%m-%d"))
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Hands out `compressed-<millis>-<token>.<ext>` names, unique per archive.
#[derive(Debug, Default)]
struct MemberNamer {
    used: HashSet<String>,
}

impl MemberNamer {
    fn next_name(&mut self, extension: &str) -> String {
        loop {
            let name = format!(
                "{}-{}-{}.{}",
                ARCHIVE_MEMBER_PREFIX,
                Utc::now().timestamp_millis(),
                random_token(),
                extension
            );
            if self.used.insert(name.clone()) {
                return name;
            }
        }
    }
}

fn random_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(MEMBER_TOKEN_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// One image in an archive request, as produced by a compress response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchiveRequestImage {
    pub id: String,
    pub compressed_url: String,
    pub compressed_size: u64,
    pub original_size: u64,
    pub compression_ratio: f64,
}

impl ArchiveRequestImage {
    /// Compressed form of `item`, or `None` if it has not been compressed.
    pub fn from_item(item: &ImageItem) -> Option<Self> {
        let image = item.compressed()?;
        Some(Self {
            id: item.id().to_string(),
            compressed_url: data_url::encode(image.codec.mime_type(), &image.bytes),
            compressed_size: image.compressed_size,
            original_size: item.original_size(),
            compression_ratio: image.reduction,
        })
    }
}

/// Body of an archive request: `{ "images": [...] }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveRequest {
    pub images: Vec<ArchiveRequestImage>,
}

impl ArchiveRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn entries(&self) -> Vec<ArchiveEntry<'_>> {
        self.images
            .iter()
            .enumerate()
            .map(|(index, image)| {
                let label = if image.id.is_empty() {
                    format!("#{}", index)
                } else {
                    image.id.clone()
                };
                if image.compressed_url.is_empty() {
                    ArchiveEntry::missing(label)
                } else {
                    ArchiveEntry::encoded(label, &image.compressed_url)
                }
            })
            .collect()
    }

    pub fn assemble(&self) -> Result<AssembledArchive> {
        assemble(&self.entries())
    }
}
