use crate::error::{CompressionError, Result};
use crate::formats::Codec;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque identity of an item, stable for as long as it stays in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a successful transcode, owned by a `Compressed` item.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedImage {
    pub bytes: Vec<u8>,
    pub codec: Codec,
    pub compressed_size: u64,
    pub reduction: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemStatus {
    Idle,
    Compressing,
    Compressed(CompressedImage),
    Failed { error: String },
}

impl ItemStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Idle => "idle",
            ItemStatus::Compressing => "compressing",
            ItemStatus::Compressed(_) => "compressed",
            ItemStatus::Failed { .. } => "failed",
        }
    }
}

/// One submitted image and where it is in its compression lifecycle.
#[derive(Debug, Clone)]
pub struct ImageItem {
    id: ItemId,
    name: String,
    mime_type: String,
    source: Arc<[u8]>,
    status: ItemStatus,
}

impl ImageItem {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, source: Vec<u8>) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            mime_type: mime_type.into(),
            source: Arc::from(source),
            status: ItemStatus::Idle,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub(crate) fn shared_source(&self) -> Arc<[u8]> {
        Arc::clone(&self.source)
    }

    pub fn original_size(&self) -> u64 {
        self.source.len() as u64
    }

    pub fn status(&self) -> &ItemStatus {
        &self.status
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.status, ItemStatus::Idle)
    }

    pub fn compressed(&self) -> Option<&CompressedImage> {
        match &self.status {
            ItemStatus::Compressed(image) => Some(image),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            ItemStatus::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// `Idle -> Compressing`, or `Failed -> Compressing` as a retry.
    /// `Compressed` items only re-enter when `allow_recompress` is set.
    pub(crate) fn begin_compressing(&mut self, allow_recompress: bool) -> Result<()> {
        let ready = match self.status {
            ItemStatus::Idle | ItemStatus::Failed { .. } => true,
            ItemStatus::Compressed(_) => allow_recompress,
            ItemStatus::Compressing => false,
        };
        if !ready {
            return Err(CompressionError::InvalidInput(format!(
                "{} is {} and cannot be compressed again",
                self.name,
                self.status.label()
            )));
        }
        self.status = ItemStatus::Compressing;
        Ok(())
    }

    pub(crate) fn finish_compressed(&mut self, image: CompressedImage) {
        self.status = ItemStatus::Compressed(image);
    }

    pub(crate) fn finish_failed(&mut self, error: String) {
        let error = if error.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            error
        };
        self.status = ItemStatus::Failed { error };
    }
}
