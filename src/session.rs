use crate::archive::today;
use crate::batch::{
    compress_all_pending, compress_all_pending_parallel, compress_one, recompress,
    CompressionOptions, CompressionOutcome,
};
use crate::constants::MAX_BATCH_FILES;
use crate::download::{prepare_download, Download};
use crate::error::{CompressionError, Result};
use crate::item::{ImageItem, ItemId};
use crate::stats::{aggregate, BatchStats};
use crate::validation::validate_source;
use tracing::debug;

/// Images and options for one session.
///
/// Owns all mutable state; the compression, statistics and archive functions
/// only ever see what this hands them.
#[derive(Debug, Default)]
pub struct Batch {
    items: Vec<ImageItem>,
    options: CompressionOptions,
}

impl Batch {
    pub fn new(options: CompressionOptions) -> Self {
        Self {
            items: Vec::new(),
            options,
        }
    }

    /// Accept a file into the batch as `Idle`.
    ///
    /// # Returns
    /// * `Err(CompressionError::InvalidInput)` for empty or non-image input
    /// * `Err(CompressionError::BatchFileLimitExceeded)` when the batch is full
    pub fn add(&mut self, name: &str, mime_type: &str, bytes: Vec<u8>) -> Result<ItemId> {
        validate_source(name, mime_type, &bytes)?;
        if self.items.len() >= MAX_BATCH_FILES {
            return Err(CompressionError::BatchFileLimitExceeded(
                self.items.len() + 1,
                MAX_BATCH_FILES,
            ));
        }

        let item = ImageItem::new(name, mime_type, bytes);
        let id = item.id();
        debug!(%id, name, mime_type, size = item.original_size(), "Added image");
        self.items.push(item);
        Ok(id)
    }

    /// Drop an item from the batch.
    ///
    /// # Returns
    /// * `Some(item)` - The removed item
    /// * `None` - If no item has this id
    pub fn remove(&mut self, id: ItemId) -> Option<ImageItem> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[ImageItem] {
        &self.items
    }

    pub fn get(&self, id: ItemId) -> Option<&ImageItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn options(&self) -> &CompressionOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: CompressionOptions) {
        self.options = options;
    }

    pub fn pending_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_idle()).count()
    }

    /// Compress (or retry) one item with the batch options.
    ///
    /// # Arguments
    /// * `id` - Item to compress; must be `Idle` or `Failed`
    ///
    /// # Returns
    /// * `Ok(outcome)` - The item ended `Compressed` or `Failed`
    /// * `Err(CompressionError::InvalidInput)` - Unknown id, or the item is busy or done
    pub fn compress(&mut self, id: ItemId) -> Result<CompressionOutcome> {
        let options = self.options.clone();
        compress_one(self.item_mut(id)?, &options)
    }

    /// Re-compress an item even if it is already `Compressed`, e.g. after
    /// the options changed.
    pub fn recompress(&mut self, id: ItemId) -> Result<CompressionOutcome> {
        let options = self.options.clone();
        recompress(self.item_mut(id)?, &options)
    }

    /// Compress every `Idle` item in order, reporting each outcome to `on_outcome`.
    pub fn compress_pending<F>(&mut self, on_outcome: F) -> Vec<CompressionOutcome>
    where
        F: FnMut(&CompressionOutcome),
    {
        compress_all_pending(&mut self.items, &self.options, on_outcome)
    }

    /// Like [`Batch::compress_pending`], on at most `workers` threads.
    ///
    /// # Arguments
    /// * `workers` - Upper bound on pool size; `None` uses the CPU count
    /// * `on_outcome` - Called from worker threads as items resolve
    ///
    /// # Returns
    /// * Outcomes in batch order
    pub fn compress_pending_parallel<F>(
        &mut self,
        workers: Option<usize>,
        on_outcome: F,
    ) -> Vec<CompressionOutcome>
    where
        F: Fn(&CompressionOutcome) + Sync,
    {
        compress_all_pending_parallel(&mut self.items, &self.options, workers, on_outcome)
    }

    /// Current statistics; `None` until something is compressed.
    pub fn stats(&self) -> Option<BatchStats> {
        aggregate(&self.items)
    }

    /// Single file or dated ZIP, depending on how many items are compressed.
    ///
    /// # Returns
    /// * `Ok(Download::Single)` - Exactly one item is compressed
    /// * `Ok(Download::Archive)` - Several items are compressed
    /// * `Err(CompressionError::InvalidInput)` - Nothing is compressed yet
    pub fn download(&self) -> Result<Download> {
        prepare_download(&self.items, today())
    }

    fn item_mut(&mut self, id: ItemId) -> Result<&mut ImageItem> {
        self.items
            .iter_mut()
            .find(|item| item.id() == id)
            .ok_or_else(|| CompressionError::InvalidInput(format!("Unknown item {}", id)))
    }
}
