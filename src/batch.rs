use crate::constants::{
    decoded_memory_multiplier, DEFAULT_QUALITY, MAX_QUALITY, MIN_AVAILABLE_MEMORY_MIB, MIN_QUALITY,
};
use crate::error::{CompressionError, ErrorKind, Result};
use crate::formats::{resolve, Codec, FormatToken};
use crate::item::{CompressedImage, ImageItem, ItemId};
use crate::stats::reduction_percentage;
use crate::transcode::{transcode_within, ImageCodec, Transcode};
use rayon::prelude::*;
use serde::Serialize;
use std::time::{Duration, Instant};
use sysinfo::{MemoryRefreshKind, RefreshKind, System};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct CompressionOptions {
    pub quality: u8,
    pub format: FormatToken,
    /// Upper bound on a single item's transcode
    pub timeout: Option<Duration>,
}

impl CompressionOptions {
    /// Validated options.
    ///
    /// # Arguments
    /// * `quality` - 1-100, defaults to 80
    /// * `format` - Format token; missing or empty keeps the source format
    ///
    /// # Returns
    /// * `Ok(options)` - Ready to use
    /// * `Err(CompressionError::InvalidQuality)` - Quality outside 1-100
    pub fn new(quality: Option<u8>, format: Option<&str>) -> Result<Self> {
        let quality = quality.unwrap_or(DEFAULT_QUALITY);
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
            return Err(CompressionError::InvalidQuality(quality));
        }

        let format = match format {
            Some(token) => token.parse().unwrap_or_default(),
            None => FormatToken::default(),
        };

        Ok(Self {
            quality,
            format,
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            format: FormatToken::default(),
            timeout: None,
        }
    }
}

/// What happened to one item, reported as soon as it is known.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompressionOutcome {
    Compressed {
        id: ItemId,
        name: String,
        original_size: u64,
        compressed_size: u64,
        reduction: f64,
        output_format: Codec,
    },
    Failed {
        id: ItemId,
        name: String,
        kind: ErrorKind,
        error: String,
    },
}

impl CompressionOutcome {
    pub fn id(&self) -> ItemId {
        match self {
            CompressionOutcome::Compressed { id, .. } | CompressionOutcome::Failed { id, .. } => *id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CompressionOutcome::Compressed { name, .. }
            | CompressionOutcome::Failed { name, .. } => name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CompressionOutcome::Compressed { .. })
    }

    /// A failure that a later [`compress_one`] on the same item may fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CompressionOutcome::Failed { kind, .. } if kind.is_retryable())
    }
}

/// Compresses one `Idle` or `Failed` item with the default codec.
///
/// # Returns
/// * `Ok(outcome)` once the item has reached `Compressed` or `Failed`
/// * `Err(CompressionError::InvalidInput)` if the item is `Compressing` or
///   already `Compressed`; the item is left untouched
pub fn compress_one(item: &mut ImageItem, options: &CompressionOptions) -> Result<CompressionOutcome> {
    compress_one_with(&ImageCodec, item, options)
}

pub fn compress_one_with<C>(
    codec: &C,
    item: &mut ImageItem,
    options: &CompressionOptions,
) -> Result<CompressionOutcome>
where
    C: Transcode + Clone + 'static,
{
    item.begin_compressing(false)?;
    Ok(run_compression(codec, item, options))
}

/// User-initiated re-compress; unlike [`compress_one`] this accepts a
/// `Compressed` item and replaces its result.
pub fn recompress(item: &mut ImageItem, options: &CompressionOptions) -> Result<CompressionOutcome> {
    recompress_with(&ImageCodec, item, options)
}

pub fn recompress_with<C>(
    codec: &C,
    item: &mut ImageItem,
    options: &CompressionOptions,
) -> Result<CompressionOutcome>
where
    C: Transcode + Clone + 'static,
{
    item.begin_compressing(true)?;
    Ok(run_compression(codec, item, options))
}

fn run_compression<C>(codec: &C, item: &mut ImageItem, options: &CompressionOptions) -> CompressionOutcome
where
    C: Transcode + Clone + 'static,
{
    let resolution = resolve(item.mime_type(), &options.format, options.quality);
    debug!(
        id = %item.id(),
        name = item.name(),
        codec = %resolution.codec,
        quality = resolution.quality.value(),
        "Compressing"
    );

    let result = match options.timeout {
        Some(limit) => transcode_within(codec, item.shared_source(), resolution, limit),
        None => codec.transcode(item.source(), &resolution),
    };

    match result {
        Ok(bytes) => {
            let original_size = item.original_size();
            let compressed_size = bytes.len() as u64;
            let reduction = reduction_percentage(original_size, compressed_size);
            item.finish_compressed(CompressedImage {
                bytes,
                codec: resolution.codec,
                compressed_size,
                reduction,
            });
            debug!(id = %item.id(), original_size, compressed_size, reduction, "Compressed");

            CompressionOutcome::Compressed {
                id: item.id(),
                name: item.name().to_string(),
                original_size,
                compressed_size,
                reduction,
                output_format: resolution.codec,
            }
        }
        Err(e) => {
            warn!(id = %item.id(), name = item.name(), error = %e, "Failed to compress");
            let kind = e.kind();
            item.finish_failed(e.to_string());

            CompressionOutcome::Failed {
                id: item.id(),
                name: item.name().to_string(),
                kind,
                error: item.error().unwrap_or_default().to_string(),
            }
        }
    }
}

/// Compresses every `Idle` item, one after another, in slice order.
///
/// `on_outcome` sees each outcome as soon as its item resolves. A failing item
/// never stops the ones after it.
///
/// # Arguments
/// * `items` - The batch; only `Idle` items are touched
/// * `options` - Quality, format and optional timeout
/// * `on_outcome` - Progress callback
///
/// # Returns
/// * One outcome per item that was attempted
pub fn compress_all_pending<F>(
    items: &mut [ImageItem],
    options: &CompressionOptions,
    on_outcome: F,
) -> Vec<CompressionOutcome>
where
    F: FnMut(&CompressionOutcome),
{
    compress_all_pending_with(&ImageCodec, items, options, on_outcome)
}

pub fn compress_all_pending_with<C, F>(
    codec: &C,
    items: &mut [ImageItem],
    options: &CompressionOptions,
    mut on_outcome: F,
) -> Vec<CompressionOutcome>
where
    C: Transcode + Clone + 'static,
    F: FnMut(&CompressionOutcome),
{
    let start_time = Instant::now();
    let mut outcomes = Vec::new();

    for item in items.iter_mut().filter(|item| item.is_idle()) {
        match compress_one_with(codec, item, options) {
            Ok(outcome) => {
                on_outcome(&outcome);
                outcomes.push(outcome);
            }
            Err(e) => warn!(id = %item.id(), error = %e, "Skipped item"),
        }
    }

    log_summary(&outcomes, start_time);
    outcomes
}

/// Concurrent variant of [`compress_all_pending`] on a bounded worker pool.
///
/// Each worker holds exactly one item at a time. The pool size is the smallest
/// of `workers` (or the CPU count), the number of pending items, and what the
/// available memory allows. Outcomes are returned in slice order.
///
/// With a timeout set, a timed-out item's helper thread keeps running, and
/// keeps its decode buffers, after the worker has moved on. Memory can then
/// exceed what the pool size was planned for. [`transcode_within`] caps the
/// number of live helpers and fails new items fast once the cap is hit.
///
/// # Arguments
/// * `items` - The batch; only `Idle` items are touched
/// * `options` - Quality, format and optional timeout
/// * `workers` - Requested pool size; `None` uses the CPU count
/// * `on_outcome` - Progress callback, called from worker threads
///
/// # Returns
/// * One outcome per item that was attempted, in slice order
pub fn compress_all_pending_parallel<F>(
    items: &mut [ImageItem],
    options: &CompressionOptions,
    workers: Option<usize>,
    on_outcome: F,
) -> Vec<CompressionOutcome>
where
    F: Fn(&CompressionOutcome) + Sync,
{
    compress_all_pending_parallel_with(&ImageCodec, items, options, workers, on_outcome)
}

pub fn compress_all_pending_parallel_with<C, F>(
    codec: &C,
    items: &mut [ImageItem],
    options: &CompressionOptions,
    workers: Option<usize>,
    on_outcome: F,
) -> Vec<CompressionOutcome>
where
    C: Transcode + Clone + 'static,
    F: Fn(&CompressionOutcome) + Sync,
{
    let estimates: Vec<f64> = items
        .iter()
        .filter(|item| item.is_idle())
        .map(estimate_item_memory_mib)
        .collect();
    if estimates.is_empty() {
        return Vec::new();
    }

    let worker_count = plan_workers(&estimates, workers);
    info!(
        pending = estimates.len(),
        workers = worker_count,
        "Compressing pending items in parallel"
    );

    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count)
        .thread_name(|i| format!("squeeze-worker-{}", i))
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            warn!(error = %e, "Failed to build worker pool, compressing sequentially");
            return compress_all_pending_with(codec, items, options, &on_outcome);
        }
    };

    let start_time = Instant::now();
    let pending: Vec<&mut ImageItem> = items.iter_mut().filter(|item| item.is_idle()).collect();

    let outcomes: Vec<CompressionOutcome> = pool.install(|| {
        pending
            .into_par_iter()
            .filter_map(|item| match compress_one_with(codec, item, options) {
                Ok(outcome) => {
                    on_outcome(&outcome);
                    Some(outcome)
                }
                Err(e) => {
                    warn!(id = %item.id(), error = %e, "Skipped item");
                    None
                }
            })
            .collect()
    });

    log_summary(&outcomes, start_time);
    outcomes
}

fn log_summary(outcomes: &[CompressionOutcome], start_time: Instant) {
    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    info!(
        processed = outcomes.len(),
        compressed = outcomes.len() - failed,
        failed,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Batch compression finished"
    );
}

/// Estimated peak memory for one in-flight item: the decoded pixels plus the
/// source and encoded buffers.
pub fn estimate_item_memory_mib(item: &ImageItem) -> f64 {
    let size_mib = item.original_size() as f64 / (1024.0 * 1024.0);
    size_mib * (decoded_memory_multiplier(item.mime_type()) + 2.0)
}

/// Worker count for a batch, bounded by request/CPUs, item count and memory.
///
/// # Arguments
/// * `estimates_mib` - Estimated peak memory of each pending item
/// * `requested` - Requested workers; `None` uses the CPU count
///
/// # Returns
/// * A worker count of at least 1
pub fn plan_workers(estimates_mib: &[f64], requested: Option<usize>) -> usize {
    let mut sys =
        System::new_with_specifics(RefreshKind::new().with_memory(MemoryRefreshKind::new()));
    sys.refresh_memory();
    let available_mib = sys.available_memory() / (1024 * 1024);

    worker_cap(
        estimates_mib,
        requested.unwrap_or_else(num_cpus::get),
        available_mib,
    )
}

fn worker_cap(estimates_mib: &[f64], requested: usize, available_mib: u64) -> usize {
    let baseline = requested.min(estimates_mib.len()).max(1);
    if estimates_mib.is_empty() {
        return baseline;
    }

    let average = estimates_mib.iter().sum::<f64>() / estimates_mib.len() as f64;
    let per_item_mib = (average.ceil() as u64).max(1);
    let memory_cap = available_mib.saturating_sub(MIN_AVAILABLE_MEMORY_MIB) / per_item_mib;

    (memory_cap as usize).clamp(1, baseline)
}
