use crate::constants::{
    LIBDEFLATER_HIGH_LEVEL, LIBDEFLATER_HIGH_MIN_EFFORT, LIBDEFLATER_LOW_LEVEL, MAX_FILE_SIZE,
    MAX_IMAGE_DIMENSION, MAX_OXIPNG_PRESET, MAX_TRANSCODE_HELPERS_PER_CPU, MAX_PNG_EFFORT, MIN_PNG_EFFORT, ZOPFLI_ITERATIONS,
    ZOPFLI_MIN_EFFORT,
};
use crate::error::{CompressionError, Result};
use crate::formats::{Codec, EncoderQuality, Resolution};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, GenericImageView};
use oxipng::{Deflaters, Options};
use std::num::NonZeroU8;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Re-encodes a decodable image under a resolved codec and quality.
///
/// Implementations must not retry and must leave `source` untouched.
pub trait Transcode: Send + Sync {
    fn transcode(&self, source: &[u8], resolution: &Resolution) -> Result<Vec<u8>>;
}

/// Production transcoder backed by `image`, `oxipng` and `webp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl Transcode for ImageCodec {
    fn transcode(&self, source: &[u8], resolution: &Resolution) -> Result<Vec<u8>> {
        let img = decode_source(source)?;
        let encoded = match (resolution.codec, resolution.quality) {
            (Codec::Jpeg, EncoderQuality::Lossy(q)) => encode_jpeg(&img, q)?,
            (Codec::WebP, EncoderQuality::Lossy(q)) => encode_webp(&img, q)?,
            (Codec::Png, EncoderQuality::Effort(effort)) => encode_png(&img, effort)?,
            (codec, quality) => {
                return Err(CompressionError::Codec(format!(
                    "{} cannot encode with {:?}",
                    codec, quality
                )))
            }
        };

        debug!(
            codec = %resolution.codec,
            quality = resolution.quality.value(),
            original = source.len(),
            compressed = encoded.len(),
            "Transcoded image"
        );
        Ok(encoded)
    }
}

/// Transcode with the default [`ImageCodec`].
pub fn transcode(source: &[u8], resolution: &Resolution) -> Result<Vec<u8>> {
    ImageCodec.transcode(source, resolution)
}

/// Counts helper threads started by [`transcode_within`] that have not exited yet.
struct HelperSlots {
    live: AtomicUsize,
}

impl HelperSlots {
    const fn new() -> Self {
        Self {
            live: AtomicUsize::new(0),
        }
    }

    fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn try_acquire(&'static self, max: usize) -> Option<HelperSlot> {
        self.live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < max).then_some(n + 1))
            .ok()
            .map(|_| HelperSlot(self))
    }
}

/// Held by a helper thread for as long as it runs.
struct HelperSlot(&'static HelperSlots);

impl Drop for HelperSlot {
    fn drop(&mut self) {
        self.0.live.fetch_sub(1, Ordering::SeqCst);
    }
}

static HELPERS: HelperSlots = HelperSlots::new();

fn max_helpers() -> usize {
    num_cpus::get().max(1) * MAX_TRANSCODE_HELPERS_PER_CPU
}

/// Run a transcode on a helper thread and give up after `limit`.
///
/// The helper keeps running after a timeout and keeps its copy of the source
/// alive until it finishes; its result is dropped. At most
/// `MAX_TRANSCODE_HELPERS_PER_CPU` helpers per CPU may be alive at once, so a
/// run of timeouts cannot pile up unbounded work.
///
/// # Arguments
/// * `codec` - Transcoder to run on the helper
/// * `source` - Shared source bytes
/// * `resolution` - Target codec and quality
/// * `limit` - How long to wait for the result
///
/// # Returns
/// * `Ok(bytes)` - The encoded image
/// * `Err(CompressionError::Timeout)` - If no result arrived within `limit`
/// * `Err(CompressionError::Codec)` - If too many earlier helpers are still running
pub fn transcode_within<C>(
    codec: &C,
    source: Arc<[u8]>,
    resolution: Resolution,
    limit: Duration,
) -> Result<Vec<u8>>
where
    C: Transcode + Clone + 'static,
{
    let max = max_helpers();
    let slot = HELPERS.try_acquire(max).ok_or_else(|| {
        warn!(live = HELPERS.live(), max, "Too many transcodes still running");
        CompressionError::Codec(format!(
            "{} earlier transcodes are still running, try again later",
            HELPERS.live()
        ))
    })?;

    let (tx, rx) = mpsc::channel();
    let worker = codec.clone();
    thread::Builder::new()
        .name("transcode".to_string())
        .spawn(move || {
            let result = worker.transcode(&source, &resolution);
            drop(slot);
            let _ = tx.send(result);
        })?;

    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(CompressionError::Timeout(limit)),
        Err(RecvTimeoutError::Disconnected) => Err(CompressionError::Codec(
            "transcoder stopped without a result".to_string(),
        )),
    }
}

/// Decodes source bytes, enforcing the size and dimension limits.
///
/// # Returns
/// * `Err(CompressionError::UnsupportedInput)` if the bytes are not a decodable image
/// * `Err(CompressionError::FileTooLarge)` / `InvalidDimensions` when limits are exceeded
pub fn decode_source(source: &[u8]) -> Result<DynamicImage> {
    let size = source.len() as u64;
    if size > MAX_FILE_SIZE {
        return Err(CompressionError::FileTooLarge(size, MAX_FILE_SIZE));
    }

    let img = image::load_from_memory(source)
        .map_err(|e| CompressionError::UnsupportedInput(e.to_string()))?;

    let (width, height) = img.dimensions();
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(CompressionError::InvalidDimensions(
            width,
            height,
            MAX_IMAGE_DIMENSION,
        ));
    }

    Ok(img)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| CompressionError::Codec(e.to_string()))?;
    Ok(buffer)
}

fn encode_webp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgba = img.to_rgba8();
    let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
    let memory = encoder
        .encode_simple(false, f32::from(quality))
        .map_err(|e| CompressionError::Codec(format!("WebP encoding failed: {:?}", e)))?;
    Ok(memory.to_vec())
}

fn encode_png(img: &DynamicImage, effort: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut buffer, CompressionType::Fast, FilterType::Adaptive);
    img.write_with_encoder(encoder)
        .map_err(|e| CompressionError::Codec(e.to_string()))?;

    oxipng::optimize_from_memory(&buffer, &oxipng_options(effort))
        .map_err(|e| CompressionError::Codec(format!("PNG optimization failed: {}", e)))
}

/// oxipng settings for a 1-10 effort level.
pub fn oxipng_options(effort: u8) -> Options {
    let effort = effort.clamp(MIN_PNG_EFFORT, MAX_PNG_EFFORT);
    let preset = (effort - MIN_PNG_EFFORT) * MAX_OXIPNG_PRESET / (MAX_PNG_EFFORT - MIN_PNG_EFFORT);

    let mut options = Options::from_preset(preset);
    options.force = true;
    options.deflate = if effort >= ZOPFLI_MIN_EFFORT {
        Deflaters::Zopfli {
            iterations: NonZeroU8::new(ZOPFLI_ITERATIONS).unwrap_or(NonZeroU8::MIN),
        }
    } else if effort >= LIBDEFLATER_HIGH_MIN_EFFORT {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_HIGH_LEVEL,
        }
    } else {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_LOW_LEVEL,
        }
    };
    options
}
