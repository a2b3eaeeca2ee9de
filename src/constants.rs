pub const DEFAULT_QUALITY: u8 = 80;
pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 100;

pub const MIN_PNG_EFFORT: u8 = 1;
pub const MAX_PNG_EFFORT: u8 = 10;
pub const MAX_OXIPNG_PRESET: u8 = 6;

pub const ZOPFLI_ITERATIONS: u8 = 15;
pub const LIBDEFLATER_HIGH_LEVEL: u8 = 12;
pub const LIBDEFLATER_LOW_LEVEL: u8 = 8;
pub const ZOPFLI_MIN_EFFORT: u8 = 9;
pub const LIBDEFLATER_HIGH_MIN_EFFORT: u8 = 7;

/// Maximum accepted source payload (100MiB)
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const MAX_IMAGE_DIMENSION: u32 = 16_384;

pub const MAX_BATCH_FILES: usize = 10_000;
pub const MIN_AVAILABLE_MEMORY_MIB: u64 = 256;
/// Timed transcode threads allowed per CPU, abandoned ones included
pub const MAX_TRANSCODE_HELPERS_PER_CPU: usize = 2;

pub const ARCHIVE_COMPRESSION_LEVEL: i64 = 9;
pub const ARCHIVE_MEMBER_PREFIX: &str = "compressed";
pub const ARCHIVE_FILE_PREFIX: &str = "compressed-images";
pub const MEMBER_TOKEN_LEN: usize = 7;

pub const DATA_URL_SCHEME: &str = "data:";
pub const DATA_URL_BASE64_MARKER: &str = ";base64";

pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "bmp", "tiff", "tif", "gif", "avif",
];

/// Multiplier applied to a payload's size to estimate decoded memory use.
pub fn decoded_memory_multiplier(mime_type: &str) -> f64 {
    match mime_subtype(mime_type).as_str() {
        "jpeg" | "jpg" => 4.0,
        "png" => 3.0,
        "webp" => 3.5,
        "bmp" | "tiff" => 1.2,
        "gif" => 2.0,
        "avif" => 4.0,
        _ => 3.0,
    }
}

/// Lowercased MIME subtype with any parameters stripped (`image/PNG; q=1` -> `png`).
pub fn mime_subtype(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .and_then(|essence| essence.split('/').nth(1))
        .map(|subtype| subtype.trim().to_ascii_lowercase())
        .unwrap_or_default()
}
