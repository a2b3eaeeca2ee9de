pub mod archive;
pub mod batch;
pub mod cli;
pub mod commands;
pub mod constants;
pub mod data_url;
pub mod download;
pub mod error;
pub mod formats;
pub mod input;
pub mod item;
pub mod logger;
pub mod session;
pub mod stats;
pub mod transcode;
pub mod utils;
pub mod validation;

pub use archive::{
    assemble, default_archive_filename, ArchiveEntry, ArchiveRequest, ArchiveRequestImage,
    AssembledArchive, SkippedEntry,
};
pub use batch::{
    compress_all_pending, compress_all_pending_parallel, compress_one, recompress,
    CompressionOptions, CompressionOutcome,
};
pub use download::{prepare_download, Download};
pub use error::{CompressionError, ErrorKind, Result};
pub use formats::{resolve, Codec, EncoderQuality, FormatToken, Resolution};
pub use item::{CompressedImage, ImageItem, ItemId, ItemStatus};
pub use session::Batch;
pub use stats::{aggregate, reduction_percentage, BatchStats};
pub use transcode::{transcode, ImageCodec, Transcode};
