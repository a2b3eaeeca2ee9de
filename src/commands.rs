//! Handlers behind the `compress`, `batch` and `pack` subcommands.

use crate::archive::{default_archive_filename, today, ArchiveRequest, ArchiveRequestImage};
use crate::batch::{CompressionOptions, CompressionOutcome};
use crate::download::{single_file_name, Download};
use crate::formats::{Codec, FormatToken};
use crate::input::{collect_image_files, read_source_file};
use crate::item::ImageItem;
use crate::session::Batch;
use crate::stats::BatchStats;
use crate::utils::{create_progress_bar, format_file_size};
use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Options shared by `compress` and `batch`, validated up front.
pub fn build_options(
    quality: Option<u8>,
    format: Option<&str>,
    timeout_secs: Option<u64>,
) -> Result<CompressionOptions> {
    let options = CompressionOptions::new(quality, format)?;
    if !options.format.is_recognized() {
        warn!(
            format = %options.format,
            accepted = %FormatToken::format_names().join(", "),
            "Unrecognized output format, falling back to {}",
            Codec::DEFAULT
        );
    }
    Ok(match timeout_secs {
        Some(0) => bail!("Timeout must be at least one second"),
        Some(secs) => options.with_timeout(Duration::from_secs(secs)),
        None => options,
    })
}

/// `{ success, data | error }`, the shape of a single compress response.
#[derive(Debug, Serialize)]
pub struct CompressResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ArchiveRequestImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Machine-readable batch result. Its `images` list doubles as a `pack` manifest.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<CompressionOutcome>,
    pub stats: Option<BatchStats>,
    pub images: Vec<ArchiveRequestImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<PathBuf>,
}

pub fn run_compress(
    input: &Path,
    output: Option<PathBuf>,
    options: CompressionOptions,
    json: bool,
) -> Result<()> {
    let source = read_source_file(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    if !json {
        println!("🗜️  Compressing image: {}", input.display());
    }

    let mut batch = Batch::new(options);
    let id = batch
        .add(&source.name, &source.mime_type, source.bytes)
        .with_context(|| format!("Rejected {}", input.display()))?;
    let outcome = batch.compress(id)?;

    if let CompressionOutcome::Failed { error, .. } = &outcome {
        if json {
            print_json(&CompressResponse {
                success: false,
                data: None,
                error: Some(error.clone()),
            })?;
        }
        bail!("Failed to compress {}: {}", input.display(), error);
    }

    let item = batch
        .get(id)
        .ok_or_else(|| anyhow!("Item {} disappeared from the batch", id))?;
    let image = item
        .compressed()
        .ok_or_else(|| anyhow!("{} has no compressed output", item.name()))?;

    let output_path = output.unwrap_or_else(|| {
        input
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(single_file_name(item.name(), image.codec.extension()))
    });
    fs::write(&output_path, &image.bytes)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    if json {
        return print_json(&CompressResponse {
            success: true,
            data: ArchiveRequestImage::from_item(item),
            error: None,
        });
    }

    println!("📁 Output: {}", output_path.display());
    println!("🎨 Format: {}", image.codec);
    println!(
        "📊 Original size: {}",
        format_file_size(item.original_size())
    );
    println!(
        "📈 Compressed size: {}",
        format_file_size(image.compressed_size)
    );
    print_reduction(image.reduction);
    Ok(())
}

pub struct BatchRun {
    pub input: String,
    pub output: PathBuf,
    pub options: CompressionOptions,
    pub recursive: bool,
    pub workers: Option<usize>,
    pub sequential: bool,
    pub zip: bool,
    pub json: bool,
}

pub fn run_batch(run: BatchRun) -> Result<()> {
    if !run.json {
        println!("🚀 Starting batch compression...");
        println!("📁 Input: {}", run.input);
        println!("📁 Output: {}", run.output.display());
    }

    let files = collect_image_files(&run.input, run.recursive)?;
    if files.is_empty() {
        warn!(input = %run.input, "No image files found in the input path");
        if run.json {
            print_json(&BatchReport {
                outcomes: Vec::new(),
                stats: None,
                images: Vec::new(),
                download: None,
            })?;
        }
        return Ok(());
    }
    info!(count = files.len(), "Found image files to process");

    let mut batch = Batch::new(run.options);
    for path in &files {
        let added = read_source_file(path)
            .and_then(|source| batch.add(&source.name, &source.mime_type, source.bytes));
        if let Err(e) = added {
            warn!(path = %path.display(), error = %e, "Skipping file");
        }
    }

    let pb = create_progress_bar(batch.pending_count() as u64);
    if run.json {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }
    let tick = |outcome: &CompressionOutcome| {
        pb.set_message(outcome.name().to_string());
        pb.inc(1);
    };
    let outcomes = if run.sequential {
        batch.compress_pending(tick)
    } else {
        batch.compress_pending_parallel(run.workers, tick)
    };
    pb.finish_with_message("done");

    fs::create_dir_all(&run.output)
        .with_context(|| format!("Failed to create {}", run.output.display()))?;

    let download = if run.zip {
        write_download(&batch, &run.output)?
    } else {
        write_each(batch.items(), &run.output)?;
        None
    };

    let stats = batch.stats();
    if run.json {
        return print_json(&BatchReport {
            images: batch
                .items()
                .iter()
                .filter_map(ArchiveRequestImage::from_item)
                .collect(),
            outcomes,
            stats,
            download,
        });
    }

    let failed: Vec<&CompressionOutcome> = outcomes.iter().filter(|o| !o.is_success()).collect();
    println!("\n📊 Batch Compression Summary:");
    println!(
        "  ✅ Compressed: {}/{}",
        outcomes.len() - failed.len(),
        outcomes.len()
    );
    for outcome in &failed {
        if let CompressionOutcome::Failed { name, error, .. } = outcome {
            println!("  ❌ {}: {}", name, error);
        }
    }
    if let Some(hint) = retry_hint(&outcomes) {
        println!("{}", hint);
    }
    if let Some(stats) = stats {
        println!(
            "  📊 Total original size: {}",
            format_file_size(stats.total_original)
        );
        println!(
            "  📊 Total compressed size: {}",
            format_file_size(stats.total_compressed)
        );
        print_reduction(stats.reduction);
    }
    if let Some(path) = download {
        println!("📦 Download: {}", path.display());
    }
    Ok(())
}

pub fn run_pack(manifest: &Path, output: Option<PathBuf>) -> Result<()> {
    let json = fs::read_to_string(manifest)
        .with_context(|| format!("Failed to read {}", manifest.display()))?;
    let request = ArchiveRequest::from_json(&json)
        .with_context(|| format!("Invalid manifest {}", manifest.display()))?;

    let archive = request.assemble()?;
    let output_path = output.unwrap_or_else(|| PathBuf::from(default_archive_filename(today())));
    fs::write(&output_path, &archive.bytes)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    println!(
        "📦 Packed {} image(s) into {}",
        archive.members.len(),
        output_path.display()
    );
    for skipped in &archive.skipped {
        println!("  ⚠️  Skipped {}: {}", skipped.label, skipped.reason);
    }
    Ok(())
}

/// Writes every compressed item as `<stem>.<codec ext>` in `output_dir`.
fn write_each(items: &[ImageItem], output_dir: &Path) -> Result<()> {
    for item in items {
        let Some(image) = item.compressed() else {
            continue;
        };
        let path = output_dir.join(output_file_name(item.name(), image.codec.extension()));
        fs::write(&path, &image.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

fn write_download(batch: &Batch, output_dir: &Path) -> Result<Option<PathBuf>> {
    if batch.items().iter().all(|item| item.compressed().is_none()) {
        warn!("Nothing was compressed, no download written");
        return Ok(None);
    }

    let download = batch.download()?;
    let path = output_dir.join(download.file_name());
    fs::write(&path, download.bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    if let Download::Archive { archive, .. } = &download {
        for skipped in &archive.skipped {
            warn!(entry = %skipped.label, reason = %skipped.reason, "Left out of archive");
        }
    }
    Ok(Some(path))
}

/// `<stem>.<ext>`, keeping the source's stem.
pub fn output_file_name(original_name: &str, extension: &str) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_string());
    format!("{}.{}", stem, extension)
}

/// Hint shown under the summary when some failures may succeed on a second run.
fn retry_hint(outcomes: &[CompressionOutcome]) -> Option<String> {
    let retryable = outcomes.iter().filter(|o| o.is_retryable()).count();
    (retryable > 0).then(|| {
        format!(
            "💡 {} failed image(s) may succeed on retry (try a longer --timeout or another --format)",
            retryable
        )
    })
}

fn print_reduction(reduction: f64) {
    if reduction >= 0.0 {
        println!("🎯 Size reduction: {:.1}%", reduction);
    } else {
        println!("⚠️  File size increased by {:.1}%", reduction.abs());
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::item::ItemId;

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("photo.png", "webp"), "photo.webp");
        assert_eq!(output_file_name("archive.tar.gz", "jpg"), "archive.tar.jpg");
        assert_eq!(output_file_name("", "png"), "image.png");
    }

    #[test]
    fn test_build_options() {
        let options = build_options(Some(60), Some("png"), Some(5)).unwrap();
        assert_eq!(options.quality, 60);
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));

        assert!(build_options(Some(0), None, None).is_err());
        assert!(build_options(None, None, Some(0)).is_err());
    }

    #[test]
    fn test_retry_hint_counts_retryable_failures() {
        let failed = |kind| CompressionOutcome::Failed {
            id: ItemId::new(),
            name: "a.png".to_string(),
            kind,
            error: "boom".to_string(),
        };
        assert!(retry_hint(&[]).is_none());
        assert!(retry_hint(&[failed(ErrorKind::InvalidInput)]).is_none());

        let hint = retry_hint(&[failed(ErrorKind::Timeout), failed(ErrorKind::Codec)]).unwrap();
        assert!(hint.contains("2 failed image(s)"));
    }

    #[test]
    fn test_compress_response_shape() {
        let response = CompressResponse {
            success: false,
            data: None,
            error: Some("boom".to_string()),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "boom");
        assert!(value.get("data").is_none());
    }
}
