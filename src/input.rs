use crate::constants::SUPPORTED_IMAGE_EXTENSIONS;
use crate::error::{CompressionError, Result};
use glob::glob;
use image::ImageFormat;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file read from disk, ready to be added to a batch.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Collects image files from a file path, a directory, or a glob pattern.
///
/// Hidden entries are skipped when walking directories.
///
/// # Arguments
/// * `input` - File path, directory path, or glob expression
/// * `recursive` - Whether to descend into subdirectories
///
/// # Returns
/// * `Ok(files)` - Canonical paths of matching image files, possibly empty
/// * `Err(CompressionError::WalkdirError)` - If a directory cannot be walked
pub fn collect_image_files(input: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();

    let input_path = Path::new(input);
    let canonical_input = if input_path.exists() {
        input_path
            .canonicalize()
            .map_err(|_| CompressionError::NoImageFilesFound(input.to_string()))?
    } else {
        input_path.to_path_buf()
    };

    if canonical_input.is_file() {
        image_files.push(canonical_input);
    } else if canonical_input.is_dir() {
        let walker = if recursive {
            WalkDir::new(&canonical_input)
        } else {
            WalkDir::new(&canonical_input).max_depth(1)
        };

        for entry in walker
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && is_image_file(path) {
                if let Ok(canonical_path) = path.canonicalize() {
                    image_files.push(canonical_path);
                }
            }
        }
    } else if let Ok(paths) = glob(input) {
        for entry in paths.flatten() {
            if entry.is_file() && is_image_file(&entry) {
                if let Ok(canonical_path) = entry.canonicalize() {
                    image_files.push(canonical_path);
                }
            }
        }
    } else {
        return Err(CompressionError::NoImageFilesFound(input.to_string()));
    }

    Ok(image_files)
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// MIME type from the content's magic bytes, then the extension, else
/// `application/octet-stream`.
pub fn guess_mime_type(path: &Path, bytes: &[u8]) -> String {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type().to_string();
    }

    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageFormat::from_extension)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Reads a file from disk and detects its MIME type.
///
/// # Returns
/// * `Ok(source)` - Name, MIME type and bytes
/// * `Err(CompressionError::FileNotFound)` - If the path does not exist
/// * `Err(CompressionError::Io)` - If reading fails
pub fn read_source_file(path: &Path) -> Result<SourceFile> {
    if !path.exists() {
        return Err(CompressionError::FileNotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mime_type = guess_mime_type(path, &bytes);

    Ok(SourceFile {
        name,
        mime_type,
        bytes,
    })
}
