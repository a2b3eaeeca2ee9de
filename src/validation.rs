use crate::constants::MAX_FILE_SIZE;
use crate::error::{CompressionError, Result};

/// Validate a submitted image before it joins a batch.
///
/// Rejects empty payloads, MIME types outside `image/*`, and payloads above
/// the maximum file size. Decodability is not checked here; that surfaces as
/// an item failure during compression.
pub fn validate_source(name: &str, mime_type: &str, bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(CompressionError::InvalidInput(format!(
            "{} is empty",
            display_name(name)
        )));
    }

    if !is_image_mime(mime_type) {
        return Err(CompressionError::InvalidInput(format!(
            "{} is not an image ({})",
            display_name(name),
            if mime_type.is_empty() { "no type" } else { mime_type }
        )));
    }

    let size = bytes.len() as u64;
    if size > MAX_FILE_SIZE {
        return Err(CompressionError::FileTooLarge(size, MAX_FILE_SIZE));
    }

    Ok(())
}

pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("image/")
}

fn display_name(name: &str) -> &str {
    if name.is_empty() {
        "File"
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_source_ok() {
        assert!(validate_source("a.png", "image/png", &[1, 2, 3]).is_ok());
        assert!(validate_source("a.PNG", "IMAGE/PNG", &[1]).is_ok());
    }

    #[test]
    fn test_validate_source_empty() {
        let result = validate_source("a.png", "image/png", &[]);
        assert!(matches!(result, Err(CompressionError::InvalidInput(msg)) if msg.contains("empty")));
    }

    #[test]
    fn test_validate_source_not_an_image() {
        let result = validate_source("notes.txt", "text/plain", b"hello");
        assert!(matches!(result, Err(CompressionError::InvalidInput(msg)) if msg.contains("not an image")));

        let result = validate_source("", "", b"hello");
        assert!(matches!(result, Err(CompressionError::InvalidInput(_))));
    }

    #[test]
    fn test_is_image_mime() {
        assert!(is_image_mime("image/webp"));
        assert!(!is_image_mime("application/zip"));
        assert!(!is_image_mime("imagex/png"));
    }
}
