use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid quality value: {0}. Must be between 1 and 100")]
    InvalidQuality(u8),

    #[error("Invalid image dimensions: {0}x{1}. Maximum allowed: {2}x{2}")]
    InvalidDimensions(u32, u32, u32),

    #[error("File too large: {0} bytes. Maximum allowed: {1} bytes")]
    FileTooLarge(u64, u64),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Compression timed out after {0:?}")]
    Timeout(Duration),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("No image files found in input path: {0}")]
    NoImageFilesFound(String),

    #[error("Batch file count limit exceeded: {0} files, maximum allowed {1}")]
    BatchFileLimitExceeded(usize, usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walkdir error: {0}")]
    WalkdirError(#[from] walkdir::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification used in outcomes and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedInput,
    Codec,
    Timeout,
    Archive,
    Io,
}

impl CompressionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompressionError::InvalidInput(_)
            | CompressionError::InvalidQuality(_)
            | CompressionError::FileTooLarge(_, _)
            | CompressionError::FileNotFound(_)
            | CompressionError::NoImageFilesFound(_)
            | CompressionError::BatchFileLimitExceeded(_, _) => ErrorKind::InvalidInput,
            CompressionError::UnsupportedInput(_) | CompressionError::InvalidDimensions(_, _, _) => {
                ErrorKind::UnsupportedInput
            }
            CompressionError::Codec(_) => ErrorKind::Codec,
            CompressionError::Timeout(_) => ErrorKind::Timeout,
            CompressionError::Archive(_) => ErrorKind::Archive,
            CompressionError::Io(_)
            | CompressionError::WalkdirError(_)
            | CompressionError::Json(_) => ErrorKind::Io,
        }
    }
}

impl ErrorKind {
    /// Failures an item can recover from through an explicit retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::UnsupportedInput | ErrorKind::Codec | ErrorKind::Timeout
        )
    }
}

pub type Result<T> = std::result::Result<T, CompressionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CompressionError::InvalidInput("x".into()).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(CompressionError::InvalidQuality(0).kind(), ErrorKind::InvalidInput);
        assert_eq!(
            CompressionError::InvalidDimensions(1, 1, 1).kind(),
            ErrorKind::UnsupportedInput
        );
        assert_eq!(
            CompressionError::Timeout(Duration::from_secs(1)).kind(),
            ErrorKind::Timeout
        );
    }

    #[test]
    fn test_retryable() {
        assert!(CompressionError::Codec("boom".into()).kind().is_retryable());
        assert!(CompressionError::UnsupportedInput("bad".into()).kind().is_retryable());
        assert!(!CompressionError::InvalidInput("empty".into()).kind().is_retryable());
        assert!(!CompressionError::Archive("io".into()).kind().is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = CompressionError::InvalidQuality(101);
        assert_eq!(
            err.to_string(),
            "Invalid quality value: 101. Must be between 1 and 100"
        );
        let err = CompressionError::Timeout(Duration::from_millis(5));
        assert!(err.to_string().contains("timed out"));
    }
}
