//! `data:<mime>;base64,<payload>` URLs, the encoded form compressed images
//! travel in between a compress response and an archive request.

use crate::constants::{DATA_URL_BASE64_MARKER, DATA_URL_SCHEME};
use crate::error::{CompressionError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};

pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "{}{}{},{}",
        DATA_URL_SCHEME,
        mime_type,
        DATA_URL_BASE64_MARKER,
        STANDARD.encode(bytes)
    )
}

/// Splits a base64 data URL into its MIME type and decoded payload.
///
/// # Returns
/// * `Ok((mime_type, bytes))` - The decoded payload
/// * `Err(CompressionError::InvalidInput)` - Not a base64 data URL, or bad base64
pub fn decode(url: &str) -> Result<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix(DATA_URL_SCHEME)
        .ok_or_else(|| CompressionError::InvalidInput("not a data URL".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| CompressionError::InvalidInput("data URL has no payload".to_string()))?;
    let mime_type = header
        .strip_suffix(DATA_URL_BASE64_MARKER)
        .ok_or_else(|| CompressionError::InvalidInput("data URL is not base64".to_string()))?;
    if mime_type.is_empty() {
        return Err(CompressionError::InvalidInput(
            "data URL has no MIME type".to_string(),
        ));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| CompressionError::InvalidInput(format!("invalid base64 payload: {}", e)))?;
    Ok((mime_type.to_string(), bytes))
}
