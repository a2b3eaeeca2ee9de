//! Output codec selection and per-codec quality normalisation.
//!
//! Replaces string-based format handling with enums: a requested
//! [`FormatToken`] plus the source MIME type resolve to exactly one [`Codec`]
//! and an [`EncoderQuality`] on that codec's own scale.

use crate::constants::{mime_subtype, MAX_PNG_EFFORT, MIN_PNG_EFFORT};
use serde::Serialize;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Output codecs the transcoder can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// JPEG, lossy
    Jpeg,
    /// PNG, lossless with an effort knob
    Png,
    /// WebP, lossy
    WebP,
}

impl Codec {
    /// Codec used whenever a request cannot be honoured.
    pub const DEFAULT: Codec = Codec::Jpeg;

    pub fn extension(&self) -> &'static str {
        match self {
            Codec::Jpeg => "jpg",
            Codec::Png => "png",
            Codec::WebP => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Codec::Jpeg => "image/jpeg",
            Codec::Png => "image/png",
            Codec::WebP => "image/webp",
        }
    }

    /// Codec named by a format name or MIME subtype, if any.
    pub fn from_name(name: &str) -> Option<Codec> {
        match name.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(Codec::Jpeg),
            "png" => Some(Codec::Png),
            "webp" => Some(Codec::WebP),
            _ => None,
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Codec::Jpeg => "JPEG",
            Codec::Png => "PNG",
            Codec::WebP => "WebP",
        };
        write!(f, "{}", name)
    }
}

/// Requested output format, as submitted by the caller
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormatToken {
    Jpeg,
    Png,
    WebP,
    /// Keep the source's own format
    #[default]
    Original,
    /// Anything else; resolves to [`Codec::DEFAULT`]
    Unrecognized(String),
}

impl FormatToken {
    /// Names accepted as a requested format.
    pub fn format_names() -> Vec<&'static str> {
        vec!["jpeg", "png", "webp", "original"]
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, FormatToken::Unrecognized(_))
    }
}

impl FromStr for FormatToken {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let token = match s.trim().to_ascii_lowercase().as_str() {
            "" | "original" => FormatToken::Original,
            other => match Codec::from_name(other) {
                Some(Codec::Jpeg) => FormatToken::Jpeg,
                Some(Codec::Png) => FormatToken::Png,
                Some(Codec::WebP) => FormatToken::WebP,
                None => FormatToken::Unrecognized(s.to_string()),
            },
        };
        Ok(token)
    }
}

impl fmt::Display for FormatToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatToken::Jpeg => write!(f, "jpeg"),
            FormatToken::Png => write!(f, "png"),
            FormatToken::WebP => write!(f, "webp"),
            FormatToken::Original => write!(f, "original"),
            FormatToken::Unrecognized(token) => write!(f, "{}", token),
        }
    }
}

/// Quality on the scale the chosen codec understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderQuality {
    /// 1-100 fidelity for JPEG and WebP
    Lossy(u8),
    /// 1-10 PNG effort
    Effort(u8),
}

impl EncoderQuality {
    pub fn value(&self) -> u8 {
        match self {
            EncoderQuality::Lossy(q) | EncoderQuality::Effort(q) => *q,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub codec: Codec,
    pub quality: EncoderQuality,
    /// Set when the requested format or source subtype had no codec and
    /// [`Codec::DEFAULT`] was substituted.
    pub fell_back: bool,
}

/// Map a 1-100 quality onto PNG's coarser effort scale, never below 1.
pub fn png_effort(quality: u8) -> u8 {
    (quality / 10).clamp(MIN_PNG_EFFORT, MAX_PNG_EFFORT)
}

/// Decide the output codec for a source and normalise quality for it.
///
/// `Original` follows the declared MIME subtype. Unknown subtypes and
/// unrecognized tokens both fall back to [`Codec::DEFAULT`]; the returned
/// codec is always what will actually be produced.
pub fn resolve(declared_mime: &str, requested: &FormatToken, quality: u8) -> Resolution {
    let (codec, fell_back) = match requested {
        FormatToken::Jpeg => (Codec::Jpeg, false),
        FormatToken::Png => (Codec::Png, false),
        FormatToken::WebP => (Codec::WebP, false),
        FormatToken::Original => match Codec::from_name(&mime_subtype(declared_mime)) {
            Some(codec) => (codec, false),
            None => (Codec::DEFAULT, true),
        },
        FormatToken::Unrecognized(_) => (Codec::DEFAULT, true),
    };

    if fell_back {
        warn!(
            requested = %requested,
            declared_mime,
            fallback = %codec,
            "No codec for requested format, falling back"
        );
    }

    let quality = match codec {
        Codec::Png => EncoderQuality::Effort(png_effort(quality)),
        Codec::Jpeg | Codec::WebP => EncoderQuality::Lossy(quality),
    };

    Resolution {
        codec,
        quality,
        fell_back,
    }
}
