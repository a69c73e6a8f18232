//! Parameter types for transcoding operations.
//!
//! These structs describe *what* to produce, not *how* to produce it. They
//! are the interface between the high-level
//! [`operations`](super::operations) module (which decides which variants
//! to create) and the [`backend`](super::backend) (which resolves them).
//! This separation allows swapping backends (e.g. for testing with a mock)
//! without changing operation logic.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Encoded image format a variant can be produced in.
///
/// `Jpeg` is the baseline format: universally decodable, used for the
/// `<img>` fallback and for placeholders. `Webp` and `Avif` are the
/// modern formats emitted as `<source>` candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Avif,
    Webp,
    Jpeg,
}

impl ImageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Avif => "avif",
            ImageFormat::Webp => "webp",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    /// MIME type emitted on `<source type="...">` elements.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Avif => "image/avif",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Full specification for one variant production.
///
/// `infer_size` permits the collaborator to determine natural dimensions
/// from the source itself when it needs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeRequest {
    pub src: String,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
    pub infer_size: bool,
}
