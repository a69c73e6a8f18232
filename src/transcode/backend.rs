//! Transcoding backend trait and the production image-service backend.
//!
//! The [`TranscodeBackend`] trait is the crate's boundary to whatever
//! actually produces image variants. The production implementation is
//! [`ImageServiceBackend`]: it targets an image-transcoding HTTP endpoint
//! and does no pixel work itself — each variant resolves to an endpoint
//! URL carrying the source and the requested format, dimensions, and
//! quality, and the endpoint transcodes at request time.

use std::collections::BTreeMap;

use thiserror::Error;

use super::params::TranscodeRequest;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),
    #[error("transcoding failed: {0}")]
    Failed(String),
}

/// Result of one transcoding call.
///
/// `width`/`height` are what the collaborator reports, when it reports
/// them; callers fall back to the requested dimensions otherwise.
/// `attributes` carries anything else the collaborator wants forwarded
/// onto the rendered element, opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodedOutput {
    pub src: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub attributes: BTreeMap<String, String>,
}

/// Trait for transcoding backends.
///
/// `Sync` because variant production fans out across rayon workers; see
/// the [module docs](self) for the production implementation.
pub trait TranscodeBackend: Sync {
    /// Produce one variant for the request.
    fn transcode(&self, request: &TranscodeRequest) -> Result<TranscodedOutput, BackendError>;
}

/// Backend that resolves variants to image-service endpoint URLs.
///
/// URL shape: `{endpoint}?href={source}&w={width}&h={height}&f={format}&q={quality}`
/// with the source form-urlencoded. The default endpoint is `/_image`,
/// which is why a `_image?` substring in an `src` marks the image as
/// already optimized.
#[derive(Debug, Clone)]
pub struct ImageServiceBackend {
    endpoint: String,
}

impl ImageServiceBackend {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl Default for ImageServiceBackend {
    fn default() -> Self {
        Self::new("/_image")
    }
}

impl TranscodeBackend for ImageServiceBackend {
    fn transcode(&self, request: &TranscodeRequest) -> Result<TranscodedOutput, BackendError> {
        if request.src.is_empty() {
            return Err(BackendError::UnsupportedSource(
                "empty source reference".into(),
            ));
        }

        let href: String = url::form_urlencoded::byte_serialize(request.src.as_bytes()).collect();
        let src = format!(
            "{}?href={}&w={}&h={}&f={}&q={}",
            self.endpoint,
            href,
            request.width,
            request.height,
            request.format,
            request.quality.value()
        );

        // The endpoint infers natural dimensions from the source when it
        // serves the variant; the requested dimensions are authoritative
        // for layout.
        Ok(TranscodedOutput {
            src,
            width: Some(request.width),
            height: Some(request.height),
            attributes: BTreeMap::new(),
        })
    }
}
