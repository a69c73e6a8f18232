//! Shared types flowing through the optimization pipeline.
//!
//! Everything here is created fresh per optimization call and handed
//! between stages by value; only [`OptimizedImage`]s outlive a call, via
//! the variant cache.

use std::collections::BTreeMap;

use crate::transcode::ImageFormat;

/// One transcoded variant: the resolved URL plus its final dimensions.
///
/// `attributes` is an opaque side channel for anything else the
/// transcoding collaborator reported. Known fields (URL, dimensions) are
/// extracted into typed fields; the rest ride along untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizedImage {
    pub src: String,
    pub width: u32,
    pub height: u32,
    pub attributes: BTreeMap<String, String>,
}

/// One encoded format's complete output across breakpoints.
///
/// `breakpoints` maps breakpoint name to the variant that succeeded for
/// it. Breakpoints whose transcoding failed are absent; emission order is
/// driven by the configured breakpoint list, not this map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsiveImageSet {
    pub format: ImageFormat,
    pub mime_type: &'static str,
    pub breakpoints: BTreeMap<String, OptimizedImage>,
}

/// Aggregate result for one source image.
///
/// `sets` holds the modern-format sets used for `<source>` generation.
/// The baseline format never appears here — it is reserved for
/// `fallback`, the variant referenced directly by the `<img>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImageData {
    pub sets: Vec<ResponsiveImageSet>,
    pub fallback: OptimizedImage,
    pub placeholder: Option<OptimizedImage>,
}

/// Per-image processing input.
///
/// `index` is the image's position among *all* `<img>` elements in
/// document order, and `is_above_fold` is derived from it before any
/// eligibility filtering — ineligible leading images still consume
/// above-the-fold slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageContext {
    pub src: String,
    pub alt: String,
    pub is_above_fold: bool,
    pub index: usize,
}
