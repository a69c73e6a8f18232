//! Document-level image optimization.
//!
//! The entry point ties the pipeline together: parse the document,
//! decide which images are eligible, fan per-image processing out across
//! rayon workers, splice the rendered `<picture>` fragments back in, and
//! serialize. Each image's outcome is captured independently — one
//! image's failure degrades that image to basic attribute patching and
//! touches nothing else.

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::VariantCache;
use crate::config::{ConfigError, OptimizeConfig, OptimizeOptions};
use crate::dom::{Document, DomError, NodeId};
use crate::markup::build_picture_element;
use crate::process::{ProcessError, apply_basic_optimizations, process_image_element};
use crate::transcode::{ImageServiceBackend, TranscodeBackend};
use crate::types::{ImageContext, ProcessedImageData};

/// Query marker the transcoding endpoint leaves in generated URLs; its
/// presence means the image was already optimized on an earlier pass.
const SERVICE_MARKER: &str = "_image?";

#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// An eligible image: the context the pipeline works on, plus the node
/// it will be spliced back into.
struct EligibleImage {
    node: NodeId,
    context: ImageContext,
}

/// Rewrites `<img>` elements into responsive `<picture>` markup.
///
/// Owns the variant cache: variants are produced at most once per
/// optimizer instance, including across repeated [`optimize`] calls.
/// Hold one instance for process-lifetime memoization, or call
/// [`clear_cache`] to drop every memoized variant (including memoized
/// failures).
///
/// [`optimize`]: ImageOptimizer::optimize
/// [`clear_cache`]: ImageOptimizer::clear_cache
pub struct ImageOptimizer<B> {
    backend: B,
    cache: VariantCache,
}

impl Default for ImageOptimizer<ImageServiceBackend> {
    fn default() -> Self {
        Self::new(ImageServiceBackend::default())
    }
}

impl ImageOptimizer<ImageServiceBackend> {
    /// Optimizer over the stock service backend at a custom endpoint.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self::new(ImageServiceBackend::new(endpoint))
    }
}

impl<B: TranscodeBackend> ImageOptimizer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: VariantCache::new(),
        }
    }

    /// Rewrite every eligible `<img>` in `html`.
    ///
    /// A document with no `<img>` elements is returned unchanged,
    /// byte-identical. Per-image failures never fail the call; only
    /// config validation or an unparseable input can.
    pub fn optimize(&self, html: &str, options: &OptimizeOptions) -> Result<String, OptimizeError> {
        let config = options.resolve();
        config.validate()?;

        let mut document = Document::parse(html)?;
        let images = document.elements("img");
        if images.is_empty() {
            return Ok(html.to_string());
        }

        let eligible = eligible_images(&document, &images, &config);
        debug!(
            total = images.len(),
            eligible = eligible.len(),
            "optimizing document images"
        );

        let results: Vec<Result<ProcessedImageData, ProcessError>> = if config.parallel {
            eligible
                .par_iter()
                .map(|image| {
                    process_image_element(&self.backend, &self.cache, &image.context, &config)
                })
                .collect()
        } else {
            eligible
                .iter()
                .map(|image| {
                    process_image_element(&self.backend, &self.cache, &image.context, &config)
                })
                .collect()
        };

        for (image, result) in eligible.iter().zip(results) {
            match result {
                Ok(data) => {
                    let markup = build_picture_element(&data, &image.context, &config);
                    if !document.replace_with_fragment(image.node, markup) {
                        debug!(src = %image.context.src, "image node already detached; skipping");
                    }
                }
                Err(err) => {
                    warn!(src = %image.context.src, %err, "image processing failed; applying basic optimizations");
                    apply_basic_optimizations(&mut document, image.node, &image.context, &config);
                }
            }
        }

        Ok(document.serialize())
    }

    /// Discard every memoized variant.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// Build processing contexts for the eligible images.
///
/// Above-fold status is decided by each image's index among *all* images
/// in document order, against the configured threshold, before any
/// filtering — an ineligible leading image still consumes a slot.
fn eligible_images(
    document: &Document,
    images: &[NodeId],
    config: &OptimizeConfig,
) -> Vec<EligibleImage> {
    images
        .iter()
        .enumerate()
        .filter_map(|(index, &node)| {
            let src = document.attr(node, "src")?;
            if src.is_empty() || should_skip(document, node, src) {
                return None;
            }
            let alt = document.attr(node, "alt").unwrap_or_default().to_string();
            Some(EligibleImage {
                node,
                context: ImageContext {
                    src: src.to_string(),
                    alt,
                    is_above_fold: index < config.above_fold_threshold,
                    index,
                },
            })
        })
        .collect()
}

/// Images to leave alone: already-optimized sources, images already
/// inside a `<picture>`, and inline data URIs.
fn should_skip(document: &Document, node: NodeId, src: &str) -> bool {
    src.contains(SERVICE_MARKER)
        || src.starts_with("data:")
        || document.has_ancestor(node, "picture")
}

/// Rewrite every eligible `<img>` in `html` using the stock
/// image-service backend.
///
/// Convenience wrapper over a fresh [`ImageOptimizer`]; variants are
/// memoized only within this one call. Hold an [`ImageOptimizer`]
/// yourself for cross-call caching.
pub fn optimize_images(html: &str, options: &OptimizeOptions) -> Result<String, OptimizeError> {
    ImageOptimizer::default().optimize(html, options)
}
