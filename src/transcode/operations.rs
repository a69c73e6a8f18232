//! High-level transcoding operations.
//!
//! These functions combine dimension calculations with backend execution
//! through the variant cache. They take configuration, compute the
//! variant parameters, and drive the backend — once per unique variant.

use std::collections::BTreeMap;

use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use super::backend::TranscodeBackend;
use super::calculations::{Dimensions, calculate_dimensions, constrain_to_max_width};
use super::params::{ImageFormat, Quality, TranscodeRequest};
use crate::cache::{VariantCache, VariantKey};
use crate::config::{Breakpoint, OptimizeConfig};
use crate::types::{OptimizedImage, ResponsiveImageSet};

/// Failure to produce one variant.
///
/// Carries the source and attempted format alongside the backend's
/// message. Cloneable because the cache memoizes failed productions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to transcode {src} as {format}: {message}")]
pub struct TranscodeError {
    pub src: String,
    pub format: ImageFormat,
    pub message: String,
}

/// Produce one variant, memoized by the cache.
///
/// On a cache miss the backend is invoked with `infer_size` set, letting
/// it determine natural dimensions from the source when needed. Backend
/// failures are wrapped with source and format context and propagated —
/// never swallowed at this layer.
pub fn process_image(
    backend: &dyn TranscodeBackend,
    cache: &VariantCache,
    src: &str,
    format: ImageFormat,
    dimensions: Dimensions,
    quality: Quality,
) -> Result<OptimizedImage, TranscodeError> {
    let key = VariantKey::new(src, format, dimensions, quality);

    cache.get_or_create(key, || {
        let request = TranscodeRequest {
            src: src.to_string(),
            format,
            width: dimensions.width,
            height: dimensions.height,
            quality,
            infer_size: true,
        };

        let output = backend.transcode(&request).map_err(|err| TranscodeError {
            src: src.to_string(),
            format,
            message: err.to_string(),
        })?;

        Ok(OptimizedImage {
            width: output.width.unwrap_or(dimensions.width),
            height: output.height.unwrap_or(dimensions.height),
            src: output.src,
            attributes: output.attributes,
        })
    })
}

/// Produce one format's complete variant set across the configured
/// breakpoints.
///
/// Breakpoint dimensions come from the breakpoint's target width and the
/// configured aspect ratio, constrained to `max_width`. Breakpoints fan
/// out in parallel when `config.parallel` is set. A breakpoint whose
/// production fails is dropped from the set rather than failing the whole
/// format.
pub fn create_responsive_set(
    backend: &dyn TranscodeBackend,
    cache: &VariantCache,
    src: &str,
    format: ImageFormat,
    config: &OptimizeConfig,
) -> ResponsiveImageSet {
    let produce = |breakpoint: &Breakpoint| {
        let dimensions = constrain_to_max_width(
            calculate_dimensions(breakpoint.width, config.aspect_ratio),
            config.max_width,
        );
        let result = process_image(backend, cache, src, format, dimensions, config.quality);
        (breakpoint.name.clone(), result)
    };

    let produced: Vec<(String, Result<OptimizedImage, TranscodeError>)> = if config.parallel {
        config.breakpoints.par_iter().map(produce).collect()
    } else {
        config.breakpoints.iter().map(produce).collect()
    };

    let mut breakpoints = BTreeMap::new();
    for (name, result) in produced {
        match result {
            Ok(image) => {
                breakpoints.insert(name, image);
            }
            Err(err) => debug!(breakpoint = %name, %err, "dropping failed breakpoint variant"),
        }
    }

    ResponsiveImageSet {
        format,
        mime_type: format.mime_type(),
        breakpoints,
    }
}

/// Produce the low-quality preview variant, if configured.
///
/// Placeholders are always baseline-format: they exist to paint
/// *something* early, so universal decodability beats compression. Any
/// failure is absorbed — a missing placeholder must never block the image
/// itself.
pub fn create_placeholder(
    backend: &dyn TranscodeBackend,
    cache: &VariantCache,
    src: &str,
    config: &OptimizeConfig,
) -> Option<OptimizedImage> {
    if !config.add_placeholder {
        return None;
    }

    match process_image(
        backend,
        cache,
        src,
        ImageFormat::Jpeg,
        config.placeholder_size,
        config.placeholder_quality,
    ) {
        Ok(image) => Some(image),
        Err(err) => {
            debug!(%err, "placeholder generation failed; omitting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcode::backend::tests::MockBackend;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    // =========================================================================
    // process_image
    // =========================================================================

    #[test]
    fn process_image_resolves_variant() {
        let backend = MockBackend::new();
        let cache = VariantCache::new();

        let image = process_image(
            &backend,
            &cache,
            "/photo.jpg",
            ImageFormat::Avif,
            dims(640, 480),
            Quality::new(80),
        )
        .unwrap();

        assert_eq!(image.src, "mock://photo.jpg/avif/640x480/q80");
        assert_eq!(image.width, 640);
        assert_eq!(image.height, 480);
    }

    #[test]
    fn process_image_memoizes_repeated_requests() {
        let backend = MockBackend::new();
        let cache = VariantCache::new();

        for _ in 0..3 {
            process_image(
                &backend,
                &cache,
                "/photo.jpg",
                ImageFormat::Avif,
                dims(640, 480),
                Quality::new(80),
            )
            .unwrap();
        }

        assert_eq!(backend.recorded().len(), 1);
    }

    #[test]
    fn process_image_distinguishes_quality() {
        let backend = MockBackend::new();
        let cache = VariantCache::new();

        for quality in [10, 80] {
            process_image(
                &backend,
                &cache,
                "/photo.jpg",
                ImageFormat::Jpeg,
                dims(640, 480),
                Quality::new(quality),
            )
            .unwrap();
        }

        assert_eq!(backend.recorded().len(), 2);
    }

    #[test]
    fn process_image_wraps_backend_error_with_context() {
        let backend = MockBackend::failing_when(|_| true);
        let cache = VariantCache::new();

        let err = process_image(
            &backend,
            &cache,
            "/broken.jpg",
            ImageFormat::Webp,
            dims(640, 480),
            Quality::new(80),
        )
        .unwrap_err();

        assert_eq!(err.src, "/broken.jpg");
        assert_eq!(err.format, ImageFormat::Webp);
        assert!(err.message.contains("mock failure"));
        assert!(err.to_string().contains("/broken.jpg"));
        assert!(err.to_string().contains("webp"));
    }

    #[test]
    fn process_image_requests_size_inference() {
        let backend = MockBackend::new();
        let cache = VariantCache::new();

        process_image(
            &backend,
            &cache,
            "/photo.jpg",
            ImageFormat::Avif,
            dims(640, 480),
            Quality::new(80),
        )
        .unwrap();

        assert!(backend.recorded()[0].infer_size);
    }

    // =========================================================================
    // create_responsive_set
    // =========================================================================

    #[test]
    fn responsive_set_covers_all_breakpoints() {
        let backend = MockBackend::new();
        let cache = VariantCache::new();
        let config = OptimizeConfig::default();

        let set = create_responsive_set(&backend, &cache, "/photo.jpg", ImageFormat::Avif, &config);

        assert_eq!(set.format, ImageFormat::Avif);
        assert_eq!(set.mime_type, "image/avif");
        assert_eq!(set.breakpoints.len(), 3);
        assert_eq!(set.breakpoints["mobile"].width, 640);
        assert_eq!(set.breakpoints["mobile"].height, 480);
        assert_eq!(set.breakpoints["tablet"].width, 768);
        assert_eq!(set.breakpoints["desktop"].width, 1200);
        assert_eq!(set.breakpoints["desktop"].height, 900);
    }

    #[test]
    fn responsive_set_respects_max_width() {
        let backend = MockBackend::new();
        let cache = VariantCache::new();
        let config = OptimizeConfig {
            max_width: 800,
            ..Default::default()
        };

        let set = create_responsive_set(&backend, &cache, "/photo.jpg", ImageFormat::Avif, &config);

        assert_eq!(set.breakpoints["desktop"].width, 800);
        assert_eq!(set.breakpoints["desktop"].height, 600);
    }

    #[test]
    fn responsive_set_drops_failed_breakpoint() {
        let backend = MockBackend::failing_when(|r| r.width == 768);
        let cache = VariantCache::new();
        let config = OptimizeConfig::default();

        let set = create_responsive_set(&backend, &cache, "/photo.jpg", ImageFormat::Avif, &config);

        assert_eq!(set.breakpoints.len(), 2);
        assert!(set.breakpoints.contains_key("mobile"));
        assert!(!set.breakpoints.contains_key("tablet"));
        assert!(set.breakpoints.contains_key("desktop"));
    }

    #[test]
    fn responsive_set_sequential_matches_parallel() {
        let config_parallel = OptimizeConfig::default();
        let config_sequential = OptimizeConfig {
            parallel: false,
            ..Default::default()
        };

        let backend = MockBackend::new();
        let parallel = create_responsive_set(
            &backend,
            &VariantCache::new(),
            "/photo.jpg",
            ImageFormat::Webp,
            &config_parallel,
        );
        let sequential = create_responsive_set(
            &backend,
            &VariantCache::new(),
            "/photo.jpg",
            ImageFormat::Webp,
            &config_sequential,
        );

        assert_eq!(parallel, sequential);
    }

    // =========================================================================
    // create_placeholder
    // =========================================================================

    #[test]
    fn placeholder_uses_baseline_format_and_configured_size() {
        let backend = MockBackend::new();
        let cache = VariantCache::new();
        let config = OptimizeConfig::default();

        let placeholder = create_placeholder(&backend, &cache, "/photo.jpg", &config).unwrap();

        assert_eq!(placeholder.width, 20);
        assert_eq!(placeholder.height, 15);

        let recorded = backend.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].format, ImageFormat::Jpeg);
        assert_eq!(recorded[0].quality.value(), 10);
    }

    #[test]
    fn placeholder_disabled_does_no_work() {
        let backend = MockBackend::new();
        let cache = VariantCache::new();
        let config = OptimizeConfig {
            add_placeholder: false,
            ..Default::default()
        };

        assert!(create_placeholder(&backend, &cache, "/photo.jpg", &config).is_none());
        assert!(backend.recorded().is_empty());
    }

    #[test]
    fn placeholder_failure_absorbed() {
        let backend = MockBackend::failing_when(|_| true);
        let cache = VariantCache::new();
        let config = OptimizeConfig::default();

        assert!(create_placeholder(&backend, &cache, "/photo.jpg", &config).is_none());
    }
}
