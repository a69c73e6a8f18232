//! Per-image processing.
//!
//! One image in, one [`ProcessedImageData`] out: fan variant-set
//! production out across the enabled formats (and the placeholder),
//! then pick the mandatory fallback variant. The baseline JPEG set at
//! the desktop breakpoint *must* exist — browsers that ignore every
//! `<source>` still need a real `src` — so its absence fails the image.
//!
//! Also home to [`apply_basic_optimizations`], the degrade-gracefully
//! path used when full processing fails: patch loading and sizing
//! attributes onto the original element and touch nothing else.

use rayon::prelude::*;
use thiserror::Error;

use crate::cache::VariantCache;
use crate::config::OptimizeConfig;
use crate::dom::{Document, NodeId};
use crate::transcode::{
    ImageFormat, TranscodeBackend, calculate_dimensions, create_placeholder,
    create_responsive_set,
};
use crate::types::{ImageContext, ProcessedImageData, ResponsiveImageSet};

/// Breakpoint whose variant becomes the `<img>` fallback source.
const FALLBACK_BREAKPOINT: &str = "desktop";

/// Base width for the default-derived dimensions patched onto images
/// that failed full processing.
const BASIC_FALLBACK_WIDTH: u32 = 800;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("no {0} set produced for the fallback image")]
    MissingFallbackSet(ImageFormat),
    #[error("no desktop variant in the {0} fallback set")]
    MissingFallbackVariant(ImageFormat),
}

/// Formats to attempt: baseline always, modern formats behind their
/// toggles, in configured order.
fn enabled_formats(config: &OptimizeConfig) -> Vec<ImageFormat> {
    config
        .formats
        .iter()
        .copied()
        .filter(|format| match format {
            ImageFormat::Jpeg => true,
            ImageFormat::Webp => config.enable_webp,
            ImageFormat::Avif => config.enable_avif,
        })
        .collect()
}

/// Produce the complete variant data for one image.
pub fn process_image_element(
    backend: &dyn TranscodeBackend,
    cache: &VariantCache,
    context: &ImageContext,
    config: &OptimizeConfig,
) -> Result<ProcessedImageData, ProcessError> {
    let formats = enabled_formats(config);

    let build_sets = || -> Vec<ResponsiveImageSet> {
        if config.parallel {
            formats
                .par_iter()
                .map(|&format| create_responsive_set(backend, cache, &context.src, format, config))
                .collect()
        } else {
            formats
                .iter()
                .map(|&format| create_responsive_set(backend, cache, &context.src, format, config))
                .collect()
        }
    };

    let (mut sets, placeholder) = if config.parallel {
        rayon::join(build_sets, || {
            create_placeholder(backend, cache, &context.src, config)
        })
    } else {
        (
            build_sets(),
            create_placeholder(backend, cache, &context.src, config),
        )
    };

    let fallback_position = sets
        .iter()
        .position(|set| set.format == ImageFormat::Jpeg)
        .ok_or(ProcessError::MissingFallbackSet(ImageFormat::Jpeg))?;
    let fallback_set = sets.remove(fallback_position);
    let fallback = fallback_set
        .breakpoints
        .get(FALLBACK_BREAKPOINT)
        .cloned()
        .ok_or(ProcessError::MissingFallbackVariant(ImageFormat::Jpeg))?;

    Ok(ProcessedImageData {
        sets,
        fallback,
        placeholder,
    })
}

/// Minimal-enhancement path for an image whose full processing failed.
///
/// Patches `loading` (and `fetchpriority` above the fold), and — only
/// when the element carries no usable width/height of its own —
/// default-derived dimensions plus inline sizing so the layout box does
/// not shift. The element is otherwise left untouched.
pub fn apply_basic_optimizations(
    document: &mut Document,
    img: NodeId,
    context: &ImageContext,
    config: &OptimizeConfig,
) {
    let loading = if config.enable_lazy_loading && !context.is_above_fold {
        "lazy"
    } else {
        "eager"
    };
    document.set_attr(img, "loading", loading);

    if context.is_above_fold {
        document.set_attr(img, "fetchpriority", "high");
    }

    let missing = |name: &str| {
        document
            .attr(img, name)
            .is_none_or(|value| value.is_empty())
    };
    if missing("width") || missing("height") {
        let dimensions = calculate_dimensions(BASIC_FALLBACK_WIDTH, config.aspect_ratio);
        document.set_attr(img, "width", &dimensions.width.to_string());
        document.set_attr(img, "height", &dimensions.height.to_string());
        document.set_attr(
            img,
            "style",
            &format!(
                "aspect-ratio: {}; object-fit: cover; width: 100%; height: auto;",
                config.aspect_ratio
            ),
        );
    }
}
