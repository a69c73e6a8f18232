//! `<picture>` markup rendering.
//!
//! Builds the replacement fragment for one successfully processed image:
//! a `<picture>` container that reserves layout space through its aspect
//! ratio, one `<source>` per modern-format variant, and the final `<img>`
//! carrying the loading and priority policy.
//!
//! The `<img>` policy in full:
//! - above the fold: full-resolution `src`, `loading="eager"`,
//!   `fetchpriority="high"`;
//! - below the fold with a placeholder: placeholder `src`, full URL in
//!   `data-src`, blur style, and an `onload` handler that swaps in the
//!   full source and removes the blur;
//! - below the fold without a placeholder: full-resolution `src`,
//!   `loading="lazy"`;
//! - `width`/`height` always come from the fallback variant so the layout
//!   box is stable regardless of which source is displayed.

use maud::{PreEscaped, html};

use crate::config::OptimizeConfig;
use crate::dom::escape_attr;
use crate::types::{ImageContext, ProcessedImageData};

/// Swap handler for placeholder-backed images: drop the blur, promote
/// `data-src` to `src`.
const ONLOAD_SWAP: &str = "this.style.filter='none'; if(this.dataset.src) { this.src=this.dataset.src; this.removeAttribute('data-src'); }";

const BASE_IMG_STYLE: &str = "width: 100%; height: auto; object-fit: cover; border-radius: inherit;";
const BLUR_IMG_STYLE: &str = "filter: blur(2px); transition: filter 0.3s ease;";

/// Render the `<picture>` fragment for one processed image.
pub fn build_picture_element(
    data: &ProcessedImageData,
    context: &ImageContext,
    config: &OptimizeConfig,
) -> String {
    let use_placeholder = data.placeholder.is_some() && !context.is_above_fold;

    let src = if context.is_above_fold {
        data.fallback.src.as_str()
    } else {
        data.placeholder
            .as_ref()
            .map(|placeholder| placeholder.src.as_str())
            .unwrap_or(data.fallback.src.as_str())
    };

    let loading = if config.enable_lazy_loading && !context.is_above_fold {
        "lazy"
    } else {
        "eager"
    };

    let style = if use_placeholder {
        format!("{BASE_IMG_STYLE} {BLUR_IMG_STYLE}")
    } else {
        BASE_IMG_STYLE.to_string()
    };

    html! {
        picture style=(format!("display: block; width: 100%; aspect-ratio: {};", config.aspect_ratio)) {
            @for set in &data.sets {
                @for breakpoint in &config.breakpoints {
                    @if let Some(image) = set.breakpoints.get(&breakpoint.name) {
                        source media=(breakpoint.media_query) srcset=(image.src) type=(set.mime_type);
                    }
                }
            }
            img src=(src)
                data-src=[use_placeholder.then(|| data.fallback.src.as_str())]
                alt=(PreEscaped(escape_attr(&context.alt)))
                width=(data.fallback.width)
                height=(data.fallback.height)
                loading=(loading)
                fetchpriority=[context.is_above_fold.then_some("high")]
                style=(style)
                onload=[use_placeholder.then_some(ONLOAD_SWAP)];
        }
    }
    .into_string()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::transcode::ImageFormat;
    use crate::types::{OptimizedImage, ResponsiveImageSet};

    fn variant(src: &str, width: u32, height: u32) -> OptimizedImage {
        OptimizedImage {
            src: src.to_string(),
            width,
            height,
            attributes: BTreeMap::new(),
        }
    }

    fn set(format: ImageFormat, names: &[&str]) -> ResponsiveImageSet {
        let breakpoints = names
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    variant(&format!("/v/{format}-{name}"), 640, 480),
                )
            })
            .collect();
        ResponsiveImageSet {
            format,
            mime_type: format.mime_type(),
            breakpoints,
        }
    }

    fn data(placeholder: bool) -> ProcessedImageData {
        ProcessedImageData {
            sets: vec![
                set(ImageFormat::Avif, &["mobile", "tablet", "desktop"]),
                set(ImageFormat::Webp, &["mobile", "tablet", "desktop"]),
            ],
            fallback: variant("/v/fallback", 1200, 900),
            placeholder: placeholder.then(|| variant("/v/placeholder", 20, 15)),
        }
    }

    fn context(is_above_fold: bool) -> ImageContext {
        ImageContext {
            src: "/photo.jpg".to_string(),
            alt: "A photo".to_string(),
            is_above_fold,
            index: 0,
        }
    }

    // =========================================================================
    // <img> policy
    // =========================================================================

    #[test]
    fn above_fold_uses_eager_high_priority_fallback() {
        let html = build_picture_element(&data(true), &context(true), &OptimizeConfig::default());

        assert!(html.contains("src=\"/v/fallback\""));
        assert!(html.contains("loading=\"eager\""));
        assert!(html.contains("fetchpriority=\"high\""));
        assert!(!html.contains("data-src"));
        assert!(!html.contains("onload"));
        assert!(!html.contains("blur"));
    }

    #[test]
    fn below_fold_with_placeholder_blurs_and_defers() {
        let html = build_picture_element(&data(true), &context(false), &OptimizeConfig::default());

        assert!(html.contains("src=\"/v/placeholder\""));
        assert!(html.contains("data-src=\"/v/fallback\""));
        assert!(html.contains("loading=\"lazy\""));
        assert!(html.contains("filter: blur(2px)"));
        assert!(html.contains("onload=\"this.style.filter='none';"));
        assert!(!html.contains("fetchpriority"));
    }

    #[test]
    fn below_fold_without_placeholder_is_plain_lazy() {
        let html = build_picture_element(&data(false), &context(false), &OptimizeConfig::default());

        assert!(html.contains("src=\"/v/fallback\""));
        assert!(html.contains("loading=\"lazy\""));
        assert!(!html.contains("data-src"));
        assert!(!html.contains("onload"));
    }

    #[test]
    fn lazy_loading_disabled_forces_eager() {
        let config = OptimizeConfig {
            enable_lazy_loading: false,
            ..Default::default()
        };
        let html = build_picture_element(&data(false), &context(false), &config);
        assert!(html.contains("loading=\"eager\""));
    }

    #[test]
    fn dimensions_always_from_fallback() {
        // Placeholder is displayed, but the layout box is the fallback's.
        let html = build_picture_element(&data(true), &context(false), &OptimizeConfig::default());
        assert!(html.contains("width=\"1200\""));
        assert!(html.contains("height=\"900\""));
    }

    #[test]
    fn alt_text_is_escaped() {
        let mut ctx = context(true);
        ctx.alt = "A & B <\"x\"> 'y'".to_string();
        let html = build_picture_element(&data(true), &ctx, &OptimizeConfig::default());
        assert!(html.contains("alt=\"A &amp; B &lt;&quot;x&quot;&gt; &#39;y&#39;\""));
    }

    // =========================================================================
    // <picture> and <source> structure
    // =========================================================================

    #[test]
    fn picture_reserves_aspect_ratio() {
        let html = build_picture_element(&data(true), &context(true), &OptimizeConfig::default());
        assert!(html.starts_with("<picture style=\"display: block; width: 100%; aspect-ratio: "));
    }

    #[test]
    fn sources_ordered_by_format_then_breakpoint() {
        let html = build_picture_element(&data(true), &context(true), &OptimizeConfig::default());

        let order = [
            "/v/avif-mobile",
            "/v/avif-tablet",
            "/v/avif-desktop",
            "/v/webp-mobile",
            "/v/webp-tablet",
            "/v/webp-desktop",
        ];
        let positions: Vec<_> = order.iter().map(|src| html.find(src).unwrap()).collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));

        assert_eq!(html.matches("<source").count(), 6);
        assert!(html.contains("type=\"image/avif\""));
        assert!(html.contains("type=\"image/webp\""));
        assert!(html.contains("media=\"(max-width: 639px)\""));
    }

    #[test]
    fn missing_breakpoint_variant_is_omitted() {
        let mut d = data(true);
        d.sets[0] = set(ImageFormat::Avif, &["mobile", "desktop"]);
        let html = build_picture_element(&d, &context(true), &OptimizeConfig::default());

        assert_eq!(html.matches("<source").count(), 5);
        assert!(!html.contains("/v/avif-tablet"));
    }

    #[test]
    fn exactly_one_img_element() {
        let html = build_picture_element(&data(true), &context(false), &OptimizeConfig::default());
        assert_eq!(html.matches("<img").count(), 1);
        assert!(html.ends_with("</picture>"));
    }
}
