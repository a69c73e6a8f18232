//! Pure calculation functions for variant dimensions.
//!
//! All functions here are pure and testable without a backend or a
//! document.

use serde::{Deserialize, Serialize};

/// Hard ceiling on generated variant width, regardless of what a
/// breakpoint or caller requests.
const WIDTH_CAP: u32 = 2400;

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Derive concrete pixel dimensions from a target width and aspect ratio.
///
/// Width is capped at 2400; height is the rounded result of
/// `width / aspect_ratio`.
///
/// # Examples
/// ```
/// # use picweave::transcode::{calculate_dimensions, Dimensions};
/// // 4:3 at 800px wide → 800x600
/// assert_eq!(
///     calculate_dimensions(800, 4.0 / 3.0),
///     Dimensions { width: 800, height: 600 }
/// );
/// ```
pub fn calculate_dimensions(base_width: u32, aspect_ratio: f64) -> Dimensions {
    let width = base_width.min(WIDTH_CAP);
    let height = (width as f64 / aspect_ratio).round() as u32;
    Dimensions { width, height }
}

/// Constrain dimensions to a maximum width.
///
/// Dimensions already within the limit are returned unchanged. Otherwise
/// the pair is recomputed from the *input's own* width/height ratio, not
/// the globally configured one — a variant that was derived with a custom
/// ratio keeps it when rescaled.
pub fn constrain_to_max_width(dimensions: Dimensions, max_width: u32) -> Dimensions {
    if dimensions.width <= max_width {
        return dimensions;
    }
    let aspect_ratio = dimensions.width as f64 / dimensions.height as f64;
    calculate_dimensions(max_width, aspect_ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // calculate_dimensions tests
    // =========================================================================

    #[test]
    fn calculates_height_from_aspect_ratio() {
        assert_eq!(
            calculate_dimensions(1200, 4.0 / 3.0),
            Dimensions {
                width: 1200,
                height: 900
            }
        );
    }

    #[test]
    fn rounds_height_to_nearest_pixel() {
        // 640 / (4/3) = 480; 20 / (4/3) = 15
        assert_eq!(calculate_dimensions(640, 4.0 / 3.0).height, 480);
        assert_eq!(calculate_dimensions(20, 4.0 / 3.0).height, 15);
        // 100 / 3.0 = 33.33 → 33
        assert_eq!(calculate_dimensions(100, 3.0).height, 33);
    }

    #[test]
    fn caps_width_at_2400() {
        let dims = calculate_dimensions(5000, 2.0);
        assert_eq!(dims.width, 2400);
        assert_eq!(dims.height, 1200);
    }

    #[test]
    fn square_aspect() {
        assert_eq!(
            calculate_dimensions(300, 1.0),
            Dimensions {
                width: 300,
                height: 300
            }
        );
    }

    // =========================================================================
    // constrain_to_max_width tests
    // =========================================================================

    #[test]
    fn unchanged_when_within_limit() {
        let dims = Dimensions {
            width: 640,
            height: 480,
        };
        assert_eq!(constrain_to_max_width(dims, 1200), dims);
    }

    #[test]
    fn unchanged_at_exact_limit() {
        let dims = Dimensions {
            width: 1200,
            height: 900,
        };
        assert_eq!(constrain_to_max_width(dims, 1200), dims);
    }

    #[test]
    fn rescales_past_limit() {
        let dims = Dimensions {
            width: 2400,
            height: 1800,
        };
        assert_eq!(
            constrain_to_max_width(dims, 1200),
            Dimensions {
                width: 1200,
                height: 900
            }
        );
    }

    #[test]
    fn rescaling_preserves_input_ratio_not_a_default() {
        // 4:1 input stays 4:1 after constraining
        let dims = Dimensions {
            width: 1600,
            height: 400,
        };
        assert_eq!(
            constrain_to_max_width(dims, 800),
            Dimensions {
                width: 800,
                height: 200
            }
        );
    }

    #[test]
    fn constrained_width_never_exceeds_max() {
        for width in [801, 1200, 2399, 2400] {
            let dims = Dimensions { width, height: 600 };
            assert!(constrain_to_max_width(dims, 800).width <= 800);
        }
    }
}
