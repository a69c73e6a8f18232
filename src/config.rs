//! Optimization configuration.
//!
//! [`OptimizeConfig`] is the resolved, immutable configuration for one
//! optimization run. Callers supply [`OptimizeOptions`] — a sparse
//! overlay where only the values to override are set — and resolution
//! fills the rest from defaults. Once resolved, a config is never
//! mutated; the pipeline passes it by shared reference.
//!
//! ## Options File
//!
//! The CLI accepts the same options as a TOML file:
//!
//! ```toml
//! # All keys are optional - defaults shown below
//!
//! enable_webp = true
//! enable_avif = true
//! max_width = 1200              # Cap on generated variant width
//! quality = 80                  # Encoding quality (1-100)
//! enable_lazy_loading = true
//! add_placeholder = true        # Blur-up placeholder for below-fold images
//! aspect_ratio = 1.3333333333333333
//! formats = ["avif", "webp", "jpeg"]
//! above_fold_threshold = 2      # Leading images treated as high priority
//! placeholder_quality = 10
//! parallel = true
//!
//! [placeholder_size]
//! width = 20
//! height = 15
//!
//! [[breakpoints]]
//! name = "mobile"
//! width = 640
//! media_query = "(max-width: 639px)"
//! # ... tablet, desktop
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transcode::{Dimensions, ImageFormat, Quality};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("config validation error: {0}")]
    Validation(String),
}

/// A named viewport bucket.
///
/// Order matters: the configured breakpoint order determines the order
/// `<source>` elements are emitted within each format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub name: String,
    pub width: u32,
    pub media_query: String,
}

impl Breakpoint {
    fn new(name: &str, width: u32, media_query: &str) -> Self {
        Self {
            name: name.to_string(),
            width,
            media_query: media_query.to_string(),
        }
    }

    /// The stock mobile/tablet/desktop ladder.
    pub fn defaults() -> Vec<Breakpoint> {
        vec![
            Breakpoint::new("mobile", 640, "(max-width: 639px)"),
            Breakpoint::new("tablet", 768, "(min-width: 640px) and (max-width: 767px)"),
            Breakpoint::new("desktop", 1200, "(min-width: 768px)"),
        ]
    }
}

/// Resolved configuration for one optimization run.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeConfig {
    /// Emit WebP `<source>` sets.
    pub enable_webp: bool,
    /// Emit AVIF `<source>` sets.
    pub enable_avif: bool,
    /// Cap on generated variant width.
    pub max_width: u32,
    /// Encoding quality for responsive variants.
    pub quality: Quality,
    /// `loading="lazy"` below the fold (everything is eager when off).
    pub enable_lazy_loading: bool,
    /// Generate a blur-up placeholder for below-fold images.
    pub add_placeholder: bool,
    /// Aspect ratio applied to breakpoint-derived dimensions.
    pub aspect_ratio: f64,
    /// Ordered viewport buckets; one `<source>` per format per bucket.
    pub breakpoints: Vec<Breakpoint>,
    /// Ordered formats to attempt (gated by the enable toggles).
    pub formats: Vec<ImageFormat>,
    /// Count of leading images treated as above the fold.
    pub above_fold_threshold: usize,
    /// Encoding quality for placeholders.
    pub placeholder_quality: Quality,
    /// Pixel size of the placeholder variant.
    pub placeholder_size: Dimensions,
    /// Fan out across images, formats, and breakpoints.
    pub parallel: bool,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            enable_webp: true,
            enable_avif: true,
            max_width: 1200,
            quality: Quality::new(80),
            enable_lazy_loading: true,
            add_placeholder: true,
            aspect_ratio: 4.0 / 3.0,
            breakpoints: Breakpoint::defaults(),
            formats: vec![ImageFormat::Avif, ImageFormat::Webp, ImageFormat::Jpeg],
            above_fold_threshold: 2,
            placeholder_quality: Quality::new(10),
            placeholder_size: Dimensions {
                width: 20,
                height: 15,
            },
            parallel: true,
        }
    }
}

impl OptimizeConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.aspect_ratio.is_finite() || self.aspect_ratio <= 0.0 {
            return Err(ConfigError::Validation(
                "aspect_ratio must be a positive number".into(),
            ));
        }
        if self.max_width == 0 {
            return Err(ConfigError::Validation("max_width must be non-zero".into()));
        }
        if self.breakpoints.is_empty() {
            return Err(ConfigError::Validation(
                "at least one breakpoint is required".into(),
            ));
        }
        let mut names = HashSet::new();
        for breakpoint in &self.breakpoints {
            if breakpoint.width == 0 {
                return Err(ConfigError::Validation(format!(
                    "breakpoint '{}' must have a non-zero width",
                    breakpoint.name
                )));
            }
            if !names.insert(breakpoint.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate breakpoint name '{}'",
                    breakpoint.name
                )));
            }
        }
        if self.formats.is_empty() {
            return Err(ConfigError::Validation(
                "at least one format is required".into(),
            ));
        }
        if self.placeholder_size.width == 0 || self.placeholder_size.height == 0 {
            return Err(ConfigError::Validation(
                "placeholder_size dimensions must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Sparse caller-supplied overrides.
///
/// Every field is optional; unset fields resolve to the stock defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizeOptions {
    pub enable_webp: Option<bool>,
    pub enable_avif: Option<bool>,
    pub max_width: Option<u32>,
    pub quality: Option<u32>,
    pub enable_lazy_loading: Option<bool>,
    pub add_placeholder: Option<bool>,
    pub aspect_ratio: Option<f64>,
    pub breakpoints: Option<Vec<Breakpoint>>,
    pub formats: Option<Vec<ImageFormat>>,
    pub above_fold_threshold: Option<usize>,
    pub placeholder_quality: Option<u32>,
    pub placeholder_size: Option<Dimensions>,
    pub parallel: Option<bool>,
}

impl OptimizeOptions {
    /// Overlay these options onto the defaults.
    pub fn resolve(&self) -> OptimizeConfig {
        let defaults = OptimizeConfig::default();
        OptimizeConfig {
            enable_webp: self.enable_webp.unwrap_or(defaults.enable_webp),
            enable_avif: self.enable_avif.unwrap_or(defaults.enable_avif),
            max_width: self.max_width.unwrap_or(defaults.max_width),
            quality: self.quality.map(Quality::new).unwrap_or(defaults.quality),
            enable_lazy_loading: self
                .enable_lazy_loading
                .unwrap_or(defaults.enable_lazy_loading),
            add_placeholder: self.add_placeholder.unwrap_or(defaults.add_placeholder),
            aspect_ratio: self.aspect_ratio.unwrap_or(defaults.aspect_ratio),
            breakpoints: self.breakpoints.clone().unwrap_or(defaults.breakpoints),
            formats: self.formats.clone().unwrap_or(defaults.formats),
            above_fold_threshold: self
                .above_fold_threshold
                .unwrap_or(defaults.above_fold_threshold),
            placeholder_quality: self
                .placeholder_quality
                .map(Quality::new)
                .unwrap_or(defaults.placeholder_quality),
            placeholder_size: self.placeholder_size.unwrap_or(defaults.placeholder_size),
            parallel: self.parallel.unwrap_or(defaults.parallel),
        }
    }

    /// Load options from a TOML file (see the [module docs](self) for the
    /// format).
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}
