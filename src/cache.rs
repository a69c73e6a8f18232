//! Variant production cache.
//!
//! Transcoding the same variant twice is pure waste — within one document
//! the same image routinely appears at the same breakpoint dimensions for
//! several formats, and across documents (when one optimizer instance is
//! reused) whole variant sets repeat. This module memoizes variant
//! production so each unique (source, format, dimensions, quality)
//! combination is produced at most once per cache lifetime.
//!
//! # Coalescing
//!
//! Keys are typed ([`VariantKey`]) rather than formatted strings, so
//! distinct inputs cannot collide. Each key owns a `OnceLock` slot: the
//! first caller runs the factory, concurrent callers for the same key
//! block on the slot and then observe the first caller's result — at most
//! one production per key even under racing rayon workers.
//!
//! Failed productions are memoized too: a source that failed to transcode
//! keeps failing without re-contacting the backend until [`clear`] is
//! called.
//!
//! # Ownership
//!
//! There is no process-wide singleton. The cache is owned by its
//! optimizer; entries are never evicted automatically (unbounded for the
//! owner's lifetime) and are discarded wholesale by [`clear`].
//!
//! [`clear`]: VariantCache::clear

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::transcode::{Dimensions, ImageFormat, Quality, TranscodeError};
use crate::types::OptimizedImage;

/// Identity of one variant production.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantKey {
    pub src: String,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub quality: u32,
}

impl VariantKey {
    pub fn new(src: &str, format: ImageFormat, dimensions: Dimensions, quality: Quality) -> Self {
        Self {
            src: src.to_string(),
            format,
            width: dimensions.width,
            height: dimensions.height,
            quality: quality.value(),
        }
    }
}

type Slot = Arc<OnceLock<Result<OptimizedImage, TranscodeError>>>;

/// Memoizes variant production by [`VariantKey`].
#[derive(Debug, Default)]
pub struct VariantCache {
    entries: Mutex<HashMap<VariantKey, Slot>>,
}

impl VariantCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the memoized result for `key`, producing it on first use.
    ///
    /// The first caller for a key runs `produce`; every later or
    /// concurrent caller observes that same result without `produce`
    /// being invoked again, even when its own inputs were logically
    /// identical but arrived after production started.
    pub fn get_or_create<F>(&self, key: VariantKey, produce: F) -> Result<OptimizedImage, TranscodeError>
    where
        F: FnOnce() -> Result<OptimizedImage, TranscodeError>,
    {
        let slot = {
            let mut entries = self.entries.lock().expect("cache lock poisoned");
            entries
                .entry(key)
                .or_insert_with(|| Arc::new(OnceLock::new()))
                .clone()
        };
        // The map lock is already released: a slow production blocks only
        // callers of the same key.
        slot.get_or_init(produce).clone()
    }

    /// Discard every entry.
    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }

    /// Number of keys with a pending or settled production.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
