//! # picweave
//!
//! Rewrites `<img>` elements in an HTML document into responsive
//! `<picture>` markup backed by an image-transcoding endpoint: per-image
//! variants across formats and breakpoints, a blur-up placeholder for
//! below-the-fold images, lazy-loading and priority hints, and graceful
//! per-image degradation when anything fails.
//!
//! # Architecture: One Pass, Isolated Failures
//!
//! Data flows one direction through the pipeline:
//!
//! ```text
//! raw HTML → DOM → per-image contexts → variant sets → <picture> fragments → rewritten DOM → HTML
//! ```
//!
//! Each image's outcome is captured independently. The worst case for a
//! broken image is that it keeps its original element with basic
//! lazy-loading attributes patched in — one unreachable source never
//! breaks the page, and never touches its neighbors.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`optimize`] | Entry point — eligibility, per-image fan-out, replacement, serialization |
//! | [`process`] | Per-image orchestration across formats + the degrade-gracefully path |
//! | [`markup`] | `<picture>`/`<source>`/`<img>` fragment rendering via Maud |
//! | [`transcode`] | Dimension math, the backend seam, and variant production |
//! | [`cache`] | At-most-once memoization of variant production |
//! | [`dom`] | HTML parsing (html5ever) into a mutable arena tree + serialization |
//! | [`config`] | Sparse options over defaults, validation, TOML loading |
//! | [`types`] | Data types shared across pipeline stages |
//!
//! # Design Decisions
//!
//! ## The Backend Does No Pixel Work
//!
//! Variants resolve to image-service endpoint URLs
//! (`/_image?href=…&w=…&f=…&q=…`); the endpoint transcodes on request.
//! That keeps this crate a pure HTML transformation — fast enough to run
//! inside a build step or a rendering hot path — while the
//! [`transcode::TranscodeBackend`] trait leaves room for a backend that
//! encodes locally.
//!
//! ## Explicit Cache Ownership
//!
//! Variant memoization lives in a [`cache::VariantCache`] owned by each
//! [`optimize::ImageOptimizer`] — no process-wide singleton, no hidden
//! global state. Reuse one optimizer for process-lifetime caching;
//! `clear_cache` is the explicit escape hatch for its unbounded growth.
//! Concurrent requests for the same variant collapse into a single
//! backend call.
//!
//! ## Maud Over String Concatenation
//!
//! Replacement fragments are rendered with
//! [Maud](https://maud.lambda.xyz/): malformed markup is a compile
//! error, and interpolation is escaped by default. The fragment is
//! spliced into the document tree verbatim and serialized in place.
//!
//! ## Parse Into an Arena, Not `Rc<RefCell>`
//!
//! html5ever's reference-counted DOM is converted into a flat arena tree
//! immediately after parsing. Queries and mutations work on plain
//! indices, and the serializer walks the arena back out — including the
//! raw fragments spliced in by the rewriter.

pub mod cache;
pub mod config;
pub mod dom;
pub mod markup;
pub mod optimize;
pub mod process;
pub mod transcode;
pub mod types;
