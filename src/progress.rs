//! Progress-callback trait for per-stage conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages.
//!
//! # Example
//!
//! ```rust
//! use turnpress::{ConversionConfig, ConversionProgressCallback, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{stage} done in {elapsed_ms}ms");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: AtomicUsize::new(0),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A step of the conversion pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    /// pandoc: docx → `temp.md`, media → `assets/`.
    ExtractMarkdown,
    /// pandoc: `temp.md` → `temp.html`.
    RenderHtml,
    /// HTML tree → Markdown, written back to `temp.md`.
    Transform,
}

impl Stage {
    /// Stages in the order a full conversion runs them.
    pub const ALL: [Stage; 3] = [Stage::ExtractMarkdown, Stage::RenderHtml, Stage::Transform];

    /// 1-indexed position, for "step n/3" displays.
    pub fn number(self) -> usize {
        match self {
            Stage::ExtractMarkdown => 1,
            Stage::RenderHtml => 2,
            Stage::Transform => 3,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::ExtractMarkdown => f.write_str("Extracting markdown and media"),
            Stage::RenderHtml => f.write_str("Rendering intermediate HTML"),
            Stage::Transform => f.write_str("Transforming HTML to Markdown"),
        }
    }
}

/// Called by the conversion pipeline as it runs each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Stages never overlap, but the trait is still
/// `Send + Sync` so a callback can be shared with other threads.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first stage.
    fn on_conversion_start(&self, total_stages: usize) {
        let _ = total_stages;
    }

    /// Called just before a stage starts.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finished successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called when a stage failed; the conversion stops afterwards.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once after the transform stage.
    ///
    /// * `markdown_len`: byte length of the produced Markdown
    fn on_conversion_complete(&self, markdown_len: usize) {
        let _ = markdown_len;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
