//! Progress-callback trait for analysis stage events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to hear about
//! each stage of an [`analyze`](crate::analyze::analyze) call as it happens:
//! slicing, uploading, retries, the response, and the structured result.
//!
//! # Example
//!
//! ```rust
//! use docsift::{AnalysisConfig, AnalysisProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//!
//! struct RetryCounter(AtomicU32);
//!
//! impl AnalysisProgressCallback for RetryCounter {
//!     fn on_retry(&self, attempt: u32, max_retries: u32, reason: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("retry {attempt}/{max_retries}: {reason}");
//!     }
//! }
//!
//! let config = AnalysisConfig::builder()
//!     .progress_callback(Arc::new(RetryCounter(AtomicU32::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::config::PageRange;
use std::sync::Arc;

/// Called by the analysis pipeline as it moves through its stages.
///
/// Implementations must be `Send + Sync`: the web server runs many analyses
/// at once and may share one callback between them. All methods have default
/// no-op implementations so callers only override what they care about.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once the input has been resolved to a local file.
    fn on_analysis_start(&self, file_name: &str) {
        let _ = file_name;
    }

    /// Called after the requested pages were copied into the upload file.
    ///
    /// # Arguments
    /// * `range`        — the pages that were kept
    /// * `source_pages` — page count of the original PDF
    fn on_slice_complete(&self, range: PageRange, source_pages: usize) {
        let _ = (range, source_pages);
    }

    /// Called just before the first upload attempt.
    fn on_upload_start(&self, bytes: u64) {
        let _ = bytes;
    }

    /// Called before each retry of the upload.
    ///
    /// # Arguments
    /// * `attempt`     — 1-based retry number
    /// * `max_retries` — configured retry budget
    /// * `reason`      — why the previous attempt failed
    fn on_retry(&self, attempt: u32, max_retries: u32, reason: &str) {
        let _ = (attempt, max_retries, reason);
    }

    /// Called when the service answered successfully.
    fn on_response(&self, status: u16, elapsed_ms: u64) {
        let _ = (status, elapsed_ms);
    }

    /// Called once the markdown has been restructured.
    fn on_analysis_complete(&self, sections: usize, assets: usize) {
        let _ = (sections, assets);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
