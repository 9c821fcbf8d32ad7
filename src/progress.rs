//! Progress-callback trait for comparison-run events.
//!
//! Inject an [`Arc<dyn ComparisonProgressCallback>`] via
//! [`crate::config::CompareConfigBuilder::progress_callback`] to receive
//! events as the run extracts documents and moves through the three stages.
//!
//! # Why callbacks instead of channels?
//!
//! Callers can forward events to a terminal progress bar, a channel or a log
//! without the library knowing how the host application communicates. The
//! trait is `Send + Sync` because summary calls may run concurrently when
//! `summary_concurrency > 1`.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfcompare::{ComparisonProgressCallback, CompareConfig, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct StageCounter {
//!     finished: AtomicUsize,
//! }
//!
//! impl ComparisonProgressCallback for StageCounter {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         self.finished.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{stage} done in {elapsed_ms}ms");
//!     }
//! }
//!
//! let config = CompareConfig::builder()
//!     .progress_callback(Arc::new(StageCounter { finished: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::Stage;
use std::sync::Arc;

/// Called by the orchestrator and pipeline as a run progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ComparisonProgressCallback: Send + Sync {
    /// Called once, after preconditions pass and before any extraction.
    fn on_run_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called after each document's text has been extracted.
    ///
    /// # Arguments
    /// * `index`: 1-indexed position of the document in input order
    /// * `chars`: characters of extracted text
    fn on_document_extracted(&self, index: usize, total: usize, name: &str, chars: usize) {
        let _ = (index, total, name, chars);
    }

    /// Called when a pipeline stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when one document's summary call returns.
    fn on_summary_complete(&self, index: usize, total: usize, name: &str, payload_len: usize) {
        let _ = (index, total, name, payload_len);
    }

    /// Called when a pipeline stage finishes successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called when a stage fails; the run aborts right after.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once after all three stages succeeded.
    fn on_run_complete(&self, total_documents: usize) {
        let _ = total_documents;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ComparisonProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::CompareConfig`].
pub type ProgressCallback = Arc<dyn ComparisonProgressCallback>;
