//! Progress-callback trait for conversion-round events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ClientConfigBuilder::progress_callback`] to receive
//! events as the session uploads the batch and polls each file.
//!
//! # Example
//!
//! ```rust
//! use pdf_convert_client::{ClientConfig, ConversionProgressCallback, ProgressSnapshot};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct LastPercent(AtomicUsize);
//!
//! impl ConversionProgressCallback for LastPercent {
//!     fn on_progress(&self, snapshot: &ProgressSnapshot) {
//!         self.0.store(snapshot.percent() as usize, Ordering::SeqCst);
//!         eprintln!("{} {}%", snapshot.label(), snapshot.percent());
//!     }
//! }
//!
//! let config = ClientConfig::builder()
//!     .progress_callback(Arc::new(LastPercent(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::model::ConversionResult;
use serde::Serialize;
use std::sync::Arc;

/// How far a conversion round has got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    /// Results that have reached success.
    pub completed: usize,
    /// Results in the round.
    pub total: usize,
}

impl ProgressSnapshot {
    pub fn new(completed: usize, total: usize) -> Self {
        Self { completed, total }
    }

    /// Percentage complete, `round(100 * completed / total)`.
    ///
    /// An empty round counts as finished.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let pct = (self.completed as f64 * 100.0 / self.total as f64).round();
        pct.clamp(0.0, 100.0) as u8
    }

    /// Human-readable status line, e.g. `Converting file 2 of 5...`.
    pub fn label(&self) -> String {
        format!("Converting file {} of {}...", self.completed, self.total)
    }

    pub fn is_finished(&self) -> bool {
        self.completed >= self.total
    }
}

/// Called by the session as a conversion round progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`; status
/// queries within one tick run concurrently, although every callback is
/// invoked from the task driving the session.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the batch is submitted.
    fn on_conversion_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called once the service has acknowledged the submission.
    fn on_upload_complete(&self, results: &[ConversionResult]) {
        let _ = results;
    }

    /// Called after the fast path and after every poll tick.
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        let _ = snapshot;
    }

    /// Called when one status query fails. Polling continues.
    fn on_poll_error(&self, file_id: &str, error: &str) {
        let _ = (file_id, error);
    }

    /// Called once every result has reached a terminal status.
    fn on_conversion_complete(&self, results: &[ConversionResult]) {
        let _ = results;
    }

    /// Called when the submission fails; the session has been reset.
    fn on_conversion_failed(&self, message: &str) {
        let _ = message;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ClientConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
