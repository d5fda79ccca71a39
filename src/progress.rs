//! Progress-callback trait for batch runs.
//!
//! Pass an [`Arc<dyn BatchProgressCallback>`] to
//! [`crate::Pipeline::process_files`] to receive events as each file moves
//! through the pipeline. The CLI uses it to drive its progress bar.
//!
//! # Example
//!
//! ```rust
//! use stamp2pdf::{BatchProgressCallback, PipelineOutput};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, name: &str, output: &PipelineOutput) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{name} → {}", output.document.path.display());
//!     }
//! }
//! ```

use crate::error::StampError;
use crate::output::PipelineOutput;
use std::sync::Arc;

/// Called by [`crate::Pipeline::process_files`] as it works through a batch.
///
/// Files are processed concurrently, so `on_file_*` may be called from
/// several threads at once. All methods default to no-ops.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before any file is read.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called when a file's bytes are about to be read.
    fn on_file_start(&self, name: &str) {
        let _ = name;
    }

    /// Called when a file produced both artifacts.
    fn on_file_complete(&self, name: &str, output: &PipelineOutput) {
        let _ = (name, output);
    }

    /// Called when any stage failed for a file.
    fn on_file_error(&self, name: &str, error: &StampError) {
        let _ = (name, error);
    }

    /// Called once after every file has been attempted.
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation, used when no callback is supplied.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Shared callback handle.
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
