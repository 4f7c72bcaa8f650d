//! Processing options and configuration.

use std::time::Duration;

use crate::scheduler::OnPageFailure;

/// Lowest DPI accepted for barcode rasterization (inclusive).
pub const MIN_BARCODE_DPI: u32 = 150;

/// Highest DPI accepted for barcode rasterization (inclusive).
pub const MAX_BARCODE_DPI: u32 = 600;

/// How workers acquire the document during page dispatch.
///
/// A document handle is an ownership unit scoped to one acquisition; workers
/// that cannot share it must re-acquire their own handle by path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerIsolation {
    /// All workers read pages through one shared open handle.
    #[default]
    SharedHandle,
    /// Each page task reopens the document by path and releases it when done.
    PerPageHandle,
}

/// Options for page-parallel document processing.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Maximum number of concurrently executing page transforms.
    pub threads: usize,

    /// Number of pages handed to the pool per round-trip. Tuning only;
    /// ordering holds for any value.
    pub batch_size: usize,

    /// DPI for barcode rasterization. Must lie in
    /// [`MIN_BARCODE_DPI`]..=[`MAX_BARCODE_DPI`] or every page yields an
    /// empty barcode list.
    pub dpi: u32,

    /// What to do when a page transform fails without containing the error.
    pub on_page_failure: OnPageFailure,

    /// How workers acquire the document.
    pub isolation: WorkerIsolation,

    /// Advisory per-operation time budget. Exceeding it records a warning;
    /// nothing is aborted.
    pub soft_timeout: Option<Duration>,
}

impl ProcessOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the barcode rasterization DPI.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Set the uncontained-failure policy.
    pub fn with_failure_policy(mut self, policy: OnPageFailure) -> Self {
        self.on_page_failure = policy;
        self
    }

    /// Set the worker isolation mode.
    pub fn with_isolation(mut self, isolation: WorkerIsolation) -> Self {
        self.isolation = isolation;
        self
    }

    /// Set the advisory soft timeout.
    pub fn with_soft_timeout(mut self, timeout: Duration) -> Self {
        self.soft_timeout = Some(timeout);
        self
    }
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            batch_size: 10,
            dpi: 200,
            on_page_failure: OnPageFailure::default(),
            isolation: WorkerIsolation::default(),
            soft_timeout: None,
        }
    }
}

/// Default worker count: `min(8, available parallelism or 2)`.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
        .min(8)
}
