//! Ordered, bounded-concurrency batch scheduling.
//!
//! [`BatchScheduler`] partitions an ordered sequence of work items into
//! fixed-size batches, dispatches each batch to a worker pool, and yields
//! results in the original input order regardless of which worker finished
//! first. Batching caps the granularity of work handed to the pool per
//! round-trip; it never changes the ordering contract, which holds for
//! `batch_size = N` identically to any smaller value.

use std::sync::Arc;

use crate::diag::{Context, DiagnosticsSink, LogSink, Severity};
use crate::error::{Error, Result};

/// Policy for a page transform failure that was not contained by the
/// transform itself (i.e. the transform returned `Err` instead of resolving
/// to a sentinel value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnPageFailure {
    /// The first uncontained failure is fatal for the whole run.
    #[default]
    Abort,
    /// Replace the failing page's result with the sentinel value and
    /// continue.
    SkipPage,
    /// Replace every result of the failing page's batch with the sentinel
    /// value and continue with the next batch.
    SkipBatch,
}

/// Strategy for executing one batch of transforms.
///
/// Implementations must preserve input order in their output; concurrency is
/// an implementation detail behind that contract.
pub trait Executor {
    /// Apply `transform` to every item and return the results in input order.
    fn map<T, R, F>(&self, items: Vec<T>, transform: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync;
}

/// Executor backed by a bounded rayon thread pool.
///
/// At most `worker_count` transforms execute concurrently. Workers push
/// `(slot, result)` pairs through a channel and the batch is reassembled by
/// slot index, so completion order never leaks into the output.
pub struct ThreadPoolExecutor {
    pool: rayon::ThreadPool,
}

impl ThreadPoolExecutor {
    /// Build a pool with the given worker count (clamped to at least 1).
    pub fn new(worker_count: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count.max(1))
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Number of workers in the pool.
    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl Executor for ThreadPoolExecutor {
    fn map<T, R, F>(&self, items: Vec<T>, transform: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync,
    {
        let (tx, rx) = crossbeam_channel::unbounded();
        let transform = &transform;
        self.pool.scope(|scope| {
            for (slot, item) in items.into_iter().enumerate() {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let _ = tx.send((slot, transform(item)));
                });
            }
        });
        drop(tx);

        let mut slotted: Vec<(usize, R)> = rx.into_iter().collect();
        slotted.sort_unstable_by_key(|&(slot, _)| slot);
        slotted.into_iter().map(|(_, result)| result).collect()
    }
}

/// Executor that runs every transform on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialExecutor;

impl Executor for SequentialExecutor {
    fn map<T, R, F>(&self, items: Vec<T>, transform: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync,
    {
        items.into_iter().map(transform).collect()
    }
}

/// Ordered map over an input sequence with batched pool dispatch.
pub struct BatchScheduler<E = ThreadPoolExecutor> {
    executor: E,
    batch_size: usize,
    on_failure: OnPageFailure,
    diag: Arc<dyn DiagnosticsSink>,
}

impl<E: Executor> BatchScheduler<E> {
    /// Create a scheduler. `batch_size` is clamped to at least 1.
    pub fn new(executor: E, batch_size: usize) -> Self {
        Self {
            executor,
            batch_size: batch_size.max(1),
            on_failure: OnPageFailure::default(),
            diag: Arc::new(LogSink),
        }
    }

    /// Set the uncontained-failure policy.
    pub fn with_failure_policy(mut self, policy: OnPageFailure) -> Self {
        self.on_failure = policy;
        self
    }

    /// Set the diagnostics sink.
    pub fn with_diagnostics(mut self, diag: Arc<dyn DiagnosticsSink>) -> Self {
        self.diag = diag;
        self
    }

    /// Configured batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Apply `transform` to every item, in batches, and return the results
    /// in input order.
    ///
    /// Transforms are expected to contain their own failures and resolve
    /// them to `Ok` sentinel values; an `Err` is handled according to the
    /// configured [`OnPageFailure`] policy, substituting `R::default()`
    /// where a result is skipped. Each item is attempted exactly once; there
    /// is no caching and no retry.
    pub fn run<T, R, F>(&self, items: Vec<T>, transform: F) -> Result<Vec<R>>
    where
        T: Send,
        R: Send + Default,
        F: Fn(T) -> Result<R> + Sync,
    {
        let total = items.len();
        let mut results = Vec::with_capacity(total);
        let mut items = items.into_iter();
        let mut offset = 0usize;

        loop {
            let batch: Vec<T> = items.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }
            let batch_len = batch.len();
            let outcomes = self.executor.map(batch, |item| transform(item));
            self.fold_batch(outcomes, offset, batch_len, &mut results)?;
            offset += batch_len;
        }

        debug_assert_eq!(results.len(), total);
        Ok(results)
    }

    /// Apply the failure policy to one batch's outcomes.
    fn fold_batch<R: Default>(
        &self,
        outcomes: Vec<Result<R>>,
        offset: usize,
        batch_len: usize,
        results: &mut Vec<R>,
    ) -> Result<()> {
        match self.on_failure {
            OnPageFailure::Abort => {
                for outcome in outcomes {
                    results.push(outcome?);
                }
            }
            OnPageFailure::SkipPage => {
                for (slot, outcome) in outcomes.into_iter().enumerate() {
                    results.push(outcome.unwrap_or_else(|e| {
                        self.diag.record(
                            Severity::Error,
                            &Context::page(offset + slot + 1),
                            &format!("transform failed, using empty result: {e}"),
                        );
                        R::default()
                    }));
                }
            }
            OnPageFailure::SkipBatch => {
                let failed = outcomes.iter().any(|o| o.is_err());
                if failed {
                    for (slot, outcome) in outcomes.iter().enumerate() {
                        if let Err(e) = outcome {
                            self.diag.record(
                                Severity::Error,
                                &Context::page(offset + slot + 1),
                                &format!("transform failed, skipping batch: {e}"),
                            );
                        }
                    }
                    results.extend((0..batch_len).map(|_| R::default()));
                } else {
                    results.extend(outcomes.into_iter().filter_map(|o| o.ok()));
                }
            }
        }
        Ok(())
    }
}
