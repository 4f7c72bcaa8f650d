//! Integration tests for batch scheduling and executor strategies.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pdfcheck::{
    BatchScheduler, Error, Executor, MemorySink, OnPageFailure, SequentialExecutor,
    ThreadPoolExecutor,
};

#[test]
fn test_pool_bounds_concurrency() {
    let executor = ThreadPoolExecutor::new(3).unwrap();
    assert_eq!(executor.worker_count(), 3);

    let peak = Arc::new(AtomicUsize::new(0));
    let live = Arc::new(AtomicUsize::new(0));
    let (peak_ref, live_ref) = (peak.clone(), live.clone());

    let scheduler = BatchScheduler::new(executor, 50);
    let results = scheduler
        .run((0..50).collect(), move |i: usize| {
            let now = live_ref.fetch_add(1, Ordering::SeqCst) + 1;
            peak_ref.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(2));
            live_ref.fetch_sub(1, Ordering::SeqCst);
            Ok(i)
        })
        .unwrap();

    assert_eq!(results.len(), 50);
    assert!(peak.load(Ordering::SeqCst) <= 3);
}

#[test]
fn test_results_in_input_order_across_batches() {
    let scheduler = BatchScheduler::new(ThreadPoolExecutor::new(6).unwrap(), 7);
    let results = scheduler
        .run((0..100).collect(), |i: usize| {
            // Stagger completion so later items often finish first.
            std::thread::sleep(Duration::from_micros(((100 - i) % 13) as u64 * 50));
            Ok(format!("page-{i}"))
        })
        .unwrap();

    let expected: Vec<String> = (0..100).map(|i| format!("page-{i}")).collect();
    assert_eq!(results, expected);
}

#[test]
fn test_each_item_transformed_exactly_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_ref = calls.clone();

    let scheduler = BatchScheduler::new(ThreadPoolExecutor::new(4).unwrap(), 10);
    scheduler
        .run((0..33).collect(), move |i: usize| {
            calls_ref.fetch_add(1, Ordering::SeqCst);
            Ok(i)
        })
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 33);
}

#[test]
fn test_abort_stops_at_failing_batch() {
    let scheduler = BatchScheduler::new(SequentialExecutor, 4);
    let outcome = scheduler.run((0..12).collect(), |i: usize| {
        if i == 5 {
            Err(Error::page_transform(i + 1, "unreadable"))
        } else {
            Ok(i)
        }
    });
    assert!(matches!(outcome, Err(Error::PageTransform { page: 6, .. })));
}

#[test]
fn test_skip_page_records_one_based_page_numbers() {
    let sink = Arc::new(MemorySink::new());
    let scheduler = BatchScheduler::new(SequentialExecutor, 4)
        .with_failure_policy(OnPageFailure::SkipPage)
        .with_diagnostics(sink.clone());

    let results = scheduler
        .run((0..10).collect(), |i: usize| {
            if i == 7 {
                Err(Error::page_transform(i + 1, "unreadable"))
            } else {
                Ok(i as i64)
            }
        })
        .unwrap();

    assert_eq!(results[7], 0);
    assert_eq!(results.len(), 10);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    // Page 8 sits in the second batch; numbering stays global.
    assert_eq!(records[0].context.page, Some(8));
}

#[test]
fn test_custom_executor_plugs_in() {
    /// Executor that reverses its batch before mapping, to prove the
    /// scheduler's ordering does not depend on executor internals.
    struct ReversingExecutor;

    impl Executor for ReversingExecutor {
        fn map<T, R, F>(&self, items: Vec<T>, transform: F) -> Vec<R>
        where
            T: Send,
            R: Send,
            F: Fn(T) -> R + Sync,
        {
            let mut out: Vec<R> = items.into_iter().rev().map(transform).collect();
            out.reverse();
            out
        }
    }

    let scheduler = BatchScheduler::new(ReversingExecutor, 3);
    let results = scheduler.run((0..9).collect(), |i: usize| Ok(i * 2)).unwrap();
    assert_eq!(results, vec![0, 2, 4, 6, 8, 10, 12, 14, 16]);
}
