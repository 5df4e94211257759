//! Stress tests for collections.
//!
//! These exercise a shared collection from several threads at once.

use crate::fixtures::{sample_feedback, FeedbackCollection};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 200,
            threads: 4,
        }
    }
}

fn run_threads<F>(config: &StressConfig, op: F) -> StressTestResult
where
    F: Fn(usize, usize) -> bool + Send + Sync + 'static,
{
    let op = Arc::new(op);
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let op = Arc::clone(&op);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let operations = config.operations;

            thread::spawn(move || {
                for i in 0..operations {
                    if op(t, i) {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Creates feedback from every thread at once.
pub fn stress_concurrent_creates(feedback: &FeedbackCollection, config: &StressConfig) -> StressTestResult {
    let feedback = feedback.clone();
    let per_thread = config.operations;
    run_threads(config, move |t, i| {
        let mut record = sample_feedback(t * per_thread + i);
        feedback.create(&mut record, &[]).is_ok()
    })
}

/// Upserts a small shared pool of records from every thread, so updates
/// and creates race on the same identities.
pub fn stress_concurrent_upserts(feedback: &FeedbackCollection, config: &StressConfig) -> StressTestResult {
    let mut pool: Vec<_> = (0..8).map(sample_feedback).collect();
    for record in &mut pool {
        if feedback.create(record, &[]).is_err() {
            return StressTestResult::new(0, pool.len(), Duration::ZERO);
        }
    }

    let pool = Arc::new(pool);
    let feedback = feedback.clone();
    run_threads(config, move |t, i| {
        let mut record = pool[(t + i) % pool.len()].clone();
        record.description = format!("revision {t}-{i}");
        feedback.upsert(&mut record, &[]).is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Feedback, TestCollections};
    use horizon_core::Record;

    #[test]
    fn test_concurrent_creates() {
        let (collections, recorder) = TestCollections::recording();
        let config = StressConfig {
            operations: 50,
            threads: 4,
        };

        let result = stress_concurrent_creates(&collections.feedback, &config);
        assert_eq!(result.successful_ops, 200);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(collections.store.row_count(Feedback::TABLE), 200);

        collections.settle();
        assert_eq!(recorder.published_to("feedback.create").len(), 200);
    }

    #[test]
    fn test_concurrent_upserts() {
        let (collections, _) = TestCollections::recording();
        let config = StressConfig {
            operations: 50,
            threads: 4,
        };

        let result = stress_concurrent_upserts(&collections.feedback, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(collections.store.row_count(Feedback::TABLE), 8);
    }
}
