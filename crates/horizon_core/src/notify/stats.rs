//! Notifier counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Notification counters.
///
/// All counters are atomic and can be read while workers are running.
#[derive(Debug, Default)]
pub struct NotifierStats {
    /// Jobs accepted into the queue.
    enqueued: AtomicU64,
    /// Jobs whose dispatch succeeded.
    dispatched: AtomicU64,
    /// Jobs that failed to encode or dispatch, or panicked.
    failed: AtomicU64,
    /// Jobs rejected because the queue was full or closed.
    dropped: AtomicU64,
}

impl NotifierStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of jobs accepted into the queue.
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Returns the number of successful dispatches.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Returns the number of failed jobs.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Returns the number of dropped jobs.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Returns the number of accepted jobs not yet finished.
    pub fn pending(&self) -> u64 {
        self.enqueued()
            .saturating_sub(self.dispatched() + self.failed())
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> NotifierSnapshot {
        NotifierSnapshot {
            enqueued: self.enqueued(),
            dispatched: self.dispatched(),
            failed: self.failed(),
            dropped: self.dropped(),
        }
    }
}

/// A point-in-time copy of [`NotifierStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotifierSnapshot {
    /// Jobs accepted into the queue.
    pub enqueued: u64,
    /// Jobs whose dispatch succeeded.
    pub dispatched: u64,
    /// Jobs that failed.
    pub failed: u64,
    /// Jobs rejected.
    pub dropped: u64,
}
