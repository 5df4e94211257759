//! Change notifications.
//!
//! After a successful write the collection hands a [`Notifier`] a job that
//! builds the topic set and payload. Jobs run on a fixed pool of worker
//! threads fed by a bounded queue, so the writer never waits on the
//! messaging collaborator:
//!
//! - a full queue drops the job (logged and counted, never an error)
//! - dispatch failures and panicking jobs are logged and counted
//! - [`Notifier::shutdown`] drains queued jobs before joining the workers
//!
//! There is no ordering guarantee between notifications.

mod stats;

pub use stats::{NotifierSnapshot, NotifierStats};

use crate::config::NotifierConfig;
use crate::error::CoreResult;
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Kind of write that produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A record was inserted.
    Created,
    /// A record was saved or patched.
    Updated,
    /// A record was deleted.
    Deleted,
}

impl ChangeKind {
    /// Returns the action segment used in default topic names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "create",
            Self::Updated => "update",
            Self::Deleted => "delete",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by a [`Dispatcher`] or while building a notification.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The payload could not be serialized.
    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// Publishing to a topic failed.
    #[error("publish to {topic} failed: {message}")]
    Publish {
        /// Topic that failed.
        topic: String,
        /// Broker-specific description.
        message: String,
    },

    /// The broker is not reachable.
    #[error("dispatcher unavailable: {0}")]
    Unavailable(String),
}

impl DispatchError {
    /// Creates a publish error.
    pub fn publish(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            topic: topic.into(),
            message: message.into(),
        }
    }
}

/// Publishes a payload to a set of topics.
pub trait Dispatcher: Send + Sync {
    /// Publishes `payload` to every topic in `topics`.
    fn dispatch(&self, topics: &[String], payload: &Value) -> Result<(), DispatchError>;
}

/// A built notification, ready to dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Topics to publish to.
    pub topics: Vec<String>,
    /// JSON payload.
    pub payload: Value,
}

type Job = Box<dyn FnOnce() -> Result<Notification, DispatchError> + Send>;

/// Bounded worker pool delivering notifications to a [`Dispatcher`].
pub struct Notifier {
    sender: Mutex<Option<SyncSender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stats: Arc<NotifierStats>,
    config: NotifierConfig,
}

impl Notifier {
    /// Starts the worker pool.
    pub fn new(dispatcher: Arc<dyn Dispatcher>, config: NotifierConfig) -> CoreResult<Self> {
        // A zero bound would make the channel a rendezvous point.
        let capacity = config.queue_capacity.max(1);
        let (sender, receiver) = mpsc::sync_channel::<Job>(capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let stats = Arc::new(NotifierStats::new());

        let count = config.workers.max(1);
        let mut workers = Vec::with_capacity(count);
        for index in 0..count {
            let receiver = Arc::clone(&receiver);
            let dispatcher = Arc::clone(&dispatcher);
            let stats = Arc::clone(&stats);
            let handle = thread::Builder::new()
                .name(format!("{}-{index}", config.thread_name))
                .spawn(move || worker_loop(&receiver, dispatcher.as_ref(), &stats))?;
            workers.push(handle);
        }

        info!(
            workers = count,
            queue_capacity = capacity,
            "notifier started"
        );
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            stats,
            config,
        })
    }

    /// Queues a job without blocking.
    ///
    /// Returns false if the job was dropped because the queue is full or
    /// the notifier has shut down.
    pub fn submit<F>(&self, job: F) -> bool
    where
        F: FnOnce() -> Result<Notification, DispatchError> + Send + 'static,
    {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            self.stats.record_dropped();
            warn!("notification dropped: notifier shut down");
            return false;
        };

        match sender.try_send(Box::new(job)) {
            Ok(()) => {
                self.stats.record_enqueued();
                true
            }
            Err(TrySendError::Full(_)) => {
                self.stats.record_dropped();
                warn!(
                    queue_capacity = self.config.queue_capacity,
                    "notification dropped: queue full"
                );
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                self.stats.record_dropped();
                warn!("notification dropped: workers gone");
                false
            }
        }
    }

    /// Returns the notification counters.
    pub fn stats(&self) -> &NotifierStats {
        &self.stats
    }

    /// Returns the configuration the pool was started with.
    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    /// Waits until every accepted job has finished, up to `timeout`.
    ///
    /// Returns true if the queue drained in time.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.stats.pending() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Closes the queue, runs every job still queued and joins the workers.
    ///
    /// Calling this more than once is a no-op.
    pub fn shutdown(&self) {
        let Some(sender) = self.sender.lock().take() else {
            return;
        };
        drop(sender);

        let current = thread::current().id();
        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!("notifier worker exited abnormally");
            }
        }

        let snap = self.stats.snapshot();
        info!(
            dispatched = snap.dispatched,
            failed = snap.failed,
            dropped = snap.dropped,
            "notifier stopped"
        );
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("config", &self.config)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

fn worker_loop(receiver: &Mutex<Receiver<Job>>, dispatcher: &dyn Dispatcher, stats: &NotifierStats) {
    loop {
        let job = receiver.lock().recv();
        let Ok(job) = job else {
            break;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let notification = job()?;
            dispatcher.dispatch(&notification.topics, &notification.payload)?;
            Ok::<_, DispatchError>(notification.topics)
        }));

        match outcome {
            Ok(Ok(topics)) => {
                stats.record_dispatched();
                debug!(?topics, "notification dispatched");
            }
            Ok(Err(e)) => {
                stats.record_failed();
                warn!(error = %e, "notification failed");
            }
            Err(_) => {
                stats.record_failed();
                warn!("notification job panicked");
            }
        }
    }
}
