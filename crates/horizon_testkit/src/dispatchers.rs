//! Fake messaging collaborators.

use horizon_core::{DispatchError, Dispatcher};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

/// One recorded dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    /// Topics the payload was published to.
    pub topics: Vec<String>,
    /// The payload.
    pub payload: Value,
}

/// Records every dispatch in memory.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<Dispatched>>,
}

impl RecordingDispatcher {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded dispatch.
    pub fn events(&self) -> Vec<Dispatched> {
        self.events.lock().clone()
    }

    /// Returns the number of recorded dispatches.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing was dispatched.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Returns the dispatches that included `topic`.
    pub fn published_to(&self, topic: &str) -> Vec<Dispatched> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.topics.iter().any(|t| t == topic))
            .cloned()
            .collect()
    }

    /// Forgets every recorded dispatch.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch(&self, topics: &[String], payload: &Value) -> Result<(), DispatchError> {
        self.events.lock().push(Dispatched {
            topics: topics.to_vec(),
            payload: payload.clone(),
        });
        Ok(())
    }
}

/// Sleeps before recording each dispatch.
#[derive(Debug)]
pub struct SlowDispatcher {
    delay: Duration,
    inner: RecordingDispatcher,
}

impl SlowDispatcher {
    /// Creates a dispatcher taking `delay` per dispatch.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: RecordingDispatcher::new(),
        }
    }

    /// Returns the dispatches completed so far.
    pub fn recorded(&self) -> &RecordingDispatcher {
        &self.inner
    }
}

impl Dispatcher for SlowDispatcher {
    fn dispatch(&self, topics: &[String], payload: &Value) -> Result<(), DispatchError> {
        thread::sleep(self.delay);
        self.inner.dispatch(topics, payload)
    }
}

/// Fails every dispatch, counting attempts.
#[derive(Debug, Default)]
pub struct FailingDispatcher {
    attempts: AtomicU64,
}

impl FailingDispatcher {
    /// Creates a failing dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many dispatches were attempted.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }
}

impl Dispatcher for FailingDispatcher {
    fn dispatch(&self, topics: &[String], _: &Value) -> Result<(), DispatchError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        let topic = topics.first().cloned().unwrap_or_default();
        Err(DispatchError::publish(topic, "broker rejected message"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recording_filters_by_topic() {
        let recorder = RecordingDispatcher::new();
        recorder
            .dispatch(&["a".into(), "a.1".into()], &json!(1))
            .unwrap();
        recorder.dispatch(&["b".into()], &json!(2)).unwrap();

        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.published_to("a.1")[0].payload, json!(1));
        recorder.clear();
        assert!(recorder.is_empty());
    }

    #[test]
    fn failing_counts_attempts() {
        let failing = FailingDispatcher::new();
        assert!(failing.dispatch(&["t".into()], &Value::Null).is_err());
        assert_eq!(failing.attempts(), 1);
    }
}
