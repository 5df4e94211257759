//! Notifier configuration.

/// Configuration for a [`Notifier`](crate::Notifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierConfig {
    /// Number of worker threads draining the queue.
    pub workers: usize,

    /// Maximum number of queued notifications. Further notifications are
    /// dropped until workers catch up.
    pub queue_capacity: usize,

    /// Name prefix for worker threads; each gets `-{index}` appended.
    pub thread_name: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1024,
            thread_name: "horizon-notify".to_string(),
        }
    }
}

impl NotifierConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of worker threads (at least one).
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Sets the queue capacity (at least one).
    #[must_use]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Sets the worker thread name prefix.
    #[must_use]
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = NotifierConfig::default();
        assert_eq!(config.workers, 4);
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.thread_name, "horizon-notify");
    }

    #[test]
    fn builder_pattern() {
        let config = NotifierConfig::new()
            .workers(0)
            .queue_capacity(8)
            .thread_name("feedback-notify");

        assert_eq!(config.workers, 1);
        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.thread_name, "feedback-notify");
    }

    #[test]
    fn queue_capacity_is_at_least_one() {
        assert_eq!(NotifierConfig::new().queue_capacity(0).queue_capacity, 1);
    }
}
