//! Collection fixtures.
//!
//! Wires the feedback/media domain to an in-memory store and a notifier,
//! and builds sample records.

use crate::dispatchers::RecordingDispatcher;
use horizon_core::{Dispatcher, MemoryStore, Notifier, NotifierConfig, Store};
use std::sync::Arc;
use std::time::Duration;

pub use horizon_feedback::{
    feedback_collection, feedback_store, media_collection, Feedback, FeedbackCollection,
    FeedbackRequest, FeedbackResponse, Media, MediaCollection, MediaRequest, MediaResponse,
    FEEDBACK_TYPES,
};

/// A store, a notifier and both collections, ready for a test.
pub struct TestCollections {
    /// The backing store.
    pub store: MemoryStore,
    /// Shared notifier.
    pub notifier: Arc<Notifier>,
    /// Media collection.
    pub media: MediaCollection,
    /// Feedback collection.
    pub feedback: FeedbackCollection,
}

impl TestCollections {
    /// Creates collections notifying a fresh [`RecordingDispatcher`], which
    /// is returned alongside.
    pub fn recording() -> (Self, Arc<RecordingDispatcher>) {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        (Self::new(dispatcher.clone()), dispatcher)
    }

    /// Creates collections notifying `dispatcher` with two workers.
    pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self::with_config(dispatcher, NotifierConfig::new().workers(2))
    }

    /// Creates collections with a custom notifier configuration.
    pub fn with_config(dispatcher: Arc<dyn Dispatcher>, config: NotifierConfig) -> Self {
        let store = feedback_store();
        let notifier = Arc::new(Notifier::new(dispatcher, config).expect("Failed to start notifier"));
        let handle: Arc<dyn Store> = Arc::new(store.clone());
        let media = media_collection(Arc::clone(&handle), Some(Arc::clone(&notifier)));
        let feedback = feedback_collection(handle, &media, Some(Arc::clone(&notifier)));
        Self {
            store,
            notifier,
            media,
            feedback,
        }
    }

    /// Waits for every queued notification to be delivered.
    pub fn settle(&self) {
        assert!(
            self.notifier.wait_idle(Duration::from_secs(10)),
            "notifications did not drain"
        );
    }
}

/// Creates an unsaved feedback record.
pub fn new_feedback(email: &str, description: &str, feedback_type: &str) -> Feedback {
    Feedback {
        email: email.to_string(),
        description: description.to_string(),
        feedback_type: feedback_type.to_string(),
        ..Feedback::default()
    }
}

/// Creates the `n`th of a family of distinct, valid feedback records.
pub fn sample_feedback(n: usize) -> Feedback {
    new_feedback(
        &format!("user{n}@example.com"),
        &format!("feedback number {n}"),
        FEEDBACK_TYPES[n % FEEDBACK_TYPES.len()],
    )
}

/// Creates an unsaved media record.
pub fn sample_media(file_name: &str) -> Media {
    Media {
        file_name: file_name.to_string(),
        file_size: 1024,
        file_type: "image/png".into(),
        storage_key: format!("uploads/{file_name}"),
        url: "https://cdn.example.com".into(),
        key: file_name.to_string(),
        bucket_name: "horizon".into(),
        status: "completed".into(),
        progress: 100,
        ..Media::default()
    }
}
