//! Demo command implementations.

use horizon_core::{CoreError, DispatchError, Dispatcher, Notifier, NotifierConfig, Store};
use horizon_feedback::{
    feedback_collection, feedback_store, media_collection, Feedback, FeedbackCollection, Media,
    MediaCollection, FEEDBACK_TYPES,
};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors reported by demo commands.
#[derive(Debug, Error)]
pub enum DemoError {
    /// A collection operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Output could not be rendered.
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Result type for demo commands.
pub type DemoResult<T> = Result<T, DemoError>;

/// Logs every notification instead of publishing it.
struct LogDispatcher;

impl Dispatcher for LogDispatcher {
    fn dispatch(&self, topics: &[String], payload: &Value) -> Result<(), DispatchError> {
        info!(?topics, %payload, "published");
        Ok(())
    }
}

/// Describes an uploaded attachment named `file_name`.
fn attachment(file_name: &str) -> Media {
    Media {
        file_name: file_name.to_string(),
        file_size: 1024,
        file_type: "application/octet-stream".into(),
        storage_key: format!("uploads/{file_name}"),
        url: "https://cdn.example.com".into(),
        key: file_name.to_string(),
        status: "completed".into(),
        progress: 100,
        ..Media::default()
    }
}

/// The `n`th scripted feedback entry.
fn scripted(n: usize) -> Feedback {
    Feedback {
        email: format!("visitor{n}@example.com"),
        description: format!("scripted feedback #{n}"),
        feedback_type: FEEDBACK_TYPES[n % FEEDBACK_TYPES.len()].to_string(),
        ..Feedback::default()
    }
}

/// Wired-up collections.
pub struct App {
    notifier: Arc<Notifier>,
    media: MediaCollection,
    feedback: FeedbackCollection,
}

impl App {
    /// Builds the store, notifier and collections.
    pub fn new(config: NotifierConfig) -> DemoResult<Self> {
        let store: Arc<dyn Store> = Arc::new(feedback_store());
        let notifier = Arc::new(Notifier::new(Arc::new(LogDispatcher), config)?);
        let media = media_collection(Arc::clone(&store), Some(Arc::clone(&notifier)));
        let feedback = feedback_collection(store, &media, Some(Arc::clone(&notifier)));
        Ok(Self {
            notifier,
            media,
            feedback,
        })
    }

    /// Drains pending notifications and stops the workers.
    pub fn shutdown(&self) {
        self.notifier.shutdown();
        let stats = self.notifier.stats().snapshot();
        info!(
            enqueued = stats.enqueued,
            dispatched = stats.dispatched,
            failed = stats.failed,
            dropped = stats.dropped,
            "notifications"
        );
    }
}

/// Validates `body`, stores it and prints the response.
pub fn submit(app: &App, body: &[u8], attachment: Option<&str>) -> DemoResult<()> {
    let request = app.feedback.validate(body)?;
    let mut record = Feedback::from(request);

    if let Some(name) = attachment {
        let mut media = self::attachment(name);
        app.media.create(&mut media, &[])?;
        record.media_id = Some(media.id);
    }

    app.feedback.create(&mut record, &["Media"])?;
    println!(
        "{}",
        serde_json::to_string_pretty(&app.feedback.to_model(Some(&record)))?
    );
    Ok(())
}

/// Walks through every collection operation on `count` records.
pub fn scenario(app: &App, count: usize) -> DemoResult<()> {
    let mut batch: Vec<_> = (0..count).map(scripted).collect();
    app.feedback.create_many(&mut batch, &[])?;
    info!(created = batch.len(), "created feedback");

    for response in app.feedback.list_raw(&[])? {
        println!("{}", serde_json::to_string(&response)?);
    }

    let Some(first) = batch.first() else {
        return Ok(());
    };

    let mut patch = Feedback {
        description: "updated from the demo".into(),
        ..Feedback::default()
    };
    app.feedback.update_fields(first.id, &mut patch, &[])?;
    println!(
        "{}",
        serde_json::to_string_pretty(&app.feedback.get_by_id_raw(first.id, &[])?)?
    );

    let mut replayed = patch.clone();
    replayed.feedback_type = "feature".into();
    app.feedback.upsert(&mut replayed, &[])?;

    app.feedback.delete_by_id(first.id)?;
    match app.feedback.get_by_id(first.id, &[]) {
        Err(e) if e.is_not_found() => info!(id = %first.id, "deleted feedback is gone"),
        Err(e) => return Err(e.into()),
        Ok(_) => info!(id = %first.id, "deleted feedback still present"),
    }

    let remaining = app.feedback.count(&Feedback::default())?;
    info!(remaining, "scenario finished");
    Ok(())
}
