//! # Horizon Feedback
//!
//! The feedback/media domain served over Horizon collections.
//!
//! Feedback belongs to an optional media row, and the feedback response
//! embeds the media response. Both collections publish to
//! `{table}.{action}` and `{table}.{action}.{id}`.
//!
//! ```rust
//! use horizon_feedback::{feedback_collection, feedback_store, media_collection, Feedback};
//! use horizon_core::Store;
//! use std::sync::Arc;
//!
//! let store: Arc<dyn Store> = Arc::new(feedback_store());
//! let media = media_collection(Arc::clone(&store), None);
//! let feedback = feedback_collection(store, &media, None);
//!
//! let mut record = Feedback {
//!     email: "ada@example.com".into(),
//!     description: "dark mode please".into(),
//!     feedback_type: "feature".into(),
//!     ..Feedback::default()
//! };
//! feedback.create(&mut record, &["Media"])?;
//! assert!(record.media.is_none());
//! # Ok::<(), horizon_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod feedback;
mod media;

pub use feedback::{Feedback, FeedbackRequest, FeedbackResponse};
pub use media::{Media, MediaRequest, MediaResponse};

use chrono::{DateTime, SecondsFormat, Utc};
use horizon_core::{MemoryStore, Notifier, Record, Relation, Repository, Store};
use std::sync::Arc;

/// Allowed feedback kinds.
pub const FEEDBACK_TYPES: [&str; 3] = ["general", "bug", "feature"];

fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// Media collection type.
pub type MediaCollection = Repository<Media, MediaResponse, MediaRequest>;

/// Feedback collection type.
pub type FeedbackCollection = Repository<Feedback, FeedbackResponse, FeedbackRequest>;

/// Creates a store with the feedback → media relation declared.
pub fn feedback_store() -> MemoryStore {
    MemoryStore::new().with_relation(
        Feedback::TABLE,
        Relation::belongs_to("Media", "media_id", Media::TABLE, "media"),
    )
}

/// Builds the media collection.
pub fn media_collection(store: Arc<dyn Store>, notifier: Option<Arc<Notifier>>) -> MediaCollection {
    let builder = Repository::builder(store, |m: &Media| MediaResponse::from(m))
        .created(|m: &Media| vec!["media.create".into(), format!("media.create.{}", m.id)])
        .updated(|m: &Media| vec!["media.update".into(), format!("media.update.{}", m.id)])
        .deleted(|m: &Media| vec!["media.delete".into(), format!("media.delete.{}", m.id)]);
    match notifier {
        Some(notifier) => builder.notifier(notifier).build(),
        None => builder.build(),
    }
}

/// Builds the feedback collection. Responses embed the media response
/// produced by `media`.
pub fn feedback_collection(
    store: Arc<dyn Store>,
    media: &MediaCollection,
    notifier: Option<Arc<Notifier>>,
) -> FeedbackCollection {
    let media = media.clone();
    let builder = Repository::builder(store, move |f: &Feedback| {
        FeedbackResponse::new(f, media.to_model(f.media.as_ref()))
    })
    .created(|f: &Feedback| vec!["feedback.create".into(), format!("feedback.create.{}", f.id)])
    .updated(|f: &Feedback| vec!["feedback.update".into(), format!("feedback.update.{}", f.id)])
    .deleted(|f: &Feedback| vec!["feedback.delete".into(), format!("feedback.delete.{}", f.id)]);
    match notifier {
        Some(notifier) => builder.notifier(notifier).build(),
        None => builder.build(),
    }
}
