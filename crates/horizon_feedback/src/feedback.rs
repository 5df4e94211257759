//! User feedback records.

use crate::media::{Media, MediaResponse};
use crate::{timestamp, FEEDBACK_TYPES};
use chrono::{DateTime, Utc};
use horizon_core::{EntityId, Identified, Record, Validate, ValidationErrors, Validator};
use serde::{Deserialize, Serialize};

/// A piece of user feedback, optionally with an attachment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// Identity.
    pub id: EntityId,
    /// Creation time, set by the store.
    pub created_at: Option<DateTime<Utc>>,
    /// Modification time, set by the store.
    pub updated_at: Option<DateTime<Utc>>,
    /// Sender address.
    pub email: String,
    /// Free text.
    pub description: String,
    /// One of [`FEEDBACK_TYPES`](crate::FEEDBACK_TYPES).
    pub feedback_type: String,
    /// Attached media, if any.
    pub media_id: Option<EntityId>,
    /// Attached media row, when preloaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
}

impl Identified for Feedback {
    fn identity(&self) -> EntityId {
        self.id
    }

    fn set_identity(&mut self, id: EntityId) {
        self.id = id;
    }
}

impl Record for Feedback {
    const TABLE: &'static str = "feedback";
}

/// Outward-facing feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackResponse {
    /// Identity.
    pub id: EntityId,
    /// Sender address.
    pub email: String,
    /// Free text.
    pub description: String,
    /// Feedback kind.
    pub feedback_type: String,
    /// Attached media identity.
    pub media_id: Option<EntityId>,
    /// Attached media, when preloaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaResponse>,
    /// Creation time, RFC 3339.
    #[serde(rename = "createdAt")]
    pub created_at: String,
    /// Modification time, RFC 3339.
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

/// Inbound feedback payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackRequest {
    /// Identity, when updating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    /// Sender address.
    #[serde(default)]
    pub email: String,
    /// Free text.
    #[serde(default)]
    pub description: String,
    /// Feedback kind.
    #[serde(default)]
    pub feedback_type: String,
    /// Attached media identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<EntityId>,
}

impl Validate for FeedbackRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required("email", &self.email).email("email", &self.email);
        v.required("description", &self.description)
            .length("description", &self.description, 5, 2000);
        v.required("feedback_type", &self.feedback_type)
            .one_of("feedback_type", &self.feedback_type, &FEEDBACK_TYPES);
        v.finish()
    }
}

impl From<FeedbackRequest> for Feedback {
    fn from(request: FeedbackRequest) -> Self {
        Self {
            id: request.id.unwrap_or_default(),
            email: request.email,
            description: request.description,
            feedback_type: request.feedback_type,
            media_id: request.media_id,
            ..Self::default()
        }
    }
}

impl FeedbackResponse {
    /// Maps a record, embedding an already mapped media response.
    pub fn new(feedback: &Feedback, media: Option<MediaResponse>) -> Self {
        Self {
            id: feedback.id,
            email: feedback.email.clone(),
            description: feedback.description.clone(),
            feedback_type: feedback.feedback_type.clone(),
            media_id: feedback.media_id,
            media,
            created_at: timestamp(feedback.created_at),
            updated_at: timestamp(feedback.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_validation() {
        let ok = FeedbackRequest {
            email: "a@example.com".into(),
            description: "works well".into(),
            feedback_type: "bug".into(),
            ..FeedbackRequest::default()
        };
        assert!(ok.validate().is_ok());

        let bad = FeedbackRequest {
            email: "nope".into(),
            description: "hm".into(),
            feedback_type: "rant".into(),
            ..FeedbackRequest::default()
        };
        let err = bad.validate().unwrap_err();
        assert!(err.has("email", "email"));
        assert!(err.has("description", "length"));
        assert!(err.has("feedback_type", "one_of"));
    }

    #[test]
    fn request_converts_to_record() {
        let feedback = Feedback::from(FeedbackRequest {
            email: "a@example.com".into(),
            ..FeedbackRequest::default()
        });
        assert!(feedback.id.is_nil());
        assert_eq!(feedback.email, "a@example.com");
    }

    #[test]
    fn response_renames_timestamps() {
        let response = FeedbackResponse::new(&Feedback::default(), None);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("media").is_none());
    }
}
