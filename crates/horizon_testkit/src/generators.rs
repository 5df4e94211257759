//! Property-based test generators using proptest.
//!
//! Generated records are always valid for their request constraints and
//! never carry an identity, so they can be passed straight to `create`.

use crate::fixtures::{Feedback, FEEDBACK_TYPES};
use horizon_core::EntityId;
use proptest::prelude::*;

/// Strategy for generating non-nil entity IDs.
pub fn entity_id_strategy() -> impl Strategy<Value = EntityId> {
    prop::array::uniform16(any::<u8>())
        .prop_map(EntityId::from_bytes)
        .prop_filter("identity must not be nil", |id| !id.is_nil())
}

/// Strategy for generating feedback kinds.
pub fn feedback_type_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(FEEDBACK_TYPES.to_vec()).prop_map(str::to_string)
}

/// Strategy for generating valid email addresses.
pub fn email_strategy() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9]{0,11}", "[a-z]{2,10}", prop::sample::select(vec!["com", "org", "io"]))
        .prop_map(|(user, domain, tld)| format!("{user}@{domain}.{tld}"))
}

/// Strategy for generating descriptions within the allowed length.
pub fn description_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{5,80}".prop_filter("description must not be blank", |s| !s.trim().is_empty())
}

/// Strategy for generating unsaved feedback records.
pub fn feedback_strategy() -> impl Strategy<Value = Feedback> {
    (email_strategy(), description_strategy(), feedback_type_strategy()).prop_map(
        |(email, description, feedback_type)| Feedback {
            email,
            description,
            feedback_type,
            ..Feedback::default()
        },
    )
}

/// Strategy for generating batches of unsaved feedback records.
pub fn feedback_batch_strategy(max: usize) -> impl Strategy<Value = Vec<Feedback>> {
    prop::collection::vec(feedback_strategy(), 1..=max.max(1))
}

/// Strategy for generating preload name lists, including case variants,
/// duplicates and empty names.
pub fn preload_names_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop::sample::select(vec!["media", "Media", "owner", "Owner", "tags", ""]),
        0..6,
    )
    .prop_map(|names| names.into_iter().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_core::Validate;

    use crate::fixtures::FeedbackRequest;

    proptest! {
        #[test]
        fn generated_feedback_is_valid(feedback in feedback_strategy()) {
            let request = FeedbackRequest {
                email: feedback.email.clone(),
                description: feedback.description.clone(),
                feedback_type: feedback.feedback_type.clone(),
                ..FeedbackRequest::default()
            };
            prop_assert!(request.validate().is_ok());
            prop_assert!(feedback.id.is_nil());
        }

        #[test]
        fn generated_ids_are_not_nil(id in entity_id_strategy()) {
            prop_assert!(!id.is_nil());
        }
    }
}
