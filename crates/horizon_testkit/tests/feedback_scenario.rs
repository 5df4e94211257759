//! End-to-end tests for the feedback and media collections.

use horizon_core::{CoreError, EntityId, Record};
use horizon_testkit::prelude::*;
use serde_json::json;

#[test]
fn create_fetch_delete_feedback() {
    let (collections, recorder) = TestCollections::recording();
    let feedback = &collections.feedback;

    let request = feedback
        .validate(
            br#"{"email":"a@b.io","description":"great app","feedback_type":"general"}"#,
        )
        .unwrap();
    let mut record = Feedback::from(request);
    feedback.create(&mut record, &[]).unwrap();
    assert!(!record.id.is_nil());

    let response = feedback.get_by_id_raw(record.id, &[]).unwrap();
    assert_eq!(response.email, "a@b.io");
    assert_eq!(response.description, "great app");
    assert_eq!(response.feedback_type, "general");
    assert!(!response.created_at.is_empty());

    feedback.delete_by_id(record.id).unwrap();
    let err = feedback.get_by_id(record.id, &[]).unwrap_err();
    assert!(matches!(err, CoreError::NotFound { table: "feedback", .. }));

    collections.settle();
    let created = recorder.published_to(&format!("feedback.create.{}", record.id));
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].topics[0], "feedback.create");
    assert_eq!(created[0].payload["email"], json!("a@b.io"));
    assert_eq!(recorder.published_to("feedback.delete").len(), 1);
    assert!(recorder.published_to("feedback.update").is_empty());
}

#[test]
fn invalid_request_is_rejected() {
    let (collections, _) = TestCollections::recording();
    let err = collections
        .feedback
        .validate(br#"{"email":"not-an-email","description":"hey","feedback_type":"rant"}"#)
        .unwrap_err();

    let errors = match err {
        CoreError::Validation(errors) => errors,
        other => panic!("expected validation error, got {other:?}"),
    };
    assert!(errors.has("email", "email"));
    assert!(errors.has("description", "length"));
    assert!(errors.has("feedback_type", "one_of"));
}

#[test]
fn malformed_request_is_rejected() {
    let (collections, _) = TestCollections::recording();
    let err = collections.feedback.validate(b"{\"email\":").unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[test]
fn feedback_preloads_media() {
    let (collections, _) = TestCollections::recording();
    let mut media = sample_media("screenshot.png");
    collections.media.create(&mut media, &[]).unwrap();

    let mut record = sample_feedback(1);
    record.media_id = Some(media.id);
    collections.feedback.create(&mut record, &["media"]).unwrap();
    assert_eq!(record.media.as_ref().map(|m| m.id), Some(media.id));

    let response = collections
        .feedback
        .get_by_id_raw(record.id, &["Media"])
        .unwrap();
    let attached = response.media.expect("media should be preloaded");
    assert_eq!(attached.file_name, "screenshot.png");
    assert_eq!(
        attached.download_url,
        "https://cdn.example.com/uploads/screenshot.png"
    );

    let plain = collections.feedback.get_by_id_raw(record.id, &[]).unwrap();
    assert!(plain.media.is_none());
    assert_eq!(plain.media_id, Some(media.id));
}

#[test]
fn dangling_media_preloads_as_none() {
    let (collections, _) = TestCollections::recording();
    let mut record = sample_feedback(1);
    record.media_id = Some(EntityId::new());
    collections.feedback.create(&mut record, &["Media"]).unwrap();
    assert!(record.media.is_none());
}

#[test]
fn update_through_controller_flow() {
    let (collections, recorder) = TestCollections::recording();
    let feedback = &collections.feedback;
    let mut record = sample_feedback(1);
    feedback.create(&mut record, &[]).unwrap();

    let request = feedback
        .validate(br#"{"email":"new@b.io","description":"changed my mind","feedback_type":"bug"}"#)
        .unwrap();
    let mut stored = feedback.get_by_id(record.id, &[]).unwrap();
    stored.email = request.email;
    stored.description = request.description;
    stored.feedback_type = request.feedback_type;
    feedback.update(&mut stored, &[]).unwrap();

    let response = feedback.to_model(Some(&stored)).unwrap();
    assert_eq!(response.feedback_type, "bug");
    assert_eq!(feedback.count(&Feedback::default()).unwrap(), 1);

    collections.settle();
    let updates = recorder.published_to(&format!("feedback.update.{}", record.id));
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].payload["feedback_type"], json!("bug"));
}

#[test]
fn list_raw_maps_every_row() {
    let (collections, _) = TestCollections::recording();
    let mut batch: Vec<_> = (0..5).map(sample_feedback).collect();
    collections.feedback.create_many(&mut batch, &[]).unwrap();

    let responses = collections.feedback.list_raw(&[]).unwrap();
    assert_eq!(responses.len(), 5);
    assert_eq!(collections.store.row_count(Feedback::TABLE), 5);

    // Newest first.
    assert_eq!(responses[0].email, "user4@example.com");
    assert_eq!(responses[4].email, "user0@example.com");
}

#[test]
fn media_topics_are_separate() {
    let (collections, recorder) = TestCollections::recording();
    let mut media = sample_media("a.png");
    collections.media.create(&mut media, &[]).unwrap();
    collections.media.delete(&media).unwrap();

    collections.settle();
    assert_eq!(recorder.published_to("media.create").len(), 1);
    assert_eq!(recorder.published_to("media.delete").len(), 1);
    assert!(recorder.published_to("feedback.create").is_empty());
}
