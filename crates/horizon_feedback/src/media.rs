//! Uploaded media records.

use crate::timestamp;
use chrono::{DateTime, Utc};
use horizon_core::{EntityId, Identified, Record, Validate, ValidationErrors, Validator};
use serde::{Deserialize, Serialize};

/// An uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Media {
    /// Identity.
    pub id: EntityId,
    /// Creation time, set by the store.
    pub created_at: Option<DateTime<Utc>>,
    /// Modification time, set by the store.
    pub updated_at: Option<DateTime<Utc>>,
    /// Original file name.
    pub file_name: String,
    /// Size in bytes.
    pub file_size: i64,
    /// MIME type.
    pub file_type: String,
    /// Key in the object store.
    pub storage_key: String,
    /// Public URL.
    pub url: String,
    /// Object key.
    pub key: String,
    /// Bucket holding the object.
    pub bucket_name: String,
    /// Upload status.
    pub status: String,
    /// Upload progress in percent.
    pub progress: i64,
}

impl Identified for Media {
    fn identity(&self) -> EntityId {
        self.id
    }

    fn set_identity(&mut self, id: EntityId) {
        self.id = id;
    }
}

impl Record for Media {
    const TABLE: &'static str = "media";
}

/// Outward-facing media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaResponse {
    /// Identity.
    pub id: EntityId,
    /// Creation time, RFC 3339.
    pub created_at: String,
    /// Modification time, RFC 3339.
    pub updated_at: String,
    /// Original file name.
    pub file_name: String,
    /// Size in bytes.
    pub file_size: i64,
    /// MIME type.
    pub file_type: String,
    /// Key in the object store.
    pub storage_key: String,
    /// Public URL.
    pub url: String,
    /// Object key.
    pub key: String,
    /// Link the client downloads from.
    pub download_url: String,
    /// Bucket holding the object.
    pub bucket_name: String,
    /// Upload status.
    pub status: String,
    /// Upload progress in percent.
    pub progress: i64,
}

impl From<&Media> for MediaResponse {
    fn from(media: &Media) -> Self {
        Self {
            id: media.id,
            created_at: timestamp(media.created_at),
            updated_at: timestamp(media.updated_at),
            file_name: media.file_name.clone(),
            file_size: media.file_size,
            file_type: media.file_type.clone(),
            storage_key: media.storage_key.clone(),
            url: media.url.clone(),
            key: media.key.clone(),
            download_url: format!("{}/{}", media.url.trim_end_matches('/'), media.storage_key),
            bucket_name: media.bucket_name.clone(),
            status: media.status.clone(),
            progress: media.progress,
        }
    }
}

/// Inbound media payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaRequest {
    /// Identity, when updating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    /// Original file name.
    #[serde(default)]
    pub file_name: String,
    /// Size in bytes.
    #[serde(default)]
    pub file_size: i64,
    /// MIME type.
    #[serde(default)]
    pub file_type: String,
    /// Key in the object store.
    #[serde(default)]
    pub storage_key: String,
    /// Public URL.
    #[serde(default)]
    pub url: String,
    /// Object key.
    #[serde(default)]
    pub key: String,
    /// Bucket holding the object.
    #[serde(default)]
    pub bucket_name: String,
}

impl Validate for MediaRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.required("file_name", &self.file_name)
            .length("file_name", &self.file_name, 1, 255);
        v.min("file_size", self.file_size, 1);
        v.required("file_type", &self.file_type)
            .length("file_type", &self.file_type, 1, 50);
        v.required("storage_key", &self.storage_key)
            .length("storage_key", &self.storage_key, 1, 255);
        v.required("url", &self.url)
            .url("url", &self.url)
            .length("url", &self.url, 1, 255);
        v.length("key", &self.key, 0, 255);
        v.length("bucket_name", &self.bucket_name, 0, 255);
        v.finish()
    }
}
