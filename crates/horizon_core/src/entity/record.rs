//! Record capability traits and identity access.

use crate::entity::EntityId;
use crate::error::{CoreError, CoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Read/write access to a record's identity.
///
/// Every record type exposes exactly one identity. A nil identity means the
/// record has not been persisted yet.
pub trait Identified {
    /// Returns the record's identity.
    fn identity(&self) -> EntityId;

    /// Replaces the record's identity.
    fn set_identity(&mut self, id: EntityId);
}

/// A type that can be managed by a [`Repository`](crate::Repository).
///
/// Records are stored as JSON documents through serde, so field names in
/// the serialized form are the column names the store filters and orders on.
///
/// # Example
///
/// ```rust
/// use horizon_core::{EntityId, Identified, Record};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct Tag {
///     id: EntityId,
///     label: String,
/// }
///
/// impl Identified for Tag {
///     fn identity(&self) -> EntityId {
///         self.id
///     }
///
///     fn set_identity(&mut self, id: EntityId) {
///         self.id = id;
///     }
/// }
///
/// impl Record for Tag {
///     const TABLE: &'static str = "tags";
/// }
/// ```
pub trait Record: Identified + Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table (collection) name in the store.
    const TABLE: &'static str;

    /// Column holding the identity.
    const ID_COLUMN: &'static str = "id";

    /// Column holding the creation timestamp.
    const CREATED_AT: &'static str = "created_at";

    /// Column holding the last-modified timestamp.
    const UPDATED_AT: &'static str = "updated_at";
}

/// Returns the identity of a record that must already be persisted.
///
/// Fails with [`CoreError::Identity`] when the identity is nil.
pub fn identity_of<T: Record>(record: &T) -> CoreResult<EntityId> {
    let id = record.identity();
    if id.is_nil() {
        return Err(CoreError::identity(T::TABLE, "record has no identity"));
    }
    Ok(id)
}

/// Assigns a persisted identity to a record.
///
/// Fails with [`CoreError::Identity`] when asked to assign the nil identity.
pub fn assign_identity<T: Record>(record: &mut T, id: EntityId) -> CoreResult<()> {
    if id.is_nil() {
        return Err(CoreError::identity(T::TABLE, "cannot assign nil identity"));
    }
    record.set_identity(id);
    Ok(())
}
