//! Per-record bookkeeping column names.

use crate::entity::Record;

/// Names of the identity and timestamp columns of a table.
///
/// Writes carry these so the store assigns identities and stamps times
/// under whatever names the record type serializes them as.
///
/// ```rust
/// use horizon_core::Columns;
///
/// let columns = Columns::DEFAULT;
/// assert_eq!(columns.id, "id");
/// assert_eq!(columns.updated_at, "updated_at");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    /// Column holding the identity.
    pub id: &'static str,
    /// Column holding the creation timestamp.
    pub created_at: &'static str,
    /// Column holding the last-modified timestamp.
    pub updated_at: &'static str,
}

impl Columns {
    /// `id`, `created_at` and `updated_at`.
    pub const DEFAULT: Self = Self {
        id: "id",
        created_at: "created_at",
        updated_at: "updated_at",
    };

    /// Returns the columns declared by record type `T`.
    #[must_use]
    pub const fn of<T: Record>() -> Self {
        Self {
            id: T::ID_COLUMN,
            created_at: T::CREATED_AT,
            updated_at: T::UPDATED_AT,
        }
    }
}

impl Default for Columns {
    fn default() -> Self {
        Self::DEFAULT
    }
}
