//! Relation declarations used for preloading.

/// A belongs-to relation from one table to another.
///
/// Preloading `name` on a row reads the identity in `foreign_key`, loads the
/// matching row from `target_table`, and attaches it under `field` (or
/// `null` when the key is unset or dangling).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Preload name, e.g. `Media`.
    pub name: String,
    /// Column holding the target identity, e.g. `media_id`.
    pub foreign_key: String,
    /// Table the target row lives in.
    pub target_table: String,
    /// Field the loaded row is attached under, e.g. `media`.
    pub field: String,
}

impl Relation {
    /// Declares a belongs-to relation.
    pub fn belongs_to(
        name: impl Into<String>,
        foreign_key: impl Into<String>,
        target_table: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            foreign_key: foreign_key.into(),
            target_table: target_table.into(),
            field: field.into(),
        }
    }
}
