//! Error types for Horizon core.

use crate::entity::EntityId;
use crate::store::StoreError;
use crate::validate::ValidationErrors;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors surfaced by collection operations.
///
/// `NotFound` is only ever recovered inside upsert; every other variant is
/// returned to the caller as-is.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A point lookup matched zero rows.
    #[error("{table} not found: {key}")]
    NotFound {
        /// Table that was searched.
        table: &'static str,
        /// Description of the lookup key (identity or filter).
        key: String,
    },

    /// An inbound request payload was malformed or violated its constraints.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// A record had no usable identity for the requested operation.
    #[error("identity error on {table}: {message}")]
    Identity {
        /// Table of the offending record.
        table: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// Any other store failure, wrapped with the failing operation.
    #[error("{context}: {source}")]
    Persistence {
        /// Operation-specific message naming the operation and entity.
        context: String,
        /// Underlying store failure.
        #[source]
        source: StoreError,
    },

    /// A record could not be converted to or from its stored document.
    #[error("codec error on {table}: {message}")]
    Codec {
        /// Table of the record being converted.
        table: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// I/O error, e.g. while starting notifier workers.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CoreError {
    /// Creates a not-found error for an identity lookup.
    pub fn not_found(table: &'static str, id: EntityId) -> Self {
        Self::NotFound {
            table,
            key: format!("id {id}"),
        }
    }

    /// Creates a not-found error for a filtered lookup.
    pub fn not_found_matching(table: &'static str) -> Self {
        Self::NotFound {
            table,
            key: "no row matches filter".into(),
        }
    }

    /// Creates an identity error.
    pub fn identity(table: &'static str, message: impl Into<String>) -> Self {
        Self::Identity {
            table,
            message: message.into(),
        }
    }

    /// Wraps a store failure with operation context.
    pub fn persistence(context: impl Into<String>, source: StoreError) -> Self {
        Self::Persistence {
            context: context.into(),
            source,
        }
    }

    /// Creates a codec error.
    pub fn codec(table: &'static str, message: impl Into<String>) -> Self {
        Self::Codec {
            table,
            message: message.into(),
        }
    }

    /// Returns true for `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for `Persistence`.
    #[must_use]
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_table_and_id() {
        let id = EntityId::new();
        let err = CoreError::not_found("feedback", id);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), format!("feedback not found: id {id}"));
    }

    #[test]
    fn persistence_keeps_source() {
        let err = CoreError::persistence(
            "failed to create feedback",
            StoreError::backend("disk full"),
        );
        assert!(err.is_persistence());
        assert!(err.to_string().starts_with("failed to create feedback: "));
        assert!(std::error::Error::source(&err).is_some());
    }
}
