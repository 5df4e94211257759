//! Store error types.

use crate::entity::EntityId;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a store handle.
///
/// `NoRows` is kept distinct from every other failure so callers can tell a
/// missing row from a broken store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A point lookup matched zero rows.
    #[error("no rows in {table}")]
    NoRows {
        /// Table that was searched.
        table: String,
    },

    /// A row with the same identity already exists.
    #[error("duplicate identity {id} in {table}")]
    Conflict {
        /// Table of the insert.
        table: String,
        /// Identity that collided.
        id: EntityId,
    },

    /// A preload named a relation the table does not declare.
    #[error("unknown relation {relation} on {table}")]
    UnknownRelation {
        /// Table being queried.
        table: String,
        /// Relation name that was requested.
        relation: String,
    },

    /// The transaction was already committed or rolled back.
    #[error("transaction already {state}")]
    TransactionClosed {
        /// Final state of the transaction.
        state: &'static str,
    },

    /// A document could not be stored as given.
    #[error("invalid document for {table}: {message}")]
    InvalidDocument {
        /// Target table.
        table: String,
        /// What was wrong.
        message: String,
    },

    /// Any other backend failure.
    #[error("backend error: {message}")]
    Backend {
        /// Backend-specific description.
        message: String,
    },
}

impl StoreError {
    /// Creates a no-rows error.
    pub fn no_rows(table: impl Into<String>) -> Self {
        Self::NoRows {
            table: table.into(),
        }
    }

    /// Creates an invalid document error.
    pub fn invalid_document(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Returns true if this error means "zero rows matched".
    #[must_use]
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::NoRows { .. })
    }
}
