//! Store handle contract and the in-memory reference store.
//!
//! The collection manager never talks to a database client directly. It
//! goes through [`Store`], which both the ambient handle and a caller-owned
//! transaction implement, so every operation has a single implementation
//! that runs against either.

mod columns;
mod error;
mod memory;
mod query;
mod relation;
mod table;
mod transaction;

pub use columns::Columns;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use query::{Direction, Order, Query};
pub use relation::Relation;
pub use transaction::{MemoryTransaction, TransactionState};

use crate::document::Document;
use crate::entity::EntityId;

/// A relational store handle.
///
/// Implementations are expected to:
/// - match rows on every non-zero field of a filter document
/// - honor the query's identity set, ordering, limit and preloads
/// - assign a fresh identity to rows inserted with the nil identity, and
///   maintain timestamps, under the names given by [`Columns`]
/// - report an absent row from [`first`](Store::first) as
///   [`StoreError::NoRows`]
pub trait Store: Send + Sync {
    /// Returns every row matching `query`.
    fn find(&self, table: &str, query: &Query) -> StoreResult<Vec<Document>>;

    /// Returns the first row matching `query`, or `NoRows`.
    fn first(&self, table: &str, query: &Query) -> StoreResult<Document> {
        let limited = query.clone().limit(1);
        self.find(table, &limited)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::no_rows(table))
    }

    /// Counts rows matching the non-zero fields of `filter`.
    fn count(&self, table: &str, filter: &Document) -> StoreResult<u64>;

    /// Inserts a new row and returns it as stored.
    fn insert(&self, table: &str, columns: Columns, doc: Document) -> StoreResult<Document>;

    /// Writes every field of a row, inserting it if absent, and returns it
    /// as stored.
    fn save(&self, table: &str, columns: Columns, doc: Document) -> StoreResult<Document>;

    /// Writes the non-zero fields of `patch` onto row `id`.
    ///
    /// Returns the number of rows affected.
    fn update_fields(
        &self,
        table: &str,
        columns: Columns,
        id: EntityId,
        patch: &Document,
    ) -> StoreResult<u64>;

    /// Deletes row `id`. Returns the number of rows affected.
    fn delete(&self, table: &str, id: EntityId) -> StoreResult<u64>;
}
