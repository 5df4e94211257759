//! In-memory store.

use super::table::{self, Clock, Schema, Table};
use super::{Columns, MemoryTransaction, Query, Relation, Store, StoreResult};
use crate::document::Document;
use crate::entity::EntityId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// State shared between a store and its transactions.
pub(crate) struct Shared {
    pub(crate) tables: RwLock<HashMap<String, Table>>,
    pub(crate) schema: Schema,
    pub(crate) clock: Clock,
}

impl Shared {
    pub(crate) fn lookup(tables: &HashMap<String, Table>, table: &str, id: EntityId) -> Option<Document> {
        tables.get(table).and_then(|rows| rows.get(&id)).cloned()
    }
}

/// A thread-safe in-memory relational store.
///
/// Tables are created on first write. Relations must be declared up front
/// with [`with_relation`](Self::with_relation) before they can be preloaded.
/// Cloning the store yields another handle to the same data.
///
/// ```rust
/// use horizon_core::{MemoryStore, Relation};
///
/// let store = MemoryStore::new()
///     .with_relation("feedback", Relation::belongs_to("Media", "media_id", "media", "media"));
/// assert_eq!(store.row_count("feedback"), 0);
/// ```
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: RwLock::new(HashMap::new()),
                schema: Schema::default(),
                clock: Clock::new(),
            }),
        }
    }

    /// Declares a relation on `table`.
    ///
    /// Relations are part of the schema, so they can only be declared while
    /// this is the sole handle to the store. Declaring on a shared handle
    /// forks a fresh copy of the schema and data for this handle.
    #[must_use]
    pub fn with_relation(mut self, table: &str, relation: Relation) -> Self {
        match Arc::get_mut(&mut self.shared) {
            Some(shared) => shared.schema.add_relation(table, relation),
            None => {
                let mut schema = self.shared.schema.clone();
                schema.add_relation(table, relation);
                let tables = self.shared.tables.read().clone();
                self.shared = Arc::new(Shared {
                    tables: RwLock::new(tables),
                    schema,
                    clock: Clock::new(),
                });
            }
        }
        self
    }

    /// Begins a transaction against this store.
    #[must_use]
    pub fn begin(&self) -> MemoryTransaction {
        MemoryTransaction::new(Arc::clone(&self.shared))
    }

    /// Returns the number of rows in `table`.
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.shared.tables.read().get(table).map_or(0, Table::len)
    }

    /// Removes every row from every table.
    pub fn clear(&self) {
        self.shared.tables.write().clear();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.shared.tables.read();
        let mut names: Vec<_> = tables.keys().collect();
        names.sort();
        f.debug_struct("MemoryStore").field("tables", &names).finish()
    }
}

impl Store for MemoryStore {
    fn find(&self, table: &str, query: &Query) -> StoreResult<Vec<Document>> {
        let tables = self.shared.tables.read();
        let lookup = |t: &str, id: EntityId| Shared::lookup(&tables, t, id);
        table::select(&self.shared.schema, table, tables.get(table), query, &lookup)
    }

    fn count(&self, table: &str, filter: &Document) -> StoreResult<u64> {
        let tables = self.shared.tables.read();
        Ok(table::count(&self.shared.schema, table, tables.get(table), filter))
    }

    fn insert(&self, table: &str, columns: Columns, doc: Document) -> StoreResult<Document> {
        let mut tables = self.shared.tables.write();
        let rows = tables.entry(table.to_string()).or_default();
        table::insert(&self.shared.schema, &self.shared.clock, table, columns, rows, doc)
    }

    fn save(&self, table: &str, columns: Columns, doc: Document) -> StoreResult<Document> {
        let mut tables = self.shared.tables.write();
        let rows = tables.entry(table.to_string()).or_default();
        table::save(&self.shared.schema, &self.shared.clock, table, columns, rows, doc)
    }

    fn update_fields(
        &self,
        table: &str,
        columns: Columns,
        id: EntityId,
        patch: &Document,
    ) -> StoreResult<u64> {
        let mut tables = self.shared.tables.write();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let updated = table::update_fields(
            &self.shared.schema,
            &self.shared.clock,
            table,
            columns,
            rows,
            id,
            patch,
        );
        Ok(u64::from(updated.is_some()))
    }

    fn delete(&self, table: &str, id: EntityId) -> StoreResult<u64> {
        let mut tables = self.shared.tables.write();
        let removed = tables.get_mut(table).and_then(|rows| rows.remove(&id));
        Ok(u64::from(removed.is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::document_id;
    use crate::store::{Direction, StoreError};
    use serde_json::{json, Value};
    use std::thread;

    const COLS: Columns = Columns::DEFAULT;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn insert_then_first() {
        let store = MemoryStore::new();
        let stored = store.insert("notes", COLS, doc(json!({"title": "hello"}))).unwrap();
        let id = document_id(&stored, "id");

        let found = store.first("notes", &Query::new().id(id)).unwrap();
        assert_eq!(found["title"], json!("hello"));
    }

    #[test]
    fn first_on_missing_is_no_rows() {
        let store = MemoryStore::new();
        let err = store.first("notes", &Query::new().id(EntityId::new())).unwrap_err();
        assert!(err.is_no_rows());
    }

    #[test]
    fn update_and_delete_report_rows_affected() {
        let store = MemoryStore::new();
        let stored = store.insert("notes", COLS, doc(json!({"title": "a"}))).unwrap();
        let id = document_id(&stored, "id");

        assert_eq!(store.update_fields("notes", COLS, id, &doc(json!({"title": "b"}))).unwrap(), 1);
        assert_eq!(store.update_fields("notes", COLS, EntityId::new(), &Document::new()).unwrap(), 0);
        assert_eq!(store.update_fields("missing", COLS, id, &Document::new()).unwrap(), 0);

        assert_eq!(store.delete("notes", id).unwrap(), 1);
        assert_eq!(store.delete("notes", id).unwrap(), 0);
        assert_eq!(store.row_count("notes"), 0);
    }

    #[test]
    fn nested_preload() {
        let store = MemoryStore::new()
            .with_relation("comment", Relation::belongs_to("Post", "post_id", "post", "post"))
            .with_relation("post", Relation::belongs_to("Author", "author_id", "author", "author"));

        let author = store.insert("author", COLS, doc(json!({"name": "ada"}))).unwrap();
        let post = store
            .insert("post", COLS, doc(json!({"author_id": author["id"].clone()})))
            .unwrap();
        store
            .insert("comment", COLS, doc(json!({"post_id": post["id"].clone()})))
            .unwrap();

        let found = store
            .first("comment", &Query::new().preload("Post.Author"))
            .unwrap();
        assert_eq!(found["post"]["author"]["name"], json!("ada"));
    }

    #[test]
    fn relation_fields_are_not_persisted() {
        let store = MemoryStore::new()
            .with_relation("post", Relation::belongs_to("Author", "author_id", "author", "author"));

        let stored = store
            .insert("post", COLS, doc(json!({"title": "t", "author": {"name": "x"}})))
            .unwrap();
        assert!(!stored.contains_key("author"));
        assert_eq!(store.row_count("author"), 0);
    }

    #[test]
    fn unknown_preload_fails() {
        let store = MemoryStore::new();
        let err = store.find("notes", &Query::new().preload("Owner")).unwrap_err();
        assert!(matches!(err, StoreError::UnknownRelation { .. }));
    }

    #[test]
    fn clones_share_data() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.insert("notes", COLS, doc(json!({"title": "a"}))).unwrap();
        assert_eq!(other.row_count("notes"), 1);
    }

    #[test]
    fn concurrent_inserts() {
        let store = MemoryStore::new();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        store
                            .insert("notes", COLS, doc(json!({"title": format!("{t}-{i}")})))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.row_count("notes"), 100);
        let newest = store
            .find("notes", &Query::new().order_by("updated_at", Direction::Desc).limit(5))
            .unwrap();
        assert_eq!(newest.len(), 5);
    }
}
