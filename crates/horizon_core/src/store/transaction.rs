//! Caller-owned transactions over the memory store.

use super::memory::Shared;
use super::table::{self, Table};
use super::{Columns, Query, Store, StoreError, StoreResult};
use crate::document::{document_id, Document};
use crate::entity::EntityId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been rolled back.
    RolledBack,
}

impl TransactionState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Committed => "committed",
            Self::RolledBack => "rolled back",
        }
    }
}

/// A write recorded for replay at commit.
#[derive(Debug, Clone)]
enum PendingWrite {
    Insert { table: String, id: EntityId, doc: Document },
    Put { table: String, id: EntityId, doc: Document },
    Delete { table: String, id: EntityId },
}

struct Inner {
    state: TransactionState,
    /// Working copies of every table this transaction has written.
    working: HashMap<String, Table>,
    writes: Vec<PendingWrite>,
}

impl Inner {
    fn ensure_active(&self) -> StoreResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            state => Err(StoreError::TransactionClosed {
                state: state.as_str(),
            }),
        }
    }
}

/// A transaction over a [`MemoryStore`](super::MemoryStore).
///
/// Reads inside the transaction see its own writes. Nothing is visible to
/// other handles until [`commit`](Self::commit). Dropping an uncommitted
/// transaction discards its writes.
pub struct MemoryTransaction {
    shared: Arc<Shared>,
    inner: Mutex<Inner>,
}

impl MemoryTransaction {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            inner: Mutex::new(Inner {
                state: TransactionState::Active,
                working: HashMap::new(),
                writes: Vec::new(),
            }),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.inner.lock().state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == TransactionState::Active
    }

    /// Returns the number of pending writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.inner.lock().writes.len()
    }

    /// Applies every pending write to the store atomically.
    ///
    /// If an inserted identity was taken by a concurrent writer, nothing is
    /// applied, the transaction is rolled back and `Conflict` is returned.
    pub fn commit(&self) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        inner.ensure_active()?;

        let mut tables = self.shared.tables.write();
        let conflict = inner.writes.iter().find_map(|write| match write {
            PendingWrite::Insert { table, id, .. }
                if tables.get(table).is_some_and(|rows| rows.contains_key(id)) =>
            {
                Some(StoreError::Conflict {
                    table: table.clone(),
                    id: *id,
                })
            }
            _ => None,
        });
        if let Some(err) = conflict {
            inner.state = TransactionState::RolledBack;
            inner.working.clear();
            inner.writes.clear();
            return Err(err);
        }

        let writes = std::mem::take(&mut inner.writes);
        let applied = writes.len();
        for write in writes {
            match write {
                PendingWrite::Insert { table, id, doc } | PendingWrite::Put { table, id, doc } => {
                    tables.entry(table).or_default().insert(id, doc);
                }
                PendingWrite::Delete { table, id } => {
                    if let Some(rows) = tables.get_mut(&table) {
                        rows.remove(&id);
                    }
                }
            }
        }
        inner.working.clear();
        inner.state = TransactionState::Committed;
        debug!(writes = applied, "transaction committed");
        Ok(())
    }

    /// Discards every pending write.
    pub fn rollback(&self) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        inner.ensure_active()?;
        inner.working.clear();
        inner.writes.clear();
        inner.state = TransactionState::RolledBack;
        debug!("transaction rolled back");
        Ok(())
    }

    /// Runs `write` against the working copy of `table`, creating it from
    /// the committed rows on first touch.
    fn write<R>(
        &self,
        table: &str,
        write: impl FnOnce(&mut Table, &mut Vec<PendingWrite>) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let mut inner = self.inner.lock();
        inner.ensure_active()?;
        if !inner.working.contains_key(table) {
            let committed = self
                .shared
                .tables
                .read()
                .get(table)
                .cloned()
                .unwrap_or_default();
            inner.working.insert(table.to_string(), committed);
        }
        let Inner { working, writes, .. } = &mut *inner;
        match working.get_mut(table) {
            Some(rows) => write(rows, writes),
            None => Err(StoreError::backend("working table vanished")),
        }
    }

    fn record_put(
        &self,
        table: &str,
        columns: Columns,
        doc: &Document,
        writes: &mut Vec<PendingWrite>,
        insert: bool,
    ) {
        let id = document_id(doc, columns.id);
        let table = table.to_string();
        let doc = doc.clone();
        writes.push(if insert {
            PendingWrite::Insert { table, id, doc }
        } else {
            PendingWrite::Put { table, id, doc }
        });
    }
}

impl fmt::Debug for MemoryTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MemoryTransaction")
            .field("state", &inner.state)
            .field("writes", &inner.writes.len())
            .finish()
    }
}

impl Store for MemoryTransaction {
    fn find(&self, table: &str, query: &Query) -> StoreResult<Vec<Document>> {
        let inner = self.inner.lock();
        inner.ensure_active()?;
        let committed = self.shared.tables.read();
        let view = |t: &str| inner.working.get(t).or_else(|| committed.get(t));
        let lookup = |t: &str, id: EntityId| view(t).and_then(|rows| rows.get(&id)).cloned();
        table::select(&self.shared.schema, table, view(table), query, &lookup)
    }

    fn count(&self, table: &str, filter: &Document) -> StoreResult<u64> {
        let inner = self.inner.lock();
        inner.ensure_active()?;
        let committed = self.shared.tables.read();
        let rows = inner.working.get(table).or_else(|| committed.get(table));
        Ok(table::count(&self.shared.schema, table, rows, filter))
    }

    fn insert(&self, table: &str, columns: Columns, doc: Document) -> StoreResult<Document> {
        self.write(table, |rows, writes| {
            let stored =
                table::insert(&self.shared.schema, &self.shared.clock, table, columns, rows, doc)?;
            self.record_put(table, columns, &stored, writes, true);
            Ok(stored)
        })
    }

    fn save(&self, table: &str, columns: Columns, doc: Document) -> StoreResult<Document> {
        self.write(table, |rows, writes| {
            let id = document_id(&doc, columns.id);
            let existed = rows.contains_key(&id);
            let stored =
                table::save(&self.shared.schema, &self.shared.clock, table, columns, rows, doc)?;
            self.record_put(table, columns, &stored, writes, !existed);
            Ok(stored)
        })
    }

    fn update_fields(
        &self,
        table: &str,
        columns: Columns,
        id: EntityId,
        patch: &Document,
    ) -> StoreResult<u64> {
        self.write(table, |rows, writes| {
            let shared = &self.shared;
            match table::update_fields(&shared.schema, &shared.clock, table, columns, rows, id, patch) {
                Some(row) => {
                    self.record_put(table, columns, &row, writes, false);
                    Ok(1)
                }
                None => Ok(0),
            }
        })
    }

    fn delete(&self, table: &str, id: EntityId) -> StoreResult<u64> {
        self.write(table, |rows, writes| {
            if rows.remove(&id).is_none() {
                return Ok(0);
            }
            writes.push(PendingWrite::Delete {
                table: table.to_string(),
                id,
            });
            Ok(1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::{json, Value};

    const COLS: Columns = Columns::DEFAULT;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn new_transaction_is_active() {
        let store = MemoryStore::new();
        let txn = store.begin();
        assert!(txn.is_active());
        assert_eq!(txn.state(), TransactionState::Active);
        assert_eq!(txn.write_count(), 0);
    }

    #[test]
    fn reads_see_own_writes_only() {
        let store = MemoryStore::new();
        let txn = store.begin();

        let stored = txn.insert("notes", COLS, doc(json!({"title": "draft"}))).unwrap();
        let id = document_id(&stored, "id");

        assert_eq!(txn.count("notes", &Document::new()).unwrap(), 1);
        assert!(txn.first("notes", &Query::new().id(id)).is_ok());
        assert_eq!(store.row_count("notes"), 0);
    }

    #[test]
    fn commit_publishes_writes() {
        let store = MemoryStore::new();
        let existing = store.insert("notes", COLS, doc(json!({"title": "old"}))).unwrap();
        let existing_id = document_id(&existing, "id");

        let txn = store.begin();
        txn.insert("notes", COLS, doc(json!({"title": "new"}))).unwrap();
        txn.update_fields("notes", COLS, existing_id, &doc(json!({"title": "older"})))
            .unwrap();
        assert_eq!(txn.write_count(), 2);
        txn.commit().unwrap();

        assert_eq!(txn.state(), TransactionState::Committed);
        assert_eq!(store.row_count("notes"), 2);
        let row = store.first("notes", &Query::new().id(existing_id)).unwrap();
        assert_eq!(row["title"], json!("older"));
    }

    #[test]
    fn rollback_discards_writes() {
        let store = MemoryStore::new();
        let existing = store.insert("notes", COLS, doc(json!({"title": "keep"}))).unwrap();
        let id = document_id(&existing, "id");

        let txn = store.begin();
        txn.delete("notes", id).unwrap();
        txn.insert("notes", COLS, doc(json!({"title": "gone"}))).unwrap();
        assert_eq!(txn.count("notes", &Document::new()).unwrap(), 1);
        txn.rollback().unwrap();

        assert_eq!(txn.state(), TransactionState::RolledBack);
        assert_eq!(store.row_count("notes"), 1);
        assert!(store.first("notes", &Query::new().id(id)).is_ok());
    }

    #[test]
    fn dropped_transaction_discards_writes() {
        let store = MemoryStore::new();
        {
            let txn = store.begin();
            txn.insert("notes", COLS, doc(json!({"title": "x"}))).unwrap();
        }
        assert_eq!(store.row_count("notes"), 0);
    }

    #[test]
    fn cannot_write_after_commit() {
        let store = MemoryStore::new();
        let txn = store.begin();
        txn.commit().unwrap();

        let err = txn.insert("notes", COLS, Document::new()).unwrap_err();
        assert_eq!(err, StoreError::TransactionClosed { state: "committed" });
        assert!(txn.commit().is_err());
    }

    #[test]
    fn cannot_read_after_rollback() {
        let store = MemoryStore::new();
        let txn = store.begin();
        txn.rollback().unwrap();

        let err = txn.find("notes", &Query::new()).unwrap_err();
        assert_eq!(err, StoreError::TransactionClosed { state: "rolled back" });
    }

    #[test]
    fn conflicting_insert_aborts_commit() {
        let store = MemoryStore::new();
        let id = EntityId::new();

        let txn = store.begin();
        txn.insert("notes", COLS, doc(json!({"id": id, "title": "mine"}))).unwrap();
        txn.insert("notes", COLS, doc(json!({"title": "other"}))).unwrap();
        store.insert("notes", COLS, doc(json!({"id": id, "title": "theirs"}))).unwrap();

        let err = txn.commit().unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(txn.state(), TransactionState::RolledBack);
        assert_eq!(store.row_count("notes"), 1);
    }

    #[test]
    fn preload_sees_uncommitted_target() {
        let store = MemoryStore::new()
            .with_relation("post", crate::store::Relation::belongs_to("Author", "author_id", "author", "author"));
        let txn = store.begin();

        let author = txn.insert("author", COLS, doc(json!({"name": "ada"}))).unwrap();
        txn.insert("post", COLS, doc(json!({"author_id": author["id"].clone()})))
            .unwrap();

        let post = txn.first("post", &Query::new().preload("Author")).unwrap();
        assert_eq!(post["author"]["name"], json!("ada"));
    }
}
