//! Write operations.
//!
//! Each public write has an ambient form and a `*_with_tx` form; both
//! delegate to a single `*_in` implementation taking the store handle.

use super::Repository;
use crate::document::{decode, document_id, encode, encode_sparse};
use crate::entity::{assign_identity, identity_of, EntityId, Record};
use crate::error::{CoreError, CoreResult};
use crate::notify::ChangeKind;
use crate::preload::merge_preloads;
use crate::store::{Columns, Query, Store, StoreError};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

impl<T, R, Q> Repository<T, R, Q>
where
    T: Record,
    R: Serialize + 'static,
{
    /// Inserts `record`, overwriting it with the stored row.
    ///
    /// A nil identity and unset timestamps are assigned by the store. When
    /// any preloads are composed the row is re-read with them attached.
    pub fn create(&self, record: &mut T, preloads: &[&str]) -> CoreResult<()> {
        self.create_in(self.store(), record, preloads)
    }

    /// [`create`](Self::create) through a transaction handle.
    pub fn create_with_tx(&self, tx: &dyn Store, record: &mut T, preloads: &[&str]) -> CoreResult<()> {
        self.create_in(tx, record, preloads)
    }

    /// Inserts every record. No per-record notifications are sent.
    pub fn create_many(&self, records: &mut [T], preloads: &[&str]) -> CoreResult<()> {
        self.create_many_in(self.store(), records, preloads)
    }

    /// [`create_many`](Self::create_many) through a transaction handle.
    pub fn create_many_with_tx(&self, tx: &dyn Store, records: &mut [T], preloads: &[&str]) -> CoreResult<()> {
        self.create_many_in(tx, records, preloads)
    }

    /// Saves every field of `record` by its identity.
    ///
    /// Fails with `Identity` when the record has no identity.
    pub fn update(&self, record: &mut T, preloads: &[&str]) -> CoreResult<()> {
        self.update_in(self.store(), record, preloads)
    }

    /// [`update`](Self::update) through a transaction handle.
    pub fn update_with_tx(&self, tx: &dyn Store, record: &mut T, preloads: &[&str]) -> CoreResult<()> {
        self.update_in(tx, record, preloads)
    }

    /// Assigns `id` to `record` and saves it.
    pub fn update_by_id(&self, id: EntityId, record: &mut T, preloads: &[&str]) -> CoreResult<()> {
        self.update_by_id_in(self.store(), id, record, preloads)
    }

    /// [`update_by_id`](Self::update_by_id) through a transaction handle.
    pub fn update_by_id_with_tx(
        &self,
        tx: &dyn Store,
        id: EntityId,
        record: &mut T,
        preloads: &[&str],
    ) -> CoreResult<()> {
        self.update_by_id_in(tx, id, record, preloads)
    }

    /// Writes only the non-zero fields of `patch` onto record `id`, then
    /// reloads the full row into `patch`.
    ///
    /// Zero-valued fields are never cleared. Fails with `NotFound` when the
    /// row does not exist.
    pub fn update_fields(&self, id: EntityId, patch: &mut T, preloads: &[&str]) -> CoreResult<()> {
        self.update_fields_in(self.store(), id, patch, preloads)
    }

    /// [`update_fields`](Self::update_fields) through a transaction handle.
    pub fn update_fields_with_tx(
        &self,
        tx: &dyn Store,
        id: EntityId,
        patch: &mut T,
        preloads: &[&str],
    ) -> CoreResult<()> {
        self.update_fields_in(tx, id, patch, preloads)
    }

    /// Updates every record, stopping at the first failure.
    pub fn update_many(&self, records: &mut [T], preloads: &[&str]) -> CoreResult<()> {
        self.update_many_in(self.store(), records, preloads)
    }

    /// [`update_many`](Self::update_many) through a transaction handle.
    pub fn update_many_with_tx(&self, tx: &dyn Store, records: &mut [T], preloads: &[&str]) -> CoreResult<()> {
        self.update_many_in(tx, records, preloads)
    }

    /// Deletes `record` by its identity.
    pub fn delete(&self, record: &T) -> CoreResult<()> {
        self.delete_in(self.store(), record)
    }

    /// [`delete`](Self::delete) through a transaction handle.
    pub fn delete_with_tx(&self, tx: &dyn Store, record: &T) -> CoreResult<()> {
        self.delete_in(tx, record)
    }

    /// Loads record `id` and deletes it.
    ///
    /// Fails with `NotFound` when it does not exist.
    pub fn delete_by_id(&self, id: EntityId) -> CoreResult<()> {
        self.delete_by_id_in(self.store(), id)
    }

    /// [`delete_by_id`](Self::delete_by_id) through a transaction handle.
    pub fn delete_by_id_with_tx(&self, tx: &dyn Store, id: EntityId) -> CoreResult<()> {
        self.delete_by_id_in(tx, id)
    }

    /// Deletes every record, stopping at the first failure.
    pub fn delete_many(&self, records: &[T]) -> CoreResult<()> {
        self.delete_many_in(self.store(), records)
    }

    /// [`delete_many`](Self::delete_many) through a transaction handle.
    pub fn delete_many_with_tx(&self, tx: &dyn Store, records: &[T]) -> CoreResult<()> {
        self.delete_many_in(tx, records)
    }

    pub(super) fn create_in(&self, store: &dyn Store, record: &mut T, preloads: &[&str]) -> CoreResult<()> {
        let stored = store
            .insert(T::TABLE, Columns::of::<T>(), encode(record)?)
            .map_err(|e| CoreError::persistence(format!("failed to create {}", T::TABLE), e))?;
        let id = document_id(&stored, T::ID_COLUMN);

        let merged = merge_preloads(&self.preloads, preloads);
        *record = if merged.is_empty() {
            decode(stored)?
        } else {
            self.reload(store, id, &merged)?
        };

        debug!(table = T::TABLE, %id, "created");
        self.notify(ChangeKind::Created, record);
        Ok(())
    }

    fn create_many_in(&self, store: &dyn Store, records: &mut [T], preloads: &[&str]) -> CoreResult<()> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records.iter_mut() {
            let stored = store
                .insert(T::TABLE, Columns::of::<T>(), encode(record)?)
                .map_err(|e| CoreError::persistence(format!("failed to create {}", T::TABLE), e))?;
            ids.push(document_id(&stored, T::ID_COLUMN));
            *record = decode(stored)?;
        }
        debug!(table = T::TABLE, rows = ids.len(), "created batch");

        let merged = merge_preloads(&self.preloads, preloads);
        if merged.is_empty() || ids.is_empty() {
            return Ok(());
        }

        let query = Query::new().ids(ids.clone()).preloads(merged);
        let mut reloaded: HashMap<EntityId, T> = self
            .fetch(store, &query, "reload")?
            .into_iter()
            .map(|r| (r.identity(), r))
            .collect();
        for (record, id) in records.iter_mut().zip(ids) {
            *record = reloaded.remove(&id).ok_or_else(|| {
                CoreError::persistence(
                    format!("failed to reload {} {id}", T::TABLE),
                    StoreError::no_rows(T::TABLE),
                )
            })?;
        }
        Ok(())
    }

    pub(super) fn update_in(&self, store: &dyn Store, record: &mut T, preloads: &[&str]) -> CoreResult<()> {
        let id = identity_of(record)?;
        let stored = store
            .save(T::TABLE, Columns::of::<T>(), encode(record)?)
            .map_err(|e| CoreError::persistence(format!("failed to update {} {id}", T::TABLE), e))?;

        let merged = merge_preloads(&self.preloads, preloads);
        *record = if merged.is_empty() {
            decode(stored)?
        } else {
            self.reload(store, id, &merged)?
        };

        debug!(table = T::TABLE, %id, "updated");
        self.notify(ChangeKind::Updated, record);
        Ok(())
    }

    fn update_by_id_in(&self, store: &dyn Store, id: EntityId, record: &mut T, preloads: &[&str]) -> CoreResult<()> {
        assign_identity(record, id)?;
        self.update_in(store, record, preloads)
    }

    fn update_fields_in(&self, store: &dyn Store, id: EntityId, patch: &mut T, preloads: &[&str]) -> CoreResult<()> {
        let fields = encode_sparse(patch)?;
        let affected = store
            .update_fields(T::TABLE, Columns::of::<T>(), id, &fields)
            .map_err(|e| CoreError::persistence(format!("failed to update {} {id}", T::TABLE), e))?;
        if affected == 0 {
            return Err(CoreError::not_found(T::TABLE, id));
        }

        let merged = merge_preloads(&self.preloads, preloads);
        *patch = self.reload(store, id, &merged)?;

        debug!(table = T::TABLE, %id, fields = fields.len(), "patched");
        self.notify(ChangeKind::Updated, patch);
        Ok(())
    }

    fn update_many_in(&self, store: &dyn Store, records: &mut [T], preloads: &[&str]) -> CoreResult<()> {
        records
            .iter_mut()
            .try_for_each(|record| self.update_in(store, record, preloads))
    }

    fn delete_in(&self, store: &dyn Store, record: &T) -> CoreResult<()> {
        let id = identity_of(record)?;
        let affected = store
            .delete(T::TABLE, id)
            .map_err(|e| CoreError::persistence(format!("failed to delete {} {id}", T::TABLE), e))?;

        debug!(table = T::TABLE, %id, affected, "deleted");
        self.notify(ChangeKind::Deleted, record);
        Ok(())
    }

    fn delete_by_id_in(&self, store: &dyn Store, id: EntityId) -> CoreResult<()> {
        let record = self.load(store, id, &[])?;
        self.delete_in(store, &record)
    }

    fn delete_many_in(&self, store: &dyn Store, records: &[T]) -> CoreResult<()> {
        records
            .iter()
            .try_for_each(|record| self.delete_in(store, record))
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::Repository;
    use crate::config::NotifierConfig;
    use crate::entity::{EntityId, Identified, Record};
    use crate::error::CoreError;
    use crate::notify::Notifier;
    use crate::store::{Columns, MemoryStore, Store};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn setup() -> (MemoryStore, Arc<Collect>, Repository<Note, String>) {
        let store = store();
        let collect = Arc::new(Collect::default());
        let notifier = Arc::new(Notifier::new(collect.clone(), NotifierConfig::new().workers(1)).unwrap());
        let notes = Repository::builder(Arc::new(store.clone()), |n: &Note| n.title.clone())
            .notifier(notifier)
            .build();
        (store, collect, notes)
    }

    /// A record that stores its identity and timestamps under its own names.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Ticket {
        uid: EntityId,
        subject: String,
        opened_at: Option<DateTime<Utc>>,
        modified_at: Option<DateTime<Utc>>,
    }

    impl Identified for Ticket {
        fn identity(&self) -> EntityId {
            self.uid
        }
        fn set_identity(&mut self, id: EntityId) {
            self.uid = id;
        }
    }

    impl Record for Ticket {
        const TABLE: &'static str = "tickets";
        const ID_COLUMN: &'static str = "uid";
        const CREATED_AT: &'static str = "opened_at";
        const UPDATED_AT: &'static str = "modified_at";
    }

    fn settle(notes: &Repository<Note, String>) {
        assert!(notes
            .notifier()
            .unwrap()
            .wait_idle(Duration::from_secs(5)));
    }

    fn author(store: &MemoryStore, name: &str) -> EntityId {
        let row = store
            .insert(
                Author::TABLE,
                Columns::of::<Author>(),
                json!({ "name": name }).as_object().cloned().unwrap(),
            )
            .unwrap();
        row["id"].as_str().unwrap().parse().unwrap()
    }

    #[test]
    fn create_assigns_identity_and_timestamps() {
        let (_, collect, notes) = setup();
        let mut n = note("a");
        notes.create(&mut n, &[]).unwrap();

        assert!(!n.id.is_nil());
        assert!(n.created_at.is_some());
        assert!(n.updated_at.is_some());
        assert_eq!(notes.get_by_id(n.id, &[]).unwrap(), n);

        settle(&notes);
        assert_eq!(collect.topics(), ["notes.create"]);
        let seen = collect.seen.lock();
        assert_eq!(seen[0].0[1], format!("notes.create.{}", n.id));
        assert_eq!(seen[0].1, json!("a"));
    }

    #[test]
    fn create_with_preload_reloads_relation() {
        let (store, _, notes) = setup();
        let mut n = note("a");
        n.author_id = Some(author(&store, "ada"));

        notes.create(&mut n, &["author"]).unwrap();
        assert_eq!(n.author.as_ref().map(|a| a.name.as_str()), Some("ada"));
    }

    #[test]
    fn create_duplicate_identity_is_persistence() {
        let (_, _, notes) = setup();
        let mut first = note("a");
        notes.create(&mut first, &[]).unwrap();

        let mut dup = note("b");
        dup.id = first.id;
        assert!(notes.create(&mut dup, &[]).unwrap_err().is_persistence());
    }

    #[test]
    fn create_many_reloads_by_identity() {
        let (store, collect, notes) = setup();
        let author_id = author(&store, "ada");
        let mut batch: Vec<Note> = ["a", "b", "c"]
            .iter()
            .map(|t| Note {
                author_id: Some(author_id),
                ..note(t)
            })
            .collect();

        notes.create_many(&mut batch, &["Author"]).unwrap();
        assert!(batch.iter().all(|n| !n.id.is_nil()));
        assert!(batch.iter().all(|n| n.author.is_some()));
        assert_eq!(
            batch.iter().map(|n| n.title.as_str()).collect::<Vec<_>>(),
            ["a", "b", "c"]
        );

        settle(&notes);
        assert!(collect.topics().is_empty());
    }

    #[test]
    fn update_requires_identity() {
        let (_, _, notes) = setup();
        let err = notes.update(&mut note("a"), &[]).unwrap_err();
        assert!(matches!(err, CoreError::Identity { .. }));
    }

    #[test]
    fn update_by_id_assigns_identity() {
        let (_, collect, notes) = setup();
        let mut n = note("a");
        notes.create(&mut n, &[]).unwrap();

        let mut replacement = note("b");
        notes.update_by_id(n.id, &mut replacement, &[]).unwrap();
        assert_eq!(replacement.id, n.id);
        assert_eq!(notes.get_by_id(n.id, &[]).unwrap().title, "b");

        settle(&notes);
        assert_eq!(collect.topics(), ["notes.create", "notes.update"]);
    }

    #[test]
    fn update_fields_keeps_zero_fields() {
        let (_, _, notes) = setup();
        let mut n = note("a");
        n.pinned = true;
        notes.create(&mut n, &[]).unwrap();

        let mut patch = Note {
            body: "rewritten".into(),
            ..Note::default()
        };
        notes.update_fields(n.id, &mut patch, &[]).unwrap();

        assert_eq!(patch.id, n.id);
        assert_eq!(patch.title, "a");
        assert_eq!(patch.body, "rewritten");
        assert!(patch.pinned);
        assert!(patch.updated_at > n.updated_at);
    }

    #[test]
    fn update_fields_missing_is_not_found() {
        let (_, _, notes) = setup();
        let err = notes
            .update_fields(EntityId::new(), &mut note("x"), &[])
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn update_many_stops_at_first_failure() {
        let (_, _, notes) = setup();
        let mut good = note("a");
        notes.create(&mut good, &[]).unwrap();
        good.title = "a2".into();

        let mut batch = vec![good.clone(), note("no identity"), good];
        assert!(notes.update_many(&mut batch, &[]).is_err());
        assert_eq!(batch[0].title, "a2");
    }

    #[test]
    fn delete_notifies_on_delete_topic() {
        let (_, collect, notes) = setup();
        let mut n = note("a");
        notes.create(&mut n, &[]).unwrap();
        notes.delete(&n).unwrap();

        assert!(notes.get_by_id(n.id, &[]).unwrap_err().is_not_found());
        settle(&notes);
        assert_eq!(collect.topics(), ["notes.create", "notes.delete"]);
    }

    #[test]
    fn delete_by_id_missing_is_not_found() {
        let (_, _, notes) = setup();
        assert!(notes.delete_by_id(EntityId::new()).unwrap_err().is_not_found());
    }

    #[test]
    fn delete_many_removes_all() {
        let (store, _, notes) = setup();
        let mut batch = vec![note("a"), note("b")];
        notes.create_many(&mut batch, &[]).unwrap();
        notes.delete_many(&batch).unwrap();
        assert_eq!(store.row_count(Note::TABLE), 0);
    }

    #[test]
    fn tx_writes_are_invisible_until_commit() {
        let (store, collect, notes) = setup();
        let tx = store.begin();

        let mut n = note("staged");
        notes.create_with_tx(&tx, &mut n, &[]).unwrap();
        let mut patch = Note {
            pinned: true,
            ..Note::default()
        };
        notes.update_fields_with_tx(&tx, n.id, &mut patch, &[]).unwrap();
        assert!(patch.pinned);

        assert!(notes.get_by_id(n.id, &[]).unwrap_err().is_not_found());
        tx.commit().unwrap();
        assert!(notes.get_by_id(n.id, &[]).unwrap().pinned);

        settle(&notes);
        assert_eq!(collect.topics(), ["notes.create", "notes.update"]);
    }

    #[test]
    fn tx_delete_rolls_back() {
        let (store, _, notes) = setup();
        let mut n = note("keep");
        notes.create(&mut n, &[]).unwrap();

        let tx = store.begin();
        notes.delete_by_id_with_tx(&tx, n.id).unwrap();
        assert!(tx.first(Note::TABLE, &crate::store::Query::new().id(n.id)).is_err());
        tx.rollback().unwrap();

        assert!(notes.get_by_id(n.id, &[]).is_ok());
    }

    #[test]
    fn closed_tx_is_persistence_failure() {
        let (store, _, notes) = setup();
        let tx = store.begin();
        tx.commit().unwrap();

        let err = notes.create_with_tx(&tx, &mut note("late"), &[]).unwrap_err();
        assert!(err.is_persistence());
    }

    #[test]
    fn renamed_columns_are_maintained() {
        let tickets: Repository<Ticket, String> =
            Repository::builder(Arc::new(MemoryStore::new()), |t: &Ticket| t.subject.clone()).build();

        let mut batch: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|s| Ticket {
                subject: s.to_string(),
                ..Ticket::default()
            })
            .collect();
        for ticket in &mut batch {
            tickets.create(ticket, &[]).unwrap();
            assert!(!ticket.uid.is_nil());
            assert!(ticket.opened_at.is_some());
            assert!(ticket.modified_at.is_some());
        }
        assert_eq!(tickets.get_by_id(batch[0].uid, &[]).unwrap(), batch[0]);

        let mut patch = Ticket {
            subject: "a2".into(),
            ..Ticket::default()
        };
        tickets.update_fields(batch[0].uid, &mut patch, &[]).unwrap();
        assert_eq!(patch.uid, batch[0].uid);
        assert_eq!(patch.opened_at, batch[0].opened_at);
        assert!(patch.modified_at > batch[2].modified_at);

        assert_eq!(tickets.list_raw(&[]).unwrap(), ["a2", "c", "b"]);
        assert_eq!(tickets.find_one_raw(&Ticket::default(), &[]).unwrap(), "c");

        let mut again = Ticket {
            subject: "a3".into(),
            ..patch.clone()
        };
        tickets.upsert(&mut again, &[]).unwrap();
        assert_eq!(again.opened_at, batch[0].opened_at);
        assert_eq!(tickets.count(&Ticket::default()).unwrap(), 3);
    }
}
