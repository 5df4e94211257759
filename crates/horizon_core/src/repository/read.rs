//! Read operations.

use super::Repository;
use crate::document::{decode, encode_sparse, Document};
use crate::entity::{EntityId, Record};
use crate::error::{CoreError, CoreResult};
use crate::preload::merge_preloads;
use crate::store::{Direction, Query, Store};
use serde::Serialize;
use tracing::debug;

impl<T, R, Q> Repository<T, R, Q>
where
    T: Record,
    R: Serialize + 'static,
{
    /// Returns every record, most recently modified first.
    pub fn list(&self, preloads: &[&str]) -> CoreResult<Vec<T>> {
        let query = Query::new()
            .order_by(T::UPDATED_AT, Direction::Desc)
            .preloads(merge_preloads(&self.preloads, preloads));
        self.fetch(self.store(), &query, "list")
    }

    /// Like [`list`](Self::list), mapped to responses.
    pub fn list_raw(&self, preloads: &[&str]) -> CoreResult<Vec<R>> {
        self.list(preloads).map(|records| self.to_models(&records))
    }

    /// Returns every record matching the non-zero fields of `filter`, most
    /// recently modified first. A filter with every field at its zero value
    /// matches everything.
    pub fn find(&self, filter: &T, preloads: &[&str]) -> CoreResult<Vec<T>> {
        let query = Query::new()
            .filter(encode_sparse(filter)?)
            .order_by(T::UPDATED_AT, Direction::Desc)
            .preloads(merge_preloads(&self.preloads, preloads));
        self.fetch(self.store(), &query, "find")
    }

    /// Like [`find`](Self::find), mapped to responses.
    pub fn find_raw(&self, filter: &T, preloads: &[&str]) -> CoreResult<Vec<R>> {
        self.find(filter, preloads)
            .map(|records| self.to_models(&records))
    }

    /// Returns the most recently created record matching `filter`.
    ///
    /// Fails with `NotFound` when nothing matches.
    pub fn find_one(&self, filter: &T, preloads: &[&str]) -> CoreResult<T> {
        let query = Query::new()
            .filter(encode_sparse(filter)?)
            .order_by(T::CREATED_AT, Direction::Desc)
            .preloads(merge_preloads(&self.preloads, preloads));
        match self.store().first(T::TABLE, &query) {
            Ok(doc) => decode(doc),
            Err(e) if e.is_no_rows() => Err(CoreError::not_found_matching(T::TABLE)),
            Err(e) => Err(CoreError::persistence(
                format!("failed to find one {}", T::TABLE),
                e,
            )),
        }
    }

    /// Like [`find_one`](Self::find_one), mapped to a response.
    pub fn find_one_raw(&self, filter: &T, preloads: &[&str]) -> CoreResult<R> {
        self.find_one(filter, preloads)
            .map(|record| (self.resource)(&record))
    }

    /// Returns the record with identity `id`.
    ///
    /// Fails with `NotFound` when it does not exist.
    pub fn get_by_id(&self, id: EntityId, preloads: &[&str]) -> CoreResult<T> {
        let merged = merge_preloads(&self.preloads, preloads);
        self.load(self.store(), id, &merged)
    }

    /// Like [`get_by_id`](Self::get_by_id), mapped to a response.
    pub fn get_by_id_raw(&self, id: EntityId, preloads: &[&str]) -> CoreResult<R> {
        self.get_by_id(id, preloads)
            .map(|record| (self.resource)(&record))
    }

    /// Counts records matching the non-zero fields of `filter`.
    pub fn count(&self, filter: &T) -> CoreResult<u64> {
        self.count_with_tx(self.store(), filter)
    }

    /// Counts records matching `filter` through a transaction handle.
    pub fn count_with_tx(&self, tx: &dyn Store, filter: &T) -> CoreResult<u64> {
        let filter = encode_sparse(filter)?;
        let count = tx
            .count(T::TABLE, &filter)
            .map_err(|e| CoreError::persistence(format!("failed to count {}", T::TABLE), e))?;
        debug!(table = T::TABLE, count, "counted");
        Ok(count)
    }

    /// Runs `query` and decodes every row.
    pub(super) fn fetch(&self, store: &dyn Store, query: &Query, op: &str) -> CoreResult<Vec<T>> {
        let rows = store
            .find(T::TABLE, query)
            .map_err(|e| CoreError::persistence(format!("failed to {op} {}", T::TABLE), e))?;
        debug!(table = T::TABLE, rows = rows.len(), op, "fetched");
        rows.into_iter().map(decode).collect()
    }

    /// Loads one record by identity; a missing row is `NotFound`.
    pub(super) fn load(&self, store: &dyn Store, id: EntityId, preloads: &[String]) -> CoreResult<T> {
        let query = Query::new().id(id).preloads(preloads.iter().cloned());
        match store.first(T::TABLE, &query) {
            Ok(doc) => decode(doc),
            Err(e) if e.is_no_rows() => Err(CoreError::not_found(T::TABLE, id)),
            Err(e) => Err(CoreError::persistence(
                format!("failed to get {} {id}", T::TABLE),
                e,
            )),
        }
    }

    /// Re-reads a row just written. Any failure, including a missing row,
    /// is a persistence failure.
    pub(super) fn reload(&self, store: &dyn Store, id: EntityId, preloads: &[String]) -> CoreResult<T> {
        let query = Query::new().id(id).preloads(preloads.iter().cloned());
        let doc: Document = store.first(T::TABLE, &query).map_err(|e| {
            CoreError::persistence(format!("failed to reload {} {id}", T::TABLE), e)
        })?;
        decode(doc)
    }
}
