//! Create-or-update resolution.

use super::Repository;
use crate::entity::Record;
use crate::error::{CoreError, CoreResult};
use crate::store::{Query, Store};
use serde::Serialize;
use tracing::debug;

impl<T, R, Q> Repository<T, R, Q>
where
    T: Record,
    R: Serialize + 'static,
{
    /// Creates `record` if it has no identity or its identity is not stored
    /// yet, and updates it otherwise.
    ///
    /// A lookup failure other than "no such row" is returned as is; it never
    /// falls through to a create.
    pub fn upsert(&self, record: &mut T, preloads: &[&str]) -> CoreResult<()> {
        self.upsert_in(self.store(), record, preloads)
    }

    /// [`upsert`](Self::upsert) through a transaction handle.
    pub fn upsert_with_tx(&self, tx: &dyn Store, record: &mut T, preloads: &[&str]) -> CoreResult<()> {
        self.upsert_in(tx, record, preloads)
    }

    /// Upserts every record, stopping at the first failure.
    pub fn upsert_many(&self, records: &mut [T], preloads: &[&str]) -> CoreResult<()> {
        self.upsert_many_in(self.store(), records, preloads)
    }

    /// [`upsert_many`](Self::upsert_many) through a transaction handle.
    pub fn upsert_many_with_tx(&self, tx: &dyn Store, records: &mut [T], preloads: &[&str]) -> CoreResult<()> {
        self.upsert_many_in(tx, records, preloads)
    }

    fn upsert_in(&self, store: &dyn Store, record: &mut T, preloads: &[&str]) -> CoreResult<()> {
        let id = record.identity();
        if id.is_nil() {
            return self.create_in(store, record, preloads);
        }

        match store.first(T::TABLE, &Query::new().id(id)) {
            Ok(_) => self.update_in(store, record, preloads),
            Err(e) if e.is_no_rows() => {
                debug!(table = T::TABLE, %id, "upsert found no row, creating");
                self.create_in(store, record, preloads)
            }
            Err(e) => Err(CoreError::persistence(
                format!("failed to look up {} {id} for upsert", T::TABLE),
                e,
            )),
        }
    }

    fn upsert_many_in(&self, store: &dyn Store, records: &mut [T], preloads: &[&str]) -> CoreResult<()> {
        records
            .iter_mut()
            .try_for_each(|record| self.upsert_in(store, record, preloads))
    }
}
