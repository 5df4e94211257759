//! Typed collection manager.
//!
//! A [`Repository`] binds one record type to a store handle, a default
//! preload set, a response mapper and per-action topic builders. Every write
//! exists in two forms: one against the ambient store and a `*_with_tx`
//! form taking a caller-owned transaction handle. Both run the same code;
//! the repository never begins, commits or rolls back a transaction.
//!
//! ```rust
//! use horizon_core::{EntityId, Identified, MemoryStore, Record, Repository};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! struct Note {
//!     id: EntityId,
//!     text: String,
//! }
//!
//! impl Identified for Note {
//!     fn identity(&self) -> EntityId {
//!         self.id
//!     }
//!     fn set_identity(&mut self, id: EntityId) {
//!         self.id = id;
//!     }
//! }
//!
//! impl Record for Note {
//!     const TABLE: &'static str = "notes";
//! }
//!
//! let notes: Repository<Note, String> =
//!     Repository::builder(Arc::new(MemoryStore::new()), |n: &Note| n.text.clone()).build();
//!
//! let mut note = Note { text: "hello".into(), ..Note::default() };
//! notes.create(&mut note, &[])?;
//! assert!(!note.id.is_nil());
//! assert_eq!(notes.get_by_id_raw(note.id, &[])?, "hello");
//! # Ok::<(), horizon_core::CoreError>(())
//! ```

mod read;
mod upsert;
mod write;

use crate::entity::Record;
use crate::error::CoreResult;
use crate::notify::{ChangeKind, Notification, Notifier};
use crate::store::Store;
use crate::validate::{self, Validate};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::trace;

/// Maps a stored record to its outward-facing representation.
pub type ResourceFn<T, R> = Arc<dyn Fn(&T) -> R + Send + Sync>;

/// Builds the topic set for a change to a record.
pub type TopicsFn<T> = Arc<dyn Fn(&T) -> Vec<String> + Send + Sync>;

/// Returns the default topic builder for `kind`:
/// `{table}.{action}` and `{table}.{action}.{id}`.
pub fn default_topics<T: Record>(kind: ChangeKind) -> TopicsFn<T> {
    Arc::new(move |record: &T| {
        vec![
            format!("{}.{kind}", T::TABLE),
            format!("{}.{kind}.{}", T::TABLE, record.identity()),
        ]
    })
}

/// A typed collection over a [`Store`].
///
/// `T` is the stored record, `R` its response shape and `Q` the inbound
/// request type accepted by [`validate`](Repository::validate).
pub struct Repository<T, R, Q = ()> {
    store: Arc<dyn Store>,
    preloads: Vec<String>,
    resource: ResourceFn<T, R>,
    created: TopicsFn<T>,
    updated: TopicsFn<T>,
    deleted: TopicsFn<T>,
    notifier: Option<Arc<Notifier>>,
    _request: PhantomData<fn() -> Q>,
}

impl<T, R, Q> Clone for Repository<T, R, Q> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            preloads: self.preloads.clone(),
            resource: Arc::clone(&self.resource),
            created: Arc::clone(&self.created),
            updated: Arc::clone(&self.updated),
            deleted: Arc::clone(&self.deleted),
            notifier: self.notifier.clone(),
            _request: PhantomData,
        }
    }
}

impl<T: Record, R, Q> fmt::Debug for Repository<T, R, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("table", &T::TABLE)
            .field("preloads", &self.preloads)
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}

/// Builder for [`Repository`].
pub struct RepositoryBuilder<T, R, Q = ()> {
    store: Arc<dyn Store>,
    preloads: Vec<String>,
    resource: ResourceFn<T, R>,
    created: Option<TopicsFn<T>>,
    updated: Option<TopicsFn<T>>,
    deleted: Option<TopicsFn<T>>,
    notifier: Option<Arc<Notifier>>,
    _request: PhantomData<fn() -> Q>,
}

impl<T: Record, R, Q> RepositoryBuilder<T, R, Q> {
    /// Sets the relations preloaded on every read.
    #[must_use]
    pub fn preloads<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preloads = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the topic builder for created records.
    #[must_use]
    pub fn created(mut self, topics: impl Fn(&T) -> Vec<String> + Send + Sync + 'static) -> Self {
        self.created = Some(Arc::new(topics));
        self
    }

    /// Sets the topic builder for updated records.
    #[must_use]
    pub fn updated(mut self, topics: impl Fn(&T) -> Vec<String> + Send + Sync + 'static) -> Self {
        self.updated = Some(Arc::new(topics));
        self
    }

    /// Sets the topic builder for deleted records.
    #[must_use]
    pub fn deleted(mut self, topics: impl Fn(&T) -> Vec<String> + Send + Sync + 'static) -> Self {
        self.deleted = Some(Arc::new(topics));
        self
    }

    /// Publishes changes through `notifier`. Without one, writes are silent.
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Builds the repository.
    pub fn build(self) -> Repository<T, R, Q> {
        Repository {
            store: self.store,
            preloads: self.preloads,
            resource: self.resource,
            created: self
                .created
                .unwrap_or_else(|| default_topics(ChangeKind::Created)),
            updated: self
                .updated
                .unwrap_or_else(|| default_topics(ChangeKind::Updated)),
            deleted: self
                .deleted
                .unwrap_or_else(|| default_topics(ChangeKind::Deleted)),
            notifier: self.notifier,
            _request: PhantomData,
        }
    }
}

impl<T, R, Q> Repository<T, R, Q>
where
    T: Record,
    R: Serialize + 'static,
{
    /// Starts building a repository over `store` with the given response
    /// mapper.
    pub fn builder(
        store: Arc<dyn Store>,
        resource: impl Fn(&T) -> R + Send + Sync + 'static,
    ) -> RepositoryBuilder<T, R, Q> {
        RepositoryBuilder {
            store,
            preloads: Vec::new(),
            resource: Arc::new(resource),
            created: None,
            updated: None,
            deleted: None,
            notifier: None,
            _request: PhantomData,
        }
    }

    /// Returns the ambient store handle.
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Returns the default preload set.
    pub fn default_preloads(&self) -> &[String] {
        &self.preloads
    }

    /// Returns the notifier, if one is attached.
    pub fn notifier(&self) -> Option<&Arc<Notifier>> {
        self.notifier.as_ref()
    }

    /// Maps a record to its response, passing `None` through.
    pub fn to_model(&self, record: Option<&T>) -> Option<R> {
        record.map(|r| (self.resource)(r))
    }

    /// Maps every record to its response, preserving order.
    pub fn to_models(&self, records: &[T]) -> Vec<R> {
        records.iter().map(|r| (self.resource)(r)).collect()
    }

    /// Returns the topics a change of `kind` to `record` would publish to.
    pub fn topics(&self, kind: ChangeKind, record: &T) -> Vec<String> {
        (self.topics_fn(kind))(record)
    }

    fn topics_fn(&self, kind: ChangeKind) -> &TopicsFn<T> {
        match kind {
            ChangeKind::Created => &self.created,
            ChangeKind::Updated => &self.updated,
            ChangeKind::Deleted => &self.deleted,
        }
    }

    /// Queues a change notification for `record`. Never blocks and never
    /// fails; delivery problems are logged by the notifier.
    pub(crate) fn notify(&self, kind: ChangeKind, record: &T) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let topics = Arc::clone(self.topics_fn(kind));
        let resource = Arc::clone(&self.resource);
        let record = record.clone();
        trace!(table = T::TABLE, %kind, "queueing notification");
        notifier.submit(move || {
            let payload = serde_json::to_value(resource(&record))?;
            Ok(Notification {
                topics: topics(&record),
                payload,
            })
        });
    }
}

impl<T, R, Q> Repository<T, R, Q>
where
    T: Record,
    R: Serialize + 'static,
    Q: DeserializeOwned + Validate,
{
    /// Binds a JSON request body and checks its declared constraints.
    pub fn validate(&self, body: &[u8]) -> CoreResult<Q> {
        Ok(validate::bind(body)?)
    }
}
