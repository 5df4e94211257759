//! # Horizon Core
//!
//! Generic collection manager for record types backed by a relational
//! store.
//!
//! This crate provides:
//! - Identity access for records (`Identified`, `Record`)
//! - Preload set composition
//! - Response mapping
//! - CRUD over an ambient store or a caller-owned transaction
//! - Upsert resolution
//! - Asynchronous change notification through a bounded worker pool
//! - An in-memory reference store with transactions

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod document;
mod entity;
mod error;
mod notify;
mod preload;
mod repository;
mod store;
mod validate;

pub use config::NotifierConfig;
pub use document::{decode, document_id, encode, encode_sparse, is_zero, non_zero_fields, Document};
pub use entity::{assign_identity, identity_of, EntityId, Identified, Record};
pub use error::{CoreError, CoreResult};
pub use notify::{
    ChangeKind, DispatchError, Dispatcher, Notification, Notifier, NotifierSnapshot, NotifierStats,
};
pub use preload::merge_preloads;
pub use repository::{default_topics, Repository, RepositoryBuilder, ResourceFn, TopicsFn};
pub use store::{
    Columns, Direction, MemoryStore, MemoryTransaction, Order, Query, Relation, Store, StoreError,
    StoreResult, TransactionState,
};
pub use validate::{bind, FieldError, Validate, ValidationErrors, Validator};
