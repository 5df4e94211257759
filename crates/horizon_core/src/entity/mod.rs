//! Entity identity and record traits.

mod id;
mod record;

pub use id::EntityId;
pub use record::{assign_identity, identity_of, Identified, Record};
