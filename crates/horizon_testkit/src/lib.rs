//! # Horizon Testkit
//!
//! Test utilities for Horizon collections.
//!
//! This crate provides:
//! - The feedback/media domain, re-exported from `horizon_feedback`
//! - Ready-wired collections over an in-memory store
//! - Fake dispatchers: recording, slow and failing
//! - Property-based test generators using proptest
//! - Concurrent stress helpers
//!
//! ## Usage
//!
//! ```rust
//! use horizon_testkit::prelude::*;
//!
//! let (collections, recorder) = TestCollections::recording();
//! let mut feedback = sample_feedback(1);
//! collections.feedback.create(&mut feedback, &[]).unwrap();
//! collections.settle();
//! assert_eq!(recorder.published_to("feedback.create").len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod dispatchers;
pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dispatchers::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use dispatchers::*;
pub use fixtures::*;
pub use generators::*;
pub use stress::*;
