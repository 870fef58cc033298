//! # dbscope Testkit
//!
//! Test utilities for dbscope.
//!
//! This crate provides:
//! - A recording provider that journals every call and fails on demand
//! - Fixtures over recording providers and over the memory engine
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dbscope_testkit::prelude::*;
//!
//! #[test]
//! fn unsaved_scope_rolls_back() {
//!     let fixture = RecordingFixture::new();
//!     let scope = fixture.factory.create_with_isolation_level(IsolationLevel::Snapshot)?;
//!     scope.get::<RecordingProvider<Primary>>()?;
//!     drop(scope);
//!     assert_eq!(fixture.primary.count(Operation::Rollback), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod failure;
pub mod fixtures;
pub mod generators;
pub mod recording;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::failure::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::recording::*;
}

pub use failure::*;
pub use fixtures::*;
pub use generators::*;
pub use recording::*;
