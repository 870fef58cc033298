//! # dbscope Memory
//!
//! In-memory entity store for dbscope.
//!
//! This crate provides:
//! - Entities encoded as CBOR and addressed by UUID
//! - Sessions that buffer writes as a unit of work
//! - Explicit transactions with a recorded isolation level
//! - Read-only sessions (flush mode `Never`)
//! - Statistics counters and CBOR snapshot files
//!
//! [`MemoryProvider`] plugs the store into a `dbscope_core::ScopeFactory`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod entity;
mod error;
mod provider;
mod session;
mod stats;
mod store;
mod transaction;

pub use config::MemoryConfig;
pub use entity::{Entity, EntityId};
pub use error::{MemoryError, MemoryResult};
pub use provider::{DefaultStore, MemoryProvider};
pub use session::MemorySession;
pub use stats::{StatsSnapshot, StoreStats};
pub use store::MemoryStore;
pub use transaction::{MemoryTransaction, TransactionState};
