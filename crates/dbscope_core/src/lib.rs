//! # dbscope Core
//!
//! Ambient database-session scopes.
//!
//! This crate provides:
//! - Scopes that share resource handles down a call chain without passing them
//! - Join semantics: nested scopes reuse the ambient scope's handles and the
//!   outermost scope commits
//! - Best-effort commit and rollback across every handle of a scope
//! - A flow-local ambient store backed by a generational scope arena
//! - Suppression of the ambient scope around parallel fan-outs
//!
//! The persistence engine is plugged in through the traits of [`provider`].
//!
//! ```rust,ignore
//! use dbscope_core::{JoinOption, ProviderRegistry, ScopeFactory};
//!
//! let factory = ScopeFactory::new(ProviderRegistry::new().with(provider));
//!
//! let mut scope = factory.create(JoinOption::JoinExisting)?;
//! create_user(&factory, &spec)?; // joins `scope`
//! scope.save()?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod ambient;
mod collection;
mod config;
mod error;
mod locator;
pub mod provider;
mod scope;
mod types;

#[cfg(test)]
mod test_support;

pub use collection::{DisposalReport, ResourceCollection};
pub use config::{ScopeConfig, TransactionPolicy};
pub use error::{BoxError, FinalizeOperation, ProviderResult, ScopeError, ScopeResult};
pub use locator::{AmbientLocator, SessionLocator};
pub use provider::{
    ProviderId, ProviderRegistry, ResourceHandle, ResourceProvider, ResourceTransaction,
    SharedHandle,
};
pub use scope::{ReadOnlyScope, Scope, ScopeFactory, ScopeOptions, Suppressor};
pub use types::{FlushMode, IsolationLevel, JoinOption, ScopeId};
