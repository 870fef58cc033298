//! Error types for dbscope core.

use crate::types::ScopeId;
use std::fmt;
use thiserror::Error;

/// Boxed error produced by a persistence provider.
///
/// Provider failures are never interpreted by the core. They travel as the
/// `source` of [`ScopeError::Provider`] or [`ScopeError::Finalize`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, BoxError>;

/// Result type for scope operations.
pub type ScopeResult<T> = Result<T, ScopeError>;

/// The finalization step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOperation {
    /// Flushing handles and committing explicit transactions.
    Commit,
    /// Rolling back explicit transactions.
    Rollback,
}

impl fmt::Display for FinalizeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinalizeOperation::Commit => write!(f, "commit"),
            FinalizeOperation::Rollback => write!(f, "rollback"),
        }
    }
}

/// Errors that can occur in scope operations.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// Illegal combination of options.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the illegal combination.
        message: String,
    },

    /// A single-use invariant was violated.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// Operation attempted on a disposed object.
    #[error("{object} has been disposed")]
    ObjectDisposed {
        /// The kind of object that was disposed.
        object: &'static str,
    },

    /// Scopes were disposed out of creation order.
    #[error(
        "scope {scope} disposed out of order (ambient scope is {}): scopes must be disposed in the reverse order of their creation",
        ambient.map_or_else(|| "none".to_string(), |id| id.to_string())
    )]
    DisposalOrder {
        /// The scope being disposed.
        scope: ScopeId,
        /// The scope that was ambient at the time.
        ambient: Option<ScopeId>,
    },

    /// A handle was requested for a provider the factory was not configured with.
    #[error("no provider of type {provider} is registered with this scope factory")]
    ProviderNotRegistered {
        /// Provider type name.
        provider: &'static str,
    },

    /// An ambient handle was required outside of any scope.
    #[error(
        "no ambient handle for provider {provider}: this code ran outside of a scope. \
         Create a scope with ScopeFactory in the top-level service method that wraps the \
         business transaction, and access repositories from within that scope"
    )]
    NoAmbientScope {
        /// Provider type name.
        provider: &'static str,
    },

    /// A provider failed while opening a handle or beginning a transaction.
    #[error("provider {provider} failed")]
    Provider {
        /// Provider type name.
        provider: &'static str,
        /// The provider's error.
        #[source]
        source: BoxError,
    },

    /// At least one handle failed to finalize.
    ///
    /// Carries the first failure. The remaining handles were still
    /// finalized.
    #[error("{operation} failed for provider {provider} ({failed} of {attempted} handles failed)")]
    Finalize {
        /// Which finalization step failed.
        operation: FinalizeOperation,
        /// Provider type name of the first failing handle.
        provider: &'static str,
        /// Number of handles that failed.
        failed: usize,
        /// Number of handles that were finalized.
        attempted: usize,
        /// The first provider error.
        #[source]
        source: BoxError,
    },
}

impl ScopeError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an object disposed error.
    pub fn object_disposed(object: &'static str) -> Self {
        Self::ObjectDisposed { object }
    }

    /// Creates a provider error.
    pub fn provider(provider: &'static str, source: BoxError) -> Self {
        Self::Provider { provider, source }
    }

    /// Returns true if this error signals misuse of the scope API rather
    /// than a failure of the underlying persistence engine.
    pub fn is_programming_error(&self) -> bool {
        !matches!(self, ScopeError::Provider { .. } | ScopeError::Finalize { .. })
    }
}
