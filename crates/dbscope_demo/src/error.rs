//! Error types for the demo.

use dbscope_core::ScopeError;
use dbscope_memory::{EntityId, MemoryError};
use thiserror::Error;

/// Result type for demo operations.
pub type DemoResult<T> = Result<T, DemoError>;

/// Errors that can occur in the demo.
#[derive(Debug, Error)]
pub enum DemoError {
    /// Scope misuse or a provider failure surfaced by a scope.
    #[error(transparent)]
    Scope(#[from] ScopeError),

    /// The memory engine failed.
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// No user has the requested ID.
    #[error("invalid value provided for user id [{id}]: couldn't find a user with this id")]
    UserNotFound {
        /// The requested ID.
        id: EntityId,
    },

    /// A user creation request is malformed.
    #[error("invalid user creation request: {message}")]
    InvalidSpec {
        /// What is wrong with the request.
        message: String,
    },

    /// Failure raised on purpose to demonstrate atomicity.
    #[error("intentional failure while creating user {name}: none of the users in this batch should be persisted")]
    IntentionalFailure {
        /// Name of the user whose creation failed.
        name: String,
    },

    /// A worker thread or task did not finish.
    #[error("credit score worker failed: {message}")]
    Worker {
        /// Description of the failure.
        message: String,
    },

    /// JSON output failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl DemoError {
    /// Creates an invalid spec error.
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            message: message.into(),
        }
    }

    /// Creates a worker error.
    pub fn worker(message: impl Into<String>) -> Self {
        Self::Worker {
            message: message.into(),
        }
    }
}
