//! Error types for the memory engine.

use std::io;
use thiserror::Error;

/// Result type for memory engine operations.
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Errors that can occur in the memory engine.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The session has been closed.
    #[error("session {session} is closed")]
    SessionClosed {
        /// The closed session.
        session: u64,
    },

    /// The transaction already committed or rolled back.
    #[error("transaction {transaction} is not active")]
    TransactionNotActive {
        /// The finished transaction.
        transaction: u64,
    },

    /// A transaction is already running on the session.
    #[error("session {session} already has an active transaction")]
    TransactionAlreadyActive {
        /// The session.
        session: u64,
    },

    /// A write was attempted on a session that never flushes.
    #[error("session {session} is read-only")]
    ReadOnlySession {
        /// The read-only session.
        session: u64,
    },

    /// CBOR encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A snapshot file has an unexpected format.
    #[error("invalid snapshot: {message}")]
    SnapshotFormat {
        /// Description of the format issue.
        message: String,
    },
}

impl MemoryError {
    /// Creates a codec error.
    pub fn codec(err: impl std::fmt::Display) -> Self {
        Self::Codec(err.to_string())
    }

    /// Creates a snapshot format error.
    pub fn snapshot_format(message: impl Into<String>) -> Self {
        Self::SnapshotFormat {
            message: message.into(),
        }
    }
}
