//! Memory store configuration.

use dbscope_core::IsolationLevel;
use std::path::PathBuf;

/// Configuration for a [`MemoryStore`](crate::MemoryStore).
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Snapshot file loaded on open and written by `persist`.
    pub snapshot_path: Option<PathBuf>,

    /// Whether every applied commit rewrites the snapshot file.
    pub persist_on_commit: bool,

    /// Isolation level recorded when a transaction asks for the default.
    pub default_isolation: IsolationLevel,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            persist_on_commit: false,
            default_isolation: IsolationLevel::ReadCommitted,
        }
    }
}

impl MemoryConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the snapshot file.
    #[must_use]
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Sets whether commits rewrite the snapshot file.
    #[must_use]
    pub fn persist_on_commit(mut self, value: bool) -> Self {
        self.persist_on_commit = value;
        self
    }

    /// Sets the default isolation level.
    #[must_use]
    pub fn default_isolation(mut self, level: IsolationLevel) -> Self {
        self.default_isolation = level;
        self
    }
}
