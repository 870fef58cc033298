//! Core type definitions for dbscope.

use std::fmt;

/// Opaque, process-unique token identifying a scope.
///
/// A token addresses a slot in the scope arena. Once the scope is released
/// the slot generation advances, so an old token never resolves to a newer
/// scope that happens to reuse the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId {
    index: u32,
    generation: u32,
}

impl ScopeId {
    /// Creates a scope token from its raw parts.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the arena slot index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Returns the slot generation.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope:{}.{}", self.index, self.generation)
    }
}

/// How a new scope relates to an ambient scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JoinOption {
    /// Join the ambient scope if there is one, sharing its handles.
    #[default]
    JoinExisting,
    /// Ignore any ambient scope and open independent handles.
    ForceCreateNew,
}

/// Database transaction isolation level.
///
/// Passed through to the provider untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    /// Dirty reads allowed.
    ReadUncommitted,
    /// Only committed data is visible.
    ReadCommitted,
    /// Rows read stay stable for the transaction.
    RepeatableRead,
    /// Reads see a consistent snapshot.
    Snapshot,
    /// Full serializability.
    Serializable,
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IsolationLevel::ReadUncommitted => "read uncommitted",
            IsolationLevel::ReadCommitted => "read committed",
            IsolationLevel::RepeatableRead => "repeatable read",
            IsolationLevel::Snapshot => "snapshot",
            IsolationLevel::Serializable => "serializable",
        };
        f.write_str(name)
    }
}

/// When a handle writes its pending changes to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlushMode {
    /// Flush on request and at commit.
    #[default]
    Auto,
    /// Never flush. Used for read-only handles.
    Never,
}
