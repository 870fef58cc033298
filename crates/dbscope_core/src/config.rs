//! Scope factory configuration.

use crate::types::JoinOption;

/// When a resource collection begins explicit transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionPolicy {
    /// Only handles opened under an explicit isolation level get a
    /// transaction. Other handles are finalized by flushing.
    #[default]
    ExplicitOnly,
    /// Every handle gets a transaction as soon as it is opened, using the
    /// provider's default isolation level when none was requested.
    Always,
}

/// Configuration for a [`ScopeFactory`](crate::ScopeFactory).
#[derive(Debug, Clone)]
pub struct ScopeConfig {
    /// Join option used by `create_default`.
    pub default_join: JoinOption,

    /// Transaction policy applied to every new resource collection.
    pub transaction_policy: TransactionPolicy,

    /// Whether misuse diagnostics capture a backtrace.
    pub capture_backtraces: bool,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            default_join: JoinOption::JoinExisting,
            transaction_policy: TransactionPolicy::ExplicitOnly,
            capture_backtraces: true,
        }
    }
}

impl ScopeConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the join option used by `create_default`.
    #[must_use]
    pub const fn default_join(mut self, join: JoinOption) -> Self {
        self.default_join = join;
        self
    }

    /// Sets the transaction policy.
    #[must_use]
    pub const fn transaction_policy(mut self, policy: TransactionPolicy) -> Self {
        self.transaction_policy = policy;
        self
    }

    /// Sets whether misuse diagnostics capture a backtrace.
    #[must_use]
    pub const fn capture_backtraces(mut self, value: bool) -> Self {
        self.capture_backtraces = value;
        self
    }
}
