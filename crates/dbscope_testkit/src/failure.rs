//! Failure injection.

use crate::recording::Operation;
use std::collections::HashSet;
use thiserror::Error;

/// Error returned by a provider operation that was told to fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("injected {operation} failure on handle {handle}")]
pub struct InjectedFailure {
    /// The operation that failed.
    pub operation: Operation,
    /// The handle it failed on. `0` for `Open`, which has no handle yet.
    pub handle: usize,
}

/// Which provider operations fail.
///
/// A rule either targets one handle number or every handle of the provider.
#[derive(Debug, Clone, Default)]
pub struct FailurePlan {
    rules: HashSet<(Operation, Option<usize>)>,
}

impl FailurePlan {
    /// Creates a plan where nothing fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails `operation` on every handle.
    #[must_use]
    pub fn fail(mut self, operation: Operation) -> Self {
        self.rules.insert((operation, None));
        self
    }

    /// Fails `operation` on handle number `handle` only.
    #[must_use]
    pub fn fail_on(mut self, operation: Operation, handle: usize) -> Self {
        self.rules.insert((operation, Some(handle)));
        self
    }

    /// Returns true if the plan has no rule.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns true if `operation` on `handle` should fail.
    #[must_use]
    pub fn should_fail(&self, operation: Operation, handle: usize) -> bool {
        self.rules.contains(&(operation, None)) || self.rules.contains(&(operation, Some(handle)))
    }

    /// Returns `Err` if `operation` on `handle` should fail.
    pub fn check(&self, operation: Operation, handle: usize) -> Result<(), InjectedFailure> {
        if self.should_fail(operation, handle) {
            Err(InjectedFailure { operation, handle })
        } else {
            Ok(())
        }
    }
}
