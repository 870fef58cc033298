//! Property-based test generators using proptest.

use crate::fixtures::Person;
use dbscope_core::{IsolationLevel, JoinOption};
use proptest::prelude::*;

/// Strategy for generating join options.
pub fn join_option_strategy() -> impl Strategy<Value = JoinOption> {
    prop_oneof![Just(JoinOption::JoinExisting), Just(JoinOption::ForceCreateNew)]
}

/// Strategy for generating isolation levels.
pub fn isolation_level_strategy() -> impl Strategy<Value = IsolationLevel> {
    prop_oneof![
        Just(IsolationLevel::ReadUncommitted),
        Just(IsolationLevel::ReadCommitted),
        Just(IsolationLevel::RepeatableRead),
        Just(IsolationLevel::Snapshot),
        Just(IsolationLevel::Serializable),
    ]
}

/// One level of a generated scope stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeStep {
    /// Join option of the scope.
    pub join: JoinOption,
    /// Whether the scope calls `save` before disposal.
    pub save: bool,
}

/// Strategy for generating a stack of nested scopes.
pub fn scope_stack_strategy(max_depth: usize) -> impl Strategy<Value = Vec<ScopeStep>> {
    prop::collection::vec(
        (join_option_strategy(), any::<bool>()).prop_map(|(join, save)| ScopeStep { join, save }),
        1..=max_depth.max(1),
    )
}

/// Strategy for generating which of `handles` handles fail.
pub fn failure_mask_strategy(handles: usize) -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), handles)
}

/// Strategy for generating people.
pub fn person_strategy() -> impl Strategy<Value = Person> {
    (
        prop::string::string_regex("[A-Z][a-z]{1,11}").expect("Invalid regex"),
        0u32..120,
    )
        .prop_map(|(name, age)| Person::new(name, age))
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
