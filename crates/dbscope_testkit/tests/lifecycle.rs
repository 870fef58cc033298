//! Scope lifecycle tests: creation, nesting, and disposal.

use dbscope_core::ambient;
use dbscope_core::{
    FlushMode, IsolationLevel, JoinOption, ResourceHandle, ScopeConfig, ScopeError, ScopeOptions,
};
use dbscope_testkit::prelude::*;
use std::sync::Arc;

#[test]
fn scope_becomes_ambient_and_restores_nothing() {
    let fixture = RecordingFixture::new();
    assert!(!ambient::has_ambient_scope());

    let scope = fixture.factory.create(JoinOption::JoinExisting).unwrap();
    assert_eq!(ambient::current_id(), Some(scope.id()));
    assert!(!scope.is_nested());
    assert_eq!(scope.parent(), None);

    scope.dispose().unwrap();
    assert!(!ambient::has_ambient_scope());
}

#[test]
fn handle_opened_lazily_once() {
    let fixture = RecordingFixture::new();
    let scope = fixture.factory.create(JoinOption::JoinExisting).unwrap();
    assert_eq!(fixture.primary.handles_opened(), 0);

    let first = scope.get::<RecordingProvider<Primary>>().unwrap();
    let second = scope.get::<RecordingProvider<Primary>>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(fixture.primary.handles_opened(), 1);

    scope.dispose().unwrap();
    assert_eq!(fixture.primary.count(Operation::Close), 1);
}

#[test]
fn joined_scope_shares_handles_and_restores_parent() {
    let fixture = RecordingFixture::new();
    let outer = fixture.factory.create(JoinOption::JoinExisting).unwrap();
    let outer_handle = outer.get::<RecordingProvider<Primary>>().unwrap();

    let inner = fixture.factory.create(JoinOption::JoinExisting).unwrap();
    assert!(inner.is_nested());
    assert_eq!(inner.parent(), Some(outer.id()));
    let inner_handle = inner.get::<RecordingProvider<Primary>>().unwrap();
    assert!(Arc::ptr_eq(&outer_handle, &inner_handle));

    inner.dispose().unwrap();
    assert_eq!(ambient::current_id(), Some(outer.id()));
    // The joined scope closes nothing.
    assert_eq!(fixture.primary.count(Operation::Close), 0);

    outer.dispose().unwrap();
    assert_eq!(fixture.primary.count(Operation::Close), 1);
    assert!(!ambient::has_ambient_scope());
}

#[test]
fn force_create_new_opens_separate_handles() {
    let fixture = RecordingFixture::new();
    let outer = fixture.factory.create(JoinOption::JoinExisting).unwrap();
    let outer_handle = outer.get::<RecordingProvider<Primary>>().unwrap();

    let inner = fixture.factory.create(JoinOption::ForceCreateNew).unwrap();
    assert!(!inner.is_nested());
    assert_eq!(inner.parent(), Some(outer.id()));
    let inner_handle = inner.get::<RecordingProvider<Primary>>().unwrap();
    assert!(!Arc::ptr_eq(&outer_handle, &inner_handle));
    assert_eq!(inner_handle.lock().number(), 2);

    inner.dispose().unwrap();
    assert_eq!(fixture.primary.count_for(2, Operation::Close), 1);
    assert_eq!(fixture.primary.count_for(1, Operation::Close), 0);
    assert_eq!(ambient::current_id(), Some(outer.id()));

    outer.dispose().unwrap();
}

#[test]
fn isolation_level_requires_force_create_new() {
    let fixture = RecordingFixture::new();
    let err = fixture
        .factory
        .create_with_options(
            ScopeOptions::new()
                .join(JoinOption::JoinExisting)
                .isolation_level(IsolationLevel::Serializable),
        )
        .unwrap_err();
    assert!(matches!(err, ScopeError::InvalidArgument { .. }));
    assert!(!ambient::has_ambient_scope());
}

#[test]
fn isolation_level_begins_transaction_on_open() {
    let fixture = RecordingFixture::new();
    let scope = fixture
        .factory
        .create_with_isolation_level(IsolationLevel::RepeatableRead)
        .unwrap();
    scope.get::<RecordingProvider<Primary>>().unwrap();

    assert!(fixture.primary.events().contains(&Event::Begin {
        handle: 1,
        isolation_level: Some(IsolationLevel::RepeatableRead),
    }));
    scope.dispose().unwrap();
}

#[test]
fn read_write_inside_read_only_is_rejected() {
    let fixture = RecordingFixture::new();
    let outer = fixture
        .factory
        .create_read_only(JoinOption::JoinExisting)
        .unwrap();

    let err = fixture.factory.create(JoinOption::JoinExisting).unwrap_err();
    assert!(matches!(err, ScopeError::InvalidOperation { .. }));
    assert_eq!(ambient::current_id(), Some(outer.id()));

    // A separate unit of work is fine.
    let inner = fixture.factory.create(JoinOption::ForceCreateNew).unwrap();
    inner.dispose().unwrap();
    outer.dispose().unwrap();
}

#[test]
fn read_only_handles_never_flush() {
    let fixture = RecordingFixture::new();
    let scope = fixture
        .factory
        .create_read_only(JoinOption::JoinExisting)
        .unwrap();
    let handle = scope.get::<RecordingProvider<Primary>>().unwrap();
    assert_eq!(handle.lock().flush_mode(), FlushMode::Never);

    let nested = fixture
        .factory
        .create_read_only(JoinOption::JoinExisting)
        .unwrap();
    assert!(nested.is_nested());
    nested.dispose().unwrap();
    scope.dispose().unwrap();

    assert_eq!(fixture.primary.count(Operation::Flush), 0);
    assert_eq!(fixture.primary.count(Operation::Rollback), 0);
}

#[test]
fn read_only_with_isolation_commits_on_disposal() {
    let fixture = RecordingFixture::new();
    let scope = fixture
        .factory
        .create_read_only_with_isolation_level(IsolationLevel::ReadUncommitted)
        .unwrap();
    scope.get::<RecordingProvider<Primary>>().unwrap();
    scope.dispose().unwrap();

    assert_eq!(
        fixture.primary.operations(),
        vec![
            Operation::Open,
            Operation::SetFlushMode,
            Operation::Begin,
            Operation::Commit,
            Operation::CloseTransaction,
            Operation::Close,
        ]
    );
}

#[test]
fn out_of_order_disposal_is_an_error() {
    let fixture = RecordingFixture::new();
    let outer = fixture.factory.create(JoinOption::JoinExisting).unwrap();
    let inner = fixture.factory.create(JoinOption::ForceCreateNew).unwrap();
    let inner_id = inner.id();

    let err = outer.dispose().unwrap_err();
    assert!(err.is_programming_error());
    assert!(err.to_string().contains("disposed out of order"));
    assert!(matches!(
        err,
        ScopeError::DisposalOrder { ambient: Some(id), .. } if id == inner_id
    ));

    // The parent is gone, so the inner scope restores nothing.
    inner.dispose().unwrap();
    assert!(!ambient::has_ambient_scope());
}

#[test]
#[should_panic(expected = "disposed out of order")]
fn dropping_out_of_order_panics() {
    let fixture = RecordingFixture::new();
    let outer = fixture.factory.create(JoinOption::JoinExisting).unwrap();
    let inner = fixture.factory.create(JoinOption::JoinExisting).unwrap();
    drop(outer);
    drop(inner);
}

#[test]
fn disposal_closes_handles_held_elsewhere() {
    let fixture = RecordingFixture::new();
    let outer = fixture.factory.create(JoinOption::JoinExisting).unwrap();
    let handle = outer.get::<RecordingProvider<Primary>>().unwrap();
    outer.dispose().unwrap();

    assert!(!handle.lock().is_open());
}

#[test]
fn default_join_follows_config() {
    let fixture = RecordingFixture::with_config(
        ScopeConfig::new().default_join(JoinOption::ForceCreateNew),
    );
    let outer = fixture.factory.create_default().unwrap();
    let inner = fixture.factory.create_default().unwrap();
    assert!(!inner.is_nested());
    inner.dispose().unwrap();
    outer.dispose().unwrap();
}
