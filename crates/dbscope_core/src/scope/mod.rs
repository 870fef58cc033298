//! Scopes.
//!
//! A [`Scope`] is the unit a business operation opens at its top level. It
//! becomes the ambient scope of the current flow until it is disposed.
//! Scopes created further down the call chain with
//! [`JoinOption::JoinExisting`] join it and share its handles. Only the
//! outermost scope finalizes them.
//!
//! Scopes must be disposed in reverse order of creation. Disposing them out
//! of order returns [`ScopeError::DisposalOrder`] from
//! [`Scope::dispose`], and panics when it happens in `Drop`.

pub(crate) mod factory;
pub(crate) mod suppressor;

pub use factory::ScopeFactory;
pub use suppressor::Suppressor;

use crate::ambient;
use crate::collection::ResourceCollection;
use crate::config::ScopeConfig;
use crate::error::{ScopeError, ScopeResult};
use crate::provider::{ProviderRegistry, ResourceProvider, SharedHandle};
use crate::types::{IsolationLevel, JoinOption, ScopeId};
use parking_lot::Mutex;
use std::backtrace::Backtrace;
use std::sync::Arc;
use tracing::{debug, error};

/// Options for creating a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScopeOptions {
    /// Join option.
    pub join: JoinOption,
    /// Whether the scope is read-only.
    pub read_only: bool,
    /// Explicit isolation level. Requires `JoinOption::ForceCreateNew`.
    pub isolation_level: Option<IsolationLevel>,
}

impl ScopeOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the join option.
    #[must_use]
    pub const fn join(mut self, join: JoinOption) -> Self {
        self.join = join;
        self
    }

    /// Sets whether the scope is read-only.
    #[must_use]
    pub const fn read_only(mut self, value: bool) -> Self {
        self.read_only = value;
        self
    }

    /// Requests an explicit transaction with the given isolation level.
    #[must_use]
    pub const fn isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = Some(level);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeState {
    Active,
    Completed,
    Disposed,
}

/// Arena-owned part of a scope.
pub(crate) struct ScopeInner {
    read_only: bool,
    nested: bool,
    parent: Option<ScopeId>,
    collection: Arc<Mutex<ResourceCollection>>,
    state: Mutex<ScopeState>,
}

impl ScopeInner {
    pub(crate) fn get<P: ResourceProvider>(&self) -> ScopeResult<SharedHandle<P::Handle>> {
        self.collection.lock().get::<P>()
    }
}

/// An ambient unit of work.
///
/// Dropping a scope disposes it. A read-write scope that was not saved
/// rolls back.
pub struct Scope {
    id: ScopeId,
    inner: Arc<ScopeInner>,
    capture_backtraces: bool,
    released: bool,
}

impl Scope {
    pub(crate) fn create(
        registry: &Arc<ProviderRegistry>,
        config: &ScopeConfig,
        options: ScopeOptions,
    ) -> ScopeResult<Self> {
        if options.isolation_level.is_some() && options.join == JoinOption::JoinExisting {
            return Err(ScopeError::invalid_argument(
                "cannot join an ambient scope when an explicit transaction is required; \
                 scopes with an isolation level must use JoinOption::ForceCreateNew",
            ));
        }

        if ambient::requires_flow() {
            return Err(ScopeError::invalid_operation(
                "cannot create a scope on a tokio runtime thread outside an ambient flow; \
                 run the work inside ambient::flow(..) or, for blocking code, \
                 ambient::flow_sync(..)",
            ));
        }

        let parent = ambient::current();
        let joined = match (&parent, options.join) {
            (Some((_, parent)), JoinOption::JoinExisting) => {
                if parent.read_only && !options.read_only {
                    return Err(ScopeError::invalid_operation(
                        "cannot nest a read-write scope within a read-only scope",
                    ));
                }
                Some(Arc::clone(&parent.collection))
            }
            _ => None,
        };

        let nested = joined.is_some();
        let collection = joined.unwrap_or_else(|| {
            Arc::new(Mutex::new(ResourceCollection::new(
                Arc::clone(registry),
                options.read_only,
                options.isolation_level,
                config.transaction_policy,
            )))
        });

        let parent_id = parent.map(|(id, _)| id);
        let inner = Arc::new(ScopeInner {
            read_only: options.read_only,
            nested,
            parent: parent_id,
            collection,
            state: Mutex::new(ScopeState::Active),
        });
        let id = ambient::scopes().insert(Arc::clone(&inner));
        ambient::set_current(Some(id));

        debug!(
            scope = %id,
            nested,
            read_only = options.read_only,
            isolation = ?options.isolation_level,
            parent = ?parent_id,
            "created scope"
        );

        Ok(Self {
            id,
            inner,
            capture_backtraces: config.capture_backtraces,
            released: false,
        })
    }

    /// Returns the handle of provider `P`, opening it on first request.
    ///
    /// Joined scopes return the same handle as the scope they joined.
    pub fn get<P: ResourceProvider>(&self) -> ScopeResult<SharedHandle<P::Handle>> {
        self.inner.get::<P>()
    }

    /// Commits the scope's work.
    ///
    /// A joined scope only marks itself completed. The outermost scope
    /// commits every handle. Can be called once.
    pub fn save(&mut self) -> ScopeResult<()> {
        let mut state = self.inner.state.lock();
        match *state {
            ScopeState::Completed => {
                return Err(ScopeError::invalid_operation(
                    "save() has already been called on this scope; a scope can only be saved once",
                ))
            }
            ScopeState::Disposed => return Err(ScopeError::object_disposed("Scope")),
            ScopeState::Active => {}
        }
        *state = ScopeState::Completed;
        drop(state);

        if self.inner.nested {
            debug!(scope = %self.id, "nested scope completed; outer scope will commit");
            return Ok(());
        }
        let result = self.inner.collection.lock().commit();
        debug!(scope = %self.id, ok = result.is_ok(), "saved scope");
        result
    }

    /// Returns the scope token.
    #[must_use]
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Returns true if this scope joined an ambient scope.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.inner.nested
    }

    /// Returns true if this scope is read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.inner.read_only
    }

    /// Returns true once `save` has been called.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        *self.inner.state.lock() == ScopeState::Completed
    }

    /// Returns the token of the scope that was ambient at creation.
    #[must_use]
    pub fn parent(&self) -> Option<ScopeId> {
        self.inner.parent
    }

    /// Disposes the scope.
    ///
    /// Fails with [`ScopeError::DisposalOrder`] when this scope is not the
    /// ambient one. The scope's resources are released either way.
    pub fn dispose(mut self) -> ScopeResult<()> {
        self.release()
    }

    fn release(&mut self) -> ScopeResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        if !self.inner.nested {
            self.inner.collection.lock().dispose();
        }

        let ambient = ambient::current_id();
        if ambient != Some(self.id) {
            self.mark_disposed();
            return Err(ScopeError::DisposalOrder {
                scope: self.id,
                ambient,
            });
        }

        ambient::set_current(None);
        self.mark_disposed();

        if let Some(parent) = self.inner.parent {
            if ambient::scopes().contains(parent) {
                ambient::set_current(Some(parent));
            } else {
                self.report_parent_disposed(parent);
            }
        }

        debug!(scope = %self.id, restored = ?ambient::current_id(), "disposed scope");
        Ok(())
    }

    fn mark_disposed(&self) {
        *self.inner.state.lock() = ScopeState::Disposed;
        ambient::scopes().remove(self.id);
    }

    fn report_parent_disposed(&self, parent: ScopeId) {
        let backtrace = if self.capture_backtraces {
            Backtrace::force_capture().to_string()
        } else {
            String::from("<backtrace capture disabled>")
        };
        error!(
            scope = %self.id,
            %parent,
            "programming error: the parent of scope {} was disposed before it. \
             This happens when a scope runs in a parallel flow that inherited the \
             ambient scope, and the parent finished first. Call \
             ScopeFactory::suppress_ambient_scope() before starting parallel work \
             inside a scope. The parent will not be restored as ambient scope.\n{}",
            self.id,
            backtrace
        );
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            if std::thread::panicking() {
                error!(scope = %self.id, error = %err, "scope disposed out of order while unwinding");
            } else {
                panic!("{err}");
            }
        }
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("nested", &self.inner.nested)
            .field("read_only", &self.inner.read_only)
            .field("parent", &self.inner.parent)
            .finish()
    }
}

/// A scope that never writes.
///
/// Handles are opened with flushing disabled. The scope commits on disposal,
/// so explicit transactions close cleanly. There is no `save`.
#[derive(Debug)]
pub struct ReadOnlyScope {
    scope: Scope,
}

impl ReadOnlyScope {
    pub(crate) fn new(scope: Scope) -> Self {
        Self { scope }
    }

    /// Returns the handle of provider `P`, opening it on first request.
    pub fn get<P: ResourceProvider>(&self) -> ScopeResult<SharedHandle<P::Handle>> {
        self.scope.get::<P>()
    }

    /// Returns the scope token.
    #[must_use]
    pub fn id(&self) -> ScopeId {
        self.scope.id()
    }

    /// Returns true if this scope joined an ambient scope.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.scope.is_nested()
    }

    /// Returns the token of the scope that was ambient at creation.
    #[must_use]
    pub fn parent(&self) -> Option<ScopeId> {
        self.scope.parent()
    }

    /// Disposes the scope. See [`Scope::dispose`].
    pub fn dispose(self) -> ScopeResult<()> {
        self.scope.dispose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ResourceHandle;
    use crate::test_support::{MockProvider, Primary};

    fn factory() -> (ScopeFactory, crate::test_support::Journal) {
        let provider = MockProvider::<Primary>::new();
        let journal = provider.journal();
        (
            ScopeFactory::new(ProviderRegistry::new().with(provider)),
            journal,
        )
    }

    #[test]
    fn scope_becomes_ambient_and_restores_none() {
        let (factory, _) = factory();
        let scope = factory.create(JoinOption::JoinExisting).unwrap();
        assert_eq!(ambient::current_id(), Some(scope.id()));
        assert!(!scope.is_nested());
        assert!(scope.parent().is_none());

        scope.dispose().unwrap();
        assert_eq!(ambient::current_id(), None);
    }

    #[test]
    fn joined_scope_shares_handle() {
        let (factory, journal) = factory();
        let outer = factory.create(JoinOption::JoinExisting).unwrap();
        let inner = factory.create(JoinOption::JoinExisting).unwrap();

        assert!(inner.is_nested());
        assert_eq!(inner.parent(), Some(outer.id()));
        let a = outer.get::<MockProvider<Primary>>().unwrap();
        let b = inner.get::<MockProvider<Primary>>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(journal.count("open"), 1);

        inner.dispose().unwrap();
        assert_eq!(ambient::current_id(), Some(outer.id()));
        outer.dispose().unwrap();
    }

    #[test]
    fn force_create_new_opens_independent_handle() {
        let (factory, journal) = factory();
        let outer = factory.create(JoinOption::JoinExisting).unwrap();
        let inner = factory.create(JoinOption::ForceCreateNew).unwrap();

        assert!(!inner.is_nested());
        assert_eq!(inner.parent(), Some(outer.id()));
        let a = outer.get::<MockProvider<Primary>>().unwrap();
        let b = inner.get::<MockProvider<Primary>>().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(journal.count("open"), 2);

        inner.dispose().unwrap();
        outer.dispose().unwrap();
    }

    #[test]
    fn nested_dispose_leaves_resources_open() {
        let (factory, journal) = factory();
        let outer = factory.create(JoinOption::JoinExisting).unwrap();
        let inner = factory.create(JoinOption::JoinExisting).unwrap();
        let handle = inner.get::<MockProvider<Primary>>().unwrap();

        inner.dispose().unwrap();
        assert!(handle.lock().is_open());
        assert_eq!(journal.count("close"), 0);

        outer.dispose().unwrap();
        assert_eq!(journal.count("close"), 1);
    }

    #[test]
    fn isolation_with_join_is_invalid_argument() {
        let (factory, _) = factory();
        let result = factory.create_with_options(
            ScopeOptions::new()
                .join(JoinOption::JoinExisting)
                .isolation_level(IsolationLevel::Serializable),
        );
        assert!(matches!(result, Err(ScopeError::InvalidArgument { .. })));
        assert_eq!(ambient::current_id(), None);
    }

    #[test]
    fn read_write_inside_read_only_is_invalid_operation() {
        let (factory, _) = factory();
        let outer = factory.create_read_only(JoinOption::JoinExisting).unwrap();
        let result = factory.create(JoinOption::JoinExisting);
        assert!(matches!(result, Err(ScopeError::InvalidOperation { .. })));
        assert_eq!(ambient::current_id(), Some(outer.id()));

        let reader = factory.create_read_only(JoinOption::JoinExisting).unwrap();
        assert!(reader.is_nested());
        reader.dispose().unwrap();
        outer.dispose().unwrap();
    }

    #[test]
    fn read_write_inside_read_only_with_force_create_new_is_allowed() {
        let (factory, _) = factory();
        let outer = factory.create_read_only(JoinOption::JoinExisting).unwrap();
        let inner = factory.create(JoinOption::ForceCreateNew).unwrap();
        inner.dispose().unwrap();
        outer.dispose().unwrap();
    }

    #[test]
    fn save_commits_once() {
        let (factory, journal) = factory();
        let mut scope = factory.create(JoinOption::JoinExisting).unwrap();
        scope.get::<MockProvider<Primary>>().unwrap();

        scope.save().unwrap();
        assert!(scope.is_completed());
        assert_eq!(journal.count("flush"), 1);
        assert!(matches!(
            scope.save(),
            Err(ScopeError::InvalidOperation { .. })
        ));
        scope.dispose().unwrap();
    }

    #[test]
    fn nested_save_defers_to_outer() {
        let (factory, journal) = factory();
        let mut outer = factory.create(JoinOption::JoinExisting).unwrap();
        let mut inner = factory.create(JoinOption::JoinExisting).unwrap();
        inner.get::<MockProvider<Primary>>().unwrap();

        inner.save().unwrap();
        assert!(inner.is_completed());
        assert_eq!(journal.count("flush"), 0);
        assert!(inner.save().is_err());
        inner.dispose().unwrap();

        outer.save().unwrap();
        assert_eq!(journal.count("flush"), 1);
        outer.dispose().unwrap();
    }

    #[test]
    fn dispose_without_save_rolls_back() {
        let provider = MockProvider::<Primary>::new();
        let journal = provider.journal();
        let factory = ScopeFactory::new(ProviderRegistry::new().with(provider));

        let scope = factory
            .create_with_isolation_level(IsolationLevel::ReadCommitted)
            .unwrap();
        scope.get::<MockProvider<Primary>>().unwrap();
        drop(scope);

        assert_eq!(journal.count("flush"), 0);
        assert_eq!(journal.count("commit"), 0);
        assert_eq!(journal.count("rollback"), 1);
        assert_eq!(ambient::current_id(), None);
    }

    #[test]
    fn out_of_order_dispose_is_reported() {
        let (factory, _) = factory();
        let outer = factory.create(JoinOption::JoinExisting).unwrap();
        let inner = factory.create(JoinOption::JoinExisting).unwrap();
        let outer_id = outer.id();
        let inner_id = inner.id();

        let err = outer.dispose().unwrap_err();
        match err {
            ScopeError::DisposalOrder { scope, ambient } => {
                assert_eq!(scope, outer_id);
                assert_eq!(ambient, Some(inner_id));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!ambient::scopes().contains(outer_id));

        // The parent is gone, so nothing is restored.
        inner.dispose().unwrap();
        assert_eq!(ambient::current_id(), None);
    }

    #[test]
    #[should_panic(expected = "disposed out of order")]
    fn out_of_order_drop_panics() {
        let (factory, _) = factory();
        let outer = factory.create(JoinOption::JoinExisting).unwrap();
        let _inner = factory.create(JoinOption::JoinExisting).unwrap();
        drop(outer);
    }

    #[test]
    fn read_only_scope_commits_on_dispose() {
        let (factory, journal) = factory();
        let scope = factory
            .create_read_only_with_isolation_level(IsolationLevel::Snapshot)
            .unwrap();
        scope.get::<MockProvider<Primary>>().unwrap();
        scope.dispose().unwrap();

        assert_eq!(journal.count("flush"), 0);
        assert_eq!(journal.count("commit"), 1);
        assert_eq!(journal.count("close"), 1);
    }

    #[test]
    fn released_scope_leaves_arena() {
        let (factory, _) = factory();
        let scope = factory.create(JoinOption::JoinExisting).unwrap();
        let id = scope.id();
        assert!(ambient::scopes().contains(id));
        scope.dispose().unwrap();
        assert!(!ambient::scopes().contains(id));
    }
}
