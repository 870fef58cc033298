//! Ambient context store.
//!
//! Holds the "current scope" token of the executing logical flow and the
//! arena that owns every live scope.
//!
//! A logical flow is either:
//!
//! - an async flow established with [`flow`] or [`propagate`]. The token
//!   lives in a tokio task-local and follows the future across `.await`
//!   points and worker threads. Spawned tasks do not inherit it.
//! - a synchronous flow established with [`flow_sync`], for blocking code
//!   running on a tokio runtime thread.
//! - otherwise, the current thread. New threads start with no ambient scope.
//!
//! Concurrent flows never observe each other's token unless it is handed
//! over explicitly with [`propagate`].
//!
//! Tokio tasks share worker threads, so the thread slot cannot tell them
//! apart. Creating a scope on a runtime thread outside an established flow
//! fails with [`ScopeError::InvalidOperation`](crate::ScopeError).
//!
//! ```rust,ignore
//! ambient::flow(async {
//!     let scope = factory.create(JoinOption::JoinExisting)?;
//!     repository.load().await?; // sees `scope` through the locator
//!     scope.dispose()
//! })
//! .await
//! ```

pub(crate) mod arena;

use crate::scope::ScopeInner;
use crate::types::ScopeId;
use arena::Arena;
use std::cell::Cell;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tracing::warn;

tokio::task_local! {
    static FLOW_SCOPE: Cell<Option<ScopeId>>;
}

thread_local! {
    static THREAD_SCOPE: Cell<Option<ScopeId>> = const { Cell::new(None) };
}

static SCOPES: OnceLock<Arena<ScopeInner>> = OnceLock::new();

pub(crate) fn scopes() -> &'static Arena<ScopeInner> {
    SCOPES.get_or_init(Arena::new)
}

/// Runs `future` as a new logical flow with no ambient scope.
pub fn flow<F: Future>(future: F) -> impl Future<Output = F::Output> {
    FLOW_SCOPE.scope(Cell::new(None), future)
}

/// Runs `future` as a new logical flow that starts with the caller's
/// ambient scope.
///
/// The new flow shares the caller's handles. Only use this when the two
/// flows never run concurrently against the same scope.
pub fn propagate<F: Future>(future: F) -> impl Future<Output = F::Output> {
    FLOW_SCOPE.scope(Cell::new(current_id()), future)
}

/// Runs `f` as a new synchronous flow with no ambient scope.
///
/// Use this for blocking code that runs on a runtime thread, such as the
/// body of `tokio::task::spawn_blocking`.
pub fn flow_sync<R>(f: impl FnOnce() -> R) -> R {
    FLOW_SCOPE.sync_scope(Cell::new(None), f)
}

/// Returns true when called inside a flow established by [`flow`],
/// [`propagate`] or [`flow_sync`].
#[must_use]
pub fn is_flow_established() -> bool {
    FLOW_SCOPE.try_with(|_| ()).is_ok()
}

/// Returns true when scopes cannot be created here: the caller runs inside
/// a tokio runtime but outside an established flow.
#[must_use]
pub fn requires_flow() -> bool {
    tokio::runtime::Handle::try_current().is_ok() && !is_flow_established()
}

/// Returns the raw ambient token, which may refer to a released scope.
#[must_use]
pub fn current_id() -> Option<ScopeId> {
    FLOW_SCOPE
        .try_with(Cell::get)
        .unwrap_or_else(|_| THREAD_SCOPE.with(Cell::get))
}

/// Returns true if an ambient scope is active for this flow.
#[must_use]
pub fn has_ambient_scope() -> bool {
    current().is_some()
}

/// Returns the number of scopes that have been created but not released.
#[must_use]
pub fn live_scope_count() -> usize {
    scopes().len()
}

pub(crate) fn set_current(id: Option<ScopeId>) {
    if FLOW_SCOPE.try_with(|cell| cell.set(id)).is_err() {
        THREAD_SCOPE.with(|cell| cell.set(id));
    }
}

/// Resolves the ambient token.
///
/// A token whose scope is gone degrades to no ambient scope.
pub(crate) fn current() -> Option<(ScopeId, Arc<ScopeInner>)> {
    let id = current_id()?;
    match scopes().get(id) {
        Some(inner) => Some((id, inner)),
        None => {
            warn!(
                scope = %id,
                "ambient scope token refers to a scope that no longer exists; \
                 a scope was probably released from another flow"
            );
            None
        }
    }
}
