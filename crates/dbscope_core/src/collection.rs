//! Resource collection.
//!
//! A resource collection owns at most one handle per provider type, opened
//! lazily on first request. It finalizes all of them together:
//!
//! - `commit` flushes every handle (unless read-only) and commits explicit
//!   transactions.
//! - `rollback` rolls back explicit transactions. Handles without one have
//!   nothing to undo since nothing was flushed.
//! - `dispose` finalizes if neither ran, then closes every handle.
//!
//! Finalization is best effort and not atomic across handles. Every handle
//! is finalized exactly once and the first failure is reported after the
//! rest have been attempted.

use crate::config::TransactionPolicy;
use crate::error::{BoxError, FinalizeOperation, ProviderResult, ScopeError, ScopeResult};
use crate::provider::{
    ProviderId, ProviderRegistry, ResourceHandle, ResourceProvider, ResourceTransaction,
    SharedHandle,
};
use crate::types::{FlushMode, IsolationLevel};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, warn};

/// Type-erased view of a shared handle.
trait ManagedHandle: Send {
    fn flush(&self) -> ProviderResult<()>;
    fn begin(
        &self,
        isolation_level: Option<IsolationLevel>,
    ) -> ProviderResult<Box<dyn ResourceTransaction>>;
    fn close(&self) -> ProviderResult<()>;
    fn is_open(&self) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<H: ResourceHandle> ManagedHandle for SharedHandle<H> {
    fn flush(&self) -> ProviderResult<()> {
        self.lock().flush()
    }

    fn begin(
        &self,
        isolation_level: Option<IsolationLevel>,
    ) -> ProviderResult<Box<dyn ResourceTransaction>> {
        let transaction = self.lock().begin_transaction(isolation_level)?;
        Ok(Box::new(transaction))
    }

    fn close(&self) -> ProviderResult<()> {
        let mut handle = self.lock();
        if handle.is_open() {
            handle.close()
        } else {
            Ok(())
        }
    }

    fn is_open(&self) -> bool {
        self.lock().is_open()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct Entry {
    provider: ProviderId,
    handle: Box<dyn ManagedHandle>,
    transaction: Option<Box<dyn ResourceTransaction>>,
}

/// Result of finalizing one handle.
struct FinalizeOutcome {
    provider: ProviderId,
    result: ProviderResult<()>,
}

/// What `dispose` swallowed.
///
/// Disposal never fails. Anything that went wrong is logged and collected
/// here for callers that want to inspect it.
#[derive(Debug, Default)]
pub struct DisposalReport {
    /// Error from the implicit commit or rollback, if one ran and failed.
    pub finalize_error: Option<ScopeError>,
    /// Errors from closing handles, with the provider that failed.
    pub close_errors: Vec<(ProviderId, BoxError)>,
}

impl DisposalReport {
    /// Returns true if nothing went wrong.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.finalize_error.is_none() && self.close_errors.is_empty()
    }
}

/// The handles shared by a scope and every scope that joins it.
pub struct ResourceCollection {
    registry: Arc<ProviderRegistry>,
    entries: Vec<Entry>,
    read_only: bool,
    isolation_level: Option<IsolationLevel>,
    policy: TransactionPolicy,
    disposed: bool,
    completed: bool,
}

impl ResourceCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new(
        registry: Arc<ProviderRegistry>,
        read_only: bool,
        isolation_level: Option<IsolationLevel>,
        policy: TransactionPolicy,
    ) -> Self {
        Self {
            registry,
            entries: Vec::new(),
            read_only,
            isolation_level,
            policy,
            disposed: false,
            completed: false,
        }
    }

    /// Returns true if handles are opened with flushing disabled.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Returns the explicit isolation level, if any.
    #[must_use]
    pub fn isolation_level(&self) -> Option<IsolationLevel> {
        self.isolation_level
    }

    /// Returns true once `commit` or `rollback` has run.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Returns true once `dispose` has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Returns the number of open handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no handle has been opened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of explicit transactions still pending.
    #[must_use]
    pub fn pending_transactions(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.transaction.is_some())
            .count()
    }

    /// Returns the handle for provider `P`, opening it on first request.
    pub fn get<P: ResourceProvider>(&mut self) -> ScopeResult<SharedHandle<P::Handle>> {
        if self.disposed {
            return Err(ScopeError::object_disposed("ResourceCollection"));
        }

        let id = ProviderId::of::<P>();
        if let Some(entry) = self.entries.iter().find(|entry| entry.provider == id) {
            return entry
                .handle
                .as_any()
                .downcast_ref::<SharedHandle<P::Handle>>()
                .cloned()
                .ok_or_else(|| {
                    ScopeError::invalid_operation(format!("handle type mismatch for {id}"))
                });
        }

        let provider = self.registry.provider::<P>()?;
        let handle = provider
            .open()
            .map_err(|source| ScopeError::provider(id.name(), source))?;
        let shared: SharedHandle<P::Handle> = Arc::new(Mutex::new(handle));

        if self.read_only {
            shared.lock().set_flush_mode(FlushMode::Never);
        }

        let wants_transaction =
            self.isolation_level.is_some() || self.policy == TransactionPolicy::Always;
        let transaction = if wants_transaction {
            match ManagedHandle::begin(&shared, self.isolation_level) {
                Ok(transaction) => Some(transaction),
                Err(source) => {
                    if let Err(err) = ManagedHandle::close(&shared) {
                        warn!(provider = %id, error = %err, "failed to close handle after begin failed");
                    }
                    return Err(ScopeError::provider(id.name(), source));
                }
            }
        } else {
            None
        };

        debug!(
            provider = provider.name(),
            read_only = self.read_only,
            isolation = ?self.isolation_level,
            transaction = transaction.is_some(),
            "opened handle"
        );

        self.entries.push(Entry {
            provider: id,
            handle: Box::new(shared.clone()),
            transaction,
        });
        Ok(shared)
    }

    /// Flushes every handle and commits every explicit transaction.
    ///
    /// Read-only collections skip the flush.
    pub fn commit(&mut self) -> ScopeResult<()> {
        self.ensure_can_complete()?;
        let read_only = self.read_only;
        let outcomes: Vec<FinalizeOutcome> = self
            .entries
            .iter_mut()
            .map(|entry| FinalizeOutcome {
                provider: entry.provider,
                result: commit_entry(entry, read_only),
            })
            .collect();
        self.finish(FinalizeOperation::Commit, outcomes)
    }

    /// Rolls back every explicit transaction.
    pub fn rollback(&mut self) -> ScopeResult<()> {
        self.ensure_can_complete()?;
        let outcomes: Vec<FinalizeOutcome> = self
            .entries
            .iter_mut()
            .map(|entry| FinalizeOutcome {
                provider: entry.provider,
                result: rollback_entry(entry),
            })
            .collect();
        self.finish(FinalizeOperation::Rollback, outcomes)
    }

    /// Finalizes if needed and closes every handle. Idempotent.
    ///
    /// A collection that was neither committed nor rolled back is committed
    /// if read-only and rolled back otherwise. Handles are closed in reverse
    /// order of opening.
    pub fn dispose(&mut self) -> DisposalReport {
        let mut report = DisposalReport::default();
        if self.disposed {
            return report;
        }

        if !self.completed {
            let result = if self.read_only {
                self.commit()
            } else {
                self.rollback()
            };
            if let Err(err) = result {
                warn!(error = %err, "finalization failed during disposal");
                report.finalize_error = Some(err);
            }
        }

        for mut entry in self.entries.drain(..).rev() {
            if let Some(mut transaction) = entry.transaction.take() {
                if let Err(err) = transaction.close() {
                    warn!(provider = %entry.provider, error = %err, "failed to close transaction");
                }
            }
            if let Err(err) = entry.handle.close() {
                warn!(provider = %entry.provider, error = %err, "failed to close handle");
                report.close_errors.push((entry.provider, err));
            }
        }

        self.disposed = true;
        debug!(clean = report.is_clean(), "disposed resource collection");
        report
    }

    fn ensure_can_complete(&self) -> ScopeResult<()> {
        if self.disposed {
            return Err(ScopeError::object_disposed("ResourceCollection"));
        }
        if self.completed {
            return Err(ScopeError::invalid_operation(
                "commit or rollback can only be called once on a resource collection",
            ));
        }
        Ok(())
    }

    fn finish(
        &mut self,
        operation: FinalizeOperation,
        outcomes: Vec<FinalizeOutcome>,
    ) -> ScopeResult<()> {
        self.completed = true;
        for entry in &mut self.entries {
            entry.transaction = None;
        }

        let attempted = outcomes.len();
        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        debug!(%operation, attempted, failed, "finalized resource collection");

        match outcomes.into_iter().find_map(|o| match o.result {
            Err(source) => Some((o.provider, source)),
            Ok(()) => None,
        }) {
            Some((provider, source)) => Err(ScopeError::Finalize {
                operation,
                provider: provider.name(),
                failed,
                attempted,
                source,
            }),
            None => Ok(()),
        }
    }
}

impl Drop for ResourceCollection {
    fn drop(&mut self) {
        if !self.disposed {
            self.dispose();
        }
    }
}

fn commit_entry(entry: &mut Entry, read_only: bool) -> ProviderResult<()> {
    if !read_only {
        if let Err(err) = entry.handle.flush() {
            if let Some(mut transaction) = entry.transaction.take() {
                abandon(entry.provider, transaction.as_mut());
            }
            return Err(err);
        }
    }

    if let Some(mut transaction) = entry.transaction.take() {
        if let Err(err) = transaction.commit() {
            abandon(entry.provider, transaction.as_mut());
            return Err(err);
        }
        transaction.close()?;
    }
    Ok(())
}

fn rollback_entry(entry: &mut Entry) -> ProviderResult<()> {
    match entry.transaction.take() {
        Some(mut transaction) => {
            let result = transaction.rollback();
            let closed = transaction.close();
            result.and(closed)
        }
        None => Ok(()),
    }
}

/// Rolls back and closes a transaction whose commit path failed.
fn abandon(provider: ProviderId, transaction: &mut dyn ResourceTransaction) {
    if transaction.is_active() {
        if let Err(err) = transaction.rollback() {
            warn!(%provider, error = %err, "rollback after failed commit also failed");
        }
    }
    if let Err(err) = transaction.close() {
        warn!(%provider, error = %err, "failed to close transaction");
    }
}

impl std::fmt::Debug for ResourceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCollection")
            .field("handles", &self.entries.len())
            .field("read_only", &self.read_only)
            .field("isolation_level", &self.isolation_level)
            .field("completed", &self.completed)
            .field("disposed", &self.disposed)
            .finish()
    }
}
