//! Recording provider.
//!
//! [`RecordingProvider`] implements the provider capability without any
//! storage behind it. Every call is appended to a shared [`Journal`], so
//! tests can assert exactly what a scope did to its handles, and a
//! [`FailurePlan`] makes chosen calls fail.

use crate::failure::FailurePlan;
use dbscope_core::{
    FlushMode, IsolationLevel, ProviderResult, ResourceHandle, ResourceProvider,
    ResourceTransaction,
};
use parking_lot::Mutex;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A provider operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `ResourceProvider::open`.
    Open,
    /// `ResourceHandle::flush`.
    Flush,
    /// `ResourceHandle::set_flush_mode`.
    SetFlushMode,
    /// `ResourceHandle::begin_transaction`.
    Begin,
    /// `ResourceTransaction::commit`.
    Commit,
    /// `ResourceTransaction::rollback`.
    Rollback,
    /// `ResourceTransaction::close`.
    CloseTransaction,
    /// `ResourceHandle::close`.
    Close,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Open => "open",
            Operation::Flush => "flush",
            Operation::SetFlushMode => "set-flush-mode",
            Operation::Begin => "begin",
            Operation::Commit => "commit",
            Operation::Rollback => "rollback",
            Operation::CloseTransaction => "close-transaction",
            Operation::Close => "close",
        };
        f.write_str(name)
    }
}

/// One journaled call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A handle was opened.
    Open {
        /// Handle number, starting at 1 per provider.
        handle: usize,
    },
    /// A handle was flushed.
    Flush {
        /// Handle number.
        handle: usize,
    },
    /// A handle's flush mode changed.
    SetFlushMode {
        /// Handle number.
        handle: usize,
        /// The new mode.
        mode: FlushMode,
    },
    /// A transaction was begun.
    Begin {
        /// Handle number.
        handle: usize,
        /// Requested isolation level.
        isolation_level: Option<IsolationLevel>,
    },
    /// A transaction was committed.
    Commit {
        /// Handle number.
        handle: usize,
    },
    /// A transaction was rolled back.
    Rollback {
        /// Handle number.
        handle: usize,
    },
    /// A transaction was closed.
    CloseTransaction {
        /// Handle number.
        handle: usize,
    },
    /// A handle was closed.
    Close {
        /// Handle number.
        handle: usize,
    },
}

impl Event {
    /// Returns the handle number.
    #[must_use]
    pub fn handle(&self) -> usize {
        match self {
            Event::Open { handle }
            | Event::Flush { handle }
            | Event::SetFlushMode { handle, .. }
            | Event::Begin { handle, .. }
            | Event::Commit { handle }
            | Event::Rollback { handle }
            | Event::CloseTransaction { handle }
            | Event::Close { handle } => *handle,
        }
    }

    /// Returns the operation.
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Event::Open { .. } => Operation::Open,
            Event::Flush { .. } => Operation::Flush,
            Event::SetFlushMode { .. } => Operation::SetFlushMode,
            Event::Begin { .. } => Operation::Begin,
            Event::Commit { .. } => Operation::Commit,
            Event::Rollback { .. } => Operation::Rollback,
            Event::CloseTransaction { .. } => Operation::CloseTransaction,
            Event::Close { .. } => Operation::Close,
        }
    }
}

/// Shared, append-only list of events.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Journal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: Event) {
        self.events.lock().push(event);
    }

    /// Returns a copy of every event so far.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Returns the operations so far, in order.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.events.lock().iter().map(Event::operation).collect()
    }

    /// Returns the number of events of one operation.
    #[must_use]
    pub fn count(&self, operation: Operation) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.operation() == operation)
            .count()
    }

    /// Returns the number of events of one operation on one handle.
    #[must_use]
    pub fn count_for(&self, handle: usize, operation: Operation) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.handle() == handle && event.operation() == operation)
            .count()
    }

    /// Returns the number of handles opened.
    #[must_use]
    pub fn handles_opened(&self) -> usize {
        self.count(Operation::Open)
    }

    /// Removes every event.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// Marker for the default recording provider identity.
#[derive(Debug, Clone, Copy)]
pub struct Primary;

/// Provider that journals every call and fails on demand.
pub struct RecordingProvider<K = Primary> {
    journal: Journal,
    plan: Arc<FailurePlan>,
    opened: AtomicUsize,
    _marker: PhantomData<fn() -> K>,
}

impl<K> RecordingProvider<K> {
    /// Creates a provider where nothing fails.
    #[must_use]
    pub fn new() -> Self {
        Self::with_plan(FailurePlan::new())
    }

    /// Creates a provider that fails according to `plan`.
    #[must_use]
    pub fn with_plan(plan: FailurePlan) -> Self {
        Self {
            journal: Journal::new(),
            plan: Arc::new(plan),
            opened: AtomicUsize::new(0),
            _marker: PhantomData,
        }
    }

    /// Returns the provider's journal.
    #[must_use]
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

impl<K> Default for RecordingProvider<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for RecordingProvider<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingProvider")
            .field("key", &std::any::type_name::<K>())
            .field("opened", &self.opened.load(Ordering::Relaxed))
            .finish()
    }
}

impl<K: 'static> ResourceProvider for RecordingProvider<K> {
    type Handle = RecordingHandle;

    fn open(&self) -> ProviderResult<RecordingHandle> {
        self.plan.check(Operation::Open, 0)?;
        let number = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        self.journal.record(Event::Open { handle: number });
        Ok(RecordingHandle {
            number,
            open: true,
            flush_mode: FlushMode::Auto,
            journal: self.journal.clone(),
            plan: Arc::clone(&self.plan),
        })
    }
}

/// Handle issued by [`RecordingProvider`].
#[derive(Debug)]
pub struct RecordingHandle {
    number: usize,
    open: bool,
    flush_mode: FlushMode,
    journal: Journal,
    plan: Arc<FailurePlan>,
}

impl RecordingHandle {
    /// Returns the handle number.
    #[must_use]
    pub fn number(&self) -> usize {
        self.number
    }

    /// Returns the flush mode.
    #[must_use]
    pub fn flush_mode(&self) -> FlushMode {
        self.flush_mode
    }
}

impl ResourceHandle for RecordingHandle {
    type Transaction = RecordingTransaction;

    fn flush(&mut self) -> ProviderResult<()> {
        self.journal.record(Event::Flush {
            handle: self.number,
        });
        Ok(self.plan.check(Operation::Flush, self.number)?)
    }

    fn begin_transaction(
        &mut self,
        isolation_level: Option<IsolationLevel>,
    ) -> ProviderResult<RecordingTransaction> {
        self.journal.record(Event::Begin {
            handle: self.number,
            isolation_level,
        });
        self.plan.check(Operation::Begin, self.number)?;
        Ok(RecordingTransaction {
            handle: self.number,
            isolation_level,
            active: true,
            journal: self.journal.clone(),
            plan: Arc::clone(&self.plan),
        })
    }

    fn set_flush_mode(&mut self, mode: FlushMode) {
        self.journal.record(Event::SetFlushMode {
            handle: self.number,
            mode,
        });
        self.flush_mode = mode;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> ProviderResult<()> {
        self.journal.record(Event::Close {
            handle: self.number,
        });
        self.open = false;
        Ok(self.plan.check(Operation::Close, self.number)?)
    }
}

/// Transaction issued by [`RecordingHandle`].
#[derive(Debug)]
pub struct RecordingTransaction {
    handle: usize,
    isolation_level: Option<IsolationLevel>,
    active: bool,
    journal: Journal,
    plan: Arc<FailurePlan>,
}

impl RecordingTransaction {
    /// Returns the requested isolation level.
    #[must_use]
    pub fn isolation_level(&self) -> Option<IsolationLevel> {
        self.isolation_level
    }
}

impl ResourceTransaction for RecordingTransaction {
    fn commit(&mut self) -> ProviderResult<()> {
        self.journal.record(Event::Commit {
            handle: self.handle,
        });
        self.plan.check(Operation::Commit, self.handle)?;
        self.active = false;
        Ok(())
    }

    fn rollback(&mut self) -> ProviderResult<()> {
        self.journal.record(Event::Rollback {
            handle: self.handle,
        });
        self.active = false;
        Ok(self.plan.check(Operation::Rollback, self.handle)?)
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn close(&mut self) -> ProviderResult<()> {
        self.journal.record(Event::CloseTransaction {
            handle: self.handle,
        });
        Ok(self.plan.check(Operation::CloseTransaction, self.handle)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::InjectedFailure;

    #[test]
    fn journals_handle_calls() {
        let provider = RecordingProvider::<Primary>::new();
        let journal = provider.journal();

        let mut handle = provider.open().unwrap();
        handle.set_flush_mode(FlushMode::Never);
        handle.flush().unwrap();
        let mut transaction = handle
            .begin_transaction(Some(IsolationLevel::Snapshot))
            .unwrap();
        transaction.commit().unwrap();
        transaction.close().unwrap();
        handle.close().unwrap();

        assert_eq!(
            journal.operations(),
            vec![
                Operation::Open,
                Operation::SetFlushMode,
                Operation::Flush,
                Operation::Begin,
                Operation::Commit,
                Operation::CloseTransaction,
                Operation::Close,
            ]
        );
        assert_eq!(handle.flush_mode(), FlushMode::Never);
        assert!(!handle.is_open());
    }

    #[test]
    fn handle_numbers_increase() {
        let provider = RecordingProvider::<Primary>::new();
        assert_eq!(provider.open().unwrap().number(), 1);
        assert_eq!(provider.open().unwrap().number(), 2);
        assert_eq!(provider.journal().handles_opened(), 2);
    }

    #[test]
    fn injected_failure_is_downcastable() {
        let provider =
            RecordingProvider::<Primary>::with_plan(FailurePlan::new().fail(Operation::Flush));
        let mut handle = provider.open().unwrap();
        let err = handle.flush().unwrap_err();
        let failure = err.downcast_ref::<InjectedFailure>().unwrap();
        assert_eq!(failure.operation, Operation::Flush);
        assert_eq!(provider.journal().count_for(1, Operation::Flush), 1);
    }

    #[test]
    fn failing_commit_stays_active() {
        let provider =
            RecordingProvider::<Primary>::with_plan(FailurePlan::new().fail(Operation::Commit));
        let mut handle = provider.open().unwrap();
        let mut transaction = handle.begin_transaction(None).unwrap();
        assert!(transaction.commit().is_err());
        assert!(transaction.is_active());
        assert_eq!(transaction.isolation_level(), None);
    }
}
