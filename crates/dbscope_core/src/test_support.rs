//! Minimal journaling provider for unit tests.

use crate::error::ProviderResult;
use crate::provider::{ResourceHandle, ResourceProvider, ResourceTransaction};
use crate::types::{FlushMode, IsolationLevel};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) struct Primary;
pub(crate) struct Secondary;

#[derive(Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn record(&self, entry: String) {
        self.0.lock().push(entry);
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub(crate) fn count(&self, op: &str) -> usize {
        self.0
            .lock()
            .iter()
            .filter(|entry| entry.split(' ').next() == Some(op))
            .count()
    }
}

type Failures = Arc<Mutex<HashSet<&'static str>>>;

pub(crate) struct MockProvider<K> {
    journal: Journal,
    opened: Arc<AtomicUsize>,
    failing: Failures,
    _marker: PhantomData<fn() -> K>,
}

impl<K> MockProvider<K> {
    pub(crate) fn new() -> Self {
        Self {
            journal: Journal::default(),
            opened: Arc::new(AtomicUsize::new(0)),
            failing: Arc::default(),
            _marker: PhantomData,
        }
    }

    pub(crate) fn failing(self, op: &'static str) -> Self {
        self.failing.lock().insert(op);
        self
    }

    pub(crate) fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

fn check(failing: &Failures, op: &'static str, n: usize) -> ProviderResult<()> {
    if failing.lock().contains(op) {
        Err(format!("{op} failed on handle {n}").into())
    } else {
        Ok(())
    }
}

impl<K: 'static> ResourceProvider for MockProvider<K> {
    type Handle = MockHandle;

    fn open(&self) -> ProviderResult<MockHandle> {
        check(&self.failing, "open", 0)?;
        let n = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        self.journal.record(format!("open {n}"));
        Ok(MockHandle {
            n,
            open: true,
            writes: 0,
            journal: self.journal.clone(),
            failing: self.failing.clone(),
        })
    }
}

pub(crate) struct MockHandle {
    n: usize,
    open: bool,
    pub(crate) writes: usize,
    journal: Journal,
    failing: Failures,
}

impl ResourceHandle for MockHandle {
    type Transaction = MockTransaction;

    fn flush(&mut self) -> ProviderResult<()> {
        self.journal.record(format!("flush {}", self.n));
        check(&self.failing, "flush", self.n)
    }

    fn begin_transaction(
        &mut self,
        isolation_level: Option<IsolationLevel>,
    ) -> ProviderResult<MockTransaction> {
        self.journal
            .record(format!("begin {} {:?}", self.n, isolation_level));
        check(&self.failing, "begin", self.n)?;
        Ok(MockTransaction {
            n: self.n,
            active: true,
            journal: self.journal.clone(),
            failing: self.failing.clone(),
        })
    }

    fn set_flush_mode(&mut self, mode: FlushMode) {
        self.journal.record(format!("flush-mode {} {mode:?}", self.n));
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> ProviderResult<()> {
        self.journal.record(format!("close {}", self.n));
        self.open = false;
        check(&self.failing, "close", self.n)
    }
}

pub(crate) struct MockTransaction {
    n: usize,
    active: bool,
    journal: Journal,
    failing: Failures,
}

impl ResourceTransaction for MockTransaction {
    fn commit(&mut self) -> ProviderResult<()> {
        self.journal.record(format!("commit {}", self.n));
        check(&self.failing, "commit", self.n)?;
        self.active = false;
        Ok(())
    }

    fn rollback(&mut self) -> ProviderResult<()> {
        self.journal.record(format!("rollback {}", self.n));
        self.active = false;
        check(&self.failing, "rollback", self.n)
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn close(&mut self) -> ProviderResult<()> {
        self.journal.record(format!("close-tx {}", self.n));
        Ok(())
    }
}
