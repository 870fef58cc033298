//! Explicit transactions.

use crate::error::{MemoryError, MemoryResult};
use crate::store::{MemoryStore, WriteSet};
use dbscope_core::{IsolationLevel, ProviderResult, ResourceTransaction};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Writes flushed by a session while a transaction is running.
#[derive(Debug, Default)]
pub(crate) struct Staging {
    pub(crate) writes: WriteSet,
    pub(crate) transaction: Option<u64>,
}

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is running.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been rolled back.
    RolledBack,
}

/// A transaction on a [`MemorySession`](crate::MemorySession).
///
/// Flushing the session moves its writes into the transaction's staging
/// buffer. Commit applies the buffer to the store in one step.
#[derive(Debug)]
pub struct MemoryTransaction {
    id: u64,
    session: u64,
    isolation_level: IsolationLevel,
    state: TransactionState,
    store: Arc<MemoryStore>,
    staging: Arc<Mutex<Staging>>,
}

impl MemoryTransaction {
    pub(crate) fn new(
        id: u64,
        session: u64,
        isolation_level: IsolationLevel,
        store: Arc<MemoryStore>,
        staging: Arc<Mutex<Staging>>,
    ) -> Self {
        Self {
            id,
            session,
            isolation_level,
            state: TransactionState::Active,
            store,
            staging,
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the ID of the session that began the transaction.
    #[must_use]
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Returns the isolation level.
    #[must_use]
    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Returns true while the transaction can commit or roll back.
    ///
    /// Closing the owning session ends the transaction.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
            && self.staging.lock().transaction == Some(self.id)
    }

    /// Applies the staged writes and returns the store sequence number.
    pub fn commit(&mut self) -> MemoryResult<u64> {
        let writes = {
            let mut staging = self.staging.lock();
            self.ensure_active(&staging)?;
            staging.transaction = None;
            std::mem::take(&mut staging.writes)
        };
        self.state = TransactionState::Committed;
        let count = writes.len();
        let sequence = self.store.apply(writes)?;
        self.store.stats().record_transaction_commit();
        debug!(transaction = self.id, writes = count, sequence, "committed transaction");
        Ok(sequence)
    }

    /// Discards the staged writes.
    pub fn rollback(&mut self) -> MemoryResult<()> {
        let mut staging = self.staging.lock();
        self.ensure_active(&staging)?;
        staging.transaction = None;
        let discarded = staging.writes.len();
        staging.writes.clear();
        drop(staging);

        self.state = TransactionState::RolledBack;
        self.store.stats().record_transaction_rollback();
        debug!(transaction = self.id, discarded, "rolled back transaction");
        Ok(())
    }

    /// Rolls back if still active.
    pub fn close(&mut self) {
        if self.is_active() {
            // Only fails when no longer active.
            let _ = self.rollback();
        }
    }

    fn ensure_active(&self, staging: &Staging) -> MemoryResult<()> {
        if self.state == TransactionState::Active && staging.transaction == Some(self.id) {
            Ok(())
        } else {
            Err(MemoryError::TransactionNotActive {
                transaction: self.id,
            })
        }
    }
}

impl ResourceTransaction for MemoryTransaction {
    fn commit(&mut self) -> ProviderResult<()> {
        MemoryTransaction::commit(self)?;
        Ok(())
    }

    fn rollback(&mut self) -> ProviderResult<()> {
        Ok(MemoryTransaction::rollback(self)?)
    }

    fn is_active(&self) -> bool {
        MemoryTransaction::is_active(self)
    }

    fn close(&mut self) -> ProviderResult<()> {
        MemoryTransaction::close(self);
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        self.close();
    }
}
