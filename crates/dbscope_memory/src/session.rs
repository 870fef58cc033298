//! Sessions (units of work).

use crate::entity::{decode, encode, Entity, EntityId};
use crate::error::{MemoryError, MemoryResult};
use crate::store::{MemoryStore, Write, WriteSet};
use crate::transaction::{MemoryTransaction, Staging};
use dbscope_core::{FlushMode, IsolationLevel, ProviderResult, ResourceHandle};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// A unit of work against a [`MemoryStore`].
///
/// Writes are buffered in the session until [`flush`](Self::flush). A flush
/// hands them to the active transaction if there is one, or applies them
/// to the store directly. Reads see the session's own pending and staged
/// writes on top of the committed data.
///
/// A session in [`FlushMode::Never`] is read-only: writes are rejected and
/// flushing does nothing.
#[derive(Debug)]
pub struct MemorySession {
    id: u64,
    store: Arc<MemoryStore>,
    pending: WriteSet,
    staging: Arc<Mutex<Staging>>,
    flush_mode: FlushMode,
    open: bool,
}

impl MemorySession {
    /// Opens a session on `store`.
    #[must_use]
    pub fn new(store: Arc<MemoryStore>) -> Self {
        let id = store.next_session_id();
        store.stats().record_session_opened();
        debug!(session = id, "opened session");
        Self {
            id,
            store,
            pending: WriteSet::new(),
            staging: Arc::default(),
            flush_mode: FlushMode::Auto,
            open: true,
        }
    }

    /// Returns the session ID.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the store this session writes to.
    #[must_use]
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Returns the flush mode.
    #[must_use]
    pub fn flush_mode(&self) -> FlushMode {
        self.flush_mode
    }

    /// Sets the flush mode.
    pub fn set_flush_mode(&mut self, mode: FlushMode) {
        self.flush_mode = mode;
    }

    /// Returns true until the session is closed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Returns the number of writes not yet flushed.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if a transaction is running on this session.
    #[must_use]
    pub fn has_active_transaction(&self) -> bool {
        self.staging.lock().transaction.is_some()
    }

    /// Buffers an insert or update.
    pub fn put<E: Entity>(&mut self, entity: &E) -> MemoryResult<()> {
        self.ensure_writable()?;
        let bytes = encode(entity)?;
        self.pending
            .insert((E::TABLE.to_string(), entity.id()), Write::Put(bytes));
        self.store.stats().record_write();
        Ok(())
    }

    /// Buffers a delete.
    pub fn delete<E: Entity>(&mut self, id: EntityId) -> MemoryResult<()> {
        self.ensure_writable()?;
        self.pending
            .insert((E::TABLE.to_string(), id), Write::Delete);
        self.store.stats().record_delete();
        Ok(())
    }

    /// Reads an entity.
    pub fn get<E: Entity>(&self, id: EntityId) -> MemoryResult<Option<E>> {
        self.ensure_open()?;
        let key = (E::TABLE.to_string(), id);
        let overlay = match self.pending.get(&key) {
            Some(write) => Some(write.clone()),
            None => self.staging.lock().writes.get(&key).cloned(),
        };
        match overlay {
            Some(Write::Put(bytes)) => decode(&bytes).map(Some),
            Some(Write::Delete) => Ok(None),
            None => self.store.get(id),
        }
    }

    /// Returns every entity of a table matching `predicate`.
    pub fn query<E: Entity>(&self, predicate: impl Fn(&E) -> bool) -> MemoryResult<Vec<E>> {
        self.ensure_open()?;
        let mut rows: BTreeMap<EntityId, Vec<u8>> = self.store.scan_raw(E::TABLE);
        {
            let staging = self.staging.lock();
            overlay(&mut rows, &staging.writes, E::TABLE);
        }
        overlay(&mut rows, &self.pending, E::TABLE);

        let mut matches = Vec::new();
        for bytes in rows.values() {
            let entity: E = decode(bytes)?;
            if predicate(&entity) {
                matches.push(entity);
            }
        }
        Ok(matches)
    }

    /// Returns every entity of a table.
    pub fn all<E: Entity>(&self) -> MemoryResult<Vec<E>> {
        self.query(|_: &E| true)
    }

    /// Returns the number of entities of a table.
    pub fn count<E: Entity>(&self) -> MemoryResult<usize> {
        self.all::<E>().map(|rows| rows.len())
    }

    /// Moves pending writes out of the session.
    pub fn flush(&mut self) -> MemoryResult<()> {
        self.ensure_open()?;
        if self.flush_mode == FlushMode::Never || self.pending.is_empty() {
            return Ok(());
        }

        let writes = std::mem::take(&mut self.pending);
        let count = writes.len();
        let mut staging = self.staging.lock();
        if staging.transaction.is_some() {
            staging.writes.extend(writes);
            drop(staging);
        } else {
            drop(staging);
            self.store.apply(writes)?;
        }
        self.store.stats().record_flush();
        debug!(session = self.id, writes = count, "flushed session");
        Ok(())
    }

    /// Begins a transaction.
    ///
    /// `None` uses the store's default isolation level.
    pub fn begin_transaction(
        &mut self,
        isolation_level: Option<IsolationLevel>,
    ) -> MemoryResult<MemoryTransaction> {
        self.ensure_open()?;
        let mut staging = self.staging.lock();
        if staging.transaction.is_some() {
            return Err(MemoryError::TransactionAlreadyActive { session: self.id });
        }
        let id = self.store.next_transaction_id();
        staging.transaction = Some(id);
        drop(staging);

        let level = isolation_level.unwrap_or(self.store.config().default_isolation);
        self.store.stats().record_transaction_begin();
        debug!(session = self.id, transaction = id, isolation = %level, "began transaction");
        Ok(MemoryTransaction::new(
            id,
            self.id,
            level,
            Arc::clone(&self.store),
            Arc::clone(&self.staging),
        ))
    }

    /// Closes the session.
    ///
    /// Unflushed writes are discarded and a running transaction is rolled
    /// back. Idempotent.
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        let discarded = self.pending.len();
        self.pending.clear();
        {
            let mut staging = self.staging.lock();
            if staging.transaction.take().is_some() {
                staging.writes.clear();
                self.store.stats().record_transaction_rollback();
            }
        }
        self.store.stats().record_session_closed(discarded as u64);
        debug!(session = self.id, discarded, "closed session");
    }

    fn ensure_open(&self) -> MemoryResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(MemoryError::SessionClosed { session: self.id })
        }
    }

    fn ensure_writable(&self) -> MemoryResult<()> {
        self.ensure_open()?;
        if self.flush_mode == FlushMode::Never {
            return Err(MemoryError::ReadOnlySession { session: self.id });
        }
        Ok(())
    }
}

fn overlay(rows: &mut BTreeMap<EntityId, Vec<u8>>, writes: &WriteSet, table: &str) {
    for ((write_table, id), write) in writes {
        if write_table != table {
            continue;
        }
        match write {
            Write::Put(bytes) => {
                rows.insert(*id, bytes.clone());
            }
            Write::Delete => {
                rows.remove(id);
            }
        }
    }
}

impl ResourceHandle for MemorySession {
    type Transaction = MemoryTransaction;

    fn flush(&mut self) -> ProviderResult<()> {
        Ok(MemorySession::flush(self)?)
    }

    fn begin_transaction(
        &mut self,
        isolation_level: Option<IsolationLevel>,
    ) -> ProviderResult<MemoryTransaction> {
        Ok(MemorySession::begin_transaction(self, isolation_level)?)
    }

    fn set_flush_mode(&mut self, mode: FlushMode) {
        self.flush_mode = mode;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> ProviderResult<()> {
        MemorySession::close(self);
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.close();
    }
}
