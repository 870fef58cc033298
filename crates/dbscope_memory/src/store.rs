//! Committed entity tables.
//!
//! The store holds what has been committed. Sessions buffer their writes and
//! hand them to [`MemoryStore::apply`] as a single write set, which is
//! applied atomically under the table lock.

use crate::config::MemoryConfig;
use crate::entity::{decode, Entity, EntityId};
use crate::error::{MemoryError, MemoryResult};
use crate::stats::StoreStats;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::NamedTempFile;
use tracing::debug;

/// Snapshot format version.
const SNAPSHOT_VERSION: u16 = 1;

/// One buffered change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Write {
    /// Insert or replace the encoded entity.
    Put(Vec<u8>),
    /// Remove the entity.
    Delete,
}

/// Table name and entity ID.
pub(crate) type WriteKey = (String, EntityId);

/// Buffered changes, last write per key wins.
pub(crate) type WriteSet = BTreeMap<WriteKey, Write>;

type Table = BTreeMap<EntityId, Vec<u8>>;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u16,
    sequence: u64,
    tables: BTreeMap<String, Table>,
}

/// An in-memory entity store.
///
/// # Thread Safety
///
/// The store is shared by every session opened from it. Reads take a shared
/// lock, applying a write set takes the exclusive lock. Snapshot writes are
/// serialized, so the file on disk never moves back to an older sequence.
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    persist_lock: Mutex<()>,
    sequence: AtomicU64,
    next_session: AtomicU64,
    next_transaction: AtomicU64,
    stats: StoreStats,
    config: MemoryConfig,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::from_parts(HashMap::new(), 0, MemoryConfig::default())
    }
}

impl MemoryStore {
    /// Creates an empty store without a snapshot file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store, loading the configured snapshot file if it exists.
    pub fn with_config(config: MemoryConfig) -> MemoryResult<Self> {
        let (tables, sequence) = match &config.snapshot_path {
            Some(path) if path.exists() => read_snapshot(path)?,
            _ => (HashMap::new(), 0),
        };
        debug!(
            path = ?config.snapshot_path,
            tables = tables.len(),
            sequence,
            "opened memory store"
        );
        Ok(Self::from_parts(tables, sequence, config))
    }

    /// Opens a store backed by a snapshot file.
    pub fn open(path: impl AsRef<Path>) -> MemoryResult<Self> {
        Self::with_config(MemoryConfig::new().snapshot_path(path.as_ref()))
    }

    fn from_parts(tables: HashMap<String, Table>, sequence: u64, config: MemoryConfig) -> Self {
        Self {
            tables: RwLock::new(tables),
            persist_lock: Mutex::new(()),
            sequence: AtomicU64::new(sequence),
            next_session: AtomicU64::new(1),
            next_transaction: AtomicU64::new(1),
            stats: StoreStats::new(),
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Returns the statistics counters.
    #[must_use]
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Returns the number of write sets applied so far.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    /// Reads a committed entity.
    pub fn get<E: Entity>(&self, id: EntityId) -> MemoryResult<Option<E>> {
        self.read_raw(E::TABLE, id)
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Reads every committed entity of a table.
    pub fn all<E: Entity>(&self) -> MemoryResult<Vec<E>> {
        self.scan_raw(E::TABLE)
            .into_iter()
            .map(|(_, bytes)| decode(&bytes))
            .collect()
    }

    /// Returns the number of committed entities in a table.
    #[must_use]
    pub fn count<E: Entity>(&self) -> usize {
        self.tables.read().get(E::TABLE).map_or(0, BTreeMap::len)
    }

    pub(crate) fn read_raw(&self, table: &str, id: EntityId) -> Option<Vec<u8>> {
        self.tables
            .read()
            .get(table)
            .and_then(|rows| rows.get(&id).cloned())
    }

    pub(crate) fn scan_raw(&self, table: &str) -> Table {
        self.tables.read().get(table).cloned().unwrap_or_default()
    }

    pub(crate) fn next_session_id(&self) -> u64 {
        self.next_session.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn next_transaction_id(&self) -> u64 {
        self.next_transaction.fetch_add(1, Ordering::Relaxed)
    }

    /// Applies a write set atomically and returns the new sequence number.
    pub(crate) fn apply(&self, writes: WriteSet) -> MemoryResult<u64> {
        if writes.is_empty() {
            return Ok(self.sequence());
        }

        let count = writes.len();
        let sequence = {
            let mut tables = self.tables.write();
            for ((table, id), write) in writes {
                match write {
                    Write::Put(bytes) => {
                        tables.entry(table).or_default().insert(id, bytes);
                    }
                    Write::Delete => {
                        if let Some(rows) = tables.get_mut(&table) {
                            rows.remove(&id);
                        }
                    }
                }
            }
            self.sequence.fetch_add(1, Ordering::AcqRel) + 1
        };
        self.stats.record_commit_applied();
        debug!(sequence, writes = count, "applied write set");

        if self.config.persist_on_commit {
            self.persist()?;
        }
        Ok(sequence)
    }

    /// Writes the configured snapshot file. Does nothing without one.
    pub fn persist(&self) -> MemoryResult<()> {
        match &self.config.snapshot_path {
            Some(path) => self.persist_to(path),
            None => Ok(()),
        }
    }

    /// Writes a snapshot to `path`.
    ///
    /// Each snapshot goes to its own temporary file next to the destination
    /// and is renamed into place while holding the persist lock.
    pub fn persist_to(&self, path: impl AsRef<Path>) -> MemoryResult<()> {
        let path = path.as_ref();
        let _guard = self.persist_lock.lock();
        let snapshot = {
            let tables = self.tables.read();
            Snapshot {
                version: SNAPSHOT_VERSION,
                sequence: self.sequence(),
                tables: tables
                    .iter()
                    .map(|(name, rows)| (name.clone(), rows.clone()))
                    .collect(),
            }
        };

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            ciborium::ser::into_writer(&snapshot, &mut writer).map_err(MemoryError::codec)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|err| err.error)?;

        self.stats.record_snapshot();
        debug!(path = %path.display(), sequence = snapshot.sequence, "wrote snapshot");
        Ok(())
    }
}

fn read_snapshot(path: &Path) -> MemoryResult<(HashMap<String, Table>, u64)> {
    let reader = BufReader::new(File::open(path)?);
    let snapshot: Snapshot = ciborium::de::from_reader(reader).map_err(|err| {
        MemoryError::snapshot_format(format!("{}: {err}", path.display()))
    })?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(MemoryError::snapshot_format(format!(
            "unsupported version {} (expected {SNAPSHOT_VERSION})",
            snapshot.version
        )));
    }
    Ok((snapshot.tables.into_iter().collect(), snapshot.sequence))
}
