//! Test fixtures and factory helpers.
//!
//! Provides ready-made scope factories over recording providers and over
//! the memory engine.

use crate::failure::FailurePlan;
use crate::recording::{Journal, Primary, RecordingProvider};
use dbscope_core::{ProviderRegistry, ScopeConfig, ScopeFactory};
use dbscope_memory::{DefaultStore, Entity, EntityId, MemoryConfig, MemoryProvider, MemoryStore};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Marker for a second recording provider identity.
#[derive(Debug, Clone, Copy)]
pub struct Secondary;

/// Marker for a numbered recording provider identity.
#[derive(Debug, Clone, Copy)]
pub struct Slot<const N: usize>;

/// A factory over two recording providers.
pub struct RecordingFixture {
    /// The scope factory.
    pub factory: ScopeFactory,
    /// Journal of `RecordingProvider<Primary>`.
    pub primary: Journal,
    /// Journal of `RecordingProvider<Secondary>`.
    pub secondary: Journal,
}

impl RecordingFixture {
    /// Creates a fixture where nothing fails.
    pub fn new() -> Self {
        Self::build(FailurePlan::new(), FailurePlan::new(), ScopeConfig::default())
    }

    /// Creates a fixture with a custom configuration.
    pub fn with_config(config: ScopeConfig) -> Self {
        Self::build(FailurePlan::new(), FailurePlan::new(), config)
    }

    /// Creates a fixture whose providers fail according to the plans.
    pub fn with_plans(primary: FailurePlan, secondary: FailurePlan) -> Self {
        Self::build(primary, secondary, ScopeConfig::default())
    }

    fn build(primary: FailurePlan, secondary: FailurePlan, config: ScopeConfig) -> Self {
        let primary = RecordingProvider::<Primary>::with_plan(primary);
        let secondary = RecordingProvider::<Secondary>::with_plan(secondary);
        let primary_journal = primary.journal();
        let secondary_journal = secondary.journal();
        Self {
            factory: ScopeFactory::with_config(
                ProviderRegistry::new().with(primary).with(secondary),
                config,
            ),
            primary: primary_journal,
            secondary: secondary_journal,
        }
    }
}

impl Default for RecordingFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A factory over the memory engine, optionally backed by a snapshot file.
pub struct MemoryFixture {
    /// The store behind the factory.
    pub store: Arc<MemoryStore>,
    /// The scope factory.
    pub factory: ScopeFactory,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl MemoryFixture {
    /// Creates a fixture over an in-memory store.
    pub fn memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()), None)
    }

    /// Creates a fixture whose store writes a snapshot on every commit.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = MemoryConfig::new()
            .snapshot_path(temp_dir.path().join("store.cbor"))
            .persist_on_commit(true);
        let store = MemoryStore::with_config(config).expect("Failed to open memory store");
        Self::from_store(Arc::new(store), Some(temp_dir))
    }

    fn from_store(store: Arc<MemoryStore>, temp_dir: Option<TempDir>) -> Self {
        let factory = ScopeFactory::new(
            ProviderRegistry::new().with(MemoryProvider::<DefaultStore>::new(Arc::clone(&store))),
        );
        Self {
            store,
            factory,
            _temp_dir: temp_dir,
        }
    }

    /// Returns the snapshot path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.store.config().snapshot_path.clone()
    }

    /// Reopens the snapshot file as a fresh store.
    pub fn reopen(&self) -> MemoryStore {
        let path = self.path().expect("File fixture should have a path");
        MemoryStore::open(&path).expect("Failed to reopen memory store")
    }
}

/// Runs a test with a factory over a fresh in-memory store.
///
/// # Example
///
/// ```rust,ignore
/// use dbscope_testkit::with_memory_factory;
///
/// #[test]
/// fn my_test() {
///     with_memory_factory(|factory, store| {
///         let mut scope = factory.create(JoinOption::JoinExisting).unwrap();
///         // ... test operations
///     });
/// }
/// ```
pub fn with_memory_factory<F, R>(f: F) -> R
where
    F: FnOnce(&ScopeFactory, &MemoryStore) -> R,
{
    let fixture = MemoryFixture::memory();
    f(&fixture.factory, &fixture.store)
}

/// A small entity for tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Entity ID.
    pub id: EntityId,
    /// Name.
    pub name: String,
    /// Age in years.
    pub age: u32,
}

impl Person {
    /// Creates a person with a fresh ID.
    pub fn new(name: impl Into<String>, age: u32) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            age,
        }
    }
}

impl Entity for Person {
    const TABLE: &'static str = "people";

    fn id(&self) -> EntityId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::Operation;
    use dbscope_core::JoinOption;

    #[test]
    fn recording_fixture_journals_per_provider() {
        let fixture = RecordingFixture::new();
        let scope = fixture.factory.create(JoinOption::JoinExisting).unwrap();
        scope.get::<RecordingProvider<Primary>>().unwrap();
        scope.dispose().unwrap();

        assert_eq!(fixture.primary.count(Operation::Open), 1);
        assert_eq!(fixture.primary.count(Operation::Close), 1);
        assert!(fixture.secondary.events().is_empty());
    }

    #[test]
    fn memory_fixture_round_trips_through_file() {
        let fixture = MemoryFixture::file();
        let person = Person::new("Ada", 36);

        let mut scope = fixture.factory.create(JoinOption::JoinExisting).unwrap();
        scope
            .get::<MemoryProvider>()
            .unwrap()
            .lock()
            .put(&person)
            .unwrap();
        scope.save().unwrap();
        scope.dispose().unwrap();

        let reopened = fixture.reopen();
        assert_eq!(reopened.get::<Person>(person.id).unwrap(), Some(person));
    }

    #[test]
    fn with_memory_factory_starts_empty() {
        with_memory_factory(|_, store| {
            assert_eq!(store.count::<Person>(), 0);
        });
    }
}
