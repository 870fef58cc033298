//! Resource provider over a memory store.

use crate::session::MemorySession;
use crate::store::MemoryStore;
use dbscope_core::{ProviderResult, ResourceProvider};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Marker for the default store identity.
#[derive(Debug, Clone, Copy)]
pub struct DefaultStore;

/// Opens [`MemorySession`]s on a shared [`MemoryStore`].
///
/// Provider identity is the provider type, so the marker `K` is what tells
/// two stores apart inside one scope:
///
/// ```rust,ignore
/// struct Audit;
///
/// let registry = ProviderRegistry::new()
///     .with(MemoryProvider::<DefaultStore>::new(main_store))
///     .with(MemoryProvider::<Audit>::new(audit_store));
/// ```
pub struct MemoryProvider<K = DefaultStore> {
    store: Arc<MemoryStore>,
    _marker: PhantomData<fn() -> K>,
}

impl<K> MemoryProvider<K> {
    /// Creates a provider for `store`.
    #[must_use]
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    /// Returns the store.
    #[must_use]
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }
}

impl<K> Clone for MemoryProvider<K> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.store))
    }
}

impl<K> fmt::Debug for MemoryProvider<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryProvider")
            .field("store", &std::any::type_name::<K>())
            .finish()
    }
}

impl<K: 'static> ResourceProvider for MemoryProvider<K> {
    type Handle = MemorySession;

    fn open(&self) -> ProviderResult<MemorySession> {
        Ok(MemorySession::new(Arc::clone(&self.store)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::tests::Note;
    use dbscope_core::{IsolationLevel, JoinOption, ProviderId, ProviderRegistry, ScopeFactory};

    struct Audit;

    fn factory(store: &Arc<MemoryStore>) -> ScopeFactory {
        ScopeFactory::new(ProviderRegistry::new().with(MemoryProvider::<DefaultStore>::new(
            Arc::clone(store),
        )))
    }

    #[test]
    fn marker_gives_distinct_identity() {
        assert_ne!(
            ProviderId::of::<MemoryProvider<DefaultStore>>(),
            ProviderId::of::<MemoryProvider<Audit>>()
        );
    }

    #[test]
    fn saved_scope_persists() {
        let store = Arc::new(MemoryStore::new());
        let factory = factory(&store);
        let note = Note::new("saved");

        let mut scope = factory.create(JoinOption::JoinExisting).unwrap();
        scope
            .get::<MemoryProvider>()
            .unwrap()
            .lock()
            .put(&note)
            .unwrap();
        scope.save().unwrap();
        scope.dispose().unwrap();

        assert_eq!(store.get::<Note>(note.id).unwrap(), Some(note));
        assert_eq!(store.stats().snapshot().open_sessions(), 0);
    }

    #[test]
    fn unsaved_scope_discards() {
        let store = Arc::new(MemoryStore::new());
        let factory = factory(&store);

        let scope = factory
            .create_with_isolation_level(IsolationLevel::Serializable)
            .unwrap();
        let session = scope.get::<MemoryProvider>().unwrap();
        session.lock().put(&Note::new("lost")).unwrap();
        session.lock().flush().unwrap();
        drop(scope);

        assert_eq!(store.count::<Note>(), 0);
        assert!(!session.lock().is_open());
    }

    #[test]
    fn read_only_scope_rejects_writes() {
        let store = Arc::new(MemoryStore::new());
        let factory = factory(&store);

        let scope = factory.create_read_only(JoinOption::JoinExisting).unwrap();
        let session = scope.get::<MemoryProvider>().unwrap();
        assert!(session.lock().put(&Note::new("nope")).is_err());
        scope.dispose().unwrap();
    }
}
