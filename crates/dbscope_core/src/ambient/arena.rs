//! Generational slot arena.
//!
//! Live scopes are owned here and addressed by [`ScopeId`]. A scope that is
//! never released stays in its slot, which shows up in
//! [`Arena::len`] but cannot corrupt lookups of other scopes.

use crate::types::ScopeId;
use parking_lot::Mutex;
use std::sync::Arc;

struct Slot<T> {
    generation: u32,
    value: Option<Arc<T>>,
}

struct Slots<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

/// Thread-safe arena of shared values.
pub(crate) struct Arena<T> {
    inner: Mutex<Slots<T>>,
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Slots {
                slots: Vec::new(),
                free: Vec::new(),
                live: 0,
            }),
        }
    }

    /// Stores a value and returns its token.
    pub(crate) fn insert(&self, value: Arc<T>) -> ScopeId {
        let mut inner = self.inner.lock();
        inner.live += 1;
        if let Some(index) = inner.free.pop() {
            let slot = &mut inner.slots[index as usize];
            slot.value = Some(value);
            return ScopeId::new(index, slot.generation);
        }
        let index = u32::try_from(inner.slots.len()).unwrap_or(u32::MAX);
        inner.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        ScopeId::new(index, 0)
    }

    /// Resolves a token. Stale tokens resolve to `None`.
    pub(crate) fn get(&self, id: ScopeId) -> Option<Arc<T>> {
        let inner = self.inner.lock();
        inner
            .slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.value.clone())
    }

    /// Returns true if the token still resolves.
    pub(crate) fn contains(&self, id: ScopeId) -> bool {
        self.get(id).is_some()
    }

    /// Removes a value and retires its token.
    pub(crate) fn remove(&self, id: ScopeId) -> Option<Arc<T>> {
        let mut inner = self.inner.lock();
        let slot = inner
            .slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        inner.free.push(id.index());
        inner.live -= 1;
        Some(value)
    }

    /// Returns the number of live values.
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().live
    }
}
