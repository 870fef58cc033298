//! Registry of configured providers.

use super::{ProviderId, ResourceProvider};
use crate::error::{ScopeError, ScopeResult};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// The set of providers a scope factory can open handles from.
///
/// Providers are keyed by type. Registering a second provider of the same
/// type replaces the first.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<TypeId, Registered>,
}

struct Registered {
    id: ProviderId,
    provider: Box<dyn Any + Send + Sync>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider, builder style.
    #[must_use]
    pub fn with<P: ResourceProvider>(mut self, provider: P) -> Self {
        self.register(provider);
        self
    }

    /// Adds a provider.
    ///
    /// Returns true if a provider of the same type was replaced.
    pub fn register<P: ResourceProvider>(&mut self, provider: P) -> bool {
        let id = ProviderId::of::<P>();
        self.providers
            .insert(
                TypeId::of::<P>(),
                Registered {
                    id,
                    provider: Box::new(provider),
                },
            )
            .is_some()
    }

    /// Looks up the provider of type `P`.
    pub fn provider<P: ResourceProvider>(&self) -> ScopeResult<&P> {
        self.providers
            .get(&TypeId::of::<P>())
            .and_then(|registered| registered.provider.downcast_ref::<P>())
            .ok_or(ScopeError::ProviderNotRegistered {
                provider: ProviderId::of::<P>().name(),
            })
    }

    /// Returns true if a provider of type `P` is registered.
    #[must_use]
    pub fn contains<P: ResourceProvider>(&self) -> bool {
        self.providers.contains_key(&TypeId::of::<P>())
    }

    /// Returns the identities of every registered provider.
    pub fn ids(&self) -> impl Iterator<Item = ProviderId> + '_ {
        self.providers.values().map(|registered| registered.id)
    }

    /// Returns the number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ids()).finish()
    }
}
