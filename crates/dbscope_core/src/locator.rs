//! Ambient locator.
//!
//! Lets code below a scope (repositories, mostly) reach the ambient handle
//! without being handed the scope.

use crate::ambient;
use crate::error::{ScopeError, ScopeResult};
use crate::provider::{ProviderId, ResourceProvider, SharedHandle};
use std::fmt;
use std::marker::PhantomData;

/// Resolves handles from the ambient scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmbientLocator;

impl AmbientLocator {
    /// Creates a locator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns the ambient handle of provider `P`.
    ///
    /// `Ok(None)` when no scope is ambient in this flow.
    pub fn get<P: ResourceProvider>(&self) -> ScopeResult<Option<SharedHandle<P::Handle>>> {
        match ambient::current() {
            Some((_, scope)) => scope.get::<P>().map(Some),
            None => Ok(None),
        }
    }

    /// Returns the ambient handle of provider `P`, failing with
    /// [`ScopeError::NoAmbientScope`] outside a scope.
    pub fn require<P: ResourceProvider>(&self) -> ScopeResult<SharedHandle<P::Handle>> {
        self.get::<P>()?.ok_or(ScopeError::NoAmbientScope {
            provider: ProviderId::of::<P>().name(),
        })
    }
}

/// Locator bound to a single provider type.
pub struct SessionLocator<P> {
    _provider: PhantomData<fn() -> P>,
}

impl<P: ResourceProvider> SessionLocator<P> {
    /// Creates a locator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _provider: PhantomData,
        }
    }

    /// Returns the ambient handle, or `None` outside a scope.
    pub fn get(&self) -> ScopeResult<Option<SharedHandle<P::Handle>>> {
        AmbientLocator.get::<P>()
    }

    /// Returns the ambient handle, failing outside a scope.
    pub fn require(&self) -> ScopeResult<SharedHandle<P::Handle>> {
        AmbientLocator.require::<P>()
    }
}

impl<P: ResourceProvider> Default for SessionLocator<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for SessionLocator<P> {
    fn clone(&self) -> Self {
        Self {
            _provider: PhantomData,
        }
    }
}

impl<P> fmt::Debug for SessionLocator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionLocator")
            .field("provider", &std::any::type_name::<P>())
            .finish()
    }
}
