//! Scope factory.

use super::{ReadOnlyScope, Scope, ScopeOptions, Suppressor};
use crate::config::ScopeConfig;
use crate::error::ScopeResult;
use crate::provider::ProviderRegistry;
use crate::types::{IsolationLevel, JoinOption};
use std::sync::Arc;

/// Entry point for creating scopes.
///
/// Holds the provider registry and configuration. Cloning is cheap.
///
/// On a tokio runtime thread, scopes can only be created inside a flow
/// established with [`ambient::flow`](crate::ambient::flow) or
/// [`ambient::flow_sync`](crate::ambient::flow_sync).
///
/// ```rust,ignore
/// let factory = ScopeFactory::new(ProviderRegistry::new().with(provider));
///
/// let mut scope = factory.create(JoinOption::JoinExisting)?;
/// let session = scope.get::<MyProvider>()?;
/// session.lock().put(&user)?;
/// scope.save()?;
/// ```
#[derive(Debug, Clone)]
pub struct ScopeFactory {
    registry: Arc<ProviderRegistry>,
    config: Arc<ScopeConfig>,
}

impl ScopeFactory {
    /// Creates a factory with the default configuration.
    #[must_use]
    pub fn new(registry: ProviderRegistry) -> Self {
        Self::with_config(registry, ScopeConfig::default())
    }

    /// Creates a factory with the given configuration.
    #[must_use]
    pub fn with_config(registry: ProviderRegistry, config: ScopeConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config: Arc::new(config),
        }
    }

    /// Returns the provider registry.
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }

    /// Creates a read-write scope.
    pub fn create(&self, join: JoinOption) -> ScopeResult<Scope> {
        self.create_with_options(ScopeOptions::new().join(join))
    }

    /// Creates a read-write scope using the configured default join option.
    pub fn create_default(&self) -> ScopeResult<Scope> {
        self.create(self.config.default_join)
    }

    /// Creates a read-only scope.
    pub fn create_read_only(&self, join: JoinOption) -> ScopeResult<ReadOnlyScope> {
        Scope::create(
            &self.registry,
            &self.config,
            ScopeOptions::new().join(join).read_only(true),
        )
        .map(ReadOnlyScope::new)
    }

    /// Creates an independent read-write scope with an explicit transaction.
    pub fn create_with_isolation_level(&self, level: IsolationLevel) -> ScopeResult<Scope> {
        self.create_with_options(
            ScopeOptions::new()
                .join(JoinOption::ForceCreateNew)
                .isolation_level(level),
        )
    }

    /// Creates an independent read-only scope with an explicit transaction.
    pub fn create_read_only_with_isolation_level(
        &self,
        level: IsolationLevel,
    ) -> ScopeResult<ReadOnlyScope> {
        Scope::create(
            &self.registry,
            &self.config,
            ScopeOptions::new()
                .join(JoinOption::ForceCreateNew)
                .read_only(true)
                .isolation_level(level),
        )
        .map(ReadOnlyScope::new)
    }

    /// Creates a scope from explicit options.
    pub fn create_with_options(&self, options: ScopeOptions) -> ScopeResult<Scope> {
        Scope::create(&self.registry, &self.config, options)
    }

    /// Hides the ambient scope until the returned token is released.
    ///
    /// Acquire one before fanning out work to parallel flows from inside a
    /// scope.
    pub fn suppress_ambient_scope(&self) -> Suppressor {
        Suppressor::new()
    }
}
