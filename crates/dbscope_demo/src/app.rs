//! Wiring of the demo's store, factory, and services.

use crate::domain::UserProvider;
use crate::error::DemoResult;
use crate::repository::UserRepository;
use crate::services::{
    UserCreationService, UserCreditScoreService, UserEmailService, UserQueryService,
};
use dbscope_core::{ProviderRegistry, ScopeFactory};
use dbscope_memory::{MemoryConfig, MemoryStore};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Everything the commands need, built by hand.
pub struct App {
    /// The user store.
    pub store: Arc<MemoryStore>,
    /// Factory for scopes over the user store.
    pub factory: ScopeFactory,
    /// User creation.
    pub creation: UserCreationService,
    /// User queries.
    pub query: UserQueryService,
    /// Credit score calculation.
    pub credit_scores: UserCreditScoreService,
}

impl App {
    /// Builds the app over an in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Builds the app over the snapshot at `path`, or in memory when `None`.
    ///
    /// A snapshot-backed store writes the snapshot on every commit.
    pub fn open(path: Option<&Path>) -> DemoResult<Self> {
        match path {
            Some(path) => {
                let config = MemoryConfig::new()
                    .snapshot_path(path)
                    .persist_on_commit(true);
                let store = MemoryStore::with_config(config)?;
                info!(path = %path.display(), "opened user store");
                Ok(Self::new(Arc::new(store)))
            }
            None => Ok(Self::in_memory()),
        }
    }

    /// Builds the app over `store`.
    pub fn new(store: Arc<MemoryStore>) -> Self {
        let factory =
            ScopeFactory::new(ProviderRegistry::new().with(UserProvider::new(Arc::clone(&store))));
        let repository = UserRepository::new();
        let emails = UserEmailService::new(factory.clone());
        Self {
            creation: UserCreationService::new(factory.clone(), repository, emails),
            query: UserQueryService::new(factory.clone(), repository),
            credit_scores: UserCreditScoreService::new(factory.clone()),
            store,
            factory,
        }
    }
}
