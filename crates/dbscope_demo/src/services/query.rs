use crate::domain::{User, UserProvider};
use crate::error::{DemoError, DemoResult};
use crate::repository::UserRepository;
use dbscope_core::{IsolationLevel, JoinOption, ScopeFactory};
use dbscope_memory::EntityId;

/// Reads users. Every method runs in a read-only scope.
#[derive(Debug, Clone)]
pub struct UserQueryService {
    factory: ScopeFactory,
    repository: UserRepository,
}

impl UserQueryService {
    /// Creates the service.
    pub fn new(factory: ScopeFactory, repository: UserRepository) -> Self {
        Self {
            factory,
            repository,
        }
    }

    /// Returns one user, using the session directly.
    pub fn get_user(&self, id: EntityId) -> DemoResult<User> {
        let scope = self.factory.create_read_only(JoinOption::JoinExisting)?;
        let user = scope.get::<UserProvider>()?.lock().get::<User>(id)?;
        scope.dispose()?;
        user.ok_or(DemoError::UserNotFound { id })
    }

    /// Returns the users among `ids` that exist.
    pub fn get_users(&self, ids: &[EntityId]) -> DemoResult<Vec<User>> {
        let scope = self.factory.create_read_only(JoinOption::JoinExisting)?;
        let users = scope
            .get::<UserProvider>()?
            .lock()
            .query::<User>(|user| ids.contains(&user.id))?;
        scope.dispose()?;
        Ok(users)
    }

    /// Returns every user.
    pub fn list_users(&self) -> DemoResult<Vec<User>> {
        let scope = self.factory.create_read_only(JoinOption::JoinExisting)?;
        let users = self.repository.all()?;
        scope.dispose()?;
        Ok(users)
    }

    /// Returns one user, going through the repository.
    ///
    /// The service neither knows nor passes the session. The repository
    /// finds the one the scope opened.
    pub fn get_user_via_repository(&self, id: EntityId) -> DemoResult<User> {
        let scope = self.factory.create_read_only(JoinOption::JoinExisting)?;
        let user = self.repository.get(id)?;
        scope.dispose()?;
        user.ok_or(DemoError::UserNotFound { id })
    }

    /// Returns one user read inside a `READ UNCOMMITTED` transaction.
    pub fn get_user_uncommitted(&self, id: EntityId) -> DemoResult<Option<User>> {
        let scope = self
            .factory
            .create_read_only_with_isolation_level(IsolationLevel::ReadUncommitted)?;
        let user = self.repository.get(id)?;
        scope.dispose()?;
        Ok(user)
    }
}
