//! User repository over the ambient session.
//!
//! The repository never opens a session. It finds the one belonging to the
//! ambient scope, so every call made during one unit of work sees the same
//! pending writes. Calling it outside a scope is an error.

use crate::domain::{User, UserProvider};
use crate::error::DemoResult;
use dbscope_core::{AmbientLocator, SharedHandle};
use dbscope_memory::{EntityId, MemorySession};

/// Queries and writes users through the ambient session.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserRepository {
    locator: AmbientLocator,
}

impl UserRepository {
    /// Creates a repository.
    pub const fn new() -> Self {
        Self {
            locator: AmbientLocator::new(),
        }
    }

    fn session(&self) -> DemoResult<SharedHandle<MemorySession>> {
        Ok(self.locator.require::<UserProvider>()?)
    }

    /// Returns the user with `id`, if any.
    pub fn get(&self, id: EntityId) -> DemoResult<Option<User>> {
        Ok(self.session()?.lock().get::<User>(id)?)
    }

    /// Adds or replaces a user.
    pub fn add(&self, user: &User) -> DemoResult<()> {
        Ok(self.session()?.lock().put(user)?)
    }

    /// Returns every user.
    pub fn all(&self) -> DemoResult<Vec<User>> {
        Ok(self.session()?.lock().all::<User>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DemoError;
    use dbscope_core::{JoinOption, ScopeError};

    #[test]
    fn outside_a_scope_is_an_error() {
        let repository = UserRepository::new();
        let err = repository.get(EntityId::new()).unwrap_err();
        assert!(matches!(
            err,
            DemoError::Scope(ScopeError::NoAmbientScope { .. })
        ));
    }

    #[test]
    fn sees_writes_of_the_ambient_scope() {
        let app = crate::app::App::in_memory();
        let repository = UserRepository::new();
        let user = User::from_spec(&crate::domain::UserCreationSpec::new(
            "Mary",
            "mary@example.com",
        ));

        let scope = app.factory.create(JoinOption::JoinExisting).unwrap();
        repository.add(&user).unwrap();
        assert_eq!(repository.get(user.id).unwrap(), Some(user.clone()));
        assert_eq!(repository.all().unwrap().len(), 1);
        scope.dispose().unwrap();

        // Never saved, so nothing reached the store.
        assert_eq!(app.store.count::<User>(), 0);
    }
}
