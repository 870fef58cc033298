use super::UserEmailService;
use crate::domain::{User, UserCreationSpec};
use crate::error::{DemoError, DemoResult};
use crate::repository::UserRepository;
use dbscope_core::{JoinOption, ScopeFactory};
use tracing::{debug, info};

/// Creates users.
#[derive(Debug, Clone)]
pub struct UserCreationService {
    factory: ScopeFactory,
    repository: UserRepository,
    emails: UserEmailService,
}

impl UserCreationService {
    /// Creates the service.
    pub fn new(factory: ScopeFactory, repository: UserRepository, emails: UserEmailService) -> Self {
        Self {
            factory,
            repository,
            emails,
        }
    }

    /// Creates one user and sends the welcome email.
    ///
    /// When called inside another scope the user is committed with that
    /// scope, and the caller sends the email once it has saved.
    pub fn create_user(&self, spec: &UserCreationSpec) -> DemoResult<()> {
        spec.validate()?;

        let mut scope = self.factory.create(JoinOption::JoinExisting)?;
        let nested = scope.is_nested();

        let user = User::from_spec(spec);
        self.repository.add(&user)?;
        debug!(user = %user.id, nested, "added user");

        scope.save()?;
        scope.dispose()?;

        if !nested {
            info!(user = %spec.id, name = %spec.name, "created user");
            self.emails.send_welcome_email(spec.id)?;
        }
        Ok(())
    }

    /// Creates several users atomically: all of them or none.
    pub fn create_list_of_users(&self, specs: &[UserCreationSpec]) -> DemoResult<()> {
        let mut scope = self.factory.create(JoinOption::JoinExisting)?;
        for spec in specs {
            self.create_user(spec)?;
        }
        scope.save()?;
        scope.dispose()?;

        info!(count = specs.len(), "created users");
        for spec in specs {
            self.emails.send_welcome_email(spec.id)?;
        }
        Ok(())
    }

    /// Like [`create_list_of_users`](Self::create_list_of_users), but fails
    /// on the last user. None of the users are persisted.
    pub fn create_list_of_users_with_intentional_failure(
        &self,
        specs: &[UserCreationSpec],
    ) -> DemoResult<()> {
        let mut scope = self.factory.create(JoinOption::JoinExisting)?;
        for (i, spec) in specs.iter().enumerate() {
            if i + 1 == specs.len() {
                return Err(DemoError::IntentionalFailure {
                    name: spec.name.clone(),
                });
            }
            self.create_user(spec)?;
        }
        scope.save()?;
        scope.dispose()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::app::App;
    use crate::domain::{User, UserCreationSpec};
    use crate::error::DemoError;

    #[test]
    fn create_user_commits_and_sends_email() {
        let app = App::in_memory();
        let spec = UserCreationSpec::new("Mary", "mary@example.com");
        app.creation.create_user(&spec).unwrap();

        let user = app.store.get::<User>(spec.id).unwrap().unwrap();
        assert_eq!(user.name, "Mary");
        assert!(user.welcome_email_sent);
    }

    #[test]
    fn invalid_spec_creates_nothing() {
        let app = App::in_memory();
        let err = app
            .creation
            .create_user(&UserCreationSpec::new("", "nobody@example.com"))
            .unwrap_err();
        assert!(matches!(err, DemoError::InvalidSpec { .. }));
        assert_eq!(app.store.count::<User>(), 0);
    }

    #[test]
    fn list_is_committed_together() {
        let app = App::in_memory();
        let specs = [
            UserCreationSpec::new("John", "john@example.com"),
            UserCreationSpec::new("Jeanne", "jeanne@example.com"),
        ];
        app.creation.create_list_of_users(&specs).unwrap();

        assert_eq!(app.store.count::<User>(), 2);
        for spec in &specs {
            let user = app.store.get::<User>(spec.id).unwrap().unwrap();
            assert!(user.welcome_email_sent);
        }
    }

    #[test]
    fn intentional_failure_persists_nobody() {
        let app = App::in_memory();
        let specs = [
            UserCreationSpec::new("Julie", "julie@example.com"),
            UserCreationSpec::new("Marc", "marc@example.com"),
        ];
        let err = app
            .creation
            .create_list_of_users_with_intentional_failure(&specs)
            .unwrap_err();
        assert!(matches!(err, DemoError::IntentionalFailure { ref name } if name == "Marc"));
        assert_eq!(app.store.count::<User>(), 0);
        assert!(!dbscope_core::ambient::has_ambient_scope());
    }

    #[test]
    fn invalid_user_in_a_list_rolls_back_the_others() {
        let app = App::in_memory();
        let specs = [
            UserCreationSpec::new("John", "john@example.com"),
            UserCreationSpec::new("Broken", "no-at-sign"),
        ];
        assert!(app.creation.create_list_of_users(&specs).is_err());
        assert_eq!(app.store.count::<User>(), 0);
    }
}
