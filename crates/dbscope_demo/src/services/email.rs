use crate::domain::{User, UserProvider};
use crate::error::{DemoError, DemoResult};
use dbscope_core::{IsolationLevel, ScopeFactory};
use dbscope_memory::EntityId;
use tracing::info;

/// Sends welcome emails.
#[derive(Debug, Clone)]
pub struct UserEmailService {
    factory: ScopeFactory,
}

impl UserEmailService {
    /// Creates the service.
    pub fn new(factory: ScopeFactory) -> Self {
        Self { factory }
    }

    /// Sends the welcome email and records that it went out.
    ///
    /// Runs in its own scope with an explicit transaction, so the flag is
    /// committed even when the caller's scope later rolls back. The email
    /// cannot be unsent.
    pub fn send_welcome_email(&self, user_id: EntityId) -> DemoResult<()> {
        let mut scope = self
            .factory
            .create_with_isolation_level(IsolationLevel::ReadCommitted)?;
        let session = scope.get::<UserProvider>()?;

        let mut user = session
            .lock()
            .get::<User>(user_id)?
            .ok_or(DemoError::UserNotFound { id: user_id })?;
        if user.welcome_email_sent {
            scope.dispose()?;
            return Ok(());
        }

        info!(user = %user.id, email = %user.email, "sending welcome email");
        user.welcome_email_sent = true;
        session.lock().put(&user)?;

        scope.save()?;
        scope.dispose()?;
        Ok(())
    }
}
