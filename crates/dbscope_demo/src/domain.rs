//! Domain model.

use crate::error::{DemoError, DemoResult};
use dbscope_memory::{Entity, EntityId, MemoryProvider};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Marker for the user database.
#[derive(Debug, Clone, Copy)]
pub struct UserDatabase;

/// Provider of user database sessions.
pub type UserProvider = MemoryProvider<UserDatabase>;

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Credit score, 0 until calculated.
    pub credit_score: u8,
    /// Whether the welcome email went out.
    pub welcome_email_sent: bool,
    /// Creation time in seconds since the Unix epoch.
    pub created_on: u64,
}

impl User {
    /// Creates a user from a validated creation request.
    pub fn from_spec(spec: &UserCreationSpec) -> Self {
        Self {
            id: spec.id,
            name: spec.name.clone(),
            email: spec.email.clone(),
            credit_score: 0,
            welcome_email_sent: false,
            created_on: now_secs(),
        }
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";

    fn id(&self) -> EntityId {
        self.id
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Id: {} | Name: {} | Email: {} | CreditScore: {} | WelcomeEmailSent: {} | CreatedOn: {}",
            self.id, self.name, self.email, self.credit_score, self.welcome_email_sent, self.created_on
        )
    }
}

/// Request to create a user.
///
/// The ID is assigned up front so callers can look the user up afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCreationSpec {
    /// ID the user will get.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

impl UserCreationSpec {
    /// Creates a request with a fresh ID.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            email: email.into(),
        }
    }

    /// Checks that the request can be turned into a user.
    pub fn validate(&self) -> DemoResult<()> {
        if self.name.trim().is_empty() {
            return Err(DemoError::invalid_spec("name must not be empty"));
        }
        if !self.email.contains('@') {
            return Err(DemoError::invalid_spec(format!(
                "email [{}] is not a valid address",
                self.email
            )));
        }
        Ok(())
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_validation() {
        assert!(UserCreationSpec::new("Mary", "mary@example.com")
            .validate()
            .is_ok());
        assert!(matches!(
            UserCreationSpec::new(" ", "mary@example.com").validate(),
            Err(DemoError::InvalidSpec { .. })
        ));
        assert!(matches!(
            UserCreationSpec::new("Mary", "mary.example.com").validate(),
            Err(DemoError::InvalidSpec { .. })
        ));
    }

    #[test]
    fn user_from_spec_keeps_the_id() {
        let spec = UserCreationSpec::new("John", "john@example.com");
        let user = User::from_spec(&spec);
        assert_eq!(user.id, spec.id);
        assert_eq!(user.credit_score, 0);
        assert!(!user.welcome_email_sent);
        assert!(user.to_string().contains("Name: John"));
    }
}
