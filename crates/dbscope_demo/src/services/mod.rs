//! Business logic services.
//!
//! Each public service method is one business transaction: it opens a scope
//! at the top and lets everything it calls join that scope.

mod creation;
mod credit_score;
mod email;
mod query;

pub use creation::UserCreationService;
pub use credit_score::UserCreditScoreService;
pub use email::UserEmailService;
pub use query::UserQueryService;
