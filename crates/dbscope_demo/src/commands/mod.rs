//! CLI command implementations.

pub mod credit_scores;
pub mod run;
pub mod users;

use crate::domain::User;
use crate::error::DemoResult;
use serde::Serialize;

/// Output format of listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Human-readable lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Prints `value` as JSON, or each user as a line of text.
pub(crate) fn print_users<T: Serialize>(users: &[User], value: &T, format: Format) -> DemoResult<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(value)?),
        Format::Text => {
            for user in users {
                println!("{user}");
            }
        }
    }
    Ok(())
}
