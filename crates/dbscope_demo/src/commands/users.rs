//! `create-user` and `list-users`.

use super::{print_users, Format};
use crate::app::App;
use crate::domain::{User, UserCreationSpec};
use crate::error::DemoResult;
use serde::Serialize;

/// Users listing.
#[derive(Debug, Serialize)]
pub struct UserList {
    /// Number of users.
    pub count: usize,
    /// The users.
    pub users: Vec<User>,
}

/// Runs the create-user command.
pub fn create(app: &App, name: &str, email: &str, format: Format) -> DemoResult<()> {
    let spec = UserCreationSpec::new(name, email);
    app.creation.create_user(&spec)?;
    let user = app.query.get_user(spec.id)?;
    print_users(std::slice::from_ref(&user), &user, format)
}

/// Runs the list-users command.
pub fn list(app: &App, format: Format) -> DemoResult<()> {
    let mut users = app.query.list_users()?;
    users.sort_by(|a, b| a.created_on.cmp(&b.created_on).then_with(|| a.name.cmp(&b.name)));
    if format == Format::Text {
        println!("{} user(s)", users.len());
    }
    let list = UserList {
        count: users.len(),
        users,
    };
    print_users(&list.users, &list, format)
}
