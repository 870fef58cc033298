//! `run`: the full walkthrough.

use crate::app::App;
use crate::domain::UserCreationSpec;
use crate::error::DemoResult;

/// Runs every demo step in order.
pub fn run(app: &App) -> DemoResult<()> {
    // Typical reads and writes.
    println!("Creating a user called Mary...");
    let mary = UserCreationSpec::new("Mary", "mary@example.com");
    app.creation.create_user(&mary)?;
    println!("Done.\n");

    println!("Retrieving our newly created user from the store...");
    println!("OK. Persisted user: {}", app.query.get_user(mary.id)?);

    println!("Retrieving our newly created user via a repository...");
    println!(
        "OK. Persisted user: {}\n",
        app.query.get_user_via_repository(mary.id)?
    );

    // Nested scopes.
    println!("Creating 2 new users called John and Jeanne in an atomic transaction...");
    let john = UserCreationSpec::new("John", "john@example.com");
    let jeanne = UserCreationSpec::new("Jeanne", "jeanne@example.com");
    app.creation
        .create_list_of_users(&[john.clone(), jeanne.clone()])?;
    println!("Done.\n");

    println!("Retrieving our newly created users from the store...");
    let created = app.query.get_users(&[john.id, jeanne.id])?;
    println!("OK. Found {} persisted users.\n", created.len());

    // Nested scopes in the face of a failure.
    println!(
        "Creating 2 new users called Julie and Marc in an atomic transaction. \
         The second one fails on purpose to show that neither is persisted..."
    );
    let julie = UserCreationSpec::new("Julie", "julie@example.com");
    let marc = UserCreationSpec::new("Marc", "marc@example.com");
    match app
        .creation
        .create_list_of_users_with_intentional_failure(&[julie.clone(), marc.clone()])
    {
        Ok(()) => println!("Done.\n"),
        Err(err) => println!("{err}\n"),
    }

    println!("Retrieving our newly created users from the store...");
    let maybe_created = app.query.get_users(&[julie.id, marc.id])?;
    println!(
        "Found {} persisted users. Anything other than 0 means the batch was not atomic.\n",
        maybe_created.len()
    );

    // Explicit isolation level.
    println!("Retrieving user John within a READ UNCOMMITTED transaction...");
    match app.query.get_user_uncommitted(john.id)? {
        Some(user) => println!("OK. User found: {user}\n"),
        None => println!("User not found.\n"),
    }

    // Parallel work inside a scope.
    println!("Calculating and storing the credit score of all users in parallel...");
    let count = app.credit_scores.update_credit_score_for_all_users()?;
    println!("Done. Updated {count} users.\n");

    println!("The end.");
    Ok(())
}
