//! dbscope demo
//!
//! A small user database driven through ambient scopes.
//!
//! # Commands
//!
//! - `run` - Walk through every scope feature
//! - `create-user` - Create one user
//! - `list-users` - List every user
//! - `credit-scores` - Recalculate credit scores in parallel or sequentially

mod app;
mod commands;
mod domain;
mod error;
mod repository;
mod services;

use app::App;
use clap::{Parser, Subcommand};
use commands::credit_scores::Mode;
use commands::Format;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Demo of ambient database scopes.
#[derive(Parser)]
#[command(name = "dbscope-demo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Snapshot file of the user store (in memory when omitted)
    #[arg(global = true, short, long)]
    data: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Output format
    #[arg(global = true, short, long, value_enum, default_value = "text")]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk through every scope feature
    Run,

    /// Create one user
    CreateUser {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: String,
    },

    /// List every user
    ListUsers,

    /// Recalculate every user's credit score
    CreditScores {
        /// One thread per user (default)
        #[arg(long, conflicts_with_all = ["sequential", "tasks"])]
        parallel: bool,

        /// One user after another
        #[arg(long, conflicts_with = "tasks")]
        sequential: bool,

        /// One async task per user
        #[arg(long)]
        tasks: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("dbscope demo v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let app = App::open(cli.data.as_deref())?;
    match cli.command {
        Commands::Run => commands::run::run(&app)?,
        Commands::CreateUser { name, email } => {
            commands::users::create(&app, &name, &email, cli.format)?;
        }
        Commands::ListUsers => commands::users::list(&app, cli.format)?,
        Commands::CreditScores {
            parallel: _,
            sequential,
            tasks,
        } => {
            let mode = if sequential {
                Mode::Sequential
            } else if tasks {
                Mode::Tasks
            } else {
                Mode::Parallel
            };
            commands::credit_scores::run(&app, mode)?;
        }
        Commands::Version => {}
    }

    tracing::debug!(stats = ?app.store.stats().snapshot(), "store statistics");
    Ok(())
}
