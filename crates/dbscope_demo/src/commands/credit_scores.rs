//! `credit-scores`.

use crate::app::App;
use crate::error::DemoResult;
use dbscope_core::ambient;
use std::time::Instant;

/// How the scores are calculated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One thread per user, ambient scope suppressed.
    Parallel,
    /// One after another inside the caller's scope.
    Sequential,
    /// One tokio task per user, each in a fresh flow.
    Tasks,
}

/// Runs the credit-scores command.
pub fn run(app: &App, mode: Mode) -> DemoResult<()> {
    let started = Instant::now();
    let count = match mode {
        Mode::Parallel => app.credit_scores.update_credit_score_for_all_users()?,
        Mode::Sequential => app
            .credit_scores
            .update_credit_score_for_all_users_sequentially()?,
        Mode::Tasks => tokio::runtime::Runtime::new()?
            .block_on(ambient::flow(
                app.credit_scores.update_credit_scores_in_tasks(),
            ))?,
    };
    println!(
        "Updated {count} credit score(s) ({mode:?}) in {:.2?}",
        started.elapsed()
    );
    Ok(())
}
