use crate::domain::{User, UserProvider};
use crate::error::{DemoError, DemoResult};
use dbscope_core::{ambient, JoinOption, ScopeFactory};
use dbscope_memory::EntityId;
use rand::Rng;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Calculates and stores credit scores.
///
/// Calculating one score is slow, so the batch methods fan out. Parallel
/// workers must never inherit the caller's scope: they would share its
/// session across threads. [`update_credit_score_for_all_users`] suppresses
/// the ambient scope before starting threads, and
/// [`update_credit_scores_in_tasks`] starts every task in a fresh flow.
///
/// [`update_credit_score_for_all_users`]: Self::update_credit_score_for_all_users
/// [`update_credit_scores_in_tasks`]: Self::update_credit_scores_in_tasks
#[derive(Debug, Clone)]
pub struct UserCreditScoreService {
    factory: ScopeFactory,
    delay_ms: (u64, u64),
}

impl UserCreditScoreService {
    /// Creates the service.
    pub fn new(factory: ScopeFactory) -> Self {
        Self {
            factory,
            delay_ms: (30, 100),
        }
    }

    /// Sets the simulated calculation time range, in milliseconds.
    #[cfg(test)]
    #[must_use]
    pub fn with_delay_ms(mut self, min: u64, max: u64) -> Self {
        self.delay_ms = (min, max.max(min + 1));
        self
    }

    /// Updates every user's score on one thread per user.
    ///
    /// Each worker saves its own scope. The outer scope has nothing left to
    /// commit when it saves.
    pub fn update_credit_score_for_all_users(&self) -> DemoResult<usize> {
        let mut scope = self.factory.create(JoinOption::JoinExisting)?;
        let ids = self.user_ids(&scope)?;
        info!(count = ids.len(), "calculating credit scores in parallel");

        {
            let _suppressor = self.factory.suppress_ambient_scope();
            std::thread::scope(|s| {
                let workers: Vec<_> = ids
                    .iter()
                    .map(|&id| s.spawn(move || self.update_credit_score(id)))
                    .collect();
                workers.into_iter().try_for_each(|worker| {
                    worker
                        .join()
                        .map_err(|_| DemoError::worker("credit score thread panicked"))?
                        .map(|_| ())
                })
            })?;
        }

        scope.save()?;
        scope.dispose()?;
        Ok(ids.len())
    }

    /// Updates every user's score one after another.
    ///
    /// The updates join the outer scope and commit together with it.
    pub fn update_credit_score_for_all_users_sequentially(&self) -> DemoResult<usize> {
        let mut scope = self.factory.create(JoinOption::JoinExisting)?;
        let ids = self.user_ids(&scope)?;
        info!(count = ids.len(), "calculating credit scores sequentially");

        for &id in &ids {
            self.update_credit_score(id)?;
        }

        scope.save()?;
        scope.dispose()?;
        Ok(ids.len())
    }

    /// Updates every user's score in one tokio task per user.
    ///
    /// Must be awaited inside an [`ambient::flow`].
    pub async fn update_credit_scores_in_tasks(&self) -> DemoResult<usize> {
        let ids = {
            let scope = self.factory.create_read_only(JoinOption::JoinExisting)?;
            let ids: Vec<EntityId> = scope
                .get::<UserProvider>()?
                .lock()
                .all::<User>()?
                .into_iter()
                .map(|user| user.id)
                .collect();
            scope.dispose()?;
            ids
        };
        info!(count = ids.len(), "calculating credit scores in tasks");

        let mut tasks = JoinSet::new();
        for &id in &ids {
            let service = self.clone();
            tasks.spawn(ambient::flow(async move {
                service.update_credit_score_async(id).await
            }));
        }
        while let Some(joined) = tasks.join_next().await {
            joined.map_err(|err| DemoError::worker(err.to_string()))??;
        }
        Ok(ids.len())
    }

    /// Calculates and stores one user's score.
    pub fn update_credit_score(&self, user_id: EntityId) -> DemoResult<u8> {
        let mut scope = self.factory.create(JoinOption::JoinExisting)?;
        let session = scope.get::<UserProvider>()?;
        let mut user = session
            .lock()
            .get::<User>(user_id)?
            .ok_or(DemoError::UserNotFound { id: user_id })?;

        let (delay, score) = self.calculate();
        std::thread::sleep(delay);
        user.credit_score = score;
        session.lock().put(&user)?;
        debug!(user = %user_id, score, "updated credit score");

        scope.save()?;
        scope.dispose()?;
        Ok(score)
    }

    async fn update_credit_score_async(&self, user_id: EntityId) -> DemoResult<u8> {
        let mut scope = self.factory.create(JoinOption::JoinExisting)?;
        let session = scope.get::<UserProvider>()?;
        let user = session.lock().get::<User>(user_id)?;
        let mut user = user.ok_or(DemoError::UserNotFound { id: user_id })?;

        let (delay, score) = self.calculate();
        tokio::time::sleep(delay).await;
        user.credit_score = score;
        session.lock().put(&user)?;
        debug!(user = %user_id, score, "updated credit score");

        scope.save()?;
        scope.dispose()?;
        Ok(score)
    }

    fn user_ids(&self, scope: &dbscope_core::Scope) -> DemoResult<Vec<EntityId>> {
        let users = scope.get::<UserProvider>()?.lock().all::<User>()?;
        Ok(users.into_iter().map(|user| user.id).collect())
    }

    fn calculate(&self) -> (Duration, u8) {
        let mut rng = rand::thread_rng();
        let (min, max) = self.delay_ms;
        (
            Duration::from_millis(rng.gen_range(min..max)),
            rng.gen_range(1..100),
        )
    }
}
