use std::sync::Arc;

use quiz_core::Clock;
use storage::repository::Storage;

use crate::auth::{AuthService, IdentityProvider, TwitchProvider};
use crate::error::AppServicesError;
use crate::rounds::RoundLoopService;

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    auth: Arc<AuthService>,
    rounds: Arc<RoundLoopService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, with the Twitch provider
    /// configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(
            &storage,
            clock,
            Arc::new(TwitchProvider::from_env()),
        ))
    }

    /// Build services over an already-assembled storage and provider.
    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(
            clock,
            provider,
            Arc::clone(&storage.hosts),
        ));
        let rounds = Arc::new(RoundLoopService::new(
            clock,
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.players),
            Arc::clone(&storage.answers),
            Arc::clone(&storage.summaries),
        ));

        Self { auth, rounds }
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }

    #[must_use]
    pub fn rounds(&self) -> Arc<RoundLoopService> {
        Arc::clone(&self.rounds)
    }
}
