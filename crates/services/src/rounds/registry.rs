use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use quiz_core::model::SessionId;

use super::host::RoundHost;
use crate::error::RoundFlowError;

/// Tracks live rounds, at most one per hosting session.
///
/// The process may host many concurrent rounds; each serializes its own
/// mutations inside its `RoundHost`, this registry only maps sessions to
/// hosts.
#[derive(Default)]
pub struct HostRegistry {
    rounds: Mutex<HashMap<SessionId, Arc<RoundHost>>>,
}

impl HostRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a live round for `session`.
    ///
    /// # Errors
    ///
    /// Returns `RoundFlowError::AlreadyHosting` when the session already
    /// has a live round.
    pub fn register(
        &self,
        session: SessionId,
        host: Arc<RoundHost>,
    ) -> Result<(), RoundFlowError> {
        let mut rounds = self.lock();
        if rounds.contains_key(&session) {
            return Err(RoundFlowError::AlreadyHosting(session));
        }
        rounds.insert(session, host);
        Ok(())
    }

    /// The live round hosted by `session`, if any.
    #[must_use]
    pub fn get(&self, session: SessionId) -> Option<Arc<RoundHost>> {
        self.lock().get(&session).cloned()
    }

    /// Drops a session's live round, returning it if one was registered.
    pub fn remove(&self, session: SessionId) -> Option<Arc<RoundHost>> {
        self.lock().remove(&session)
    }

    /// Number of live rounds.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<RoundHost>>> {
        self.rounds.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
