use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use tokio::sync::watch;

use quiz_core::Clock;
use quiz_core::model::{AuthError, HostId, ProviderIdentity, Session, SessionId};
use storage::repository::{HostRepository, NewHostRecord};

use super::provider::IdentityProvider;
use crate::error::AuthFlowError;

/// Length of the anti-forgery state nonce.
const NONCE_LEN: usize = 32;

//
// ─── HANDSHAKE TYPES ───────────────────────────────────────────────────────────
//

/// What `begin_login` hands back to the UI: where to navigate, and the
/// state value the provider must echo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginHandshake {
    pub authorize_url: String,
    pub state: String,
}

/// The provider's callback payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    pub state: String,
    pub code: Option<String>,
    pub error: Option<String>,
}

impl ProviderResponse {
    /// Callback for a granted authorization.
    #[must_use]
    pub fn success(state: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            code: Some(code.into()),
            error: None,
        }
    }

    /// Callback for a provider-reported failure.
    #[must_use]
    pub fn failure(state: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            code: None,
            error: Some(error.into()),
        }
    }
}

/// Read-only auth state for the UI boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthSnapshot {
    Absent,
    Pending,
    LoggedIn {
        session_id: SessionId,
        login: String,
        expires_at: DateTime<Utc>,
    },
}

enum AuthState {
    LoggedOut,
    Pending { nonce: String },
    LoggedIn { session: Session },
}

//
// ─── AUTH SERVICE ──────────────────────────────────────────────────────────────
//

/// Owns the login handshake and the session lifecycle.
///
/// State machine: LoggedOut → (`begin_login`) → Pending →
/// (`complete_login` ok) → LoggedIn, with any `complete_login` failure
/// dropping back to LoggedOut. A second `begin_login` while pending
/// replaces the nonce, which implicitly fails the first handshake.
pub struct AuthService {
    clock: Clock,
    provider: Arc<dyn IdentityProvider>,
    hosts: Arc<dyn HostRepository>,
    state: Mutex<AuthState>,
    snapshot_tx: watch::Sender<AuthSnapshot>,
}

impl AuthService {
    #[must_use]
    pub fn new(
        clock: Clock,
        provider: Arc<dyn IdentityProvider>,
        hosts: Arc<dyn HostRepository>,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(AuthSnapshot::Absent);
        Self {
            clock,
            provider,
            hosts,
            state: Mutex::new(AuthState::LoggedOut),
            snapshot_tx,
        }
    }

    /// Subscribe to auth state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Current auth state as the UI sees it.
    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Starts a login handshake.
    ///
    /// Generates a fresh nonce, moves to Pending, and returns the URL to
    /// navigate to. Completion arrives asynchronously via
    /// `complete_login`.
    ///
    /// # Errors
    ///
    /// Returns `AuthFlowError::Disabled` when no provider is configured;
    /// the auth state is left untouched in that case.
    pub fn begin_login(&self) -> Result<LoginHandshake, AuthFlowError> {
        let nonce: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(NONCE_LEN)
            .map(char::from)
            .collect();
        let authorize_url = self.provider.authorize_url(&nonce)?;

        *self.lock_state() = AuthState::Pending {
            nonce: nonce.clone(),
        };
        self.publish(AuthSnapshot::Pending);
        tracing::debug!("login handshake started");

        Ok(LoginHandshake {
            authorize_url,
            state: nonce,
        })
    }

    /// Consumes the provider callback and, on success, returns the new
    /// session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidState` (wrapped) when the echoed state
    /// does not match the stored nonce; no session is ever created on
    /// that path. Returns `AuthError::ProviderRejected` when the provider
    /// reports failure, and transport or storage errors otherwise. Any
    /// failure of a pending handshake drops the state back to LoggedOut.
    pub async fn complete_login(
        &self,
        response: ProviderResponse,
    ) -> Result<Session, AuthFlowError> {
        // Validate the nonce before anything else; a forged callback must
        // not trigger an exchange.
        {
            let state = self.lock_state();
            match &*state {
                AuthState::Pending { nonce } if *nonce == response.state => {}
                _ => return Err(AuthError::InvalidState.into()),
            }
        }

        match self.finish_login(&response).await {
            Ok(session) => Ok(session),
            Err(err) => {
                self.fail_pending(&response.state);
                tracing::debug!(error = %err, "login failed");
                Err(err)
            }
        }
    }

    /// Drops the current session immediately, regardless of remote
    /// provider state. Calling with no session is a no-op.
    pub fn logout(&self) {
        let mut state = self.lock_state();
        let had_session = matches!(&*state, AuthState::LoggedIn { .. });
        *state = AuthState::LoggedOut;
        drop(state);
        self.publish(AuthSnapshot::Absent);
        if had_session {
            tracing::info!("logged out");
        }
    }

    /// The current session, or `None` when absent or expired. Never
    /// blocks on anything but the in-process state lock.
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        let mut state = self.lock_state();
        if let AuthState::LoggedIn { session } = &*state {
            if session.is_valid(self.clock.now()) {
                return Some(session.clone());
            }
            // Expiry detected: the session is destroyed on read.
            *state = AuthState::LoggedOut;
            drop(state);
            self.publish(AuthSnapshot::Absent);
        }
        None
    }

    async fn finish_login(&self, response: &ProviderResponse) -> Result<Session, AuthFlowError> {
        if let Some(reason) = &response.error {
            return Err(AuthError::ProviderRejected {
                reason: reason.clone(),
            }
            .into());
        }
        let Some(code) = &response.code else {
            return Err(AuthError::ProviderRejected {
                reason: "callback carried no authorization code".into(),
            }
            .into());
        };

        let (grant, identity) = self.provider.exchange_code(code).await?;

        let now = self.clock.now();
        let expires_at = now + Duration::seconds(grant.expires_in_secs.max(0));
        let session = Session::new(
            SessionId::generate(),
            identity.clone(),
            grant.access_token,
            now,
            expires_at,
        )?;

        self.record_host_login(&identity, now).await?;

        // Commit only if this handshake still owns the pending state; a
        // second begin_login in the meantime supersedes this one.
        {
            let mut state = self.lock_state();
            match &*state {
                AuthState::Pending { nonce } if *nonce == response.state => {
                    *state = AuthState::LoggedIn {
                        session: session.clone(),
                    };
                }
                _ => return Err(AuthError::InvalidState.into()),
            }
        }
        self.publish(AuthSnapshot::LoggedIn {
            session_id: session.id(),
            login: session.identity().login.clone(),
            expires_at,
        });
        tracing::info!(login = %session.identity().login, "login completed");

        Ok(session)
    }

    /// Find-or-create the host record for this identity and bump its
    /// last-login timestamp.
    async fn record_host_login(
        &self,
        identity: &ProviderIdentity,
        now: DateTime<Utc>,
    ) -> Result<HostId, AuthFlowError> {
        let id = match self.hosts.get_host_by_twitch_id(&identity.twitch_id).await? {
            Some(host) => host.id(),
            None => {
                self.hosts
                    .insert_host(NewHostRecord {
                        username: identity.login.clone(),
                        twitch_id: identity.twitch_id.clone(),
                        email: identity.email.clone(),
                        created_at: now,
                    })
                    .await?
            }
        };
        self.hosts.set_last_login(id, now).await?;
        Ok(id)
    }

    /// Drop a failed handshake back to LoggedOut, but only while it still
    /// owns the pending state.
    fn fail_pending(&self, nonce: &str) {
        let mut state = self.lock_state();
        if matches!(&*state, AuthState::Pending { nonce: pending } if pending.as_str() == nonce) {
            *state = AuthState::LoggedOut;
            drop(state);
            self.publish(AuthSnapshot::Absent);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, snapshot: AuthSnapshot) {
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}
