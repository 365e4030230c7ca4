use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::model::ids::SessionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Failures of the login handshake itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthError {
    /// The callback's anti-forgery state did not match the stored nonce.
    #[error("login state mismatch")]
    InvalidState,

    /// The identity provider reported a failure.
    #[error("provider rejected the login: {reason}")]
    ProviderRejected { reason: String },
}

/// Failures constructing a session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session token cannot be empty")]
    MissingToken,
}

//
// ─── IDENTITY ──────────────────────────────────────────────────────────────────
//

/// What the identity provider tells us about the logged-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    pub twitch_id: String,
    pub login: String,
    pub email: Option<String>,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// An authenticated host context.
///
/// A session is either valid (token present, unexpired) or absent; the
/// constructor refuses partial states and expiry is checked on read.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    identity: ProviderIdentity,
    access_token: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session from a completed handshake.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::MissingToken` if the access token is empty.
    pub fn new(
        id: SessionId,
        identity: ProviderIdentity,
        access_token: impl Into<String>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(SessionError::MissingToken);
        }

        Ok(Self {
            id,
            identity,
            access_token,
            created_at,
            expires_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn identity(&self) -> &ProviderIdentity {
        &self.identity
    }

    /// The provider-issued bearer token, opaque to this crate.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the session is still usable at `now`.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

// Token must not leak into logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("login", &self.identity.login)
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn identity() -> ProviderIdentity {
        ProviderIdentity {
            twitch_id: "twitch-1".into(),
            login: "alice".into(),
            email: None,
        }
    }

    #[test]
    fn session_rejects_empty_token() {
        let err = Session::new(
            SessionId::generate(),
            identity(),
            "  ",
            fixed_now(),
            fixed_now() + Duration::hours(1),
        )
        .unwrap_err();
        assert_eq!(err, SessionError::MissingToken);
    }

    #[test]
    fn session_validity_tracks_expiry() {
        let session = Session::new(
            SessionId::generate(),
            identity(),
            "tok",
            fixed_now(),
            fixed_now() + Duration::hours(1),
        )
        .unwrap();
        assert!(session.is_valid(fixed_now()));
        assert!(!session.is_valid(fixed_now() + Duration::hours(1)));
        assert!(!session.is_valid(fixed_now() + Duration::hours(2)));
    }

    #[test]
    fn debug_redacts_token() {
        let session = Session::new(
            SessionId::generate(),
            identity(),
            "super-secret",
            fixed_now(),
            fixed_now() + Duration::hours(1),
        )
        .unwrap();
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
