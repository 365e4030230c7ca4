use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::HostId;

/// Maximum username length, matching the persisted column width.
pub const MAX_USERNAME_LEN: usize = 50;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HostError {
    #[error("username cannot be empty")]
    EmptyUsername,

    #[error("username too long: {len} chars (max {MAX_USERNAME_LEN})")]
    UsernameTooLong { len: usize },

    #[error("twitch id cannot be empty")]
    EmptyTwitchId,
}

/// A quizmaster account, keyed to its Twitch identity.
///
/// `last_login` is bumped on every completed login handshake.
#[derive(Debug, Clone, PartialEq)]
pub struct Host {
    id: HostId,
    username: String,
    twitch_id: String,
    email: Option<String>,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl Host {
    /// Creates a new host record.
    ///
    /// # Errors
    ///
    /// Returns `HostError` if the username or twitch id is empty, or the
    /// username exceeds `MAX_USERNAME_LEN` characters.
    pub fn new(
        id: HostId,
        username: impl Into<String>,
        twitch_id: impl Into<String>,
        email: Option<String>,
        created_at: DateTime<Utc>,
        last_login: Option<DateTime<Utc>>,
    ) -> Result<Self, HostError> {
        let username = username.into();
        let username = username.trim();
        if username.is_empty() {
            return Err(HostError::EmptyUsername);
        }
        let len = username.chars().count();
        if len > MAX_USERNAME_LEN {
            return Err(HostError::UsernameTooLong { len });
        }
        let twitch_id = twitch_id.into();
        if twitch_id.trim().is_empty() {
            return Err(HostError::EmptyTwitchId);
        }

        let email = email.map(|e| e.trim().to_owned()).filter(|e| !e.is_empty());

        Ok(Self {
            id,
            username: username.to_owned(),
            twitch_id: twitch_id.trim().to_owned(),
            email,
            created_at,
            last_login,
        })
    }

    #[must_use]
    pub fn id(&self) -> HostId {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn twitch_id(&self) -> &str {
        &self.twitch_id
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.last_login
    }

    /// Records a completed login.
    pub fn touch_login(&mut self, at: DateTime<Utc>) {
        self.last_login = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn host_happy_path() {
        let host = Host::new(
            HostId::new(1),
            "streamer_42",
            "twitch-9001",
            Some("s42@example.com".into()),
            fixed_now(),
            None,
        )
        .unwrap();
        assert_eq!(host.username(), "streamer_42");
        assert_eq!(host.twitch_id(), "twitch-9001");
        assert_eq!(host.email(), Some("s42@example.com"));
        assert_eq!(host.last_login(), None);
    }

    #[test]
    fn host_rejects_empty_fields() {
        let err = Host::new(HostId::new(1), " ", "t", None, fixed_now(), None).unwrap_err();
        assert_eq!(err, HostError::EmptyUsername);

        let err = Host::new(HostId::new(1), "name", "  ", None, fixed_now(), None).unwrap_err();
        assert_eq!(err, HostError::EmptyTwitchId);
    }

    #[test]
    fn touch_login_sets_last_login() {
        let mut host =
            Host::new(HostId::new(1), "name", "tid", None, fixed_now(), None).unwrap();
        host.touch_login(fixed_now());
        assert_eq!(host.last_login(), Some(fixed_now()));
    }
}
