use thiserror::Error;

use crate::model::ids::{PlayerId, QuizId};

/// Maximum nickname length, matching the persisted column width.
pub const MAX_NICKNAME_LEN: usize = 50;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlayerError {
    #[error("nickname cannot be empty")]
    EmptyNickname,

    #[error("nickname too long: {len} chars (max {MAX_NICKNAME_LEN})")]
    NicknameTooLong { len: usize },
}

/// Someone eligible to submit answers and accrue score in a round.
///
/// Nicknames are unique per quiz; uniqueness is enforced at the storage
/// seam, this type only validates shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    id: PlayerId,
    quiz_id: QuizId,
    nickname: String,
}

impl Player {
    /// Creates a new player.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError` if the nickname is empty or longer than
    /// `MAX_NICKNAME_LEN` characters after trimming.
    pub fn new(
        id: PlayerId,
        quiz_id: QuizId,
        nickname: impl Into<String>,
    ) -> Result<Self, PlayerError> {
        let nickname = nickname.into();
        let trimmed = nickname.trim();
        if trimmed.is_empty() {
            return Err(PlayerError::EmptyNickname);
        }
        let len = trimmed.chars().count();
        if len > MAX_NICKNAME_LEN {
            return Err(PlayerError::NicknameTooLong { len });
        }

        Ok(Self {
            id,
            quiz_id,
            nickname: trimmed.to_owned(),
        })
    }

    #[must_use]
    pub fn id(&self) -> PlayerId {
        self.id
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn nickname(&self) -> &str {
        &self.nickname
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_trims_nickname() {
        let p = Player::new(PlayerId::new(1), QuizId::new(1), "  Alice  ").unwrap();
        assert_eq!(p.nickname(), "Alice");
    }

    #[test]
    fn player_rejects_empty_nickname() {
        let err = Player::new(PlayerId::new(1), QuizId::new(1), "   ").unwrap_err();
        assert_eq!(err, PlayerError::EmptyNickname);
    }

    #[test]
    fn player_rejects_long_nickname() {
        let long = "x".repeat(MAX_NICKNAME_LEN + 1);
        let err = Player::new(PlayerId::new(1), QuizId::new(1), long).unwrap_err();
        assert_eq!(err, PlayerError::NicknameTooLong { len: 51 });
    }

    #[test]
    fn player_accepts_max_length() {
        let exact = "x".repeat(MAX_NICKNAME_LEN);
        let p = Player::new(PlayerId::new(1), QuizId::new(1), exact).unwrap();
        assert_eq!(p.nickname().len(), MAX_NICKNAME_LEN);
    }
}
