use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a quiz Host (the original streamer account)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostId(u64);

/// Unique identifier for a Quiz
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuizId(u64);

/// Unique identifier for a Question
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(u64);

/// Unique identifier for a Player
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u64);

macro_rules! numeric_id {
    ($name:ident, $label:literal) => {
        impl $name {
            /// Creates a new id from its raw value
            #[must_use]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map($name::new).map_err(|_| ParseIdError {
                    kind: $label,
                })
            }
        }
    };
}

numeric_id!(HostId, "HostId");
numeric_id!(QuizId, "QuizId");
numeric_id!(QuestionId, "QuestionId");
numeric_id!(PlayerId, "PlayerId");

/// Error type for parsing an id from a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

// ─── Ephemeral Identifiers ─────────────────────────────────────────────────────
//
// Rounds and sessions are created at runtime and never assigned by storage,
// so they carry freshly generated UUIDs instead of row ids.

/// Unique identifier for one live quiz round
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoundId(Uuid);

/// Unique identifier for one login session
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(Uuid);

macro_rules! uuid_id {
    ($name:ident, $label:literal) => {
        impl $name {
            /// Generates a fresh random id
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID
            #[must_use]
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Returns the underlying UUID
            #[must_use]
            pub fn value(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map($name::from_uuid).map_err(|_| ParseIdError {
                    kind: $label,
                })
            }
        }
    };
}

uuid_id!(RoundId, "RoundId");
uuid_id!(SessionId, "SessionId");

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_id_display_and_parse() {
        let id = QuizId::new(42);
        assert_eq!(id.to_string(), "42");
        let parsed: QuizId = "42".parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn player_id_rejects_garbage() {
        let result = "not-a-number".parse::<PlayerId>();
        assert!(result.is_err());
    }

    #[test]
    fn question_id_roundtrip() {
        let original = QuestionId::new(7);
        let parsed: QuestionId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn round_ids_are_unique() {
        assert_ne!(RoundId::generate(), RoundId::generate());
    }

    #[test]
    fn session_id_roundtrip() {
        let original = SessionId::generate();
        let parsed: SessionId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }
}
