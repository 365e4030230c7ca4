use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{HostId, QuizId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Editorial state of a quiz.
///
/// A round can only be hosted from a `Ready` quiz; `Draft` quizzes are
/// still being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizStatus {
    Draft,
    Ready,
}

impl QuizStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuizStatus::Draft => "draft",
            QuizStatus::Ready => "ready",
        }
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// A named set of questions owned by a host.
#[derive(Debug, Clone, PartialEq)]
pub struct Quiz {
    id: QuizId,
    host_id: HostId,
    title: String,
    description: Option<String>,
    status: QuizStatus,
    created_at: DateTime<Utc>,
}

impl Quiz {
    /// Creates a new quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyTitle` if the title is empty or
    /// whitespace-only.
    pub fn new(
        id: QuizId,
        host_id: HostId,
        title: impl Into<String>,
        description: Option<String>,
        status: QuizStatus,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(QuizError::EmptyTitle);
        }

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(Self {
            id,
            host_id,
            title: title.trim().to_owned(),
            description,
            status,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn host_id(&self) -> HostId {
        self.host_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn status(&self) -> QuizStatus {
        self.status
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Marks the quiz as ready to host.
    pub fn publish(&mut self) {
        self.status = QuizStatus::Ready;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn quiz_rejects_empty_title() {
        let err = Quiz::new(
            QuizId::new(1),
            HostId::new(1),
            "  ",
            None,
            QuizStatus::Draft,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, QuizError::EmptyTitle);
    }

    #[test]
    fn quiz_trims_title_and_filters_empty_description() {
        let quiz = Quiz::new(
            QuizId::new(1),
            HostId::new(2),
            "  Friday Trivia  ",
            Some("   ".into()),
            QuizStatus::Draft,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(quiz.title(), "Friday Trivia");
        assert_eq!(quiz.description(), None);
        assert_eq!(quiz.host_id(), HostId::new(2));
    }

    #[test]
    fn publish_moves_quiz_to_ready() {
        let mut quiz = Quiz::new(
            QuizId::new(1),
            HostId::new(1),
            "Movies",
            None,
            QuizStatus::Draft,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(quiz.status(), QuizStatus::Draft);
        quiz.publish();
        assert_eq!(quiz.status(), QuizStatus::Ready);
    }

    #[test]
    fn status_as_str() {
        assert_eq!(QuizStatus::Draft.as_str(), "draft");
        assert_eq!(QuizStatus::Ready.as_str(), "ready");
    }
}
