use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::answer::AnswerRecord;
use crate::model::ids::{QuizId, RoundId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RoundSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many answers for a single round: {len}")]
    TooManyAnswers { len: usize },

    #[error("answers submitted ({total}) does not match correct + incorrect ({sum})")]
    CountMismatch { total: u32, sum: u32 },
}

/// Aggregate summary for a finished quiz round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSummary {
    quiz_id: QuizId,
    round_id: RoundId,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    questions_asked: u32,
    answers_submitted: u32,
    correct: u32,
    incorrect: u32,
}

impl RoundSummary {
    /// Rehydrate a round summary from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `RoundSummaryError::CountMismatch` if totals do not align,
    /// or `InvalidTimeRange` if the timestamps are reversed.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        quiz_id: QuizId,
        round_id: RoundId,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        questions_asked: u32,
        answers_submitted: u32,
        correct: u32,
        incorrect: u32,
    ) -> Result<Self, RoundSummaryError> {
        if completed_at < started_at {
            return Err(RoundSummaryError::InvalidTimeRange);
        }
        let sum = correct + incorrect;
        if sum != answers_submitted {
            return Err(RoundSummaryError::CountMismatch {
                total: answers_submitted,
                sum,
            });
        }

        Ok(Self {
            quiz_id,
            round_id,
            started_at,
            completed_at,
            questions_asked,
            answers_submitted,
            correct,
            incorrect,
        })
    }

    /// Build a summary from the answers accepted during a round.
    ///
    /// # Errors
    ///
    /// Returns `RoundSummaryError::InvalidTimeRange` if `completed_at` is
    /// before `started_at`, or `TooManyAnswers` if the answer count cannot
    /// fit in `u32`.
    pub fn from_answers(
        quiz_id: QuizId,
        round_id: RoundId,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        questions_asked: u32,
        answers: &[AnswerRecord],
    ) -> Result<Self, RoundSummaryError> {
        if completed_at < started_at {
            return Err(RoundSummaryError::InvalidTimeRange);
        }

        let mut correct = 0_u32;
        let mut incorrect = 0_u32;
        for answer in answers {
            if answer.correct {
                correct = correct.saturating_add(1);
            } else {
                incorrect = incorrect.saturating_add(1);
            }
        }

        let answers_submitted = u32::try_from(answers.len())
            .map_err(|_| RoundSummaryError::TooManyAnswers { len: answers.len() })?;

        Self::from_persisted(
            quiz_id,
            round_id,
            started_at,
            completed_at,
            questions_asked,
            answers_submitted,
            correct,
            incorrect,
        )
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn round_id(&self) -> RoundId {
        self.round_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn questions_asked(&self) -> u32 {
        self.questions_asked
    }

    #[must_use]
    pub fn answers_submitted(&self) -> u32 {
        self.answers_submitted
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::{PlayerId, QuestionId};
    use crate::time::fixed_now;

    fn record(correct: bool) -> AnswerRecord {
        AnswerRecord::new(
            PlayerId::new(1),
            QuestionId::new(1),
            0,
            correct,
            500,
            u32::from(correct),
            fixed_now(),
        )
    }

    #[test]
    fn summary_counts_answers() {
        let answers = vec![record(true), record(false), record(true)];
        let summary = RoundSummary::from_answers(
            QuizId::new(1),
            RoundId::generate(),
            fixed_now(),
            fixed_now(),
            2,
            &answers,
        )
        .unwrap();

        assert_eq!(summary.answers_submitted(), 3);
        assert_eq!(summary.correct(), 2);
        assert_eq!(summary.incorrect(), 1);
        assert_eq!(summary.questions_asked(), 2);
    }

    #[test]
    fn summary_rejects_reversed_timestamps() {
        let err = RoundSummary::from_answers(
            QuizId::new(1),
            RoundId::generate(),
            fixed_now(),
            fixed_now() - chrono::Duration::seconds(1),
            1,
            &[],
        )
        .unwrap_err();
        assert_eq!(err, RoundSummaryError::InvalidTimeRange);
    }

    #[test]
    fn from_persisted_rejects_count_mismatch() {
        let err = RoundSummary::from_persisted(
            QuizId::new(1),
            RoundId::generate(),
            fixed_now(),
            fixed_now(),
            2,
            5,
            2,
            2,
        )
        .unwrap_err();
        assert_eq!(err, RoundSummaryError::CountMismatch { total: 5, sum: 4 });
    }
}
