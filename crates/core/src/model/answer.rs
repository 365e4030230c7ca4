use chrono::{DateTime, Utc};

use crate::model::ids::{PlayerId, QuestionId};

/// Record of one accepted answer submission.
///
/// Response time is measured from the question opening and kept for future
/// scoring policies; no bonus is computed from it today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub player_id: PlayerId,
    pub question_id: QuestionId,
    pub option_index: usize,
    pub correct: bool,
    pub response_time_ms: u32,
    pub points: u32,
    pub submitted_at: DateTime<Utc>,
}

impl AnswerRecord {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        player_id: PlayerId,
        question_id: QuestionId,
        option_index: usize,
        correct: bool,
        response_time_ms: u32,
        points: u32,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            player_id,
            question_id,
            option_index,
            correct,
            response_time_ms,
            points,
            submitted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn record_creation_works() {
        let rec = AnswerRecord::new(
            PlayerId::new(1),
            QuestionId::new(2),
            0,
            true,
            1_250,
            1,
            fixed_now(),
        );
        assert_eq!(rec.player_id, PlayerId::new(1));
        assert!(rec.correct);
        assert_eq!(rec.points, 1);
        assert_eq!(rec.response_time_ms, 1_250);
    }
}
