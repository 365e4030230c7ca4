use std::collections::HashMap;

use chrono::{DateTime, Utc};

use quiz_core::model::{PlayerId, QuestionId, QuizId, RoundId};
use quiz_core::round::{Phase, Round};

/// One selectable option as players see it; the correct flag never leaves
/// the server side of the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub index: usize,
    pub text: String,
}

/// The question on stage, shown during `Question` and `Grading` phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub id: QuestionId,
    pub index: usize,
    pub total: usize,
    pub text: String,
    pub image_url: Option<String>,
    pub options: Vec<OptionView>,
    pub closes_at: Option<DateTime<Utc>>,
}

/// One scoreboard row; ties share a rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRow {
    pub rank: usize,
    pub player_id: PlayerId,
    pub nickname: String,
    pub score: u32,
}

/// Read-only view of a round for the UI boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSnapshot {
    pub round_id: RoundId,
    pub quiz_id: QuizId,
    pub phase: Phase,
    pub question: Option<QuestionView>,
    pub scoreboard: Vec<ScoreRow>,
    pub answered: usize,
    pub player_count: usize,
}

impl RoundSnapshot {
    #[must_use]
    pub fn of(round: &Round) -> Self {
        let question = round.phase().question_index().and_then(|index| {
            round.current_question().map(|q| QuestionView {
                id: q.id(),
                index,
                total: round.question_count(),
                text: q.text().to_owned(),
                image_url: q.image_url().map(|u| u.as_str().to_owned()),
                options: q
                    .options()
                    .iter()
                    .enumerate()
                    .map(|(i, option)| OptionView {
                        index: i,
                        text: option.text.clone(),
                    })
                    .collect(),
                closes_at: round.window_deadline(),
            })
        });

        let nicknames: HashMap<PlayerId, &str> =
            round.players().map(|p| (p.id(), p.nickname())).collect();
        let scoreboard = round
            .ranking()
            .into_iter()
            .map(|entry| ScoreRow {
                rank: entry.rank,
                player_id: entry.player_id,
                nickname: nicknames
                    .get(&entry.player_id)
                    .copied()
                    .unwrap_or_default()
                    .to_owned(),
                score: entry.score,
            })
            .collect();

        Self {
            round_id: round.id(),
            quiz_id: round.quiz_id(),
            phase: round.phase(),
            question,
            scoreboard,
            answered: round.answered_count(),
            player_count: round.player_count(),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Player, Question, QuestionOption, SessionId};
    use quiz_core::scoring::ScoringPolicy;
    use quiz_core::time::fixed_now;

    fn round() -> Round {
        let options = vec![
            QuestionOption::new("yes", true),
            QuestionOption::new("no", false),
        ];
        let question = Question::new(
            QuestionId::new(1),
            QuizId::new(1),
            "Is this a question?",
            None,
            30,
            0,
            options,
            fixed_now(),
        )
        .unwrap();
        let player = Player::new(PlayerId::new(1), QuizId::new(1), "Alice").unwrap();
        Round::new(
            RoundId::generate(),
            QuizId::new(1),
            SessionId::generate(),
            vec![question],
            vec![player],
            ScoringPolicy::default(),
        )
    }

    #[test]
    fn lobby_snapshot_has_no_question() {
        let snapshot = RoundSnapshot::of(&round());
        assert_eq!(snapshot.phase, Phase::Lobby);
        assert!(snapshot.question.is_none());
        assert!(snapshot.scoreboard.is_empty());
        assert!(!snapshot.is_complete());
    }

    #[test]
    fn question_snapshot_withholds_the_answer() {
        let mut round = round();
        round.start(fixed_now()).unwrap();

        let snapshot = RoundSnapshot::of(&round);
        let question = snapshot.question.expect("question on stage");
        assert_eq!(question.index, 0);
        assert_eq!(question.total, 1);
        assert_eq!(question.options.len(), 2);
        // Option views carry text and position only.
        assert_eq!(question.options[0].text, "yes");
        assert!(question.closes_at.is_some());

        assert_eq!(snapshot.scoreboard.len(), 1);
        assert_eq!(snapshot.scoreboard[0].nickname, "Alice");
        assert_eq!(snapshot.scoreboard[0].score, 0);
    }
}
