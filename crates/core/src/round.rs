use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{AnswerRecord, Player, PlayerId, Question, QuizId, RoundId, SessionId};
use crate::scoring::{RankEntry, ScoringPolicy, rank};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RoundError {
    #[error("round needs at least one question and one player")]
    EmptyRound,

    #[error("answer window is closed")]
    WindowClosed,

    #[error("{command} is not allowed in {phase}")]
    InvalidTransition { command: &'static str, phase: Phase },

    #[error("unknown player: {0}")]
    UnknownPlayer(PlayerId),

    #[error("option index {index} is out of range")]
    InvalidOption { index: usize },

    #[error("player {0} already answered this question")]
    AlreadyAnswered(PlayerId),
}

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Where a round currently is.
///
/// Phases only ever move forward: Lobby → Question(0) → Grading(0) →
/// Question(1) → … → Results. `reset` does not rewind; it produces a whole
/// new round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lobby,
    Question { index: usize },
    Grading { index: usize },
    Results,
}

impl Phase {
    /// Whether the round has reached its terminal phase.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Results)
    }

    /// Index of the question on stage, if any.
    #[must_use]
    pub fn question_index(self) -> Option<usize> {
        match self {
            Phase::Question { index } | Phase::Grading { index } => Some(index),
            Phase::Lobby | Phase::Results => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Lobby => write!(f, "lobby"),
            Phase::Question { index } => write!(f, "question {index}"),
            Phase::Grading { index } => write!(f, "grading {index}"),
            Phase::Results => write!(f, "results"),
        }
    }
}

//
// ─── ROUND ─────────────────────────────────────────────────────────────────────
//

/// One live quiz round: the single writer for its own phase and scores.
///
/// All mutation goes through the command methods below, which apply the
/// transition rules and nothing else. The round never touches a clock
/// itself; callers pass `now` in so ordering stays testable.
#[derive(Debug, Clone)]
pub struct Round {
    id: RoundId,
    quiz_id: QuizId,
    host_session: SessionId,
    phase: Phase,
    questions: Vec<Question>,
    players: HashMap<PlayerId, Player>,
    scores: HashMap<PlayerId, u32>,
    answers: Vec<AnswerRecord>,
    answered: HashSet<PlayerId>,
    policy: ScoringPolicy,
    started_at: Option<DateTime<Utc>>,
    question_opened_at: Option<DateTime<Utc>>,
    window_deadline: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl Round {
    /// Creates a round in the lobby.
    ///
    /// Emptiness is checked at `start`, not here: a lobby may legitimately
    /// sit open while players join.
    #[must_use]
    pub fn new(
        id: RoundId,
        quiz_id: QuizId,
        host_session: SessionId,
        questions: Vec<Question>,
        players: Vec<Player>,
        policy: ScoringPolicy,
    ) -> Self {
        let players: HashMap<PlayerId, Player> =
            players.into_iter().map(|p| (p.id(), p)).collect();

        Self {
            id,
            quiz_id,
            host_session,
            phase: Phase::Lobby,
            questions,
            players,
            scores: HashMap::new(),
            answers: Vec::new(),
            answered: HashSet::new(),
            policy,
            started_at: None,
            question_opened_at: None,
            window_deadline: None,
            completed_at: None,
        }
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> RoundId {
        self.id
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn host_session(&self) -> SessionId {
        self.host_session
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    #[must_use]
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    #[must_use]
    pub fn scores(&self) -> &HashMap<PlayerId, u32> {
        &self.scores
    }

    #[must_use]
    pub fn score(&self, player: PlayerId) -> Option<u32> {
        self.scores.get(&player).copied()
    }

    #[must_use]
    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    /// Count of answers accepted for the question currently on stage.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answered.len()
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// The question on stage during `Question` and `Grading` phases.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.phase.question_index().and_then(|i| self.questions.get(i))
    }

    /// When the current answer window closes, while one is open.
    #[must_use]
    pub fn window_deadline(&self) -> Option<DateTime<Utc>> {
        match self.phase {
            Phase::Question { .. } => self.window_deadline,
            _ => None,
        }
    }

    /// Final ranking; ties share a rank.
    #[must_use]
    pub fn ranking(&self) -> Vec<RankEntry> {
        rank(&self.scores)
    }

    // Commands

    /// Lobby → Question(0).
    ///
    /// # Errors
    ///
    /// Returns `RoundError::EmptyRound` when no questions or no players are
    /// loaded, `RoundError::InvalidTransition` outside the lobby.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<Phase, RoundError> {
        if self.phase != Phase::Lobby {
            return Err(RoundError::InvalidTransition {
                command: "start",
                phase: self.phase,
            });
        }
        if self.questions.is_empty() || self.players.is_empty() {
            return Err(RoundError::EmptyRound);
        }

        self.scores = self.players.keys().map(|id| (*id, 0)).collect();
        self.started_at = Some(now);
        self.open_question(0, now);
        Ok(self.phase)
    }

    /// Accepts one answer for the question on stage.
    ///
    /// A submission that arrives at or after the window deadline commits
    /// the Grading transition itself and is then rejected; the ordering
    /// decision between a racing close and a racing submit is made right
    /// here, exactly once.
    ///
    /// # Errors
    ///
    /// `WindowClosed` past the deadline or during grading,
    /// `InvalidTransition` in the lobby or at results,
    /// `UnknownPlayer`/`InvalidOption` for bad input, and
    /// `AlreadyAnswered` on a second submission for the same question.
    pub fn submit_answer(
        &mut self,
        player_id: PlayerId,
        option_index: usize,
        now: DateTime<Utc>,
    ) -> Result<&AnswerRecord, RoundError> {
        let index = match self.phase {
            Phase::Question { index } => index,
            // The window for this question already closed.
            Phase::Grading { .. } => return Err(RoundError::WindowClosed),
            Phase::Lobby | Phase::Results => {
                return Err(RoundError::InvalidTransition {
                    command: "submit_answer",
                    phase: self.phase,
                });
            }
        };

        if self.window_deadline.is_some_and(|deadline| now >= deadline) {
            self.phase = Phase::Grading { index };
            return Err(RoundError::WindowClosed);
        }

        if !self.players.contains_key(&player_id) {
            return Err(RoundError::UnknownPlayer(player_id));
        }
        let question = &self.questions[index];
        if option_index >= question.option_count() {
            return Err(RoundError::InvalidOption {
                index: option_index,
            });
        }
        if self.answered.contains(&player_id) {
            return Err(RoundError::AlreadyAnswered(player_id));
        }

        let correct = question.is_correct(option_index);
        let points = self.policy.award(correct);
        let elapsed_ms = self
            .question_opened_at
            .map(|opened| now.signed_duration_since(opened).num_milliseconds())
            .unwrap_or_default();
        let response_time_ms = u32::try_from(elapsed_ms.max(0)).unwrap_or(u32::MAX);

        if points > 0 {
            if let Some(score) = self.scores.get_mut(&player_id) {
                *score = score.saturating_add(points);
            }
        }

        self.answered.insert(player_id);
        self.answers.push(AnswerRecord::new(
            player_id,
            question.id(),
            option_index,
            correct,
            response_time_ms,
            points,
            now,
        ));
        Ok(self.answers.last().expect("answer just pushed"))
    }

    /// Commits the Grading transition when the answer window has elapsed.
    ///
    /// Timer-driven counterpart to `close_answers`; returns the new phase
    /// when a close happened, `None` when the window is still open or no
    /// question is on stage.
    pub fn expire_window(&mut self, now: DateTime<Utc>) -> Option<Phase> {
        if let Phase::Question { index } = self.phase {
            if self.window_deadline.is_some_and(|deadline| now >= deadline) {
                self.phase = Phase::Grading { index };
                return Some(self.phase);
            }
        }
        None
    }

    /// Question(i) → Grading(i).
    ///
    /// # Errors
    ///
    /// Returns `RoundError::InvalidTransition` outside a `Question` phase.
    pub fn close_answers(&mut self) -> Result<Phase, RoundError> {
        let Phase::Question { index } = self.phase else {
            return Err(RoundError::InvalidTransition {
                command: "close_answers",
                phase: self.phase,
            });
        };
        self.phase = Phase::Grading { index };
        Ok(self.phase)
    }

    /// Grading(i) → Question(i+1), or → Results after the last question.
    ///
    /// # Errors
    ///
    /// Returns `RoundError::InvalidTransition` outside a `Grading` phase.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<Phase, RoundError> {
        let Phase::Grading { index } = self.phase else {
            return Err(RoundError::InvalidTransition {
                command: "advance",
                phase: self.phase,
            });
        };

        let next = index + 1;
        if next < self.questions.len() {
            self.open_question(next, now);
        } else {
            self.phase = Phase::Results;
            self.completed_at = Some(now);
        }
        Ok(self.phase)
    }

    /// Results → a brand-new round over the same quiz.
    ///
    /// The new round gets a fresh id, an empty score map, and sits in the
    /// lobby; this round stays at Results untouched.
    ///
    /// # Errors
    ///
    /// Returns `RoundError::InvalidTransition` unless the round is at
    /// `Results`.
    pub fn reset(&self) -> Result<Round, RoundError> {
        if self.phase != Phase::Results {
            return Err(RoundError::InvalidTransition {
                command: "reset",
                phase: self.phase,
            });
        }

        Ok(Round::new(
            RoundId::generate(),
            self.quiz_id,
            self.host_session,
            self.questions.clone(),
            self.players.values().cloned().collect(),
            self.policy,
        ))
    }

    fn open_question(&mut self, index: usize, now: DateTime<Utc>) {
        self.phase = Phase::Question { index };
        self.question_opened_at = Some(now);
        self.window_deadline = Some(now + self.questions[index].time_limit());
        self.answered.clear();
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionId, QuestionOption};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn question(id: u64, correct_index: usize) -> Question {
        let options = (0..3)
            .map(|i| QuestionOption::new(format!("option {i}"), i == correct_index))
            .collect();
        Question::new(
            QuestionId::new(id),
            QuizId::new(1),
            format!("Question {id}?"),
            None,
            30,
            u32::try_from(id).unwrap(),
            options,
            fixed_now(),
        )
        .unwrap()
    }

    fn player(id: u64, nickname: &str) -> Player {
        Player::new(PlayerId::new(id), QuizId::new(1), nickname).unwrap()
    }

    fn two_question_round() -> Round {
        Round::new(
            RoundId::generate(),
            QuizId::new(1),
            SessionId::generate(),
            vec![question(1, 0), question(2, 1)],
            vec![player(1, "Alice")],
            ScoringPolicy::default(),
        )
    }

    #[test]
    fn start_requires_questions_and_players() {
        let mut empty_questions = Round::new(
            RoundId::generate(),
            QuizId::new(1),
            SessionId::generate(),
            Vec::new(),
            vec![player(1, "Alice")],
            ScoringPolicy::default(),
        );
        assert_eq!(empty_questions.start(fixed_now()).unwrap_err(), RoundError::EmptyRound);

        let mut empty_players = Round::new(
            RoundId::generate(),
            QuizId::new(1),
            SessionId::generate(),
            vec![question(1, 0)],
            Vec::new(),
            ScoringPolicy::default(),
        );
        assert_eq!(empty_players.start(fixed_now()).unwrap_err(), RoundError::EmptyRound);
    }

    #[test]
    fn phases_run_in_order() {
        let mut round = two_question_round();
        let now = fixed_now();

        assert_eq!(round.phase(), Phase::Lobby);
        assert_eq!(round.start(now).unwrap(), Phase::Question { index: 0 });
        assert_eq!(round.close_answers().unwrap(), Phase::Grading { index: 0 });
        assert_eq!(round.advance(now).unwrap(), Phase::Question { index: 1 });
        assert_eq!(round.close_answers().unwrap(), Phase::Grading { index: 1 });
        assert_eq!(round.advance(now).unwrap(), Phase::Results);
        assert!(round.phase().is_terminal());
        assert_eq!(round.completed_at(), Some(now));
    }

    #[test]
    fn commands_outside_their_phase_are_invalid() {
        let mut round = two_question_round();

        let err = round.submit_answer(PlayerId::new(1), 0, fixed_now()).unwrap_err();
        assert!(matches!(
            err,
            RoundError::InvalidTransition {
                command: "submit_answer",
                phase: Phase::Lobby
            }
        ));
        assert!(matches!(
            round.close_answers().unwrap_err(),
            RoundError::InvalidTransition { .. }
        ));
        assert!(matches!(
            round.advance(fixed_now()).unwrap_err(),
            RoundError::InvalidTransition { .. }
        ));
        assert!(matches!(
            round.reset().unwrap_err(),
            RoundError::InvalidTransition { .. }
        ));

        round.start(fixed_now()).unwrap();
        let err = round.start(fixed_now()).unwrap_err();
        assert!(matches!(
            err,
            RoundError::InvalidTransition { command: "start", .. }
        ));
    }

    #[test]
    fn correct_answer_scores_fixed_points() {
        let mut round = two_question_round();
        let now = fixed_now();
        round.start(now).unwrap();

        let record = round
            .submit_answer(PlayerId::new(1), 0, now + Duration::seconds(2))
            .unwrap();
        assert!(record.correct);
        assert_eq!(record.points, 1);
        assert_eq!(record.response_time_ms, 2_000);
        assert_eq!(round.score(PlayerId::new(1)), Some(1));
    }

    #[test]
    fn incorrect_answer_leaves_score_unchanged() {
        let mut round = two_question_round();
        let now = fixed_now();
        round.start(now).unwrap();

        let record = round.submit_answer(PlayerId::new(1), 2, now).unwrap();
        assert!(!record.correct);
        assert_eq!(record.points, 0);
        assert_eq!(round.score(PlayerId::new(1)), Some(0));
    }

    #[test]
    fn submit_after_close_is_rejected() {
        let mut round = two_question_round();
        let now = fixed_now();
        round.start(now).unwrap();
        round.close_answers().unwrap();

        let err = round.submit_answer(PlayerId::new(1), 0, now).unwrap_err();
        assert_eq!(err, RoundError::WindowClosed);
        assert_eq!(round.score(PlayerId::new(1)), Some(0));
    }

    #[test]
    fn submit_past_deadline_commits_the_close_and_is_rejected() {
        let mut round = two_question_round();
        let now = fixed_now();
        round.start(now).unwrap();

        let late = now + Duration::seconds(31);
        let err = round.submit_answer(PlayerId::new(1), 0, late).unwrap_err();
        assert_eq!(err, RoundError::WindowClosed);
        // The rejection itself moved the round to grading.
        assert_eq!(round.phase(), Phase::Grading { index: 0 });
        assert_eq!(round.score(PlayerId::new(1)), Some(0));
    }

    #[test]
    fn submit_exactly_at_deadline_is_closed() {
        let mut round = two_question_round();
        let now = fixed_now();
        round.start(now).unwrap();

        let at_deadline = now + Duration::seconds(30);
        let err = round
            .submit_answer(PlayerId::new(1), 0, at_deadline)
            .unwrap_err();
        assert_eq!(err, RoundError::WindowClosed);
    }

    #[test]
    fn unknown_player_and_bad_option_are_rejected() {
        let mut round = two_question_round();
        let now = fixed_now();
        round.start(now).unwrap();

        let err = round.submit_answer(PlayerId::new(99), 0, now).unwrap_err();
        assert_eq!(err, RoundError::UnknownPlayer(PlayerId::new(99)));

        let err = round.submit_answer(PlayerId::new(1), 7, now).unwrap_err();
        assert_eq!(err, RoundError::InvalidOption { index: 7 });
    }

    #[test]
    fn second_answer_for_same_question_is_rejected() {
        let mut round = two_question_round();
        let now = fixed_now();
        round.start(now).unwrap();

        round.submit_answer(PlayerId::new(1), 2, now).unwrap();
        let err = round.submit_answer(PlayerId::new(1), 0, now).unwrap_err();
        assert_eq!(err, RoundError::AlreadyAnswered(PlayerId::new(1)));
        // The wrong first answer still counts; no score either way.
        assert_eq!(round.score(PlayerId::new(1)), Some(0));
    }

    #[test]
    fn answering_reopens_per_question() {
        let mut round = two_question_round();
        let now = fixed_now();
        round.start(now).unwrap();
        round.submit_answer(PlayerId::new(1), 0, now).unwrap();
        round.close_answers().unwrap();
        round.advance(now).unwrap();

        // Same player may answer the next question.
        let record = round.submit_answer(PlayerId::new(1), 1, now).unwrap();
        assert!(record.correct);
        assert_eq!(round.score(PlayerId::new(1)), Some(2));
    }

    #[test]
    fn full_scenario_two_questions_one_player() {
        let mut round = two_question_round();
        let now = fixed_now();

        round.start(now).unwrap();
        assert_eq!(round.phase(), Phase::Question { index: 0 });

        round.submit_answer(PlayerId::new(1), 0, now).unwrap();
        assert_eq!(round.score(PlayerId::new(1)), Some(1));

        round.close_answers().unwrap();
        assert_eq!(round.phase(), Phase::Grading { index: 0 });

        round.advance(now).unwrap();
        assert_eq!(round.phase(), Phase::Question { index: 1 });

        // Wrong answer for question 2 (correct is option 1).
        round.submit_answer(PlayerId::new(1), 0, now).unwrap();
        assert_eq!(round.score(PlayerId::new(1)), Some(1));

        round.close_answers().unwrap();
        round.advance(now).unwrap();
        assert_eq!(round.phase(), Phase::Results);
        assert_eq!(round.score(PlayerId::new(1)), Some(1));

        let ranking = round.ranking();
        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking[0].rank, 1);
        assert_eq!(ranking[0].score, 1);
    }

    #[test]
    fn reset_from_results_yields_fresh_lobby() {
        let mut round = two_question_round();
        let now = fixed_now();
        round.start(now).unwrap();
        round.submit_answer(PlayerId::new(1), 0, now).unwrap();
        round.close_answers().unwrap();
        round.advance(now).unwrap();
        round.close_answers().unwrap();
        round.advance(now).unwrap();
        assert_eq!(round.phase(), Phase::Results);

        let fresh = round.reset().unwrap();
        assert_ne!(fresh.id(), round.id());
        assert_eq!(fresh.phase(), Phase::Lobby);
        assert!(fresh.scores().is_empty());
        assert!(fresh.answers().is_empty());
        assert_eq!(fresh.question_count(), 2);
        assert_eq!(fresh.player_count(), 1);
        // The old round is left at Results.
        assert_eq!(round.phase(), Phase::Results);
    }

    #[test]
    fn expire_window_closes_only_after_deadline() {
        let mut round = two_question_round();
        let now = fixed_now();
        assert_eq!(round.expire_window(now), None);

        round.start(now).unwrap();
        assert_eq!(round.expire_window(now + Duration::seconds(29)), None);
        assert_eq!(round.phase(), Phase::Question { index: 0 });

        let phase = round.expire_window(now + Duration::seconds(30));
        assert_eq!(phase, Some(Phase::Grading { index: 0 }));
        // Idempotent once closed.
        assert_eq!(round.expire_window(now + Duration::seconds(31)), None);
    }

    #[test]
    fn window_deadline_only_visible_while_open() {
        let mut round = two_question_round();
        let now = fixed_now();
        assert_eq!(round.window_deadline(), None);
        round.start(now).unwrap();
        assert_eq!(round.window_deadline(), Some(now + Duration::seconds(30)));
        round.close_answers().unwrap();
        assert_eq!(round.window_deadline(), None);
    }
}
