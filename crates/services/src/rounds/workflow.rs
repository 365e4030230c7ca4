use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::{AnswerRecord, PlayerId, QuizId, QuizStatus, RoundId, Session, SessionId};
use quiz_core::round::{Phase, Round, RoundError};
use quiz_core::scoring::ScoringPolicy;
use storage::repository::{
    AnswerLogRepository, PlayerRepository, QuestionRepository, QuizRepository,
    RoundSummaryRepository,
};

use super::host::RoundHost;
use super::registry::HostRegistry;
use crate::error::RoundFlowError;

/// Orchestrates storage-backed round hosting.
///
/// Loads quizzes into live rounds, persists every accepted answer, and
/// writes the round summary exactly once when a round reaches Results.
#[derive(Clone)]
pub struct RoundLoopService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    questions: Arc<dyn QuestionRepository>,
    players: Arc<dyn PlayerRepository>,
    answers: Arc<dyn AnswerLogRepository>,
    summaries: Arc<dyn RoundSummaryRepository>,
    registry: Arc<HostRegistry>,
    policy: ScoringPolicy,
}

impl RoundLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        questions: Arc<dyn QuestionRepository>,
        players: Arc<dyn PlayerRepository>,
        answers: Arc<dyn AnswerLogRepository>,
        summaries: Arc<dyn RoundSummaryRepository>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            questions,
            players,
            answers,
            summaries,
            registry: Arc::new(HostRegistry::new()),
            policy: ScoringPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ScoringPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Creates a lobby over `quiz_id`, hosted by `session`.
    ///
    /// # Errors
    ///
    /// Returns `QuizNotFound`/`QuizNotReady` for bad targets,
    /// `AlreadyHosting` when the session has a live round, and storage
    /// errors from loading questions and players.
    pub async fn host_round(
        &self,
        session: &Session,
        quiz_id: QuizId,
    ) -> Result<Arc<RoundHost>, RoundFlowError> {
        let quiz = self
            .quizzes
            .get_quiz(quiz_id)
            .await?
            .ok_or(RoundFlowError::QuizNotFound(quiz_id))?;
        if quiz.status() != QuizStatus::Ready {
            return Err(RoundFlowError::QuizNotReady(quiz_id));
        }

        let questions = self.questions.list_questions(quiz_id).await?;
        let players = self.players.list_players(quiz_id).await?;
        let round = Round::new(
            RoundId::generate(),
            quiz_id,
            session.id(),
            questions,
            players,
            self.policy,
        );
        let round_id = round.id();

        let host = Arc::new(RoundHost::new(self.clock, round));
        self.registry.register(session.id(), Arc::clone(&host))?;
        tracing::info!(%quiz_id, %round_id, "round hosted");
        Ok(host)
    }

    /// The live round hosted by `session`, if any.
    #[must_use]
    pub fn live_round(&self, session: SessionId) -> Option<Arc<RoundHost>> {
        self.registry.get(session)
    }

    /// Ends hosting for `session`, dropping its live round.
    pub fn abort(&self, session: SessionId) -> bool {
        let removed = self.registry.remove(session).is_some();
        if removed {
            tracing::info!(%session, "round aborted");
        }
        removed
    }

    /// Lobby → Question(0).
    ///
    /// # Errors
    ///
    /// Propagates `RoundError` from the round machine.
    pub async fn start(&self, host: &RoundHost) -> Result<Phase, RoundFlowError> {
        let phase = host.start().await?;
        tracing::info!(%phase, "round started");
        Ok(phase)
    }

    /// Accepts and persists one answer.
    ///
    /// # Errors
    ///
    /// Propagates `RoundError` for rejected submissions and storage errors
    /// from the answer log.
    pub async fn submit_answer(
        &self,
        host: &RoundHost,
        player: PlayerId,
        option_index: usize,
    ) -> Result<AnswerRecord, RoundFlowError> {
        let record = host.submit_answer(player, option_index).await?;
        let round_id = host.round_id().await;
        self.answers.append_answer(round_id, &record).await?;
        Ok(record)
    }

    /// Commits the Grading transition if the answer window has elapsed;
    /// the driver's timer tick.
    pub async fn expire_window(&self, host: &RoundHost) -> Option<Phase> {
        let phase = host.expire_window().await;
        if let Some(phase) = phase {
            tracing::debug!(%phase, "answer window elapsed");
        }
        phase
    }

    /// Question(i) → Grading(i).
    ///
    /// # Errors
    ///
    /// Propagates `RoundError` from the round machine.
    pub async fn close_answers(&self, host: &RoundHost) -> Result<Phase, RoundFlowError> {
        let phase = host.close_answers().await?;
        tracing::debug!(%phase, "answers closed");
        Ok(phase)
    }

    /// Grading(i) → Question(i+1) or Results; persists the summary on the
    /// Results transition.
    ///
    /// # Errors
    ///
    /// Propagates `RoundError`, summary reconciliation errors, and storage
    /// errors from summary persistence.
    pub async fn advance(&self, host: &RoundHost) -> Result<Phase, RoundFlowError> {
        let phase = host.advance().await?;
        if phase.is_terminal() {
            if let Some(summary) = host.build_summary().await? {
                let summary_id = self.summaries.append_summary(&summary).await?;
                host.set_summary_id(summary_id).await;
                tracing::info!(summary_id, "round finalized");
            }
        }
        Ok(phase)
    }

    /// Retry summary persistence after a completed round.
    ///
    /// Useful when the append at the Results transition failed on a
    /// transient storage error.
    ///
    /// # Errors
    ///
    /// Returns `RoundError::InvalidTransition` when the round is not at
    /// Results, storage errors if persistence fails again.
    pub async fn finalize_summary(&self, host: &RoundHost) -> Result<i64, RoundFlowError> {
        if let Some(id) = host.summary_id().await {
            return Ok(id);
        }

        let Some(summary) = host.build_summary().await? else {
            return Err(RoundFlowError::Round(RoundError::InvalidTransition {
                command: "finalize_summary",
                phase: host.snapshot().phase,
            }));
        };
        let id = self.summaries.append_summary(&summary).await?;
        host.set_summary_id(id).await;
        Ok(id)
    }

    /// Results → a fresh lobby round over the same quiz.
    ///
    /// # Errors
    ///
    /// Propagates `RoundError` from the round machine.
    pub async fn reset(&self, host: &RoundHost) -> Result<RoundId, RoundFlowError> {
        let round_id = host.reset().await?;
        tracing::info!(%round_id, "round reset");
        Ok(round_id)
    }
}
