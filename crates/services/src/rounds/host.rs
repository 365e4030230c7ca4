use tokio::sync::{Mutex, watch};

use quiz_core::Clock;
use quiz_core::model::{AnswerRecord, PlayerId, RoundId, RoundSummary, RoundSummaryError, SessionId};
use quiz_core::round::{Phase, Round, RoundError};

use super::view::RoundSnapshot;

#[derive(Debug)]
struct HostState {
    round: Round,
    summary_id: Option<i64>,
}

/// Single logical writer for one live round.
///
/// Every command takes the round lock, applies the transition, then
/// publishes a fresh snapshot. A submission racing a close is resolved
/// by whichever acquires the lock first, and the loser sees the committed
/// state.
#[derive(Debug)]
pub struct RoundHost {
    clock: Clock,
    state: Mutex<HostState>,
    snapshot_tx: watch::Sender<RoundSnapshot>,
}

impl RoundHost {
    #[must_use]
    pub fn new(clock: Clock, round: Round) -> Self {
        let (snapshot_tx, _) = watch::channel(RoundSnapshot::of(&round));
        Self {
            clock,
            state: Mutex::new(HostState {
                round,
                summary_id: None,
            }),
            snapshot_tx,
        }
    }

    /// Subscribe to round state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RoundSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> RoundSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub async fn round_id(&self) -> RoundId {
        self.state.lock().await.round.id()
    }

    pub async fn host_session(&self) -> SessionId {
        self.state.lock().await.round.host_session()
    }

    pub async fn summary_id(&self) -> Option<i64> {
        self.state.lock().await.summary_id
    }

    pub(crate) async fn set_summary_id(&self, id: i64) {
        self.state.lock().await.summary_id = Some(id);
    }

    /// Lobby → Question(0).
    ///
    /// # Errors
    ///
    /// Propagates `RoundError` from the round machine.
    pub async fn start(&self) -> Result<Phase, RoundError> {
        let mut state = self.state.lock().await;
        let phase = state.round.start(self.clock.now())?;
        self.publish(&state.round);
        Ok(phase)
    }

    /// Accepts one answer, serialized against closes and other submissions.
    ///
    /// # Errors
    ///
    /// Propagates `RoundError`. A deadline hit inside the submission
    /// commits the grading transition, so the snapshot is republished even
    /// on that error path.
    pub async fn submit_answer(
        &self,
        player: PlayerId,
        option_index: usize,
    ) -> Result<AnswerRecord, RoundError> {
        let mut state = self.state.lock().await;
        let result = state
            .round
            .submit_answer(player, option_index, self.clock.now())
            .map(AnswerRecord::clone);
        self.publish(&state.round);
        result
    }

    /// Commits the Grading transition when the answer window has elapsed.
    ///
    /// Returns the new phase when a close happened. Drivers call this on
    /// their timer tick; submissions racing the tick serialize on the same
    /// lock.
    pub async fn expire_window(&self) -> Option<Phase> {
        let mut state = self.state.lock().await;
        let phase = state.round.expire_window(self.clock.now());
        if phase.is_some() {
            self.publish(&state.round);
        }
        phase
    }

    /// Question(i) → Grading(i).
    ///
    /// # Errors
    ///
    /// Propagates `RoundError` from the round machine.
    pub async fn close_answers(&self) -> Result<Phase, RoundError> {
        let mut state = self.state.lock().await;
        let phase = state.round.close_answers()?;
        self.publish(&state.round);
        Ok(phase)
    }

    /// Grading(i) → Question(i+1) or Results.
    ///
    /// # Errors
    ///
    /// Propagates `RoundError` from the round machine.
    pub async fn advance(&self) -> Result<Phase, RoundError> {
        let mut state = self.state.lock().await;
        let phase = state.round.advance(self.clock.now())?;
        self.publish(&state.round);
        Ok(phase)
    }

    /// Swaps in a fresh round over the same quiz and returns its id.
    ///
    /// # Errors
    ///
    /// Returns `RoundError::InvalidTransition` unless the current round is
    /// at Results.
    pub async fn reset(&self) -> Result<RoundId, RoundError> {
        let mut state = self.state.lock().await;
        let fresh = state.round.reset()?;
        let id = fresh.id();
        state.round = fresh;
        state.summary_id = None;
        self.publish(&state.round);
        Ok(id)
    }

    /// Builds the finished-round summary, or `None` when the round is not
    /// at Results or a summary was already persisted.
    ///
    /// # Errors
    ///
    /// Propagates `RoundSummaryError` when the accumulated answers do not
    /// reconcile.
    pub async fn build_summary(&self) -> Result<Option<RoundSummary>, RoundSummaryError> {
        let state = self.state.lock().await;
        if state.summary_id.is_some() {
            return Ok(None);
        }
        let round = &state.round;
        let (Some(started_at), Some(completed_at)) = (round.started_at(), round.completed_at())
        else {
            return Ok(None);
        };
        let questions_asked = u32::try_from(round.question_count()).unwrap_or(u32::MAX);
        RoundSummary::from_answers(
            round.quiz_id(),
            round.id(),
            started_at,
            completed_at,
            questions_asked,
            round.answers(),
        )
        .map(Some)
    }

    fn publish(&self, round: &Round) {
        let snapshot = RoundSnapshot::of(round);
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}
