use thiserror::Error;

use crate::model::{HostError, PlayerError, QuestionError, QuizError};
use crate::round::RoundError;

/// Crate-level aggregate of domain errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Player(#[from] PlayerError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Round(#[from] RoundError),
}
