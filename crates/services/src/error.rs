//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{AuthError, QuizId, RoundSummaryError, SessionError, SessionId};
use quiz_core::round::RoundError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `AuthService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthFlowError {
    #[error("identity provider is not configured")]
    Disabled,
    #[error("identity provider returned status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by round hosting and the round workflow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RoundFlowError {
    #[error("quiz {0} not found")]
    QuizNotFound(QuizId),
    #[error("quiz {0} is not ready to host")]
    QuizNotReady(QuizId),
    #[error("session {0} already hosts a live round")]
    AlreadyHosting(SessionId),
    #[error(transparent)]
    Round(#[from] RoundError),
    #[error(transparent)]
    Summary(#[from] RoundSummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
