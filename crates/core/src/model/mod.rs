mod answer;
mod host;
mod ids;
mod player;
mod question;
mod quiz;
mod round_summary;
mod session;

pub use answer::AnswerRecord;
pub use host::{Host, HostError, MAX_USERNAME_LEN};
pub use ids::{HostId, ParseIdError, PlayerId, QuestionId, QuizId, RoundId, SessionId};
pub use player::{MAX_NICKNAME_LEN, Player, PlayerError};
pub use question::{
    MAX_TIME_LIMIT_SECS, MIN_OPTIONS, MIN_TIME_LIMIT_SECS, Question, QuestionError,
    QuestionOption,
};
pub use quiz::{Quiz, QuizError, QuizStatus};
pub use round_summary::{RoundSummary, RoundSummaryError};
pub use session::{AuthError, ProviderIdentity, Session, SessionError};
