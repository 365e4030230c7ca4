use sqlx::Row;
use std::str::FromStr;

use quiz_core::model::{
    AnswerRecord, Host, HostId, Player, PlayerId, Question, QuestionId, QuestionOption, Quiz,
    QuizId, QuizStatus, RoundId, RoundSummary,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn host_id_from_i64(v: i64) -> Result<HostId, StorageError> {
    Ok(HostId::new(i64_to_u64("host_id", v)?))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    Ok(QuizId::new(i64_to_u64("quiz_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn player_id_from_i64(v: i64) -> Result<PlayerId, StorageError> {
    Ok(PlayerId::new(i64_to_u64("player_id", v)?))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn round_id_from_str(s: &str) -> Result<RoundId, StorageError> {
    RoundId::from_str(s).map_err(ser)
}

pub(crate) fn parse_quiz_status(s: &str) -> Result<QuizStatus, StorageError> {
    match s {
        "draft" => Ok(QuizStatus::Draft),
        "ready" => Ok(QuizStatus::Ready),
        _ => Err(StorageError::Serialization(format!("invalid status: {s}"))),
    }
}

/// Map a unique-constraint violation to `Conflict`, anything else to
/// `Connection`.
pub(crate) fn map_db_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.kind() == sqlx::error::ErrorKind::UniqueViolation {
            return StorageError::Conflict;
        }
    }
    StorageError::Connection(e.to_string())
}

pub(crate) fn map_host_row(row: &sqlx::sqlite::SqliteRow) -> Result<Host, StorageError> {
    let id = host_id_from_i64(row.try_get("id").map_err(ser)?)?;
    Host::new(
        id,
        row.try_get::<String, _>("username").map_err(ser)?,
        row.try_get::<String, _>("twitch_id").map_err(ser)?,
        row.try_get::<Option<String>, _>("email").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("last_login").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_quiz_row(row: &sqlx::sqlite::SqliteRow) -> Result<Quiz, StorageError> {
    let id = quiz_id_from_i64(row.try_get("id").map_err(ser)?)?;
    let host_id = host_id_from_i64(row.try_get("host_id").map_err(ser)?)?;
    let status: String = row.try_get("status").map_err(ser)?;
    Quiz::new(
        id,
        host_id,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        parse_quiz_status(&status)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = question_id_from_i64(row.try_get("id").map_err(ser)?)?;
    let quiz_id = quiz_id_from_i64(row.try_get("quiz_id").map_err(ser)?)?;
    let options_json: String = row.try_get("options").map_err(ser)?;
    let options: Vec<QuestionOption> = serde_json::from_str(&options_json).map_err(ser)?;

    Question::from_persisted(
        id,
        quiz_id,
        row.try_get::<String, _>("question_text").map_err(ser)?,
        row.try_get::<Option<String>, _>("image_url").map_err(ser)?,
        i64_to_u32("time_limit", row.try_get("time_limit").map_err(ser)?)?,
        i64_to_u32("order_index", row.try_get("order_index").map_err(ser)?)?,
        options,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_player_row(row: &sqlx::sqlite::SqliteRow) -> Result<Player, StorageError> {
    let id = player_id_from_i64(row.try_get("id").map_err(ser)?)?;
    let quiz_id = quiz_id_from_i64(row.try_get("quiz_id").map_err(ser)?)?;
    Player::new(
        id,
        quiz_id,
        row.try_get::<String, _>("nickname").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_answer_row(row: &sqlx::sqlite::SqliteRow) -> Result<AnswerRecord, StorageError> {
    let option_index: i64 = row.try_get("option_index").map_err(ser)?;
    Ok(AnswerRecord::new(
        player_id_from_i64(row.try_get("player_id").map_err(ser)?)?,
        question_id_from_i64(row.try_get("question_id").map_err(ser)?)?,
        usize::try_from(option_index)
            .map_err(|_| StorageError::Serialization(format!("invalid option_index: {option_index}")))?,
        row.try_get::<bool, _>("correct").map_err(ser)?,
        i64_to_u32("response_time_ms", row.try_get("response_time_ms").map_err(ser)?)?,
        i64_to_u32("points", row.try_get("points").map_err(ser)?)?,
        row.try_get("submitted_at").map_err(ser)?,
    ))
}

pub(crate) fn map_summary_row(row: &sqlx::sqlite::SqliteRow) -> Result<RoundSummary, StorageError> {
    let quiz_id = quiz_id_from_i64(row.try_get("quiz_id").map_err(ser)?)?;
    let round_id: String = row.try_get("round_id").map_err(ser)?;
    RoundSummary::from_persisted(
        quiz_id,
        round_id_from_str(&round_id)?,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        i64_to_u32("questions_asked", row.try_get("questions_asked").map_err(ser)?)?,
        i64_to_u32("answers_submitted", row.try_get("answers_submitted").map_err(ser)?)?,
        i64_to_u32("correct", row.try_get("correct").map_err(ser)?)?,
        i64_to_u32("incorrect", row.try_get("incorrect").map_err(ser)?)?,
    )
    .map_err(ser)
}
