use quiz_core::model::{AnswerRecord, RoundId};

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_answer_row};
use crate::repository::{AnswerLogRepository, StorageError};

#[async_trait::async_trait]
impl AnswerLogRepository for SqliteRepository {
    async fn append_answer(
        &self,
        round_id: RoundId,
        record: &AnswerRecord,
    ) -> Result<i64, StorageError> {
        let option_index = i64::try_from(record.option_index)
            .map_err(|_| StorageError::Serialization("option_index overflow".into()))?;

        let result = sqlx::query(
            r"
            INSERT INTO answer_logs (
                round_id, player_id, question_id, option_index, correct,
                response_time_ms, points, submitted_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(round_id.to_string())
        .bind(id_to_i64("player_id", record.player_id.value())?)
        .bind(id_to_i64("question_id", record.question_id.value())?)
        .bind(option_index)
        .bind(record.correct)
        .bind(i64::from(record.response_time_ms))
        .bind(i64::from(record.points))
        .bind(record.submitted_at)
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    async fn list_answers(&self, round_id: RoundId) -> Result<Vec<AnswerRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT player_id, question_id, option_index, correct, response_time_ms, points,
                   submitted_at
            FROM answer_logs WHERE round_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(round_id.to_string())
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_answer_row).collect()
    }
}
