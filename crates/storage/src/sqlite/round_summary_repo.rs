use quiz_core::model::{QuizId, RoundSummary};

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_summary_row};
use crate::repository::{RoundSummaryRepository, StorageError};

#[async_trait::async_trait]
impl RoundSummaryRepository for SqliteRepository {
    async fn append_summary(&self, summary: &RoundSummary) -> Result<i64, StorageError> {
        let result = sqlx::query(
            r"
            INSERT INTO round_summaries (
                quiz_id, round_id, started_at, completed_at, questions_asked,
                answers_submitted, correct, incorrect
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(id_to_i64("quiz_id", summary.quiz_id().value())?)
        .bind(summary.round_id().to_string())
        .bind(summary.started_at())
        .bind(summary.completed_at())
        .bind(i64::from(summary.questions_asked()))
        .bind(i64::from(summary.answers_submitted()))
        .bind(i64::from(summary.correct()))
        .bind(i64::from(summary.incorrect()))
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    async fn get_summary(&self, id: i64) -> Result<RoundSummary, StorageError> {
        let row = sqlx::query(
            r"
            SELECT quiz_id, round_id, started_at, completed_at, questions_asked,
                   answers_submitted, correct, incorrect
            FROM round_summaries WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_summary_row).transpose()?.ok_or(StorageError::NotFound)
    }

    async fn list_summaries_for_quiz(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<RoundSummary>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT quiz_id, round_id, started_at, completed_at, questions_asked,
                   answers_submitted, correct, incorrect
            FROM round_summaries WHERE quiz_id = ?1
            ORDER BY completed_at DESC, id DESC
            LIMIT ?2
            ",
        )
        .bind(id_to_i64("quiz_id", quiz_id.value())?)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_summary_row).collect()
    }
}
