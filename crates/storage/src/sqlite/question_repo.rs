use quiz_core::model::{Question, QuestionId, QuizId};

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_question_row, question_id_from_i64, ser};
use crate::repository::{NewQuestionRecord, QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_question(
        &self,
        record: NewQuestionRecord,
    ) -> Result<QuestionId, StorageError> {
        // Validate before touching the database so corrupt option lists
        // never reach the JSON column.
        let options_json = serde_json::to_string(&record.options).map_err(ser)?;
        record
            .clone()
            .into_question(QuestionId::new(0))
            .map_err(ser)?;

        let result = sqlx::query(
            r"
            INSERT INTO questions (
                quiz_id, question_text, image_url, time_limit, order_index, options, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(id_to_i64("quiz_id", record.quiz_id.value())?)
        .bind(&record.text)
        .bind(&record.image_url)
        .bind(i64::from(record.time_limit_secs))
        .bind(i64::from(record.order_index))
        .bind(options_json)
        .bind(record.created_at)
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        question_id_from_i64(result.last_insert_rowid())
    }

    async fn list_questions(&self, quiz_id: QuizId) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, quiz_id, question_text, image_url, time_limit, order_index, options,
                   created_at
            FROM questions WHERE quiz_id = ?1
            ORDER BY order_index ASC, id ASC
            ",
        )
        .bind(id_to_i64("quiz_id", quiz_id.value())?)
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_question_row).collect()
    }
}
