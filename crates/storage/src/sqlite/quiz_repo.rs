use quiz_core::model::{HostId, Quiz, QuizId, QuizStatus};

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_db_err, map_quiz_row, quiz_id_from_i64};
use crate::repository::{NewQuizRecord, QuizRepository, StorageError};

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn insert_quiz(&self, record: NewQuizRecord) -> Result<QuizId, StorageError> {
        let result = sqlx::query(
            r"
            INSERT INTO quizzes (host_id, title, description, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(id_to_i64("host_id", record.host_id.value())?)
        .bind(&record.title)
        .bind(&record.description)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .execute(self.pool())
        .await
        .map_err(map_db_err)?;

        quiz_id_from_i64(result.last_insert_rowid())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, host_id, title, description, status, created_at
            FROM quizzes WHERE id = ?1
            ",
        )
        .bind(id_to_i64("quiz_id", id.value())?)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_quiz_row).transpose()
    }

    async fn list_quizzes_for_host(&self, host_id: HostId) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, host_id, title, description, status, created_at
            FROM quizzes WHERE host_id = ?1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(id_to_i64("host_id", host_id.value())?)
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_quiz_row).collect()
    }

    async fn set_quiz_status(&self, id: QuizId, status: QuizStatus) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE quizzes SET status = ?2 WHERE id = ?1")
            .bind(id_to_i64("quiz_id", id.value())?)
            .bind(status.as_str())
            .execute(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
