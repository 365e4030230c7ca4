use chrono::{DateTime, Utc};
use quiz_core::model::{Host, HostId};

use super::SqliteRepository;
use super::mapping::{host_id_from_i64, id_to_i64, map_db_err, map_host_row};
use crate::repository::{HostRepository, NewHostRecord, StorageError};

#[async_trait::async_trait]
impl HostRepository for SqliteRepository {
    async fn insert_host(&self, record: NewHostRecord) -> Result<HostId, StorageError> {
        let result = sqlx::query(
            r"
            INSERT INTO hosts (username, twitch_id, email, created_at, last_login)
            VALUES (?1, ?2, ?3, ?4, NULL)
            ",
        )
        .bind(&record.username)
        .bind(&record.twitch_id)
        .bind(&record.email)
        .bind(record.created_at)
        .execute(self.pool())
        .await
        .map_err(map_db_err)?;

        host_id_from_i64(result.last_insert_rowid())
    }

    async fn get_host(&self, id: HostId) -> Result<Option<Host>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, username, twitch_id, email, created_at, last_login
            FROM hosts WHERE id = ?1
            ",
        )
        .bind(id_to_i64("host_id", id.value())?)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_host_row).transpose()
    }

    async fn get_host_by_twitch_id(&self, twitch_id: &str) -> Result<Option<Host>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, username, twitch_id, email, created_at, last_login
            FROM hosts WHERE twitch_id = ?1
            ",
        )
        .bind(twitch_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_host_row).transpose()
    }

    async fn set_last_login(&self, id: HostId, at: DateTime<Utc>) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE hosts SET last_login = ?2 WHERE id = ?1")
            .bind(id_to_i64("host_id", id.value())?)
            .bind(at)
            .execute(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
