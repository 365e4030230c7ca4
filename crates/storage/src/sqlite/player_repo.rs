use quiz_core::model::{Player, PlayerId, QuizId};

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_db_err, map_player_row, player_id_from_i64, ser};
use crate::repository::{NewPlayerRecord, PlayerRepository, StorageError};

#[async_trait::async_trait]
impl PlayerRepository for SqliteRepository {
    async fn insert_player(&self, record: NewPlayerRecord) -> Result<PlayerId, StorageError> {
        // Run domain validation first so the unique index only ever sees
        // trimmed nicknames.
        let player = Player::new(PlayerId::new(0), record.quiz_id, record.nickname)
            .map_err(ser)?;

        let result = sqlx::query(
            r"
            INSERT INTO players (quiz_id, nickname)
            VALUES (?1, ?2)
            ",
        )
        .bind(id_to_i64("quiz_id", record.quiz_id.value())?)
        .bind(player.nickname())
        .execute(self.pool())
        .await
        .map_err(map_db_err)?;

        player_id_from_i64(result.last_insert_rowid())
    }

    async fn list_players(&self, quiz_id: QuizId) -> Result<Vec<Player>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, quiz_id, nickname
            FROM players WHERE quiz_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("quiz_id", quiz_id.value())?)
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_player_row).collect()
    }
}
