use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema: hosts, quizzes, questions (options as a JSON
/// column), players, answer logs, round summaries, and indexes.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS hosts (
                    id INTEGER PRIMARY KEY,
                    username TEXT NOT NULL UNIQUE,
                    twitch_id TEXT NOT NULL UNIQUE,
                    email TEXT,
                    created_at TEXT NOT NULL,
                    last_login TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quizzes (
                    id INTEGER PRIMARY KEY,
                    host_id INTEGER NOT NULL,
                    title TEXT NOT NULL,
                    description TEXT,
                    status TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (host_id) REFERENCES hosts(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    id INTEGER PRIMARY KEY,
                    quiz_id INTEGER NOT NULL,
                    question_text TEXT NOT NULL,
                    image_url TEXT,
                    time_limit INTEGER NOT NULL CHECK (time_limit > 0),
                    order_index INTEGER NOT NULL CHECK (order_index >= 0),
                    options TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS players (
                    id INTEGER PRIMARY KEY,
                    quiz_id INTEGER NOT NULL,
                    nickname TEXT NOT NULL,
                    UNIQUE (quiz_id, nickname),
                    FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS answer_logs (
                    id INTEGER PRIMARY KEY,
                    round_id TEXT NOT NULL,
                    player_id INTEGER NOT NULL,
                    question_id INTEGER NOT NULL,
                    option_index INTEGER NOT NULL CHECK (option_index >= 0),
                    correct INTEGER NOT NULL CHECK (correct IN (0, 1)),
                    response_time_ms INTEGER NOT NULL CHECK (response_time_ms >= 0),
                    points INTEGER NOT NULL CHECK (points >= 0),
                    submitted_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS round_summaries (
                    id INTEGER PRIMARY KEY,
                    quiz_id INTEGER NOT NULL,
                    round_id TEXT NOT NULL,
                    started_at TEXT NOT NULL,
                    completed_at TEXT NOT NULL,
                    questions_asked INTEGER NOT NULL CHECK (questions_asked >= 0),
                    answers_submitted INTEGER NOT NULL CHECK (answers_submitted >= 0),
                    correct INTEGER NOT NULL CHECK (correct >= 0),
                    incorrect INTEGER NOT NULL CHECK (incorrect >= 0),
                    FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_questions_quiz_order
                    ON questions(quiz_id, order_index);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_answer_logs_round
                    ON answer_logs(round_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_round_summaries_quiz
                    ON round_summaries(quiz_id, completed_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (1, ?1)")
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
    }

    Ok(())
}
