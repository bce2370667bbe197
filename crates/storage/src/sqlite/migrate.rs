use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 creates assessments, their questions, and attempts.
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

    if is_applied(pool, 1).await? {
        return Ok(());
    }

    tracing::info!(version = 1, "applying schema migration");
    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS assessments (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                time_limit_minutes INTEGER CHECK (time_limit_minutes IS NULL OR time_limit_minutes > 0),
                passing_score INTEGER CHECK (passing_score IS NULL OR passing_score BETWEEN 0 AND 100),
                max_attempts INTEGER NOT NULL CHECK (max_attempts > 0),
                created_at TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS questions (
                assessment_id INTEGER NOT NULL,
                id INTEGER NOT NULL,
                position INTEGER NOT NULL CHECK (position >= 0),
                kind TEXT NOT NULL,
                text TEXT NOT NULL,
                choices TEXT NOT NULL,
                correct_answer TEXT NOT NULL,
                points INTEGER NOT NULL CHECK (points >= 1),
                PRIMARY KEY (assessment_id, id),
                FOREIGN KEY (assessment_id) REFERENCES assessments(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS attempts (
                id INTEGER PRIMARY KEY,
                assessment_id INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                number INTEGER NOT NULL CHECK (number >= 1),
                started_at TEXT NOT NULL,
                submitted_at TEXT,
                score REAL CHECK (score IS NULL OR score BETWEEN 0 AND 100),
                status TEXT NOT NULL,
                time_spent_secs INTEGER CHECK (time_spent_secs IS NULL OR time_spent_secs >= 0),
                responses TEXT NOT NULL DEFAULT '[]',
                UNIQUE (assessment_id, user_id, number),
                FOREIGN KEY (assessment_id) REFERENCES assessments(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_questions_assessment_position
                ON questions (assessment_id, position);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_attempts_assessment_user
                ON attempts (assessment_id, user_id, number);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(1_i64)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
