use assess_core::model::{
    AssessmentId, AttemptId, AttemptRecord, AttemptStatus, AttemptSubmission, NewAttempt, UserId,
};

use super::SqliteRepository;
use super::mapping::{attempt_id_from_i64, map_attempt_row, ser, u64_to_i64};
use crate::repository::{AttemptRepository, StorageError};

const ATTEMPT_COLUMNS: &str = "id, assessment_id, user_id, number, started_at, submitted_at, score, status, time_spent_secs, responses";

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn start_attempt(&self, attempt: &NewAttempt) -> Result<AttemptRecord, StorageError> {
        let assessment_id = u64_to_i64("assessment_id", attempt.assessment_id.value())?;
        let user_id = attempt.user_id.to_string();

        // Count, limit check and insert run as one write statement, so
        // concurrent starts for the same user are serialized by SQLite.
        let inserted: Option<(i64, i64)> = sqlx::query_as(
            r"
            INSERT INTO attempts (assessment_id, user_id, number, started_at, status)
            SELECT a.id, ?2, used.n + 1, ?3, ?4
            FROM assessments a,
                 (SELECT COUNT(*) AS n FROM attempts
                   WHERE assessment_id = ?1 AND user_id = ?2) used
            WHERE a.id = ?1 AND used.n < a.max_attempts
            RETURNING id, number
            ",
        )
        .bind(assessment_id)
        .bind(user_id.as_str())
        .bind(attempt.started_at)
        .bind(AttemptStatus::InProgress.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            // Another start claimed the same number.
            if is_unique_violation(&e) {
                StorageError::Conflict
            } else {
                conn(e)
            }
        })?;

        let Some((id, number)) = inserted else {
            let max: Option<i64> =
                sqlx::query_scalar("SELECT max_attempts FROM assessments WHERE id = ?1")
                    .bind(assessment_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(conn)?;
            let max = u32::try_from(max.ok_or(StorageError::NotFound)?).map_err(ser)?;
            return Err(StorageError::AttemptLimitReached { max });
        };

        AttemptRecord::started(
            attempt_id_from_i64(id)?,
            attempt.assessment_id,
            attempt.user_id,
            u32::try_from(number).map_err(ser)?,
            attempt.started_at,
        )
        .map_err(ser)
    }

    async fn submit_attempt(
        &self,
        id: AttemptId,
        submission: &AttemptSubmission,
    ) -> Result<AttemptRecord, StorageError> {
        let mut current = self.get_attempt(id).await?;
        if current.is_submitted() {
            return Err(StorageError::Conflict);
        }
        current.apply_submission(submission).map_err(ser)?;

        let responses = serde_json::to_string(&submission.outcomes).map_err(ser)?;
        let res = sqlx::query(
            r"
            UPDATE attempts
            SET submitted_at = ?2,
                score = ?3,
                status = ?4,
                time_spent_secs = ?5,
                responses = ?6
            WHERE id = ?1 AND status = ?7
            ",
        )
        .bind(u64_to_i64("attempt_id", id.value())?)
        .bind(submission.submitted_at)
        .bind(submission.score)
        .bind(submission.status.as_str())
        .bind(u64_to_i64("time_spent_secs", submission.time_spent_secs)?)
        .bind(responses)
        .bind(AttemptStatus::InProgress.as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        // Lost a race with another submit between the read and the update.
        if res.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        Ok(current)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRecord, StorageError> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(u64_to_i64("attempt_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        map_attempt_row(&row)
    }

    async fn list_attempts(
        &self,
        assessment_id: AssessmentId,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRecord>, StorageError> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts \
             WHERE assessment_id = ?1 AND user_id = ?2 \
             ORDER BY number DESC LIMIT ?3"
        );
        let rows = sqlx::query(&sql)
            .bind(u64_to_i64("assessment_id", assessment_id.value())?)
            .bind(user_id.to_string())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_attempt_row).collect()
    }

    async fn count_attempts(
        &self,
        assessment_id: AssessmentId,
        user_id: UserId,
    ) -> Result<u32, StorageError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM attempts WHERE assessment_id = ?1 AND user_id = ?2",
        )
        .bind(u64_to_i64("assessment_id", assessment_id.value())?)
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        u32::try_from(count).map_err(ser)
    }
}
