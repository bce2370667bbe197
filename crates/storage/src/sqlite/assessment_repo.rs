use assess_core::model::{AssessmentDefinition, AssessmentId, Question};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use super::SqliteRepository;
use super::mapping::{assessment_id_from_i64, map_question_row, ser, settings_from_row, u64_to_i64};
use crate::repository::{AssessmentRepository, NewAssessmentRecord, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

async fn write_assessment(
    tx: &mut Transaction<'_, Sqlite>,
    assessment: &AssessmentDefinition,
) -> Result<(), StorageError> {
    let id = u64_to_i64("assessment_id", assessment.id().value())?;
    let settings = assessment.settings();

    sqlx::query(
        r"
        INSERT INTO assessments (id, title, description, time_limit_minutes, passing_score, max_attempts, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            description = excluded.description,
            time_limit_minutes = excluded.time_limit_minutes,
            passing_score = excluded.passing_score,
            max_attempts = excluded.max_attempts
        ",
    )
    .bind(id)
    .bind(assessment.title())
    .bind(assessment.description())
    .bind(settings.time_limit_minutes().map(i64::from))
    .bind(settings.passing_score().map(i64::from))
    .bind(i64::from(settings.max_attempts()))
    .bind(assessment.created_at())
    .execute(&mut **tx)
    .await
    .map_err(conn)?;

    sqlx::query("DELETE FROM questions WHERE assessment_id = ?1")
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(conn)?;

    for (position, question) in assessment.questions().iter().enumerate() {
        write_question(tx, id, position, question).await?;
    }
    Ok(())
}

async fn write_question(
    tx: &mut Transaction<'_, Sqlite>,
    assessment_id: i64,
    position: usize,
    question: &Question,
) -> Result<(), StorageError> {
    let choices = serde_json::to_string(question.choices()).map_err(ser)?;
    sqlx::query(
        r"
        INSERT INTO questions (assessment_id, id, position, kind, text, choices, correct_answer, points)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ",
    )
    .bind(assessment_id)
    .bind(u64_to_i64("question_id", question.id().value())?)
    .bind(i64::try_from(position).map_err(ser)?)
    .bind(question.kind().as_str())
    .bind(question.text())
    .bind(choices)
    .bind(question.correct_answer())
    .bind(i64::from(question.points()))
    .execute(&mut **tx)
    .await
    .map_err(conn)?;
    Ok(())
}

impl SqliteRepository {
    async fn load_assessment(&self, row: &SqliteRow) -> Result<AssessmentDefinition, StorageError> {
        let raw_id: i64 = row.try_get("id").map_err(ser)?;
        let question_rows = sqlx::query(
            r"
            SELECT id, kind, text, choices, correct_answer, points
            FROM questions
            WHERE assessment_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(raw_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let questions = question_rows
            .iter()
            .map(map_question_row)
            .collect::<Result<Vec<_>, _>>()?;

        AssessmentDefinition::new(
            assessment_id_from_i64(raw_id)?,
            row.try_get::<String, _>("title").map_err(ser)?,
            row.try_get("description").map_err(ser)?,
            questions,
            settings_from_row(row)?,
            row.try_get("created_at").map_err(ser)?,
        )
        .map_err(ser)
    }
}

#[async_trait::async_trait]
impl AssessmentRepository for SqliteRepository {
    async fn insert_new_assessment(
        &self,
        record: NewAssessmentRecord,
    ) -> Result<AssessmentId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let next: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) + 1 FROM assessments")
            .fetch_one(&mut *tx)
            .await
            .map_err(conn)?;
        let definition = record.into_definition(assessment_id_from_i64(next)?)?;

        write_assessment(&mut tx, &definition).await?;
        tx.commit().await.map_err(conn)?;
        Ok(definition.id())
    }

    async fn upsert_assessment(
        &self,
        assessment: &AssessmentDefinition,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        write_assessment(&mut tx, assessment).await?;
        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_assessment(
        &self,
        id: AssessmentId,
    ) -> Result<AssessmentDefinition, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, time_limit_minutes, passing_score, max_attempts, created_at
            FROM assessments
            WHERE id = ?1
            ",
        )
        .bind(u64_to_i64("assessment_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        self.load_assessment(&row).await
    }

    async fn list_assessments(
        &self,
        limit: u32,
    ) -> Result<Vec<AssessmentDefinition>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description, time_limit_minutes, passing_score, max_attempts, created_at
            FROM assessments
            ORDER BY id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(self.load_assessment(row).await?);
        }
        Ok(out)
    }
}
