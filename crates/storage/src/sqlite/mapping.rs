use assess_core::model::{
    AssessmentId, AssessmentSettings, AttemptId, AttemptRecord, AttemptStatus, Question,
    QuestionDraft, QuestionId, QuestionKind, QuestionOutcome, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn assessment_id_from_i64(v: i64) -> Result<AssessmentId, StorageError> {
    Ok(AssessmentId::new(i64_to_u64("assessment_id", v)?))
}

pub(crate) fn attempt_id_from_i64(v: i64) -> Result<AttemptId, StorageError> {
    Ok(AttemptId::new(i64_to_u64("attempt_id", v)?))
}

pub(crate) fn settings_from_row(row: &SqliteRow) -> Result<AssessmentSettings, StorageError> {
    let time_limit = row
        .try_get::<Option<i64>, _>("time_limit_minutes")
        .map_err(ser)?
        .map(|v| u32_from_i64("time_limit_minutes", v))
        .transpose()?;
    let passing = row
        .try_get::<Option<i64>, _>("passing_score")
        .map_err(ser)?
        .map(|v| {
            u8::try_from(v)
                .map_err(|_| StorageError::Serialization(format!("invalid passing_score: {v}")))
        })
        .transpose()?;
    let max_attempts = u32_from_i64(
        "max_attempts",
        row.try_get::<i64, _>("max_attempts").map_err(ser)?,
    )?;

    AssessmentSettings::new(time_limit, passing, max_attempts).map_err(ser)
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let id = QuestionId::new(i64_to_u64(
        "question_id",
        row.try_get::<i64, _>("id").map_err(ser)?,
    )?);
    let kind: QuestionKind = row
        .try_get::<String, _>("kind")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let choices: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("choices").map_err(ser)?).map_err(ser)?;
    let points = u32_from_i64("points", row.try_get::<i64, _>("points").map_err(ser)?)?;

    QuestionDraft {
        text: row.try_get("text").map_err(ser)?,
        kind,
        choices,
        correct_answer: row.try_get("correct_answer").map_err(ser)?,
        points,
    }
    .validate(id)
    .map_err(ser)
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<AttemptRecord, StorageError> {
    let user_id: UserId = row
        .try_get::<String, _>("user_id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let status: AttemptStatus = row
        .try_get::<String, _>("status")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let time_spent = row
        .try_get::<Option<i64>, _>("time_spent_secs")
        .map_err(ser)?
        .map(|v| i64_to_u64("time_spent_secs", v))
        .transpose()?;
    let outcomes: Vec<QuestionOutcome> =
        serde_json::from_str(&row.try_get::<String, _>("responses").map_err(ser)?)
            .map_err(ser)?;

    AttemptRecord::from_persisted(
        attempt_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        assessment_id_from_i64(row.try_get::<i64, _>("assessment_id").map_err(ser)?)?,
        user_id,
        u32_from_i64("number", row.try_get::<i64, _>("number").map_err(ser)?)?,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("submitted_at").map_err(ser)?,
        row.try_get("score").map_err(ser)?,
        status,
        time_spent,
        outcomes,
    )
    .map_err(ser)
}
