use assess_core::model::{
    AssessmentDefinition, AssessmentError, AssessmentId, AssessmentSettings, AttemptId,
    AttemptRecord, AttemptSubmission, NewAttempt, QuestionDraft, QuestionError, QuestionId,
    UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("attempt limit reached (max {max})")]
    AttemptLimitReached { max: u32 },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Input for creating an assessment whose id (and question ids) storage assigns.
#[derive(Debug, Clone)]
pub struct NewAssessmentRecord {
    pub title: String,
    pub description: Option<String>,
    pub questions: Vec<QuestionDraft>,
    pub settings: AssessmentSettings,
    pub created_at: DateTime<Utc>,
}

impl NewAssessmentRecord {
    /// Validate the drafts and bind them to `id`.
    ///
    /// Question ids are assigned 1..=n in draft order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if any draft or the assembled
    /// definition fails validation.
    pub fn into_definition(self, id: AssessmentId) -> Result<AssessmentDefinition, StorageError> {
        let questions = self
            .questions
            .into_iter()
            .zip(1_u64..)
            .map(|(draft, qid)| draft.validate(QuestionId::new(qid)))
            .collect::<Result<Vec<_>, QuestionError>>()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        AssessmentDefinition::new(
            id,
            self.title,
            self.description,
            questions,
            self.settings,
            self.created_at,
        )
        .map_err(|e: AssessmentError| StorageError::Serialization(e.to_string()))
    }
}

/// Repository contract for assessment definitions.
#[async_trait]
pub trait AssessmentRepository: Send + Sync {
    /// Insert a new assessment and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the assessment is invalid or cannot be stored.
    async fn insert_new_assessment(
        &self,
        record: NewAssessmentRecord,
    ) -> Result<AssessmentId, StorageError>;

    /// Persist or replace an assessment with its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the assessment cannot be stored.
    async fn upsert_assessment(&self, assessment: &AssessmentDefinition)
    -> Result<(), StorageError>;

    /// Fetch an assessment by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_assessment(&self, id: AssessmentId)
    -> Result<AssessmentDefinition, StorageError>;

    /// List assessments ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_assessments(&self, limit: u32)
    -> Result<Vec<AssessmentDefinition>, StorageError>;
}

/// Repository contract for attempts. Storage is authoritative for attempt
/// numbering, the attempt limit, and the single submission per attempt.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Open a new attempt, assigning its id and 1-based number.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AttemptLimitReached` when the user already has
    /// as many attempts as the stored assessment's `max_attempts`, `StorageError::NotFound` for an unknown
    /// assessment, or other storage errors.
    async fn start_attempt(&self, attempt: &NewAttempt) -> Result<AttemptRecord, StorageError>;

    /// Record the graded submission for an in-progress attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the attempt was already submitted,
    /// `StorageError::NotFound` if it does not exist.
    async fn submit_attempt(
        &self,
        id: AttemptId,
        submission: &AttemptSubmission,
    ) -> Result<AttemptRecord, StorageError>;

    /// Fetch an attempt by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRecord, StorageError>;

    /// List a user's attempts for an assessment, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_attempts(
        &self,
        assessment_id: AssessmentId,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRecord>, StorageError>;

    /// Number of attempts a user has started for an assessment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn count_attempts(
        &self,
        assessment_id: AssessmentId,
        user_id: UserId,
    ) -> Result<u32, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    assessments: Arc<Mutex<HashMap<AssessmentId, AssessmentDefinition>>>,
    attempts: Arc<Mutex<AttemptTable>>,
}

#[derive(Default)]
struct AttemptTable {
    next_id: u64,
    rows: HashMap<AttemptId, AttemptRecord>,
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssessmentRepository for InMemoryRepository {
    async fn insert_new_assessment(
        &self,
        record: NewAssessmentRecord,
    ) -> Result<AssessmentId, StorageError> {
        let mut guard = self.assessments.lock().map_err(poisoned)?;
        let next = guard.keys().map(AssessmentId::value).max().unwrap_or(0) + 1;
        let id = AssessmentId::new(next);
        let definition = record.into_definition(id)?;
        guard.insert(id, definition);
        Ok(id)
    }

    async fn upsert_assessment(
        &self,
        assessment: &AssessmentDefinition,
    ) -> Result<(), StorageError> {
        let mut guard = self.assessments.lock().map_err(poisoned)?;
        guard.insert(assessment.id(), assessment.clone());
        Ok(())
    }

    async fn get_assessment(
        &self,
        id: AssessmentId,
    ) -> Result<AssessmentDefinition, StorageError> {
        let guard = self.assessments.lock().map_err(poisoned)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_assessments(
        &self,
        limit: u32,
    ) -> Result<Vec<AssessmentDefinition>, StorageError> {
        let guard = self.assessments.lock().map_err(poisoned)?;
        let mut all: Vec<_> = guard.values().cloned().collect();
        all.sort_by_key(AssessmentDefinition::id);
        all.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(all)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn start_attempt(&self, attempt: &NewAttempt) -> Result<AttemptRecord, StorageError> {
        let max = self
            .assessments
            .lock()
            .map_err(poisoned)?
            .get(&attempt.assessment_id)
            .map(|a| a.settings().max_attempts())
            .ok_or(StorageError::NotFound)?;

        let mut table = self.attempts.lock().map_err(poisoned)?;
        let used = table
            .rows
            .values()
            .filter(|r| r.assessment_id() == attempt.assessment_id && r.user_id() == attempt.user_id)
            .count();
        let used = u32::try_from(used).map_err(ser)?;
        if used >= max {
            return Err(StorageError::AttemptLimitReached { max });
        }

        table.next_id += 1;
        let record = AttemptRecord::started(
            AttemptId::new(table.next_id),
            attempt.assessment_id,
            attempt.user_id,
            used + 1,
            attempt.started_at,
        )
        .map_err(ser)?;
        table.rows.insert(record.id(), record.clone());
        Ok(record)
    }

    async fn submit_attempt(
        &self,
        id: AttemptId,
        submission: &AttemptSubmission,
    ) -> Result<AttemptRecord, StorageError> {
        let mut table = self.attempts.lock().map_err(poisoned)?;
        let record = table.rows.get_mut(&id).ok_or(StorageError::NotFound)?;
        if record.is_submitted() {
            return Err(StorageError::Conflict);
        }
        record.apply_submission(submission).map_err(ser)?;
        Ok(record.clone())
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRecord, StorageError> {
        let table = self.attempts.lock().map_err(poisoned)?;
        table.rows.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_attempts(
        &self,
        assessment_id: AssessmentId,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRecord>, StorageError> {
        let table = self.attempts.lock().map_err(poisoned)?;
        let mut rows: Vec<_> = table
            .rows
            .values()
            .filter(|r| r.assessment_id() == assessment_id && r.user_id() == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.number().cmp(&a.number()));
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn count_attempts(
        &self,
        assessment_id: AssessmentId,
        user_id: UserId,
    ) -> Result<u32, StorageError> {
        let table = self.attempts.lock().map_err(poisoned)?;
        let count = table
            .rows
            .values()
            .filter(|r| r.assessment_id() == assessment_id && r.user_id() == user_id)
            .count();
        u32::try_from(count).map_err(ser)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub assessments: Arc<dyn AssessmentRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let assessments: Arc<dyn AssessmentRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self {
            assessments,
            attempts,
        }
    }
}
