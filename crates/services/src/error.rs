//! Shared error types for the services crate.

use std::time::Duration;

use thiserror::Error;

use assess_core::model::{AssessmentError, AssessmentId, QuestionError, QuestionId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::sessions::SessionPhase;

/// Why a call to the persistence service did not produce a value.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceFailure {
    #[error("persistence call timed out after {0:?}")]
    TimedOut(Duration),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the assessment session controller and its handle.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("assessment {0} not found")]
    DefinitionNotFound(AssessmentId),
    #[error("could not start attempt: {0}")]
    AttemptStartFailed(#[source] PersistenceFailure),
    #[error("no attempts left (max {max})")]
    AttemptLimitReached { max: u32 },
    #[error("an attempt start is already in flight")]
    StartInFlight,
    #[error("could not submit attempt: {0}")]
    SubmissionFailed(#[source] PersistenceFailure),
    #[error("question {0} is not part of this assessment")]
    InvalidQuestionReference(QuestionId),
    #[error("cannot {action} while {phase}")]
    InvalidPhase {
        phase: SessionPhase,
        action: &'static str,
    },
    #[error("question index {index} out of range (0..{len})")]
    IndexOutOfRange { index: usize, len: usize },
    /// Answers are frozen once the countdown reaches zero. This holds even
    /// when a failed expired submission has returned the session to
    /// `InProgress` for a retry: every retry grades the answers as they stood
    /// at expiry.
    #[error("time is up; answers can no longer change")]
    TimeExpired,
    /// The task running a start or submission did not finish (panic or
    /// runtime shutdown).
    #[error("session task did not finish: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SessionError {
    /// Whether the caller may retry the same operation from the state the
    /// session was left in.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::AttemptStartFailed(_) | SessionError::SubmissionFailed(_)
        )
    }
}

/// Errors emitted by `AttemptHistoryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error("assessment {0} not found")]
    AssessmentNotFound(AssessmentId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by question generators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("question count must be between 1 and {max}")]
    InvalidCount { max: usize },
    #[error("topic must not be empty")]
    EmptyTopic,
    #[error("question generation is not configured")]
    Disabled,
    #[error("generator returned an empty response")]
    EmptyResponse,
    #[error("generator returned malformed questions: {0}")]
    Malformed(String),
    #[error("generation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Question(#[from] QuestionError),
}

/// Errors emitted by `AssessmentAuthoringService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthoringError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
