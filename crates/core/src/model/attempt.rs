use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{AssessmentId, AttemptId, QuestionId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("unknown attempt status: {0}")]
    UnknownStatus(String),

    #[error("attempt number must be >= 1")]
    InvalidNumber,

    #[error("submitted_at is before started_at")]
    InvalidTimeRange,
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle status of a persisted attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Passed,
    Failed,
    /// Submitted for an assessment without a passing score.
    Submitted,
}

impl AttemptStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Passed => "passed",
            AttemptStatus::Failed => "failed",
            AttemptStatus::Submitted => "submitted",
        }
    }

    #[must_use]
    pub fn is_final(self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }

    /// Status implied by a pass/fail verdict.
    #[must_use]
    pub fn from_verdict(passed: Option<bool>) -> Self {
        match passed {
            Some(true) => AttemptStatus::Passed,
            Some(false) => AttemptStatus::Failed,
            None => AttemptStatus::Submitted,
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttemptStatus {
    type Err = AttemptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(Self::InProgress),
            "passed" => Ok(Self::Passed),
            "failed" => Ok(Self::Failed),
            "submitted" => Ok(Self::Submitted),
            other => Err(AttemptError::UnknownStatus(other.to_string())),
        }
    }
}

//
// ─── SCORING OUTPUT ────────────────────────────────────────────────────────────
//

/// Per-question grading line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub answer: String,
    pub is_correct: bool,
    pub points_earned: u32,
    pub points_possible: u32,
}

/// Graded result of one attempt, computed once at submit time.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionResult {
    /// Percentage in `[0, 100]`, unrounded.
    pub score: f64,
    pub points_earned: u64,
    pub points_possible: u64,
    /// `None` when the assessment has no passing score.
    pub passed: Option<bool>,
    pub outcomes: Vec<QuestionOutcome>,
}

impl SubmissionResult {
    #[must_use]
    pub fn status(&self) -> AttemptStatus {
        AttemptStatus::from_verdict(self.passed)
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_correct).count()
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.outcomes.len()
    }

    /// Rebuilds the graded result stored on a submitted attempt.
    ///
    /// Returns `None` while the attempt is still in progress.
    #[must_use]
    pub fn from_record(record: &AttemptRecord) -> Option<Self> {
        let score = record.score()?;
        let passed = match record.status() {
            AttemptStatus::InProgress => return None,
            AttemptStatus::Passed => Some(true),
            AttemptStatus::Failed => Some(false),
            AttemptStatus::Submitted => None,
        };
        let outcomes = record.outcomes().to_vec();
        Some(Self {
            score,
            points_earned: outcomes.iter().map(|o| u64::from(o.points_earned)).sum(),
            points_possible: outcomes.iter().map(|o| u64::from(o.points_possible)).sum(),
            passed,
            outcomes,
        })
    }
}

//
// ─── PERSISTENCE SHAPES ────────────────────────────────────────────────────────
//

/// Request to open a new attempt.
///
/// The persistence layer assigns the id and attempt number and enforces the
/// stored assessment's `max_attempts`; callers cannot widen the limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttempt {
    pub assessment_id: AssessmentId,
    pub user_id: UserId,
    pub started_at: DateTime<Utc>,
}

/// What the session hands to the persistence layer on submit.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptSubmission {
    pub outcomes: Vec<QuestionOutcome>,
    pub score: f64,
    pub status: AttemptStatus,
    pub submitted_at: DateTime<Utc>,
    pub time_spent_secs: u64,
}

impl AttemptSubmission {
    #[must_use]
    pub fn from_result(
        result: &SubmissionResult,
        submitted_at: DateTime<Utc>,
        time_spent_secs: u64,
    ) -> Self {
        Self {
            outcomes: result.outcomes.clone(),
            score: result.score,
            status: result.status(),
            submitted_at,
            time_spent_secs,
        }
    }
}

/// A persisted attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    id: AttemptId,
    assessment_id: AssessmentId,
    user_id: UserId,
    number: u32,
    started_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    score: Option<f64>,
    status: AttemptStatus,
    time_spent_secs: Option<u64>,
    outcomes: Vec<QuestionOutcome>,
}

impl AttemptRecord {
    /// A freshly opened attempt.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidNumber` if `number` is zero.
    pub fn started(
        id: AttemptId,
        assessment_id: AssessmentId,
        user_id: UserId,
        number: u32,
        started_at: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        if number == 0 {
            return Err(AttemptError::InvalidNumber);
        }
        Ok(Self {
            id,
            assessment_id,
            user_id,
            number,
            started_at,
            submitted_at: None,
            score: None,
            status: AttemptStatus::InProgress,
            time_spent_secs: None,
            outcomes: Vec::new(),
        })
    }

    /// Apply a submission to an in-progress attempt.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidTimeRange` if the submission predates the start.
    pub fn apply_submission(&mut self, submission: &AttemptSubmission) -> Result<(), AttemptError> {
        if submission.submitted_at < self.started_at {
            return Err(AttemptError::InvalidTimeRange);
        }
        self.submitted_at = Some(submission.submitted_at);
        self.score = Some(submission.score);
        self.status = submission.status;
        self.time_spent_secs = Some(submission.time_spent_secs);
        self.outcomes = submission.outcomes.clone();
        Ok(())
    }

    /// Rehydrate an attempt from storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` if the number is zero or timestamps are inverted.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: AttemptId,
        assessment_id: AssessmentId,
        user_id: UserId,
        number: u32,
        started_at: DateTime<Utc>,
        submitted_at: Option<DateTime<Utc>>,
        score: Option<f64>,
        status: AttemptStatus,
        time_spent_secs: Option<u64>,
        outcomes: Vec<QuestionOutcome>,
    ) -> Result<Self, AttemptError> {
        if number == 0 {
            return Err(AttemptError::InvalidNumber);
        }
        if submitted_at.is_some_and(|s| s < started_at) {
            return Err(AttemptError::InvalidTimeRange);
        }
        Ok(Self {
            id,
            assessment_id,
            user_id,
            number,
            started_at,
            submitted_at,
            score,
            status,
            time_spent_secs,
            outcomes,
        })
    }

    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn assessment_id(&self) -> AssessmentId {
        self.assessment_id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// 1-based attempt number assigned by storage.
    #[must_use]
    pub fn number(&self) -> u32 {
        self.number
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    #[must_use]
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    #[must_use]
    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> Option<u64> {
        self.time_spent_secs
    }

    #[must_use]
    pub fn outcomes(&self) -> &[QuestionOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.status.is_final()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn verdict_maps_to_status() {
        assert_eq!(AttemptStatus::from_verdict(Some(true)), AttemptStatus::Passed);
        assert_eq!(AttemptStatus::from_verdict(Some(false)), AttemptStatus::Failed);
        assert_eq!(AttemptStatus::from_verdict(None), AttemptStatus::Submitted);
        assert_eq!("failed".parse::<AttemptStatus>().unwrap(), AttemptStatus::Failed);
    }

    #[test]
    fn submission_cannot_predate_start() {
        let now = fixed_now();
        let mut record = AttemptRecord::started(
            AttemptId::new(1),
            AssessmentId::new(1),
            UserId::random(),
            1,
            now,
        )
        .unwrap();
        let submission = AttemptSubmission {
            outcomes: Vec::new(),
            score: 0.0,
            status: AttemptStatus::Submitted,
            submitted_at: now - chrono::Duration::seconds(1),
            time_spent_secs: 0,
        };
        assert_eq!(
            record.apply_submission(&submission).unwrap_err(),
            AttemptError::InvalidTimeRange
        );
        assert!(!record.is_submitted());
    }
    #[test]
    fn result_is_rebuilt_from_submitted_record() {
        let now = fixed_now();
        let mut record = AttemptRecord::started(
            AttemptId::new(3),
            AssessmentId::new(1),
            UserId::random(),
            2,
            now,
        )
        .unwrap();
        assert!(SubmissionResult::from_record(&record).is_none());

        let outcome = QuestionOutcome {
            question_id: crate::model::QuestionId::new(1),
            answer: "A".into(),
            is_correct: true,
            points_earned: 2,
            points_possible: 2,
        };
        record
            .apply_submission(&AttemptSubmission {
                outcomes: vec![outcome],
                score: 100.0,
                status: AttemptStatus::Passed,
                submitted_at: now,
                time_spent_secs: 0,
            })
            .unwrap();

        let result = SubmissionResult::from_record(&record).unwrap();
        assert_eq!(result.passed, Some(true));
        assert_eq!(result.points_earned, 2);
        assert_eq!(result.correct_count(), 1);
    }
}
