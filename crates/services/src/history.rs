use std::sync::Arc;

use assess_core::model::{AssessmentId, AttemptRecord, AttemptStatus, UserId};
use storage::repository::{AssessmentRepository, AttemptRepository, StorageError};

use crate::error::HistoryError;

/// A user's attempts at one assessment, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptHistory {
    pub assessment_id: AssessmentId,
    pub attempts: Vec<AttemptRecord>,
    pub max_attempts: u32,
    /// Every started attempt counts, submitted or not.
    pub used_attempts: u32,
}

impl AttemptHistory {
    #[must_use]
    pub fn remaining_attempts(&self) -> u32 {
        self.max_attempts.saturating_sub(self.used_attempts)
    }

    /// Highest score among submitted attempts.
    #[must_use]
    pub fn best_score(&self) -> Option<f64> {
        self.attempts
            .iter()
            .filter_map(AttemptRecord::score)
            .fold(None, |best, s| Some(best.map_or(s, |b: f64| b.max(s))))
    }

    #[must_use]
    pub fn has_passed(&self) -> bool {
        self.attempts
            .iter()
            .any(|a| a.status() == AttemptStatus::Passed)
    }

    #[must_use]
    pub fn latest(&self) -> Option<&AttemptRecord> {
        self.attempts.first()
    }
}

/// Read-only view over past attempts.
#[derive(Clone)]
pub struct AttemptHistoryService {
    assessments: Arc<dyn AssessmentRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl AttemptHistoryService {
    #[must_use]
    pub fn new(
        assessments: Arc<dyn AssessmentRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            assessments,
            attempts,
        }
    }

    /// Load up to `limit` of the user's attempts plus attempt accounting.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::AssessmentNotFound` for unknown assessments and
    /// `HistoryError::Storage` for other repository failures.
    pub async fn history(
        &self,
        assessment_id: AssessmentId,
        user_id: UserId,
        limit: u32,
    ) -> Result<AttemptHistory, HistoryError> {
        let definition = match self.assessments.get_assessment(assessment_id).await {
            Ok(definition) => definition,
            Err(StorageError::NotFound) => {
                return Err(HistoryError::AssessmentNotFound(assessment_id));
            }
            Err(err) => return Err(err.into()),
        };

        let attempts = self
            .attempts
            .list_attempts(assessment_id, user_id, limit)
            .await?;
        let used_attempts = self.attempts.count_attempts(assessment_id, user_id).await?;

        Ok(AttemptHistory {
            assessment_id,
            attempts,
            max_attempts: definition.settings().max_attempts(),
            used_attempts,
        })
    }
}
