use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{AssessmentId, QuestionId};
use crate::model::question::Question;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssessmentError {
    #[error("assessment title cannot be empty")]
    EmptyTitle,

    #[error("assessment must contain at least one question")]
    NoQuestions,

    #[error("duplicate question id: {0}")]
    DuplicateQuestion(QuestionId),

    #[error("time limit must be at least 1 minute")]
    InvalidTimeLimit,

    #[error("passing score must be within 0..=100, got {0}")]
    InvalidPassingScore(u8),

    #[error("max attempts must be > 0")]
    InvalidMaxAttempts,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Delivery rules for an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssessmentSettings {
    time_limit_minutes: Option<u32>,
    passing_score: Option<u8>,
    max_attempts: u32,
}

impl AssessmentSettings {
    /// Untimed, ungraded, three attempts.
    #[must_use]
    pub fn practice() -> Self {
        Self {
            time_limit_minutes: None,
            passing_score: None,
            max_attempts: 3,
        }
    }

    /// # Errors
    ///
    /// Returns `AssessmentError` if the time limit is zero, the passing score is
    /// above 100, or max attempts is zero.
    pub fn new(
        time_limit_minutes: Option<u32>,
        passing_score: Option<u8>,
        max_attempts: u32,
    ) -> Result<Self, AssessmentError> {
        if time_limit_minutes == Some(0) {
            return Err(AssessmentError::InvalidTimeLimit);
        }
        if let Some(score) = passing_score {
            if score > 100 {
                return Err(AssessmentError::InvalidPassingScore(score));
            }
        }
        if max_attempts == 0 {
            return Err(AssessmentError::InvalidMaxAttempts);
        }
        Ok(Self {
            time_limit_minutes,
            passing_score,
            max_attempts,
        })
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> Option<u32> {
        self.time_limit_minutes
    }

    /// Time limit expressed in whole seconds.
    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u64> {
        self.time_limit_minutes.map(|m| u64::from(m) * 60)
    }

    /// Minimum percentage needed to pass, when the assessment is graded.
    #[must_use]
    pub fn passing_score(&self) -> Option<u8> {
        self.passing_score
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for AssessmentSettings {
    fn default() -> Self {
        Self::practice()
    }
}

//
// ─── DEFINITION ────────────────────────────────────────────────────────────────
//

/// Immutable template for an assessment: ordered questions plus delivery rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentDefinition {
    id: AssessmentId,
    title: String,
    description: Option<String>,
    questions: Vec<Question>,
    settings: AssessmentSettings,
    created_at: DateTime<Utc>,
}

impl AssessmentDefinition {
    /// # Errors
    ///
    /// Returns `AssessmentError::EmptyTitle`, `NoQuestions`, or
    /// `DuplicateQuestion` when the definition is not deliverable.
    pub fn new(
        id: AssessmentId,
        title: impl Into<String>,
        description: Option<String>,
        questions: Vec<Question>,
        settings: AssessmentSettings,
        created_at: DateTime<Utc>,
    ) -> Result<Self, AssessmentError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(AssessmentError::EmptyTitle);
        }
        if questions.is_empty() {
            return Err(AssessmentError::NoQuestions);
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for q in &questions {
            if !seen.insert(q.id()) {
                return Err(AssessmentError::DuplicateQuestion(q.id()));
            }
        }

        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(Self {
            id,
            title,
            description,
            questions,
            settings,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> AssessmentId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn question_at(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn contains_question(&self, id: QuestionId) -> bool {
        self.question(id).is_some()
    }

    #[must_use]
    pub fn settings(&self) -> &AssessmentSettings {
        &self.settings
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Sum of all question points.
    #[must_use]
    pub fn total_points(&self) -> u64 {
        self.questions.iter().map(|q| u64::from(q.points())).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::question::{QuestionDraft, QuestionKind};
    use crate::time::fixed_now;

    fn question(id: u64, points: u32) -> Question {
        QuestionDraft {
            text: format!("Q{id}"),
            kind: QuestionKind::ShortAnswer,
            choices: Vec::new(),
            correct_answer: "x".into(),
            points,
        }
        .validate(QuestionId::new(id))
        .unwrap()
    }

    #[test]
    fn settings_validate_bounds() {
        assert_eq!(
            AssessmentSettings::new(Some(0), None, 1).unwrap_err(),
            AssessmentError::InvalidTimeLimit
        );
        assert_eq!(
            AssessmentSettings::new(None, Some(101), 1).unwrap_err(),
            AssessmentError::InvalidPassingScore(101)
        );
        assert_eq!(
            AssessmentSettings::new(None, None, 0).unwrap_err(),
            AssessmentError::InvalidMaxAttempts
        );
        let s = AssessmentSettings::new(Some(2), Some(70), 1).unwrap();
        assert_eq!(s.time_limit_secs(), Some(120));
    }

    #[test]
    fn definition_rejects_duplicate_question_ids() {
        let err = AssessmentDefinition::new(
            AssessmentId::new(1),
            "Dup",
            None,
            vec![question(1, 1), question(1, 2)],
            AssessmentSettings::practice(),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, AssessmentError::DuplicateQuestion(QuestionId::new(1)));
    }

    #[test]
    fn definition_requires_title_and_questions() {
        let err = AssessmentDefinition::new(
            AssessmentId::new(1),
            "   ",
            None,
            vec![question(1, 1)],
            AssessmentSettings::practice(),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, AssessmentError::EmptyTitle);

        let err = AssessmentDefinition::new(
            AssessmentId::new(1),
            "Empty",
            None,
            Vec::new(),
            AssessmentSettings::practice(),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, AssessmentError::NoQuestions);
    }

    #[test]
    fn total_points_and_lookup() {
        let def = AssessmentDefinition::new(
            AssessmentId::new(1),
            "Rust basics",
            Some("  ".into()),
            vec![question(1, 1), question(2, 3)],
            AssessmentSettings::practice(),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(def.total_points(), 4);
        assert_eq!(def.description(), None);
        assert!(def.contains_question(QuestionId::new(2)));
        assert!(!def.contains_question(QuestionId::new(9)));
        assert_eq!(def.question_at(1).map(Question::id), Some(QuestionId::new(2)));
    }
}
