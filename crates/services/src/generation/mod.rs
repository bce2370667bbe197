//! Question generation from a topic, a difficulty and a count.
//!
//! Generators only produce drafts; `AssessmentAuthoringService` turns them
//! into a stored definition.

mod chat;
mod template;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use assess_core::model::{QuestionDraft, QuestionId};

use crate::error::GenerationError;

pub use chat::ChatQuestionGenerator;
pub use template::TemplateQuestionGenerator;

/// Upper bound on questions per generation request.
pub const MAX_GENERATED_QUESTIONS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    /// Points awarded per generated question.
    #[must_use]
    pub fn points(self) -> u32 {
        match self {
            Difficulty::Beginner => 1,
            Difficulty::Intermediate => 2,
            Difficulty::Advanced => 3,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" | "easy" => Ok(Self::Beginner),
            "intermediate" | "medium" => Ok(Self::Intermediate),
            "advanced" | "hard" => Ok(Self::Advanced),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// Input to a `QuestionGenerator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: String,
    pub difficulty: Difficulty,
    pub count: usize,
}

impl GenerationRequest {
    /// # Errors
    ///
    /// Returns `GenerationError::EmptyTopic` or `GenerationError::InvalidCount`.
    pub fn new(
        topic: impl Into<String>,
        difficulty: Difficulty,
        count: usize,
    ) -> Result<Self, GenerationError> {
        let topic = topic.into().trim().to_string();
        if topic.is_empty() {
            return Err(GenerationError::EmptyTopic);
        }
        if count == 0 || count > MAX_GENERATED_QUESTIONS {
            return Err(GenerationError::InvalidCount {
                max: MAX_GENERATED_QUESTIONS,
            });
        }
        Ok(Self {
            topic,
            difficulty,
            count,
        })
    }
}

/// Produces question drafts for a request.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// # Errors
    ///
    /// Returns `GenerationError` when the backend fails or yields drafts that
    /// do not validate.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<QuestionDraft>, GenerationError>;
}

/// Reject drafts that would not survive `QuestionDraft::validate`.
pub(crate) fn check_drafts(drafts: &[QuestionDraft]) -> Result<(), GenerationError> {
    for (draft, id) in drafts.iter().zip(1_u64..) {
        draft.clone().validate(QuestionId::new(id))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_rejects_blank_topic_and_bad_counts() {
        assert!(matches!(
            GenerationRequest::new("  ", Difficulty::Beginner, 3),
            Err(GenerationError::EmptyTopic)
        ));
        assert!(matches!(
            GenerationRequest::new("Rust", Difficulty::Beginner, 0),
            Err(GenerationError::InvalidCount { .. })
        ));
        assert!(GenerationRequest::new("Rust", Difficulty::Beginner, MAX_GENERATED_QUESTIONS).is_ok());
    }

    #[test]
    fn difficulty_parses_aliases() {
        assert_eq!("Hard".parse::<Difficulty>().unwrap(), Difficulty::Advanced);
        assert_eq!("easy".parse::<Difficulty>().unwrap(), Difficulty::Beginner);
        assert!("extreme".parse::<Difficulty>().is_err());
    }
}
