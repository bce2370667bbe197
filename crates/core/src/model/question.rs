use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question must be worth at least 1 point")]
    InvalidPoints,

    #[error("correct answer cannot be empty")]
    EmptyCorrectAnswer,

    #[error("multiple-choice questions need at least 2 choices, got {0}")]
    TooFewChoices(usize),

    #[error("choices must be non-empty and unique")]
    InvalidChoices,

    #[error("correct answer is not one of the choices")]
    AnswerNotAChoice,

    #[error("true/false answer must be \"true\" or \"false\"")]
    InvalidTrueFalseAnswer,

    #[error("{0} questions do not take choices")]
    UnexpectedChoices(QuestionKind),

    #[error("unknown question kind: {0}")]
    UnknownKind(String),
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// How a question is presented and answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Essay,
}

impl QuestionKind {
    /// Stable storage code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::TrueFalse => "true_false",
            QuestionKind::ShortAnswer => "short_answer",
            QuestionKind::Essay => "essay",
        }
    }

    /// Free-text kinds are answered by typing rather than selecting.
    #[must_use]
    pub fn is_free_text(self) -> bool {
        matches!(self, QuestionKind::ShortAnswer | QuestionKind::Essay)
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple_choice" => Ok(Self::MultipleChoice),
            "true_false" => Ok(Self::TrueFalse),
            "short_answer" => Ok(Self::ShortAnswer),
            "essay" => Ok(Self::Essay),
            other => Err(QuestionError::UnknownKind(other.to_string())),
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question input, as produced by authoring tools or generators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub text: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub choices: Vec<String>,
    pub correct_answer: String,
    #[serde(default = "default_points")]
    pub points: u32,
}

fn default_points() -> u32 {
    1
}

impl QuestionDraft {
    /// Validate the draft and bind it to an id.
    ///
    /// Text and choices are trimmed; the correct answer is kept verbatim because
    /// scoring compares it byte-for-byte.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the draft violates a kind-specific rule.
    pub fn validate(self, id: QuestionId) -> Result<Question, QuestionError> {
        let text = self.text.trim().to_string();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if self.points == 0 {
            return Err(QuestionError::InvalidPoints);
        }
        if self.correct_answer.is_empty() {
            return Err(QuestionError::EmptyCorrectAnswer);
        }

        let choices: Vec<String> = self
            .choices
            .into_iter()
            .map(|c| c.trim().to_string())
            .collect();

        match self.kind {
            QuestionKind::MultipleChoice => {
                if choices.len() < 2 {
                    return Err(QuestionError::TooFewChoices(choices.len()));
                }
                let mut seen = HashSet::with_capacity(choices.len());
                if choices.iter().any(|c| c.is_empty() || !seen.insert(c.as_str())) {
                    return Err(QuestionError::InvalidChoices);
                }
                if !choices.iter().any(|c| *c == self.correct_answer) {
                    return Err(QuestionError::AnswerNotAChoice);
                }
            }
            QuestionKind::TrueFalse => {
                if self.correct_answer != "true" && self.correct_answer != "false" {
                    return Err(QuestionError::InvalidTrueFalseAnswer);
                }
                if !choices.is_empty() {
                    return Err(QuestionError::UnexpectedChoices(self.kind));
                }
            }
            QuestionKind::ShortAnswer | QuestionKind::Essay => {
                if !choices.is_empty() {
                    return Err(QuestionError::UnexpectedChoices(self.kind));
                }
            }
        }

        Ok(Question {
            id,
            text,
            kind: self.kind,
            choices,
            correct_answer: self.correct_answer,
            points: self.points,
        })
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A validated question. Immutable once part of an assessment definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    kind: QuestionKind,
    choices: Vec<String>,
    correct_answer: String,
    points: u32,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    /// Ordered choices; empty for anything but multiple-choice.
    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// Options a presentation layer should offer, including the implicit
    /// `true`/`false` pair.
    #[must_use]
    pub fn options(&self) -> Vec<&str> {
        match self.kind {
            QuestionKind::TrueFalse => vec!["true", "false"],
            _ => self.choices.iter().map(String::as_str).collect(),
        }
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    /// Case-sensitive exact match against the reference answer, for every kind.
    #[must_use]
    pub fn is_correct(&self, answer: &str) -> bool {
        answer == self.correct_answer
    }

    /// Converts back into a draft, e.g. for persistence.
    #[must_use]
    pub fn to_draft(&self) -> QuestionDraft {
        QuestionDraft {
            text: self.text.clone(),
            kind: self.kind,
            choices: self.choices.clone(),
            correct_answer: self.correct_answer.clone(),
            points: self.points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mc(choices: &[&str], answer: &str) -> QuestionDraft {
        QuestionDraft {
            text: "Pick one".into(),
            kind: QuestionKind::MultipleChoice,
            choices: choices.iter().map(|c| (*c).to_string()).collect(),
            correct_answer: answer.into(),
            points: 1,
        }
    }

    #[test]
    fn multiple_choice_requires_answer_among_choices() {
        let err = mc(&["A", "B"], "C").validate(QuestionId::new(1)).unwrap_err();
        assert_eq!(err, QuestionError::AnswerNotAChoice);

        let q = mc(&["A", " B "], "B").validate(QuestionId::new(1)).unwrap();
        assert_eq!(q.choices(), ["A", "B"]);
    }

    #[test]
    fn multiple_choice_rejects_duplicate_choices() {
        let err = mc(&["A", "A"], "A").validate(QuestionId::new(1)).unwrap_err();
        assert_eq!(err, QuestionError::InvalidChoices);
        let err = mc(&["A"], "A").validate(QuestionId::new(1)).unwrap_err();
        assert_eq!(err, QuestionError::TooFewChoices(1));
    }

    #[test]
    fn true_false_answer_is_restricted() {
        let draft = QuestionDraft {
            text: "Rust has a GC".into(),
            kind: QuestionKind::TrueFalse,
            choices: Vec::new(),
            correct_answer: "False".into(),
            points: 1,
        };
        assert_eq!(
            draft.validate(QuestionId::new(2)).unwrap_err(),
            QuestionError::InvalidTrueFalseAnswer
        );
    }

    #[test]
    fn zero_points_rejected() {
        let mut draft = mc(&["A", "B"], "A");
        draft.points = 0;
        assert_eq!(
            draft.validate(QuestionId::new(1)).unwrap_err(),
            QuestionError::InvalidPoints
        );
    }

    #[test]
    fn free_text_matches_exactly() {
        let q = QuestionDraft {
            text: "Name the borrow checker's job".into(),
            kind: QuestionKind::ShortAnswer,
            choices: Vec::new(),
            correct_answer: "Ownership".into(),
            points: 2,
        }
        .validate(QuestionId::new(3))
        .unwrap();

        assert!(q.is_correct("Ownership"));
        assert!(!q.is_correct("ownership"));
        assert!(!q.is_correct("Ownership "));
    }

    #[test]
    fn kind_codes_round_trip() {
        for kind in [
            QuestionKind::MultipleChoice,
            QuestionKind::TrueFalse,
            QuestionKind::ShortAnswer,
            QuestionKind::Essay,
        ] {
            assert_eq!(kind.as_str().parse::<QuestionKind>().unwrap(), kind);
        }
        assert!("matching".parse::<QuestionKind>().is_err());
    }
}
