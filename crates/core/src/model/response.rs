use std::collections::HashMap;

use crate::model::ids::QuestionId;

/// The user's current answer per question.
///
/// One entry per question; writing an answer replaces the previous one and no
/// history is kept. Callers are responsible for only inserting ids that belong
/// to the assessment being taken.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMap {
    answers: HashMap<QuestionId, String>,
}

impl ResponseMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `answer` for `question_id`.
    ///
    /// Returns `true` if the map changed.
    pub fn set(&mut self, question_id: QuestionId, answer: impl Into<String>) -> bool {
        let answer = answer.into();
        match self.answers.get(&question_id) {
            Some(existing) if *existing == answer => false,
            _ => {
                self.answers.insert(question_id, answer);
                true
            }
        }
    }

    #[must_use]
    pub fn get(&self, question_id: QuestionId) -> Option<&str> {
        self.answers.get(&question_id).map(String::as_str)
    }

    /// Stored answer, or the empty string for unanswered questions.
    #[must_use]
    pub fn answer_or_empty(&self, question_id: QuestionId) -> &str {
        self.get(question_id).unwrap_or("")
    }

    /// Number of questions with a non-blank answer.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers
            .values()
            .filter(|a| !a.trim().is_empty())
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, &str)> {
        self.answers.iter().map(|(id, a)| (*id, a.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_and_reports_change() {
        let mut map = ResponseMap::new();
        let q = QuestionId::new(1);

        assert!(map.set(q, "A"));
        assert!(!map.set(q, "A"));
        let snapshot = map.clone();
        assert!(!map.set(q, "A"));
        assert_eq!(map, snapshot);

        assert!(map.set(q, "B"));
        assert_eq!(map.get(q), Some("B"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn blank_answers_do_not_count_as_answered() {
        let mut map = ResponseMap::new();
        map.set(QuestionId::new(1), "  ");
        map.set(QuestionId::new(2), "B");
        assert_eq!(map.answered_count(), 1);
        assert_eq!(map.answer_or_empty(QuestionId::new(3)), "");
    }
}
