//! Grading of a response set against an assessment definition.
//!
//! Every question kind is graded by case-sensitive exact match against its
//! reference answer. There is no partial credit: short-answer and essay
//! responses only score when they equal the reference text. Unanswered
//! questions are graded as the empty string, so they count as incorrect and
//! stay in the denominator.

use crate::model::{AssessmentDefinition, QuestionOutcome, ResponseMap, SubmissionResult};

/// Grade `responses` against `definition`.
#[must_use]
pub fn score_responses(definition: &AssessmentDefinition, responses: &ResponseMap) -> SubmissionResult {
    let mut points_earned = 0_u64;
    let mut points_possible = 0_u64;
    let mut outcomes = Vec::with_capacity(definition.question_count());

    for question in definition.questions() {
        let answer = responses.answer_or_empty(question.id());
        let is_correct = question.is_correct(answer);
        let earned = if is_correct { question.points() } else { 0 };

        points_possible += u64::from(question.points());
        points_earned += u64::from(earned);

        outcomes.push(QuestionOutcome {
            question_id: question.id(),
            answer: answer.to_string(),
            is_correct,
            points_earned: earned,
            points_possible: question.points(),
        });
    }

    let score = percentage(points_earned, points_possible);
    let passed = definition
        .settings()
        .passing_score()
        .map(|threshold| score >= f64::from(threshold));

    SubmissionResult {
        score,
        points_earned,
        points_possible,
        passed,
        outcomes,
    }
}

/// `100 × earned / possible`, clamped into `[0, 100]`; zero when nothing is possible.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentage(earned: u64, possible: u64) -> f64 {
    if possible == 0 {
        return 0.0;
    }
    (earned as f64 * 100.0 / possible as f64).clamp(0.0, 100.0)
}

/// Round a percentage to two decimals for display and storage summaries.
#[must_use]
pub fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}
