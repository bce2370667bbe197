use assess_core::model::{
    AssessmentId, AttemptId, QuestionId, QuestionKind, SubmissionResult,
};
use assess_core::time::format_remaining;

use super::controller::AssessmentSession;
use super::phase::SessionPhase;

/// Presentation-agnostic snapshot of the question on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub id: QuestionId,
    /// Zero-based position in the assessment.
    pub index: usize,
    pub text: String,
    pub kind: QuestionKind,
    pub options: Vec<String>,
    pub points: u32,
    pub answer: Option<String>,
}

/// What a presentation layer needs to render a session.
///
/// Raw values are kept alongside `remaining_display` so callers can format
/// time their own way.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub assessment_id: AssessmentId,
    pub title: String,
    pub description: Option<String>,
    pub phase: SessionPhase,
    pub attempt_id: Option<AttemptId>,
    pub attempt_number: Option<u32>,

    pub question_count: usize,
    pub current: Option<QuestionView>,
    pub answered: usize,

    pub time_limit_minutes: Option<u32>,
    pub passing_score: Option<u8>,
    pub max_attempts: u32,
    pub remaining_secs: Option<u64>,
    pub remaining_display: Option<String>,
    pub time_expired: bool,

    pub result: Option<SubmissionResult>,
    pub last_error: Option<String>,
}

impl SessionView {
    #[must_use]
    pub fn capture(session: &AssessmentSession) -> Self {
        let definition = session.definition();
        let settings = definition.settings();
        let current = session.current_question().map(|q| QuestionView {
            id: q.id(),
            index: session.current_index(),
            text: q.text().to_string(),
            kind: q.kind(),
            options: q.options().into_iter().map(str::to_owned).collect(),
            points: q.points(),
            answer: session.responses().get(q.id()).map(str::to_owned),
        });
        let remaining_secs = session.remaining_secs();

        Self {
            assessment_id: definition.id(),
            title: definition.title().to_string(),
            description: definition.description().map(str::to_owned),
            phase: session.phase(),
            attempt_id: session.attempt_id(),
            attempt_number: session.attempt().map(|a| a.number()),
            question_count: definition.question_count(),
            current,
            answered: session.responses().answered_count(),
            time_limit_minutes: settings.time_limit_minutes(),
            passing_score: settings.passing_score(),
            max_attempts: settings.max_attempts(),
            remaining_secs,
            remaining_display: remaining_secs.map(format_remaining),
            time_expired: session.is_time_expired(),
            result: session.result().cloned(),
            last_error: session.last_error().map(str::to_owned),
        }
    }

    /// `"answered/total"`, e.g. `"2/5"`.
    #[must_use]
    pub fn progress_label(&self) -> String {
        format!("{}/{}", self.answered, self.question_count)
    }
}
