use std::sync::Arc;

use chrono::{DateTime, Utc};

use assess_core::model::{
    AssessmentDefinition, AttemptId, AttemptRecord, AttemptSubmission, NewAttempt, Question,
    QuestionId, ResponseMap, SubmissionResult, UserId,
};
use assess_core::scoring::score_responses;
use assess_core::time::elapsed_secs;
use storage::repository::StorageError;

use super::phase::SessionPhase;
use crate::error::{PersistenceFailure, SessionError};

//
// ─── TRIGGERS & OUTCOMES ───────────────────────────────────────────────────────
//

/// What caused a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    TimeExpired,
}

/// Effect of a single timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do: untimed, not in progress, or the guard is engaged.
    Idle,
    Counting { remaining: u64 },
    /// Remaining time just reached zero; submit now.
    Expired,
    /// Time is up and the last submission failed; try again.
    RetrySubmit,
}

impl TickOutcome {
    #[must_use]
    pub fn wants_submit(self) -> bool {
        matches!(self, TickOutcome::Expired | TickOutcome::RetrySubmit)
    }
}

/// A graded submission that has claimed the guard and is waiting for the
/// persistence layer.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    attempt_id: AttemptId,
    trigger: SubmitTrigger,
    result: SubmissionResult,
    submission: AttemptSubmission,
}

impl PendingSubmission {
    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    #[must_use]
    pub fn trigger(&self) -> SubmitTrigger {
        self.trigger
    }

    #[must_use]
    pub fn result(&self) -> &SubmissionResult {
        &self.result
    }

    #[must_use]
    pub fn submission(&self) -> &AttemptSubmission {
        &self.submission
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One user's attempt at one assessment, from the instructions screen to a
/// scored submission.
///
/// Purely synchronous: persistence calls happen between the `begin_*` and
/// `complete_*` halves of `start` and `submit`, outside this type. Entering
/// `Submitting` is the submission guard; `begin_submit` both checks and sets
/// it, so callers that serialize access (see `SessionHandle`) cannot issue
/// two submissions for one attempt.
#[derive(Debug, Clone)]
pub struct AssessmentSession {
    definition: Arc<AssessmentDefinition>,
    user_id: UserId,
    phase: SessionPhase,
    start_in_flight: bool,
    attempt: Option<AttemptRecord>,
    current_index: usize,
    responses: ResponseMap,
    remaining_secs: Option<u64>,
    time_expired: bool,
    retry_every: u32,
    retry_countdown: u32,
    result: Option<SubmissionResult>,
    last_error: Option<String>,
}

impl AssessmentSession {
    #[must_use]
    pub fn new(definition: Arc<AssessmentDefinition>, user_id: UserId) -> Self {
        Self {
            definition,
            user_id,
            phase: SessionPhase::Instructions,
            start_in_flight: false,
            attempt: None,
            current_index: 0,
            responses: ResponseMap::new(),
            remaining_secs: None,
            time_expired: false,
            retry_every: 0,
            retry_countdown: 0,
            result: None,
            last_error: None,
        }
    }

    /// After an expired submission fails, re-submit every `ticks` ticks.
    /// Zero disables automatic retries.
    #[must_use]
    pub fn with_expired_retry_ticks(mut self, ticks: u32) -> Self {
        self.retry_every = ticks;
        self
    }

    #[must_use]
    pub fn definition(&self) -> &AssessmentDefinition {
        &self.definition
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn attempt(&self) -> Option<&AttemptRecord> {
        self.attempt.as_ref()
    }

    #[must_use]
    pub fn attempt_id(&self) -> Option<AttemptId> {
        self.attempt.as_ref().map(AttemptRecord::id)
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The question at the current index, once the attempt has started.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            SessionPhase::Instructions => None,
            _ => self.definition.question_at(self.current_index),
        }
    }

    #[must_use]
    pub fn responses(&self) -> &ResponseMap {
        &self.responses
    }

    /// Seconds left, `None` when untimed or not started.
    #[must_use]
    pub fn remaining_secs(&self) -> Option<u64> {
        self.remaining_secs
    }

    #[must_use]
    pub fn is_timed(&self) -> bool {
        self.definition.settings().time_limit_secs().is_some()
    }

    #[must_use]
    pub fn is_time_expired(&self) -> bool {
        self.time_expired
    }

    #[must_use]
    pub fn result(&self) -> Option<&SubmissionResult> {
        self.result.as_ref()
    }

    /// Message of the most recent failed start or submit, cleared on success.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidPhase {
            phase: self.phase,
            action,
        }
    }

    fn ensure_in_progress(&self, action: &'static str) -> Result<(), SessionError> {
        if self.phase == SessionPhase::InProgress {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    //
    // ─── START ─────────────────────────────────────────────────────────────────
    //

    /// Claim the start and build the request for a new attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `Instructions` and
    /// `SessionError::StartInFlight` while another start is pending.
    pub fn begin_start(&mut self, now: DateTime<Utc>) -> Result<NewAttempt, SessionError> {
        if self.phase != SessionPhase::Instructions {
            return Err(self.invalid("start"));
        }
        if self.start_in_flight {
            return Err(SessionError::StartInFlight);
        }
        self.start_in_flight = true;
        Ok(NewAttempt {
            assessment_id: self.definition.id(),
            user_id: self.user_id,
            started_at: now,
        })
    }

    /// Apply the persistence layer's answer to `begin_start`.
    ///
    /// # Errors
    ///
    /// On failure the session stays in `Instructions` and returns
    /// `SessionError::AttemptLimitReached` when no attempts remain, otherwise
    /// the retryable `SessionError::AttemptStartFailed`.
    pub fn complete_start(
        &mut self,
        outcome: Result<AttemptRecord, PersistenceFailure>,
    ) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Instructions || !self.start_in_flight {
            return Err(self.invalid("complete start"));
        }
        self.start_in_flight = false;

        match outcome {
            Ok(attempt) => {
                tracing::info!(
                    assessment_id = %self.definition.id(),
                    attempt_id = %attempt.id(),
                    number = attempt.number(),
                    "attempt started"
                );
                self.attempt = Some(attempt);
                self.phase = SessionPhase::InProgress;
                self.current_index = 0;
                self.responses = ResponseMap::new();
                self.remaining_secs = self.definition.settings().time_limit_secs();
                self.time_expired = false;
                self.last_error = None;
                Ok(())
            }
            Err(PersistenceFailure::Storage(StorageError::AttemptLimitReached { max })) => {
                let err = SessionError::AttemptLimitReached { max };
                self.last_error = Some(err.to_string());
                Err(err)
            }
            Err(failure) => {
                tracing::warn!(
                    assessment_id = %self.definition.id(),
                    error = %failure,
                    "attempt start failed"
                );
                let err = SessionError::AttemptStartFailed(failure);
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    //
    // ─── ANSWERING & NAVIGATION ────────────────────────────────────────────────
    //

    /// Record `answer` for `question_id`, replacing any earlier answer.
    ///
    /// Returns whether the stored answer changed; repeating the same value is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `InProgress`,
    /// `SessionError::TimeExpired` once the countdown hit zero, and
    /// `SessionError::InvalidQuestionReference` for ids not in the assessment.
    pub fn set_answer(
        &mut self,
        question_id: QuestionId,
        answer: impl Into<String>,
    ) -> Result<bool, SessionError> {
        self.ensure_in_progress("answer")?;
        if self.time_expired {
            return Err(SessionError::TimeExpired);
        }
        if !self.definition.contains_question(question_id) {
            return Err(SessionError::InvalidQuestionReference(question_id));
        }
        Ok(self.responses.set(question_id, answer))
    }

    /// `set_answer` for the question at the current index.
    ///
    /// # Errors
    ///
    /// Same as `set_answer`.
    pub fn set_current_answer(&mut self, answer: impl Into<String>) -> Result<bool, SessionError> {
        self.ensure_in_progress("answer")?;
        let question_id = self
            .definition
            .question_at(self.current_index)
            .map(Question::id)
            .ok_or(SessionError::IndexOutOfRange {
                index: self.current_index,
                len: self.definition.question_count(),
            })?;
        self.set_answer(question_id, answer)
    }

    /// Jump to any question. Out-of-range indexes are rejected and leave the
    /// current index untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `InProgress` and
    /// `SessionError::IndexOutOfRange` for `index >= question_count`.
    pub fn go_to(&mut self, index: usize) -> Result<usize, SessionError> {
        self.ensure_in_progress("navigate")?;
        let len = self.definition.question_count();
        if index >= len {
            return Err(SessionError::IndexOutOfRange { index, len });
        }
        self.current_index = index;
        Ok(index)
    }

    /// Move forward one question, staying on the last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `InProgress`.
    pub fn next(&mut self) -> Result<usize, SessionError> {
        self.ensure_in_progress("navigate")?;
        let last = self.definition.question_count().saturating_sub(1);
        self.current_index = (self.current_index + 1).min(last);
        Ok(self.current_index)
    }

    /// Move back one question, staying on the first one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `InProgress`.
    pub fn previous(&mut self) -> Result<usize, SessionError> {
        self.ensure_in_progress("navigate")?;
        self.current_index = self.current_index.saturating_sub(1);
        Ok(self.current_index)
    }

    //
    // ─── TIMER ─────────────────────────────────────────────────────────────────
    //

    /// Advance the countdown by one second.
    ///
    /// Returns `Expired` exactly once, on the tick that reaches zero. The
    /// counter then stays at zero; if the submission it triggers fails, every
    /// `retry_every` ticks yield `RetrySubmit`.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != SessionPhase::InProgress {
            return TickOutcome::Idle;
        }
        let Some(remaining) = self.remaining_secs else {
            return TickOutcome::Idle;
        };

        if self.time_expired {
            if self.retry_every == 0 {
                return TickOutcome::Idle;
            }
            self.retry_countdown = self.retry_countdown.saturating_sub(1);
            if self.retry_countdown == 0 {
                self.retry_countdown = self.retry_every;
                return TickOutcome::RetrySubmit;
            }
            return TickOutcome::Idle;
        }

        let remaining = remaining.saturating_sub(1);
        self.remaining_secs = Some(remaining);
        if remaining == 0 {
            self.time_expired = true;
            tracing::info!(
                assessment_id = %self.definition.id(),
                attempt_id = ?self.attempt_id(),
                "time expired"
            );
            TickOutcome::Expired
        } else {
            TickOutcome::Counting { remaining }
        }
    }

    //
    // ─── SUBMIT ────────────────────────────────────────────────────────────────
    //

    /// Check-and-set the submission guard and grade the current responses.
    ///
    /// Returns `Ok(None)` when a submission is already in flight or done.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` before the attempt has started.
    pub fn begin_submit(
        &mut self,
        trigger: SubmitTrigger,
        now: DateTime<Utc>,
    ) -> Result<Option<PendingSubmission>, SessionError> {
        match self.phase {
            SessionPhase::Instructions => return Err(self.invalid("submit")),
            SessionPhase::Submitting | SessionPhase::Completed => return Ok(None),
            SessionPhase::InProgress => {}
        }
        let Some(attempt) = self.attempt.as_ref() else {
            return Err(self.invalid("submit"));
        };

        let result = score_responses(&self.definition, &self.responses);
        let time_spent = elapsed_secs(attempt.started_at(), now);
        let submission = AttemptSubmission::from_result(&result, now, time_spent);
        let attempt_id = attempt.id();

        self.phase = SessionPhase::Submitting;
        tracing::info!(
            assessment_id = %self.definition.id(),
            attempt_id = %attempt_id,
            ?trigger,
            score = result.score,
            "submitting attempt"
        );

        Ok(Some(PendingSubmission {
            attempt_id,
            trigger,
            result,
            submission,
        }))
    }

    /// Apply the persistence layer's answer to `begin_submit`.
    ///
    /// Success completes the session. Failure releases the guard and returns
    /// to `InProgress`; an expired countdown stays at zero.
    ///
    /// # Errors
    ///
    /// Returns the retryable `SessionError::SubmissionFailed` on failure, or
    /// `SessionError::InvalidPhase` if no submission was in flight.
    pub fn complete_submit(
        &mut self,
        pending: PendingSubmission,
        outcome: Result<AttemptRecord, PersistenceFailure>,
    ) -> Result<SubmissionResult, SessionError> {
        if self.phase != SessionPhase::Submitting
            || self.attempt_id() != Some(pending.attempt_id)
        {
            return Err(self.invalid("complete submission"));
        }

        match outcome {
            Ok(record) => {
                // A record recovered after a lost reply carries what storage kept.
                let result = if record.outcomes() == pending.result.outcomes.as_slice() {
                    pending.result
                } else {
                    SubmissionResult::from_record(&record).unwrap_or(pending.result)
                };
                tracing::info!(
                    assessment_id = %self.definition.id(),
                    attempt_id = %record.id(),
                    status = %result.status(),
                    score = result.score,
                    "attempt completed"
                );
                self.attempt = Some(record);
                self.result = Some(result.clone());
                self.phase = SessionPhase::Completed;
                self.last_error = None;
                Ok(result)
            }
            Err(failure) => {
                tracing::warn!(
                    assessment_id = %self.definition.id(),
                    attempt_id = %pending.attempt_id,
                    trigger = ?pending.trigger,
                    error = %failure,
                    "submission failed"
                );
                self.phase = SessionPhase::InProgress;
                if self.time_expired {
                    self.retry_countdown = self.retry_every;
                }
                let err = SessionError::SubmissionFailed(failure);
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assess_core::model::{
        AssessmentId, AssessmentSettings, AttemptStatus, QuestionDraft, QuestionKind,
    };
    use assess_core::time::fixed_now;
    use chrono::Duration;

    fn mc(answer: &str) -> QuestionDraft {
        QuestionDraft {
            text: format!("Pick {answer}"),
            kind: QuestionKind::MultipleChoice,
            choices: ["A", "B", "C", "X"].iter().map(|c| (*c).to_string()).collect(),
            correct_answer: answer.to_string(),
            points: 1,
        }
    }

    fn definition(time_limit: Option<u32>, passing: Option<u8>) -> Arc<AssessmentDefinition> {
        let questions = ["A", "B", "C"]
            .iter()
            .zip(1_u64..)
            .map(|(a, id)| mc(a).validate(QuestionId::new(id)).unwrap())
            .collect();
        Arc::new(
            AssessmentDefinition::new(
                AssessmentId::new(1),
                "Letters",
                None,
                questions,
                AssessmentSettings::new(time_limit, passing, 3).unwrap(),
                fixed_now(),
            )
            .unwrap(),
        )
    }

    fn started(def: Arc<AssessmentDefinition>) -> AssessmentSession {
        let mut session = AssessmentSession::new(def, UserId::random()).with_expired_retry_ticks(2);
        let request = session.begin_start(fixed_now()).unwrap();
        let record = AttemptRecord::started(
            AttemptId::new(9),
            request.assessment_id,
            request.user_id,
            1,
            request.started_at,
        )
        .unwrap();
        session.complete_start(Ok(record)).unwrap();
        session
    }

    #[test]
    fn start_enters_in_progress_with_full_clock() {
        let session = started(definition(Some(1), None));
        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert_eq!(session.remaining_secs(), Some(60));
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.attempt_id(), Some(AttemptId::new(9)));
    }

    #[test]
    fn failed_start_stays_in_instructions_and_can_retry() {
        let mut session = AssessmentSession::new(definition(None, None), UserId::random());
        session.begin_start(fixed_now()).unwrap();
        assert!(matches!(
            session.begin_start(fixed_now()),
            Err(SessionError::StartInFlight)
        ));

        let err = session
            .complete_start(Err(StorageError::Connection("down".into()).into()))
            .unwrap_err();
        assert!(matches!(err, SessionError::AttemptStartFailed(_)));
        assert!(err.is_retryable());
        assert_eq!(session.phase(), SessionPhase::Instructions);
        assert!(session.last_error().is_some());

        assert!(session.begin_start(fixed_now()).is_ok());
    }

    #[test]
    fn exhausted_attempts_are_not_retryable() {
        let mut session = AssessmentSession::new(definition(None, None), UserId::random());
        session.begin_start(fixed_now()).unwrap();
        let err = session
            .complete_start(Err(
                StorageError::AttemptLimitReached { max: 3 }.into()
            ))
            .unwrap_err();
        assert!(matches!(err, SessionError::AttemptLimitReached { max: 3 }));
        assert!(!err.is_retryable());
        assert_eq!(session.phase(), SessionPhase::Instructions);
    }

    #[test]
    fn operations_before_start_are_rejected() {
        let mut session = AssessmentSession::new(definition(Some(1), None), UserId::random());
        assert!(matches!(
            session.set_answer(QuestionId::new(1), "A"),
            Err(SessionError::InvalidPhase { .. })
        ));
        assert!(session.go_to(0).is_err());
        assert_eq!(session.tick(), TickOutcome::Idle);
        assert!(session.begin_submit(SubmitTrigger::Manual, fixed_now()).is_err());
        assert!(session.current_question().is_none());
    }

    #[test]
    fn set_answer_is_idempotent_and_overwrites() {
        let mut session = started(definition(None, None));
        let q = QuestionId::new(2);
        assert!(session.set_answer(q, "X").unwrap());
        let snapshot = session.responses().clone();
        assert!(!session.set_answer(q, "X").unwrap());
        assert_eq!(session.responses(), &snapshot);

        assert!(session.set_answer(q, "B").unwrap());
        assert_eq!(session.responses().get(q), Some("B"));
        assert_eq!(session.responses().len(), 1);
    }

    #[test]
    fn unknown_question_is_rejected() {
        let mut session = started(definition(None, None));
        let err = session.set_answer(QuestionId::new(42), "A").unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidQuestionReference(id) if id == QuestionId::new(42)
        ));
        assert!(session.responses().is_empty());
    }

    #[test]
    fn go_to_rejects_out_of_range_without_moving() {
        let mut session = started(definition(None, None));
        assert_eq!(session.go_to(2).unwrap(), 2);
        assert!(matches!(
            session.go_to(3),
            Err(SessionError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert_eq!(session.current_index(), 2);
        assert!(session.go_to(usize::MAX).is_err());
        assert_eq!(session.current_index(), 2);
    }

    #[test]
    fn next_and_previous_clamp() {
        let mut session = started(definition(None, None));
        assert_eq!(session.previous().unwrap(), 0);
        session.next().unwrap();
        session.next().unwrap();
        assert_eq!(session.next().unwrap(), 2);
        assert_eq!(session.current_question().unwrap().id(), QuestionId::new(3));
    }

    #[test]
    fn untimed_session_ignores_ticks() {
        let mut session = started(definition(None, None));
        for _ in 0..100 {
            assert_eq!(session.tick(), TickOutcome::Idle);
        }
        assert_eq!(session.remaining_secs(), None);
    }

    #[test]
    fn countdown_expires_once_and_freezes_at_zero() {
        let mut session = started(definition(Some(1), None));
        for expected in (1..60).rev() {
            assert_eq!(session.tick(), TickOutcome::Counting { remaining: expected });
        }
        assert_eq!(session.tick(), TickOutcome::Expired);
        assert_eq!(session.remaining_secs(), Some(0));

        let pending = session
            .begin_submit(SubmitTrigger::TimeExpired, fixed_now())
            .unwrap()
            .unwrap();
        assert_eq!(session.phase(), SessionPhase::Submitting);
        assert_eq!(session.tick(), TickOutcome::Idle);
        assert!(session
            .begin_submit(SubmitTrigger::Manual, fixed_now())
            .unwrap()
            .is_none());
        assert_eq!(session.remaining_secs(), Some(0));
        assert_eq!(pending.result().score, 0.0);
    }

    #[test]
    fn answers_are_frozen_after_expiry() {
        let mut session = started(definition(Some(1), None));
        for _ in 0..60 {
            session.tick();
        }
        assert!(matches!(
            session.set_answer(QuestionId::new(1), "A"),
            Err(SessionError::TimeExpired)
        ));
    }

    #[test]
    fn failed_submission_releases_guard() {
        let mut session = started(definition(None, Some(60)));
        session.set_answer(QuestionId::new(1), "A").unwrap();
        let pending = session
            .begin_submit(SubmitTrigger::Manual, fixed_now())
            .unwrap()
            .unwrap();

        let err = session
            .complete_submit(
                pending,
                Err(PersistenceFailure::TimedOut(std::time::Duration::from_secs(10))),
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::SubmissionFailed(_)));
        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert!(session.result().is_none());

        // Guard released: user may edit and retry.
        session.set_answer(QuestionId::new(2), "B").unwrap();
        assert!(session
            .begin_submit(SubmitTrigger::Manual, fixed_now())
            .unwrap()
            .is_some());
    }

    #[test]
    fn expired_failure_retries_on_schedule_without_restarting_clock() {
        let mut session = started(definition(Some(1), None));
        for _ in 0..60 {
            session.tick();
        }
        let pending = session
            .begin_submit(SubmitTrigger::TimeExpired, fixed_now())
            .unwrap()
            .unwrap();
        session
            .complete_submit(pending, Err(StorageError::Connection("down".into()).into()))
            .unwrap_err();

        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert_eq!(session.tick(), TickOutcome::Idle);
        assert_eq!(session.tick(), TickOutcome::RetrySubmit);
        assert_eq!(session.tick(), TickOutcome::Idle);
        assert_eq!(session.tick(), TickOutcome::RetrySubmit);
        assert_eq!(session.remaining_secs(), Some(0));
    }

    #[test]
    fn successful_submission_completes_and_locks_session() {
        let mut session = started(definition(None, Some(70)));
        session.set_answer(QuestionId::new(1), "A").unwrap();
        session.set_answer(QuestionId::new(2), "X").unwrap();
        session.set_answer(QuestionId::new(3), "C").unwrap();

        let submitted_at = fixed_now() + Duration::seconds(30);
        let pending = session
            .begin_submit(SubmitTrigger::Manual, submitted_at)
            .unwrap()
            .unwrap();
        assert_eq!(pending.submission().time_spent_secs, 30);
        assert_eq!(pending.submission().status, AttemptStatus::Failed);

        let mut record = session.attempt().unwrap().clone();
        record.apply_submission(pending.submission()).unwrap();
        let result = session.complete_submit(pending, Ok(record)).unwrap();

        assert_eq!(assess_core::scoring::round_score(result.score), 66.67);
        assert_eq!(result.passed, Some(false));
        assert_eq!(session.phase(), SessionPhase::Completed);
        assert!(session.set_answer(QuestionId::new(2), "B").is_err());
        assert!(session.go_to(0).is_err());
        assert_eq!(session.tick(), TickOutcome::Idle);
        assert!(session
            .begin_submit(SubmitTrigger::Manual, fixed_now())
            .unwrap()
            .is_none());
    }
}
