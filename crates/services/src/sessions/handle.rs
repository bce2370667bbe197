use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use assess_core::model::{AttemptId, AttemptRecord, NewAttempt, QuestionId, SubmissionResult};
use storage::repository::{AttemptRepository, StorageError};

use super::controller::{AssessmentSession, PendingSubmission, SubmitTrigger};
use super::phase::SessionPhase;
use super::timer::{SessionTimer, TimerControl};
use super::view::SessionView;
use crate::Clock;
use crate::config::SessionConfig;
use crate::error::{PersistenceFailure, SessionError};

struct Shared {
    session: Mutex<AssessmentSession>,
    attempts: Arc<dyn AttemptRepository>,
    clock: Clock,
    config: SessionConfig,
    timer: Mutex<Option<SessionTimer>>,
    phase_tx: watch::Sender<SessionPhase>,
}

/// Async front for an `AssessmentSession`.
///
/// User actions and timer ticks are serialized on one lock; persistence calls
/// run outside it under `SessionConfig::submit_timeout`. Cloning yields
/// another handle to the same session.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    #[must_use]
    pub fn new(
        session: AssessmentSession,
        attempts: Arc<dyn AttemptRepository>,
        clock: Clock,
        config: SessionConfig,
    ) -> Self {
        let session = session.with_expired_retry_ticks(config.expired_retry_ticks);
        let (phase_tx, _) = watch::channel(session.phase());
        Self {
            shared: Arc::new(Shared {
                session: Mutex::new(session),
                attempts,
                clock,
                config,
                timer: Mutex::new(None),
                phase_tx,
            }),
        }
    }

    /// Observe phase transitions, including ones the timer causes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.shared.phase_tx.subscribe()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.shared.session.lock().await.phase()
    }

    pub async fn view(&self) -> SessionView {
        SessionView::capture(&*self.shared.session.lock().await)
    }

    pub async fn attempt_id(&self) -> Option<AttemptId> {
        self.shared.session.lock().await.attempt_id()
    }

    pub async fn result(&self) -> Option<SubmissionResult> {
        self.shared.session.lock().await.result().cloned()
    }

    fn publish(&self, phase: SessionPhase) {
        self.shared.phase_tx.send_if_modified(|current| {
            let changed = *current != phase;
            *current = phase;
            changed
        });
    }

    async fn with_deadline<T>(
        &self,
        call: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, PersistenceFailure> {
        let limit = self.shared.config.submit_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(res) => res.map_err(PersistenceFailure::from),
            Err(_) => Err(PersistenceFailure::TimedOut(limit)),
        }
    }

    /// Open the attempt and, for timed assessments, start the countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AttemptStartFailed` (retryable) or
    /// `SessionError::AttemptLimitReached`; the session stays in
    /// `Instructions` either way. `SessionError::InvalidPhase` if already
    /// started.
    pub async fn start(&self) -> Result<SessionView, SessionError> {
        let request = self
            .shared
            .session
            .lock()
            .await
            .begin_start(self.shared.clock.now())?;

        // Detached so that dropping this future cannot strand `start_in_flight`.
        let this = self.clone();
        tokio::spawn(async move { this.finish_start(request).await }).await?
    }

    async fn finish_start(&self, request: NewAttempt) -> Result<SessionView, SessionError> {
        let outcome = self
            .with_deadline(self.shared.attempts.start_attempt(&request))
            .await;

        let (view, timed) = {
            let mut session = self.shared.session.lock().await;
            session.complete_start(outcome)?;
            self.publish(session.phase());
            (SessionView::capture(&session), session.is_timed())
        };

        if timed {
            self.spawn_timer().await;
        }
        Ok(view)
    }

    /// # Errors
    ///
    /// See `AssessmentSession::set_answer`.
    pub async fn set_answer(
        &self,
        question_id: QuestionId,
        answer: impl Into<String>,
    ) -> Result<bool, SessionError> {
        self.shared
            .session
            .lock()
            .await
            .set_answer(question_id, answer)
    }

    /// # Errors
    ///
    /// See `AssessmentSession::set_current_answer`.
    pub async fn set_current_answer(&self, answer: impl Into<String>) -> Result<bool, SessionError> {
        self.shared.session.lock().await.set_current_answer(answer)
    }

    /// # Errors
    ///
    /// See `AssessmentSession::go_to`.
    pub async fn go_to(&self, index: usize) -> Result<usize, SessionError> {
        self.shared.session.lock().await.go_to(index)
    }

    /// # Errors
    ///
    /// See `AssessmentSession::next`.
    pub async fn next(&self) -> Result<usize, SessionError> {
        self.shared.session.lock().await.next()
    }

    /// # Errors
    ///
    /// See `AssessmentSession::previous`.
    pub async fn previous(&self) -> Result<usize, SessionError> {
        self.shared.session.lock().await.previous()
    }

    /// Grade and submit the attempt.
    ///
    /// Returns `Ok(None)` when another submission (e.g. the timer's) is in
    /// flight or already completed the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SubmissionFailed` when storage fails or times
    /// out; the session is back in `InProgress` and may be retried.
    pub async fn submit(&self) -> Result<Option<SubmissionResult>, SessionError> {
        let pending = {
            let mut session = self.shared.session.lock().await;
            let pending = session.begin_submit(SubmitTrigger::Manual, self.shared.clock.now())?;
            self.publish(session.phase());
            pending
        };
        let Some(pending) = pending else {
            return Ok(None);
        };

        // Detached so that dropping this future cannot leave the guard engaged.
        let this = self.clone();
        let result = tokio::spawn(async move {
            let result = this.finish_submission(pending).await;
            // A failed manual submit keeps the timer: after expiry its retry
            // schedule and the user's retries coexist, one at a time under the guard.
            if result.is_ok() {
                if let Some(timer) = this.shared.timer.lock().await.take() {
                    timer.cancel();
                }
            }
            result
        })
        .await??;
        Ok(Some(result))
    }

    async fn finish_submission(
        &self,
        pending: PendingSubmission,
    ) -> Result<SubmissionResult, SessionError> {
        let attempt_id = pending.attempt_id();
        let first = self
            .with_deadline(
                self.shared
                    .attempts
                    .submit_attempt(attempt_id, pending.submission()),
            )
            .await;
        let outcome = match first {
            Err(PersistenceFailure::Storage(StorageError::Conflict)) => {
                self.recover_submitted(attempt_id).await
            }
            other => other,
        };

        let mut session = self.shared.session.lock().await;
        let result = session.complete_submit(pending, outcome);
        self.publish(session.phase());
        result
    }

    /// A conflict means storage already holds a submission for this attempt,
    /// typically because an earlier reply was lost to the timeout.
    async fn recover_submitted(
        &self,
        attempt_id: AttemptId,
    ) -> Result<AttemptRecord, PersistenceFailure> {
        let record = self
            .with_deadline(self.shared.attempts.get_attempt(attempt_id))
            .await?;
        if record.is_submitted() {
            tracing::info!(%attempt_id, "attempt was already recorded; adopting stored result");
            Ok(record)
        } else {
            Err(StorageError::Conflict.into())
        }
    }

    async fn spawn_timer(&self) {
        let weak = Arc::downgrade(&self.shared);
        let timer = SessionTimer::spawn(self.shared.config.tick_period, move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(shared) => SessionHandle { shared }.on_tick().await,
                    None => TimerControl::Stop,
                }
            }
        });
        *self.shared.timer.lock().await = Some(timer);
    }

    async fn on_tick(&self) -> TimerControl {
        let pending = {
            let mut session = self.shared.session.lock().await;
            let outcome = session.tick();
            if session.phase().is_terminal() {
                return TimerControl::Stop;
            }
            if !outcome.wants_submit() {
                return TimerControl::Continue;
            }
            match session.begin_submit(SubmitTrigger::TimeExpired, self.shared.clock.now()) {
                Ok(Some(pending)) => {
                    self.publish(session.phase());
                    pending
                }
                Ok(None) | Err(_) => return TimerControl::Continue,
            }
        };

        let this = self.clone();
        match tokio::spawn(async move { this.finish_submission(pending).await }).await {
            Ok(Ok(_)) => TimerControl::Stop,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "automatic submission failed; will retry");
                TimerControl::Continue
            }
            Err(err) => {
                tracing::error!(error = %err, "automatic submission task failed");
                TimerControl::Continue
            }
        }
    }
}
