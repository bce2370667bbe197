use std::sync::Arc;

use assess_core::model::{AssessmentDefinition, AssessmentId, UserId};
use storage::repository::{AssessmentRepository, AttemptRepository, StorageError};

use super::controller::AssessmentSession;
use super::handle::SessionHandle;
use crate::Clock;
use crate::config::SessionConfig;
use crate::error::SessionError;

/// Opens assessment sessions against the persistence service.
///
/// Owns the time source, the session timing config and repository access;
/// each opened session is independent of the others.
#[derive(Clone)]
pub struct AssessmentSessionService {
    clock: Clock,
    config: SessionConfig,
    assessments: Arc<dyn AssessmentRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl AssessmentSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        assessments: Arc<dyn AssessmentRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            config: SessionConfig::default(),
            assessments,
            attempts,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// Fetch a definition.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::DefinitionNotFound` for unknown ids and
    /// `SessionError::Storage` for other repository failures.
    pub async fn load_definition(
        &self,
        assessment_id: AssessmentId,
    ) -> Result<AssessmentDefinition, SessionError> {
        match self.assessments.get_assessment(assessment_id).await {
            Ok(definition) => Ok(definition),
            Err(StorageError::NotFound) => Err(SessionError::DefinitionNotFound(assessment_id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Load the definition and return a session in `Instructions`.
    ///
    /// A failed fetch is terminal: no session exists to retry from.
    ///
    /// # Errors
    ///
    /// See `load_definition`.
    pub async fn open_session(
        &self,
        assessment_id: AssessmentId,
        user_id: UserId,
    ) -> Result<SessionHandle, SessionError> {
        let definition = self.load_definition(assessment_id).await?;
        tracing::debug!(%assessment_id, %user_id, questions = definition.question_count(), "session opened");
        let session = AssessmentSession::new(Arc::new(definition), user_id);
        Ok(SessionHandle::new(
            session,
            Arc::clone(&self.attempts),
            self.clock,
            self.config,
        ))
    }

    /// List deliverable assessments ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_assessments(
        &self,
        limit: u32,
    ) -> Result<Vec<AssessmentDefinition>, SessionError> {
        Ok(self.assessments.list_assessments(limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::SessionPhase;
    use storage::repository::Storage;

    #[tokio::test]
    async fn missing_definition_is_terminal() {
        let storage = Storage::in_memory();
        let service = AssessmentSessionService::new(
            Clock::default_clock(),
            storage.assessments,
            storage.attempts,
        );
        let err = service
            .open_session(AssessmentId::new(5), UserId::random())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SessionError::DefinitionNotFound(id) if id == AssessmentId::new(5)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn opened_session_waits_in_instructions() {
        use assess_core::model::{AssessmentSettings, QuestionDraft, QuestionKind};
        use storage::repository::NewAssessmentRecord;

        let storage = Storage::in_memory();
        let id = storage
            .assessments
            .insert_new_assessment(NewAssessmentRecord {
                title: "Quick".into(),
                description: None,
                questions: vec![QuestionDraft {
                    text: "2 + 2".into(),
                    kind: QuestionKind::ShortAnswer,
                    choices: Vec::new(),
                    correct_answer: "4".into(),
                    points: 1,
                }],
                settings: AssessmentSettings::practice(),
                created_at: assess_core::time::fixed_now(),
            })
            .await
            .unwrap();

        let service =
            AssessmentSessionService::new(Clock::default_clock(), storage.assessments, storage.attempts);
        let handle = service.open_session(id, UserId::random()).await.unwrap();
        assert_eq!(handle.phase().await, SessionPhase::Instructions);
        assert!(handle.attempt_id().await.is_none());
        assert_eq!(service.list_assessments(10).await.unwrap().len(), 1);
    }
}
