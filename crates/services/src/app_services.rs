use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::authoring::AssessmentAuthoringService;
use crate::config::SessionConfig;
use crate::error::AppServicesError;
use crate::generation::{ChatQuestionGenerator, QuestionGenerator, TemplateQuestionGenerator};
use crate::history::AttemptHistoryService;
use crate::sessions::AssessmentSessionService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    sessions: Arc<AssessmentSessionService>,
    history: Arc<AttemptHistoryService>,
    authoring: Arc<AssessmentAuthoringService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// Question generation uses the chat backend when `ASSESS_AI_API_KEY` is
    /// set and the template generator otherwise.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: SessionConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let chat = ChatQuestionGenerator::from_env();
        let generator: Arc<dyn QuestionGenerator> = if chat.enabled() {
            Arc::new(chat)
        } else {
            Arc::new(TemplateQuestionGenerator::default())
        };
        Ok(Self::from_storage(&storage, clock, config, generator))
    }

    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        config: SessionConfig,
        generator: Arc<dyn QuestionGenerator>,
    ) -> Self {
        let sessions = Arc::new(
            AssessmentSessionService::new(
                clock,
                Arc::clone(&storage.assessments),
                Arc::clone(&storage.attempts),
            )
            .with_config(config),
        );
        let history = Arc::new(AttemptHistoryService::new(
            Arc::clone(&storage.assessments),
            Arc::clone(&storage.attempts),
        ));
        let authoring = Arc::new(AssessmentAuthoringService::new(
            clock,
            Arc::clone(&storage.assessments),
            generator,
        ));

        Self {
            sessions,
            history,
            authoring,
        }
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<AssessmentSessionService> {
        Arc::clone(&self.sessions)
    }

    #[must_use]
    pub fn history(&self) -> Arc<AttemptHistoryService> {
        Arc::clone(&self.history)
    }

    #[must_use]
    pub fn authoring(&self) -> Arc<AssessmentAuthoringService> {
        Arc::clone(&self.authoring)
    }
}
