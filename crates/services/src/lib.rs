#![forbid(unsafe_code)]

pub mod app_services;
pub mod authoring;
pub mod config;
pub mod error;
pub mod generation;
pub mod history;
pub mod sessions;

pub use assess_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use authoring::AssessmentAuthoringService;
pub use config::{GeneratorConfig, SessionConfig};
pub use error::{
    AppServicesError, AuthoringError, GenerationError, HistoryError, PersistenceFailure,
    SessionError,
};
pub use generation::{
    ChatQuestionGenerator, Difficulty, GenerationRequest, QuestionGenerator,
    TemplateQuestionGenerator,
};
pub use history::{AttemptHistory, AttemptHistoryService};
pub use sessions::{
    AssessmentSession, AssessmentSessionService, SessionHandle, SessionPhase, SessionView,
    SubmitTrigger, TickOutcome,
};
