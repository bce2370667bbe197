mod controller;
mod handle;
mod phase;
mod service;
mod timer;
mod view;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{AssessmentSession, PendingSubmission, SubmitTrigger, TickOutcome};
pub use handle::SessionHandle;
pub use phase::SessionPhase;
pub use service::AssessmentSessionService;
pub use timer::{SessionTimer, TimerControl};
pub use view::{QuestionView, SessionView};
