mod assessment;
mod attempt;
mod ids;
mod question;
mod response;

pub use ids::{AssessmentId, AttemptId, ParseIdError, QuestionId, UserId};

pub use assessment::{AssessmentDefinition, AssessmentError, AssessmentSettings};
pub use attempt::{
    AttemptError, AttemptRecord, AttemptStatus, AttemptSubmission, NewAttempt, QuestionOutcome,
    SubmissionResult,
};
pub use question::{Question, QuestionDraft, QuestionError, QuestionKind};
pub use response::ResponseMap;
