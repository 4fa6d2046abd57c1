//! Event application intake and review.
//!
//! A submission is validated against its branch's question schema, uploaded files are
//! moved into permanent storage, first-time applicants get a confirmation email, and the
//! normalized answers are stored on the user record.

pub mod domain;
pub mod intake;
pub mod mailer;
pub mod normalize;
pub mod repository;
pub mod router;
pub mod schema;
pub mod service;
pub mod storage;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationRecord, FormItem, FormSubmission, FormValue, Question, QuestionBranch,
    QuestionBranches, QuestionType, SubmittedValue, UploadedFile, User, UserId, UserPage,
    UserSummary, OTHER_SENTINEL,
};
pub use intake::IntakeError;
pub use mailer::{acceptance_email, confirmation_email, MailError, MailMessage, Mailer};
pub use normalize::{normalize_submission, ValidationError};
pub use repository::{RepositoryError, UserRepository};
pub use router::{application_router, Requester, USER_HEADER};
pub use schema::{FileQuestionSource, QuestionSource, SchemaError, StaticQuestionSource};
pub use service::{ApplicationService, SubmissionError, MAX_PAGE_SIZE};
pub use storage::{FileStore, LocalFileStore, StorageError};
