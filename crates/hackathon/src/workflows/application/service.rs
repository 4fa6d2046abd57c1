use std::path::Path;
use std::sync::Arc;

use futures_util::future::try_join_all;
use tracing::{info, instrument};

use crate::config::EventConfig;

use super::domain::{ApplicationRecord, FormItem, FormSubmission, User, UserId, UserPage};
use super::mailer::{acceptance_email, confirmation_email, MailError, Mailer};
use super::normalize::{normalize_submission, ValidationError};
use super::repository::{RepositoryError, UserRepository};
use super::schema::{QuestionSource, SchemaError};
use super::storage::{FileStore, StorageError};

/// Largest page the admin listing will return.
pub const MAX_PAGE_SIZE: usize = 100;

/// Service composing the question source, file store, mailer, and user repository.
pub struct ApplicationService<R, M> {
    repository: Arc<R>,
    mailer: Arc<M>,
    questions: Arc<dyn QuestionSource>,
    files: Arc<dyn FileStore>,
    event: EventConfig,
}

impl<R, M> ApplicationService<R, M>
where
    R: UserRepository + 'static,
    M: Mailer + 'static,
{
    pub fn new(
        repository: Arc<R>,
        mailer: Arc<M>,
        questions: Arc<dyn QuestionSource>,
        files: Arc<dyn FileStore>,
        event: EventConfig,
    ) -> Self {
        Self {
            repository,
            mailer,
            questions,
            files,
            event,
        }
    }

    pub fn event(&self) -> &EventConfig {
        &self.event
    }

    /// Directory relocated uploads end up in.
    pub fn upload_root(&self) -> &Path {
        self.files.root()
    }

    /// Allows the user themself or any administrator.
    pub async fn authorize(
        &self,
        requester: Option<&UserId>,
        target: &UserId,
    ) -> Result<(), SubmissionError> {
        let requester = requester.ok_or(SubmissionError::Unauthorized)?;
        if requester == target {
            return Ok(());
        }
        self.require_admin(Some(requester)).await
    }

    pub async fn require_admin(&self, requester: Option<&UserId>) -> Result<(), SubmissionError> {
        let requester = requester.ok_or(SubmissionError::Unauthorized)?;
        let acting = self
            .repository
            .find_by_id(requester)
            .await?
            .ok_or(SubmissionError::Unauthorized)?;
        if acting.admin {
            Ok(())
        } else {
            Err(SubmissionError::Forbidden)
        }
    }

    /// Validate a submission for `branch_name` and store it on the user's record.
    ///
    /// Nothing is moved, sent, or saved unless every question validates. Files
    /// already relocated stay in the upload root if a later step fails.
    #[instrument(skip(self, requester, user_id, submission), fields(user = %user_id))]
    pub async fn submit(
        &self,
        requester: Option<&UserId>,
        user_id: &UserId,
        branch_name: &str,
        submission: FormSubmission,
    ) -> Result<(), SubmissionError> {
        self.authorize(requester, user_id).await?;
        let mut user = self.load_user(user_id).await?;

        if user.application.applied && !user.application.is_branch(branch_name) {
            return Err(SubmissionError::BranchMismatch);
        }

        let branches = self
            .questions
            .load()
            .await
            .map_err(SubmissionError::Schema)?;
        let branch = branches
            .find(branch_name)
            .ok_or(SubmissionError::InvalidBranch)?;

        let mut items = normalize_submission(branch, &submission)?;

        self.relocate_files(&mut items).await?;

        let first_application = !user.application.applied;
        if first_application {
            let message = confirmation_email(&self.event, &branch.name, &user.email);
            self.mailer.send(message).await?;
        }

        user.application = ApplicationRecord {
            applied: true,
            application_branch: branch.name.clone(),
            application_data: items,
        };
        self.repository.save(&user).await?;

        info!(branch = %branch.name, first_application, "application saved");
        Ok(())
    }

    /// Clear the user's application. Uploaded files are left in place.
    #[instrument(skip(self, requester, user_id), fields(user = %user_id))]
    pub async fn delete_application(
        &self,
        requester: Option<&UserId>,
        user_id: &UserId,
    ) -> Result<(), SubmissionError> {
        self.authorize(requester, user_id).await?;
        let mut user = self.load_user(user_id).await?;

        user.application = ApplicationRecord::default();
        self.repository.save(&user).await?;

        info!("application deleted");
        Ok(())
    }

    /// Fetch the stored application for API responses.
    pub async fn application(
        &self,
        requester: Option<&UserId>,
        user_id: &UserId,
    ) -> Result<ApplicationRecord, SubmissionError> {
        self.authorize(requester, user_id).await?;
        let user = self.load_user(user_id).await?;
        Ok(user.application)
    }

    /// Admin-only toggle of an applicant's acceptance.
    #[instrument(skip(self, requester, user_id), fields(user = %user_id))]
    pub async fn set_acceptance(
        &self,
        requester: Option<&UserId>,
        user_id: &UserId,
        accepted: bool,
    ) -> Result<(), SubmissionError> {
        self.require_admin(requester).await?;
        let mut user = self.load_user(user_id).await?;

        user.accepted = accepted;
        self.repository.save(&user).await?;

        info!(accepted, "acceptance updated");
        Ok(())
    }

    /// Admin-only paginated user listing.
    pub async fn list_users(
        &self,
        requester: Option<&UserId>,
        offset: usize,
        count: usize,
    ) -> Result<UserPage, SubmissionError> {
        self.require_admin(requester).await?;

        let count = count.min(MAX_PAGE_SIZE);
        let total = self.repository.count().await?;
        let data = self
            .repository
            .list(offset, count)
            .await?
            .iter()
            .map(User::summary)
            .collect();

        Ok(UserPage {
            offset,
            count,
            total,
            data,
        })
    }

    /// Admin-only: mails every accepted user and returns how many messages went out.
    ///
    /// Stops at the first delivery failure; users mailed before it are not retried.
    #[instrument(skip(self, requester))]
    pub async fn send_acceptances(
        &self,
        requester: Option<&UserId>,
    ) -> Result<usize, SubmissionError> {
        self.require_admin(requester).await?;

        let total = self.repository.count().await?;
        let accepted: Vec<User> = self
            .repository
            .list(0, total)
            .await?
            .into_iter()
            .filter(|user| user.accepted)
            .collect();

        for user in &accepted {
            let branch = match user.application.application_branch.as_str() {
                "" => "participant",
                branch => branch,
            };
            let message = acceptance_email(&self.event, branch, &user.email);
            self.mailer.send(message).await?;
        }

        info!(count = accepted.len(), "acceptance emails sent");
        Ok(accepted.len())
    }

    async fn load_user(&self, user_id: &UserId) -> Result<User, SubmissionError> {
        self.repository
            .find_by_id(user_id)
            .await?
            .ok_or(SubmissionError::UserNotFound)
    }

    /// Moves every uploaded file concurrently, then records where each landed.
    async fn relocate_files(&self, items: &mut [FormItem]) -> Result<(), SubmissionError> {
        let moves = items
            .iter()
            .filter_map(|item| item.value.as_file())
            .map(|file| self.files.relocate(file));
        let targets = try_join_all(moves).await?;

        let root = self.files.root().to_path_buf();
        let files = items.iter_mut().filter_map(|item| item.value.as_file_mut());
        for (file, target) in files.zip(targets) {
            file.destination = root.clone();
            file.path = target;
        }
        Ok(())
    }
}

/// Error raised by the application service.
///
/// Display text of client-caused variants is safe to show to the requester.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("You must log in to access this endpoint")]
    Unauthorized,
    #[error("You are not permitted to access this endpoint")]
    Forbidden,
    #[error("User not found")]
    UserNotFound,
    #[error("You can only edit the application branch that you originally submitted")]
    BranchMismatch,
    #[error("question configuration failed to load")]
    Schema(#[source] SchemaError),
    #[error("Invalid application branch")]
    InvalidBranch,
    #[error("'{label}' is a required field")]
    MissingRequiredField { label: String },
    #[error("failed to move uploaded files")]
    Storage(#[from] StorageError),
    #[error("failed to send confirmation email")]
    Notification(#[from] MailError),
    #[error("failed to persist user record")]
    Persistence(#[from] RepositoryError),
}

impl SubmissionError {
    /// Infrastructure failures whose details stay server-side.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            SubmissionError::Schema(_)
                | SubmissionError::Storage(_)
                | SubmissionError::Notification(_)
                | SubmissionError::Persistence(_)
        )
    }
}

impl From<ValidationError> for SubmissionError {
    fn from(value: ValidationError) -> Self {
        match value {
            ValidationError::MissingRequiredField { label } => {
                SubmissionError::MissingRequiredField { label }
            }
        }
    }
}
