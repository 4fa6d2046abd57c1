use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        multipart::MultipartRejection, DefaultBodyLimit, FromRequest, FromRequestParts, Multipart,
        Path, Query, Request, State,
    },
    http::{header::CONTENT_TYPE, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::UserId;
use super::intake::{discard_staged, discard_unclaimed, read_submission, IntakeError};
use super::mailer::Mailer;
use super::repository::UserRepository;
use super::service::{ApplicationService, SubmissionError};

/// Header the upstream session layer uses to carry the authenticated user's id.
pub const USER_HEADER: &str = "x-user-id";

const DEFAULT_PAGE_SIZE: usize = 10;

/// Router builder exposing the application and admin review endpoints.
///
/// Submissions may be as large as the event's `upload_max_bytes`; every other route keeps
/// axum's default body limit.
pub fn application_router<R, M>(service: Arc<ApplicationService<R, M>>) -> Router
where
    R: UserRepository + 'static,
    M: Mailer + 'static,
{
    let upload_limit = service.event().upload_max_bytes;
    Router::new()
        .route(
            "/api/user/:id/application/:branch",
            post(submit_handler::<R, M>).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/user/all/send_acceptances",
            post(send_acceptances_handler::<R, M>),
        )
        .route(
            "/api/user/:id/application",
            get(application_handler::<R, M>).delete(delete_handler::<R, M>),
        )
        .route("/api/user/:id/status", post(status_handler::<R, M>))
        .route("/api/admin/users", get(users_handler::<R, M>))
        .with_state(service)
}

/// Identity of the caller, absent when the request carries no session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester(pub Option<UserId>);

impl Requester {
    pub fn id(&self) -> Option<&UserId> {
        self.0.as_ref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(UserId::from);
        Ok(Self(id))
    }
}

/// Acceptance toggle. The review dashboard posts it as a multipart form field
/// (`status=true`); JSON bodies (`{"status": true}`) are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: bool,
}

#[derive(Deserialize)]
struct JsonStatus {
    status: bool,
}

#[async_trait]
impl<S> FromRequest<S> for StatusUpdate
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        if is_json {
            let Json(body) = Json::<JsonStatus>::from_request(request, state)
                .await
                .map_err(|rejection| error_body(rejection.status(), rejection.body_text()))?;
            return Ok(Self {
                status: body.status,
            });
        }

        let mut form = Multipart::from_request(request, state)
            .await
            .map_err(|rejection| error_body(rejection.status(), rejection.body_text()))?;
        let mut raw = None;
        while let Some(field) = form
            .next_field()
            .await
            .map_err(|err| error_body(err.status(), err.body_text()))?
        {
            if field.name() == Some("status") {
                let value = field
                    .text()
                    .await
                    .map_err(|err| error_body(err.status(), err.body_text()))?;
                raw = Some(value);
            }
        }

        match raw.as_deref().map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("true") => Ok(Self { status: true }),
            Some(value) if value.eq_ignore_ascii_case("false") => Ok(Self { status: false }),
            _ => Err(error_body(
                StatusCode::BAD_REQUEST,
                "'status' must be \"true\" or \"false\"",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserPageQuery {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_page_size")]
    pub count: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl SubmissionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SubmissionError::Unauthorized => StatusCode::UNAUTHORIZED,
            SubmissionError::Forbidden => StatusCode::FORBIDDEN,
            SubmissionError::UserNotFound => StatusCode::NOT_FOUND,
            SubmissionError::BranchMismatch
            | SubmissionError::InvalidBranch
            | SubmissionError::MissingRequiredField { .. } => StatusCode::BAD_REQUEST,
            SubmissionError::Schema(_)
            | SubmissionError::Storage(_)
            | SubmissionError::Notification(_)
            | SubmissionError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converts into a response, replacing internal detail with `internal_message`.
    fn respond(self, internal_message: &str) -> Response {
        let status = self.status_code();
        let message = if self.is_internal() {
            error!(error = %self, source = ?std::error::Error::source(&self), "request failed");
            match self {
                SubmissionError::Schema(_) => {
                    "An error occurred while validating question structure".to_string()
                }
                _ => internal_message.to_string(),
            }
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl IntoResponse for SubmissionError {
    fn into_response(self) -> Response {
        self.respond("An error occurred while processing the request")
    }
}

fn success() -> Response {
    (StatusCode::OK, Json(json!({ "success": true }))).into_response()
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn malformed_submission(status: StatusCode, detail: &str) -> Response {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        error_body(status, "Upload exceeds the maximum allowed size")
    } else {
        error_body(status, format!("Malformed form submission: {detail}"))
    }
}

pub(crate) async fn submit_handler<R, M>(
    State(service): State<Arc<ApplicationService<R, M>>>,
    requester: Requester,
    Path((user_id, branch)): Path<(String, String)>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response
where
    R: UserRepository + 'static,
    M: Mailer + 'static,
{
    let user_id = UserId(user_id);
    // Reject before the body is looked at or anything is written to the temporary directory.
    if let Err(err) = service.authorize(requester.id(), &user_id).await {
        return err.into_response();
    }

    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return malformed_submission(rejection.status(), &rejection.body_text()),
    };

    let submission = match read_submission(multipart, &service.event().upload_temp_dir).await {
        Ok(submission) => submission,
        Err(IntakeError::Multipart(err)) => {
            return malformed_submission(err.status(), &err.body_text());
        }
        Err(err) => {
            error!(error = %err, "failed to stage uploads");
            return error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while saving the application",
            );
        }
    };

    let staged = submission.files.clone();
    match service
        .submit(requester.id(), &user_id, &branch, submission)
        .await
    {
        Ok(()) => {
            discard_unclaimed(&staged, service.upload_root()).await;
            success()
        }
        Err(err) => {
            discard_staged(&staged).await;
            err.respond("An error occurred while saving the application")
        }
    }
}

pub(crate) async fn delete_handler<R, M>(
    State(service): State<Arc<ApplicationService<R, M>>>,
    requester: Requester,
    Path(user_id): Path<String>,
) -> Response
where
    R: UserRepository + 'static,
    M: Mailer + 'static,
{
    match service
        .delete_application(requester.id(), &UserId(user_id))
        .await
    {
        Ok(()) => success(),
        Err(err) => err.respond("An error occurred while deleting the application"),
    }
}

pub(crate) async fn application_handler<R, M>(
    State(service): State<Arc<ApplicationService<R, M>>>,
    requester: Requester,
    Path(user_id): Path<String>,
) -> Response
where
    R: UserRepository + 'static,
    M: Mailer + 'static,
{
    match service.application(requester.id(), &UserId(user_id)).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn status_handler<R, M>(
    State(service): State<Arc<ApplicationService<R, M>>>,
    requester: Requester,
    Path(user_id): Path<String>,
    update: Result<StatusUpdate, Response>,
) -> Response
where
    R: UserRepository + 'static,
    M: Mailer + 'static,
{
    if let Err(err) = service.require_admin(requester.id()).await {
        return err.into_response();
    }
    let update = match update {
        Ok(update) => update,
        Err(rejection) => return rejection,
    };

    match service
        .set_acceptance(requester.id(), &UserId(user_id), update.status)
        .await
    {
        Ok(()) => success(),
        Err(err) => err.respond("An error occurred while updating the user's status"),
    }
}

pub(crate) async fn send_acceptances_handler<R, M>(
    State(service): State<Arc<ApplicationService<R, M>>>,
    requester: Requester,
) -> Response
where
    R: UserRepository + 'static,
    M: Mailer + 'static,
{
    match service.send_acceptances(requester.id()).await {
        Ok(count) => (StatusCode::OK, Json(json!({ "count": count }))).into_response(),
        Err(err) => err.respond("An error occurred while sending acceptance emails"),
    }
}

pub(crate) async fn users_handler<R, M>(
    State(service): State<Arc<ApplicationService<R, M>>>,
    requester: Requester,
    Query(query): Query<UserPageQuery>,
) -> Response
where
    R: UserRepository + 'static,
    M: Mailer + 'static,
{
    match service
        .list_users(requester.id(), query.offset, query.count)
        .await
    {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(err) => err.into_response(),
    }
}
