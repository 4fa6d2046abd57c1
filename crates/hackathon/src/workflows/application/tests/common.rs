use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;
use tempfile::TempDir;

use crate::config::EventConfig;
use crate::workflows::application::domain::{
    Question, QuestionBranch, QuestionBranches, QuestionType, UploadedFile, User, UserId,
};
use crate::workflows::application::mailer::{MailError, MailMessage, Mailer};
use crate::workflows::application::repository::{RepositoryError, UserRepository};
use crate::workflows::application::schema::{QuestionSource, SchemaError, StaticQuestionSource};
use crate::workflows::application::service::ApplicationService;
use crate::workflows::application::storage::{FileStore, LocalFileStore, StorageError};

pub(super) fn question(name: &str, label: &str, kind: QuestionType, required: bool) -> Question {
    let options = if kind.has_options() {
        vec!["A".to_string(), "B".to_string(), "Other".to_string()]
    } else {
        Vec::new()
    };
    Question {
        name: name.to_string(),
        label: label.to_string(),
        kind,
        required,
        has_other: false,
        options,
    }
}

pub(super) fn with_other(mut question: Question) -> Question {
    question.has_other = true;
    question
}

pub(super) fn hacker_branch() -> QuestionBranch {
    QuestionBranch {
        name: "Hacker".to_string(),
        questions: vec![
            question("full-name", "Full name", QuestionType::Text, true),
            with_other(question("school", "School", QuestionType::Select, true)),
            with_other(question("interests", "Interests", QuestionType::Checkbox, false)),
            question("interests-other", "Other interests", QuestionType::Text, false),
            question("resume", "Resume", QuestionType::File, true),
        ],
    }
}

pub(super) fn branches() -> QuestionBranches {
    QuestionBranches(vec![
        hacker_branch(),
        QuestionBranch {
            name: "Mentor".to_string(),
            questions: vec![
                question("full-name", "Full name", QuestionType::Text, true),
                question("expertise", "Expertise", QuestionType::Textarea, false),
            ],
        },
        QuestionBranch {
            name: "Volunteer".to_string(),
            questions: vec![
                question("full-name", "Full name", QuestionType::Text, true),
                with_other(question("shirt", "Shirt size", QuestionType::Radio, false)),
            ],
        },
    ])
}

/// Body limit used by the harness router; large enough for a realistic resume.
pub(super) const UPLOAD_LIMIT: usize = 8 * 1024 * 1024;

pub(super) fn event_config(root: &Path) -> EventConfig {
    EventConfig {
        event_name: "HackGT".to_string(),
        email_from: "HackGT Team <hello@hack.gt>".to_string(),
        upload_root: root.join("uploads"),
        upload_temp_dir: root.join("tmp"),
        questions_path: root.join("questions.json"),
        upload_max_bytes: UPLOAD_LIMIT,
        mentor_forms_url: "https://forms.example.com/mentors".to_string(),
    }
}

/// Drops a small PDF into the temp upload directory the way the intake layer would.
pub(super) fn staged_file(event: &EventConfig, fieldname: &str, filename: &str) -> UploadedFile {
    std::fs::create_dir_all(&event.upload_temp_dir).expect("create temp dir");
    let path = event.upload_temp_dir.join(filename);
    std::fs::write(&path, b"%PDF-1.4 resume").expect("write staged file");
    UploadedFile {
        fieldname: fieldname.to_string(),
        originalname: "resume.pdf".to_string(),
        mimetype: "application/pdf".to_string(),
        filename: filename.to_string(),
        destination: event.upload_temp_dir.clone(),
        path,
        size: 15,
    }
}

pub(super) fn applicant() -> User {
    User::new("user-1", "Ada Lovelace", "ada@example.com")
}

pub(super) fn admin() -> User {
    let mut user = User::new("admin-1", "Grace Hopper", "grace@example.com");
    user.admin = true;
    user
}

pub(super) fn ada() -> UserId {
    UserId::from("user-1")
}

pub(super) fn admin_id() -> UserId {
    UserId::from("admin-1")
}

#[derive(Default, Clone)]
pub(super) struct MemoryUsers {
    pub(super) records: Arc<Mutex<BTreeMap<UserId, User>>>,
    fail_saves: Arc<AtomicBool>,
}

impl MemoryUsers {
    pub(super) fn with_users(users: Vec<User>) -> Self {
        let repository = Self::default();
        {
            let mut guard = repository.records.lock().expect("repository mutex poisoned");
            for user in users {
                guard.insert(user.id.clone(), user);
            }
        }
        repository
    }

    pub(super) fn get(&self, id: &UserId) -> Option<User> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(id)
            .cloned()
    }

    pub(super) fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.get(id))
    }

    async fn save(&self, user: &User) -> Result<(), RepositoryError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("database offline".to_string()));
        }
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn list(&self, offset: usize, count: usize) -> Result<Vec<User>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().skip(offset).take(count).cloned().collect())
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.records.lock().expect("repository mutex poisoned").len())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryMailer {
    sent: Arc<Mutex<Vec<MailMessage>>>,
    fail: Arc<AtomicBool>,
}

impl MemoryMailer {
    pub(super) fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }

    pub(super) fn fail_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Transport("smtp relay refused connection".to_string()));
        }
        self.sent.lock().expect("mailer mutex poisoned").push(message);
        Ok(())
    }
}

pub(super) struct BrokenQuestions;

#[async_trait]
impl QuestionSource for BrokenQuestions {
    async fn load(&self) -> Result<QuestionBranches, SchemaError> {
        Err(SchemaError::NoBranches)
    }
}

pub(super) struct ReadOnlyFiles {
    root: PathBuf,
}

#[async_trait]
impl FileStore for ReadOnlyFiles {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn relocate(&self, file: &UploadedFile) -> Result<PathBuf, StorageError> {
        Err(StorageError::Io {
            path: file.path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only volume"),
        })
    }
}

pub(super) type TestService = ApplicationService<MemoryUsers, MemoryMailer>;

pub(super) struct Harness {
    pub(super) service: Arc<TestService>,
    pub(super) users: Arc<MemoryUsers>,
    pub(super) mailer: Arc<MemoryMailer>,
    pub(super) event: EventConfig,
    _dir: TempDir,
}

impl Harness {
    pub(super) fn new() -> Self {
        Self::build(None, false)
    }

    pub(super) fn with_broken_questions() -> Self {
        Self::build(Some(Arc::new(BrokenQuestions)), false)
    }

    pub(super) fn with_read_only_files() -> Self {
        Self::build(None, true)
    }

    fn build(questions: Option<Arc<dyn QuestionSource>>, read_only: bool) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let event = event_config(dir.path());
        let users = Arc::new(MemoryUsers::with_users(vec![applicant(), admin()]));
        let mailer = Arc::new(MemoryMailer::default());
        let questions: Arc<dyn QuestionSource> = match questions {
            Some(questions) => questions,
            None => Arc::new(StaticQuestionSource::new(branches()).expect("valid branches")),
        };
        let files: Arc<dyn FileStore> = if read_only {
            Arc::new(ReadOnlyFiles {
                root: event.upload_root.clone(),
            })
        } else {
            Arc::new(LocalFileStore::new(event.upload_root.clone()))
        };
        let service = Arc::new(ApplicationService::new(
            users.clone(),
            mailer.clone(),
            questions,
            files,
            event.clone(),
        ));
        Self {
            service,
            users,
            mailer,
            event,
            _dir: dir,
        }
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}

pub(super) const BOUNDARY: &str = "hackathon-test-boundary";

pub(super) enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

/// Encodes `parts` as a `multipart/form-data` body using [`BOUNDARY`].
pub(super) fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                filename,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub(super) fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}
