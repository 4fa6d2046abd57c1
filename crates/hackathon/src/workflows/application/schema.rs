//! Loading and structural validation of the question-branch configuration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::domain::{QuestionBranches, QuestionType};

/// Source of the branch configuration, consulted once per submission.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn load(&self) -> Result<QuestionBranches, SchemaError>;
}

/// Reads the configuration from a JSON document on every load so edits apply without restarts.
#[derive(Debug, Clone)]
pub struct FileQuestionSource {
    path: PathBuf,
}

impl FileQuestionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl QuestionSource for FileQuestionSource {
    async fn load(&self) -> Result<QuestionBranches, SchemaError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SchemaError::Io {
                path: self.path.clone(),
                source,
            })?;
        QuestionBranches::from_json(&raw)
    }
}

/// Fixed, already-validated configuration.
#[derive(Debug, Clone)]
pub struct StaticQuestionSource {
    branches: QuestionBranches,
}

impl StaticQuestionSource {
    pub fn new(branches: QuestionBranches) -> Result<Self, SchemaError> {
        branches.validate()?;
        Ok(Self { branches })
    }
}

#[async_trait]
impl QuestionSource for StaticQuestionSource {
    async fn load(&self) -> Result<QuestionBranches, SchemaError> {
        Ok(self.branches.clone())
    }
}

impl QuestionBranches {
    pub fn from_json(raw: &str) -> Result<Self, SchemaError> {
        let branches: QuestionBranches = serde_json::from_str(raw)?;
        branches.validate()?;
        Ok(branches)
    }

    /// Checks the invariants the JSON shape alone cannot express.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.is_empty() {
            return Err(SchemaError::NoBranches);
        }

        let mut branch_names = HashSet::new();
        for branch in self.iter() {
            if branch.name.trim().is_empty() {
                return Err(SchemaError::BlankBranchName);
            }
            if !branch_names.insert(branch.name.to_ascii_lowercase()) {
                return Err(SchemaError::DuplicateBranch(branch.name.clone()));
            }
            if branch.questions.is_empty() {
                return Err(SchemaError::EmptyBranch(branch.name.clone()));
            }

            let mut question_names = HashSet::new();
            for question in &branch.questions {
                if question.name.trim().is_empty() || question.label.trim().is_empty() {
                    return Err(SchemaError::BlankQuestion {
                        branch: branch.name.clone(),
                    });
                }
                if !question_names.insert(question.name.as_str()) {
                    return Err(SchemaError::DuplicateQuestion {
                        branch: branch.name.clone(),
                        question: question.name.clone(),
                    });
                }
                if question.kind.has_options() && question.options.is_empty() {
                    return Err(SchemaError::MissingOptions {
                        branch: branch.name.clone(),
                        question: question.name.clone(),
                    });
                }
                if question.has_other && !question.kind.has_options() {
                    return Err(SchemaError::UnsupportedOther {
                        branch: branch.name.clone(),
                        question: question.name.clone(),
                        kind: question.kind,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Reasons a question configuration is rejected.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("unable to read question configuration at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("question configuration is not valid JSON for the branch schema: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("question configuration declares no branches")]
    NoBranches,
    #[error("a branch has a blank name")]
    BlankBranchName,
    #[error("branch '{0}' is declared more than once")]
    DuplicateBranch(String),
    #[error("branch '{0}' has no questions")]
    EmptyBranch(String),
    #[error("branch '{branch}' has a question with a blank name or label")]
    BlankQuestion { branch: String },
    #[error("branch '{branch}' declares question '{question}' more than once")]
    DuplicateQuestion { branch: String, question: String },
    #[error("question '{question}' in branch '{branch}' needs at least one option")]
    MissingOptions { branch: String, question: String },
    #[error("question '{question}' in branch '{branch}' is a {} control and cannot offer 'Other'", .kind.label())]
    UnsupportedOther {
        branch: String,
        question: String,
        kind: QuestionType,
    },
}
