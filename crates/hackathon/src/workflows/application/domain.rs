use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Option value the form UI pairs with a separate free-text field.
pub const OTHER_SENTINEL: &str = "Other";

/// Identifier wrapper for registered users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Input control a question is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Text,
    Textarea,
    Email,
    Tel,
    Number,
    Date,
    Url,
    Select,
    Radio,
    Checkbox,
    File,
}

impl QuestionType {
    pub const fn label(self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Textarea => "textarea",
            QuestionType::Email => "email",
            QuestionType::Tel => "tel",
            QuestionType::Number => "number",
            QuestionType::Date => "date",
            QuestionType::Url => "url",
            QuestionType::Select => "select",
            QuestionType::Radio => "radio",
            QuestionType::Checkbox => "checkbox",
            QuestionType::File => "file",
        }
    }

    /// Controls that choose from a fixed option list.
    pub const fn has_options(self) -> bool {
        matches!(
            self,
            QuestionType::Select | QuestionType::Radio | QuestionType::Checkbox
        )
    }
}

/// A single configured form field belonging to a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub has_other: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Named application track with its own ordered question list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBranch {
    pub name: String,
    pub questions: Vec<Question>,
}

impl QuestionBranch {
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn question(&self, name: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.name == name)
    }
}

/// Every configured branch, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionBranches(pub Vec<QuestionBranch>);

impl QuestionBranches {
    /// Case-insensitive lookup by branch name.
    pub fn find(&self, name: &str) -> Option<&QuestionBranch> {
        self.0.iter().find(|branch| branch.is_named(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuestionBranch> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Raw body value submitted for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmittedValue {
    Text(String),
    Many(Vec<String>),
}

impl SubmittedValue {
    /// Blank strings count as absent; arrays count as present even when empty.
    pub fn is_present(&self) -> bool {
        match self {
            SubmittedValue::Text(value) => !value.is_empty(),
            SubmittedValue::Many(_) => true,
        }
    }
}

/// File accepted by the upload layer, plus where it currently lives on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub fieldname: String,
    pub originalname: String,
    pub mimetype: String,
    /// Generated name, unique within the temporary and permanent directories.
    pub filename: String,
    pub destination: PathBuf,
    pub path: PathBuf,
    pub size: u64,
}

/// Body fields and uploaded files for one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSubmission {
    pub fields: HashMap<String, SubmittedValue>,
    pub files: Vec<UploadedFile>,
}

impl FormSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, name: &str, value: &str) -> Self {
        self.fields
            .insert(name.to_string(), SubmittedValue::Text(value.to_string()));
        self
    }

    pub fn with_values(mut self, name: &str, values: &[&str]) -> Self {
        let values = values.iter().map(|value| value.to_string()).collect();
        self.fields
            .insert(name.to_string(), SubmittedValue::Many(values));
        self
    }

    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.files.push(file);
        self
    }

    /// Adds a body value, folding repeated names into an array the way form encoders do.
    pub fn append_field(&mut self, name: String, value: String) {
        match self.fields.remove(&name) {
            None => {
                self.fields.insert(name, SubmittedValue::Text(value));
            }
            Some(SubmittedValue::Text(previous)) => {
                self.fields
                    .insert(name, SubmittedValue::Many(vec![previous, value]));
            }
            Some(SubmittedValue::Many(mut values)) => {
                values.push(value);
                self.fields.insert(name, SubmittedValue::Many(values));
            }
        }
    }

    /// Adds a body value that is always treated as an array.
    pub fn append_array_field(&mut self, name: String, value: String) {
        if self.fields.contains_key(&name) {
            self.append_field(name, value);
        } else {
            self.fields.insert(name, SubmittedValue::Many(vec![value]));
        }
    }

    pub fn field(&self, name: &str) -> Option<&SubmittedValue> {
        self.fields.get(name)
    }

    /// First uploaded file sent under the given field name.
    pub fn file_for(&self, name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|file| file.fieldname == name)
    }
}

/// Normalized value stored for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Text(String),
    Many(Vec<String>),
    File(UploadedFile),
    Null,
}

impl FormValue {
    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            FormValue::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn as_file_mut(&mut self) -> Option<&mut UploadedFile> {
        match self {
            FormValue::File(file) => Some(file),
            _ => None,
        }
    }
}

impl From<SubmittedValue> for FormValue {
    fn from(value: SubmittedValue) -> Self {
        match value {
            SubmittedValue::Text(text) => FormValue::Text(text),
            SubmittedValue::Many(values) => FormValue::Many(values),
        }
    }
}

/// Validated unit persisted per question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormItem {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub value: FormValue,
}

/// Application state embedded in the user document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationRecord {
    pub applied: bool,
    pub application_branch: String,
    pub application_data: Vec<FormItem>,
}

impl ApplicationRecord {
    /// True when the stored branch matches `name`, ignoring case.
    pub fn is_branch(&self, name: &str) -> bool {
        self.application_branch.eq_ignore_ascii_case(name)
    }
}

/// Registered user; only the embedded application is written by the intake pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub verified_email: bool,
    #[serde(default)]
    pub accepted: bool,
    #[serde(flatten)]
    pub application: ApplicationRecord,
}

impl User {
    pub fn new(id: &str, name: &str, email: &str) -> Self {
        Self {
            id: UserId::from(id),
            name: name.to_string(),
            email: email.to_string(),
            admin: false,
            verified_email: false,
            accepted: false,
            application: ApplicationRecord::default(),
        }
    }

    pub fn status_label(&self) -> String {
        let branch = &self.application.application_branch;
        if self.accepted {
            format!("Accepted ({branch})")
        } else if self.application.applied {
            format!("Applied ({branch})")
        } else {
            "Incomplete".to_string()
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            verified_email: self.verified_email,
            admin: self.admin,
            status: self.status_label(),
        }
    }
}

/// Row shown in the admin user table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub verified_email: bool,
    pub admin: bool,
    pub status: String,
}

/// One page of the admin user listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserPage {
    pub offset: usize,
    pub count: usize,
    pub total: usize,
    pub data: Vec<UserSummary>,
}
