use std::path::PathBuf;

use super::common::*;
use crate::workflows::application::domain::{
    FormSubmission, FormValue, QuestionType, SubmittedValue, UploadedFile,
};
use crate::workflows::application::normalize::{
    normalize_question, normalize_submission, ValidationError,
};

fn resume_upload(fieldname: &str) -> UploadedFile {
    UploadedFile {
        fieldname: fieldname.to_string(),
        originalname: "resume.pdf".to_string(),
        mimetype: "application/pdf".to_string(),
        filename: "abc123".to_string(),
        destination: PathBuf::from("/tmp/uploads"),
        path: PathBuf::from("/tmp/uploads/abc123"),
        size: 42,
    }
}

fn complete_hacker_submission() -> FormSubmission {
    FormSubmission::new()
        .with_text("full-name", "Ada Lovelace")
        .with_text("school", "A")
        .with_values("interests", &["A", "Other"])
        .with_text("interests-other", "Knitting")
        .with_file(resume_upload("resume"))
}

#[test]
fn items_mirror_question_order() {
    let branch = hacker_branch();
    let items = normalize_submission(&branch, &complete_hacker_submission()).expect("valid");

    let names: Vec<_> = items.iter().map(|item| item.name.as_str()).collect();
    let expected: Vec<_> = branch.questions.iter().map(|q| q.name.as_str()).collect();
    assert_eq!(names, expected);
    assert_eq!(items[4].kind, QuestionType::File);
    assert_eq!(items[4].value, FormValue::File(resume_upload("resume")));
}

#[test]
fn missing_required_field_names_label() {
    let branch = hacker_branch();
    let mut submission = complete_hacker_submission();
    submission.fields.remove("full-name");

    let err = normalize_submission(&branch, &submission).expect_err("missing name");
    assert_eq!(
        err,
        ValidationError::MissingRequiredField {
            label: "Full name".to_string()
        }
    );
}

#[test]
fn first_failure_wins() {
    let branch = hacker_branch();
    let submission = FormSubmission::new();

    match normalize_submission(&branch, &submission) {
        Err(ValidationError::MissingRequiredField { label }) => assert_eq!(label, "Full name"),
        other => panic!("expected missing field, got {other:?}"),
    }
}

#[test]
fn blank_text_counts_as_missing() {
    let required = question("full-name", "Full name", QuestionType::Text, true);
    let submission = FormSubmission::new().with_text("full-name", "");

    assert!(normalize_question(&required, &submission).is_err());
}

#[test]
fn required_file_is_satisfied_by_upload() {
    let resume = question("resume", "Resume", QuestionType::File, true);
    let submission = FormSubmission::new().with_file(resume_upload("resume"));

    let item = normalize_question(&resume, &submission).expect("upload satisfies");
    assert!(item.value.as_file().is_some());
}

#[test]
fn upload_under_other_field_does_not_satisfy() {
    let resume = question("resume", "Resume", QuestionType::File, true);
    let submission = FormSubmission::new().with_file(resume_upload("cover-letter"));

    assert!(normalize_question(&resume, &submission).is_err());
}

#[test]
fn select_with_other_keeps_last_value() {
    let school = with_other(question("school", "School", QuestionType::Select, true));
    let submission = FormSubmission::new().with_values("school", &["Option1", "Custom text"]);

    let item = normalize_question(&school, &submission).expect("valid");
    assert_eq!(item.value, FormValue::Text("Custom text".to_string()));
}

#[test]
fn radio_without_other_keeps_array() {
    let shirt = question("shirt", "Shirt size", QuestionType::Radio, false);
    let submission = FormSubmission::new().with_values("shirt", &["M", "L"]);

    let item = normalize_question(&shirt, &submission).expect("valid");
    assert_eq!(
        item.value,
        FormValue::Many(vec!["M".to_string(), "L".to_string()])
    );
}

#[test]
fn checkbox_with_other_strips_sentinel() {
    let interests = with_other(question("interests", "Interests", QuestionType::Checkbox, false));
    let submission = FormSubmission::new().with_values("interests", &["A", "Other"]);

    let item = normalize_question(&interests, &submission).expect("valid");
    assert_eq!(item.value, FormValue::Many(vec!["A".to_string()]));
}

#[test]
fn checkbox_with_other_wraps_scalar_and_defaults_to_empty() {
    let interests = with_other(question("interests", "Interests", QuestionType::Checkbox, false));

    let scalar = FormSubmission::new().with_text("interests", "B");
    let item = normalize_question(&interests, &scalar).expect("valid");
    assert_eq!(item.value, FormValue::Many(vec!["B".to_string()]));

    let only_other = FormSubmission::new().with_text("interests", "Other");
    let item = normalize_question(&interests, &only_other).expect("valid");
    assert_eq!(item.value, FormValue::Many(Vec::new()));

    let absent = FormSubmission::new();
    let item = normalize_question(&interests, &absent).expect("valid");
    assert_eq!(item.value, FormValue::Many(Vec::new()));
}

#[test]
fn optional_unanswered_question_is_null() {
    let expertise = question("expertise", "Expertise", QuestionType::Textarea, false);
    let item = normalize_question(&expertise, &FormSubmission::new()).expect("optional");
    assert_eq!(item.value, FormValue::Null);
}

#[test]
fn repeated_fields_fold_into_arrays() {
    let mut submission = FormSubmission::new();
    submission.append_field("school".to_string(), "Other".to_string());
    submission.append_field("school".to_string(), "Hogwarts".to_string());
    submission.append_array_field("tags".to_string(), "solo".to_string());

    assert_eq!(
        submission.field("school"),
        Some(&SubmittedValue::Many(vec![
            "Other".to_string(),
            "Hogwarts".to_string()
        ]))
    );
    assert_eq!(
        submission.field("tags"),
        Some(&SubmittedValue::Many(vec!["solo".to_string()]))
    );
}
