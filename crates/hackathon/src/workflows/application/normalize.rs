use super::domain::{
    FormItem, FormSubmission, FormValue, Question, QuestionBranch, QuestionType, SubmittedValue,
    OTHER_SENTINEL,
};

/// Client-caused rejection raised while walking a branch's questions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("'{label}' is a required field")]
    MissingRequiredField { label: String },
}

/// Validates `submission` against every question of `branch`, in order.
///
/// Stops at the first failing question. On success the result holds exactly one
/// item per question, in the branch's declaration order.
pub fn normalize_submission(
    branch: &QuestionBranch,
    submission: &FormSubmission,
) -> Result<Vec<FormItem>, ValidationError> {
    branch
        .questions
        .iter()
        .map(|question| normalize_question(question, submission))
        .collect()
}

pub fn normalize_question(
    question: &Question,
    submission: &FormSubmission,
) -> Result<FormItem, ValidationError> {
    let raw = submission.field(&question.name).cloned();
    let upload = submission.file_for(&question.name);

    let answered = raw.as_ref().is_some_and(SubmittedValue::is_present);
    if question.required && !answered && upload.is_none() {
        return Err(ValidationError::MissingRequiredField {
            label: question.label.clone(),
        });
    }

    let value = match coerce(question, raw) {
        Some(value) if value.is_present() => FormValue::from(value),
        _ => upload.cloned().map(FormValue::File).unwrap_or(FormValue::Null),
    };

    Ok(FormItem {
        name: question.name.clone(),
        kind: question.kind,
        value,
    })
}

fn coerce(question: &Question, raw: Option<SubmittedValue>) -> Option<SubmittedValue> {
    if !question.has_other {
        return raw;
    }

    match question.kind {
        // The free-text entry is appended after the sentinel option.
        QuestionType::Select | QuestionType::Radio => match raw {
            Some(SubmittedValue::Many(mut values)) => values.pop().map(SubmittedValue::Text),
            other => other,
        },
        // The free-text entry travels under its own question name.
        QuestionType::Checkbox => {
            let values = match raw {
                None => Vec::new(),
                Some(SubmittedValue::Text(value)) if value.is_empty() => Vec::new(),
                Some(SubmittedValue::Text(value)) => vec![value],
                Some(SubmittedValue::Many(values)) => values,
            };
            Some(SubmittedValue::Many(
                values
                    .into_iter()
                    .filter(|value| value != OTHER_SENTINEL)
                    .collect(),
            ))
        }
        _ => raw,
    }
}
