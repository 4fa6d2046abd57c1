use async_trait::async_trait;
use serde::Serialize;

use crate::config::EventConfig;

/// Plain-text message handed to the mail service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Outbound mail hook; delivery itself belongs to an external service.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<(), MailError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
    #[error("mail rejected for {recipient}: {reason}")]
    Rejected { recipient: String, reason: String },
}

/// Builds the first-submission confirmation for `branch_name`.
pub fn confirmation_email(event: &EventConfig, branch_name: &str, recipient: &str) -> MailMessage {
    let event_name = &event.event_name;
    let forms_url = &event.mentor_forms_url;
    let text = if branch_name.eq_ignore_ascii_case("mentor") {
        format!(
            "Hi!\n\n\
             Thanks for signing up to mentor at {event_name}. Please complete the background \
             check forms at {forms_url} and send them back as soon as possible; they must be \
             processed and confirmed before the event. Once we receive them you will get a link \
             to sign up for a training session. If you have any questions, just reply to this \
             email.\n\n\
             Sincerely,\n\n\
             The {event_name} Team"
        )
    } else {
        format!(
            "Hi!\n\n\
             Thanks for applying to be a {branch_name} at {event_name}! You can go back and \
             update your application any time before registration closes.\n\n\
             If you have any questions, just reply to this email.\n\n\
             Sincerely,\n\n\
             The {event_name} Team"
        )
    };

    MailMessage {
        from: event.email_from.clone(),
        to: recipient.to_string(),
        subject: format!("[{event_name}] - Thank you for applying!"),
        text,
    }
}

/// Builds the decision mail sent to an accepted applicant.
pub fn acceptance_email(event: &EventConfig, branch_name: &str, recipient: &str) -> MailMessage {
    let event_name = &event.event_name;
    let text = format!(
        "Hi!\n\n\
         Congratulations! You have been accepted as a {branch_name} at {event_name}. Keep an \
         eye on your inbox for check-in details as the event gets closer.\n\n\
         If you have any questions, just reply to this email.\n\n\
         Sincerely,\n\n\
         The {event_name} Team"
    );

    MailMessage {
        from: event.email_from.clone(),
        to: recipient.to_string(),
        subject: format!("[{event_name}] - You have been accepted!"),
        text,
    }
}
