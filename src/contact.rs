//! Contact-form submission.
//!
//! Input is validated locally before anything reaches the store: blank
//! required fields and malformed email addresses are rejected without a
//! network call. A valid submission is stored as a `contactSubmission`
//! document and then announced by mail. Every path returns a
//! [`SubmissionOutcome`]; nothing here returns an error to the caller.

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::config::ContactConfig;
use crate::models::{ContactSubmission, SubmissionStatus};
use crate::notify::{owner_notification, submitter_confirmation, Mailer};
use crate::store::ContentStore;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

const MAX_MESSAGE_CHARS: usize = 5000;

/// Basic `local@domain.tld` shape check.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email.trim())
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactError {
    MissingField(&'static str),
    InvalidEmail,
    MessageTooLong,
}

impl fmt::Display for ContactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContactError::MissingField(field) => write!(f, "Please fill in the {} field.", field),
            ContactError::InvalidEmail => f.write_str("Please enter a valid email address."),
            ContactError::MessageTooLong => write!(
                f,
                "Your message is too long (maximum {} characters).",
                MAX_MESSAGE_CHARS
            ),
        }
    }
}

impl std::error::Error for ContactError {}

pub fn validate(form: &ContactForm) -> Result<(), ContactError> {
    for (field, value) in [
        ("name", &form.name),
        ("email", &form.email),
        ("message", &form.message),
    ] {
        if value.trim().is_empty() {
            return Err(ContactError::MissingField(field));
        }
    }
    if !is_valid_email(&form.email) {
        return Err(ContactError::InvalidEmail);
    }
    if form.message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ContactError::MessageTooLong);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Invalid,
    Store,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubmissionOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip)]
    pub failure: Option<FailureKind>,
}

impl SubmissionOutcome {
    fn ok(id: String) -> Self {
        Self {
            success: true,
            message: "Thank you! Your message has been sent and we'll be in touch soon.".into(),
            id: Some(id),
            failure: None,
        }
    }

    fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            id: None,
            failure: Some(kind),
        }
    }
}

fn clean(s: &str) -> String {
    s.trim().to_string()
}

/// Validates, stores and announces a submission.
pub async fn submit_contact(
    store: &dyn ContentStore,
    mailer: &dyn Mailer,
    config: &ContactConfig,
    site_name: &str,
    form: ContactForm,
) -> SubmissionOutcome {
    if let Err(e) = validate(&form) {
        return SubmissionOutcome::failed(FailureKind::Invalid, e.to_string());
    }

    let submission = ContactSubmission {
        name: clean(&form.name),
        email: clean(&form.email),
        phone: form.phone.as_deref().map(clean).filter(|p| !p.is_empty()),
        message: clean(&form.message),
        submitted_at: Utc::now(),
        status: SubmissionStatus::New,
    };

    let id = format!("contactSubmission.{}", uuid::Uuid::new_v4());
    if let Err(e) = store.create(submission.to_document(&id)).await {
        tracing::error!(error = %e, "failed to store contact submission");
        return SubmissionOutcome::failed(
            FailureKind::Store,
            "Sorry, we couldn't send your message right now. Please try again later.",
        );
    }
    tracing::info!(id = %id, "contact submission stored");

    if let Some(ref to) = config.notify_to {
        if let Err(e) = mailer.send(&owner_notification(to, &submission)).await {
            tracing::warn!(error = %e, "failed to send owner notification");
        }
    }
    if config.confirm_submitter {
        if let Err(e) = mailer
            .send(&submitter_confirmation(&submission, site_name))
            .await
        {
            tracing::warn!(error = %e, "failed to send submitter confirmation");
        }
    }

    SubmissionOutcome::ok(id)
}
