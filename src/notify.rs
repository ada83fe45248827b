//! Outbound mail for contact-form notifications.
//!
//! Delivery is delegated to an HTTP mail API that accepts
//! `{from, to, subject, text, html}` JSON with a bearer key. When no `[mail]`
//! section is configured the [`DisabledMailer`] is used and messages are
//! only logged.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, MailConfig};
use crate::models::ContactSubmission;
use crate::render::escape;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<()>;
}

/// Mailer used when mail is not configured.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        tracing::debug!(to = %message.to, subject = %message.subject, "mail disabled, not sending");
        Ok(())
    }
}

pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    from: String,
    api_key: Option<String>,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build mail HTTP client")?;
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            tracing::warn!(var = %config.api_key_env, "mail API key not set; requests will be unauthenticated");
        }
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            from: config.from.clone(),
            api_key,
        })
    }
}

#[derive(Serialize)]
struct OutboundMail<'a> {
    from: &'a str,
    #[serde(flatten)]
    message: &'a MailMessage,
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        let mut req = self.client.post(&self.endpoint).json(&OutboundMail {
            from: &self.from,
            message,
        });
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.context("mail request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("mail API returned {}: {}", status, body);
        }
        Ok(())
    }
}

/// The configured mailer, or [`DisabledMailer`].
pub fn create_mailer(config: &Config) -> Result<Arc<dyn Mailer>> {
    match config.mail {
        Some(ref mail) => Ok(Arc::new(HttpMailer::new(mail)?)),
        None => Ok(Arc::new(DisabledMailer)),
    }
}

/// Message to site staff about a new submission.
pub fn owner_notification(to: &str, submission: &ContactSubmission) -> MailMessage {
    let phone = submission.phone.as_deref().unwrap_or("-");
    let text = format!(
        "New contact form submission\n\nName: {}\nEmail: {}\nPhone: {}\nReceived: {}\n\n{}\n",
        submission.name,
        submission.email,
        phone,
        submission.submitted_at.to_rfc3339(),
        submission.message
    );
    let html = format!(
        "<h2>New contact form submission</h2><p><strong>Name:</strong> {}<br><strong>Email:</strong> {}<br><strong>Phone:</strong> {}</p><p>{}</p>",
        escape(&submission.name),
        escape(&submission.email),
        escape(phone),
        escape(&submission.message).replace('\n', "<br>")
    );
    MailMessage {
        to: to.to_string(),
        subject: format!("New enquiry from {}", submission.name),
        text,
        html,
        reply_to: Some(submission.email.clone()),
    }
}

/// Acknowledgement sent back to the person who submitted the form.
pub fn submitter_confirmation(submission: &ContactSubmission, site_name: &str) -> MailMessage {
    let text = format!(
        "Hi {},\n\nThanks for getting in touch with {}. We have received your message and will reply soon.\n\nYour message:\n{}\n",
        submission.name, site_name, submission.message
    );
    let html = format!(
        "<p>Hi {},</p><p>Thanks for getting in touch with {}. We have received your message and will reply soon.</p><blockquote>{}</blockquote>",
        escape(&submission.name),
        escape(site_name),
        escape(&submission.message).replace('\n', "<br>")
    );
    MailMessage {
        to: submission.email.clone(),
        subject: format!("We received your message - {}", site_name),
        text,
        html,
        reply_to: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubmissionStatus;
    use chrono::Utc;

    fn submission() -> ContactSubmission {
        ContactSubmission {
            name: "Ada <Admin>".into(),
            email: "ada@example.com".into(),
            phone: Some("+1 555".into()),
            message: "Line one\nLine two".into(),
            submitted_at: Utc::now(),
            status: SubmissionStatus::New,
        }
    }

    #[test]
    fn test_owner_notification() {
        let msg = owner_notification("sales@example.com", &submission());
        assert_eq!(msg.to, "sales@example.com");
        assert_eq!(msg.reply_to.as_deref(), Some("ada@example.com"));
        assert!(msg.text.contains("Phone: +1 555"));
        assert!(msg.html.contains("Ada &lt;Admin&gt;"));
        assert!(msg.html.contains("Line one<br>Line two"));
    }

    #[test]
    fn test_submitter_confirmation() {
        let msg = submitter_confirmation(&submission(), "Acme");
        assert_eq!(msg.to, "ada@example.com");
        assert!(msg.subject.contains("Acme"));
        assert!(msg.reply_to.is_none());
    }

    #[test]
    fn test_outbound_payload_flattens_message() {
        let msg = submitter_confirmation(&submission(), "Acme");
        let payload = serde_json::to_value(OutboundMail {
            from: "noreply@acme.example",
            message: &msg,
        })
        .unwrap();
        assert_eq!(payload["from"], "noreply@acme.example");
        assert_eq!(payload["to"], "ada@example.com");
        assert!(payload.get("reply_to").is_none());
    }

    #[tokio::test]
    async fn test_disabled_mailer_succeeds() {
        let msg = submitter_confirmation(&submission(), "Acme");
        assert!(DisabledMailer.send(&msg).await.is_ok());
    }
}
