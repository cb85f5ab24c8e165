//! Outbound email delivery for the contact relay.

use std::future::Future;

use serde::Serialize;

/// One email, in the shape the Resend API accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Debug)]
pub enum MailError {
    /// The provider could not be reached.
    Transport(String),
    /// The provider answered with a non-success status.
    Rejected { status: u16, body: String },
}

impl std::fmt::Display for MailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "email provider unreachable: {msg}"),
            Self::Rejected { status, body } => write!(f, "email provider returned {status}: {body}"),
        }
    }
}

impl std::error::Error for MailError {}

/// Something that can deliver a notification. One attempt per call.
pub trait Mailer: Send + Sync {
    fn send(&self, notification: &Notification) -> impl Future<Output = Result<(), MailError>> + Send;
}

/// Delivers through the Resend HTTP API.
#[derive(Clone, Debug)]
pub struct ResendMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl ResendMailer {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
        }
    }
}

impl Mailer for ResendMailer {
    async fn send(&self, notification: &Notification) -> Result<(), MailError> {
        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(notification)
            .send()
            .await
            .map_err(|err| MailError::Transport(err.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(MailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
