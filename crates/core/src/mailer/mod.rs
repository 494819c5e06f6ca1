//! Outbound email.
//!
//! `Mailer` is the port; `MailgunMailer` delivers through the Mailgun HTTP
//! API. Message composition lives with the callers (`notify`, `report`).

mod mailgun;

pub use mailgun::MailgunMailer;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

/// A plain-text message with optional file attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub cc: Vec<String>,
    pub subject: String,
    pub text: String,
    pub attachments: Vec<PathBuf>,
}

/// Errors that can occur while sending mail.
#[derive(Debug, Error)]
pub enum MailerError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The mail API rejected the message.
    #[error("Mail API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// An attachment could not be read.
    #[error("Failed to read attachment {path}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Client not configured (missing API key, etc.).
    #[error("Mailer not configured: {0}")]
    NotConfigured(String),
}

/// Port for sending email.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Returns the name of this implementation.
    fn name(&self) -> &str;

    /// Sends one message.
    async fn send(&self, message: EmailMessage) -> Result<(), MailerError>;
}
