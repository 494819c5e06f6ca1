//! Mailgun HTTP API mailer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::MailConfig;

use super::{EmailMessage, Mailer, MailerError};

/// Sends messages through `POST {base_url}/v3/{domain}/messages`.
pub struct MailgunMailer {
    client: Client,
    base_url: String,
    domain: String,
    api_key: String,
}

impl MailgunMailer {
    /// Create a new Mailgun mailer.
    pub fn new(config: &MailConfig) -> Result<Self, MailerError> {
        if config.api_key.is_empty() {
            return Err(MailerError::NotConfigured(
                "Mailgun API key is required".to_string(),
            ));
        }
        if config.domain.is_empty() {
            return Err(MailerError::NotConfigured(
                "Mailgun domain is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            domain: config.domain.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/v3/{}/messages",
            self.base_url.trim_end_matches('/'),
            self.domain
        )
    }

    async fn build_form(message: EmailMessage) -> Result<Form, MailerError> {
        let mut form = Form::new()
            .text("from", message.from)
            .text("to", message.to)
            .text("subject", message.subject)
            .text("text", message.text);

        for cc in message.cc {
            form = form.text("cc", cc);
        }

        for path in message.attachments {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|source| MailerError::Attachment {
                    path: path.clone(),
                    source,
                })?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment".to_string());
            form = form.part("attachment", Part::bytes(bytes).file_name(file_name));
        }

        Ok(form)
    }
}

#[derive(Debug, Deserialize)]
struct MailgunResponse {
    #[serde(default)]
    id: Option<String>,
}

#[async_trait]
impl Mailer for MailgunMailer {
    fn name(&self) -> &str {
        "mailgun"
    }

    async fn send(&self, message: EmailMessage) -> Result<(), MailerError> {
        debug!(to = %message.to, subject = %message.subject, "Sending mail");

        let form = Self::build_form(message).await?;
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth("api", Some(&self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MailerError::Timeout
                } else {
                    MailerError::HttpError(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::ApiError {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let accepted: MailgunResponse = response.json().await?;
        debug!(id = ?accepted.id, "Mailgun accepted message");
        Ok(())
    }
}
