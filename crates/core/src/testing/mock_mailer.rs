//! Mock mailer for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::mailer::{EmailMessage, Mailer, MailerError};

/// Mock implementation of the `Mailer` trait.
///
/// Records every message it accepts. Failures can be injected once
/// (`set_next_error`) or for every message whose subject contains a given
/// string (`fail_subjects_containing`).
#[derive(Debug, Default)]
pub struct MockMailer {
    sent: Arc<RwLock<Vec<EmailMessage>>>,
    attempts: Arc<RwLock<usize>>,
    next_error: Arc<RwLock<Option<MailerError>>>,
    failing_subjects: Arc<RwLock<Vec<String>>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages that were accepted, in send order.
    pub async fn recorded_messages(&self) -> Vec<EmailMessage> {
        self.sent.read().await.clone()
    }

    /// Accepted messages addressed to `to`.
    pub async fn messages_to(&self, to: &str) -> Vec<EmailMessage> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|m| m.to == to)
            .cloned()
            .collect()
    }

    /// Number of `send` calls, including failed ones.
    pub async fn attempts(&self) -> usize {
        *self.attempts.read().await
    }

    pub async fn set_next_error(&self, error: MailerError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn fail_subjects_containing(&self, pattern: &str) {
        self.failing_subjects.write().await.push(pattern.to_string());
    }

    pub async fn clear_recorded(&self) {
        self.sent.write().await.clear();
        *self.attempts.write().await = 0;
    }
}

#[async_trait]
impl Mailer for MockMailer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, message: EmailMessage) -> Result<(), MailerError> {
        *self.attempts.write().await += 1;

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let rejected = self
            .failing_subjects
            .read()
            .await
            .iter()
            .any(|p| message.subject.contains(p.as_str()));
        if rejected {
            return Err(MailerError::ApiError {
                status: 502,
                message: format!("rejected: {}", message.subject),
            });
        }

        self.sent.write().await.push(message);
        Ok(())
    }
}
