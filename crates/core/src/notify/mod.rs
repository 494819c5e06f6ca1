//! Recipient-facing mail: the batch delivery and the "no orders" notice.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::MailConfig;
use crate::mailer::{EmailMessage, Mailer, MailerError};
use crate::window::TimeWindow;

pub const DELIVERY_SUBJECT: &str = "New order XML file ready to upload";

/// Sends run results to the configured recipient.
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    sender: String,
    recipient: String,
    cc: Vec<String>,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, config: &MailConfig) -> Self {
        let cc = if config.cc_admin && !config.admin.is_empty() {
            vec![config.admin.clone()]
        } else {
            Vec::new()
        };
        Self {
            mailer,
            sender: format!("Automated Report <noreply@{}>", config.domain),
            recipient: config.recipient.clone(),
            cc,
        }
    }

    pub fn delivery_message(&self, artifact: &Path, window: &TimeWindow) -> EmailMessage {
        EmailMessage {
            from: self.sender.clone(),
            to: self.recipient.clone(),
            cc: self.cc.clone(),
            subject: DELIVERY_SUBJECT.to_string(),
            text: format!(
                "Attached is a zip file with all new orders for the time period:\n\n\
                 start: {}\n\
                 end: {}\n",
                window.start_label(),
                window.end_label()
            ),
            attachments: vec![artifact.to_path_buf()],
        }
    }

    pub fn no_orders_message(&self, window: &TimeWindow) -> EmailMessage {
        EmailMessage {
            from: self.sender.clone(),
            to: self.recipient.clone(),
            cc: self.cc.clone(),
            subject: format!(
                "No orders: {} - {}",
                window.start_label(),
                window.end_label()
            ),
            text: format!(
                "There have been no newly created orders from {} to {}.",
                window.start_label(),
                window.end_label()
            ),
            attachments: Vec::new(),
        }
    }

    /// Emails the archive to the recipient.
    pub async fn deliver(&self, artifact: &Path, window: &TimeWindow) -> Result<(), MailerError> {
        self.mailer
            .send(self.delivery_message(artifact, window))
            .await?;
        info!(to = %self.recipient, artifact = %artifact.display(), "Delivered batch");
        Ok(())
    }

    /// Tells the recipient the window had no new orders.
    pub async fn notify_no_orders(&self, window: &TimeWindow) -> Result<(), MailerError> {
        self.mailer.send(self.no_orders_message(window)).await?;
        info!(to = %self.recipient, "Sent no-orders notice");
        Ok(())
    }
}
