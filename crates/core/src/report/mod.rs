//! Operator error reports.
//!
//! The reporter is the only component that mails the admin about failures.
//! `resolve` is the single place an `Unresolved` pipeline error becomes
//! `Resolved`, which is what keeps a failure from being reported twice.

use std::error::Error;
use std::sync::Arc;

use tracing::error;

use crate::config::MailConfig;
use crate::mailer::{EmailMessage, Mailer};
use crate::pipeline::{PipelineError, Resolution, StageOrigin};
use crate::window::TimeWindow;

/// Renders `err` followed by every `source()` below it, one per line.
pub fn cause_chain(err: &(dyn Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        current = cause.source();
    }
    out
}

/// Mails failure diagnostics to the operator.
pub struct ErrorReporter {
    mailer: Arc<dyn Mailer>,
    sender: String,
    admin: String,
    subject_prefix: String,
}

impl ErrorReporter {
    pub fn new(mailer: Arc<dyn Mailer>, config: &MailConfig) -> Self {
        Self {
            mailer,
            sender: format!("Error Reporter <noreply@{}>", config.domain),
            admin: config.admin.clone(),
            subject_prefix: config.error_subject_prefix.clone(),
        }
    }

    pub fn report_message(
        &self,
        origin: StageOrigin,
        cause: &(dyn Error + 'static),
        window: &TimeWindow,
    ) -> EmailMessage {
        EmailMessage {
            from: self.sender.clone(),
            to: self.admin.clone(),
            cc: Vec::new(),
            subject: format!("{}: {}", self.subject_prefix, origin),
            text: format!(
                "Orders created after: {}\n\
                 Orders created before: {}\n\
                 Error details: {}\n",
                window.start_label(),
                window.end_label(),
                cause_chain(cause)
            ),
            attachments: Vec::new(),
        }
    }

    /// Sends one report. A failure to send is logged and goes no further.
    pub async fn report(
        &self,
        origin: StageOrigin,
        cause: &(dyn Error + Send + Sync + 'static),
        window: &TimeWindow,
    ) {
        error!(origin = %origin, error = %cause_chain(cause), "Pipeline stage failed");

        let message = self.report_message(origin, cause, window);
        if let Err(e) = self.mailer.send(message).await {
            error!(origin = %origin, error = %e, "Failed to send error report");
        }
    }

    /// Reports an `Unresolved` error and returns it as `Resolved`.
    /// `Resolved` errors are returned unchanged without sending anything.
    pub async fn resolve(&self, err: PipelineError, window: &TimeWindow) -> PipelineError {
        match err {
            PipelineError::Unresolved { origin, cause } => {
                self.report(origin, &cause, window).await;
                PipelineError::Resolved(Resolution::Reported(origin))
            }
            resolved @ PipelineError::Resolved(_) => resolved,
        }
    }
}
