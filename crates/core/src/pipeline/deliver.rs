//! Archive and delivery stages.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::archive::Archiver;
use crate::notify::Notifier;
use crate::report::ErrorReporter;
use crate::window::TimeWindow;

use super::error::{PipelineError, StageOrigin};
use super::types::BatchLocation;

/// Compresses a rendered batch into one artifact.
pub struct ArchiveStage {
    archiver: Arc<dyn Archiver>,
    reporter: Arc<ErrorReporter>,
}

impl ArchiveStage {
    pub fn new(archiver: Arc<dyn Archiver>, reporter: Arc<ErrorReporter>) -> Self {
        Self { archiver, reporter }
    }

    pub async fn archive(
        &self,
        window: &TimeWindow,
        location: &BatchLocation,
    ) -> Result<PathBuf, PipelineError> {
        match self.archiver.archive(location).await {
            Ok(artifact) => {
                info!(
                    archiver = self.archiver.name(),
                    artifact = %artifact.display(),
                    "Archived batch"
                );
                Ok(artifact)
            }
            Err(e) => {
                let err = PipelineError::unresolved(StageOrigin::CompressBatch, e);
                Err(self.reporter.resolve(err, window).await)
            }
        }
    }
}

/// Mails the artifact to the recipient.
pub struct DeliveryStage {
    notifier: Arc<Notifier>,
    reporter: Arc<ErrorReporter>,
}

impl DeliveryStage {
    pub fn new(notifier: Arc<Notifier>, reporter: Arc<ErrorReporter>) -> Self {
        Self { notifier, reporter }
    }

    pub async fn deliver(&self, window: &TimeWindow, artifact: &Path) -> Result<(), PipelineError> {
        if let Err(e) = self.notifier.deliver(artifact, window).await {
            let err = PipelineError::unresolved(StageOrigin::SendDeliveryEmail, e);
            return Err(self.reporter.resolve(err, window).await);
        }
        Ok(())
    }
}
