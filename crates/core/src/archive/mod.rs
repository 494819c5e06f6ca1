//! Batch archiving.
//!
//! An `Archiver` bundles every document of a rendered batch into a single
//! file next to them. `ZipArchiver` produces a deflate-compressed zip.

mod zip_archiver;

pub use zip_archiver::ZipArchiver;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::pipeline::BatchLocation;

/// Errors that can occur while archiving a batch.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Reading the batch or writing the archive failed.
    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The zip writer rejected an entry.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The blocking archive task panicked or was cancelled.
    #[error("archive task failed: {0}")]
    TaskFailed(String),
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Port for compressing a rendered batch.
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Returns the name of this archiver implementation.
    fn name(&self) -> &str;

    /// Archives the batch and returns the path of the created artifact.
    async fn archive(&self, location: &BatchLocation) -> Result<PathBuf, ArchiveError>;
}
