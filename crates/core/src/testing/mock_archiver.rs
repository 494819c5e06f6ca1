//! Mock archiver for testing.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::archive::{ArchiveError, Archiver};
use crate::pipeline::BatchLocation;

/// Mock implementation of the `Archiver` trait.
///
/// Does not touch the filesystem; returns the path a real archiver would
/// have written.
#[derive(Debug, Default)]
pub struct MockArchiver {
    archived: Arc<RwLock<Vec<BatchLocation>>>,
    next_error: Arc<RwLock<Option<ArchiveError>>>,
}

impl MockArchiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded_batches(&self) -> Vec<BatchLocation> {
        self.archived.read().await.clone()
    }

    pub async fn set_next_error(&self, error: ArchiveError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl Archiver for MockArchiver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn archive(&self, location: &BatchLocation) -> Result<PathBuf, ArchiveError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        self.archived.write().await.push(location.clone());
        Ok(location.artifact_path())
    }
}
