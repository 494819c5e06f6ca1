//! Zip archiver implementation.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::pipeline::BatchLocation;

use super::{ArchiveError, Archiver};

/// Writes `<dir>/<name>.zip` holding every file present in the batch
/// directory when archiving starts.
#[derive(Debug, Clone, Default)]
pub struct ZipArchiver {
    remove_documents: bool,
}

impl ZipArchiver {
    pub fn new(remove_documents: bool) -> Self {
        Self { remove_documents }
    }

    /// Lists regular files in `dir`, excluding `skip`, sorted by name.
    fn list_files(dir: &Path, skip: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
        let entries = std::fs::read_dir(dir).map_err(|e| ArchiveError::io(dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ArchiveError::io(dir, e))?;
            let path = entry.path();
            if path.is_file() && path != skip {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn write_archive(dir: &Path, artifact: &Path) -> Result<usize, ArchiveError> {
        let files = Self::list_files(dir, artifact)?;

        let out = File::create(artifact).map_err(|e| ArchiveError::io(artifact, e))?;
        let mut zip = ZipWriter::new(BufWriter::new(out));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for path in &files {
            let entry_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            zip.start_file(entry_name, options)?;

            let mut source = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
            std::io::copy(&mut source, &mut zip).map_err(|e| ArchiveError::io(path, e))?;
        }

        let mut writer = zip.finish()?;
        writer.flush().map_err(|e| ArchiveError::io(artifact, e))?;
        Ok(files.len())
    }
}

#[async_trait]
impl Archiver for ZipArchiver {
    fn name(&self) -> &str {
        "zip"
    }

    async fn archive(&self, location: &BatchLocation) -> Result<PathBuf, ArchiveError> {
        let dir = location.path.clone();
        let artifact = location.artifact_path();

        let entries = {
            let dir = dir.clone();
            let artifact = artifact.clone();
            tokio::task::spawn_blocking(move || Self::write_archive(&dir, &artifact))
                .await
                .map_err(|e| ArchiveError::TaskFailed(e.to_string()))??
        };
        debug!(artifact = %artifact.display(), entries, "Wrote batch archive");

        if self.remove_documents {
            for document in &location.documents {
                if let Err(e) = tokio::fs::remove_file(document).await {
                    warn!(path = %document.display(), error = %e, "Failed to remove archived document");
                }
            }
        }

        Ok(artifact)
    }
}
