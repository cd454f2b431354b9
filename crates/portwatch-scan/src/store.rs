//! Artifact storage: trait plus file-backed implementation.
//!
//! The store holds exactly one artifact: the report of the last completed
//! scan. Sessions read it as the previous scan and replace it with the
//! current one once the diff is computed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::PersistenceError;

/// Trait for artifact persistence backends.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Fetch the stored artifact bytes.
    async fn get(&self) -> Result<Vec<u8>, PersistenceError>;

    /// Replace the stored artifact with `bytes`.
    async fn put(&self, bytes: &[u8]) -> Result<(), PersistenceError>;
}

/// File-system backed artifact store.
///
/// Writes go to a sibling `.tmp` file which is flushed to disk and then
/// renamed over the target, so an interrupted write never leaves a truncated
/// artifact.
pub struct FileArtifactStore {
    path: PathBuf,
}

impl FileArtifactStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn get(&self) -> Result<Vec<u8>, PersistenceError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "Loaded artifact");
                Ok(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(PersistenceError::NotFound {
                location: self.path.display().to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, bytes: &[u8]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "Stored artifact");
        Ok(())
    }
}
