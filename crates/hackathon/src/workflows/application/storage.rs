use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::domain::UploadedFile;

/// Permanent home for uploaded files.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Directory files end up in; recorded as the upload's destination.
    fn root(&self) -> &Path;

    /// Moves `file` out of its temporary location, keeping its generated filename.
    async fn relocate(&self, file: &UploadedFile) -> Result<PathBuf, StorageError>;
}

/// Filesystem-backed store rooted at the configured upload directory.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn relocate(&self, file: &UploadedFile) -> Result<PathBuf, StorageError> {
        let is_plain_name = Path::new(&file.filename)
            .file_name()
            .is_some_and(|name| name == file.filename.as_str());
        if !is_plain_name {
            return Err(StorageError::InvalidFilename(file.filename.clone()));
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StorageError::Io {
                path: self.root.clone(),
                source,
            })?;

        let target = self.root.join(&file.filename);
        if let Err(rename_err) = tokio::fs::rename(&file.path, &target).await {
            // rename cannot cross filesystems; fall back to copy + unlink
            debug!(error = %rename_err, from = %file.path.display(), "rename failed, copying upload");
            tokio::fs::copy(&file.path, &target)
                .await
                .map_err(|_| StorageError::Io {
                    path: file.path.clone(),
                    source: rename_err,
                })?;
            tokio::fs::remove_file(&file.path)
                .await
                .map_err(|source| StorageError::Io {
                    path: file.path.clone(),
                    source,
                })?;
        }

        Ok(target)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to move upload {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("upload filename '{0}' is not a plain file name")]
    InvalidFilename(String),
}
