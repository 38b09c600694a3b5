//! Artifact reconciliation: given (path, bytes), ensure a stored file at
//! `path` reflects `bytes` - either on the local filesystem or on a branch
//! through the contents API.

use crate::api::{ApiError, GitHubClient};
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// How a write landed in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Created,
    Updated,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The existence probe failed for a reason other than "not found"; the
    /// write is abandoned rather than misrouted into a create.
    #[error("existence probe for {path} failed: {source}")]
    Probe {
        path: String,
        #[source]
        source: ApiError,
    },
    #[error("remote write of {path} failed: {source}")]
    Remote {
        path: String,
        #[source]
        source: ApiError,
    },
}

/// Ensures a stored file at `path` reflects `bytes`. Writes for independent
/// paths are order-independent; job keys are unique by construction, so no
/// two writes ever target the same path within one run.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn store(&self, path: &str, bytes: &[u8]) -> Result<WriteKind, StoreError>;
}

/// Local filesystem variant: creates parent directories as needed.
pub struct LocalStore;

#[async_trait]
impl ArtifactStore for LocalStore {
    async fn store(&self, path: &str, bytes: &[u8]) -> Result<WriteKind, StoreError> {
        let target = PathBuf::from(path);
        let io_err = |source| StoreError::Io {
            path: path.to_string(),
            source,
        };

        let existed = tokio::fs::try_exists(&target).await.unwrap_or(false);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(&io_err)?;
        }
        tokio::fs::write(&target, bytes).await.map_err(&io_err)?;

        Ok(if existed {
            WriteKind::Updated
        } else {
            WriteKind::Created
        })
    }
}

/// Remote variant: commits files onto a branch. An existing blob is replaced
/// by referencing its current sha, so the write is a true replace rather than
/// a duplicate; a clean not-found probe creates.
pub struct RemoteStore {
    client: GitHubClient,
    branch: String,
}

impl RemoteStore {
    pub fn new(client: GitHubClient, branch: impl Into<String>) -> Self {
        Self {
            client,
            branch: branch.into(),
        }
    }
}

#[async_trait]
impl ArtifactStore for RemoteStore {
    async fn store(&self, path: &str, bytes: &[u8]) -> Result<WriteKind, StoreError> {
        let existing = match self.client.file_content(path, &self.branch).await {
            Ok(file) => Some(file.sha),
            Err(ApiError::NotFound) => None,
            Err(e) => {
                return Err(StoreError::Probe {
                    path: path.to_string(),
                    source: e,
                });
            }
        };

        let message = match &existing {
            Some(_) => format!("Update snapshot screenshot {path}"),
            None => format!("Add snapshot screenshot {path}"),
        };
        self.client
            .put_file(path, bytes, &message, &self.branch, existing.as_deref())
            .await
            .map_err(|e| StoreError::Remote {
                path: path.to_string(),
                source: e,
            })?;

        Ok(if existing.is_some() {
            WriteKind::Updated
        } else {
            WriteKind::Created
        })
    }
}
