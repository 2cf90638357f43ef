//! Local filesystem storage backend.
//!
//! Objects are plain files under the root directory. Archive state lives in a
//! JSON sidecar next to each object (`<key>.meta.json`), so restores can be
//! exercised without a cloud account.

use crate::error::{StorageError, StorageResult};
use crate::traits::ObjectStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use thaw_core::object::{ARCHIVE_MARKER, ONGOING_RESTORE_MARKER};
use thaw_core::{HeadMetadata, Tier};
use tokio::fs;
use tracing::instrument;

/// Suffix of the sidecar file holding an object's archive metadata.
pub const SIDECAR_SUFFIX: &str = ".meta.json";

/// Archive metadata stored beside a filesystem object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    /// Restore status in S3 header form, e.g. `ongoing-request="true"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_tier: Option<String>,
}

impl ObjectMetadata {
    /// Metadata for an object in the given storage class.
    pub fn with_class(storage_class: impl Into<String>) -> Self {
        Self {
            storage_class: Some(storage_class.into()),
            ..Self::default()
        }
    }

    fn is_archived(&self) -> bool {
        self.storage_class
            .as_deref()
            .is_some_and(|class| class.to_ascii_uppercase().contains(ARCHIVE_MARKER))
    }

    fn restore_in_progress(&self) -> bool {
        self.restore
            .as_deref()
            .is_some_and(|restore| restore.to_ascii_lowercase().contains(ONGOING_RESTORE_MARKER))
    }
}

/// Local filesystem object store.
#[derive(Debug)]
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Write an object and its archive metadata.
    pub async fn put_object(
        &self,
        key: &str,
        contents: &[u8],
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, contents).await?;
        self.write_metadata(key, metadata).await
    }

    /// Read an object's archive metadata. Missing sidecars read as empty metadata.
    pub async fn metadata(&self, key: &str) -> StorageResult<ObjectMetadata> {
        let path = self.key_path(&sidecar_key(key)).await?;
        match fs::read(&path).await {
            Ok(raw) => {
                serde_json::from_slice(&raw).map_err(|e| StorageError::InvalidMetadata {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ObjectMetadata::default()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn write_metadata(&self, key: &str, metadata: &ObjectMetadata) -> StorageResult<()> {
        let path = self.key_path(&sidecar_key(key)).await?;
        let raw = serde_json::to_vec_pretty(metadata).map_err(|e| StorageError::InvalidMetadata {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        fs::write(&path, raw).await?;
        Ok(())
    }

    /// Size of the object file, or NotFound.
    async fn object_size(&self, key: &str) -> StorageResult<u64> {
        let path = self.key_path(key).await?;
        let metadata = fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(metadata.len())
    }

    /// Get the full path for a key, with path traversal protection.
    ///
    /// Canonicalization touches the filesystem, so it runs on the blocking pool.
    async fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        let root = self.root.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || Self::key_path_sync(&root, &key))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
    }

    /// Resolve `key` under `root`, rejecting anything that would escape it,
    /// including escapes through symlinks.
    fn key_path_sync(root: &Path, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || key.starts_with('/') || key.starts_with('\\') {
            return Err(StorageError::InvalidKey(format!(
                "path traversal not allowed: {key}"
            )));
        }
        if !Path::new(key)
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            return Err(StorageError::InvalidKey(format!(
                "contains unsafe path component: {key}"
            )));
        }

        let path = root.join(key);
        let root_canonical = root.canonicalize().map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to canonicalize root: {e}"),
            ))
        })?;

        // Check the path itself when it exists, otherwise its nearest existing
        // ancestor, so a symlinked directory cannot redirect new files either.
        let mut candidate = path.as_path();
        loop {
            match std::fs::symlink_metadata(candidate) {
                Ok(meta) => {
                    let canonical = candidate.canonicalize().map_err(|e| {
                        if meta.file_type().is_symlink() {
                            StorageError::InvalidKey(format!(
                                "symlink target missing or invalid: {key}"
                            ))
                        } else {
                            StorageError::Io(e)
                        }
                    })?;
                    if !canonical.starts_with(&root_canonical) {
                        return Err(StorageError::InvalidKey(format!(
                            "resolved path escapes storage root: {key}"
                        )));
                    }
                    return Ok(path);
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(StorageError::Io(err)),
            }
            match candidate.parent() {
                Some(parent) => candidate = parent,
                None => return Ok(path),
            }
        }
    }
}

fn sidecar_key(key: &str) -> String {
    format!("{key}{SIDECAR_SUFFIX}")
}

#[async_trait]
impl ObjectStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn head(&self, key: &str) -> StorageResult<HeadMetadata> {
        let size = self.object_size(key).await?;
        let metadata = self.metadata(key).await?;

        Ok(HeadMetadata {
            size,
            storage_class: metadata.storage_class,
            restore: metadata.restore,
        })
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn restore(&self, key: &str, days: u32, tier: Tier) -> StorageResult<()> {
        self.object_size(key).await?;
        let mut metadata = self.metadata(key).await?;

        if !metadata.is_archived() {
            return Err(StorageError::RestoreRejected {
                key: key.to_string(),
                reason: format!(
                    "object is not archived (storage class {})",
                    metadata.storage_class.as_deref().unwrap_or("STANDARD")
                ),
            });
        }
        if metadata.restore_in_progress() {
            tracing::debug!(key = %key, "Restore already in progress");
            return Ok(());
        }

        metadata.restore = Some(format!("{ONGOING_RESTORE_MARKER}=\"true\""));
        metadata.restore_days = Some(days);
        metadata.restore_tier = Some(tier.as_str().to_string());
        self.write_metadata(key, &metadata).await
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await?;
        if !metadata.is_dir() {
            return Err(StorageError::Config(format!(
                "storage root is not a directory: {}",
                self.root.display()
            )));
        }
        Ok(())
    }
}
