//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use thaw_core::{HeadMetadata, Tier};

/// Object store capability used by the reconciler.
///
/// Implementations only need the two metadata-level operations of an
/// archival object store: a HEAD probe and a restore request. Object
/// contents are never transferred.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Fetch an object's size, storage class and restore status.
    ///
    /// Returns `StorageError::NotFound` if the object does not exist.
    async fn head(&self, key: &str) -> StorageResult<HeadMetadata>;

    /// Request that an archived object be restored for `days` days.
    ///
    /// Restoring an object whose restore is already in progress succeeds.
    async fn restore(&self, key: &str, days: u32, tier: Tier) -> StorageResult<()>;

    /// Get the name of this storage backend.
    ///
    /// Returns a static string identifier for the backend type (e.g., "s3", "filesystem").
    /// Used for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    ///
    /// The default implementation returns Ok(()), suitable for backends that
    /// don't require connectivity verification (e.g., local filesystem).
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
