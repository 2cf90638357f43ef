//! Object storage abstraction and backends for archive restores.
//!
//! This crate provides:
//! - The `ObjectStore` capability trait (HEAD probe + restore request)
//! - Backends: S3-compatible and local filesystem

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::filesystem::{FilesystemBackend, ObjectMetadata};
pub use backends::s3::{S3Backend, S3Settings};
pub use error::{StorageError, StorageResult};
pub use traits::ObjectStore;

use std::sync::Arc;
use std::time::Duration;
use thaw_core::config::StorageConfig;

/// Create an object store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::S3 {
            bucket,
            endpoint,
            region,
            prefix,
            access_key_id,
            secret_access_key,
            force_path_style,
            operation_timeout_secs,
            max_attempts,
        } => {
            let backend = S3Backend::new(S3Settings {
                bucket: bucket.clone(),
                endpoint: endpoint.clone(),
                region: region.clone(),
                prefix: prefix.clone(),
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
                force_path_style: *force_path_style,
                operation_timeout: Duration::from_secs(*operation_timeout_secs),
                max_attempts: *max_attempts,
            })
            .await?;
            Ok(Arc::new(backend))
        }
    }
}
