//! Configuration types shared across crates.

use crate::restore::{DEFAULT_RETENTION_DAYS, Leniency};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound for concurrent object store calls.
pub const MAX_CONCURRENCY: usize = 256;

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage with sidecar metadata files.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
    /// S3-compatible storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL (for MinIO, etc.).
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// Optional key prefix.
        prefix: Option<String>,
        /// AWS access key ID. Falls back to the ambient credential chain if not set.
        /// WARNING: Prefer env vars or IAM roles over storing secrets in config files.
        access_key_id: Option<String>,
        /// AWS secret access key. Falls back to the ambient credential chain if not set.
        secret_access_key: Option<String>,
        /// Force path-style URLs (`endpoint/bucket/key`). Required for MinIO.
        #[serde(default)]
        force_path_style: bool,
        /// Per-operation timeout applied by the SDK, including retries.
        #[serde(default = "default_operation_timeout_secs")]
        operation_timeout_secs: u64,
        /// Maximum attempts per operation for transient errors (1 = no retries).
        #[serde(default = "default_max_attempts")]
        max_attempts: u32,
    },
}

fn default_operation_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/storage"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::S3 {
                bucket,
                access_key_id,
                secret_access_key,
                operation_timeout_secs,
                max_attempts,
                ..
            } => {
                if bucket.is_empty() {
                    return Err("s3 config requires a non-empty bucket".to_string());
                }
                if *operation_timeout_secs == 0 {
                    return Err("s3 operation_timeout_secs must be at least 1".to_string());
                }
                if *max_attempts == 0 {
                    return Err("s3 max_attempts must be at least 1".to_string());
                }
                match (access_key_id.as_ref(), secret_access_key.as_ref()) {
                    (Some(_), Some(_)) | (None, None) => Ok(()),
                    _ => Err(
                        "s3 config requires both access_key_id and secret_access_key when either is set"
                            .to_string(),
                    ),
                }
            }
            StorageConfig::Filesystem { .. } => Ok(()),
        }
    }
}

/// Chunk index configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IndexConfig {
    /// JSON manifest of chunk references exported from the log index.
    Manifest {
        /// Path to the manifest file.
        path: PathBuf,
    },
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::Manifest {
            path: PathBuf::from("./data/chunks.json"),
        }
    }
}

/// Restore run configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RestoreConfig {
    /// Days a restored copy stays readable (default: 3).
    /// Values below 1 are raised to 1 unless `leniency` is `strict`.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    /// Retrieval tier: "Standard" or "Bulk" (default: "Standard").
    /// Unknown tiers become "Standard" unless `leniency` is `strict`.
    #[serde(default = "default_tier")]
    pub tier: String,
    /// How out-of-range retention and tier values are treated.
    #[serde(default)]
    pub leniency: Leniency,
    /// Maximum concurrent probe or restore calls (clamped to [1, 256]).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Timeout in seconds for a single probe or restore call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// Probe and report only, never issue restore requests.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_retention_days() -> i64 {
    i64::from(DEFAULT_RETENTION_DAYS)
}

fn default_tier() -> String {
    "Standard".to_string()
}

fn default_concurrency() -> usize {
    16
}

fn default_call_timeout_secs() -> u64 {
    60
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            tier: default_tier(),
            leniency: Leniency::default(),
            concurrency: default_concurrency(),
            call_timeout_secs: default_call_timeout_secs(),
            dry_run: false,
        }
    }
}

impl RestoreConfig {
    /// Concurrency limit clamped to the supported range.
    pub fn normalized_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }

    /// Per-call timeout as a Duration.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Validate restore configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.call_timeout_secs == 0 {
            return Err("restore.call_timeout_secs must be at least 1".to_string());
        }
        crate::restore::RestoreParams::resolve(self.retention_days, &self.tier, self.leniency)
            .map(|_| ())
            .map_err(|e| format!("restore: {e}"))
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Chunk index configuration.
    #[serde(default)]
    pub index: IndexConfig,
    /// Restore run configuration.
    #[serde(default)]
    pub restore: RestoreConfig,
}

impl AppConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.storage.validate()?;
        self.restore.validate()
    }
}
