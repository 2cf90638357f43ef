//! Chunk index error types.

use std::path::PathBuf;
use thiserror::Error;

/// Chunk index errors. Every variant is fatal to a reconciliation run.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index unreachable at {}: {source}", path.display())]
    Unreachable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt index: {0}")]
    Corrupt(String),
}

/// Result type for chunk index operations.
pub type IndexResult<T> = std::result::Result<T, IndexError>;
