//! Chunk index abstraction for archive restores.
//!
//! This crate provides:
//! - The `ChunkIndex` capability trait the reconciler resolves chunks through
//! - `ManifestIndex`, backed by a JSON export of chunk references

pub mod error;
pub mod manifest;
pub mod traits;

pub use error::{IndexError, IndexResult};
pub use manifest::{ManifestDocument, ManifestEntry, ManifestIndex};
pub use traits::ChunkIndex;

use std::sync::Arc;
use thaw_core::config::IndexConfig;

/// Create a chunk index from configuration.
pub fn from_config(config: &IndexConfig) -> Arc<dyn ChunkIndex> {
    match config {
        IndexConfig::Manifest { path } => Arc::new(ManifestIndex::from_path(path)),
    }
}
