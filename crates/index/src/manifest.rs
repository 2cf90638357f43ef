//! Manifest-file chunk index.
//!
//! The manifest is a JSON export of chunk references and their stream labels:
//!
//! ```json
//! {"chunks": [{"tenant": "acme", "labels": {"app": "checkout"},
//!              "fingerprint": 43981, "from": 1704067200000,
//!              "through": 1704070800000, "checksum": 4660}]}
//! ```

use crate::error::{IndexError, IndexResult};
use crate::traits::ChunkIndex;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thaw_core::{ChunkRef, MatcherExpression, TimeRange};
use tracing::instrument;

/// One chunk reference with the labels of its stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub tenant: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub fingerprint: u64,
    pub from: i64,
    pub through: i64,
    pub checksum: u32,
}

impl ManifestEntry {
    fn chunk_ref(&self) -> IndexResult<ChunkRef> {
        ChunkRef::new(
            self.tenant.clone(),
            self.fingerprint,
            self.from,
            self.through,
            self.checksum,
        )
        .map_err(|e| {
            IndexError::Corrupt(format!(
                "entry for fingerprint {:016x}: {e}",
                self.fingerprint
            ))
        })
    }
}

/// Top-level manifest document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDocument {
    #[serde(default)]
    pub chunks: Vec<ManifestEntry>,
}

#[derive(Debug)]
enum Source {
    /// Re-read on every resolve so a refreshed export is picked up.
    File(PathBuf),
    Memory(Arc<ManifestDocument>),
}

/// Chunk index backed by a manifest document.
#[derive(Debug)]
pub struct ManifestIndex {
    source: Source,
}

impl ManifestIndex {
    /// Index reading the manifest at `path` on each resolve.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            source: Source::File(path.as_ref().to_path_buf()),
        }
    }

    /// Index serving the given entries.
    pub fn from_entries(chunks: Vec<ManifestEntry>) -> Self {
        Self {
            source: Source::Memory(Arc::new(ManifestDocument { chunks })),
        }
    }

    async fn load(&self) -> IndexResult<Arc<ManifestDocument>> {
        let document = match &self.source {
            Source::Memory(document) => document.clone(),
            Source::File(path) => {
                let raw = tokio::fs::read(path)
                    .await
                    .map_err(|source| IndexError::Unreachable {
                        path: path.clone(),
                        source,
                    })?;
                let document: ManifestDocument = serde_json::from_slice(&raw).map_err(|e| {
                    IndexError::Corrupt(format!("{}: {e}", path.display()))
                })?;
                Arc::new(document)
            }
        };
        Ok(document)
    }
}

/// Filter `entries` and group the survivors by fingerprint, keeping the
/// order in which each fingerprint and each chunk first appears.
fn select(
    entries: &[ManifestEntry],
    tenant: &str,
    range: &TimeRange,
    query: &MatcherExpression,
) -> IndexResult<Vec<Vec<ChunkRef>>> {
    let mut groups: Vec<Vec<ChunkRef>> = Vec::new();
    let mut group_of: HashMap<u64, usize> = HashMap::new();

    for entry in entries {
        // Validate before filtering so a broken export never passes silently.
        let chunk = entry.chunk_ref()?;
        if chunk.tenant != tenant || !chunk.overlaps(range) || !query.matches(&entry.labels) {
            continue;
        }
        let slot = *group_of.entry(chunk.fingerprint).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(chunk);
    }

    Ok(groups)
}

#[async_trait]
impl ChunkIndex for ManifestIndex {
    #[instrument(skip(self, query), fields(backend = "manifest", query = %query))]
    async fn resolve(
        &self,
        tenant: &str,
        range: TimeRange,
        query: &MatcherExpression,
    ) -> IndexResult<Vec<Vec<ChunkRef>>> {
        let document = self.load().await?;
        let groups = select(&document.chunks, tenant, &range, query)?;
        tracing::debug!(
            streams = groups.len(),
            chunks = groups.iter().map(Vec::len).sum::<usize>(),
            "Resolved chunks"
        );
        Ok(groups)
    }

    fn backend_name(&self) -> &'static str {
        "manifest"
    }
}
