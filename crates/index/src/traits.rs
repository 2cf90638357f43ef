//! Chunk index trait definitions.

use crate::error::IndexResult;
use async_trait::async_trait;
use thaw_core::{ChunkRef, MatcherExpression, TimeRange};

/// Source of chunk references for a tenant, window and stream selector.
#[async_trait]
pub trait ChunkIndex: Send + Sync + 'static {
    /// Chunk references of `tenant` intersecting `range` whose stream labels
    /// satisfy `query`, grouped per stream.
    ///
    /// Group order and the order within each group are significant: callers
    /// process references exactly in the returned order.
    async fn resolve(
        &self,
        tenant: &str,
        range: TimeRange,
        query: &MatcherExpression,
    ) -> IndexResult<Vec<Vec<ChunkRef>>>;

    /// Get the name of this index backend, for logging.
    fn backend_name(&self) -> &'static str;
}
