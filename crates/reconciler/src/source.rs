//! Lazy tenant → stream → chunk traversal.

use crate::error::ReconcileError;
use crate::observer::ReconcileObserver;
use futures::Stream;
use std::sync::Arc;
use thaw_core::{ChunkRef, MatcherExpression, TimeRange};
use thaw_index::ChunkIndex;

/// A chunk reference attributed to the tenant it was resolved for.
#[derive(Clone, Debug)]
pub struct TenantChunk {
    pub tenant: Arc<str>,
    pub chunk: ChunkRef,
}

/// Stream every chunk reference for `tenants`, in tenant order and then in
/// the index's group and chunk order.
///
/// Tenants are resolved one at a time as the stream is polled, so only one
/// tenant's references are held in memory.
pub fn chunk_stream<'a>(
    index: &'a dyn ChunkIndex,
    tenants: &'a [String],
    range: TimeRange,
    query: &'a MatcherExpression,
    observer: &'a dyn ReconcileObserver,
) -> impl Stream<Item = Result<TenantChunk, ReconcileError>> + Send + 'a {
    async_stream::try_stream! {
        for tenant in tenants {
            let groups = index
                .resolve(tenant, range, query)
                .await
                .map_err(|source| ReconcileError::Resolve {
                    tenant: tenant.clone(),
                    source,
                })?;
            let chunks = groups.iter().map(Vec::len).sum::<usize>();
            observer.tenant_resolved(tenant, groups.len(), chunks);

            let tenant: Arc<str> = Arc::from(tenant.as_str());
            for group in groups {
                for chunk in group {
                    yield TenantChunk {
                        tenant: tenant.clone(),
                        chunk,
                    };
                }
            }
        }
    }
}
