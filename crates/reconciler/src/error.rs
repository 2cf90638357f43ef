//! Reconciliation error types.

use thaw_index::IndexError;
use thiserror::Error;

/// Fatal reconciliation errors. Per-object probe and restore failures are
/// recorded in the report instead.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid restore parameters: {0}")]
    InvalidParams(#[source] thaw_core::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to resolve chunks for tenant {tenant}: {source}")]
    Resolve {
        tenant: String,
        #[source]
        source: IndexError,
    },
}
