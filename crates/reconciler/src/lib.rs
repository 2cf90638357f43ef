//! Archive restore reconciliation.
//!
//! Resolves chunk references through a [`thaw_index::ChunkIndex`], probes
//! each derived storage key, and issues restore requests for the objects
//! that sit in an archive storage class:
//!
//! - [`StorageProbe`]: HEAD with timeout, failures classify as unknown
//! - [`RestoreDispatcher`]: restore with timeout, failures become outcomes
//! - [`Reconciler`]: drives both with bounded, order-preserving concurrency
//! - [`ReconcileObserver`]: injected event sink ([`TracingObserver`] by default)

pub mod dispatch;
pub mod error;
pub mod observer;
pub mod probe;
pub mod reconciler;
pub mod source;

pub use dispatch::RestoreDispatcher;
pub use error::ReconcileError;
pub use observer::{ReconcileObserver, TracingObserver};
pub use probe::{Probed, StorageProbe};
pub use reconciler::{ReconcileOptions, ReconcileRequest, Reconciler};
pub use source::{TenantChunk, chunk_stream};
pub use tokio_util::sync::CancellationToken;
