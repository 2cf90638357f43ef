//! Run event sink.

use thaw_core::{DispatchOutcome, ObjectState, ReconciliationReport, RestoreParams, StorageKey};
use thaw_storage::StorageError;

/// Receives the events of a reconciliation run.
///
/// Every method defaults to a no-op, so implementations only override what
/// they care about. Calls arrive from the task driving the run and, for
/// probe and dispatch events, from concurrently polled futures.
pub trait ReconcileObserver: Send + Sync {
    fn run_started(&self, _tenants: &[String], _params: &RestoreParams, _dry_run: bool) {}

    fn tenant_resolved(&self, _tenant: &str, _streams: usize, _chunks: usize) {}

    fn probe_failed(&self, _key: &StorageKey, _error: &StorageError) {}

    fn restore_candidate(&self, _key: &StorageKey, _state: &ObjectState) {}

    fn dispatch_completed(&self, _outcome: &DispatchOutcome) {}

    fn run_finished(&self, _report: &ReconciliationReport) {}
}

/// Observer that emits `tracing` events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl ReconcileObserver for TracingObserver {
    fn run_started(&self, tenants: &[String], params: &RestoreParams, dry_run: bool) {
        tracing::info!(
            tenants = tenants.len(),
            retention_days = params.days,
            tier = %params.tier,
            dry_run,
            "Starting restore reconciliation"
        );
    }

    fn tenant_resolved(&self, tenant: &str, streams: usize, chunks: usize) {
        tracing::info!(tenant, streams, chunks, "Resolved chunk references");
    }

    fn probe_failed(&self, key: &StorageKey, error: &StorageError) {
        tracing::warn!(key = %key, error = %error, "Failed to probe object, skipping");
    }

    fn restore_candidate(&self, key: &StorageKey, state: &ObjectState) {
        tracing::debug!(
            key = %key,
            size_bytes = state.size_bytes,
            storage_class = %state.storage_class,
            "Object needs restore"
        );
    }

    fn dispatch_completed(&self, outcome: &DispatchOutcome) {
        match &outcome.error {
            None => tracing::debug!(key = %outcome.key, "Restore requested"),
            Some(error) => {
                tracing::error!(key = %outcome.key, error = %error, "Restore request failed")
            }
        }
    }

    fn run_finished(&self, report: &ReconciliationReport) {
        tracing::info!(
            total_files = report.totals.total_files,
            total_size_bytes = report.totals.total_size_bytes,
            restore_candidates = report.totals.restore_candidate_count,
            restore_candidate_size_bytes = report.totals.restore_candidate_size_bytes,
            probe_failures = report.totals.probe_failures,
            restores_succeeded = report.dispatch_succeeded(),
            restores_failed = report.dispatch_failed(),
            dry_run = report.dry_run,
            cancelled = report.cancelled,
            "Restore reconciliation finished"
        );
    }
}
