//! Reconciliation run driver.

use crate::dispatch::RestoreDispatcher;
use crate::error::ReconcileError;
use crate::observer::{ReconcileObserver, TracingObserver};
use crate::probe::StorageProbe;
use crate::source::{TenantChunk, chunk_stream};
use futures::StreamExt;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use thaw_core::config::{MAX_CONCURRENCY, RestoreConfig};
use thaw_core::restore::DEFAULT_RETENTION_DAYS;
use thaw_core::{
    Leniency, MatcherExpression, ReconciliationReport, RestoreParams, StorageKey, Tier, TimeRange,
};
use thaw_index::ChunkIndex;
use thaw_storage::ObjectStore;
use tokio_util::sync::CancellationToken;

/// Execution settings that stay fixed across runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Maximum in-flight probe or restore calls. Clamped to [1, 256].
    pub concurrency: usize,
    /// Timeout for a single probe or restore call.
    pub call_timeout: Duration,
    /// Probe and report only.
    pub dry_run: bool,
    /// Policy for out-of-range retention and unknown tiers.
    pub leniency: Leniency,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self::from_config(&RestoreConfig::default())
    }
}

impl ReconcileOptions {
    pub fn from_config(config: &RestoreConfig) -> Self {
        Self {
            concurrency: config.normalized_concurrency(),
            call_timeout: config.call_timeout(),
            dry_run: config.dry_run,
            leniency: config.leniency,
        }
    }

    fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }
}

/// What to reconcile.
#[derive(Clone, Debug)]
pub struct ReconcileRequest {
    /// Tenants in processing order.
    pub tenants: Vec<String>,
    pub range: TimeRange,
    pub query: MatcherExpression,
    /// Requested retention in days, before leniency is applied.
    pub retention_days: i64,
    /// Requested tier, before leniency is applied.
    pub tier: String,
}

impl ReconcileRequest {
    /// Request with the default retention (3 days) and `Standard` tier.
    pub fn new(tenants: Vec<String>, range: TimeRange, query: MatcherExpression) -> Self {
        Self {
            tenants,
            range,
            query,
            retention_days: i64::from(DEFAULT_RETENTION_DAYS),
            tier: Tier::Standard.as_str().to_string(),
        }
    }
}

/// Probes every chunk the index resolves and restores the archived ones.
pub struct Reconciler {
    index: Arc<dyn ChunkIndex>,
    probe: StorageProbe,
    dispatcher: RestoreDispatcher,
    observer: Arc<dyn ReconcileObserver>,
    options: ReconcileOptions,
}

impl Reconciler {
    /// Reconciler reporting through `tracing`.
    pub fn new(
        index: Arc<dyn ChunkIndex>,
        store: Arc<dyn ObjectStore>,
        options: ReconcileOptions,
    ) -> Self {
        Self::with_observer(index, store, options, Arc::new(TracingObserver))
    }

    pub fn with_observer(
        index: Arc<dyn ChunkIndex>,
        store: Arc<dyn ObjectStore>,
        options: ReconcileOptions,
        observer: Arc<dyn ReconcileObserver>,
    ) -> Self {
        let probe = StorageProbe::new(store.clone(), options.call_timeout, observer.clone());
        let dispatcher = RestoreDispatcher::new(store, options.call_timeout, observer.clone());
        Self {
            index,
            probe,
            dispatcher,
            observer,
            options,
        }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Run one reconciliation.
    ///
    /// All chunks are probed before any restore is issued. Candidates are
    /// restored in discovery order. Index failures abort the run; probe and
    /// restore failures are recorded per key. Once `cancel` fires no new
    /// chunk is probed and no new restore starts, and the returned report
    /// covers the completed calls only.
    pub async fn reconcile(
        &self,
        request: ReconcileRequest,
        cancel: CancellationToken,
    ) -> Result<ReconciliationReport, ReconcileError> {
        let params =
            RestoreParams::resolve(request.retention_days, &request.tier, self.options.leniency)
                .map_err(ReconcileError::InvalidParams)?;
        if request.tenants.iter().any(|tenant| tenant.is_empty()) {
            return Err(ReconcileError::InvalidRequest(
                "tenant names must not be empty".to_string(),
            ));
        }

        let concurrency = self.options.effective_concurrency();
        self.observer
            .run_started(&request.tenants, &params, self.options.dry_run);

        let mut report = ReconciliationReport::new(&request.tenants);
        report.dry_run = self.options.dry_run;

        let candidates = self
            .probe_all(&request, concurrency, &cancel, &mut report)
            .await?;

        if !self.options.dry_run && !cancel.is_cancelled() {
            let dispatcher = &self.dispatcher;
            let outcomes = futures::stream::iter(candidates)
                .take_until(cancel.cancelled())
                .map(|key| async move { dispatcher.dispatch_with(&key, params).await })
                .buffered(concurrency);
            let mut outcomes = pin!(outcomes);
            while let Some(outcome) = outcomes.next().await {
                report.record_dispatch(outcome);
            }
        }

        report.cancelled = cancel.is_cancelled();
        self.observer.run_finished(&report);
        Ok(report)
    }

    /// Probe every resolved chunk, folding results into `report`, and return
    /// the keys needing a restore in discovery order.
    async fn probe_all(
        &self,
        request: &ReconcileRequest,
        concurrency: usize,
        cancel: &CancellationToken,
        report: &mut ReconciliationReport,
    ) -> Result<Vec<StorageKey>, ReconcileError> {
        let probe = &self.probe;
        let chunks = chunk_stream(
            self.index.as_ref(),
            &request.tenants,
            request.range,
            &request.query,
            self.observer.as_ref(),
        );
        let probed = chunks
            .take_until(cancel.cancelled())
            .map(|item| async move {
                let TenantChunk { tenant, chunk } = item?;
                let key = chunk.storage_key();
                let probed = probe.probe_with_status(&key).await;
                Ok::<_, ReconcileError>((tenant, key, probed))
            })
            .buffered(concurrency);
        let mut probed = pin!(probed);

        let mut candidates = Vec::new();
        while let Some(item) = probed.next().await {
            let (tenant, key, probed) = item?;
            report.record_probe(&tenant, &probed.state, probed.failed);
            if probed.state.needs_restore {
                self.observer.restore_candidate(&key, &probed.state);
                candidates.push(key);
            }
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_config() {
        let config = RestoreConfig {
            concurrency: 0,
            call_timeout_secs: 5,
            dry_run: true,
            leniency: Leniency::Strict,
            ..RestoreConfig::default()
        };
        let options = ReconcileOptions::from_config(&config);
        assert_eq!(options.concurrency, 1);
        assert_eq!(options.call_timeout, Duration::from_secs(5));
        assert!(options.dry_run);
        assert_eq!(options.leniency, Leniency::Strict);
    }

    #[test]
    fn test_effective_concurrency_clamps_manual_options() {
        let options = ReconcileOptions {
            concurrency: 100_000,
            ..ReconcileOptions::default()
        };
        assert_eq!(options.effective_concurrency(), MAX_CONCURRENCY);
    }

    #[test]
    fn test_request_defaults() {
        let request = ReconcileRequest::new(
            vec!["acme".to_string()],
            TimeRange::new(0, 1).unwrap(),
            MatcherExpression::parse(r#"{app="api"}"#).unwrap(),
        );
        assert_eq!(request.retention_days, 3);
        assert_eq!(request.tier, "Standard");
    }
}
