#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thaw_core::{
    ChunkRef, DispatchOutcome, HeadMetadata, MatcherExpression, ObjectState, ReconciliationReport,
    StorageKey, Tier, TimeRange,
};
use thaw_index::{ChunkIndex, IndexError, IndexResult};
use thaw_reconciler::{CancellationToken, ReconcileObserver};
use thaw_storage::{ObjectStore, StorageError, StorageResult};

pub const HOUR_MS: i64 = 3_600_000;
/// 2024-01-01T00:00:00Z
pub const JAN_1: i64 = 1_704_067_200_000;

pub fn chunk(tenant: &str, fingerprint: u64, hour: i64, checksum: u32) -> ChunkRef {
    ChunkRef::new(
        tenant,
        fingerprint,
        JAN_1 + hour * HOUR_MS,
        JAN_1 + (hour + 1) * HOUR_MS,
        checksum,
    )
    .unwrap()
}

pub fn january() -> TimeRange {
    TimeRange::new(JAN_1, JAN_1 + 24 * HOUR_MS).unwrap()
}

pub fn any_app() -> MatcherExpression {
    MatcherExpression::parse(r#"{app=~".+"}"#).unwrap()
}

/// In-memory object store with scripted failures and delays.
#[derive(Default)]
pub struct StubStore {
    objects: Mutex<HashMap<String, HeadMetadata>>,
    failing_heads: HashSet<String>,
    failing_restores: HashSet<String>,
    hanging: HashSet<String>,
    delays: HashMap<String, Duration>,
    pub head_calls: AtomicUsize,
    pub restore_calls: Mutex<Vec<(String, u32, Tier)>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl StubStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, key: &StorageKey, size: u64, storage_class: &str) -> Self {
        self.with_head(
            key,
            HeadMetadata {
                size,
                storage_class: Some(storage_class.to_string()),
                restore: None,
            },
        )
    }

    pub fn with_head(self, key: &StorageKey, head: HeadMetadata) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert(key.as_str().to_string(), head);
        self
    }

    /// HEAD fails with a transport error.
    pub fn failing_head(mut self, key: &StorageKey) -> Self {
        self.failing_heads.insert(key.as_str().to_string());
        self
    }

    /// Restore is rejected by the store.
    pub fn failing_restore(mut self, key: &StorageKey) -> Self {
        self.failing_restores.insert(key.as_str().to_string());
        self
    }

    /// Every call for this key never completes.
    pub fn hanging(mut self, key: &StorageKey) -> Self {
        self.hanging.insert(key.as_str().to_string());
        self
    }

    /// HEAD for this key completes after `delay`.
    pub fn delayed(mut self, key: &StorageKey, delay: Duration) -> Self {
        self.delays.insert(key.as_str().to_string(), delay);
        self
    }

    pub fn head_count(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    pub fn restored_keys(&self) -> Vec<String> {
        self.restore_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _, _)| key.clone())
            .collect()
    }

    async fn enter(&self, key: &str) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if self.hanging.contains(key) {
            std::future::pending::<()>().await;
        }
        let delay = self.delays.get(key).copied().unwrap_or(Duration::from_millis(1));
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for StubStore {
    async fn head(&self, key: &str) -> StorageResult<HeadMetadata> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(key).await;
        if self.failing_heads.contains(key) {
            return Err(StorageError::S3("connection reset by peer".into()));
        }
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn restore(&self, key: &str, days: u32, tier: Tier) -> StorageResult<()> {
        self.restore_calls
            .lock()
            .unwrap()
            .push((key.to_string(), days, tier));
        self.enter(key).await;
        if self.failing_restores.contains(key) {
            return Err(StorageError::RestoreRejected {
                key: key.to_string(),
                reason: "access denied".to_string(),
            });
        }
        let mut objects = self.objects.lock().unwrap();
        let object = objects
            .get_mut(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        object.restore = Some("ongoing-request=\"true\"".to_string());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "stub"
    }
}

/// Index returning fixed groups per tenant.
#[derive(Default)]
pub struct StubIndex {
    groups: HashMap<String, Vec<Vec<ChunkRef>>>,
    failing: HashSet<String>,
    pub resolve_calls: AtomicUsize,
}

impl StubIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_groups(mut self, tenant: &str, groups: Vec<Vec<ChunkRef>>) -> Self {
        self.groups.insert(tenant.to_string(), groups);
        self
    }

    pub fn failing(mut self, tenant: &str) -> Self {
        self.failing.insert(tenant.to_string());
        self
    }

    pub fn resolve_count(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChunkIndex for StubIndex {
    async fn resolve(
        &self,
        tenant: &str,
        _range: TimeRange,
        _query: &MatcherExpression,
    ) -> IndexResult<Vec<Vec<ChunkRef>>> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(tenant) {
            return Err(IndexError::Corrupt("index store unavailable".to_string()));
        }
        Ok(self.groups.get(tenant).cloned().unwrap_or_default())
    }

    fn backend_name(&self) -> &'static str {
        "stub"
    }
}

/// Observer recording event names, optionally cancelling a token once a
/// number of restore candidates has been seen.
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<String>>,
    cancel_after: Option<(usize, CancellationToken)>,
    candidates: AtomicUsize,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancelling_after(candidates: usize, token: CancellationToken) -> Self {
        Self {
            cancel_after: Some((candidates, token)),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ReconcileObserver for RecordingObserver {
    fn tenant_resolved(&self, tenant: &str, streams: usize, chunks: usize) {
        self.push(format!("resolved {tenant} {streams} {chunks}"));
    }

    fn probe_failed(&self, key: &StorageKey, _error: &StorageError) {
        self.push(format!("probe_failed {key}"));
    }

    fn restore_candidate(&self, key: &StorageKey, _state: &ObjectState) {
        self.push(format!("candidate {key}"));
        let seen = self.candidates.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((limit, token)) = &self.cancel_after
            && seen >= *limit
        {
            token.cancel();
        }
    }

    fn dispatch_completed(&self, outcome: &DispatchOutcome) {
        self.push(format!("dispatched {} {}", outcome.key, outcome.succeeded));
    }

    fn run_finished(&self, report: &ReconciliationReport) {
        self.push(format!("finished {}", report.totals.total_files));
    }
}
