//! Reconciliation report types.

use crate::chunk::StorageKey;
use crate::object::ObjectState;
use serde::{Deserialize, Serialize};

/// Result of one restore request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub key: StorageKey,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchOutcome {
    pub fn success(key: StorageKey) -> Self {
        Self {
            key,
            succeeded: true,
            error: None,
        }
    }

    pub fn failure(key: StorageKey, error: impl Into<String>) -> Self {
        Self {
            key,
            succeeded: false,
            error: Some(error.into()),
        }
    }
}

/// Size and count accumulator shared by the global and per-tenant totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeTotals {
    pub total_files: u64,
    pub total_size_bytes: u64,
    pub restore_candidate_count: u64,
    pub restore_candidate_size_bytes: u64,
    pub probe_failures: u64,
}

impl ProbeTotals {
    /// Fold one probed object into the counters.
    pub fn record(&mut self, state: &ObjectState, probe_failed: bool) {
        self.total_files += 1;
        self.total_size_bytes = self.total_size_bytes.saturating_add(state.size_bytes);
        if state.needs_restore {
            self.restore_candidate_count += 1;
            self.restore_candidate_size_bytes = self
                .restore_candidate_size_bytes
                .saturating_add(state.size_bytes);
        }
        if probe_failed {
            self.probe_failures += 1;
        }
    }
}

/// Size and count accounting for a single tenant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantStats {
    pub tenant: String,
    #[serde(flatten)]
    pub totals: ProbeTotals,
}

impl TenantStats {
    pub fn new(tenant: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            ..Self::default()
        }
    }
}

/// Aggregate produced at the end of a reconciliation run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    #[serde(flatten)]
    pub totals: ProbeTotals,
    /// Per-tenant breakdown in request order.
    pub tenants: Vec<TenantStats>,
    /// Restore outcomes in discovery order.
    pub dispatch_outcomes: Vec<DispatchOutcome>,
    /// Dispatch was skipped by configuration.
    pub dry_run: bool,
    /// The run stopped early; totals cover completed work only.
    pub cancelled: bool,
}

impl ReconciliationReport {
    /// Create an empty report with a zeroed entry for each tenant.
    pub fn new<I, S>(tenants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = Self::default();
        for tenant in tenants {
            report.tenant_mut(tenant.as_ref());
        }
        report
    }

    /// Fold one probed object into the global and per-tenant totals.
    pub fn record_probe(&mut self, tenant: &str, state: &ObjectState, probe_failed: bool) {
        self.totals.record(state, probe_failed);
        self.tenant_mut(tenant).totals.record(state, probe_failed);
    }

    /// Append a dispatch outcome.
    pub fn record_dispatch(&mut self, outcome: DispatchOutcome) {
        self.dispatch_outcomes.push(outcome);
    }

    /// Number of successful restore requests.
    pub fn dispatch_succeeded(&self) -> usize {
        self.dispatch_outcomes.iter().filter(|o| o.succeeded).count()
    }

    /// Number of failed restore requests.
    pub fn dispatch_failed(&self) -> usize {
        self.dispatch_outcomes.len() - self.dispatch_succeeded()
    }

    /// Stats for a tenant, if it was part of the run.
    pub fn tenant(&self, tenant: &str) -> Option<&TenantStats> {
        self.tenants.iter().find(|stats| stats.tenant == tenant)
    }

    fn tenant_mut(&mut self, tenant: &str) -> &mut TenantStats {
        // Tenants arrive in order, so the most recent entry is the common hit.
        let index = match self.tenants.iter().rposition(|stats| stats.tenant == tenant) {
            Some(index) => index,
            None => {
                self.tenants.push(TenantStats::new(tenant));
                self.tenants.len() - 1
            }
        };
        &mut self.tenants[index]
    }
}
