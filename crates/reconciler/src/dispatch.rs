//! Restore dispatcher.

use crate::observer::ReconcileObserver;
use std::sync::Arc;
use std::time::Duration;
use thaw_core::{DispatchOutcome, RestoreParams, StorageKey};
use thaw_storage::{ObjectStore, StorageError};

/// Issues restore requests, turning every failure into a recorded outcome.
#[derive(Clone)]
pub struct RestoreDispatcher {
    store: Arc<dyn ObjectStore>,
    timeout: Duration,
    observer: Arc<dyn ReconcileObserver>,
}

impl RestoreDispatcher {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        timeout: Duration,
        observer: Arc<dyn ReconcileObserver>,
    ) -> Self {
        Self {
            store,
            timeout,
            observer,
        }
    }

    /// Request a restore from raw caller input.
    ///
    /// Retention below one day is raised to one day and an unrecognized tier
    /// becomes `Standard`.
    pub async fn dispatch(&self, key: &StorageKey, retention_days: i64, tier: &str) -> DispatchOutcome {
        self.dispatch_with(key, RestoreParams::lenient(retention_days, tier))
            .await
    }

    /// Request a restore with normalized parameters. Issues exactly one
    /// restore call.
    pub async fn dispatch_with(&self, key: &StorageKey, params: RestoreParams) -> DispatchOutcome {
        let call = self.store.restore(key.as_str(), params.days, params.tier);
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout(self.timeout)),
        };

        let outcome = match result {
            Ok(()) => DispatchOutcome::success(key.clone()),
            Err(error) => DispatchOutcome::failure(key.clone(), error.to_string()),
        };
        self.observer.dispatch_completed(&outcome);
        outcome
    }
}
