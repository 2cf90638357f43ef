//! Storage probe adapter.

use crate::observer::ReconcileObserver;
use std::sync::Arc;
use std::time::Duration;
use thaw_core::{ObjectState, StorageKey};
use thaw_storage::{ObjectStore, StorageError, StorageResult};

/// Classified probe result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Probed {
    pub state: ObjectState,
    /// The probe failed and `state` is [`ObjectState::unknown`].
    pub failed: bool,
}

/// Wraps `ObjectStore::head` with a timeout and classification.
///
/// Failures never propagate: missing objects, transport errors and timeouts
/// all classify as unknown and are reported to the observer.
#[derive(Clone)]
pub struct StorageProbe {
    store: Arc<dyn ObjectStore>,
    timeout: Duration,
    observer: Arc<dyn ReconcileObserver>,
}

impl StorageProbe {
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

    /// Probe and classify one object.
    pub async fn probe(&self, key: &StorageKey) -> ObjectState {
        self.probe_with_status(key).await.state
    }

    /// Probe and classify one object, keeping whether the probe failed.
    pub async fn probe_with_status(&self, key: &StorageKey) -> Probed {
        match self.head(key).await {
            Ok(state) => Probed {
                state,
                failed: false,
            },
            Err(error) => {
                self.observer.probe_failed(key, &error);
                Probed {
                    state: ObjectState::unknown(),
                    failed: true,
                }
            }
        }
    }

    async fn head(&self, key: &StorageKey) -> StorageResult<ObjectState> {
        let meta = tokio::time::timeout(self.timeout, self.store.head(key.as_str()))
            .await
            .map_err(|_| StorageError::Timeout(self.timeout))??;
        Ok(ObjectState::classify(&meta))
    }
}
