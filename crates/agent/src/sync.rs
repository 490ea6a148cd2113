//! Background sync hook.
//!
//! The queue of pending actions belongs to the application layer; the
//! agent only drains it when the host fires a sync event and reports the
//! aggregate result. The default queue is empty.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Tag for one-shot background sync events.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";
/// Tag for periodic sync events.
pub const PERIODIC_SYNC_TAG: &str = "periodic-sync";

/// An action queued by the application while offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncAction {
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
#[error("SYNC_ERROR: {0}")]
pub struct SyncError(pub String);

/// Application-owned source of pending actions.
#[async_trait]
pub trait SyncQueue: Send + Sync {
    /// Actions waiting to be replayed.
    async fn pending_actions(&self) -> Result<Vec<SyncAction>, SyncError>;

    /// Replay one action.
    async fn process(&self, action: &SyncAction) -> Result<(), SyncError>;
}

/// Default queue: nothing pending, processing is a no-op.
#[derive(Debug, Default)]
pub struct NoopSyncQueue;

#[async_trait]
impl SyncQueue for NoopSyncQueue {
    async fn pending_actions(&self) -> Result<Vec<SyncAction>, SyncError> {
        Ok(Vec::new())
    }

    async fn process(&self, action: &SyncAction) -> Result<(), SyncError> {
        tracing::debug!("processing queued action {} ({})", action.id, action.kind);
        Ok(())
    }
}

/// Aggregate result of draining the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub processed: usize,
    pub failed: usize,
}

impl SyncReport {
    pub fn all_ok(&self) -> bool {
        self.failed == 0
    }
}

/// Drain the queue, processing every pending action. One failing action
/// does not stop the rest; the report carries both counts.
pub async fn drain(queue: &dyn SyncQueue) -> Result<SyncReport, SyncError> {
    let mut report = SyncReport::default();

    for action in queue.pending_actions().await? {
        match queue.process(&action).await {
            Ok(()) => report.processed += 1,
            Err(err) => {
                tracing::error!("sync action {} failed: {err}", action.id);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
