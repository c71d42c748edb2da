//! Catalogue change events for the rendering layer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::job::BucketSnapshot;

/// Why the catalogue changed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type", content = "jobId")]
pub enum ChangeReason {
    /// Seeded from the persisted snapshot at startup.
    Restored,
    /// Authoritative full fetch.
    Refreshed,
    /// A poller merged a status response.
    Polled(String),
    /// A lifecycle operation confirmed by the backend.
    Lifecycle(String),
    /// A job was removed after deletion.
    Removed(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueEvent {
    pub reason: ChangeReason,
    pub snapshot: BucketSnapshot,
    pub timestamp: DateTime<Utc>,
}

/// Broadcasts a fresh bucket snapshot after every catalogue change.
#[derive(Clone)]
pub struct CatalogueEventBroadcaster {
    sender: Arc<broadcast::Sender<CatalogueEvent>>,
}

impl CatalogueEventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, reason: ChangeReason, snapshot: BucketSnapshot) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(CatalogueEvent {
            reason,
            snapshot,
            timestamp: Utc::now(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogueEvent> {
        self.sender.subscribe()
    }
}

impl Default for CatalogueEventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
