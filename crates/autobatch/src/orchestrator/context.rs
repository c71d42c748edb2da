//! State shared by the poller, the reconciler and the lifecycle controller.

use std::sync::{Arc, Mutex};

use crate::backend::{JobBackend, JobRecord};
use crate::broadcast::{
    CatalogueEventBroadcaster, ChangeReason, Notification, NotificationSink, Severity,
};
use crate::job::{Job, JobCatalogue};
use crate::storage::ActiveJobSnapshot;

pub(crate) struct OrchestratorContext {
    pub backend: Arc<dyn JobBackend>,
    pub catalogue: JobCatalogue,
    pub snapshot: ActiveJobSnapshot,
    pub notifier: Arc<dyn NotificationSink>,
    pub events: CatalogueEventBroadcaster,
    /// Serializes snapshot + persist + broadcast so a slower publisher
    /// cannot overwrite a newer snapshot with an older one.
    publish_lock: Mutex<()>,
}

impl OrchestratorContext {
    pub fn new(
        backend: Arc<dyn JobBackend>,
        snapshot: ActiveJobSnapshot,
        notifier: Arc<dyn NotificationSink>,
        events: CatalogueEventBroadcaster,
    ) -> Self {
        Self {
            backend,
            catalogue: JobCatalogue::new(),
            snapshot,
            notifier,
            events,
            publish_lock: Mutex::new(()),
        }
    }

    /// Persists the Active bucket and tells subscribers the catalogue changed.
    pub fn publish(&self, reason: ChangeReason) {
        let _guard = match self.publish_lock.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };

        let snapshot = self.catalogue.buckets();
        if let Err(e) = self.snapshot.sync(&snapshot.active) {
            log::error!("Failed to persist active job snapshot: {}", e);
        }
        self.events.send(reason, snapshot);
    }

    pub fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Error => log::warn!("{}: {}", notification.title, notification.description),
            Severity::Success => log::info!("{}: {}", notification.title, notification.description),
        }
        self.notifier.notify(notification);
    }
}

/// Converts a backend record, filling in the session owner when the backend omits it.
pub(crate) fn owned_job(record: JobRecord, owner_id: &str) -> Job {
    let mut job = Job::from_record(record);
    if job.owner_id.is_empty() {
        job.owner_id = owner_id.to_string();
    }
    job
}
