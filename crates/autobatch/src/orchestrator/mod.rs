//! Job orchestration: catalogue, pollers, reconciliation and lifecycle operations.
//!
//! An [`Orchestrator`] owns one catalogue, one arena of poll handles and a
//! background listener that runs a full refresh whenever a poller observes a
//! final status. Cloning is cheap; the last clone to drop tears every poller down.

mod context;
mod guard;
mod lifecycle;
pub mod poller;
pub mod reconciler;
#[cfg(test)]
mod test_support;

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::backend::{HttpBackend, JobBackend};
use crate::broadcast::{CatalogueEvent, CatalogueEventBroadcaster, ChangeReason, NotificationSink};
use crate::config::{OrchestratorConfig, DEFAULT_SNAPSHOT_KEY};
use crate::error::{OrchestratorError, Result};
use crate::job::{BucketSnapshot, Job};
use crate::storage::{ActiveJobSnapshot, LocalStore, SqliteStore};

use context::OrchestratorContext;
use guard::InFlight;
use poller::StatusPoller;
use reconciler::Reconciler;

pub use lifecycle::{CloneSpec, NewJob};
pub use poller::{PollSettings, DEFAULT_MAX_POLL_ERRORS, DEFAULT_POLL_INTERVAL};
pub use reconciler::ReconcileReport;

/// Construction options for [`Orchestrator::new`].
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Session owner used by refresh, clone and delete.
    pub owner_id: Option<String>,
    pub poll: PollSettings,
    pub snapshot_key: String,
    pub event_capacity: usize,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            owner_id: None,
            poll: PollSettings::default(),
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
            event_capacity: 100,
        }
    }
}

impl From<&OrchestratorConfig> for OrchestratorOptions {
    fn from(config: &OrchestratorConfig) -> Self {
        Self {
            owner_id: config.owner_id.clone(),
            poll: PollSettings {
                interval: config.poll_interval(),
                max_errors: config.max_poll_errors,
            },
            snapshot_key: config.snapshot_key.clone(),
            event_capacity: config.notification_capacity,
        }
    }
}

struct Inner {
    owner_id: Option<String>,
    ctx: Arc<OrchestratorContext>,
    poller: Arc<StatusPoller>,
    reconciler: Reconciler,
    in_flight: InFlight,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn listener(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.listener.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Full refresh after a confirmed change; falls back to a local reconcile.
    async fn refresh_after(&self, owner_id: &str) {
        if let Err(e) = self.reconciler.refresh(owner_id).await {
            log::warn!("Refresh after job change failed, reconciling locally: {}", e);
            self.reconciler.reconcile();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.poller.stop_all();
        if let Some(listener) = self.listener().take() {
            listener.abort();
        }
    }
}

/// Handle to a running orchestrator.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    /// Wires an orchestrator around the given collaborators.
    ///
    /// Must be called from within a tokio runtime: the reconcile listener is
    /// spawned immediately.
    pub fn new(
        backend: Arc<dyn JobBackend>,
        store: Arc<dyn LocalStore>,
        notifier: Arc<dyn NotificationSink>,
        options: OrchestratorOptions,
    ) -> Self {
        let ctx = Arc::new(OrchestratorContext::new(
            backend,
            ActiveJobSnapshot::new(store, options.snapshot_key),
            notifier,
            CatalogueEventBroadcaster::new(options.event_capacity.max(1)),
        ));

        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        let poller = Arc::new(StatusPoller::new(
            Arc::clone(&ctx),
            options.poll,
            finished_tx,
        ));
        let reconciler = Reconciler::new(Arc::clone(&ctx), Arc::clone(&poller));

        let inner = Arc::new(Inner {
            owner_id: options.owner_id.filter(|owner| !owner.trim().is_empty()),
            ctx,
            poller,
            reconciler,
            in_flight: InFlight::default(),
            listener: Mutex::new(None),
        });

        let listener = tokio::spawn(run_reconcile_listener(Arc::downgrade(&inner), finished_rx));
        *inner.listener() = Some(listener);

        Self { inner }
    }

    /// HTTP backend and SQLite store built from the config file.
    pub fn from_config(
        config: &OrchestratorConfig,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        let backend = HttpBackend::from_config(config)?;
        let store = SqliteStore::open(&config.storage_path)?;
        Ok(Self::new(
            Arc::new(backend),
            Arc::new(store),
            notifier,
            OrchestratorOptions::from(config),
        ))
    }

    /// Seeds the catalogue from the persisted Active snapshot and starts
    /// pollers for restored jobs that are still queued or processing.
    ///
    /// Jobs already in the catalogue win over the snapshot.
    pub fn restore(&self) -> Result<usize> {
        let ctx = &self.inner.ctx;
        let jobs = ctx.snapshot.load()?;

        let mut restored = 0;
        for job in jobs {
            if !ctx.catalogue.contains(&job.id) {
                ctx.catalogue.upsert(job);
                restored += 1;
            }
        }
        if restored > 0 {
            let report = self.inner.reconciler.reconcile();
            log::info!(
                "Restored {} active job(s) from local snapshot, {} poller(s) started",
                restored,
                report.started.len()
            );
            ctx.publish(ChangeReason::Restored);
        }
        Ok(restored)
    }

    /// Restores the local snapshot, then runs the first authoritative refresh.
    ///
    /// If that refresh fails, restored jobs keep polling and the first final
    /// status they report triggers another refresh.
    pub async fn start(&self) -> Result<ReconcileReport> {
        if let Err(e) = self.restore() {
            log::warn!("Could not restore active job snapshot: {}", e);
        }
        self.refresh().await
    }

    /// Replaces the catalogue with the backend's list and reconciles pollers.
    pub async fn refresh(&self) -> Result<ReconcileReport> {
        let owner_id = self.session_owner()?;
        self.inner.reconciler.refresh(&owner_id).await
    }

    fn session_owner(&self) -> Result<String> {
        self.inner
            .owner_id
            .clone()
            .ok_or(OrchestratorError::AuthenticationRequired)
    }

    pub fn buckets(&self) -> BucketSnapshot {
        self.inner.ctx.catalogue.buckets()
    }

    pub fn job(&self, job_id: &str) -> Option<Job> {
        self.inner.ctx.catalogue.get(job_id)
    }

    /// Job ids with a lifecycle operation in flight.
    pub fn loading_job_ids(&self) -> Vec<String> {
        self.inner.in_flight.job_ids()
    }

    pub fn is_polling(&self, job_id: &str) -> bool {
        self.inner.poller.is_polling(job_id)
    }

    pub fn polling_job_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.poller.polling_ids().into_iter().collect();
        ids.sort();
        ids
    }

    pub fn poll_error_count(&self, job_id: &str) -> Option<u32> {
        self.inner.poller.error_count(job_id)
    }

    pub fn poll_settings(&self) -> PollSettings {
        self.inner.poller.settings()
    }

    /// Receives a bucket snapshot after every catalogue change.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<CatalogueEvent> {
        self.inner.ctx.events.subscribe()
    }

    /// Tears down every poll handle and the reconcile listener.
    ///
    /// The catalogue stays readable. Returns how many pollers were live.
    pub fn shutdown(&self) -> usize {
        if let Some(listener) = self.inner.listener().take() {
            listener.abort();
        }
        let stopped = self.inner.poller.stop_all();
        log::info!("Orchestrator shut down, {} poller(s) stopped", stopped);
        stopped
    }
}

/// Runs a full refresh each time a poller reports a final status.
async fn run_reconcile_listener(inner: Weak<Inner>, mut finished: mpsc::UnboundedReceiver<String>) {
    while let Some(job_id) = finished.recv().await {
        // Several jobs finishing together need one refresh.
        while finished.try_recv().is_ok() {}

        let Some(inner) = inner.upgrade() else {
            break;
        };
        let owner_id = inner.owner_id.clone().or_else(|| {
            inner
                .ctx
                .catalogue
                .get(&job_id)
                .map(|job| job.owner_id)
        });

        match owner_id {
            Some(owner_id) => inner.refresh_after(&owner_id).await,
            None => {
                inner.reconciler.reconcile();
            }
        }
    }
    log::debug!("Reconcile listener stopped");
}
