//! Full refresh and poller reconciliation.
//!
//! A refresh replaces the catalogue with the backend's list, then aligns the
//! poll handles with it: every job in a polling status without a handle gets
//! one, every handle whose job no longer polls is torn down.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use super::context::{owned_job, OrchestratorContext};
use super::poller::StatusPoller;
use crate::broadcast::ChangeReason;
use crate::error::Result;

/// Handles started and stopped by one reconciliation.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub started: Vec<String>,
    pub stopped: Vec<String>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.started.is_empty() && self.stopped.is_empty()
    }
}

pub(crate) struct Reconciler {
    ctx: Arc<OrchestratorContext>,
    poller: Arc<StatusPoller>,
    /// Serializes refreshes so an older list never overwrites a newer one.
    refresh_lock: Mutex<()>,
}

impl Reconciler {
    pub fn new(ctx: Arc<OrchestratorContext>, poller: Arc<StatusPoller>) -> Self {
        Self {
            ctx,
            poller,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Fetches the owner's jobs, replaces the catalogue and reconciles pollers.
    ///
    /// On failure the catalogue and the handles are left untouched.
    pub async fn refresh(&self, owner_id: &str) -> Result<ReconcileReport> {
        let _guard = self.refresh_lock.lock().await;

        let records = self.ctx.backend.list_jobs(owner_id).await?;
        let jobs: Vec<_> = records
            .into_iter()
            .map(|record| owned_job(record, owner_id))
            .collect();
        let count = jobs.len();

        self.ctx.catalogue.replace_all(jobs);
        let report = self.reconcile();
        self.ctx.publish(ChangeReason::Refreshed);

        log::info!(
            "Refreshed {} job(s): {} poller(s) started, {} stopped",
            count,
            report.started.len(),
            report.stopped.len()
        );
        Ok(report)
    }

    /// Aligns live handles with the catalogue without contacting the backend.
    pub fn reconcile(&self) -> ReconcileReport {
        let wanted = self.ctx.catalogue.polling_ids();
        let live = self.poller.polling_ids();

        let mut stopped: Vec<String> = live.difference(&wanted).cloned().collect();
        stopped.sort();
        for job_id in &stopped {
            self.poller.stop(job_id);
        }

        let mut started: Vec<String> = wanted
            .difference(&live)
            .filter(|job_id| self.poller.start(job_id))
            .cloned()
            .collect();
        started.sort();

        ReconcileReport { started, stopped }
    }
}
