//! Per-job status polling loops.
//!
//! Every polling job owns one tokio task. The task fetches immediately, then
//! once per interval, until it is torn down, sees a non-polling status, or
//! hits the consecutive error ceiling. Each handle carries a `stopped` flag;
//! results are only applied while holding that flag's lock, so once teardown
//! has returned no response for the handle can reach the catalogue.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use super::context::OrchestratorContext;
use crate::backend::{JobStatusRecord, RequestError};
use crate::broadcast::{ChangeReason, Notification};
use crate::error::OrchestratorError;
use crate::job::JobStatus;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);
pub const DEFAULT_MAX_POLL_ERRORS: u32 = 5;

/// Cadence and error ceiling for status polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_errors: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_errors: DEFAULT_MAX_POLL_ERRORS,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(g) => g,
        Err(poisoned) => {
            log::warn!("Poller lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

struct PollHandle {
    generation: u64,
    stopped: Arc<Mutex<bool>>,
    consecutive_errors: Arc<AtomicU32>,
    task: JoinHandle<()>,
}

impl PollHandle {
    fn cancel(self) {
        *lock(&self.stopped) = true;
        self.task.abort();
    }
}

type HandleArena = Arc<Mutex<HashMap<String, PollHandle>>>;

/// Arena of live poll handles keyed by job id.
pub(crate) struct StatusPoller {
    handles: HandleArena,
    ctx: Arc<OrchestratorContext>,
    settings: PollSettings,
    /// Receives the id of every job whose poller stopped on a final status.
    finished_tx: mpsc::UnboundedSender<String>,
    next_generation: AtomicU64,
}

impl StatusPoller {
    pub fn new(
        ctx: Arc<OrchestratorContext>,
        settings: PollSettings,
        finished_tx: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            handles: Arc::new(Mutex::new(HashMap::new())),
            ctx,
            settings,
            finished_tx,
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    /// Starts polling a known job in a polling status.
    ///
    /// Returns `false` without side effects if the job already has a live
    /// handle, is unknown, or is not in a polling status.
    pub fn start(&self, job_id: &str) -> bool {
        let Some(job) = self.ctx.catalogue.get(job_id) else {
            log::debug!("Not polling unknown job {}", job_id);
            return false;
        };
        if !job.status.should_poll() {
            return false;
        }

        let mut handles = lock(&self.handles);
        if handles.contains_key(job_id) {
            return false;
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let stopped = Arc::new(Mutex::new(false));
        let consecutive_errors = Arc::new(AtomicU32::new(0));

        let task = PollTask {
            job_id: job_id.to_string(),
            owner_id: job.owner_id,
            generation,
            stopped: Arc::clone(&stopped),
            consecutive_errors: Arc::clone(&consecutive_errors),
            ctx: Arc::clone(&self.ctx),
            handles: Arc::clone(&self.handles),
            settings: self.settings,
            finished_tx: self.finished_tx.clone(),
        };
        let span = tracing::info_span!("poller", job_id = %job_id);
        let task = tokio::spawn(task.run().instrument(span));

        handles.insert(
            job_id.to_string(),
            PollHandle {
                generation,
                stopped,
                consecutive_errors,
                task,
            },
        );
        log::debug!("Started polling job {}", job_id);
        true
    }

    /// Tears down the job's handle. Safe to call any number of times.
    ///
    /// Returns `true` if a live handle was stopped.
    pub fn stop(&self, job_id: &str) -> bool {
        let handle = lock(&self.handles).remove(job_id);
        match handle {
            Some(handle) => {
                handle.cancel();
                log::debug!("Stopped polling job {}", job_id);
                true
            }
            None => false,
        }
    }

    /// Tears down every handle. Returns how many were live.
    pub fn stop_all(&self) -> usize {
        let drained: Vec<PollHandle> = lock(&self.handles).drain().map(|(_, h)| h).collect();
        let count = drained.len();
        for handle in drained {
            handle.cancel();
        }
        if count > 0 {
            log::info!("Stopped {} poller(s)", count);
        }
        count
    }

    pub fn is_polling(&self, job_id: &str) -> bool {
        lock(&self.handles).contains_key(job_id)
    }

    pub fn polling_ids(&self) -> HashSet<String> {
        lock(&self.handles).keys().cloned().collect()
    }

    /// Consecutive failed fetches for a live handle.
    pub fn error_count(&self, job_id: &str) -> Option<u32> {
        lock(&self.handles)
            .get(job_id)
            .map(|h| h.consecutive_errors.load(Ordering::Relaxed))
    }
}

enum Step {
    Continue,
    Stop,
}

struct PollTask {
    job_id: String,
    owner_id: String,
    generation: u64,
    stopped: Arc<Mutex<bool>>,
    consecutive_errors: Arc<AtomicU32>,
    ctx: Arc<OrchestratorContext>,
    handles: HandleArena,
    settings: PollSettings,
    finished_tx: mpsc::UnboundedSender<String>,
}

impl PollTask {
    async fn run(self) {
        let period = self.settings.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // First tick completes immediately.
            ticker.tick().await;

            let attempt = self.consecutive_errors.load(Ordering::Relaxed) + 1;
            let result = self
                .ctx
                .backend
                .fetch_status(&self.job_id, &self.owner_id)
                .instrument(tracing::info_span!("poller.fetch", attempt))
                .await;

            let step = match result {
                Ok(record) => self.on_status(record),
                Err(e) => self.on_error(e),
            };
            if let Step::Stop = step {
                break;
            }
        }
    }

    fn on_status(&self, mut record: JobStatusRecord) -> Step {
        if record.id != self.job_id {
            if !record.id.is_empty() {
                log::warn!(
                    "Status response for job {} carried id {}, ignoring the id",
                    self.job_id,
                    record.id
                );
            }
            record.id = self.job_id.clone();
        }

        let merged = {
            let mut stopped = lock(&self.stopped);
            if *stopped {
                log::debug!("Dropping late status response for job {}", self.job_id);
                return Step::Stop;
            }
            self.consecutive_errors.store(0, Ordering::Relaxed);

            let merged = self.ctx.catalogue.merge_status(&record);
            let keep_polling = merged.as_ref().is_some_and(|j| j.status.should_poll());
            if !keep_polling {
                *stopped = true;
                self.release();
            }
            merged
        };

        let Some(job) = merged else {
            log::debug!("Job {} left the catalogue, stopping poller", self.job_id);
            return Step::Stop;
        };
        self.ctx.publish(ChangeReason::Polled(self.job_id.clone()));

        if job.status.should_poll() {
            return Step::Continue;
        }

        log::info!(
            "Job {} reached status {}, stopping poller",
            self.job_id,
            job.status
        );
        if self.finished_tx.send(self.job_id.clone()).is_err() {
            log::debug!("No reconcile listener active for job {}", self.job_id);
        }

        match job.status {
            JobStatus::Completed => self.ctx.notify(Notification::job_completed(&job)),
            status if status.is_error_class() => self.ctx.notify(Notification::job_failed(&job)),
            _ => {}
        }
        Step::Stop
    }

    fn on_error(&self, error: RequestError) -> Step {
        let ceiling = self.settings.max_errors.max(1);
        let attempts = {
            let mut stopped = lock(&self.stopped);
            if *stopped {
                return Step::Stop;
            }

            let attempts = self.consecutive_errors.fetch_add(1, Ordering::Relaxed) + 1;
            if attempts < ceiling {
                log::warn!(
                    "Status poll for job {} failed ({}/{}): {}",
                    self.job_id,
                    attempts,
                    ceiling,
                    error
                );
                return Step::Continue;
            }

            *stopped = true;
            self.release();
            attempts
        };

        let exhausted = OrchestratorError::PollExhausted {
            job_id: self.job_id.clone(),
            attempts,
        };
        log::error!("{} (last error: {})", exhausted, error);
        let title = self
            .ctx
            .catalogue
            .get(&self.job_id)
            .map(|j| j.title)
            .unwrap_or_else(|| self.job_id.clone());
        self.ctx
            .notify(Notification::polling_exhausted(&self.job_id, &title, attempts));
        Step::Stop
    }

    /// Removes this task's own handle, leaving any newer handle for the job alone.
    fn release(&self) {
        let mut handles = lock(&self.handles);
        if handles
            .get(&self.job_id)
            .is_some_and(|h| h.generation == self.generation)
        {
            handles.remove(&self.job_id);
        }
    }
}
