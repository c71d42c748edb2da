//! Scriptable in-memory job backend.
//!
//! Keeps an authoritative job table, answers status polls from scripted
//! responses (falling back to the stored record), and can inject failures
//! or hold a call until the test releases it. Lifecycle calls answer with
//! the bare status shape, never the full record.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use tokio::sync::Notify;

use autobatch::backend::{CloneJobRequest, CreateJobRequest, StatusUpdateRequest};
use autobatch::{
    JobBackend, JobRecord, JobStatus, JobStatusRecord, ProcessType, RequestError, StatusAction,
};

/// Backend call kinds, for counters, failures and gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Status,
    Create,
    Clone,
    UpdateStatus,
    Delete,
}

#[derive(Default)]
struct State {
    jobs: BTreeMap<String, JobRecord>,
    status_script: HashMap<String, VecDeque<Result<JobStatusRecord, RequestError>>>,
    failing_status: bool,
    fail_next: HashMap<Op, RequestError>,
    op_gates: HashMap<Op, Arc<Notify>>,
    status_gates: HashMap<String, Arc<Notify>>,
    calls: HashMap<Op, u32>,
    status_calls: HashMap<String, u32>,
    next_id: u32,
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<State>,
}

pub fn status_record(
    job_id: &str,
    status: JobStatus,
    total: u32,
    completed: u32,
    failed: u32,
) -> JobStatusRecord {
    JobStatusRecord {
        id: job_id.to_string(),
        status,
        total_files: Some(total),
        completed_files: Some(completed),
        failed_files: Some(failed),
        error_message: None,
        updated_at: None,
    }
}

pub fn server_error() -> RequestError {
    RequestError::Status {
        url: "http://backend.test/batch-automation".to_string(),
        status: 503,
        body: "unavailable".to_string(),
    }
}

/// The minimal shape lifecycle endpoints answer with.
fn status_of(job: &JobRecord) -> JobStatusRecord {
    JobStatusRecord {
        id: job.id.clone(),
        status: job.status,
        total_files: job.total_files,
        completed_files: Some(job.completed_files),
        failed_files: Some(job.failed_files),
        error_message: job.error_message.clone(),
        updated_at: job.updated_at,
    }
}

fn not_found(job_id: &str) -> RequestError {
    RequestError::Status {
        url: format!("http://backend.test/batch-automation/jobs/{}", job_id),
        status: 404,
        body: "job not found".to_string(),
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Adds a job record the backend will list and answer polls for.
    pub fn insert(&self, record: JobRecord) {
        self.state().jobs.insert(record.id.clone(), record);
    }

    pub fn record(&self, job_id: &str) -> Option<JobRecord> {
        self.state().jobs.get(job_id).cloned()
    }

    /// Queues status responses for a job, answered in order.
    pub fn script_status(
        &self,
        job_id: &str,
        responses: Vec<Result<JobStatusRecord, RequestError>>,
    ) {
        self.state()
            .status_script
            .entry(job_id.to_string())
            .or_default()
            .extend(responses);
    }

    /// Every unscripted status poll fails while set.
    pub fn set_status_failing(&self, failing: bool) {
        self.state().failing_status = failing;
    }

    /// The next call of this kind fails with `error`.
    pub fn fail_next(&self, op: Op, error: RequestError) {
        self.state().fail_next.insert(op, error);
    }

    /// The next call of this kind waits until the returned `Notify` fires.
    pub fn hold(&self, op: Op) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state().op_gates.insert(op, Arc::clone(&gate));
        gate
    }

    /// The next status poll for the job waits until the returned `Notify` fires.
    pub fn hold_status(&self, job_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state()
            .status_gates
            .insert(job_id.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn calls(&self, op: Op) -> u32 {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn status_calls(&self, job_id: &str) -> u32 {
        self.state().status_calls.get(job_id).copied().unwrap_or(0)
    }

    /// Counts the call, waits on any gate, then returns an injected failure if one is set.
    async fn enter(&self, op: Op) -> Result<(), RequestError> {
        let gate = {
            let mut state = self.state();
            *state.calls.entry(op).or_insert(0) += 1;
            state.op_gates.remove(&op)
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.state().fail_next.remove(&op) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn new_record(
        &self,
        title: &str,
        folder_path: &str,
        process_type: ProcessType,
        owner_id: &str,
    ) -> JobRecord {
        let mut state = self.state();
        state.next_id += 1;
        let id = format!("job-{}", state.next_id);
        let created_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
            + Duration::minutes(i64::from(state.next_id));
        let record = JobRecord {
            id: id.clone(),
            user_id: owner_id.to_string(),
            title: title.to_string(),
            folder_path: folder_path.to_string(),
            process_type,
            status: JobStatus::Queued,
            total_files: None,
            completed_files: 0,
            failed_files: 0,
            created_at: Some(created_at),
            updated_at: Some(created_at),
            error_message: None,
        };
        state.jobs.insert(id, record.clone());
        record
    }
}

#[async_trait]
impl JobBackend for FakeBackend {
    async fn list_jobs(&self, owner_id: &str) -> Result<Vec<JobRecord>, RequestError> {
        self.enter(Op::List).await?;
        Ok(self
            .state()
            .jobs
            .values()
            .filter(|job| job.user_id == owner_id)
            .cloned()
            .collect())
    }

    async fn fetch_status(
        &self,
        job_id: &str,
        _owner_id: &str,
    ) -> Result<JobStatusRecord, RequestError> {
        let gate = {
            let mut state = self.state();
            *state.calls.entry(Op::Status).or_insert(0) += 1;
            *state.status_calls.entry(job_id.to_string()).or_insert(0) += 1;
            state.status_gates.remove(job_id)
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state();
        let scripted = state
            .status_script
            .get_mut(job_id)
            .and_then(|queue| queue.pop_front());
        let response = match scripted {
            Some(response) => response,
            None if state.failing_status => Err(server_error()),
            None => match state.jobs.get(job_id) {
                Some(job) => Ok(status_of(job)),
                None => Err(not_found(job_id)),
            },
        };

        // Scripted progress becomes the backend's truth for later listings.
        if let Ok(update) = &response {
            if let Some(job) = state.jobs.get_mut(job_id) {
                job.status = update.status;
                if update.total_files.is_some() {
                    job.total_files = update.total_files;
                }
                if let Some(completed) = update.completed_files {
                    job.completed_files = completed;
                }
                if let Some(failed) = update.failed_files {
                    job.failed_files = failed;
                }
                job.error_message = update.error_message.clone();
            }
        }
        response
    }

    async fn create_job(
        &self,
        request: &CreateJobRequest,
    ) -> Result<JobStatusRecord, RequestError> {
        self.enter(Op::Create).await?;
        let record = self.new_record(
            &request.title,
            &request.folder_path,
            request.process_type,
            &request.user_id,
        );
        Ok(status_of(&record))
    }

    async fn clone_job(
        &self,
        request: &CloneJobRequest,
    ) -> Result<JobStatusRecord, RequestError> {
        self.enter(Op::Clone).await?;
        let folder_path = match self.state().jobs.get(&request.source_job_id) {
            Some(source) => source.folder_path.clone(),
            None => return Err(not_found(&request.source_job_id)),
        };
        let record = self.new_record(
            &request.title,
            &folder_path,
            request.process_type,
            &request.user_id,
        );
        Ok(status_of(&record))
    }

    async fn update_status(
        &self,
        request: &StatusUpdateRequest,
    ) -> Result<JobStatusRecord, RequestError> {
        self.enter(Op::UpdateStatus).await?;
        let mut state = self.state();
        let job = state
            .jobs
            .get_mut(&request.job_id)
            .ok_or_else(|| not_found(&request.job_id))?;
        job.status = match request.action {
            StatusAction::Cancel => JobStatus::Cancelled,
            StatusAction::Pause => JobStatus::Paused,
            StatusAction::Queue => JobStatus::Queued,
        };
        Ok(status_of(job))
    }

    async fn delete_job(&self, job_id: &str, _owner_id: &str) -> Result<(), RequestError> {
        self.enter(Op::Delete).await?;
        match self.state().jobs.remove(job_id) {
            Some(_) => Ok(()),
            None => Err(not_found(job_id)),
        }
    }
}
