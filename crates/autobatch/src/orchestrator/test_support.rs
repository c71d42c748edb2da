use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use super::context::OrchestratorContext;
use crate::backend::{
    CloneJobRequest, CreateJobRequest, JobBackend, JobRecord, JobStatusRecord, RequestError,
    StatusUpdateRequest,
};
use crate::broadcast::{CatalogueEventBroadcaster, NotificationBroadcaster};
use crate::job::{Job, JobStatus, ProcessType};
use crate::storage::{ActiveJobSnapshot, SqliteStore};

/// Backend stub: status polls answer with a settable status, list returns `jobs`.
pub(crate) struct StubBackend {
    pub jobs: Mutex<Vec<JobRecord>>,
    status: Mutex<JobStatus>,
    failing: AtomicBool,
    fetches: AtomicU32,
}

impl Default for StubBackend {
    fn default() -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            status: Mutex::new(JobStatus::Processing),
            failing: AtomicBool::new(false),
            fetches: AtomicU32::new(0),
        }
    }
}

impl StubBackend {
    pub fn set_status(&self, status: JobStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobBackend for StubBackend {
    async fn list_jobs(&self, _owner_id: &str) -> Result<Vec<JobRecord>, RequestError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RequestError::Client("offline".to_string()));
        }
        Ok(self.jobs.lock().unwrap().clone())
    }

    async fn fetch_status(
        &self,
        job_id: &str,
        _owner_id: &str,
    ) -> Result<JobStatusRecord, RequestError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RequestError::Client("offline".to_string()));
        }
        Ok(JobStatusRecord {
            id: job_id.to_string(),
            status: *self.status.lock().unwrap(),
            total_files: Some(10),
            completed_files: Some(1),
            failed_files: Some(0),
            error_message: None,
            updated_at: None,
        })
    }

    async fn create_job(
        &self,
        _request: &CreateJobRequest,
    ) -> Result<JobStatusRecord, RequestError> {
        Err(RequestError::Client("unsupported".to_string()))
    }

    async fn clone_job(
        &self,
        _request: &CloneJobRequest,
    ) -> Result<JobStatusRecord, RequestError> {
        Err(RequestError::Client("unsupported".to_string()))
    }

    async fn update_status(
        &self,
        _request: &StatusUpdateRequest,
    ) -> Result<JobStatusRecord, RequestError> {
        Err(RequestError::Client("unsupported".to_string()))
    }

    async fn delete_job(&self, _job_id: &str, _owner_id: &str) -> Result<(), RequestError> {
        Ok(())
    }
}

pub(crate) fn job(id: &str, status: JobStatus) -> Job {
    Job {
        id: id.to_string(),
        owner_id: "owner".to_string(),
        title: format!("Job {}", id),
        folder_path: "/scans".to_string(),
        process_type: ProcessType::Categorization,
        status,
        total_files: 0,
        successful_files: 0,
        failed_files: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        error_message: None,
    }
}

pub(crate) fn record(id: &str, status: JobStatus) -> JobRecord {
    JobRecord {
        id: id.to_string(),
        user_id: "owner".to_string(),
        title: format!("Job {}", id),
        folder_path: "/scans".to_string(),
        process_type: ProcessType::Categorization,
        status,
        total_files: Some(0),
        completed_files: 0,
        failed_files: 0,
        created_at: None,
        updated_at: None,
        error_message: None,
    }
}

pub(crate) fn context(backend: Arc<StubBackend>) -> Arc<OrchestratorContext> {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    Arc::new(OrchestratorContext::new(
        backend,
        ActiveJobSnapshot::new(store, "active"),
        Arc::new(NotificationBroadcaster::default()),
        CatalogueEventBroadcaster::default(),
    ))
}
