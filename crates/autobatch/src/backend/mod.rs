//! Job-execution backend interface and wire types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::{JobStatus, ProcessType};

pub mod error;
pub mod http;

pub use error::RequestError;
pub use http::HttpBackend;

/// Full job record as returned by the list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    pub id: String,
    #[serde(default, alias = "owner_id")]
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub folder_path: String,
    pub process_type: ProcessType,
    pub status: JobStatus,
    #[serde(default)]
    pub total_files: Option<u32>,
    #[serde(default)]
    pub completed_files: u32,
    #[serde(default)]
    pub failed_files: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Status/progress response for a single job.
///
/// Also the minimum the create, clone and status-change endpoints promise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatusRecord {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub total_files: Option<u32>,
    #[serde(default)]
    pub completed_files: Option<u32>,
    #[serde(default)]
    pub failed_files: Option<u32>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Status change requested through the lifecycle controller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StatusAction {
    Cancel,
    Pause,
    /// Resume a paused job by putting it back in the queue.
    Queue,
}

impl StatusAction {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusAction::Cancel => "cancel",
            StatusAction::Pause => "pause",
            StatusAction::Queue => "queue",
        }
    }

    /// Whether the job keeps a poll handle once the action succeeds.
    pub fn keeps_polling(self) -> bool {
        matches!(self, StatusAction::Queue)
    }
}

impl std::fmt::Display for StatusAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateJobRequest {
    pub title: String,
    pub folder_path: String,
    pub process_type: ProcessType,
    pub user_id: String,
    pub selected_prompts: Vec<String>,
    pub selected_categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CloneJobRequest {
    #[serde(skip)]
    pub source_job_id: String,
    pub title: String,
    pub process_type: ProcessType,
    pub user_id: String,
    pub selected_prompts: Vec<String>,
    pub selected_categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusUpdateRequest {
    #[serde(skip)]
    pub job_id: String,
    pub action: StatusAction,
    pub user_id: String,
}

/// REST-style job-execution backend.
///
/// Every call carries the owner identity. Implementations must be safe to
/// call concurrently from many poll tasks.
#[async_trait]
pub trait JobBackend: Send + Sync {
    async fn list_jobs(&self, owner_id: &str) -> Result<Vec<JobRecord>, RequestError>;

    async fn fetch_status(
        &self,
        job_id: &str,
        owner_id: &str,
    ) -> Result<JobStatusRecord, RequestError>;

    async fn create_job(
        &self,
        request: &CreateJobRequest,
    ) -> Result<JobStatusRecord, RequestError>;

    async fn clone_job(
        &self,
        request: &CloneJobRequest,
    ) -> Result<JobStatusRecord, RequestError>;

    async fn update_status(
        &self,
        request: &StatusUpdateRequest,
    ) -> Result<JobStatusRecord, RequestError>;

    async fn delete_job(&self, job_id: &str, owner_id: &str) -> Result<(), RequestError>;
}
