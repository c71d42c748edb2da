//! Job records, statuses and the status → bucket mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::{JobRecord, JobStatusRecord};

/// Status of a batch automation job as reported by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Paused,
    Completed,
    Failed,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Bucket this status is displayed under.
    pub fn bucket(self) -> Bucket {
        match self {
            JobStatus::Queued | JobStatus::Processing | JobStatus::Paused => Bucket::Active,
            JobStatus::Completed => Bucket::Completed,
            JobStatus::Failed | JobStatus::Error | JobStatus::Cancelled => Bucket::Inactive,
        }
    }

    /// Whether a job in this status has a live poll handle.
    ///
    /// `Paused` sits in the Active bucket but is never polled.
    pub fn should_poll(self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Processing)
    }

    pub fn is_error_class(self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display partition of the job catalogue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Active,
    Completed,
    Inactive,
}

/// What the backend runs over the folder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    Categorization,
    Analysis,
    CategorizationAndAnalysis,
}

impl ProcessType {
    pub fn requires_categories(self) -> bool {
        matches!(
            self,
            ProcessType::Categorization | ProcessType::CategorizationAndAnalysis
        )
    }

    pub fn requires_prompts(self) -> bool {
        matches!(
            self,
            ProcessType::Analysis | ProcessType::CategorizationAndAnalysis
        )
    }
}

impl std::fmt::Display for ProcessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessType::Categorization => write!(f, "Categorization"),
            ProcessType::Analysis => write!(f, "Analysis"),
            ProcessType::CategorizationAndAnalysis => write!(f, "Categorization & Analysis"),
        }
    }
}

/// One batch automation run tracked by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub folder_path: String,
    pub process_type: ProcessType,
    pub status: JobStatus,
    pub total_files: u32,
    pub successful_files: u32,
    pub failed_files: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Job {
    /// Builds a job from a full backend record.
    pub fn from_record(record: JobRecord) -> Self {
        let now = Utc::now();
        let created_at = record.created_at.unwrap_or(now);
        let mut job = Self {
            id: record.id,
            owner_id: record.user_id,
            title: record.title,
            folder_path: record.folder_path,
            process_type: record.process_type,
            status: record.status,
            total_files: record.total_files.unwrap_or(0),
            successful_files: record.completed_files,
            failed_files: record.failed_files,
            created_at,
            updated_at: record.updated_at.unwrap_or(created_at),
            error_message: record.error_message,
        };
        job.normalize();
        job
    }

    /// Builds a job the backend just accepted.
    ///
    /// Lifecycle endpoints only promise the status shape, so identity fields
    /// come from the submission.
    pub fn accepted(
        response: &JobStatusRecord,
        owner_id: &str,
        title: &str,
        folder_path: &str,
        process_type: ProcessType,
    ) -> Self {
        let now = Utc::now();
        let mut job = Self {
            id: response.id.clone(),
            owner_id: owner_id.to_string(),
            title: title.to_string(),
            folder_path: folder_path.to_string(),
            process_type,
            status: response.status,
            total_files: 0,
            successful_files: 0,
            failed_files: 0,
            created_at: now,
            updated_at: now,
            error_message: None,
        };
        job.apply_status(response);
        job
    }

    /// Merges a status response onto this job. Fields the backend leaves out are kept.
    pub fn apply_status(&mut self, update: &JobStatusRecord) {
        self.status = update.status;
        if let Some(total) = update.total_files {
            self.total_files = total;
        }
        if let Some(completed) = update.completed_files {
            self.successful_files = completed;
        }
        if let Some(failed) = update.failed_files {
            self.failed_files = failed;
        }
        self.error_message = update.error_message.clone();
        self.updated_at = update.updated_at.unwrap_or_else(Utc::now);
        self.normalize();
    }

    pub fn processed_files(&self) -> u32 {
        self.successful_files.saturating_add(self.failed_files)
    }

    /// Percentage of files processed, in `0.0..=100.0`.
    pub fn progress(&self) -> f64 {
        if self.total_files == 0 {
            return 0.0;
        }
        (f64::from(self.processed_files()) / f64::from(self.total_files) * 100.0).min(100.0)
    }

    pub fn bucket(&self) -> Bucket {
        self.status.bucket()
    }

    fn normalize(&mut self) {
        let processed = self.processed_files();
        if processed > self.total_files {
            log::warn!(
                "Job {} reports {} processed files but only {} total, raising total",
                self.id,
                processed,
                self.total_files
            );
            self.total_files = processed;
        }
        if !self.status.is_error_class() {
            self.error_message = None;
        }
    }
}
