//! User-facing outcome notifications.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::backend::StatusAction;
use crate::job::Job;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
}

/// Which outcome a notification reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    JobCreated,
    JobCreateFailed,
    JobCloned,
    JobCloneFailed,
    StatusUpdated,
    StatusUpdateFailed,
    JobDeleted,
    JobDeleteFailed,
    JobCompleted,
    JobFailed,
    PollingExhausted,
}

/// A `{title, description, severity}` message for the notification sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    fn new(
        kind: NotificationKind,
        severity: Severity,
        title: &str,
        description: String,
        job_id: Option<&str>,
    ) -> Self {
        Self {
            kind,
            title: title.to_string(),
            description,
            severity,
            job_id: job_id.map(|s| s.to_string()),
            timestamp: Utc::now(),
        }
    }

    pub fn job_created(job: &Job) -> Self {
        Self::new(
            NotificationKind::JobCreated,
            Severity::Success,
            "Job created",
            format!(
                "'{}' was queued for {} of {}",
                job.title, job.process_type, job.folder_path
            ),
            Some(&job.id),
        )
    }

    pub fn job_create_failed(title: &str, error: &str) -> Self {
        Self::new(
            NotificationKind::JobCreateFailed,
            Severity::Error,
            "Failed to create job",
            format!("'{}' could not be created: {}", title, error),
            None,
        )
    }

    pub fn job_cloned(job: &Job, source_title: &str) -> Self {
        Self::new(
            NotificationKind::JobCloned,
            Severity::Success,
            "Job cloned",
            format!(
                "'{}' was cloned from '{}' as {}",
                job.title, source_title, job.process_type
            ),
            Some(&job.id),
        )
    }

    pub fn job_clone_failed(source_job_id: &str, error: &str) -> Self {
        Self::new(
            NotificationKind::JobCloneFailed,
            Severity::Error,
            "Failed to clone job",
            error.to_string(),
            Some(source_job_id),
        )
    }

    pub fn status_updated(job: &Job, action: StatusAction) -> Self {
        let verb = match action {
            StatusAction::Cancel => "cancelled",
            StatusAction::Pause => "paused",
            StatusAction::Queue => "resumed",
        };
        Self::new(
            NotificationKind::StatusUpdated,
            Severity::Success,
            "Job updated",
            format!("'{}' was {}", job.title, verb),
            Some(&job.id),
        )
    }

    pub fn status_update_failed(job_id: &str, action: StatusAction, error: &str) -> Self {
        Self::new(
            NotificationKind::StatusUpdateFailed,
            Severity::Error,
            "Failed to update job",
            format!("Could not {} job: {}", action, error),
            Some(job_id),
        )
    }

    pub fn job_deleted(job_id: &str, title: Option<&str>) -> Self {
        let description = match title {
            Some(title) => format!("'{}' was deleted", title),
            None => format!("Job {} was deleted", job_id),
        };
        Self::new(
            NotificationKind::JobDeleted,
            Severity::Success,
            "Job deleted",
            description,
            Some(job_id),
        )
    }

    pub fn job_delete_failed(job_id: &str, error: &str) -> Self {
        Self::new(
            NotificationKind::JobDeleteFailed,
            Severity::Error,
            "Failed to delete job",
            error.to_string(),
            Some(job_id),
        )
    }

    /// Terminal `completed` transition observed by a poller.
    pub fn job_completed(job: &Job) -> Self {
        let mut description = format!(
            "'{}' finished: {} file(s) processed successfully",
            job.title, job.successful_files
        );
        if job.failed_files > 0 {
            description.push_str(&format!(", {} failed", job.failed_files));
        }
        Self::new(
            NotificationKind::JobCompleted,
            Severity::Success,
            "Job completed",
            description,
            Some(&job.id),
        )
    }

    /// Terminal `failed`/`error` transition observed by a poller.
    pub fn job_failed(job: &Job) -> Self {
        let reason = job
            .error_message
            .as_deref()
            .unwrap_or("the backend reported an error");
        Self::new(
            NotificationKind::JobFailed,
            Severity::Error,
            "Job failed",
            format!("'{}' stopped with status {}: {}", job.title, job.status, reason),
            Some(&job.id),
        )
    }

    pub fn polling_exhausted(job_id: &str, title: &str, attempts: u32) -> Self {
        Self::new(
            NotificationKind::PollingExhausted,
            Severity::Error,
            "Lost track of job",
            format!(
                "Could not get updates for '{}' after {} attempts",
                title, attempts
            ),
            Some(job_id),
        )
    }
}

/// External collaborator that surfaces notifications to the user.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Broadcasts notifications to any number of subscribers.
#[derive(Clone)]
pub struct NotificationBroadcaster {
    sender: Arc<broadcast::Sender<Notification>>,
}

impl NotificationBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, notification: Notification) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(notification);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Default for NotificationBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

impl NotificationSink for NotificationBroadcaster {
    fn notify(&self, notification: Notification) {
        self.send(notification);
    }
}
