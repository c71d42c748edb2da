//! Create, clone, status-change and delete operations.
//!
//! Every operation asks the backend first and touches the catalogue only
//! after the backend confirmed the change.

use serde::{Deserialize, Serialize};

use super::guard::OperationTarget;
use super::Orchestrator;
use crate::backend::{CloneJobRequest, CreateJobRequest, StatusAction, StatusUpdateRequest};
use crate::broadcast::{ChangeReason, Notification};
use crate::error::{OrchestratorError, Result};
use crate::job::{Job, ProcessType};

/// Parameters for [`Orchestrator::create_job`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub title: String,
    pub folder_path: String,
    pub process_type: ProcessType,
    pub owner_id: String,
    #[serde(default)]
    pub selected_prompts: Vec<String>,
    #[serde(default)]
    pub selected_categories: Vec<String>,
}

/// Parameters for [`Orchestrator::clone_job`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloneSpec {
    pub title: String,
    pub source_job_id: String,
    pub process_type: ProcessType,
    #[serde(default)]
    pub selected_prompts: Vec<String>,
    #[serde(default)]
    pub selected_categories: Vec<String>,
}

fn require_owner(owner_id: &str) -> Result<&str> {
    let owner_id = owner_id.trim();
    if owner_id.is_empty() {
        return Err(OrchestratorError::AuthenticationRequired);
    }
    Ok(owner_id)
}

fn validate_selection(
    process_type: ProcessType,
    prompts: &[String],
    categories: &[String],
) -> Result<()> {
    if process_type.requires_prompts() && prompts.is_empty() {
        return Err(OrchestratorError::validation(format!(
            "{} requires at least one prompt",
            process_type
        )));
    }
    if process_type.requires_categories() && categories.is_empty() {
        return Err(OrchestratorError::validation(format!(
            "{} requires at least one category",
            process_type
        )));
    }
    Ok(())
}

impl Orchestrator {
    /// Submits a new job.
    ///
    /// On success the job is inserted, the catalogue is refreshed (which
    /// starts its poller) and a creation notification is emitted.
    pub async fn create_job(&self, new_job: NewJob) -> Result<Job> {
        let owner_id = require_owner(&new_job.owner_id)?.to_string();
        let title = new_job.title.trim().to_string();
        let folder_path = new_job.folder_path.trim().to_string();
        if title.is_empty() {
            return Err(OrchestratorError::validation("Job title is required"));
        }
        if folder_path.is_empty() {
            return Err(OrchestratorError::validation("Folder path is required"));
        }
        validate_selection(
            new_job.process_type,
            &new_job.selected_prompts,
            &new_job.selected_categories,
        )?;

        let _guard = self
            .inner
            .in_flight
            .acquire(OperationTarget::NewJob(folder_path.clone()))?;

        let request = CreateJobRequest {
            title: title.clone(),
            folder_path,
            process_type: new_job.process_type,
            user_id: owner_id.clone(),
            selected_prompts: new_job.selected_prompts,
            selected_categories: new_job.selected_categories,
        };

        let ctx = &self.inner.ctx;
        let response = match ctx.backend.create_job(&request).await {
            Ok(response) => response,
            Err(e) => {
                ctx.notify(Notification::job_create_failed(&title, &e.to_string()));
                return Err(e.into());
            }
        };

        let job = Job::accepted(
            &response,
            &owner_id,
            &request.title,
            &request.folder_path,
            request.process_type,
        );
        log::info!("Created job {} ('{}')", job.id, job.title);
        ctx.catalogue.upsert(job.clone());
        ctx.publish(ChangeReason::Lifecycle(job.id.clone()));
        self.inner.refresh_after(&owner_id).await;

        ctx.notify(Notification::job_created(&job));
        Ok(ctx.catalogue.get(&job.id).unwrap_or(job))
    }

    /// Submits a copy of an existing job under a different process type.
    ///
    /// The source job is left untouched.
    pub async fn clone_job(&self, spec: CloneSpec) -> Result<Job> {
        let owner_id = self.session_owner()?;
        let ctx = &self.inner.ctx;

        let source = ctx
            .catalogue
            .get(&spec.source_job_id)
            .ok_or_else(|| OrchestratorError::UnknownJob(spec.source_job_id.clone()))?;

        let title = spec.title.trim().to_string();
        if title.is_empty() {
            return Err(OrchestratorError::validation("Job title is required"));
        }
        if spec.process_type == source.process_type {
            return Err(OrchestratorError::validation(format!(
                "A clone must use a different process type than its source ({})",
                source.process_type
            )));
        }
        validate_selection(
            spec.process_type,
            &spec.selected_prompts,
            &spec.selected_categories,
        )?;

        let _guard = self
            .inner
            .in_flight
            .acquire(OperationTarget::Job(source.id.clone()))?;

        let request = CloneJobRequest {
            source_job_id: source.id.clone(),
            title,
            process_type: spec.process_type,
            user_id: owner_id.clone(),
            selected_prompts: spec.selected_prompts,
            selected_categories: spec.selected_categories,
        };

        let response = match ctx.backend.clone_job(&request).await {
            Ok(response) => response,
            Err(e) => {
                ctx.notify(Notification::job_clone_failed(&source.id, &e.to_string()));
                return Err(e.into());
            }
        };

        let job = Job::accepted(
            &response,
            &owner_id,
            &request.title,
            &source.folder_path,
            request.process_type,
        );
        log::info!("Cloned job {} from {}", job.id, source.id);
        ctx.catalogue.upsert(job.clone());
        ctx.publish(ChangeReason::Lifecycle(job.id.clone()));
        self.inner.refresh_after(&owner_id).await;

        ctx.notify(Notification::job_cloned(&job, &source.title));
        Ok(ctx.catalogue.get(&job.id).unwrap_or(job))
    }

    /// Cancels, pauses or resumes a job.
    ///
    /// Cancel and pause tear the poller down once the backend confirms;
    /// queue starts a fresh one with an immediate fetch.
    pub async fn update_status(
        &self,
        job_id: &str,
        action: StatusAction,
        owner_id: &str,
    ) -> Result<Job> {
        let owner_id = require_owner(owner_id)?.to_string();
        let _guard = self
            .inner
            .in_flight
            .acquire(OperationTarget::Job(job_id.to_string()))?;

        let request = StatusUpdateRequest {
            job_id: job_id.to_string(),
            action,
            user_id: owner_id.clone(),
        };

        let ctx = &self.inner.ctx;
        let response = match ctx.backend.update_status(&request).await {
            Ok(response) => response,
            Err(e) => {
                ctx.notify(Notification::status_update_failed(job_id, action, &e.to_string()));
                return Err(e.into());
            }
        };
        log::info!("Job {} {}: now {}", job_id, action, response.status);

        if !action.keeps_polling() {
            self.inner.poller.stop(job_id);
        }
        let merged = ctx.catalogue.merge_status(&response);
        if action.keeps_polling() {
            self.inner.poller.start(job_id);
        }
        ctx.publish(ChangeReason::Lifecycle(job_id.to_string()));
        self.inner.refresh_after(&owner_id).await;

        // The refreshed entry wins; the merged one covers a failed refresh.
        let job = ctx
            .catalogue
            .get(job_id)
            .or(merged)
            .ok_or_else(|| OrchestratorError::UnknownJob(job_id.to_string()))?;
        ctx.notify(Notification::status_updated(&job, action));
        Ok(job)
    }

    /// Deletes a job: poller down, catalogue entry gone, list re-fetched.
    pub async fn delete_job(&self, job_id: &str) -> Result<()> {
        let owner_id = self.session_owner()?;
        let _guard = self
            .inner
            .in_flight
            .acquire(OperationTarget::Job(job_id.to_string()))?;

        let ctx = &self.inner.ctx;
        if let Err(e) = ctx.backend.delete_job(job_id, &owner_id).await {
            ctx.notify(Notification::job_delete_failed(job_id, &e.to_string()));
            return Err(e.into());
        }

        self.inner.poller.stop(job_id);
        let removed = ctx.catalogue.remove(job_id);
        ctx.publish(ChangeReason::Removed(job_id.to_string()));
        log::info!("Deleted job {}", job_id);
        self.inner.refresh_after(&owner_id).await;

        let title = removed.as_ref().map(|job| job.title.as_str());
        ctx.notify(Notification::job_deleted(job_id, title));
        Ok(())
    }
}
