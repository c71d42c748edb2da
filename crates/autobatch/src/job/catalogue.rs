//! In-memory job catalogue with derived bucket views.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use super::model::{Bucket, Job};
use crate::backend::JobStatusRecord;

/// Immutable view of the catalogue split by bucket, newest jobs first.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BucketSnapshot {
    pub active: Vec<Job>,
    pub completed: Vec<Job>,
    pub inactive: Vec<Job>,
}

impl BucketSnapshot {
    pub fn from_jobs(mut jobs: Vec<Job>) -> Self {
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let mut snapshot = Self::default();
        for job in jobs {
            match job.bucket() {
                Bucket::Active => snapshot.active.push(job),
                Bucket::Completed => snapshot.completed.push(job),
                Bucket::Inactive => snapshot.inactive.push(job),
            }
        }
        snapshot
    }

    pub fn bucket(&self, bucket: Bucket) -> &[Job] {
        match bucket {
            Bucket::Active => &self.active,
            Bucket::Completed => &self.completed,
            Bucket::Inactive => &self.inactive,
        }
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.completed.len() + self.inactive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared store of every known job, keyed by id.
///
/// Cloning is cheap and clones share the same underlying map. Readers get
/// owned snapshots; nothing hands out references into the map.
#[derive(Clone, Default)]
pub struct JobCatalogue {
    jobs: Arc<RwLock<HashMap<String, Job>>>,
}

impl JobCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Job>> {
        match self.jobs.read() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job catalogue lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Job>> {
        match self.jobs.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job catalogue lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Inserts the job or replaces the entry with the same id.
    pub fn upsert(&self, job: Job) {
        self.write().insert(job.id.clone(), job);
    }

    /// Merges a status response onto an existing entry.
    ///
    /// Returns the updated job, or `None` when the job is no longer known.
    /// Never inserts.
    pub fn merge_status(&self, update: &JobStatusRecord) -> Option<Job> {
        let mut jobs = self.write();
        let job = jobs.get_mut(&update.id)?;
        job.apply_status(update);
        Some(job.clone())
    }

    pub fn remove(&self, job_id: &str) -> Option<Job> {
        self.write().remove(job_id)
    }

    /// Overwrites the whole catalogue with an authoritative listing.
    pub fn replace_all(&self, jobs: Vec<Job>) {
        let fresh: HashMap<String, Job> = jobs.into_iter().map(|j| (j.id.clone(), j)).collect();
        *self.write() = fresh;
    }

    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.read().get(job_id).cloned()
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.read().contains_key(job_id)
    }

    pub fn all(&self) -> Vec<Job> {
        self.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn buckets(&self) -> BucketSnapshot {
        BucketSnapshot::from_jobs(self.all())
    }

    /// Ids of every job whose status calls for a live poll handle.
    pub fn polling_ids(&self) -> HashSet<String> {
        self.read()
            .values()
            .filter(|j| j.status.should_poll())
            .map(|j| j.id.clone())
            .collect()
    }
}
