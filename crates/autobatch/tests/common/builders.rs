//! Builders for backend job records.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};

use autobatch::{JobRecord, JobStatus, ProcessType};

use super::harness::OWNER;

/// Builder for `JobRecord` instances seeded into the fake backend.
pub struct RecordBuilder {
    record: JobRecord,
}

impl RecordBuilder {
    pub fn new(id: &str) -> Self {
        let created_at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        Self {
            record: JobRecord {
                id: id.to_string(),
                user_id: OWNER.to_string(),
                title: format!("Batch {}", id),
                folder_path: format!("/documents/{}", id),
                process_type: ProcessType::Categorization,
                status: JobStatus::Queued,
                total_files: Some(0),
                completed_files: 0,
                failed_files: 0,
                created_at: Some(created_at),
                updated_at: Some(created_at),
                error_message: None,
            },
        }
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.record.status = status;
        self
    }

    pub fn process_type(mut self, process_type: ProcessType) -> Self {
        self.record.process_type = process_type;
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.record.title = title.to_string();
        self
    }

    pub fn owner(mut self, owner_id: &str) -> Self {
        self.record.user_id = owner_id.to_string();
        self
    }

    pub fn files(mut self, total: u32, completed: u32, failed: u32) -> Self {
        self.record.total_files = Some(total);
        self.record.completed_files = completed;
        self.record.failed_files = failed;
        self
    }

    pub fn build(self) -> JobRecord {
        self.record
    }
}

/// Shorthand for a default record in the given status.
pub fn record(id: &str, status: JobStatus) -> JobRecord {
    RecordBuilder::new(id).status(status).build()
}
