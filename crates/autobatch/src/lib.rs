pub mod backend;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod storage;
pub mod telemetry;

pub use backend::{HttpBackend, JobBackend, JobRecord, JobStatusRecord, StatusAction};
pub use broadcast::{
    CatalogueEvent, CatalogueEventBroadcaster, ChangeReason, Notification,
    NotificationBroadcaster, NotificationKind, NotificationSink, Severity,
};
pub use config::{load_config, LogFormat, OrchestratorConfig};
pub use error::{ConfigError, OrchestratorError, RequestError, Result, StorageError};
pub use job::{Bucket, BucketSnapshot, Job, JobCatalogue, JobStatus, ProcessType};
pub use orchestrator::{
    CloneSpec, NewJob, Orchestrator, OrchestratorOptions, PollSettings, ReconcileReport,
};
pub use storage::{ActiveJobSnapshot, LocalStore, SqliteStore};
pub use telemetry::init_logging;
