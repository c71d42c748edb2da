use std::path::PathBuf;
use thiserror::Error;

pub use crate::backend::RequestError;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("An owner identity is required for this operation")]
    AuthenticationRequired,

    #[error("Backend request failed: {0}")]
    Request(#[from] RequestError),

    #[error("Could not get updates for job {job_id} after {attempts} attempts")]
    PollExhausted { job_id: String, attempts: u32 },

    #[error("Another operation is already in progress for {0}")]
    OperationInProgress(String),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl OrchestratorError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        OrchestratorError::Validation(message.into())
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to (de)serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
