use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default snapshot key for the persisted Active bucket.
pub const DEFAULT_SNAPSHOT_KEY: &str = "batch_automation_active_jobs";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub version: String,
    pub backend_url: String,
    /// Owner identity used by the watch binary. Library callers pass it per call.
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_poll_errors")]
    pub max_poll_errors: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    #[serde(default = "default_snapshot_key")]
    pub snapshot_key: String,
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_poll_interval_secs() -> u64 {
    20
}

fn default_max_poll_errors() -> u32 {
    5
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_snapshot_key() -> String {
    DEFAULT_SNAPSHOT_KEY.to_string()
}

fn default_notification_capacity() -> usize {
    100
}

fn default_storage_path() -> PathBuf {
    crate::storage::default_store_path()
        .unwrap_or_else(|| std::env::temp_dir().join("autobatch").join("autobatch.db"))
}

impl OrchestratorConfig {
    /// Config with every optional field at its default.
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            version: "1.0".to_string(),
            backend_url: backend_url.into(),
            owner_id: None,
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_errors: default_max_poll_errors(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            storage_path: default_storage_path(),
            snapshot_key: default_snapshot_key(),
            notification_capacity: default_notification_capacity(),
            log_format: LogFormat::default(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
