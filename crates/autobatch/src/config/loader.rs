use std::path::Path;

use crate::config::schema::OrchestratorConfig;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<OrchestratorConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<OrchestratorConfig, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: OrchestratorConfig = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

pub fn validate_config(config: &OrchestratorConfig) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let url = config.backend_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::Validation {
            message: format!(
                "backend_url must be an http(s) URL, got '{}'",
                config.backend_url
            ),
        });
    }

    if config.poll_interval_secs == 0 {
        return Err(ConfigError::Validation {
            message: "poll_interval_secs must be greater than zero".to_string(),
        });
    }

    if config.max_poll_errors == 0 {
        return Err(ConfigError::Validation {
            message: "max_poll_errors must be greater than zero".to_string(),
        });
    }

    if config.snapshot_key.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "snapshot_key must not be empty".to_string(),
        });
    }

    if config.notification_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "notification_capacity must be greater than zero".to_string(),
        });
    }

    Ok(())
}
