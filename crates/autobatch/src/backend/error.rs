//! Backend request errors.

use thiserror::Error;

/// Errors from talking to the job-execution backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Failed to build backend client: {0}")]
    Client(String),

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Backend returned {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}
