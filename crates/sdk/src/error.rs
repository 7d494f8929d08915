//! SDK Error Types

use std::time::Duration;
use thiserror::Error;

/// SDK Result type
pub type Result<T> = std::result::Result<T, SdkError>;

/// SDK Error
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx answer; `detail` is the server's `{"detail": ...}` message
    #[error("Server returned {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("Job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    #[error("Job {job_id} still running after {waited:?}")]
    Timeout { job_id: String, waited: Duration },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SdkError {
    /// 404 from the server (unknown job, or artifact already reclaimed)
    pub fn is_not_found(&self) -> bool {
        matches!(self, SdkError::Api { status: 404, .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SdkError::Api { status: 429, .. })
    }
}
