//! HTTP Request/Response Types

use serde::{Deserialize, Serialize};

/// Multipart field carrying the uploaded media
pub const FIELD_FILE: &str = "file";

/// Multipart field carrying the method name
pub const FIELD_METHOD: &str = "method";

/// POST /remove_background_video/
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: String,
}

/// GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub processing_jobs: usize,
}
