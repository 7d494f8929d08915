// Pipeline Configuration

use super::constants::*;
use std::time::Duration;

/// Program names (or absolute paths) of the external media tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

/// Frame pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Frame-count ceiling; longer videos are rejected before extraction
    pub max_frames: u32,

    pub output_fps: u32,
    pub tools: ToolPaths,

    /// Per-invocation deadline for probe / extract / encode (None = wait forever)
    pub tool_timeout: Option<Duration>,

    /// Size of the shared transform pool
    pub transform_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_frames: DEFAULT_MAX_FRAMES,
            output_fps: DEFAULT_OUTPUT_FPS,
            tools: ToolPaths::default(),
            tool_timeout: Some(DEFAULT_TOOL_TIMEOUT),
            transform_workers: DEFAULT_TRANSFORM_WORKERS,
        }
    }
}
