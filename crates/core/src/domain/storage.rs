// Working Storage Layout
//
// <root>/input_<id>.mp4     uploaded video
// <root>/frames/<id>/       frame sequence while the job runs
// <root>/output_<id>.webm   encoded artifact

use std::path::{Path, PathBuf};

/// Name of the directory (under the root) holding per-job frame directories
pub const FRAMES_DIR_NAME: &str = "frames";

/// Resolves per-job artifact paths under a working-storage root
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn frames_root(&self) -> PathBuf {
        self.root.join(FRAMES_DIR_NAME)
    }

    pub fn input_path(&self, job_id: &str) -> PathBuf {
        self.root.join(format!("input_{}.mp4", job_id))
    }

    pub fn frame_dir(&self, job_id: &str) -> PathBuf {
        self.frames_root().join(job_id)
    }

    pub fn output_path(&self, job_id: &str) -> PathBuf {
        self.root.join(format!("output_{}.webm", job_id))
    }

    /// Create the root and frames directories if missing
    pub async fn ensure(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(self.frames_root()).await
    }
}
