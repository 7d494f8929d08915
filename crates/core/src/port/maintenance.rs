// Artifact Maintenance Port
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Outcome of one retention sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Entries examined
    pub scanned: usize,
    pub removed_files: usize,
    pub removed_dirs: usize,
    /// Bytes freed by removed entries (best effort)
    pub reclaimed_bytes: u64,
}

impl SweepStats {
    pub fn removed(&self) -> usize {
        self.removed_files + self.removed_dirs
    }
}

/// Snapshot of working storage usage
#[derive(Debug, Clone, Default)]
pub struct StorageStats {
    /// Top-level artifacts (inputs, outputs) excluding the frames root
    pub artifact_count: usize,
    /// Per-job frame directories currently on disk
    pub frame_dir_count: usize,
    pub total_bytes: u64,
}

/// Maintenance configuration
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Artifacts strictly older than this are reclaimed
    pub retention: Duration,

    /// How often the janitor wakes up
    pub sweep_interval: Duration,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(10 * 60),
            sweep_interval: Duration::from_secs(10 * 60),
        }
    }
}

/// Working-storage maintenance operations
#[async_trait]
pub trait Maintenance: Send + Sync {
    /// Delete every artifact whose modification time is older than `max_age`
    ///
    /// Entries that vanish mid-sweep count as already reclaimed.
    ///
    /// # Returns
    /// What was examined and removed
    async fn sweep_expired(&self, max_age: Duration) -> Result<SweepStats>;

    /// Get storage statistics
    async fn get_stats(&self) -> Result<StorageStats>;

    /// Run a full maintenance pass (stats + sweep)
    async fn run_full_maintenance(&self, config: &MaintenanceConfig) -> Result<SweepStats> {
        let before = self.get_stats().await?;
        let swept = self.sweep_expired(config.retention).await?;
        let after = self.get_stats().await?;

        tracing::info!(
            scanned = swept.scanned,
            removed = swept.removed(),
            reclaimed_bytes = swept.reclaimed_bytes,
            bytes_before = before.total_bytes,
            bytes_after = after.total_bytes,
            frame_dirs = after.frame_dir_count,
            "Maintenance completed"
        );

        Ok(swept)
    }
}
