// Retention Janitor
// Periodically reclaims working-storage artifacts older than the retention window

use super::shutdown::ShutdownToken;
use crate::error::Result;
use crate::port::{Maintenance, MaintenanceConfig, SweepStats};
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

/// Background sweeper for inputs, outputs and orphaned frame directories
///
/// Deletion is purely age based and never consults the job registry, so an
/// artifact of a job that has been running longer than the retention window
/// can be reclaimed underneath it.
pub struct RetentionJanitor {
    maintenance: Arc<dyn Maintenance>,
    config: MaintenanceConfig,
}

impl RetentionJanitor {
    pub fn new(maintenance: Arc<dyn Maintenance>, config: MaintenanceConfig) -> Self {
        Self {
            maintenance,
            config,
        }
    }

    pub fn config(&self) -> &MaintenanceConfig {
        &self.config
    }

    /// Sweep loop; the first sweep happens immediately
    ///
    /// Returns when `shutdown` fires. A failed sweep is logged and the loop
    /// keeps going.
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            interval_secs = self.config.sweep_interval.as_secs(),
            retention_secs = self.config.retention.as_secs(),
            "Retention janitor started"
        );

        let mut tick = interval(self.config.sweep_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if let Err(e) = self.sweep().await {
                        error!(error = %e, "Retention sweep failed");
                    }
                }
                _ = shutdown.wait() => {
                    info!("Retention janitor stopped");
                    break;
                }
            }
        }
    }

    /// Run one sweep immediately (manual trigger), with storage stats logged
    pub async fn run_now(&self) -> Result<SweepStats> {
        info!("Running manual retention sweep");
        self.maintenance.run_full_maintenance(&self.config).await
    }

    async fn sweep(&self) -> Result<SweepStats> {
        let stats = self.maintenance.sweep_expired(self.config.retention).await?;
        if stats.removed() > 0 {
            info!(
                scanned = stats.scanned,
                removed_files = stats.removed_files,
                removed_dirs = stats.removed_dirs,
                reclaimed_bytes = stats.reclaimed_bytes,
                "Expired artifacts reclaimed"
            );
        }
        Ok(stats)
    }
}
