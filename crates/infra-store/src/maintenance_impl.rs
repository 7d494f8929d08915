// Filesystem Maintenance Implementation
// Age-based reclamation of the working-storage tree

use async_trait::async_trait;
use backdrop_core::domain::StorageLayout;
use backdrop_core::error::Result;
use backdrop_core::port::{Maintenance, StorageStats, SweepStats, TimeProvider};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tracing::{debug, warn};

/// Working-storage maintenance
///
/// Candidates are every top-level entry under the storage root and every
/// per-job directory under the frames root. The frames root itself is never
/// removed. Age is measured from the entry's modification time against the
/// injected clock.
pub struct FsMaintenance {
    layout: StorageLayout,
    time_provider: Arc<dyn TimeProvider>,
}

/// Outcome of reclaiming one entry
enum Reclaim {
    Kept,
    Removed { dir: bool, bytes: u64 },
    /// Vanished between listing and deletion
    AlreadyGone,
}

impl FsMaintenance {
    pub fn new(layout: StorageLayout, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            layout,
            time_provider,
        }
    }

    /// Candidate entries, or an empty list if the root does not exist yet
    async fn candidates(&self) -> io::Result<Vec<PathBuf>> {
        let frames_root = self.layout.frames_root();
        let mut found = Vec::new();

        for path in list_dir(self.layout.root()).await? {
            if path == frames_root {
                found.extend(list_dir(&frames_root).await?);
            } else {
                found.push(path);
            }
        }
        Ok(found)
    }

    async fn reclaim(&self, path: &Path, max_age: Duration) -> io::Result<Reclaim> {
        let meta = match tokio::fs::symlink_metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Reclaim::AlreadyGone),
            Err(e) => return Err(e),
        };

        let modified_ms = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        let age_ms = self.time_provider.now_millis() - modified_ms;
        if age_ms <= max_age.as_millis() as i64 {
            return Ok(Reclaim::Kept);
        }

        let dir = meta.is_dir();
        let bytes = if dir {
            tree_size(path).await
        } else {
            meta.len()
        };

        let removed = if dir {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_file(path).await
        };

        match removed {
            Ok(()) => {
                debug!(path = %path.display(), age_ms, "Reclaimed expired artifact");
                Ok(Reclaim::Removed { dir, bytes })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Reclaim::AlreadyGone),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Maintenance for FsMaintenance {
    async fn sweep_expired(&self, max_age: Duration) -> Result<SweepStats> {
        let mut stats = SweepStats::default();

        for path in self.candidates().await? {
            stats.scanned += 1;
            match self.reclaim(&path, max_age).await {
                Ok(Reclaim::Removed { dir: true, bytes }) => {
                    stats.removed_dirs += 1;
                    stats.reclaimed_bytes += bytes;
                }
                Ok(Reclaim::Removed { dir: false, bytes }) => {
                    stats.removed_files += 1;
                    stats.reclaimed_bytes += bytes;
                }
                Ok(Reclaim::Kept) | Ok(Reclaim::AlreadyGone) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to reclaim artifact");
                }
            }
        }

        Ok(stats)
    }

    async fn get_stats(&self) -> Result<StorageStats> {
        let frames_root = self.layout.frames_root();
        let mut stats = StorageStats::default();

        for path in list_dir(self.layout.root()).await? {
            if path == frames_root {
                stats.frame_dir_count = list_dir(&frames_root).await?.len();
            } else {
                stats.artifact_count += 1;
            }
            stats.total_bytes += tree_size(&path).await;
        }

        Ok(stats)
    }
}

/// Entries of `dir`; a missing directory has none
async fn list_dir(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        paths.push(entry.path());
    }
    Ok(paths)
}

/// Total size of files under `path` (best effort, unreadable entries count as 0)
async fn tree_size(path: &Path) -> u64 {
    let mut total = 0;
    let mut pending = vec![path.to_path_buf()];

    while let Some(current) = pending.pop() {
        let Ok(meta) = tokio::fs::symlink_metadata(&current).await else {
            continue;
        };
        if meta.is_dir() {
            if let Ok(children) = list_dir(&current).await {
                pending.extend(children);
            }
        } else {
            total += meta.len();
        }
    }
    total
}
