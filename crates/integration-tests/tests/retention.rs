//! Retention janitor over a real storage tree produced by finished jobs

mod common;

use backdrop_core::application::{query_status, shutdown_channel, RetentionJanitor};
use backdrop_core::domain::JobStatus;
use backdrop_core::port::process_runner::mocks::ScriptedProcessRunner;
use backdrop_core::port::segmentation::mocks::MockSegmenter;
use backdrop_core::port::time_provider::FixedTimeProvider;
use backdrop_core::port::MaintenanceConfig;
use backdrop_core::AppError;
use backdrop_infra_store::FsMaintenance;
use common::Harness;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const MINUTE_MS: i64 = 60 * 1000;

fn wall_clock_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

fn janitor(h: &Harness, clock: Arc<FixedTimeProvider>, sweep_interval: Duration) -> RetentionJanitor {
    let maintenance = Arc::new(FsMaintenance::new(h.layout.clone(), clock));
    RetentionJanitor::new(
        maintenance,
        MaintenanceConfig {
            retention: Duration::from_secs(600),
            sweep_interval,
        },
    )
}

#[tokio::test]
async fn test_sweep_reclaims_only_expired_artifacts_idempotently() {
    let h = Harness::new(ScriptedProcessRunner::for_frames(2), MockSegmenter::transparent());
    let clock = Arc::new(FixedTimeProvider::new(wall_clock_ms()));
    let janitor = janitor(&h, clock.clone(), Duration::from_secs(600));

    let done = h.run_job("u2net").await;
    assert_eq!(done.status, JobStatus::Completed);

    // Fresh artifacts survive
    let first = janitor.run_now().await.unwrap();
    assert_eq!(first.removed(), 0);
    assert!(h.layout.output_path(&done.id).exists());

    clock.advance(11 * MINUTE_MS);
    let second = janitor.run_now().await.unwrap();
    assert_eq!(second.removed_files, 2); // input + output
    assert!(!h.layout.input_path(&done.id).exists());
    assert!(!h.layout.output_path(&done.id).exists());
    assert!(h.layout.frames_root().is_dir());

    let third = janitor.run_now().await.unwrap();
    assert_eq!(third.removed(), 0);

    // Registry still says completed, the artifact is reported missing
    let status = query_status(h.registry.as_ref(), &done.id).await;
    assert!(matches!(status, Err(AppError::ArtifactMissing(_))));
}

#[tokio::test]
async fn test_threshold_is_strict() {
    let h = Harness::new(ScriptedProcessRunner::for_frames(1), MockSegmenter::transparent());
    let clock = Arc::new(FixedTimeProvider::new(wall_clock_ms()));
    let janitor = janitor(&h, clock.clone(), Duration::from_secs(600));

    let done = h.run_job("u2net").await;

    clock.advance(9 * MINUTE_MS);
    assert_eq!(janitor.run_now().await.unwrap().removed(), 0);
    assert!(h.layout.output_path(&done.id).exists());
}

#[tokio::test]
async fn test_orphaned_frame_directory_is_reclaimed() {
    let h = Harness::new(ScriptedProcessRunner::for_frames(1), MockSegmenter::transparent());
    let clock = Arc::new(FixedTimeProvider::new(wall_clock_ms()));
    let janitor = janitor(&h, clock.clone(), Duration::from_secs(600));

    // Left behind by a crashed process
    let orphan = h.layout.frame_dir("crashed-job");
    std::fs::create_dir_all(&orphan).unwrap();
    std::fs::write(orphan.join("frame_00001.png"), b"png").unwrap();

    clock.advance(30 * MINUTE_MS);
    let stats = janitor.run_now().await.unwrap();

    assert_eq!(stats.removed_dirs, 1);
    assert!(!orphan.exists());
    assert!(h.layout.frames_root().is_dir());
}

#[tokio::test]
async fn test_janitor_loop_sweeps_until_shutdown() {
    let h = Harness::new(ScriptedProcessRunner::for_frames(1), MockSegmenter::transparent());
    let clock = Arc::new(FixedTimeProvider::new(wall_clock_ms()));
    let done = h.run_job("u2net").await;
    let output = h.layout.output_path(&done.id);

    clock.advance(60 * MINUTE_MS);
    let (sender, token) = shutdown_channel();
    let handle = tokio::spawn(janitor(&h, clock, Duration::from_millis(20)).run(token));

    for _ in 0..200 {
        if !output.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!output.exists());

    sender.shutdown();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("janitor did not stop")
        .unwrap();
}
