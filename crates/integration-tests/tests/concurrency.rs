//! Jobs running side by side: isolation, pool bounds, accelerator exclusivity

mod common;

use backdrop_core::application::PipelineConfig;
use backdrop_core::domain::{JobStatus, Method};
use backdrop_core::port::accelerator::mocks::MockAccelerator;
use backdrop_core::port::process_runner::mocks::ScriptedProcessRunner;
use backdrop_core::port::segmentation::mocks::MockSegmenter;
use backdrop_core::port::AcceleratorDevice;
use common::Harness;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_jobs_with_different_methods_do_not_interfere() {
    let h = Harness::new(
        ScriptedProcessRunner::for_frames(6).with_delay(Duration::from_millis(5)),
        MockSegmenter::transparent().with_delay(Duration::from_millis(2)),
    );

    let (first, first_task) = h.admit("u2net").await;
    let (second, second_task) = h.admit("bria").await;
    first_task.await.unwrap();
    second_task.await.unwrap();

    for (id, method) in [(&first, "u2net"), (&second, "bria")] {
        let record = h.record(id).await;
        assert_eq!(record.status, JobStatus::Completed, "{}", id);
        assert_eq!(record.method.as_str(), method);

        let output = h.layout.output_path(id);
        assert_eq!(record.output_path.as_ref(), Some(&output));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "frames=6\n");

        // Every version of this record belongs to this job only
        let history = h.registry.history(id);
        assert!(history.iter().all(|r| &r.id == id && r.method.as_str() == method));
        let trace = h.registry.progress_trace(id);
        assert!(trace.windows(2).all(|w| w[0] <= w[1]), "{}: {:?}", id, trace);
    }

    let methods = h.segmenter.methods_seen();
    assert_eq!(methods.iter().filter(|m| **m == Method::U2net).count(), 6);
    assert_eq!(methods.iter().filter(|m| **m == Method::Bria).count(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_transform_pool_bounds_work_across_jobs() {
    let config = PipelineConfig {
        transform_workers: 2,
        ..PipelineConfig::default()
    };
    let h = Harness::build(
        ScriptedProcessRunner::for_frames(4),
        MockSegmenter::transparent().with_delay(Duration::from_millis(20)),
        config,
        None,
    );

    let mut tasks = Vec::new();
    for method in ["u2net", "bria", "isnet-anime", "u2net_human_seg"] {
        tasks.push(h.admit(method).await);
    }
    for (id, task) in tasks {
        task.await.unwrap();
        assert_eq!(h.record(&id).await.status, JobStatus::Completed);
    }

    assert_eq!(h.segmenter.call_count(), 16);
    assert!(
        h.segmenter.max_in_flight() <= 2,
        "max in flight: {}",
        h.segmenter.max_in_flight()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_accelerator_serializes_bound_methods() {
    let device = Arc::new(MockAccelerator::new());
    let config = PipelineConfig {
        transform_workers: 4,
        ..PipelineConfig::default()
    };
    let h = Harness::build(
        ScriptedProcessRunner::for_frames(3),
        MockSegmenter::transparent().with_delay(Duration::from_millis(10)),
        config,
        Some(device.clone() as Arc<dyn AcceleratorDevice>),
    );

    let (a, a_task) = h.admit("inspyrenet").await;
    let (b, b_task) = h.admit("inspyrenet").await;
    a_task.await.unwrap();
    b_task.await.unwrap();

    // A double attach would panic inside the device and fail a job
    assert_eq!(h.record(&a).await.status, JobStatus::Completed);
    assert_eq!(h.record(&b).await.status, JobStatus::Completed);
    assert_eq!(device.attach_count(), 2);
    assert_eq!(device.release_count(), 2);
    assert!(!device.is_attached());
    assert_eq!(h.segmenter.max_in_flight(), 1);
}
