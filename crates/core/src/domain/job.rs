// Job Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Job ID (UUID v4)
pub type JobId = String;

/// Job Status (externally visible)
///
/// There is no queued state: work starts as soon as a job is admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

/// Pipeline stage a job has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Admitted,
    CountingFrames,
    Extracting,
    Transforming,
    Encoding,
}

impl Stage {
    /// The only stage this one may advance to (None for the last stage)
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Admitted => Some(Stage::CountingFrames),
            Stage::CountingFrames => Some(Stage::Extracting),
            Stage::Extracting => Some(Stage::Transforming),
            Stage::Transforming => Some(Stage::Encoding),
            Stage::Encoding => None,
        }
    }

    /// Human-readable description shown to pollers
    pub fn description(&self) -> &'static str {
        match self {
            Stage::Admitted => "Initializing",
            Stage::CountingFrames => "Counting frames",
            Stage::Extracting => "Extracting frames",
            Stage::Transforming => "Removing background",
            Stage::Encoding => "Encoding video",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Admitted => write!(f, "admitted"),
            Stage::CountingFrames => write!(f, "counting_frames"),
            Stage::Extracting => write!(f, "extracting"),
            Stage::Transforming => write!(f, "transforming"),
            Stage::Encoding => write!(f, "encoding"),
        }
    }
}

/// Method name exactly as submitted by the client.
///
/// Kept unresolved on the record; the orchestrator resolves it into a
/// [`crate::domain::Method`] before the first stage runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodName(String);

impl MethodName {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MethodName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single mutation of a job record
#[derive(Debug, Clone, PartialEq)]
pub enum JobUpdate {
    /// Advance to the next stage
    Stage { stage: Stage, message: String },
    /// Report transform progress in percent
    Progress(f64),
    /// Encoding finished, artifact written
    Completed { output_path: PathBuf },
    /// Any stage failed
    Failed { message: String },
}

impl JobUpdate {
    fn target(&self) -> String {
        match self {
            JobUpdate::Stage { stage, .. } => stage.to_string(),
            JobUpdate::Progress(_) => "progress".to_string(),
            JobUpdate::Completed { .. } => JobStatus::Completed.to_string(),
            JobUpdate::Failed { .. } => JobStatus::Error.to_string(),
        }
    }
}

/// Job Status Record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub method: MethodName,
    pub status: JobStatus,
    pub stage: Stage,

    /// Percent of frames transformed, 0..=100
    pub progress: f64,
    pub message: Option<String>,

    /// Only set once the job is completed
    pub output_path: Option<PathBuf>,

    pub created_at: i64, // epoch ms
    pub updated_at: i64, // epoch ms
}

impl JobRecord {
    /// Create a new job record
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `method` - Method name as submitted
    /// * `now_millis` - Admission timestamp in epoch ms (injected, not system time)
    pub fn new(id: impl Into<String>, method: MethodName, now_millis: i64) -> Self {
        Self {
            id: id.into(),
            method,
            status: JobStatus::Processing,
            stage: Stage::Admitted,
            progress: 0.0,
            message: Some(Stage::Admitted.description().to_string()),
            output_path: None,
            created_at: now_millis,
            updated_at: now_millis,
        }
    }

    /// Create a record with a deterministic ID (test-1, test-2, ...) for tests only
    pub fn new_test(method: impl Into<String>) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        Self::new(
            format!("test-{}", counter),
            MethodName::new(method),
            (counter * 1000) as i64,
        )
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply an update with explicit timestamp
    ///
    /// Terminal records are frozen; stages only move one step forward;
    /// progress never decreases.
    pub fn apply(&mut self, update: JobUpdate, now_millis: i64) -> Result<()> {
        if self.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: update.target(),
            });
        }

        match update {
            JobUpdate::Stage { stage, message } => {
                if self.stage.next() != Some(stage) {
                    return Err(DomainError::InvalidStateTransition {
                        from: self.stage.to_string(),
                        to: stage.to_string(),
                    });
                }
                self.stage = stage;
                self.message = Some(message);
            }
            JobUpdate::Progress(requested) => {
                if !requested.is_finite() {
                    return Err(DomainError::ValidationError(format!(
                        "progress must be finite, got {}",
                        requested
                    )));
                }
                let requested = requested.clamp(0.0, 100.0);
                if requested < self.progress {
                    return Err(DomainError::ProgressRegression {
                        current: self.progress,
                        requested,
                    });
                }
                self.progress = requested;
            }
            JobUpdate::Completed { output_path } => {
                if self.stage != Stage::Encoding {
                    return Err(DomainError::InvalidStateTransition {
                        from: self.stage.to_string(),
                        to: JobStatus::Completed.to_string(),
                    });
                }
                self.status = JobStatus::Completed;
                self.progress = 100.0;
                self.message = None;
                self.output_path = Some(output_path);
            }
            JobUpdate::Failed { message } => {
                self.status = JobStatus::Error;
                self.message = Some(message);
            }
        }

        self.updated_at = now_millis;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advance_to(record: &mut JobRecord, target: Stage) {
        while record.stage < target {
            let next = record.stage.next().unwrap();
            record
                .apply(
                    JobUpdate::Stage {
                        stage: next,
                        message: next.description().to_string(),
                    },
                    2000,
                )
                .unwrap();
        }
    }

    #[test]
    fn test_new_record_is_processing() {
        let record = JobRecord::new("job-1", MethodName::new("u2net"), 1000);

        assert_eq!(record.status, JobStatus::Processing);
        assert_eq!(record.stage, Stage::Admitted);
        assert_eq!(record.progress, 0.0);
        assert_eq!(record.message.as_deref(), Some("Initializing"));
        assert!(record.output_path.is_none());
    }

    #[test]
    fn test_stages_advance_one_step_at_a_time() {
        let mut record = JobRecord::new_test("u2net");

        let skipped = record.apply(
            JobUpdate::Stage {
                stage: Stage::Extracting,
                message: "Extracting frames".to_string(),
            },
            2000,
        );
        assert!(matches!(
            skipped,
            Err(DomainError::InvalidStateTransition { .. })
        ));

        advance_to(&mut record, Stage::Encoding);
        assert_eq!(record.stage, Stage::Encoding);
        assert_eq!(record.message.as_deref(), Some("Encoding video"));
    }

    #[test]
    fn test_progress_is_monotonic_and_clamped() {
        let mut record = JobRecord::new_test("u2net");

        record.apply(JobUpdate::Progress(40.0), 2000).unwrap();
        let regression = record.apply(JobUpdate::Progress(30.0), 3000);
        assert_eq!(
            regression,
            Err(DomainError::ProgressRegression {
                current: 40.0,
                requested: 30.0
            })
        );

        record.apply(JobUpdate::Progress(250.0), 4000).unwrap();
        assert_eq!(record.progress, 100.0);
        assert!(record.apply(JobUpdate::Progress(f64::NAN), 5000).is_err());
    }

    #[test]
    fn test_complete_requires_encoding_stage() {
        let mut record = JobRecord::new_test("u2net");
        let early = record.apply(
            JobUpdate::Completed {
                output_path: PathBuf::from("out.webm"),
            },
            2000,
        );
        assert!(early.is_err());

        advance_to(&mut record, Stage::Encoding);
        record
            .apply(
                JobUpdate::Completed {
                    output_path: PathBuf::from("out.webm"),
                },
                3000,
            )
            .unwrap();

        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.progress, 100.0);
        assert_eq!(record.output_path, Some(PathBuf::from("out.webm")));
        assert_eq!(record.updated_at, 3000);
    }

    #[test]
    fn test_terminal_records_are_frozen() {
        let mut record = JobRecord::new_test("u2net");
        record
            .apply(
                JobUpdate::Failed {
                    message: "Error counting frames".to_string(),
                },
                2000,
            )
            .unwrap();

        assert_eq!(record.status, JobStatus::Error);
        assert_eq!(record.stage, Stage::Admitted);

        let after = record.apply(JobUpdate::Progress(10.0), 3000);
        assert!(matches!(
            after,
            Err(DomainError::InvalidStateTransition { .. })
        ));
        assert_eq!(record.updated_at, 2000);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&JobStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        let stage = serde_json::to_string(&Stage::CountingFrames).unwrap();
        assert_eq!(stage, "\"counting_frames\"");
    }
}
