// Stage outcomes
// Every stage returns Result<_, StageError>; the Display text is what pollers see

use crate::domain::Stage;
use std::any::Any;
use thiserror::Error;

/// Why a job ended in the error state
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    #[error("Error counting frames")]
    CountFailed { detail: String },

    #[error("Video too long (max {max} frames)")]
    TooLong { frames: u32, max: u32 },

    #[error("Error extracting frames")]
    ExtractFailed { detail: String },

    #[error("No frames were extracted from the video")]
    NoFrames,

    #[error("Error removing background: {0}")]
    TransformFailed(String),

    #[error("Error creating output video")]
    EncodeFailed { detail: String },

    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl StageError {
    /// Message recorded on the job
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Stage the failure belongs to (None for failures outside any stage)
    pub fn stage(&self) -> Option<Stage> {
        match self {
            StageError::InvalidMethod(_) => Some(Stage::Admitted),
            StageError::CountFailed { .. } | StageError::TooLong { .. } => {
                Some(Stage::CountingFrames)
            }
            StageError::ExtractFailed { .. } | StageError::NoFrames => Some(Stage::Extracting),
            StageError::TransformFailed(_) => Some(Stage::Transforming),
            StageError::EncodeFailed { .. } => Some(Stage::Encoding),
            StageError::Unexpected(_) => None,
        }
    }

    /// Diagnostic output kept for logs only
    pub fn detail(&self) -> Option<&str> {
        match self {
            StageError::CountFailed { detail }
            | StageError::ExtractFailed { detail }
            | StageError::EncodeFailed { detail } => Some(detail),
            _ => None,
        }
    }
}

/// Render a panic payload caught from a task
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_facing_messages() {
        assert_eq!(
            StageError::InvalidMethod("sam".into()).message(),
            "Invalid method: sam"
        );
        assert_eq!(
            StageError::CountFailed {
                detail: "moov atom not found".into()
            }
            .message(),
            "Error counting frames"
        );
        assert_eq!(
            StageError::TooLong {
                frames: 300,
                max: 250
            }
            .message(),
            "Video too long (max 250 frames)"
        );
        assert_eq!(
            StageError::NoFrames.message(),
            "No frames were extracted from the video"
        );
        assert_eq!(
            StageError::EncodeFailed {
                detail: String::new()
            }
            .message(),
            "Error creating output video"
        );
    }

    #[test]
    fn test_stage_tags() {
        assert_eq!(StageError::NoFrames.stage(), Some(Stage::Extracting));
        assert_eq!(
            StageError::TransformFailed("x".into()).stage(),
            Some(Stage::Transforming)
        );
        assert_eq!(StageError::Unexpected("boom".into()).stage(), None);
    }

    #[test]
    fn test_panic_message_downcasts() {
        assert_eq!(panic_message(Box::new("static str")), "static str");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(42_u8)), "Unknown panic");
    }
}
