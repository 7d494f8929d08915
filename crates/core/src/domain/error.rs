// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DomainError {
    #[error("Invalid job state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Progress cannot go backwards: {current} -> {requested}")]
    ProgressRegression { current: f64, requested: f64 },

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
