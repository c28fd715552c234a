//! Common error types for MoodTune

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for MoodTune operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the MoodTune crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization error for persisted artifacts
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Raw catalog file or persisted artifact absent at its expected path
    #[error("Missing input file: {}", .0.display())]
    MissingInput(PathBuf),

    /// Persisted artifacts do not belong to the same index build
    #[error("Artifact mismatch: {0}")]
    ArtifactMismatch(String),

    /// No rows left to fit the scaler and neighbor index on
    #[error("Empty training set: {0}")]
    EmptyTrainingSet(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// True for failures that mean "the artifact set is not usable", as opposed
    /// to an unexpected I/O fault while reading it.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::MissingInput(_) | Error::ArtifactMismatch(_))
    }
}
