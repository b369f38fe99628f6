//! Error types for ExoSeeker

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ExoSeeker operations
pub type Result<T> = std::result::Result<T, ExoSeekerError>;

/// Main error type for the preprocessing, training and evaluation pipeline
#[derive(Error, Debug)]
pub enum ExoSeekerError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Length mismatch: {actual} actual labels vs {predicted} predicted labels")]
    LengthMismatch { actual: usize, predicted: usize },

    #[error("No model trained yet (expected a model at {})", .0.display())]
    ModelNotFound(PathBuf),

    #[error("Fitting error: {0}")]
    Fitting(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<polars::error::PolarsError> for ExoSeekerError {
    fn from(err: polars::error::PolarsError) -> Self {
        ExoSeekerError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for ExoSeekerError {
    fn from(err: serde_json::Error) -> Self {
        ExoSeekerError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ExoSeekerError {
    fn from(err: ndarray::ShapeError) -> Self {
        ExoSeekerError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl ExoSeekerError {
    /// Whether the error was caused by the user's input rather than the system
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ExoSeekerError::Schema(_)
                | ExoSeekerError::EmptyDataset(_)
                | ExoSeekerError::LengthMismatch { .. }
                | ExoSeekerError::Config(_)
                | ExoSeekerError::Data(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExoSeekerError::Schema("missing columns: kepid".to_string());
        assert_eq!(err.to_string(), "Schema error: missing columns: kepid");
    }

    #[test]
    fn test_model_not_found_mentions_path() {
        let err = ExoSeekerError::ModelNotFound(PathBuf::from("model.json"));
        assert!(err.to_string().contains("No model trained yet"));
        assert!(err.to_string().contains("model.json"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ExoSeekerError = io_err.into();
        assert!(matches!(err, ExoSeekerError::Io(_)));
        assert!(!err.is_user_error());
    }

    #[test]
    fn test_user_errors() {
        assert!(ExoSeekerError::EmptyDataset("no rows".into()).is_user_error());
        assert!(!ExoSeekerError::Fitting("diverged".into()).is_user_error());
    }
}
