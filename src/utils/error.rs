//! Error Handling Module
//!
//! Defines the error taxonomy of the diagnosis pipeline.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for diagnosis operations
#[derive(Error, Debug)]
pub enum DiagnosisError {
    /// No upload, or an upload without a usable filename
    #[error("{0}")]
    MissingInput(String),

    /// Bytes could not be decoded as a still image
    #[error("Invalid image: {0}")]
    Decode(String),

    /// Classifier output width disagrees with the label catalog
    #[error("Classifier produced {actual} probabilities but the label catalog has {expected} classes")]
    CardinalityMismatch { expected: usize, actual: usize },

    /// Label catalog or disease table is malformed
    #[error("Catalog error in '{path}': {reason}")]
    Catalog { path: PathBuf, reason: String },

    /// Model artifact could not be loaded
    #[error("Failed to load model from '{0}': {1}")]
    ModelLoad(PathBuf, String),

    /// Error raised by the inference runtime
    #[error("Inference error: {0}")]
    Inference(String),

    /// Inference did not finish within the allotted time
    #[error("Inference timed out after {0:?}")]
    Timeout(Duration),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DiagnosisError {
    /// Build a catalog error for the given file
    pub fn catalog(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        DiagnosisError::Catalog {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by the caller's input rather than a fault
    /// in the service
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DiagnosisError::MissingInput(_) | DiagnosisError::Decode(_)
        )
    }
}

impl From<serde_json::Error> for DiagnosisError {
    fn from(err: serde_json::Error) -> Self {
        DiagnosisError::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for DiagnosisError {
    fn from(err: image::ImageError) -> Self {
        DiagnosisError::Decode(err.to_string())
    }
}

/// Convenience Result type for diagnosis operations
pub type Result<T> = std::result::Result<T, DiagnosisError>;
