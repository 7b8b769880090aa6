use std::path::PathBuf;

use thiserror::Error;

/// Failure to read or interpret an artifact file at startup.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed artifact JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),
}

/// The encoding policy could not cover every categorical column.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("no encoding available for categorical column {0:?}")]
    Uncovered(String),

    #[error("fallback rule defined for non-categorical column {0:?}")]
    StrayFallback(String),
}

/// Request-scoped failure. Never fatal to the process.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("could not convert {field} value to float: {value}")]
    NotNumeric { field: &'static str, value: String },

    #[error("{field} must be a string, got {value}")]
    NotAString { field: &'static str, value: String },

    #[error("expected {expected} features, got {got}")]
    Shape { expected: usize, got: usize },

    #[error("inference failed: {0}")]
    Inference(String),
}

impl PredictError {
    /// Whether the caller sent a bad request (as opposed to the pipeline failing).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingField(_))
    }
}
