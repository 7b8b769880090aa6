//! Artifact locations and file access shared by the loaders.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::ArtifactError;

pub const DEFAULT_MODEL_PATH: &str = "xgboost_model_new.json";
pub const DEFAULT_SCALER_PATH: &str = "scaler.json";
pub const DEFAULT_ENCODERS_PATH: &str = "label_encoders.json";

/// Where the three training artifacts live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
    /// Optional: a missing file means fallback encoding for every column.
    pub encoders: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL_PATH.into(),
            scaler: DEFAULT_SCALER_PATH.into(),
            encoders: DEFAULT_ENCODERS_PATH.into(),
        }
    }
}

/// Read an artifact file, distinguishing "absent" from "unreadable".
pub(crate) fn read_artifact(path: &Path) -> Result<String, ArtifactError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            ArtifactError::NotFound(path.to_path_buf())
        } else {
            ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}
