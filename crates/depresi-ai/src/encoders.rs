//! Fitted label encoders, one per categorical column.
//!
//! The artifact maps column name → `LabelEncoder.classes_`; a value's code is
//! its index in that list.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::{info, warn};

use crate::artifact::read_artifact;
use crate::error::ArtifactError;

/// Lookup from category string to the integer code it was fit with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: Vec<String>,
    codes: HashMap<String, u32>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Result<Self, ArtifactError> {
        let mut codes = HashMap::with_capacity(classes.len());
        for (i, class) in classes.iter().enumerate() {
            if codes.insert(class.clone(), i as u32).is_some() {
                return Err(ArtifactError::Invalid(format!(
                    "duplicate class {class:?} in label encoder"
                )));
            }
        }
        Ok(Self { classes, codes })
    }

    /// Code for `value`, or `None` if it was never seen during fitting.
    pub fn transform(&self, value: &str) -> Option<u32> {
        self.codes.get(value).copied()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// All fitted encoders from the artifact, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncoderTable {
    encoders: BTreeMap<String, LabelEncoder>,
}

impl EncoderTable {
    /// An empty table: every categorical column uses its fallback rule.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the encoder artifact, or an empty table if the file is absent.
    ///
    /// A file that exists but cannot be read or parsed is still an error.
    pub fn load_or_empty(path: &Path) -> Result<Self, ArtifactError> {
        match read_artifact(path) {
            Ok(text) => {
                let table = Self::from_json_str(&text)?;
                info!(
                    path = %path.display(),
                    columns = table.len(),
                    "loaded label encoders"
                );
                Ok(table)
            }
            Err(ArtifactError::NotFound(_)) => {
                warn!(
                    path = %path.display(),
                    "label encoders not found, using fallback encoding for all categorical columns"
                );
                Ok(Self::empty())
            }
            Err(e) => Err(e),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ArtifactError> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;
        let mut encoders = BTreeMap::new();
        for (column, classes) in raw {
            let encoder = LabelEncoder::new(classes)
                .map_err(|e| ArtifactError::Invalid(format!("column {column:?}: {e}")))?;
            encoders.insert(column, encoder);
        }
        Ok(Self { encoders })
    }

    pub fn get(&self, column: &str) -> Option<&LabelEncoder> {
        self.encoders.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }

    /// Remove and return the encoder for `column`.
    pub(crate) fn take(&mut self, column: &str) -> Option<LabelEncoder> {
        self.encoders.remove(column)
    }
}
