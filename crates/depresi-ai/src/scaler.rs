//! Fitted feature scalers exported from scikit-learn.
//!
//! The artifact is a JSON object tagged by `kind`, carrying the fitted
//! attributes of `StandardScaler` (`mean_`, `scale_`) or `MinMaxScaler`
//! (`min_`, `scale_`). `NaN` inputs pass through unchanged, as in sklearn.

use std::path::Path;

use depresi_core::NUM_FEATURES;
use depresi_core::schema;
use serde::Deserialize;
use tracing::info;

use crate::artifact::read_artifact;
use crate::error::{ArtifactError, PredictError};
use crate::predictor::FeatureScaler;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Scaler {
    /// `x' = (x - mean) / scale`. An empty `mean` or `scale` skips that step
    /// (`with_mean=False` / `with_std=False`).
    Standard {
        #[serde(default)]
        mean: Vec<f64>,
        #[serde(default)]
        scale: Vec<f64>,
    },
    /// `x' = x * scale + min`.
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

#[derive(Debug, Deserialize)]
struct ScalerFile {
    #[serde(flatten)]
    scaler: Scaler,
    #[serde(default)]
    feature_names_in: Vec<String>,
}

impl Scaler {
    /// Load a scaler artifact from disk.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let text = read_artifact(path)?;
        let scaler = Self::from_json_str(&text)?;
        info!(path = %path.display(), kind = scaler.kind(), "loaded feature scaler");
        Ok(scaler)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ArtifactError> {
        let file: ScalerFile = serde_json::from_str(json)?;

        if !file.feature_names_in.is_empty()
            && let Some(pos) = schema::first_mismatch(&file.feature_names_in)
        {
            return Err(ArtifactError::Invalid(format!(
                "scaler feature_names_in disagree with the schema at column {pos}"
            )));
        }

        let mut scaler = file.scaler;
        match &mut scaler {
            Scaler::Standard { mean, scale } => {
                check_len("mean", mean, true)?;
                check_len("scale", scale, true)?;
                // sklearn replaces zero variance with 1 when fitting.
                for s in scale.iter_mut() {
                    if *s == 0.0 {
                        *s = 1.0;
                    }
                }
            }
            Scaler::MinMax { min, scale } => {
                check_len("min", min, false)?;
                check_len("scale", scale, false)?;
            }
        }
        Ok(scaler)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Standard { .. } => "standard",
            Self::MinMax { .. } => "minmax",
        }
    }
}

fn check_len(name: &str, values: &[f64], optional: bool) -> Result<(), ArtifactError> {
    if (optional && values.is_empty()) || values.len() == NUM_FEATURES {
        return Ok(());
    }
    Err(ArtifactError::Invalid(format!(
        "scaler {name} has {} entries, schema has {NUM_FEATURES}",
        values.len()
    )))
}

impl FeatureScaler for Scaler {
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, PredictError> {
        if features.len() != NUM_FEATURES {
            return Err(PredictError::Shape {
                expected: NUM_FEATURES,
                got: features.len(),
            });
        }

        let mut out = features.to_vec();
        match self {
            Self::Standard { mean, scale } => {
                if !mean.is_empty() {
                    out.iter_mut().zip(mean).for_each(|(x, m)| *x -= m);
                }
                if !scale.is_empty() {
                    out.iter_mut().zip(scale).for_each(|(x, s)| *x /= s);
                }
            }
            Self::MinMax { min, scale } => {
                out.iter_mut()
                    .zip(scale.iter().zip(min))
                    .for_each(|(x, (s, m))| *x = *x * s + m);
            }
        }
        Ok(out)
    }
}
