//! Request validation and feature-vector construction.

use depresi_core::schema::{FEATURES, FINANCIAL_STRESS, feature_names};
use depresi_core::{FeatureRecord, NUM_FEATURES};
use serde_json::Value;

use crate::error::PredictError;
use crate::policy::{EncodingPolicy, UnknownCategory};

/// Numeric representation of one record, in schema order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; NUM_FEATURES]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_inner(self) -> [f64; NUM_FEATURES] {
        self.0
    }
}

/// A feature vector plus any unknown categories met while encoding it.
#[derive(Debug, Clone)]
pub struct EncodedRecord {
    pub vector: FeatureVector,
    pub warnings: Vec<UnknownCategory>,
}

/// Check that every schema column is present, stopping at the first gap.
pub fn validate(record: &FeatureRecord) -> Result<&FeatureRecord, PredictError> {
    match feature_names().find(|name| !record.contains_key(*name)) {
        Some(missing) => Err(PredictError::MissingField(missing)),
        None => Ok(record),
    }
}

/// Encode a validated record into a [`FeatureVector`].
///
/// Categorical columns go through `policy`; `Financial Stress` is coerced
/// leniently (unparseable → `NaN`); every other column must cast to float.
pub fn encode(
    record: &FeatureRecord,
    policy: &EncodingPolicy,
) -> Result<EncodedRecord, PredictError> {
    let mut vector = [0.0; NUM_FEATURES];
    let mut warnings = Vec::new();

    for (slot, feature) in vector.iter_mut().zip(FEATURES.iter()) {
        let value = record
            .get(feature.name)
            .ok_or(PredictError::MissingField(feature.name))?;

        *slot = if let Some(encoding) = policy.encoding(feature.name) {
            let encoded = encoding.encode(feature.name, value)?;
            warnings.extend(encoded.warning);
            f64::from(encoded.code)
        } else if feature.name == FINANCIAL_STRESS {
            coerce_numeric(value)
        } else {
            cast_to_float(feature.name, value)?
        };
    }

    Ok(EncodedRecord {
        vector: FeatureVector(vector),
        warnings,
    })
}

/// Strict cast: numbers, booleans, `null` (→ `NaN`) and numeric strings.
fn cast_to_float(field: &'static str, value: &Value) -> Result<f64, PredictError> {
    scalar_to_float(value).ok_or_else(|| PredictError::NotNumeric {
        field,
        value: value.to_string(),
    })
}

/// Lenient cast: anything that does not parse becomes `NaN`.
fn coerce_numeric(value: &Value) -> f64 {
    scalar_to_float(value).unwrap_or(f64::NAN)
}

fn scalar_to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(f64::NAN),
        // Accepts surrounding whitespace and `nan` / `inf` spellings.
        Value::String(s) => s.trim().parse().ok(),
        Value::Array(_) | Value::Object(_) => None,
    }
}
