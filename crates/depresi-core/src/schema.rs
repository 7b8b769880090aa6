//! Feature schema for the student depression model.
//!
//! The column order here is the order the scaler and the booster were fit
//! on. Reordering it silently corrupts every prediction.

use serde_json::{Map, Value};

/// A request record before validation: arbitrary JSON keys and values.
pub type FeatureRecord = Map<String, Value>;

pub const GENDER: &str = "Gender";
pub const AGE: &str = "Age";
pub const ACADEMIC_PRESSURE: &str = "Academic Pressure";
pub const WORK_PRESSURE: &str = "Work Pressure";
pub const CGPA: &str = "CGPA";
pub const STUDY_SATISFACTION: &str = "Study Satisfaction";
pub const JOB_SATISFACTION: &str = "Job Satisfaction";
pub const SLEEP_DURATION: &str = "Sleep Duration";
pub const DIETARY_HABITS: &str = "Dietary Habits";
pub const SUICIDAL_THOUGHTS: &str = "Have you ever had suicidal thoughts ?";
pub const WORK_STUDY_HOURS: &str = "Work/Study Hours";
pub const FINANCIAL_STRESS: &str = "Financial Stress";
pub const FAMILY_HISTORY: &str = "Family History of Mental Illness";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// Cast straight to float.
    Numeric,
    /// String enum, replaced by an integer code before casting.
    Categorical,
}

/// One column of the feature schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feature {
    pub name: &'static str,
    pub kind: FeatureKind,
}

impl Feature {
    const fn numeric(name: &'static str) -> Self {
        Self {
            name,
            kind: FeatureKind::Numeric,
        }
    }

    const fn categorical(name: &'static str) -> Self {
        Self {
            name,
            kind: FeatureKind::Categorical,
        }
    }

    pub fn is_categorical(&self) -> bool {
        self.kind == FeatureKind::Categorical
    }
}

pub const NUM_FEATURES: usize = 13;

/// Columns in training order.
pub static FEATURES: [Feature; NUM_FEATURES] = [
    Feature::categorical(GENDER),
    Feature::numeric(AGE),
    Feature::numeric(ACADEMIC_PRESSURE),
    Feature::numeric(WORK_PRESSURE),
    Feature::numeric(CGPA),
    Feature::numeric(STUDY_SATISFACTION),
    Feature::numeric(JOB_SATISFACTION),
    Feature::categorical(SLEEP_DURATION),
    Feature::categorical(DIETARY_HABITS),
    Feature::categorical(SUICIDAL_THOUGHTS),
    Feature::numeric(WORK_STUDY_HOURS),
    Feature::numeric(FINANCIAL_STRESS),
    Feature::categorical(FAMILY_HISTORY),
];

/// Column names in training order.
pub fn feature_names() -> impl Iterator<Item = &'static str> {
    FEATURES.iter().map(|f| f.name)
}

/// Categorical column names in training order.
pub fn categorical_columns() -> impl Iterator<Item = &'static str> {
    FEATURES
        .iter()
        .filter(|f| f.is_categorical())
        .map(|f| f.name)
}

/// Position of a column in the feature vector.
pub fn index_of(name: &str) -> Option<usize> {
    FEATURES.iter().position(|f| f.name == name)
}

pub fn is_categorical(name: &str) -> bool {
    FEATURES.iter().any(|f| f.name == name && f.is_categorical())
}

/// Check that an artifact's recorded column names match the schema order.
///
/// Returns the first position that disagrees, or `None` when they match.
pub fn first_mismatch<S: AsRef<str>>(names: &[S]) -> Option<usize> {
    if names.len() != NUM_FEATURES {
        return Some(names.len().min(NUM_FEATURES));
    }
    names
        .iter()
        .zip(feature_names())
        .position(|(got, want)| got.as_ref() != want)
}
