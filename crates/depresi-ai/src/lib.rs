//! Inference layer: artifact loading, categorical encoding and gradient-boosted prediction.

mod artifact;
pub mod encoders;
mod error;
pub mod features;
pub mod policy;
mod predictor;
pub mod scaler;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod xgboost;

pub use artifact::{ArtifactPaths, DEFAULT_ENCODERS_PATH, DEFAULT_MODEL_PATH, DEFAULT_SCALER_PATH};
pub use encoders::{EncoderTable, LabelEncoder};
pub use error::{ArtifactError, PolicyError, PredictError};
pub use features::FeatureVector;
pub use policy::{EncodingPolicy, Tier, UnknownCategory};
pub use predictor::{BinaryClassifier, FeatureScaler, Prediction, Predictor};
pub use scaler::Scaler;
pub use xgboost::GradientBoostedClassifier;
