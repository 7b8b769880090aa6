pub mod api;
pub mod schema;

pub use api::{HealthResponse, PredictResponse, PredictionLabel};
pub use schema::{FEATURES, Feature, FeatureKind, FeatureRecord, NUM_FEATURES};
