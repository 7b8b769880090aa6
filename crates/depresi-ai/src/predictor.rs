//! The prediction service context: classifier, scaler and encoding policy,
//! loaded once and shared read-only by every request.

use std::time::Instant;

use anyhow::Context;
use depresi_core::{FeatureRecord, PredictionLabel};
use tracing::{debug, info, warn};

use crate::artifact::ArtifactPaths;
use crate::encoders::EncoderTable;
use crate::error::PredictError;
use crate::features::{self, EncodedRecord};
use crate::policy::{EncodingPolicy, UnknownCategory};
use crate::scaler::Scaler;
use crate::xgboost::GradientBoostedClassifier;

/// A fitted transform applied to the feature vector before inference.
pub trait FeatureScaler: Send + Sync {
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, PredictError>;
}

/// A trained binary classifier.
pub trait BinaryClassifier: Send + Sync {
    /// `[P(class 0), P(class 1)]`.
    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2], PredictError>;

    /// Argmax of [`predict_proba`](Self::predict_proba); ties go to class 1.
    fn predict(&self, features: &[f64]) -> Result<u8, PredictError> {
        let [p0, p1] = self.predict_proba(features)?;
        Ok(u8::from(p1 >= p0))
    }
}

/// Result of one inference.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class: u8,
    pub probability: [f64; 2],
    /// Unknown categories that were encoded as 0 along the way.
    pub warnings: Vec<UnknownCategory>,
}

impl Prediction {
    pub fn label(&self) -> PredictionLabel {
        PredictionLabel::from_class(self.class)
    }
}

/// Immutable service context passed to the request handlers.
pub struct Predictor {
    classifier: Box<dyn BinaryClassifier>,
    scaler: Box<dyn FeatureScaler>,
    policy: EncodingPolicy,
}

impl Predictor {
    pub fn new(
        classifier: impl BinaryClassifier + 'static,
        scaler: impl FeatureScaler + 'static,
        policy: EncodingPolicy,
    ) -> Self {
        Self {
            classifier: Box::new(classifier),
            scaler: Box::new(scaler),
            policy,
        }
    }

    /// Load all artifacts. Any error here is fatal to startup, except a
    /// missing encoder file, which degrades to fallback encoding.
    pub fn load(paths: &ArtifactPaths) -> anyhow::Result<Self> {
        let classifier = GradientBoostedClassifier::load(&paths.model)
            .with_context(|| format!("loading model {}", paths.model.display()))?;
        let scaler = Scaler::load(&paths.scaler)
            .with_context(|| format!("loading scaler {}", paths.scaler.display()))?;
        let encoders = EncoderTable::load_or_empty(&paths.encoders)
            .with_context(|| format!("loading label encoders {}", paths.encoders.display()))?;
        let policy = EncodingPolicy::build(encoders).context("building encoding policy")?;

        for (column, tier) in policy.tiers() {
            info!(column, tier = tier.as_str(), "categorical encoding");
        }

        Ok(Self::new(classifier, scaler, policy))
    }

    pub fn policy(&self) -> &EncodingPolicy {
        &self.policy
    }

    /// Validate and encode a record without running the model.
    #[cfg(test)]
    fn encode(&self, record: &FeatureRecord) -> Result<features::FeatureVector, PredictError> {
        self.encode_record(record).map(|encoded| encoded.vector)
    }

    fn encode_record(&self, record: &FeatureRecord) -> Result<EncodedRecord, PredictError> {
        let record = features::validate(record)?;
        let encoded = features::encode(record, &self.policy)?;
        for unknown in &encoded.warnings {
            warn!(
                column = unknown.column,
                value = %unknown.value,
                "unknown category, substituting code 0"
            );
        }
        Ok(encoded)
    }

    /// validate → encode → scale → infer.
    pub fn predict(&self, record: &FeatureRecord) -> Result<Prediction, PredictError> {
        let start = Instant::now();

        let encoded = self.encode_record(record)?;
        let scaled = self.scaler.transform(encoded.vector.as_slice())?;
        let class = self.classifier.predict(&scaled)?;
        let probability = self.classifier.predict_proba(&scaled)?;

        debug!(
            class,
            p1 = probability[1],
            elapsed_us = start.elapsed().as_micros() as u64,
            "prediction complete"
        );

        Ok(Prediction {
            class,
            probability,
            warnings: encoded.warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Tier;
    use crate::testing::{
        fitted_encoders, fixture_predictor, sample_record, standard_scaler, stump_model,
    };
    use depresi_core::schema::{ACADEMIC_PRESSURE, GENDER, SUICIDAL_THOUGHTS, feature_names};
    use serde_json::json;

    /// Returns fixed probabilities regardless of input.
    struct FixedClassifier([f64; 2]);

    impl BinaryClassifier for FixedClassifier {
        fn predict_proba(&self, _: &[f64]) -> Result<[f64; 2], PredictError> {
            Ok(self.0)
        }
    }

    struct Identity;

    impl FeatureScaler for Identity {
        fn transform(&self, features: &[f64]) -> Result<Vec<f64>, PredictError> {
            Ok(features.to_vec())
        }
    }

    struct Broken;

    impl BinaryClassifier for Broken {
        fn predict_proba(&self, _: &[f64]) -> Result<[f64; 2], PredictError> {
            Err(PredictError::Inference("booster unavailable".into()))
        }
    }

    fn fallback_policy() -> EncodingPolicy {
        EncodingPolicy::build(EncoderTable::empty()).unwrap()
    }

    #[test]
    fn reference_record_predicts_depresi() {
        let predictor = fixture_predictor(EncoderTable::empty());
        let prediction = predictor.predict(&sample_record()).unwrap();

        // Suicidal thoughts and academic pressure both push towards class 1.
        assert_eq!(prediction.class, 1);
        assert_eq!(prediction.label(), PredictionLabel::Depresi);
        let [p0, p1] = prediction.probability;
        assert!((p0 + p1 - 1.0).abs() < 1e-6);
        assert!((p1 - 1.0 / (1.0 + (-1.3f64).exp())).abs() < 1e-6, "got {p1}");
    }

    #[test]
    fn low_risk_record_predicts_tidak_depresi() {
        let predictor = fixture_predictor(EncoderTable::empty());
        let mut record = sample_record();
        record.insert(SUICIDAL_THOUGHTS.into(), json!("No"));
        record.insert(ACADEMIC_PRESSURE.into(), json!(1.0));

        let prediction = predictor.predict(&record).unwrap();
        assert_eq!(prediction.class, 0);
        assert_eq!(prediction.label(), PredictionLabel::TidakDepresi);
        assert!(prediction.probability[0] > prediction.probability[1]);
    }

    #[test]
    fn encode_exposes_the_unscaled_vector() {
        let predictor = fixture_predictor(EncoderTable::empty());
        let vector = predictor.encode(&sample_record()).unwrap();
        assert_eq!(
            vector.into_inner(),
            [1.0, 33.0, 5.0, 0.0, 8.97, 2.0, 0.0, 2.0, 2.0, 1.0, 3.0, 1.0, 0.0]
        );
    }

    #[test]
    fn missing_field_is_a_validation_error() {
        let predictor = fixture_predictor(EncoderTable::empty());
        for name in feature_names() {
            let mut record = sample_record();
            record.remove(name);
            let err = predictor.predict(&record).unwrap_err();
            assert!(err.is_validation());
            assert_eq!(err.to_string(), format!("Missing required field: {name}"));
        }
    }

    #[test]
    fn unknown_category_still_predicts() {
        let table = EncoderTable::from_json_str(&fitted_encoders().to_string()).unwrap();
        let predictor = fixture_predictor(table);
        let mut record = sample_record();
        record.insert(GENDER.into(), json!("Other"));

        let prediction = predictor.predict(&record).unwrap();
        assert!(prediction.warnings.iter().any(|w| w.column == GENDER));
        let [p0, p1] = prediction.probability;
        assert!((p0 + p1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn tie_goes_to_class_one() {
        let predictor = Predictor::new(FixedClassifier([0.5, 0.5]), Identity, fallback_policy());
        let prediction = predictor.predict(&sample_record()).unwrap();
        assert_eq!(prediction.class, 1);
    }

    #[test]
    fn mock_artifacts_drive_the_label() {
        let predictor = Predictor::new(FixedClassifier([0.9, 0.1]), Identity, fallback_policy());
        let prediction = predictor.predict(&sample_record()).unwrap();
        assert_eq!(prediction.class, 0);
        assert_eq!(prediction.probability, [0.9, 0.1]);
    }

    #[test]
    fn inference_failure_is_not_a_validation_error() {
        let predictor = Predictor::new(Broken, Identity, fallback_policy());
        let err = predictor.predict(&sample_record()).unwrap_err();
        assert!(!err.is_validation());
        assert_eq!(err.to_string(), "inference failed: booster unavailable");
    }

    fn write_artifacts(dir: &std::path::Path, with_encoders: bool) -> ArtifactPaths {
        let paths = ArtifactPaths {
            model: dir.join("xgboost_model_new.json"),
            scaler: dir.join("scaler.json"),
            encoders: dir.join("label_encoders.json"),
        };
        std::fs::write(&paths.model, stump_model().to_string()).unwrap();
        std::fs::write(&paths.scaler, standard_scaler().to_string()).unwrap();
        if with_encoders {
            std::fs::write(&paths.encoders, fitted_encoders().to_string()).unwrap();
        }
        paths
    }

    #[test]
    fn load_without_encoders_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = Predictor::load(&write_artifacts(dir.path(), false)).unwrap();
        assert!(predictor.policy().tiers().all(|(_, t)| t == Tier::Fallback));
        assert_eq!(predictor.predict(&sample_record()).unwrap().class, 1);
    }

    #[test]
    fn load_with_encoders_uses_fitted_tier() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = Predictor::load(&write_artifacts(dir.path(), true)).unwrap();
        assert!(predictor.policy().tiers().all(|(_, t)| t == Tier::Fitted));
    }

    #[test]
    fn load_fails_without_model() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_artifacts(dir.path(), false);
        std::fs::remove_file(&paths.model).unwrap();
        let err = Predictor::load(&paths).err().unwrap();
        assert!(format!("{err:#}").contains("artifact not found"), "{err:#}");
    }

    #[test]
    fn load_fails_with_corrupt_scaler() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_artifacts(dir.path(), false);
        std::fs::write(&paths.scaler, "{\"kind\": \"standard\", \"mean\": [1.0]}").unwrap();
        let err = Predictor::load(&paths).err().unwrap();
        assert!(format!("{err:#}").contains("loading scaler"), "{err:#}");
    }
}
