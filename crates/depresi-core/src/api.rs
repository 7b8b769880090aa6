//! JSON bodies exchanged over the HTTP surface.

use serde::{Deserialize, Serialize};

/// Human-readable tag attached to a predicted class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionLabel {
    /// Class 1.
    Depresi,
    /// Class 0.
    TidakDepresi,
}

impl PredictionLabel {
    pub fn from_class(class: u8) -> Self {
        if class == 1 {
            Self::Depresi
        } else {
            Self::TidakDepresi
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Depresi => "Depresi",
            Self::TidakDepresi => "Tidak Depresi",
        }
    }
}

/// Body of `POST /predict`, tagged by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PredictResponse {
    Success {
        prediction: u8,
        /// `[P(class 0), P(class 1)]`.
        probability: [f64; 2],
        prediction_label: String,
    },
    Error {
        message: String,
    },
}

impl PredictResponse {
    pub fn success(prediction: u8, probability: [f64; 2]) -> Self {
        Self::Success {
            prediction,
            probability,
            prediction_label: PredictionLabel::from_class(prediction).as_str().to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn label_follows_class() {
        assert_eq!(PredictionLabel::from_class(1).as_str(), "Depresi");
        assert_eq!(PredictionLabel::from_class(0).as_str(), "Tidak Depresi");
    }

    #[test]
    fn success_body_shape() {
        let body = serde_json::to_value(PredictResponse::success(1, [0.25, 0.75])).unwrap();
        assert_eq!(
            body,
            json!({
                "status": "success",
                "prediction": 1,
                "probability": [0.25, 0.75],
                "prediction_label": "Depresi"
            })
        );
    }

    #[test]
    fn error_body_shape() {
        let body =
            serde_json::to_value(PredictResponse::error("Missing required field: CGPA")).unwrap();
        assert_eq!(
            body,
            json!({"status": "error", "message": "Missing required field: CGPA"})
        );
    }

    #[test]
    fn health_body_shape() {
        let body = serde_json::to_value(HealthResponse::healthy()).unwrap();
        assert_eq!(body, json!({"status": "healthy"}));
    }
}
