use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use depresi_ai::PredictError;
use depresi_core::PredictResponse;
use thiserror::Error;
use tracing::{error, warn};

/// Everything that can go wrong while serving `/predict`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{}", .0.body_text())]
    BadJson(#[from] JsonRejection),

    #[error(transparent)]
    Predict(#[from] PredictError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Predict(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            Self::BadJson(_) | Self::Predict(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = ?self, "prediction failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "rejected prediction request");
        }
        (status, Json(PredictResponse::error(self.to_string()))).into_response()
    }
}
