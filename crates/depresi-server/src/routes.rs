use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use depresi_ai::Predictor;
use depresi_core::{FeatureRecord, HealthResponse, PredictResponse};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::ApiError;

const HOME_PAGE: &str = "\
<h1>API Prediksi Depresi Mahasiswa</h1>
<p>Gunakan endpoint /predict dengan metode POST untuk melakukan prediksi.</p>
";

/// Build the service router around a loaded predictor.
pub fn router(predictor: Arc<Predictor>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .with_state(predictor)
}

/// Serve until the listener fails.
pub async fn serve(listener: TcpListener, predictor: Arc<Predictor>) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "serving predictions");
    axum::serve(listener, router(predictor)).await
}

async fn home() -> Html<&'static str> {
    Html(HOME_PAGE)
}

/// Liveness only; artifacts are not re-checked.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

async fn predict(
    State(predictor): State<Arc<Predictor>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(body) = body?;
    // A body with no keys fails validation on the first column.
    let record = match body {
        Value::Object(record) => record,
        _ => FeatureRecord::new(),
    };

    let prediction = predictor.predict(&record)?;
    Ok(Json(PredictResponse::success(
        prediction.class,
        prediction.probability,
    )))
}
