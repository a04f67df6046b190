//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    environment: String,
    models_loaded: Vec<String>,
    encoders_loaded: usize,
    guard_directory: bool,
    feature_layout: String,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ctx = state.predictor.context();
    let models_loaded = ctx.models().available_ids();

    Json(HealthResponse {
        status: if models_loaded.is_empty() { "degraded" } else { "healthy" },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        environment: state.config.environment.clone(),
        models_loaded,
        encoders_loaded: ctx.engineer().encoders().len(),
        guard_directory: ctx.directory().is_some(),
        feature_layout: format!("{:08x}", ctx.feature_names().layout_hash()),
    })
}
