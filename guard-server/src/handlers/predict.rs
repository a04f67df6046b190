//! Prediction handler

use axum::{extract::State, Json};
use guard_core::Prediction;
use validator::Validate;

use super::run_blocking;
use crate::models::PredictRequest;
use crate::{AppError, AppResult, AppState};

/// Rank the most likely guards for one circuit observation
pub async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> AppResult<Json<Prediction>> {
    req.validate()?;

    let top_k = req.top_k.unwrap_or(state.config.default_top_k);
    if top_k > state.config.max_top_k {
        return Err(AppError::ValidationError(format!(
            "top_k must be at most {}",
            state.config.max_top_k
        )));
    }
    let model_id = req.model_id.unwrap_or_else(|| state.config.default_model.clone());

    tracing::debug!("predict model={} top_k={} fields={}", model_id, top_k, req.observation.len());

    let predictor = state.predictor.clone();
    let observation = req.observation;
    let prediction = run_blocking(move || predictor.predict(&observation, &model_id, top_k)).await?;

    if !prediction.fallbacks.is_empty() {
        tracing::debug!("predict used {} feature fallbacks", prediction.fallbacks.len());
    }

    Ok(Json(prediction))
}
