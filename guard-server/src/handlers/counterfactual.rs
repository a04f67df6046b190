//! Counterfactual handlers

use axum::{extract::State, Json};
use guard_core::logic::counterfactual::DEFAULT_THRESHOLD_STEPS;
use guard_core::{CounterfactualResult, ThresholdSearch};
use validator::Validate;

use super::run_blocking;
use crate::models::{CounterfactualRequest, ThresholdRequest};
use crate::{AppResult, AppState};

/// What-if analysis
pub async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<CounterfactualRequest>,
) -> AppResult<Json<CounterfactualResult>> {
    req.validate()?;

    let model_id = req.model_id.unwrap_or_else(|| state.config.default_model.clone());
    let predictor = state.predictor.clone();
    let (baseline, modification) = (req.original_input, req.modified_features);

    let result = run_blocking(move || predictor.counterfactual(&baseline, &modification, &model_id)).await?;

    tracing::debug!(
        "counterfactual: top changed = {}, impact {:.2}",
        result.comparison.top_guard_changed,
        result.sensitivity.overall_impact
    );

    Ok(Json(result))
}

/// Smallest value of one field that changes the top guard
pub async fn threshold(
    State(state): State<AppState>,
    Json(req): Json<ThresholdRequest>,
) -> AppResult<Json<ThresholdSearch>> {
    req.validate()?;

    let model_id = req.model_id.unwrap_or_else(|| state.config.default_model.clone());
    let steps = req.steps.unwrap_or(DEFAULT_THRESHOLD_STEPS);
    let predictor = state.predictor.clone();
    let ThresholdRequest { observation, feature, low, high, .. } = req;

    let search = run_blocking(move || {
        predictor.critical_threshold(&observation, &feature, (low, high), &model_id, steps)
    })
    .await?;

    Ok(Json(search))
}
