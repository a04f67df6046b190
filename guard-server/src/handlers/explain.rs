//! Explainability handlers

use axum::{extract::{Path, State}, Json};
use guard_core::{Explanation, ImportanceReport};
use validator::Validate;

use super::run_blocking;
use crate::models::ExplainRequest;
use crate::{AppResult, AppState};

/// Attribution for one guard of one observation
pub async fn explain(
    State(state): State<AppState>,
    Json(req): Json<ExplainRequest>,
) -> AppResult<Json<Explanation>> {
    req.validate()?;

    let model_id = req.model_id.unwrap_or_else(|| state.config.default_model.clone());
    let predictor = state.predictor.clone();
    let observation = req.observation;
    let guard_index = req.guard_index;

    let explanation =
        run_blocking(move || predictor.explain_observation(&observation, guard_index, &model_id)).await?;

    Ok(Json(explanation))
}

/// Global feature importance for one model
pub async fn feature_importance(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
) -> AppResult<Json<ImportanceReport>> {
    let predictor = state.predictor.clone();
    let report = run_blocking(move || predictor.feature_importance(&model_id)).await?;
    Ok(Json(report))
}
