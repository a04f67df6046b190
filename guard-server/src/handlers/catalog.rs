//! Model catalog handlers

use axum::{extract::State, Json};

use crate::models::ModelsResponse;
use crate::AppState;

/// List loaded models
pub async fn list(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.predictor.list_models(),
        default_model: state.config.default_model.clone(),
    })
}
