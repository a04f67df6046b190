//! Prediction and explanation models

use guard_core::{ModelInfo, Observation};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct PredictRequest {
    #[serde(default)]
    pub observation: Observation,
    #[validate(length(min = 1, max = 64))]
    pub model_id: Option<String>,
    #[validate(range(min = 1))]
    pub top_k: Option<usize>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExplainRequest {
    #[serde(default)]
    pub observation: Observation,
    pub guard_index: usize,
    #[validate(length(min = 1, max = 64))]
    pub model_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub default_model: String,
}
