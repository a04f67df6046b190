//! Counterfactual models

use guard_core::Observation;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CounterfactualRequest {
    pub original_input: Observation,
    #[serde(default)]
    pub modified_features: Observation,
    #[validate(length(min = 1, max = 64))]
    pub model_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ThresholdRequest {
    #[serde(default)]
    pub observation: Observation,
    #[validate(length(min = 1, max = 128))]
    pub feature: String,
    pub low: f64,
    pub high: f64,
    #[validate(length(min = 1, max = 64))]
    pub model_id: Option<String>,
    #[validate(range(min = 1, max = 64))]
    pub steps: Option<usize>,
}
