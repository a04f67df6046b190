use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::logic::features::Observation;
use crate::logic::ranking::Prediction;

/// One class that appears in either ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankChange {
    #[serde(rename = "guard_index")]
    pub class_id: usize,
    pub original_rank: Option<usize>,
    pub modified_rank: Option<usize>,
    /// Positive when the class moved up; only when ranked on both sides
    pub rank_change: Option<i64>,
    /// Modified minus original; an absent side counts as 0
    pub confidence_change: f64,
}

impl RankChange {
    pub fn on_both_sides(&self) -> bool {
        self.original_rank.is_some() && self.modified_rank.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Largest |confidence_change| first, ties by ascending class id
    pub rank_changes: Vec<RankChange>,
    pub top_guard_changed: bool,
    /// Mean change over classes ranked on both sides; `None` when there are
    /// none
    pub average_confidence_change: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensitivityTier {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSensitivity {
    pub feature: String,
    /// Baseline value, when the baseline carried the field
    pub original_value: Option<Value>,
    pub new_value: Value,
    /// Change of the rank-1 confidence, shared by every modified feature
    pub confidence_impact: f64,
    pub sensitivity: SensitivityTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityReport {
    pub feature_sensitivities: Vec<FeatureSensitivity>,
    pub overall_impact: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterfactualResult {
    #[serde(rename = "original")]
    pub baseline: Prediction,
    pub modified: Prediction,
    pub comparison: Comparison,
    pub sensitivity: SensitivityReport,
    pub modified_features: Observation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSearch {
    pub feature: String,
    pub low: f64,
    pub high: f64,
    /// Rank-1 class at `low`
    pub baseline_guard: Option<usize>,
    /// Smallest probed value whose rank-1 class differs from `baseline_guard`
    pub threshold: Option<f64>,
    pub guard_at_threshold: Option<usize>,
    pub evaluations: usize,
}
