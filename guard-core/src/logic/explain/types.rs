use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    pub fn of(score: f64) -> Self {
        if score > 0.0 {
            Direction::Positive
        } else {
            Direction::Negative
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Direction::Positive => '+',
            Direction::Negative => '-',
        }
    }
}

/// One feature's share of a single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAttribution {
    pub index: usize,
    pub name: String,
    pub value: f64,
    /// Signed attribution in margin space
    pub score: f64,
    pub direction: Direction,
    /// |score| over the sum of |score| across every feature, in percent
    pub contribution_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    #[serde(rename = "guard_index")]
    pub class_id: usize,
    pub model_id: String,
    /// Every feature, layout order
    pub attributions: Vec<FeatureAttribution>,
    /// Largest |score| first
    pub top_features: Vec<FeatureAttribution>,
    pub explanation: String,
    pub base_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub rank: usize,
    pub feature_name: String,
    /// Percent of the model's total importance
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceReport {
    pub model_id: String,
    /// False when the model exposes no importance and zeros were substituted
    pub available: bool,
    pub features: Vec<FeatureImportance>,
}
