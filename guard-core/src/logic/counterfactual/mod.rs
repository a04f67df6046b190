//! Counterfactual Module - what-if analysis over the ranker
//!
//! ## Structure
//! - `types`: comparison, sensitivity and threshold records
//! - `engine`: paired runs, diffing, threshold bisection

pub mod engine;
pub mod types;


pub use engine::{CounterfactualEngine, DEFAULT_THRESHOLD_STEPS};
pub use types::{
    Comparison, CounterfactualResult, FeatureSensitivity, RankChange, SensitivityReport, SensitivityTier,
    ThresholdSearch,
};
