//! Classifier capability interface
//!
//! Every model family is adapted to one trait: a FeatureVector goes in, a
//! probability per guard class comes out. Global importance and per-class
//! attribution are optional capabilities.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PredictorError, PredictorResult};
use crate::logic::features::FeatureVector;

// ============================================================================
// MODEL FAMILY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    XgBoost,
    LightGbm,
    CatBoost,
    Ensemble,
    /// Anything adapted outside this crate (stubs, external runtimes)
    Custom,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelFamily::XgBoost => "xgboost",
            ModelFamily::LightGbm => "lightgbm",
            ModelFamily::CatBoost => "catboost",
            ModelFamily::Ensemble => "ensemble",
            ModelFamily::Custom => "custom",
        };
        f.write_str(name)
    }
}

// ============================================================================
// CLASS DISTRIBUTION
// ============================================================================

/// One nonnegative score per guard class. Need not sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassDistribution(Vec<f64>);

impl ClassDistribution {
    pub fn new(scores: Vec<f64>) -> Self {
        Self(scores)
    }

    pub fn zeros(num_classes: usize) -> Self {
        Self(vec![0.0; num_classes])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, class_id: usize) -> Option<f64> {
        self.0.get(class_id).copied()
    }

    /// Shape and value check: exactly `expected_len` finite, nonnegative
    /// entries
    pub fn validate(&self, model_id: &str, expected_len: usize) -> PredictorResult<()> {
        if self.0.len() != expected_len {
            return Err(PredictorError::Computation(format!(
                "model '{}' returned {} class scores, expected {}",
                model_id,
                self.0.len(),
                expected_len
            )));
        }
        if let Some((i, v)) = self.0.iter().enumerate().find(|(_, v)| !v.is_finite() || **v < 0.0) {
            return Err(PredictorError::Computation(format!(
                "model '{}' returned invalid score {} for class {}",
                model_id, v, i
            )));
        }
        Ok(())
    }

    /// `self += weight * other`, element-wise
    pub fn add_weighted(&mut self, other: &ClassDistribution, weight: f64) {
        for (acc, v) in self.0.iter_mut().zip(other.0.iter()) {
            *acc += weight * v;
        }
    }
}

// ============================================================================
// ATTRIBUTION
// ============================================================================

/// Signed per-feature contributions for every class, relative to a base value
#[derive(Debug, Clone, PartialEq)]
pub struct ClassAttributions {
    /// `per_class[class][feature]`
    pub per_class: Vec<Vec<f64>>,
    /// Expected model output per class
    pub base_values: Vec<f64>,
}

impl ClassAttributions {
    pub fn zeros(num_classes: usize, num_features: usize) -> Self {
        Self {
            per_class: vec![vec![0.0; num_features]; num_classes],
            base_values: vec![0.0; num_classes],
        }
    }

    pub fn num_classes(&self) -> usize {
        self.per_class.len()
    }

    /// Attribution array and base value for one class
    pub fn for_class(&self, class_id: usize) -> Option<(&[f64], f64)> {
        let scores = self.per_class.get(class_id)?;
        let base = self.base_values.get(class_id).copied().unwrap_or(0.0);
        Some((scores.as_slice(), base))
    }
}

/// Computes attributions for one model
pub trait AttributionBackend: Send + Sync {
    fn attribute(&self, vector: &FeatureVector) -> PredictorResult<ClassAttributions>;
}

// ============================================================================
// CLASSIFIER
// ============================================================================

pub trait Classifier: Send + Sync {
    fn family(&self) -> ModelFamily;

    /// Length of every distribution this model returns
    fn num_classes(&self) -> usize;

    fn predict_proba(&self, vector: &FeatureVector) -> PredictorResult<ClassDistribution>;

    /// Nonnegative importance per feature, if the model exposes one
    fn feature_importance(&self) -> Option<Vec<f64>> {
        None
    }

    /// Attribution backend, if the model supports one
    fn attribution_backend(&self) -> Option<Arc<dyn AttributionBackend>> {
        None
    }
}

// ============================================================================
// FIXED CLASSIFIER
// ============================================================================

/// Returns the same distribution for every input. Used to stub model
/// families in tests and smoke deployments.
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    scores: Vec<f64>,
    importance: Option<Vec<f64>>,
}

impl FixedClassifier {
    pub fn new(scores: Vec<f64>) -> Self {
        Self { scores, importance: None }
    }

    pub fn with_importance(mut self, importance: Vec<f64>) -> Self {
        self.importance = Some(importance);
        self
    }
}

impl Classifier for FixedClassifier {
    fn family(&self) -> ModelFamily {
        ModelFamily::Custom
    }

    fn num_classes(&self) -> usize {
        self.scores.len()
    }

    fn predict_proba(&self, _vector: &FeatureVector) -> PredictorResult<ClassDistribution> {
        Ok(ClassDistribution::new(self.scores.clone()))
    }

    fn feature_importance(&self) -> Option<Vec<f64>> {
        self.importance.clone()
    }
}

// ============================================================================
// SOFTMAX
// ============================================================================

/// Numerically stable softmax over raw margins
pub fn softmax(margins: &[f64]) -> Vec<f64> {
    let max = margins.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        let n = margins.len().max(1) as f64;
        return vec![1.0 / n; margins.len()];
    }
    let exps: Vec<f64> = margins.iter().map(|m| (m - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
