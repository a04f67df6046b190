//! Model Ensemble - registry, weighted composite, top-K
//!
//! Concrete model ids delegate straight to their classifier. The reserved
//! `ensemble` id resolves to a [`WeightedEnsemble`] over whichever of the
//! xgboost / lightgbm / catboost constituents are registered.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::classifier::{
    AttributionBackend, ClassAttributions, ClassDistribution, Classifier, ModelFamily,
};
use crate::constants::{ENSEMBLE_MODEL_ID, ENSEMBLE_WEIGHTS, FEATURE_COUNT};
use crate::error::{PredictorError, PredictorResult};
use crate::logic::features::FeatureVector;

// ============================================================================
// WEIGHTED COMPOSITE
// ============================================================================

struct Member {
    id: String,
    weight: f64,
    classifier: Arc<dyn Classifier>,
}

/// Fixed-weight sum of constituent distributions. Missing constituents are
/// skipped; present ones keep their configured weight.
pub struct WeightedEnsemble {
    members: Vec<Member>,
    num_classes: usize,
}

impl WeightedEnsemble {
    pub fn member_ids(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.id.as_str()).collect()
    }
}

impl Classifier for WeightedEnsemble {
    fn family(&self) -> ModelFamily {
        ModelFamily::Ensemble
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn predict_proba(&self, vector: &FeatureVector) -> PredictorResult<ClassDistribution> {
        let mut combined = ClassDistribution::zeros(self.num_classes);
        for member in &self.members {
            let dist = member.classifier.predict_proba(vector)?;
            dist.validate(&member.id, self.num_classes)?;
            combined.add_weighted(&dist, member.weight);
        }
        Ok(combined)
    }

    /// Weighted sum of each constituent's importance, each first scaled to
    /// sum to 1 so families with different units are comparable
    fn feature_importance(&self) -> Option<Vec<f64>> {
        let mut combined = vec![0.0; FEATURE_COUNT];
        let mut any = false;
        for member in &self.members {
            let Some(importance) = member.classifier.feature_importance() else {
                continue;
            };
            any = true;
            let total: f64 = importance.iter().filter(|v| v.is_finite() && **v > 0.0).sum();
            if total <= 0.0 {
                continue;
            }
            for (acc, v) in combined.iter_mut().zip(importance.iter()) {
                if v.is_finite() && *v > 0.0 {
                    *acc += member.weight * v / total;
                }
            }
        }
        any.then_some(combined)
    }

    fn attribution_backend(&self) -> Option<Arc<dyn AttributionBackend>> {
        let parts: Vec<(f64, Arc<dyn AttributionBackend>)> = self
            .members
            .iter()
            .filter_map(|m| m.classifier.attribution_backend().map(|b| (m.weight, b)))
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(Arc::new(WeightedAttribution {
            parts,
            num_classes: self.num_classes,
        }))
    }
}

/// Weighted sum of constituent attributions (margin space)
struct WeightedAttribution {
    parts: Vec<(f64, Arc<dyn AttributionBackend>)>,
    num_classes: usize,
}

impl AttributionBackend for WeightedAttribution {
    fn attribute(&self, vector: &FeatureVector) -> PredictorResult<ClassAttributions> {
        let mut out = ClassAttributions::zeros(self.num_classes, FEATURE_COUNT);
        for (weight, backend) in &self.parts {
            let part = backend.attribute(vector)?;
            if part.num_classes() != self.num_classes {
                return Err(PredictorError::Computation(format!(
                    "attribution covers {} classes, expected {}",
                    part.num_classes(),
                    self.num_classes
                )));
            }
            for (acc, scores) in out.per_class.iter_mut().zip(&part.per_class) {
                for (a, s) in acc.iter_mut().zip(scores) {
                    *a += weight * s;
                }
            }
            for (acc, base) in out.base_values.iter_mut().zip(&part.base_values) {
                *acc += weight * base;
            }
        }
        Ok(out)
    }
}

// ============================================================================
// TOP-K
// ============================================================================

/// Top-K slice of one distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopK {
    pub class_ids: Vec<usize>,
    /// Selected scores scaled to sum to 100 (left as-is when they sum to 0)
    pub scores: Vec<f64>,
    /// Selected scores before scaling
    pub raw: Vec<f64>,
    /// Length of the full distribution
    pub total_classes: usize,
}

/// Indices of the `k` largest scores, descending; equal scores keep
/// ascending class id. `k` larger than the distribution returns everything.
pub fn top_k_indices(scores: &[f64], k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    indices.truncate(k);
    indices
}

/// Scale to sum to 100; an all-zero selection is returned unchanged
pub fn normalize_percent(scores: &[f64]) -> Vec<f64> {
    let total: f64 = scores.iter().sum();
    if total > 0.0 {
        scores.iter().map(|s| s / total * 100.0).collect()
    } else {
        scores.to_vec()
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Descriptor for listing endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub family: ModelFamily,
    pub num_classes: usize,
    pub recommended: bool,
}

/// Immutable `model id → classifier` map
#[derive(Clone)]
pub struct ModelEnsemble {
    models: BTreeMap<String, Arc<dyn Classifier>>,
    num_classes: usize,
}

impl ModelEnsemble {
    pub fn new(num_classes: usize) -> Self {
        Self {
            models: BTreeMap::new(),
            num_classes,
        }
    }

    /// Register a classifier. The reserved ensemble id cannot be taken and
    /// every model must agree on the class count.
    pub fn register(&mut self, model_id: impl Into<String>, classifier: Arc<dyn Classifier>) -> PredictorResult<()> {
        let model_id = model_id.into();
        if model_id == ENSEMBLE_MODEL_ID {
            return Err(PredictorError::Configuration(format!(
                "'{}' is reserved for the weighted ensemble",
                ENSEMBLE_MODEL_ID
            )));
        }
        if classifier.num_classes() != self.num_classes {
            return Err(PredictorError::Configuration(format!(
                "model '{}' has {} classes, expected {}",
                model_id,
                classifier.num_classes(),
                self.num_classes
            )));
        }
        log::info!("Registered model '{}' ({})", model_id, classifier.family());
        self.models.insert(model_id, classifier);
        Ok(())
    }

    pub fn with_model(mut self, model_id: impl Into<String>, classifier: Arc<dyn Classifier>) -> PredictorResult<Self> {
        self.register(model_id, classifier)?;
        Ok(self)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    fn has_constituent(&self) -> bool {
        ENSEMBLE_WEIGHTS.iter().any(|(id, _)| self.models.contains_key(*id))
    }

    /// Registered ids, sorted, plus the ensemble id when it can be served
    pub fn available_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.models.keys().cloned().collect();
        if self.has_constituent() {
            ids.push(ENSEMBLE_MODEL_ID.to_string());
            ids.sort();
        }
        ids
    }

    pub fn list_models(&self) -> Vec<ModelInfo> {
        let mut infos: Vec<ModelInfo> = self
            .models
            .iter()
            .map(|(id, c)| ModelInfo {
                id: id.clone(),
                family: c.family(),
                num_classes: c.num_classes(),
                recommended: false,
            })
            .collect();
        if self.has_constituent() {
            infos.push(ModelInfo {
                id: ENSEMBLE_MODEL_ID.to_string(),
                family: ModelFamily::Ensemble,
                num_classes: self.num_classes,
                recommended: true,
            });
        }
        infos
    }

    /// Build the weighted composite over the registered constituents
    pub fn weighted_ensemble(&self) -> PredictorResult<WeightedEnsemble> {
        let members: Vec<Member> = ENSEMBLE_WEIGHTS
            .iter()
            .filter_map(|(id, weight)| {
                self.models.get(*id).map(|c| Member {
                    id: id.to_string(),
                    weight: *weight,
                    classifier: Arc::clone(c),
                })
            })
            .collect();

        if members.is_empty() {
            return Err(PredictorError::Configuration(format!(
                "ensemble requested but none of its constituents ({}) are loaded",
                ENSEMBLE_WEIGHTS.iter().map(|(id, _)| *id).collect::<Vec<_>>().join(", ")
            )));
        }

        Ok(WeightedEnsemble {
            members,
            num_classes: self.num_classes,
        })
    }

    /// Resolve a model id to a classifier
    pub fn classifier(&self, model_id: &str) -> PredictorResult<Arc<dyn Classifier>> {
        if model_id == ENSEMBLE_MODEL_ID {
            return Ok(Arc::new(self.weighted_ensemble()?));
        }
        self.models
            .get(model_id)
            .cloned()
            .ok_or_else(|| PredictorError::model_not_found(model_id, &self.available_ids()))
    }

    /// Full validated distribution for one model
    pub fn distribution(&self, model_id: &str, vector: &FeatureVector) -> PredictorResult<ClassDistribution> {
        let classifier = self.classifier(model_id)?;
        let dist = classifier.predict_proba(vector)?;
        if let Err(e) = dist.validate(model_id, self.num_classes) {
            log::warn!("Rejected output of model '{}': {}", model_id, e);
            return Err(e);
        }
        Ok(dist)
    }

    /// Top-K classes for one model, scores normalized to percentages
    pub fn predict(&self, model_id: &str, vector: &FeatureVector, k: usize) -> PredictorResult<TopK> {
        let dist = self.distribution(model_id, vector)?;
        let scores = dist.as_slice();
        let class_ids = top_k_indices(scores, k);
        let raw: Vec<f64> = class_ids.iter().map(|&i| scores[i]).collect();

        Ok(TopK {
            scores: normalize_percent(&raw),
            class_ids,
            raw,
            total_classes: scores.len(),
        })
    }
}

impl std::fmt::Debug for ModelEnsemble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelEnsemble")
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .field("num_classes", &self.num_classes)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{CATBOOST_MODEL_ID, LIGHTGBM_MODEL_ID, XGBOOST_MODEL_ID};
    use crate::logic::model::classifier::FixedClassifier;

    fn fixed(scores: Vec<f64>) -> Arc<dyn Classifier> {
        Arc::new(FixedClassifier::new(scores))
    }

    #[test]
    fn test_top_k_ties_ascending_class_id() {
        let scores = [0.1, 0.3, 0.3, 0.05, 0.3];
        assert_eq!(top_k_indices(&scores, 4), vec![1, 2, 4, 0]);
    }

    #[test]
    fn test_top_k_larger_than_distribution() {
        let scores = [0.2, 0.5];
        assert_eq!(top_k_indices(&scores, 10), vec![1, 0]);
        assert!(top_k_indices(&scores, 0).is_empty());
    }

    #[test]
    fn test_normalize_percent() {
        let n = normalize_percent(&[1.0, 3.0]);
        assert_eq!(n, vec![25.0, 75.0]);
        assert_eq!(normalize_percent(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_ensemble_weighted_sum() {
        let models = ModelEnsemble::new(2)
            .with_model(XGBOOST_MODEL_ID, fixed(vec![1.0, 0.0])).unwrap()
            .with_model(LIGHTGBM_MODEL_ID, fixed(vec![0.0, 1.0])).unwrap()
            .with_model(CATBOOST_MODEL_ID, fixed(vec![0.0, 1.0])).unwrap();

        let dist = models.distribution(ENSEMBLE_MODEL_ID, &FeatureVector::new()).unwrap();
        assert!((dist.as_slice()[0] - 0.4).abs() < 1e-12);
        assert!((dist.as_slice()[1] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_ensemble_partial_constituents_keep_weights() {
        let models = ModelEnsemble::new(2)
            .with_model(LIGHTGBM_MODEL_ID, fixed(vec![0.5, 0.5])).unwrap();
        let dist = models.distribution(ENSEMBLE_MODEL_ID, &FeatureVector::new()).unwrap();
        assert!((dist.as_slice()[0] - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_ensemble_without_constituents_is_configuration_error() {
        let models = ModelEnsemble::new(2).with_model("custom", fixed(vec![0.5, 0.5])).unwrap();
        let err = models.predict(ENSEMBLE_MODEL_ID, &FeatureVector::new(), 1).unwrap_err();
        assert!(matches!(err, PredictorError::Configuration(_)));
        assert!(!models.available_ids().contains(&ENSEMBLE_MODEL_ID.to_string()));
    }

    #[test]
    fn test_unknown_model_lists_available() {
        let models = ModelEnsemble::new(2)
            .with_model(XGBOOST_MODEL_ID, fixed(vec![0.5, 0.5])).unwrap()
            .with_model(CATBOOST_MODEL_ID, fixed(vec![0.5, 0.5])).unwrap();
        let err = models.predict("foo", &FeatureVector::new(), 1).unwrap_err();
        match err {
            PredictorError::NotFound(msg) => {
                assert!(msg.contains("'foo'"));
                assert!(msg.contains("catboost, ensemble, xgboost"));
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_shape_is_computation_error() {
        // Bypass registration checks with a model that lies about its size
        struct Liar;
        impl Classifier for Liar {
            fn family(&self) -> ModelFamily {
                ModelFamily::Custom
            }
            fn num_classes(&self) -> usize {
                3
            }
            fn predict_proba(&self, _: &FeatureVector) -> PredictorResult<ClassDistribution> {
                Ok(ClassDistribution::new(vec![1.0]))
            }
        }

        let models = ModelEnsemble::new(3).with_model(XGBOOST_MODEL_ID, Arc::new(Liar)).unwrap();
        let direct = models.predict(XGBOOST_MODEL_ID, &FeatureVector::new(), 1).unwrap_err();
        assert!(matches!(direct, PredictorError::Computation(_)));
        let combined = models.predict(ENSEMBLE_MODEL_ID, &FeatureVector::new(), 1).unwrap_err();
        assert!(matches!(combined, PredictorError::Computation(_)));
    }

    #[test]
    fn test_register_rejects_reserved_and_mismatched() {
        let mut models = ModelEnsemble::new(2);
        assert!(models.register(ENSEMBLE_MODEL_ID, fixed(vec![0.5, 0.5])).is_err());
        assert!(models.register("other", fixed(vec![0.5, 0.2, 0.3])).is_err());
    }

    #[test]
    fn test_predict_normalizes_top_k() {
        let models = ModelEnsemble::new(4)
            .with_model(XGBOOST_MODEL_ID, fixed(vec![0.1, 0.4, 0.2, 0.3])).unwrap();
        let top = models.predict(XGBOOST_MODEL_ID, &FeatureVector::new(), 2).unwrap();
        assert_eq!(top.class_ids, vec![1, 3]);
        assert_eq!(top.raw, vec![0.4, 0.3]);
        assert!((top.scores.iter().sum::<f64>() - 100.0).abs() < 1e-9);
        assert_eq!(top.total_classes, 4);
    }

    #[test]
    fn test_all_zero_selection_skips_normalization() {
        let models = ModelEnsemble::new(3).with_model("zeros", fixed(vec![0.0; 3])).unwrap();
        let top = models.predict("zeros", &FeatureVector::new(), 2).unwrap();
        assert_eq!(top.class_ids, vec![0, 1]);
        assert_eq!(top.scores, vec![0.0, 0.0]);
    }

    #[test]
    fn test_ensemble_importance() {
        let mut a = vec![0.0; FEATURE_COUNT];
        a[0] = 2.0;
        let mut b = vec![0.0; FEATURE_COUNT];
        b[1] = 5.0;
        let models = ModelEnsemble::new(2)
            .with_model(XGBOOST_MODEL_ID, Arc::new(FixedClassifier::new(vec![0.5, 0.5]).with_importance(a))).unwrap()
            .with_model(CATBOOST_MODEL_ID, Arc::new(FixedClassifier::new(vec![0.5, 0.5]).with_importance(b))).unwrap();

        let ensemble = models.weighted_ensemble().unwrap();
        let imp = ensemble.feature_importance().unwrap();
        assert!((imp[0] - 0.4).abs() < 1e-12);
        assert!((imp[1] - 0.3).abs() < 1e-12);
        assert!(ensemble.attribution_backend().is_none());
    }
}
