//! Explainability Engine
//!
//! Per-prediction attribution via each model's attribution backend, and
//! global feature importance. Backends are bound lazily per model id and
//! cached for the lifetime of the engine.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::RwLock;

use super::types::{Direction, Explanation, FeatureAttribution, FeatureImportance, ImportanceReport};
use crate::constants::{EXPLAIN_TEXT_FEATURES, EXPLAIN_TOP_FEATURES, FEATURE_COUNT, IMPORTANCE_TOP_FEATURES};
use crate::error::{PredictorError, PredictorResult};
use crate::logic::context::PredictorContext;
use crate::logic::features::FeatureVector;
use crate::logic::model::AttributionBackend;

pub struct ExplainabilityEngine {
    ctx: Arc<PredictorContext>,
    backends: RwLock<HashMap<String, Arc<dyn AttributionBackend>>>,
}

impl ExplainabilityEngine {
    pub fn new(ctx: Arc<PredictorContext>) -> Self {
        Self {
            ctx,
            backends: RwLock::new(HashMap::new()),
        }
    }

    /// Number of bound backends
    pub fn cached_backends(&self) -> usize {
        self.backends.read().len()
    }

    fn backend(&self, model_id: &str) -> PredictorResult<Arc<dyn AttributionBackend>> {
        if let Some(backend) = self.backends.read().get(model_id) {
            return Ok(Arc::clone(backend));
        }

        let classifier = self.ctx.models().classifier(model_id)?;
        let backend = classifier.attribution_backend().ok_or_else(|| {
            PredictorError::Configuration(format!(
                "Model '{}' ({}) has no attribution backend",
                model_id,
                classifier.family()
            ))
        })?;

        log::debug!("Bound attribution backend for '{}'", model_id);
        // Two racing binders build equivalent backends; keep the first
        let mut cache = self.backends.write();
        let entry = cache.entry(model_id.to_string()).or_insert(backend);
        Ok(Arc::clone(entry))
    }

    // ========================================================================
    // PER-PREDICTION
    // ========================================================================

    pub fn explain(&self, vector: &FeatureVector, class_id: usize, model_id: &str) -> PredictorResult<Explanation> {
        let backend = self.backend(model_id)?;
        let num_classes = self.ctx.num_classes();
        if class_id >= num_classes {
            return Err(PredictorError::class_not_found(class_id, num_classes));
        }

        let attributions = backend.attribute(vector)?;
        let (scores, base_value) = attributions
            .for_class(class_id)
            .ok_or_else(|| PredictorError::class_not_found(class_id, attributions.num_classes()))?;
        if scores.len() != FEATURE_COUNT || scores.iter().any(|s| !s.is_finite()) {
            return Err(PredictorError::Computation(format!(
                "Attribution for '{}' has {} entries, expected {} finite values",
                model_id,
                scores.len(),
                FEATURE_COUNT
            )));
        }

        let total_abs: f64 = scores.iter().map(|s| s.abs()).sum();
        let names = self.ctx.feature_names();
        let all: Vec<FeatureAttribution> = scores
            .iter()
            .enumerate()
            .map(|(i, &score)| FeatureAttribution {
                index: i,
                name: names.name(i).unwrap_or_default().to_string(),
                value: vector.get(i).unwrap_or(0.0),
                score,
                direction: Direction::of(score),
                contribution_percent: if total_abs > 0.0 { score.abs() / total_abs * 100.0 } else { 0.0 },
            })
            .collect();

        let top_features: Vec<FeatureAttribution> = rank_descending(scores.iter().map(|s| s.abs()))
            .into_iter()
            .take(EXPLAIN_TOP_FEATURES)
            .map(|i| all[i].clone())
            .collect();

        let explanation = render_explanation(class_id, &top_features);

        Ok(Explanation {
            class_id,
            model_id: model_id.to_string(),
            attributions: all,
            top_features,
            explanation,
            base_value,
        })
    }

    // ========================================================================
    // GLOBAL IMPORTANCE
    // ========================================================================

    pub fn feature_importance(&self, model_id: &str) -> PredictorResult<ImportanceReport> {
        let classifier = self.ctx.models().classifier(model_id)?;

        let (raw, available) = match classifier.feature_importance() {
            Some(values) if values.len() == FEATURE_COUNT => (values, true),
            Some(values) => {
                return Err(PredictorError::Computation(format!(
                    "Model '{}' reported {} importances, expected {}",
                    model_id,
                    values.len(),
                    FEATURE_COUNT
                )))
            }
            None => {
                log::debug!("Model '{}' exposes no importance; using zeros", model_id);
                (vec![0.0; FEATURE_COUNT], false)
            }
        };

        let clean: Vec<f64> = raw.iter().map(|v| if v.is_finite() && *v > 0.0 { *v } else { 0.0 }).collect();
        let total: f64 = clean.iter().sum();
        let percent: Vec<f64> = if total > 0.0 {
            clean.iter().map(|v| v / total * 100.0).collect()
        } else {
            clean
        };

        let names = self.ctx.feature_names();
        let features = rank_descending(percent.iter().copied())
            .into_iter()
            .take(IMPORTANCE_TOP_FEATURES)
            .enumerate()
            .map(|(rank, i)| FeatureImportance {
                rank: rank + 1,
                feature_name: names.name(i).unwrap_or_default().to_string(),
                importance: percent[i],
            })
            .collect();

        Ok(ImportanceReport {
            model_id: model_id.to_string(),
            available,
            features,
        })
    }
}

impl std::fmt::Debug for ExplainabilityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplainabilityEngine")
            .field("cached_backends", &self.cached_backends())
            .finish()
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Indices ordered by value descending, ties by ascending index
fn rank_descending(values: impl Iterator<Item = f64>) -> Vec<usize> {
    let values: Vec<f64> = values.collect();
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| values[b].total_cmp(&values[a]).then(a.cmp(&b)));
    indices
}

/// `guard_exit_bandwidth_product` → `Guard Exit Bandwidth Product`
pub fn readable_name(name: &str) -> String {
    name.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn render_explanation(class_id: usize, top: &[FeatureAttribution]) -> String {
    let mut text = format!("This guard (Guard_{:03}) was predicted because:\n\n", class_id);
    for feature in top.iter().take(EXPLAIN_TEXT_FEATURES) {
        let sign = feature.direction.symbol();
        let _ = writeln!(
            text,
            "{} {}: {:.2} ({}{:.1}% impact)",
            sign,
            readable_name(&feature.name),
            feature.value,
            sign,
            feature.contribution_percent
        );
    }
    text
}
