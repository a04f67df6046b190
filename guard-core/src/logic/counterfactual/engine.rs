//! Counterfactual Engine
//!
//! What-if analysis: the modification is merged over the baseline and both
//! observations go through the same ranker, at the same clock instant.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use super::types::{
    Comparison, CounterfactualResult, FeatureSensitivity, RankChange, SensitivityReport, SensitivityTier,
    ThresholdSearch,
};
use crate::constants::{
    COMPARISON_LIMIT, COUNTERFACTUAL_TOP_K, SENSITIVITY_HIGH_THRESHOLD, SENSITIVITY_MEDIUM_THRESHOLD,
};
use crate::error::{PredictorError, PredictorResult};
use crate::logic::features::Observation;
use crate::logic::ranking::{Prediction, PredictionRanker, RankedPrediction};

/// Bisection steps when the caller does not choose
pub const DEFAULT_THRESHOLD_STEPS: usize = 20;
const MAX_THRESHOLD_STEPS: usize = 64;

#[derive(Debug, Clone)]
pub struct CounterfactualEngine {
    ranker: PredictionRanker,
}

impl CounterfactualEngine {
    pub fn new(ranker: PredictionRanker) -> Self {
        Self { ranker }
    }

    pub fn analyze(
        &self,
        baseline: &Observation,
        modification: &Observation,
        model_id: &str,
    ) -> PredictorResult<CounterfactualResult> {
        self.analyze_at(baseline, modification, model_id, Utc::now())
    }

    pub fn analyze_at(
        &self,
        baseline: &Observation,
        modification: &Observation,
        model_id: &str,
        now: DateTime<Utc>,
    ) -> PredictorResult<CounterfactualResult> {
        let modified_input = baseline.merged(modification);

        let original = self.ranker.predict_at(baseline, model_id, COUNTERFACTUAL_TOP_K, now)?;
        let modified = self.ranker.predict_at(&modified_input, model_id, COUNTERFACTUAL_TOP_K, now)?;

        let comparison = compare(&original.predictions, &modified.predictions);
        let sensitivity = sensitivity(&original, &modified, baseline, modification);

        log::debug!(
            "Counterfactual on '{}' over {:?}: top changed = {}, overall impact {:.2}",
            model_id,
            modification.keys().collect::<Vec<_>>(),
            comparison.top_guard_changed,
            sensitivity.overall_impact
        );

        Ok(CounterfactualResult {
            baseline: original,
            modified,
            comparison,
            sensitivity,
            modified_features: modification.clone(),
        })
    }

    /// Bisect `[low, high]` on one numeric observation field for the
    /// smallest value whose rank-1 guard differs from the one at `low`.
    /// Only a change between the two ends is searched for; a guard that
    /// changes and changes back inside the range is not detected.
    pub fn critical_threshold(
        &self,
        observation: &Observation,
        feature: &str,
        low: f64,
        high: f64,
        model_id: &str,
        steps: usize,
    ) -> PredictorResult<ThresholdSearch> {
        if !low.is_finite() || !high.is_finite() || low >= high {
            return Err(PredictorError::Validation(format!(
                "threshold range must be finite with low < high (got {}..{})",
                low, high
            )));
        }
        if feature.is_empty() {
            return Err(PredictorError::Validation("feature name is empty".to_string()));
        }

        let steps = steps.clamp(1, MAX_THRESHOLD_STEPS);
        let now = Utc::now();
        let mut evaluations = 0usize;
        let mut top_at = |value: f64| -> PredictorResult<Option<usize>> {
            evaluations += 1;
            let probe = observation.clone().with(feature, value);
            let prediction = self.ranker.predict_at(&probe, model_id, 1, now)?;
            Ok(prediction.top().map(|p| p.class_id))
        };

        let baseline_guard = top_at(low)?;
        let high_guard = top_at(high)?;

        let mut search = ThresholdSearch {
            feature: feature.to_string(),
            low,
            high,
            baseline_guard,
            threshold: None,
            guard_at_threshold: None,
            evaluations: 0,
        };

        if high_guard != baseline_guard {
            // Invariant: top(lo) == baseline, top(hi) != baseline
            let (mut lo, mut hi, mut guard_hi) = (low, high, high_guard);
            for _ in 0..steps {
                let mid = lo + (hi - lo) / 2.0;
                if mid <= lo || mid >= hi {
                    break;
                }
                let guard = top_at(mid)?;
                if guard == baseline_guard {
                    lo = mid;
                } else {
                    hi = mid;
                    guard_hi = guard;
                }
            }
            search.threshold = Some(hi);
            search.guard_at_threshold = guard_hi;
        }

        search.evaluations = evaluations;
        Ok(search)
    }
}

// ============================================================================
// COMPARISON
// ============================================================================

pub fn compare(original: &[RankedPrediction], modified: &[RankedPrediction]) -> Comparison {
    let by_class = |ranking: &[RankedPrediction]| -> BTreeMap<usize, (usize, f64)> {
        ranking.iter().map(|p| (p.class_id, (p.rank, p.confidence))).collect()
    };
    let before = by_class(original);
    let after = by_class(modified);

    let classes: BTreeSet<usize> = before.keys().chain(after.keys()).copied().collect();
    let mut changes: Vec<RankChange> = classes
        .into_iter()
        .map(|class_id| {
            let b = before.get(&class_id);
            let a = after.get(&class_id);
            let rank_change = match (b, a) {
                (Some((rb, _)), Some((ra, _))) => Some(*rb as i64 - *ra as i64),
                _ => None,
            };
            RankChange {
                class_id,
                original_rank: b.map(|(r, _)| *r),
                modified_rank: a.map(|(r, _)| *r),
                rank_change,
                confidence_change: a.map_or(0.0, |(_, c)| *c) - b.map_or(0.0, |(_, c)| *c),
            }
        })
        .collect();

    let both: Vec<f64> = changes.iter().filter(|c| c.on_both_sides()).map(|c| c.confidence_change).collect();
    let average_confidence_change = if both.is_empty() {
        None
    } else {
        Some(both.iter().sum::<f64>() / both.len() as f64)
    };

    // class ids are already ascending, so a stable sort keeps them as the tie-break
    changes.sort_by(|x, y| y.confidence_change.abs().total_cmp(&x.confidence_change.abs()));
    changes.truncate(COMPARISON_LIMIT);

    Comparison {
        rank_changes: changes,
        top_guard_changed: original.first().map(|p| p.class_id) != modified.first().map(|p| p.class_id),
        average_confidence_change,
    }
}

// ============================================================================
// SENSITIVITY
// ============================================================================

pub fn tier(delta: f64) -> SensitivityTier {
    let magnitude = delta.abs();
    if magnitude > SENSITIVITY_HIGH_THRESHOLD {
        SensitivityTier::High
    } else if magnitude > SENSITIVITY_MEDIUM_THRESHOLD {
        SensitivityTier::Medium
    } else {
        SensitivityTier::Low
    }
}

/// Every modified feature gets the rank-1 confidence delta; the change is
/// not isolated per feature.
fn sensitivity(
    original: &Prediction,
    modified: &Prediction,
    baseline: &Observation,
    modification: &Observation,
) -> SensitivityReport {
    let top_confidence = |p: &Prediction| p.top().map_or(0.0, |t| t.confidence);
    let delta = top_confidence(modified) - top_confidence(original);

    let feature_sensitivities: Vec<FeatureSensitivity> = modification
        .fields()
        .iter()
        .map(|(feature, value)| FeatureSensitivity {
            feature: feature.clone(),
            original_value: baseline.get(feature).cloned(),
            new_value: value.clone(),
            confidence_impact: delta,
            sensitivity: tier(delta),
        })
        .collect();

    let overall_impact = feature_sensitivities.iter().map(|s| s.confidence_impact.abs()).sum();

    SensitivityReport {
        feature_sensitivities,
        overall_impact,
    }
}
