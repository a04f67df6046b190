//! Oblivious Trees - CatBoost adapter
//!
//! Every level of a symmetric tree applies the same (feature, border) split,
//! so a leaf index is just the bit pattern of the level decisions. Each leaf
//! holds one value per class.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::classifier::{
    softmax, AttributionBackend, ClassAttributions, ClassDistribution, Classifier, ModelFamily,
};
use super::forest::BaseScore;
use crate::constants::FEATURE_COUNT;
use crate::error::{PredictorError, PredictorResult};
use crate::logic::features::FeatureVector;

/// Deepest tree accepted from an artifact
pub const MAX_DEPTH: usize = 16;

// ============================================================================
// ARTIFACT FORMAT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObliviousSplit {
    pub feature: usize,
    pub border: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObliviousTreeSpec {
    /// Level 0 first; level `l` decides bit `l` of the leaf index
    pub splits: Vec<ObliviousSplit>,
    /// `2^depth` leaves, each with one value per class
    pub leaf_values: Vec<Vec<f64>>,
    /// Training weight per leaf; uniform when absent
    #[serde(default)]
    pub leaf_weights: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObliviousSpec {
    pub num_classes: usize,
    #[serde(default)]
    pub base_score: BaseScore,
    pub trees: Vec<ObliviousTreeSpec>,
    /// Exported importance (PredictionValuesChange). The family has no
    /// importance capability when this is absent.
    #[serde(default)]
    pub feature_importances: Option<Vec<f64>>,
}

// ============================================================================
// VALIDATED MODEL
// ============================================================================

#[derive(Debug, Clone)]
struct ObliviousTree {
    splits: Vec<ObliviousSplit>,
    leaf_values: Vec<Vec<f64>>,
    leaf_weights: Vec<f64>,
}

impl ObliviousTree {
    fn from_spec(index: usize, spec: ObliviousTreeSpec, num_classes: usize) -> PredictorResult<Self> {
        let bad = |msg: String| PredictorError::Configuration(format!("oblivious tree {}: {}", index, msg));

        let depth = spec.splits.len();
        if depth > MAX_DEPTH {
            return Err(bad(format!("depth {} exceeds {}", depth, MAX_DEPTH)));
        }
        if let Some(split) = spec.splits.iter().find(|s| s.feature >= FEATURE_COUNT || !s.border.is_finite()) {
            return Err(bad(format!("invalid split on feature {}", split.feature)));
        }

        let leaves = 1usize << depth;
        if spec.leaf_values.len() != leaves {
            return Err(bad(format!("{} leaves, expected {}", spec.leaf_values.len(), leaves)));
        }
        if spec
            .leaf_values
            .iter()
            .any(|l| l.len() != num_classes || l.iter().any(|v| !v.is_finite()))
        {
            return Err(bad(format!("every leaf needs {} finite values", num_classes)));
        }

        let leaf_weights = match spec.leaf_weights {
            Some(w) if w.len() == leaves => w.into_iter().map(|v| v.max(0.0)).collect(),
            Some(w) => return Err(bad(format!("{} leaf weights, expected {}", w.len(), leaves))),
            None => vec![1.0; leaves],
        };

        Ok(Self {
            splits: spec.splits,
            leaf_values: spec.leaf_values,
            leaf_weights,
        })
    }

    fn bit(&self, level: usize, x: &[f64]) -> usize {
        let split = &self.splits[level];
        usize::from(x[split.feature] > split.border)
    }

    fn leaf_index(&self, x: &[f64]) -> usize {
        (0..self.splits.len()).fold(0, |index, level| index | (self.bit(level, x) << level))
    }

    /// Weighted mean of every leaf whose low `level` bits equal `prefix`
    fn expected(&self, level: usize, prefix: usize, num_classes: usize) -> Vec<f64> {
        let mask = (1usize << level) - 1;
        let mut sum = vec![0.0; num_classes];
        let mut total_weight = 0.0;
        let mut count = 0usize;
        let mut plain = vec![0.0; num_classes];

        for (i, values) in self.leaf_values.iter().enumerate() {
            if i & mask != prefix {
                continue;
            }
            let w = self.leaf_weights[i];
            total_weight += w;
            count += 1;
            for c in 0..num_classes {
                sum[c] += w * values[c];
                plain[c] += values[c];
            }
        }

        if total_weight > 0.0 {
            sum.iter().map(|s| s / total_weight).collect()
        } else {
            let n = count.max(1) as f64;
            plain.iter().map(|s| s / n).collect()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObliviousForest {
    num_classes: usize,
    base_score: Vec<f64>,
    trees: Vec<ObliviousTree>,
    importances: Option<Vec<f64>>,
}

impl ObliviousForest {
    pub fn from_spec(spec: ObliviousSpec) -> PredictorResult<Self> {
        if spec.num_classes == 0 {
            return Err(PredictorError::Configuration("oblivious forest has zero classes".to_string()));
        }
        let base_score = spec.base_score.expand(spec.num_classes)?;
        let trees = spec
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| ObliviousTree::from_spec(i, t, spec.num_classes))
            .collect::<PredictorResult<Vec<_>>>()?;

        if let Some(imp) = &spec.feature_importances {
            if imp.len() != FEATURE_COUNT || imp.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(PredictorError::Configuration(format!(
                    "feature_importances must hold {} nonnegative values",
                    FEATURE_COUNT
                )));
            }
        }

        Ok(Self {
            num_classes: spec.num_classes,
            base_score,
            trees,
            importances: spec.feature_importances,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn margins(&self, vector: &FeatureVector) -> Vec<f64> {
        let x = vector.as_slice();
        let mut margins = self.base_score.clone();
        for tree in &self.trees {
            let leaf = &tree.leaf_values[tree.leaf_index(x)];
            for (m, v) in margins.iter_mut().zip(leaf) {
                *m += v;
            }
        }
        margins
    }

    /// Walk the levels; each decision moves the expectation from the leaves
    /// consistent with the previous prefix to those consistent with the new
    /// one, and that change is credited to the level's feature.
    pub fn attributions(&self, vector: &FeatureVector) -> ClassAttributions {
        let x = vector.as_slice();
        let c = self.num_classes;
        let mut out = ClassAttributions::zeros(c, FEATURE_COUNT);
        out.base_values.clone_from(&self.base_score);

        for tree in &self.trees {
            let mut prefix = 0usize;
            let mut current = tree.expected(0, 0, c);
            for (b, e) in out.base_values.iter_mut().zip(&current) {
                *b += e;
            }

            for level in 0..tree.splits.len() {
                prefix |= tree.bit(level, x) << level;
                let next = tree.expected(level + 1, prefix, c);
                let feature = tree.splits[level].feature;
                for class in 0..c {
                    out.per_class[class][feature] += next[class] - current[class];
                }
                current = next;
            }
        }
        out
    }
}

// ============================================================================
// FAMILY ADAPTER
// ============================================================================

struct ObliviousAttribution(Arc<ObliviousForest>);

impl AttributionBackend for ObliviousAttribution {
    fn attribute(&self, vector: &FeatureVector) -> PredictorResult<ClassAttributions> {
        Ok(self.0.attributions(vector))
    }
}

#[derive(Debug, Clone)]
pub struct CatBoostClassifier {
    forest: Arc<ObliviousForest>,
}

impl CatBoostClassifier {
    pub fn from_spec(spec: ObliviousSpec) -> PredictorResult<Self> {
        Ok(Self {
            forest: Arc::new(ObliviousForest::from_spec(spec)?),
        })
    }
}

impl Classifier for CatBoostClassifier {
    fn family(&self) -> ModelFamily {
        ModelFamily::CatBoost
    }

    fn num_classes(&self) -> usize {
        self.forest.num_classes()
    }

    fn predict_proba(&self, vector: &FeatureVector) -> PredictorResult<ClassDistribution> {
        Ok(ClassDistribution::new(softmax(&self.forest.margins(vector))))
    }

    fn feature_importance(&self) -> Option<Vec<f64>> {
        self.forest.importances.clone()
    }

    fn attribution_backend(&self) -> Option<Arc<dyn AttributionBackend>> {
        Some(Arc::new(ObliviousAttribution(Arc::clone(&self.forest))))
    }
}

// ============================================================================
// TESTS
// ============================================================================
