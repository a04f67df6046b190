//! Decision Forest - XGBoost / LightGBM adapters
//!
//! Both families export multi-class models as one group of binary regression
//! trees per class; class margins are the base score plus the sum of leaf
//! values, and probabilities are the softmax of the margins. They differ in
//! which way a value equal to the threshold goes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::classifier::{
    softmax, AttributionBackend, ClassAttributions, ClassDistribution, Classifier, ModelFamily,
};
use crate::constants::FEATURE_COUNT;
use crate::error::{PredictorError, PredictorResult};
use crate::logic::features::FeatureVector;

// ============================================================================
// ARTIFACT FORMAT
// ============================================================================

/// One node of an exported tree. A node with `feature` set is a split;
/// otherwise it is a leaf carrying `leaf`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    #[serde(default)]
    pub feature: Option<usize>,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub left: usize,
    #[serde(default)]
    pub right: usize,
    #[serde(default)]
    pub leaf: f64,
    /// Training hessian/sample weight reaching this node
    #[serde(default = "default_cover")]
    pub cover: f64,
    /// Loss reduction of this split
    #[serde(default)]
    pub gain: f64,
}

fn default_cover() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSpec {
    /// Guard class this tree contributes to
    pub class: usize,
    pub nodes: Vec<NodeSpec>,
}

/// Base margin: one value for all classes, or one per class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BaseScore {
    Shared(f64),
    PerClass(Vec<f64>),
}

impl Default for BaseScore {
    fn default() -> Self {
        BaseScore::Shared(0.0)
    }
}

impl BaseScore {
    pub(crate) fn expand(&self, num_classes: usize) -> PredictorResult<Vec<f64>> {
        match self {
            BaseScore::Shared(v) => Ok(vec![*v; num_classes]),
            BaseScore::PerClass(values) if values.len() == num_classes => Ok(values.clone()),
            BaseScore::PerClass(values) => Err(PredictorError::Configuration(format!(
                "base_score has {} entries, expected {}",
                values.len(),
                num_classes
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestSpec {
    pub num_classes: usize,
    #[serde(default)]
    pub base_score: BaseScore,
    pub trees: Vec<TreeSpec>,
}

// ============================================================================
// VALIDATED FOREST
// ============================================================================

/// Which branch a value equal to the threshold takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitRule {
    /// `x < threshold` goes left (XGBoost)
    LessThan,
    /// `x <= threshold` goes left (LightGBM)
    LessOrEqual,
}

impl SplitRule {
    fn goes_left(self, value: f64, threshold: f64) -> bool {
        match self {
            SplitRule::LessThan => value < threshold,
            SplitRule::LessOrEqual => value <= threshold,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        gain: f64,
    },
    Leaf,
}

#[derive(Debug, Clone)]
struct Tree {
    class: usize,
    nodes: Vec<Node>,
    /// Cover-weighted expected output below each node
    expected: Vec<f64>,
}

impl Tree {
    fn from_spec(index: usize, spec: TreeSpec, num_classes: usize) -> PredictorResult<Self> {
        let bad = |msg: String| PredictorError::Configuration(format!("tree {}: {}", index, msg));

        if spec.class >= num_classes {
            return Err(bad(format!("class {} out of range", spec.class)));
        }
        if spec.nodes.is_empty() {
            return Err(bad("no nodes".to_string()));
        }

        let n = spec.nodes.len();
        let mut nodes = Vec::with_capacity(n);
        for (i, node) in spec.nodes.iter().enumerate() {
            match node.feature {
                Some(feature) => {
                    if feature >= FEATURE_COUNT {
                        return Err(bad(format!("node {} splits on feature {}", i, feature)));
                    }
                    // Children after parents keeps the tree acyclic and lets
                    // expected values be filled in one reverse pass
                    if node.left <= i || node.right <= i || node.left >= n || node.right >= n {
                        return Err(bad(format!("node {} has invalid children", i)));
                    }
                    if !node.threshold.is_finite() {
                        return Err(bad(format!("node {} has non-finite threshold", i)));
                    }
                    nodes.push(Node::Split {
                        feature,
                        threshold: node.threshold,
                        left: node.left,
                        right: node.right,
                        gain: node.gain.max(0.0),
                    });
                }
                None => {
                    if !node.leaf.is_finite() {
                        return Err(bad(format!("leaf {} has non-finite value", i)));
                    }
                    nodes.push(Node::Leaf);
                }
            }
        }

        let mut expected = vec![0.0; n];
        for i in (0..n).rev() {
            expected[i] = match nodes[i] {
                Node::Leaf => spec.nodes[i].leaf,
                Node::Split { left, right, .. } => {
                    let wl = spec.nodes[left].cover.max(0.0);
                    let wr = spec.nodes[right].cover.max(0.0);
                    if wl + wr > 0.0 {
                        (wl * expected[left] + wr * expected[right]) / (wl + wr)
                    } else {
                        (expected[left] + expected[right]) / 2.0
                    }
                }
            };
        }

        Ok(Self { class: spec.class, nodes, expected })
    }

    fn leaf_value(&self, x: &[f64], rule: SplitRule) -> f64 {
        let mut i = 0;
        while let Node::Split { feature, threshold, left, right, .. } = self.nodes[i] {
            i = if rule.goes_left(x[feature], threshold) { left } else { right };
        }
        self.expected[i]
    }

    /// Credit each split on the decision path with the change in expected
    /// output it causes
    fn attribute_into(&self, x: &[f64], rule: SplitRule, contributions: &mut [f64]) -> f64 {
        let mut i = 0;
        while let Node::Split { feature, threshold, left, right, .. } = self.nodes[i] {
            let next = if rule.goes_left(x[feature], threshold) { left } else { right };
            contributions[feature] += self.expected[next] - self.expected[i];
            i = next;
        }
        self.expected[0]
    }
}

#[derive(Debug, Clone)]
pub struct DecisionForest {
    num_classes: usize,
    base_score: Vec<f64>,
    trees: Vec<Tree>,
    rule: SplitRule,
}

impl DecisionForest {
    pub fn from_spec(spec: ForestSpec, rule: SplitRule) -> PredictorResult<Self> {
        if spec.num_classes == 0 {
            return Err(PredictorError::Configuration("forest has zero classes".to_string()));
        }
        let base_score = spec.base_score.expand(spec.num_classes)?;
        let trees = spec
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| Tree::from_spec(i, t, spec.num_classes))
            .collect::<PredictorResult<Vec<_>>>()?;

        Ok(Self {
            num_classes: spec.num_classes,
            base_score,
            trees,
            rule,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn margins(&self, vector: &FeatureVector) -> Vec<f64> {
        let x = vector.as_slice();
        let mut margins = self.base_score.clone();
        for tree in &self.trees {
            margins[tree.class] += tree.leaf_value(x, self.rule);
        }
        margins
    }

    /// Total split gain per feature
    pub fn gain_importance(&self) -> Vec<f64> {
        let mut importance = vec![0.0; FEATURE_COUNT];
        for tree in &self.trees {
            for node in &tree.nodes {
                if let Node::Split { feature, gain, .. } = node {
                    importance[*feature] += gain;
                }
            }
        }
        importance
    }

    pub fn attributions(&self, vector: &FeatureVector) -> ClassAttributions {
        let x = vector.as_slice();
        let mut out = ClassAttributions::zeros(self.num_classes, FEATURE_COUNT);
        out.base_values.clone_from(&self.base_score);
        for tree in &self.trees {
            let base = tree.attribute_into(x, self.rule, &mut out.per_class[tree.class]);
            out.base_values[tree.class] += base;
        }
        out
    }
}

// ============================================================================
// FAMILY ADAPTERS
// ============================================================================

/// Attribution backend over a shared forest
struct ForestAttribution(Arc<DecisionForest>);

impl AttributionBackend for ForestAttribution {
    fn attribute(&self, vector: &FeatureVector) -> PredictorResult<ClassAttributions> {
        Ok(self.0.attributions(vector))
    }
}

macro_rules! forest_adapter {
    ($name:ident, $family:expr, $rule:expr) => {
        #[derive(Debug, Clone)]
        pub struct $name {
            forest: Arc<DecisionForest>,
        }

        impl $name {
            pub fn from_spec(spec: ForestSpec) -> PredictorResult<Self> {
                Ok(Self {
                    forest: Arc::new(DecisionForest::from_spec(spec, $rule)?),
                })
            }

            pub fn forest(&self) -> &DecisionForest {
                &self.forest
            }
        }

        impl Classifier for $name {
            fn family(&self) -> ModelFamily {
                $family
            }

            fn num_classes(&self) -> usize {
                self.forest.num_classes()
            }

            fn predict_proba(&self, vector: &FeatureVector) -> PredictorResult<ClassDistribution> {
                Ok(ClassDistribution::new(softmax(&self.forest.margins(vector))))
            }

            fn feature_importance(&self) -> Option<Vec<f64>> {
                Some(self.forest.gain_importance())
            }

            fn attribution_backend(&self) -> Option<Arc<dyn AttributionBackend>> {
                Some(Arc::new(ForestAttribution(Arc::clone(&self.forest))))
            }
        }
    };
}

forest_adapter!(XgBoostClassifier, ModelFamily::XgBoost, SplitRule::LessThan);
forest_adapter!(LightGbmClassifier, ModelFamily::LightGbm, SplitRule::LessOrEqual);

// ============================================================================
// TESTS
// ============================================================================
