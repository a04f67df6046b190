//! Guard Predictor - the operations exposed to a boundary layer
//!
//! One shared context, one ranker, one explainer, one counterfactual engine.
//! Every operation is synchronous and CPU-bound.

use std::sync::Arc;

use super::context::PredictorContext;
use super::counterfactual::{CounterfactualEngine, CounterfactualResult, ThresholdSearch};
use super::explain::{ExplainabilityEngine, Explanation, ImportanceReport};
use super::features::{FeatureVector, Observation};
use super::model::ModelInfo;
use super::ranking::{Prediction, PredictionRanker};
use crate::error::PredictorResult;

#[derive(Debug)]
pub struct GuardPredictor {
    ctx: Arc<PredictorContext>,
    ranker: PredictionRanker,
    explainer: ExplainabilityEngine,
    counterfactual: CounterfactualEngine,
}

impl GuardPredictor {
    pub fn new(ctx: PredictorContext) -> Self {
        Self::from_shared(Arc::new(ctx))
    }

    pub fn from_shared(ctx: Arc<PredictorContext>) -> Self {
        let ranker = PredictionRanker::new(Arc::clone(&ctx));
        Self {
            explainer: ExplainabilityEngine::new(Arc::clone(&ctx)),
            counterfactual: CounterfactualEngine::new(ranker.clone()),
            ranker,
            ctx,
        }
    }

    pub fn context(&self) -> &PredictorContext {
        &self.ctx
    }

    pub fn list_models(&self) -> Vec<ModelInfo> {
        self.ctx.models().list_models()
    }

    pub fn predict(&self, observation: &Observation, model_id: &str, k: usize) -> PredictorResult<Prediction> {
        self.ranker.predict(observation, model_id, k)
    }

    pub fn explain(&self, vector: &FeatureVector, class_id: usize, model_id: &str) -> PredictorResult<Explanation> {
        self.explainer.explain(vector, class_id, model_id)
    }

    /// Engineer `observation` then explain `class_id`
    pub fn explain_observation(
        &self,
        observation: &Observation,
        class_id: usize,
        model_id: &str,
    ) -> PredictorResult<Explanation> {
        let engineered = self.ctx.engineer().engineer(observation);
        self.explainer.explain(&engineered.vector, class_id, model_id)
    }

    pub fn feature_importance(&self, model_id: &str) -> PredictorResult<ImportanceReport> {
        self.explainer.feature_importance(model_id)
    }

    pub fn counterfactual(
        &self,
        baseline: &Observation,
        modification: &Observation,
        model_id: &str,
    ) -> PredictorResult<CounterfactualResult> {
        self.counterfactual.analyze(baseline, modification, model_id)
    }

    pub fn critical_threshold(
        &self,
        observation: &Observation,
        feature: &str,
        range: (f64, f64),
        model_id: &str,
        steps: usize,
    ) -> PredictorResult<ThresholdSearch> {
        self.counterfactual
            .critical_threshold(observation, feature, range.0, range.1, model_id, steps)
    }
}
