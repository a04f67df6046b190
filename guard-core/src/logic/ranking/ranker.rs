//! Prediction Ranker
//!
//! Observation → engineered features → top-K distribution → ranked guards
//! with metadata.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::directory::{placeholder_guard, GuardInfo};
use crate::error::PredictorResult;
use crate::logic::context::PredictorContext;
use crate::logic::features::{FeatureFallback, FeatureVector, Observation};

// ============================================================================
// OUTPUT TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataSource {
    Directory,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardMetadata {
    pub fingerprint: String,
    pub ip: String,
    pub country: String,
    pub bandwidth: f64,
    pub source: MetadataSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPrediction {
    /// 1-based
    pub rank: usize,
    #[serde(rename = "guard_index")]
    pub class_id: usize,
    /// Share of the top-K, in percent
    pub confidence: f64,
    /// Unnormalized model score
    pub probability: f64,
    pub metadata: GuardMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub predictions: Vec<RankedPrediction>,
    pub model_used: String,
    pub total_guards: usize,
    pub top_k: usize,
    /// Feature-engineering fallbacks taken for this observation
    pub fallbacks: Vec<FeatureFallback>,
}

impl Prediction {
    pub fn top(&self) -> Option<&RankedPrediction> {
        self.predictions.first()
    }
}

// ============================================================================
// RANKER
// ============================================================================

#[derive(Debug, Clone)]
pub struct PredictionRanker {
    ctx: Arc<PredictorContext>,
}

impl PredictionRanker {
    pub fn new(ctx: Arc<PredictorContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &PredictorContext {
        &self.ctx
    }

    pub fn predict(&self, observation: &Observation, model_id: &str, k: usize) -> PredictorResult<Prediction> {
        self.predict_at(observation, model_id, k, Utc::now())
    }

    /// Same as [`predict`](Self::predict) with an explicit instant for a
    /// missing timestamp
    pub fn predict_at(
        &self,
        observation: &Observation,
        model_id: &str,
        k: usize,
        now: DateTime<Utc>,
    ) -> PredictorResult<Prediction> {
        let engineered = self.ctx.engineer().engineer_at(observation, now);
        let (predictions, total_guards) = self.rank_vector(&engineered.vector, model_id, k)?;

        log::debug!(
            "Predicted {} guards with '{}' (top: {:?})",
            predictions.len(),
            model_id,
            predictions.first().map(|p| p.class_id)
        );

        Ok(Prediction {
            predictions,
            model_used: model_id.to_string(),
            total_guards,
            top_k: k,
            fallbacks: engineered.fallbacks,
        })
    }

    /// Rank an already engineered vector. Returns the ranking and the size
    /// of the full distribution.
    pub fn rank_vector(
        &self,
        vector: &FeatureVector,
        model_id: &str,
        k: usize,
    ) -> PredictorResult<(Vec<RankedPrediction>, usize)> {
        let top = self.ctx.models().predict(model_id, vector, k)?;

        let predictions = top
            .class_ids
            .iter()
            .zip(top.scores.iter().zip(top.raw.iter()))
            .enumerate()
            .map(|(i, (&class_id, (&confidence, &probability)))| RankedPrediction {
                rank: i + 1,
                class_id,
                confidence,
                probability,
                metadata: self.metadata(class_id),
            })
            .collect();

        Ok((predictions, top.total_classes))
    }

    fn metadata(&self, class_id: usize) -> GuardMetadata {
        let found = self.ctx.directory().and_then(|d| d.lookup(class_id));
        let (info, source) = match found {
            Some(info) => (info, MetadataSource::Directory),
            None => (placeholder_guard(class_id), MetadataSource::Placeholder),
        };
        let GuardInfo { fingerprint, ip, country, bandwidth } = info;

        GuardMetadata {
            fingerprint: fingerprint.unwrap_or_else(|| format!("Guard_{:03}", class_id)),
            ip,
            country,
            bandwidth,
            source,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
