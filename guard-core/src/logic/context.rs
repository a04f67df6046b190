//! Predictor Context
//!
//! Everything loaded once at startup: feature names, encoders, models and
//! the optional guard directory. Built once, shared behind an `Arc`, never
//! mutated afterwards.

use std::sync::Arc;

use crate::logic::features::{EncoderStore, FeatureEngineer, FeatureNames};
use crate::logic::model::ModelEnsemble;
use crate::logic::ranking::GuardDirectory;

pub struct PredictorContext {
    engineer: FeatureEngineer,
    models: ModelEnsemble,
    directory: Option<Arc<dyn GuardDirectory>>,
}

impl PredictorContext {
    pub fn new(names: FeatureNames, encoders: EncoderStore, models: ModelEnsemble) -> Self {
        log::info!(
            "Predictor context: {} features (layout {:08x}), {} encoders, models {:?}",
            names.len(),
            names.layout_hash(),
            encoders.len(),
            models.available_ids()
        );
        Self {
            engineer: FeatureEngineer::new(Arc::new(names), encoders),
            models,
            directory: None,
        }
    }

    pub fn with_directory(mut self, directory: Arc<dyn GuardDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn engineer(&self) -> &FeatureEngineer {
        &self.engineer
    }

    pub fn feature_names(&self) -> &FeatureNames {
        self.engineer.feature_names()
    }

    pub fn models(&self) -> &ModelEnsemble {
        &self.models
    }

    pub fn num_classes(&self) -> usize {
        self.models.num_classes()
    }

    pub fn directory(&self) -> Option<&dyn GuardDirectory> {
        self.directory.as_deref()
    }
}

impl std::fmt::Debug for PredictorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictorContext")
            .field("engineer", &self.engineer)
            .field("models", &self.models)
            .field("directory", &self.directory.is_some())
            .finish()
    }
}
