//! Artifacts module - loads models, encoders, feature names and the guard
//! directory from disk into a predictor context
//!
//! ```text
//! <artifacts>/
//!   models/*.json        one model per file, tagged with "family"; id = file stem
//!   encoders.json        {encoder_name: {category: code}}      (optional)
//!   feature_names.json   [name, ...]                           (optional)
//!   guards.json          {class_id: {fingerprint, ip, ...}}    (optional)
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use guard_core::{
    CatBoostClassifier, Classifier, EncoderStore, FeatureNames, ForestSpec, LabelEncoder, LightGbmClassifier,
    ModelEnsemble, ObliviousSpec, PredictorContext, StaticDirectory, XgBoostClassifier,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// One model file
#[derive(Debug, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum ModelArtifact {
    Xgboost(ForestSpec),
    Lightgbm(ForestSpec),
    Catboost(ObliviousSpec),
}

impl ModelArtifact {
    pub fn into_classifier(self) -> guard_core::PredictorResult<Arc<dyn Classifier>> {
        Ok(match self {
            ModelArtifact::Xgboost(spec) => Arc::new(XgBoostClassifier::from_spec(spec)?),
            ModelArtifact::Lightgbm(spec) => Arc::new(LightGbmClassifier::from_spec(spec)?),
            ModelArtifact::Catboost(spec) => Arc::new(CatBoostClassifier::from_spec(spec)?),
        })
    }
}

/// Load everything under `dir`. Any unreadable or invalid artifact aborts
/// the load; absent optional files fall back to built-in defaults.
pub fn load_context(dir: &Path, num_classes: usize) -> Result<PredictorContext> {
    let names = match read_optional::<Vec<String>>(&dir.join("feature_names.json"))? {
        Some(list) => FeatureNames::new(list).context("Invalid feature_names.json")?,
        None => {
            tracing::info!("No feature_names.json, using built-in layout");
            FeatureNames::default()
        }
    };

    let encoders = match read_optional::<HashMap<String, LabelEncoder>>(&dir.join("encoders.json"))? {
        Some(map) => map.into_iter().fold(EncoderStore::new(), |store, (name, enc)| store.with_encoder(name, enc)),
        None => {
            tracing::warn!("No encoders.json, categorical features will be hash-bucketed");
            EncoderStore::new()
        }
    };

    let models = load_models(&dir.join("models"), num_classes)?;

    let mut context = PredictorContext::new(names, encoders, models);

    if let Some(directory) = read_optional::<StaticDirectory>(&dir.join("guards.json"))? {
        tracing::info!("Guard directory: {} entries", directory.len());
        context = context.with_directory(Arc::new(directory));
    }

    Ok(context)
}

fn load_models(dir: &Path, num_classes: usize) -> Result<ModelEnsemble> {
    let mut models = ModelEnsemble::new(num_classes);
    if !dir.is_dir() {
        tracing::warn!("Model directory {} not found, no models loaded", dir.display());
        return Ok(models);
    }

    let mut paths: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    paths.sort();

    for path in paths {
        let Some(model_id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            bail!("Model file {} has no usable name", path.display());
        };
        let artifact: ModelArtifact = read_json(&path)?;
        let classifier = artifact
            .into_classifier()
            .with_context(|| format!("Invalid model {}", path.display()))?;
        models
            .register(model_id.clone(), classifier)
            .with_context(|| format!("Cannot register model '{}'", model_id))?;
    }

    Ok(models)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}
