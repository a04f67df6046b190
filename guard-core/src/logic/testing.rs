//! Shared test fixtures: small but input-sensitive models over 500 classes

use std::sync::Arc;

use serde_json::Value;

use crate::constants::{CATBOOST_MODEL_ID, DEFAULT_NUM_CLASSES, LIGHTGBM_MODEL_ID, XGBOOST_MODEL_ID};
use crate::logic::context::PredictorContext;
use crate::logic::features::encoding::{
    EXIT_COUNTRY_ENCODER, GUARD_COUNTRY_ENCODER, MIDDLE_COUNTRY_ENCODER,
};
use crate::logic::features::{EncoderStore, FeatureNames, LabelEncoder, Observation};
use crate::logic::model::forest::{BaseScore, NodeSpec, TreeSpec};
use crate::logic::model::oblivious::{ObliviousSplit, ObliviousTreeSpec};
use crate::logic::model::{
    CatBoostClassifier, ForestSpec, LightGbmClassifier, ModelEnsemble, ObliviousSpec, XgBoostClassifier,
};
use crate::logic::ranking::GuardDirectory;

pub const COUNTRIES: [&str; 10] = ["DE", "US", "NL", "GB", "FR", "SE", "CH", "JP", "CA", "AT"];

// guard_bandwidth, exit_bandwidth, total_circuit_bandwidth, exit_country_encoded, hour_of_day
const F_GUARD_BW: usize = 0;
const F_EXIT_BW: usize = 2;
const F_TOTAL_BW: usize = 6;
const F_EXIT_COUNTRY: usize = 28;
const F_HOUR: usize = 37;

pub fn observation(value: Value) -> Observation {
    match value {
        Value::Object(map) => Observation::from(map),
        other => panic!("fixture observation must be an object, got {}", other),
    }
}

fn stump(class: usize, feature: usize, threshold: f64, left: f64, right: f64) -> TreeSpec {
    let leaf = |value: f64, cover: f64| NodeSpec {
        feature: None,
        threshold: 0.0,
        left: 0,
        right: 0,
        leaf: value,
        cover,
        gain: 0.0,
    };
    TreeSpec {
        class,
        nodes: vec![
            NodeSpec {
                feature: Some(feature),
                threshold,
                left: 1,
                right: 2,
                leaf: 0.0,
                cover: 4.0,
                gain: 1.0 + (class % 4) as f64,
            },
            leaf(left, 1.0 + (class % 3) as f64),
            leaf(right, 2.0),
        ],
    }
}

/// One stump per class; `salt` varies leaf values between families
pub fn forest_spec(num_classes: usize, salt: usize) -> ForestSpec {
    let trees = (0..num_classes)
        .map(|c| {
            let (feature, threshold) = match c % 5 {
                0 => (F_EXIT_BW, 1.0 + (c % 13) as f64),
                1 => (F_EXIT_COUNTRY, (c % 10) as f64 + 0.5),
                2 => (F_GUARD_BW, 1.0 + (c % 13) as f64 * 1.2),
                3 => (F_HOUR, (c % 24) as f64),
                _ => (F_TOTAL_BW, 3.0 * (1.0 + (c % 13) as f64)),
            };
            let left = ((c * 7 + salt) % 11) as f64 / 5.0;
            let right = ((c * 3 + salt * 2) % 17) as f64 / 5.0;
            stump(c, feature, threshold, left, right)
        })
        .collect();

    ForestSpec {
        num_classes,
        base_score: BaseScore::Shared(0.1),
        trees,
    }
}

pub fn oblivious_spec(num_classes: usize) -> ObliviousSpec {
    let leaves = |mult: usize, modulo: usize| -> Vec<Vec<f64>> {
        (0..4)
            .map(|leaf| {
                (0..num_classes)
                    .map(|c| ((c * (leaf + mult)) % modulo) as f64 / 10.0)
                    .collect()
            })
            .collect()
    };

    ObliviousSpec {
        num_classes,
        base_score: BaseScore::Shared(0.0),
        trees: vec![
            ObliviousTreeSpec {
                splits: vec![
                    ObliviousSplit { feature: F_EXIT_BW, border: 10.0 },
                    ObliviousSplit { feature: F_EXIT_COUNTRY, border: 1.5 },
                ],
                leaf_values: leaves(3, 23),
                leaf_weights: None,
            },
            ObliviousTreeSpec {
                splits: vec![
                    ObliviousSplit { feature: F_HOUR, border: 12.0 },
                    ObliviousSplit { feature: F_GUARD_BW, border: 9.0 },
                ],
                leaf_values: leaves(5, 29),
                leaf_weights: Some(vec![1.0, 2.0, 3.0, 4.0]),
            },
        ],
        feature_importances: None,
    }
}

pub fn fixture_models() -> ModelEnsemble {
    let n = DEFAULT_NUM_CLASSES;
    let xgb = XgBoostClassifier::from_spec(forest_spec(n, 1)).expect("xgboost fixture");
    let lgb = LightGbmClassifier::from_spec(forest_spec(n, 4)).expect("lightgbm fixture");
    let cat = CatBoostClassifier::from_spec(oblivious_spec(n)).expect("catboost fixture");

    ModelEnsemble::new(n)
        .with_model(XGBOOST_MODEL_ID, Arc::new(xgb))
        .and_then(|m| m.with_model(LIGHTGBM_MODEL_ID, Arc::new(lgb)))
        .and_then(|m| m.with_model(CATBOOST_MODEL_ID, Arc::new(cat)))
        .expect("fixture ensemble")
}

pub fn fixture_encoders() -> EncoderStore {
    EncoderStore::new()
        .with_encoder(GUARD_COUNTRY_ENCODER, LabelEncoder::from_classes(COUNTRIES))
        .with_encoder(MIDDLE_COUNTRY_ENCODER, LabelEncoder::from_classes(COUNTRIES))
        .with_encoder(EXIT_COUNTRY_ENCODER, LabelEncoder::from_classes(COUNTRIES))
}

pub fn fixture_context_with(directory: Option<Arc<dyn GuardDirectory>>) -> Arc<PredictorContext> {
    let ctx = PredictorContext::new(FeatureNames::default(), fixture_encoders(), fixture_models());
    Arc::new(match directory {
        Some(d) => ctx.with_directory(d),
        None => ctx,
    })
}

pub fn fixture_context() -> Arc<PredictorContext> {
    fixture_context_with(None)
}
