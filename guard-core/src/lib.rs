//! Guard Core - guard-node prediction engine
//!
//! Pure computation: no file, network or process access. Artifacts are
//! loaded by the caller and handed in through [`PredictorContext`].

pub mod constants;
pub mod error;
pub mod logic;

pub use error::{PredictorError, PredictorResult};
pub use logic::context::PredictorContext;
pub use logic::counterfactual::{CounterfactualEngine, CounterfactualResult, ThresholdSearch};
pub use logic::explain::{ExplainabilityEngine, Explanation, ImportanceReport};
pub use logic::features::{
    EncoderStore, EngineeredFeatures, FeatureEngineer, FeatureFallback, FeatureNames, FeatureVector, LabelEncoder,
    Observation,
};
pub use logic::model::{
    CatBoostClassifier, Classifier, ForestSpec, LightGbmClassifier, ModelEnsemble, ModelFamily, ModelInfo,
    ObliviousSpec, XgBoostClassifier,
};
pub use logic::ranking::{GuardDirectory, GuardInfo, Prediction, PredictionRanker, StaticDirectory};
pub use logic::service::GuardPredictor;
