//! Model Module - classifier adapters and the model ensemble
//!
//! One adapter per model family behind the `Classifier` trait; the weighted
//! ensemble is a composite implementing the same trait.

pub mod classifier;
pub mod forest;
pub mod oblivious;
pub mod ensemble;

// Re-export common types
pub use classifier::{
    AttributionBackend, ClassAttributions, ClassDistribution, Classifier, FixedClassifier, ModelFamily,
};
pub use forest::{ForestSpec, LightGbmClassifier, XgBoostClassifier};
pub use oblivious::{CatBoostClassifier, ObliviousSpec};
pub use ensemble::{ModelEnsemble, ModelInfo, TopK, WeightedEnsemble};
