//! Features Module - Feature Engineering
//!
//! Observation → fixed-length FeatureVector.
//!
//! ## Structure
//! - `layout`: feature names, default layout, layout hash
//! - `vector`: the FeatureVector type
//! - `observation`: raw key/value input
//! - `encoding`: label encoders and the hash-bucket fallback
//! - `engineer`: the mapping itself

pub mod layout;
pub mod vector;
pub mod observation;
pub mod encoding;
pub mod engineer;

#[cfg(test)]
mod tests;

pub use layout::{FeatureNames, LayoutInfo, DEFAULT_FEATURE_LAYOUT, FEATURE_VERSION};
pub use vector::FeatureVector;
pub use observation::{Field, Observation};
pub use encoding::{Encoder, EncoderStore, HashBucketer, LabelEncoder};
pub use engineer::{EngineeredFeatures, FeatureEngineer, FeatureFallback};
