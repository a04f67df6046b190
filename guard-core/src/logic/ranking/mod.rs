//! Ranking Module - top-K guards with metadata
//!
//! ## Structure
//! - `directory`: class id → relay metadata, placeholder synthesis
//! - `ranker`: the prediction pipeline

pub mod directory;
pub mod ranker;

pub use directory::{placeholder_guard, GuardDirectory, GuardInfo, StaticDirectory};
pub use ranker::{GuardMetadata, MetadataSource, Prediction, PredictionRanker, RankedPrediction};
