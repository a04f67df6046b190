//! Explain Module - attribution and feature importance
//!
//! ## Structure
//! - `types`: explanation and importance records
//! - `engine`: backend binding, attribution ranking, text rendering

pub mod engine;
pub mod types;


pub use engine::ExplainabilityEngine;
pub use types::{Direction, Explanation, FeatureAttribution, FeatureImportance, ImportanceReport};
