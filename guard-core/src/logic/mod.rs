//! Logic Module - prediction pipeline & engines
//!
//! ## Structure
//! - `features/` - Observation → FeatureVector
//! - `model/` - classifier adapters, weighted ensemble, top-K
//! - `ranking/` - ranked guards with metadata
//! - `explain/` - attribution and feature importance
//! - `counterfactual/` - what-if analysis
//! - `context` / `service` - shared state and the exposed operations

pub mod features;
pub mod model;
pub mod ranking;
pub mod explain;
pub mod counterfactual;
pub mod context;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;
