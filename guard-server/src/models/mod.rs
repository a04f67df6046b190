//! Request / response models

pub mod prediction;
pub mod counterfactual;

pub use prediction::*;
pub use counterfactual::*;
