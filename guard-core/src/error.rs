//! Error handling
//!
//! Typed failures raised by the ensemble, ranker and explainability engine.
//! The feature engineer never fails; its fallbacks are reported as
//! diagnostics instead (see `logic::features::FeatureFallback`).

use thiserror::Error;

pub type PredictorResult<T> = Result<T, PredictorError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictorError {
    /// Reserved for a strict observation mode. No observation field is
    /// mandatory today.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown model id or class id
    #[error("{0}")]
    NotFound(String),

    /// Ensemble without constituents, missing attribution backend,
    /// malformed feature layout
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A classifier produced output of the wrong shape or with invalid values
    #[error("computation error: {0}")]
    Computation(String),
}

impl PredictorError {
    pub fn model_not_found(model_id: &str, available: &[String]) -> Self {
        PredictorError::NotFound(format!(
            "Model '{}' not found. Available: [{}]",
            model_id,
            available.join(", ")
        ))
    }

    pub fn class_not_found(class_id: usize, num_classes: usize) -> Self {
        PredictorError::NotFound(format!(
            "Guard class {} not found (valid range 0..{})",
            class_id, num_classes
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_not_found_lists_available() {
        let err = PredictorError::model_not_found(
            "foo",
            &["catboost".to_string(), "xgboost".to_string()],
        );
        let msg = err.to_string();
        assert!(msg.contains("'foo'"));
        assert!(msg.contains("catboost, xgboost"));
    }

    #[test]
    fn test_class_not_found_message() {
        let err = PredictorError::class_not_found(900, 500);
        assert_eq!(err.to_string(), "Guard class 900 not found (valid range 0..500)");
    }
}
