//! Configuration module

use std::env;
use std::path::PathBuf;

use guard_core::constants::{DEFAULT_NUM_CLASSES, DEFAULT_TOP_K, ENSEMBLE_MODEL_ID};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Directory holding models/, encoders.json, feature_names.json, guards.json
    pub artifacts_dir: PathBuf,

    /// Model used when a request names none
    pub default_model: String,

    /// Ranking length when a request names none
    pub default_top_k: usize,

    /// Largest ranking a request may ask for
    pub max_top_k: usize,

    /// Number of guard classes every model must produce
    pub num_classes: usize,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let number = |key: &str, default: usize| lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default);

        let default_top_k = number("DEFAULT_TOP_K", DEFAULT_TOP_K).max(1);

        Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),

            artifacts_dir: lookup("ARTIFACTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("models")),

            default_model: lookup("DEFAULT_MODEL")
                .unwrap_or_else(|| ENSEMBLE_MODEL_ID.to_string()),

            default_top_k,

            max_top_k: number("MAX_TOP_K", 50).max(default_top_k),

            num_classes: number("NUM_CLASSES", DEFAULT_NUM_CLASSES).max(1),

            environment: lookup("ENVIRONMENT")
                .unwrap_or_else(|| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
