//! Central Configuration Constants
//!
//! Single source of truth for pipeline defaults.
//! Observation defaults, ensemble weights and ranking limits all live here.

/// Number of features in every FeatureVector
pub const FEATURE_COUNT: usize = 75;

/// Default number of guard classes the models were trained on
pub const DEFAULT_NUM_CLASSES: usize = 500;

/// Denominator guard for bandwidth ratios
pub const RATIO_EPSILON: f64 = 0.001;

// ============================================
// Observation defaults
// ============================================

pub const DEFAULT_EXIT_COUNTRY: &str = "DE";
pub const DEFAULT_GUARD_COUNTRY: &str = "DE";
pub const DEFAULT_MIDDLE_COUNTRY: &str = "NL";
pub const DEFAULT_FINGERPRINT: &str = "UNKNOWN";

/// Exit bandwidth (MB/s) when the observation has none
pub const DEFAULT_BANDWIDTH: f64 = 7.5;

/// Guard bandwidth is estimated as exit bandwidth * this factor
pub const GUARD_BANDWIDTH_FACTOR: f64 = 1.2;

/// Middle bandwidth is estimated as exit bandwidth * this factor
pub const MIDDLE_BANDWIDTH_FACTOR: f64 = 1.1;

pub const DEFAULT_SETUP_DURATION_SEC: f64 = 2.0;
pub const DEFAULT_TOTAL_BYTES: f64 = 500_000.0;
pub const DEFAULT_CIRCUIT_LIFETIME_SEC: f64 = 60.0;
pub const DEFAULT_STREAM_COUNT: f64 = 3.0;

/// Hour used when the timestamp cannot be parsed
pub const FALLBACK_HOUR: u32 = 14;

/// Weekday (0 = Monday) used when the timestamp cannot be parsed
pub const FALLBACK_WEEKDAY: u32 = 3;

/// Hash-bucket range for country codes without an encoder
pub const COUNTRY_HASH_BUCKETS: u64 = 50;

/// Hash-bucket range for fingerprints without an encoder
pub const FINGERPRINT_HASH_BUCKETS: u64 = 500;

// ============================================
// Ensemble
// ============================================

/// Reserved model id for the weighted ensemble
pub const ENSEMBLE_MODEL_ID: &str = "ensemble";

pub const XGBOOST_MODEL_ID: &str = "xgboost";
pub const LIGHTGBM_MODEL_ID: &str = "lightgbm";
pub const CATBOOST_MODEL_ID: &str = "catboost";

/// Constituent weights. Must sum to exactly 1.0.
pub const ENSEMBLE_WEIGHTS: [(&str, f64); 3] = [
    (XGBOOST_MODEL_ID, 0.4),
    (LIGHTGBM_MODEL_ID, 0.3),
    (CATBOOST_MODEL_ID, 0.3),
];

// ============================================
// Ranking / explanation limits
// ============================================

pub const DEFAULT_TOP_K: usize = 10;

/// Counterfactual runs always rank this many guards per side
pub const COUNTERFACTUAL_TOP_K: usize = 10;

/// Number of rank changes reported in a comparison
pub const COMPARISON_LIMIT: usize = 10;

/// Features returned in an explanation
pub const EXPLAIN_TOP_FEATURES: usize = 10;

/// Features rendered in the explanation text
pub const EXPLAIN_TEXT_FEATURES: usize = 5;

/// Features returned by global importance
pub const IMPORTANCE_TOP_FEATURES: usize = 20;

/// Sensitivity tiers on |top-1 confidence delta| (percentage points)
pub const SENSITIVITY_HIGH_THRESHOLD: f64 = 5.0;
pub const SENSITIVITY_MEDIUM_THRESHOLD: f64 = 2.0;

/// Placeholder guard countries, indexed by class id modulo length
pub const PLACEHOLDER_COUNTRIES: [&str; 10] =
    ["DE", "US", "GB", "FR", "NL", "CA", "SE", "CH", "AT", "JP"];
