//! Feature Layout - Centralized Feature Definition
//!
//! **This file controls the feature schema**
//!
//! ## Rules:
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//!
//! The models are trained against a `feature_names.json` artifact. When it
//! is present the server loads it into a [`FeatureNames`]; otherwise the
//! built-in [`DEFAULT_FEATURE_LAYOUT`] is used.

use std::collections::HashMap;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::constants::FEATURE_COUNT;
use crate::error::{PredictorError, PredictorResult};

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
/// MUST be incremented when the default layout changes
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// DEFAULT LAYOUT
// ============================================================================

/// Feature names in the order the training pipeline emits them
pub const DEFAULT_FEATURE_LAYOUT: [&str; FEATURE_COUNT] = [
    // === Bandwidth (0-12) ===
    "guard_bandwidth",
    "middle_bandwidth",
    "exit_bandwidth",
    "guard_to_middle_bw_ratio",
    "guard_to_exit_bw_ratio",
    "middle_to_exit_bw_ratio",
    "total_circuit_bandwidth",
    "min_bandwidth",
    "max_bandwidth",
    "std_bandwidth",
    "bandwidth_range",
    "avg_bandwidth",
    "bandwidth_cv",
    // === Geography (13-17) ===
    "same_country_guard_middle",
    "same_country_guard_exit",
    "same_country_middle_exit",
    "all_same_country",
    "country_diversity_score",
    // === Historical aggregates (18-25) ===
    "guard_usage_frequency",
    "middle_usage_frequency",
    "exit_usage_frequency",
    "guard_exit_cooccurrence_freq",
    "guard_avg_bandwidth_all_circuits",
    "guard_country_preference_score",
    "middle_avg_bandwidth",
    "exit_avg_bandwidth",
    // === Encoded categoricals (26-30) ===
    "guard_country_encoded",
    "middle_country_encoded",
    "exit_country_encoded",
    "guard_fingerprint_encoded",
    "exit_fingerprint_encoded",
    // === Interactions (31-35) ===
    "bandwidth_setup_time_interaction",
    "total_bandwidth_bytes_interaction",
    "guard_exit_bandwidth_product",
    "country_diversity_bandwidth_interaction",
    "hour_bandwidth_interaction",
    // === Temporal (36-47) ===
    "circuit_build_latency_ms",
    "hour_of_day",
    "day_of_week",
    "is_weekend",
    "is_night",
    "circuit_lifetime_sec",
    "time_since_last_circuit",
    "cell_count_actual",
    "cell_interarrival_mean_ms",
    "stream_setup_latency_ms",
    "idle_time_ratio",
    "closure_reason_encoded",
    // === Traffic (48-57) ===
    "bytes_sent_guard_to_middle",
    "bytes_recv_middle_to_guard",
    "bytes_sent_asymmetry_ratio",
    "bandwidth_utilization",
    "traffic_burst_score",
    "congestion_indicator",
    "stream_count",
    "stream_multiplexing_count",
    "bytes_per_second",
    "bytes_to_bandwidth_ratio",
    // === Topology (58-65) ===
    "guard_as_number",
    "exit_as_number",
    "same_as_flag",
    "as_path_length",
    "relay_family_size",
    "exit_policy_match_score",
    "guard_stability_index",
    "network_distance_estimate",
    // === Transforms (66-69) ===
    "log_guard_bandwidth",
    "log_total_bytes",
    "squared_setup_duration",
    "bandwidth_entropy",
    // === Reserved (70-74), always zero ===
    "reserved_70",
    "reserved_71",
    "reserved_72",
    "reserved_73",
    "reserved_74",
];

// ============================================================================
// FEATURE NAMES
// ============================================================================

/// Ordered, immutable list of exactly `FEATURE_COUNT` feature names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureNames {
    names: Vec<String>,
    index: HashMap<String, usize>,
    hash: u32,
}

impl FeatureNames {
    /// Build from an artifact-provided list.
    ///
    /// Fails with a configuration error on the wrong length or on duplicate
    /// names, since either would silently shift every index.
    pub fn new(names: Vec<String>) -> PredictorResult<Self> {
        if names.len() != FEATURE_COUNT {
            return Err(PredictorError::Configuration(format!(
                "feature name list has {} entries, expected {}",
                names.len(),
                FEATURE_COUNT
            )));
        }

        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(PredictorError::Configuration(format!(
                    "duplicate feature name '{}'",
                    name
                )));
            }
        }

        let hash = compute_layout_hash(&names);
        Ok(Self { names, index, hash })
    }

    /// Get feature index by name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Get feature name by index
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// CRC32 of the ordered names
    pub fn layout_hash(&self) -> u32 {
        self.hash
    }

    pub fn info(&self) -> LayoutInfo {
        LayoutInfo {
            version: FEATURE_VERSION,
            hash: self.hash,
            feature_count: self.names.len(),
            feature_names: self.names.clone(),
        }
    }
}

impl Default for FeatureNames {
    fn default() -> Self {
        let names: Vec<String> = DEFAULT_FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect();
        let index = names.iter().enumerate().map(|(i, n)| (n.clone(), i)).collect();
        let hash = compute_layout_hash(&names);
        Self { names, index, hash }
    }
}

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// Compute CRC32 hash of a feature layout
/// Used to detect layout mismatches between artifacts and callers
pub fn compute_layout_hash<S: AsRef<str>>(names: &[S]) -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[FEATURE_VERSION]);

    for name in names {
        hasher.update(name.as_ref().as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

/// Complete layout information for serialization/logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

// ============================================================================
// TESTS
// ============================================================================
