//! Feature Vector - Core data structure for model input
//!
//! Fixed-length, always finite. Values are addressed by index; names are
//! resolved through the [`FeatureNames`] the context was built with.

use serde::{Deserialize, Serialize};

use super::layout::FeatureNames;
use crate::constants::FEATURE_COUNT;

// ============================================================================
// FEATURE VECTOR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<f64>", from = "Vec<f64>")]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Create a new zeroed feature vector
    pub fn new() -> Self {
        Self { values: [0.0; FEATURE_COUNT] }
    }

    /// Create from raw values. Non-finite entries are replaced by 0.0.
    pub fn from_values(mut values: [f64; FEATURE_COUNT]) -> Self {
        for v in values.iter_mut() {
            if !v.is_finite() {
                *v = 0.0;
            }
        }
        Self { values }
    }

    /// Create from a Vec<f64> (truncates or zero-pads if wrong size)
    pub fn from_vec(values: Vec<f64>) -> Self {
        let mut array = [0.0f64; FEATURE_COUNT];
        for (i, v) in values.into_iter().take(FEATURE_COUNT).enumerate() {
            array[i] = v;
        }
        Self::from_values(array)
    }

    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    pub fn get_by_name(&self, names: &FeatureNames, name: &str) -> Option<f64> {
        names.index_of(name).and_then(|i| self.get(i))
    }

    /// Set feature by index. Out-of-range and non-finite writes are ignored.
    pub fn set(&mut self, index: usize, value: f64) {
        if index < FEATURE_COUNT && value.is_finite() {
            self.values[index] = value;
        }
    }

    /// Set feature by name. Returns false when the layout has no such name.
    pub fn set_by_name(&mut self, names: &FeatureNames, name: &str, value: f64) -> bool {
        match names.index_of(name) {
            Some(index) => {
                self.set(index, value);
                true
            }
            None => false,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// Named values for logging
    pub fn to_log_entry(&self, names: &FeatureNames) -> serde_json::Value {
        serde_json::json!({
            "layout_hash": names.layout_hash(),
            "named_values": names.as_slice().iter()
                .zip(self.values.iter())
                .map(|(name, value)| (name.clone(), *value))
                .collect::<std::collections::BTreeMap<_, _>>(),
        })
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::new()
    }
}

impl From<[f64; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f64; FEATURE_COUNT]) -> Self {
        Self::from_values(values)
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self::from_vec(values)
    }
}

impl From<FeatureVector> for Vec<f64> {
    fn from(vector: FeatureVector) -> Self {
        vector.values.to_vec()
    }
}

// ============================================================================
// TESTS
// ============================================================================
