//! Categorical Encoding
//!
//! Encoders come from the training pipeline (one label encoder per
//! categorical column). When an encoder is missing, values are hashed into a
//! bounded bucket instead.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub const GUARD_COUNTRY_ENCODER: &str = "guard_country_encoder";
pub const MIDDLE_COUNTRY_ENCODER: &str = "middle_country_encoder";
pub const EXIT_COUNTRY_ENCODER: &str = "exit_country_encoder";
pub const GUARD_FINGERPRINT_ENCODER: &str = "guard_fingerprint_encoder";
pub const EXIT_FINGERPRINT_ENCODER: &str = "exit_fingerprint_encoder";

// ============================================================================
// ENCODER TRAIT
// ============================================================================

/// Maps a category to its integer code. `None` means the category was not
/// seen during training.
pub trait Encoder: Send + Sync {
    fn encode(&self, value: &str) -> Option<i64>;
}

/// Label encoder: fixed category → code table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelEncoder {
    classes: HashMap<String, i64>,
}

impl LabelEncoder {
    pub fn new(classes: HashMap<String, i64>) -> Self {
        Self { classes }
    }

    /// Codes assigned in the given order, starting at 0
    pub fn from_classes<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let classes = classes
            .into_iter()
            .enumerate()
            .map(|(i, c)| (c.into(), i as i64))
            .collect();
        Self { classes }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Encoder for LabelEncoder {
    fn encode(&self, value: &str) -> Option<i64> {
        self.classes.get(value).copied()
    }
}

// ============================================================================
// ENCODER STORE
// ============================================================================

/// Named encoders, immutable once the context is built
#[derive(Clone, Default)]
pub struct EncoderStore {
    encoders: HashMap<String, Arc<dyn Encoder>>,
}

impl EncoderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoder(mut self, name: impl Into<String>, encoder: impl Encoder + 'static) -> Self {
        self.encoders.insert(name.into(), Arc::new(encoder));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, encoder: Arc<dyn Encoder>) {
        self.encoders.insert(name.into(), encoder);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Encoder> {
        self.encoders.get(name).map(|e| e.as_ref())
    }

    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.encoders.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for EncoderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncoderStore").field("encoders", &self.names()).finish()
    }
}

// ============================================================================
// HASH FALLBACK
// ============================================================================

/// Hash-bucket encoder used when no trained encoder exists.
///
/// Seeded randomly once per process: codes are stable for the lifetime of
/// one process and NOT across restarts.
#[derive(Clone, Default)]
pub struct HashBucketer {
    state: RandomState,
}

impl HashBucketer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket in `0..buckets`
    pub fn bucket(&self, value: &str, buckets: u64) -> i64 {
        if buckets == 0 {
            return 0;
        }
        (self.state.hash_one(value) % buckets) as i64
    }
}

impl std::fmt::Debug for HashBucketer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HashBucketer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_encoder() {
        let encoder = LabelEncoder::from_classes(["DE", "NL", "US"]);
        assert_eq!(encoder.encode("DE"), Some(0));
        assert_eq!(encoder.encode("US"), Some(2));
        assert_eq!(encoder.encode("FR"), None);
    }

    #[test]
    fn test_label_encoder_from_json() {
        let encoder: LabelEncoder = serde_json::from_str(r#"{"DE": 4, "US": 9}"#).unwrap();
        assert_eq!(encoder.encode("US"), Some(9));
        assert_eq!(encoder.len(), 2);
    }

    #[test]
    fn test_store_lookup() {
        let store = EncoderStore::new()
            .with_encoder(EXIT_COUNTRY_ENCODER, LabelEncoder::from_classes(["DE"]));
        assert!(store.get(EXIT_COUNTRY_ENCODER).is_some());
        assert!(store.get(GUARD_COUNTRY_ENCODER).is_none());
        assert_eq!(store.names(), vec![EXIT_COUNTRY_ENCODER.to_string()]);
    }

    #[test]
    fn test_hash_bucket_bounded_and_stable() {
        let bucketer = HashBucketer::new();
        for value in ["DE", "US", "A1B2C3", ""] {
            let b = bucketer.bucket(value, 50);
            assert!((0..50).contains(&b));
            assert_eq!(b, bucketer.bucket(value, 50));
        }
        assert_eq!(bucketer.bucket("DE", 0), 0);
    }
}
