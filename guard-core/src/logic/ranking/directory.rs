//! Guard Directory - class id → relay metadata
//!
//! The directory is optional and best-effort. A miss never fails a
//! prediction; a deterministic placeholder is synthesized instead.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::constants::PLACEHOLDER_COUNTRIES;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardInfo {
    #[serde(default)]
    pub fingerprint: Option<String>,
    pub ip: String,
    pub country: String,
    pub bandwidth: f64,
}

pub trait GuardDirectory: Send + Sync {
    fn lookup(&self, class_id: usize) -> Option<GuardInfo>;
}

/// Directory held fully in memory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticDirectory {
    guards: HashMap<usize, GuardInfo>,
}

impl StaticDirectory {
    pub fn new(guards: HashMap<usize, GuardInfo>) -> Self {
        Self { guards }
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl GuardDirectory for StaticDirectory {
    fn lookup(&self, class_id: usize) -> Option<GuardInfo> {
        self.guards.get(&class_id).cloned()
    }
}

/// Placeholder metadata seeded by class id.
///
/// Not cryptographic; only reproducible for repeated calls with the same id.
pub fn placeholder_guard(class_id: usize) -> GuardInfo {
    let mut rng = StdRng::seed_from_u64(class_id as u64);
    let bandwidth: f64 = rng.gen_range(1.0..10.0);

    GuardInfo {
        fingerprint: None,
        ip: format!("192.168.{}.{}", class_id / 255, class_id % 255),
        country: PLACEHOLDER_COUNTRIES[class_id % PLACEHOLDER_COUNTRIES.len()].to_string(),
        bandwidth: (bandwidth * 100.0).round() / 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_deterministic() {
        assert_eq!(placeholder_guard(42), placeholder_guard(42));
        let g = placeholder_guard(42);
        assert_eq!(g.ip, "192.168.0.42");
        assert_eq!(g.country, "GB");
        assert!((1.0..=10.0).contains(&g.bandwidth));
    }

    #[test]
    fn test_placeholder_ip_layout() {
        assert_eq!(placeholder_guard(300).ip, "192.168.1.45");
        assert_eq!(placeholder_guard(0).country, "DE");
    }

    #[test]
    fn test_static_directory_from_json() {
        let json = r#"{"7": {"fingerprint": "ABC", "ip": "10.0.0.7", "country": "SE", "bandwidth": 4.2}}"#;
        let directory: StaticDirectory = serde_json::from_str(json).unwrap();
        assert_eq!(directory.lookup(7).unwrap().country, "SE");
        assert!(directory.lookup(8).is_none());
    }
}
