//! Feature Engineer
//!
//! Observation → FeatureVector. Never fails: every missing or malformed
//! field degrades to its default, and each non-trivial fallback is recorded
//! as a [`FeatureFallback`] so callers can see which path fired.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::encoding::{
    EncoderStore, HashBucketer, EXIT_COUNTRY_ENCODER, EXIT_FINGERPRINT_ENCODER,
    GUARD_COUNTRY_ENCODER, GUARD_FINGERPRINT_ENCODER, MIDDLE_COUNTRY_ENCODER,
};
use super::layout::FeatureNames;
use super::observation::{Field, Observation};
use super::vector::FeatureVector;
use crate::constants::*;

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// A fallback path taken while engineering features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureFallback {
    /// No timestamp given; the clock instant was used
    TimestampNow,
    /// Timestamp present but unparsable; fixed hour/weekday used
    TimestampUnparsable { raw: String },
    /// Field present but not a usable value; default used
    InvalidValue { field: String },
    /// Encoder exists but has never seen this category; code 0 used
    EncoderMiss { encoder: String, value: String },
    /// No encoder loaded; process-local hash bucket used
    HashBucket { encoder: String },
    /// A derived quantity overflowed; slot left at 0
    NonFiniteDerived { feature: String },
}

/// Engineered vector plus the fallbacks that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct EngineeredFeatures {
    pub vector: FeatureVector,
    pub fallbacks: Vec<FeatureFallback>,
}

// ============================================================================
// ENGINEER
// ============================================================================

#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    names: Arc<FeatureNames>,
    encoders: EncoderStore,
    bucketer: HashBucketer,
}

impl FeatureEngineer {
    pub fn new(names: Arc<FeatureNames>, encoders: EncoderStore) -> Self {
        Self {
            names,
            encoders,
            bucketer: HashBucketer::new(),
        }
    }

    pub fn feature_names(&self) -> &FeatureNames {
        &self.names
    }

    pub fn encoders(&self) -> &EncoderStore {
        &self.encoders
    }

    /// Engineer features using the current time as the default timestamp
    pub fn engineer(&self, observation: &Observation) -> EngineeredFeatures {
        self.engineer_at(observation, Utc::now())
    }

    /// Engineer features with an explicit clock instant for a missing
    /// timestamp. Pure with respect to (observation, now) except for the
    /// hash-bucket fallback.
    pub fn engineer_at(&self, observation: &Observation, now: DateTime<Utc>) -> EngineeredFeatures {
        let mut ctx = Extraction {
            observation,
            fallbacks: Vec::new(),
            named: Vec::with_capacity(FEATURE_COUNT),
        };

        // Base inputs
        let exit_country = ctx.text("exit_country", DEFAULT_EXIT_COUNTRY);
        let guard_country = ctx.text("guard_country", DEFAULT_GUARD_COUNTRY);
        let middle_country = ctx.text("middle_country", DEFAULT_MIDDLE_COUNTRY);
        let guard_fp = ctx.text("guard_fingerprint", DEFAULT_FINGERPRINT);
        let exit_fp = ctx.text("exit_fingerprint", DEFAULT_FINGERPRINT);

        let bandwidth = ctx.non_negative("bandwidth", DEFAULT_BANDWIDTH);
        let guard_bw = ctx.non_negative("guard_bandwidth", bandwidth * GUARD_BANDWIDTH_FACTOR);
        let middle_bw = ctx.non_negative("middle_bandwidth", bandwidth * MIDDLE_BANDWIDTH_FACTOR);
        let exit_bw = bandwidth;

        let setup = ctx.non_negative("circuit_setup_duration", DEFAULT_SETUP_DURATION_SEC);
        let total_bytes = ctx.non_negative("total_bytes", DEFAULT_TOTAL_BYTES);
        let lifetime = ctx.non_negative("circuit_lifetime", DEFAULT_CIRCUIT_LIFETIME_SEC);
        let stream_count = ctx.non_negative("stream_count", DEFAULT_STREAM_COUNT);

        let (hour, weekday) = ctx.time_of_week(now);
        let hour = hour as f64;
        let weekday = weekday as f64;

        // Bandwidth
        let total_bw = guard_bw + middle_bw + exit_bw;
        let min_bw = guard_bw.min(middle_bw).min(exit_bw);
        let max_bw = guard_bw.max(middle_bw).max(exit_bw);
        let avg_bw = total_bw / 3.0;
        let std_bw = population_std(&[guard_bw, middle_bw, exit_bw]);

        ctx.put("guard_bandwidth", guard_bw);
        ctx.put("middle_bandwidth", middle_bw);
        ctx.put("exit_bandwidth", exit_bw);
        ctx.put("guard_to_middle_bw_ratio", guard_bw / (middle_bw + RATIO_EPSILON));
        ctx.put("guard_to_exit_bw_ratio", guard_bw / (exit_bw + RATIO_EPSILON));
        ctx.put("middle_to_exit_bw_ratio", middle_bw / (exit_bw + RATIO_EPSILON));
        ctx.put("total_circuit_bandwidth", total_bw);
        ctx.put("min_bandwidth", min_bw);
        ctx.put("max_bandwidth", max_bw);
        ctx.put("std_bandwidth", std_bw);
        ctx.put("bandwidth_range", max_bw - min_bw);
        ctx.put("avg_bandwidth", avg_bw);
        ctx.put("bandwidth_cv", std_bw / (avg_bw + RATIO_EPSILON));

        // Geography
        let diversity = {
            let mut distinct = vec![guard_country.as_str(), middle_country.as_str(), exit_country.as_str()];
            distinct.sort_unstable();
            distinct.dedup();
            distinct.len() as f64
        };
        ctx.put("same_country_guard_middle", flag(guard_country == middle_country));
        ctx.put("same_country_guard_exit", flag(guard_country == exit_country));
        ctx.put("same_country_middle_exit", flag(middle_country == exit_country));
        ctx.put("all_same_country", flag(diversity == 1.0));
        ctx.put("country_diversity_score", diversity);

        // Historical aggregates: typical-pattern estimates, no history store
        ctx.put("guard_usage_frequency", 0.5);
        ctx.put("middle_usage_frequency", 0.5);
        ctx.put("exit_usage_frequency", 0.5);
        ctx.put("guard_exit_cooccurrence_freq", 0.1);
        ctx.put("guard_avg_bandwidth_all_circuits", guard_bw * 1.05);
        ctx.put("guard_country_preference_score", 0.3);
        ctx.put("middle_avg_bandwidth", middle_bw * 1.02);
        ctx.put("exit_avg_bandwidth", exit_bw * 0.98);

        // Encoded categoricals
        let guard_country_code =
            self.encode(&mut ctx.fallbacks, GUARD_COUNTRY_ENCODER, &guard_country, COUNTRY_HASH_BUCKETS);
        let middle_country_code =
            self.encode(&mut ctx.fallbacks, MIDDLE_COUNTRY_ENCODER, &middle_country, COUNTRY_HASH_BUCKETS);
        let exit_country_code =
            self.encode(&mut ctx.fallbacks, EXIT_COUNTRY_ENCODER, &exit_country, COUNTRY_HASH_BUCKETS);
        let guard_fp_code =
            self.encode(&mut ctx.fallbacks, GUARD_FINGERPRINT_ENCODER, &guard_fp, FINGERPRINT_HASH_BUCKETS);
        let exit_fp_code =
            self.encode(&mut ctx.fallbacks, EXIT_FINGERPRINT_ENCODER, &exit_fp, FINGERPRINT_HASH_BUCKETS);

        ctx.put("guard_country_encoded", guard_country_code as f64);
        ctx.put("middle_country_encoded", middle_country_code as f64);
        ctx.put("exit_country_encoded", exit_country_code as f64);
        ctx.put("guard_fingerprint_encoded", guard_fp_code as f64);
        ctx.put("exit_fingerprint_encoded", exit_fp_code as f64);

        // Interactions
        ctx.put("bandwidth_setup_time_interaction", bandwidth * setup);
        ctx.put("total_bandwidth_bytes_interaction", total_bw * total_bytes / 1_000_000.0);
        ctx.put("guard_exit_bandwidth_product", guard_bw * exit_bw);
        ctx.put("country_diversity_bandwidth_interaction", diversity * total_bw);
        ctx.put("hour_bandwidth_interaction", hour * guard_bw);

        // Temporal
        ctx.put("circuit_build_latency_ms", setup * 1000.0);
        ctx.put("hour_of_day", hour);
        ctx.put("day_of_week", weekday);
        ctx.put("is_weekend", flag(weekday >= 5.0));
        ctx.put("is_night", flag(hour >= 22.0 || hour <= 6.0));
        ctx.put("circuit_lifetime_sec", lifetime);
        ctx.put("time_since_last_circuit", 5.0);
        ctx.put("cell_count_actual", (total_bytes / 512.0).floor());
        ctx.put("cell_interarrival_mean_ms", 10.5);
        ctx.put("stream_setup_latency_ms", 150.0);
        ctx.put("idle_time_ratio", 0.3);
        ctx.put("closure_reason_encoded", 0.0);

        // Traffic
        let bytes_per_second = total_bytes / (setup + RATIO_EPSILON);
        ctx.put("bytes_sent_guard_to_middle", total_bytes * 0.48);
        ctx.put("bytes_recv_middle_to_guard", total_bytes * 0.48);
        ctx.put("bytes_sent_asymmetry_ratio", 1.2);
        ctx.put(
            "bandwidth_utilization",
            bytes_per_second / (guard_bw * 1024.0 * 1024.0 + RATIO_EPSILON),
        );
        ctx.put("traffic_burst_score", 0.8);
        ctx.put("congestion_indicator", 0.15);
        ctx.put("stream_count", stream_count);
        ctx.put("stream_multiplexing_count", 3.0);
        ctx.put("bytes_per_second", bytes_per_second);
        ctx.put("bytes_to_bandwidth_ratio", total_bytes / (total_bw + RATIO_EPSILON));

        // Topology: AS numbers estimated from the encoded countries
        let guard_as = guard_country_code as f64 * 1000.0;
        let exit_as = exit_country_code as f64 * 1000.0;
        let as_path_length = ((guard_as - exit_as).abs() / 1000.0).floor() + 1.0;
        ctx.put("guard_as_number", guard_as);
        ctx.put("exit_as_number", exit_as);
        ctx.put("same_as_flag", flag(guard_as == exit_as));
        ctx.put("as_path_length", as_path_length);
        ctx.put("relay_family_size", 1.0);
        ctx.put("exit_policy_match_score", 0.9);
        ctx.put("guard_stability_index", guard_bw * 0.95);
        ctx.put("network_distance_estimate", as_path_length * setup);

        // Transforms
        let guard_share = guard_bw / (total_bw + RATIO_EPSILON);
        ctx.put("log_guard_bandwidth", guard_bw.ln_1p());
        ctx.put("log_total_bytes", total_bytes.ln_1p());
        ctx.put("squared_setup_duration", setup * setup);
        ctx.put("bandwidth_entropy", -(guard_share * (guard_share + RATIO_EPSILON).log2()));

        let Extraction { named, mut fallbacks, .. } = ctx;

        // Layout order; names the layout doesn't know are dropped, slots
        // nobody produced stay zero
        let mut vector = FeatureVector::new();
        for (name, value) in named {
            if !value.is_finite() {
                fallbacks.push(FeatureFallback::NonFiniteDerived { feature: name.to_string() });
                continue;
            }
            vector.set_by_name(&self.names, name, value);
        }

        if !fallbacks.is_empty() {
            log::debug!("Feature fallbacks: {:?}", fallbacks);
        }

        EngineeredFeatures { vector, fallbacks }
    }

    fn encode(
        &self,
        fallbacks: &mut Vec<FeatureFallback>,
        encoder_name: &str,
        value: &str,
        buckets: u64,
    ) -> i64 {
        match self.encoders.get(encoder_name) {
            Some(encoder) => match encoder.encode(value) {
                Some(code) => code,
                None => {
                    fallbacks.push(FeatureFallback::EncoderMiss {
                        encoder: encoder_name.to_string(),
                        value: value.to_string(),
                    });
                    0
                }
            },
            None => {
                fallbacks.push(FeatureFallback::HashBucket { encoder: encoder_name.to_string() });
                self.bucketer.bucket(value, buckets)
            }
        }
    }
}

// ============================================================================
// EXTRACTION STATE
// ============================================================================

struct Extraction<'a> {
    observation: &'a Observation,
    fallbacks: Vec<FeatureFallback>,
    named: Vec<(&'static str, f64)>,
}

impl Extraction<'_> {
    fn put(&mut self, name: &'static str, value: f64) {
        self.named.push((name, value));
    }

    fn text(&mut self, field: &str, default: &str) -> String {
        match self.observation.text(field) {
            Field::Valid(v) => v.to_string(),
            Field::Missing => default.to_string(),
            Field::Invalid => {
                self.invalid(field);
                default.to_string()
            }
        }
    }

    fn non_negative(&mut self, field: &str, default: f64) -> f64 {
        match self.observation.number(field) {
            Field::Valid(v) if v >= 0.0 => v,
            Field::Missing => default,
            Field::Valid(_) | Field::Invalid => {
                self.invalid(field);
                default
            }
        }
    }

    fn invalid(&mut self, field: &str) {
        self.fallbacks.push(FeatureFallback::InvalidValue { field: field.to_string() });
    }

    /// (hour, weekday with 0 = Monday)
    fn time_of_week(&mut self, now: DateTime<Utc>) -> (u32, u32) {
        let parsed = match self.observation.get("timestamp") {
            None | Some(Value::Null) => {
                self.fallbacks.push(FeatureFallback::TimestampNow);
                Some(now.naive_utc())
            }
            Some(raw) => {
                let parsed = parse_timestamp(raw);
                if parsed.is_none() {
                    self.fallbacks.push(FeatureFallback::TimestampUnparsable { raw: raw.to_string() });
                }
                parsed
            }
        };

        match parsed {
            Some(dt) => (dt.hour(), dt.weekday().num_days_from_monday()),
            None => (FALLBACK_HOUR, FALLBACK_WEEKDAY),
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Parse RFC 3339, common naive formats, plain dates, or unix seconds
pub fn parse_timestamp(raw: &Value) -> Option<NaiveDateTime> {
    match raw {
        Value::Number(n) => {
            let secs = n.as_f64()?;
            if !secs.is_finite() {
                return None;
            }
            DateTime::from_timestamp(secs.trunc() as i64, 0).map(|dt| dt.naive_utc())
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.naive_local());
            }
            for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
                    return Some(dt);
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }
        _ => None,
    }
}

fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_population_std() {
        assert_eq!(population_std(&[2.0, 2.0, 2.0]), 0.0);
        assert!((population_std(&[1.0, 2.0, 3.0]) - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc = parse_timestamp(&json!("2025-01-15T09:30:00+05:30")).unwrap();
        assert_eq!(rfc.hour(), 9);

        let naive = parse_timestamp(&json!("2025-01-18 23:10:05")).unwrap();
        assert_eq!(naive.hour(), 23);
        assert_eq!(naive.weekday().num_days_from_monday(), 5); // Saturday

        let date = parse_timestamp(&json!("2025-01-13")).unwrap();
        assert_eq!(date.hour(), 0);

        // 2025-01-13T12:00:00Z
        let unix = parse_timestamp(&json!(1736769600)).unwrap();
        assert_eq!(unix.hour(), 12);

        assert!(parse_timestamp(&json!("yesterday")).is_none());
        assert!(parse_timestamp(&json!(true)).is_none());
    }
}
