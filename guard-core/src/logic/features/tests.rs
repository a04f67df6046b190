//! Integration Tests for Feature Engineering
//!
//! Engineer + layout + encoders working together.

#[cfg(test)]
mod integration_tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use crate::constants::FEATURE_COUNT;
    use crate::logic::features::encoding::{
        EXIT_COUNTRY_ENCODER, GUARD_COUNTRY_ENCODER, MIDDLE_COUNTRY_ENCODER,
    };
    use crate::logic::features::{
        EncoderStore, FeatureEngineer, FeatureFallback, FeatureNames, LabelEncoder, Observation,
    };

    fn engineer() -> FeatureEngineer {
        let _ = env_logger::builder().is_test(true).try_init();
        FeatureEngineer::new(Arc::new(FeatureNames::default()), EncoderStore::new())
    }

    fn engineer_with_country_encoders() -> FeatureEngineer {
        let countries = ["AT", "CA", "DE", "NL", "US"];
        let encoders = EncoderStore::new()
            .with_encoder(GUARD_COUNTRY_ENCODER, LabelEncoder::from_classes(countries))
            .with_encoder(MIDDLE_COUNTRY_ENCODER, LabelEncoder::from_classes(countries))
            .with_encoder(EXIT_COUNTRY_ENCODER, LabelEncoder::from_classes(countries));
        FeatureEngineer::new(Arc::new(FeatureNames::default()), encoders)
    }

    fn value(engineer: &FeatureEngineer, features: &crate::logic::features::FeatureVector, name: &str) -> f64 {
        features.get_by_name(engineer.feature_names(), name).unwrap()
    }

    fn obs(v: serde_json::Value) -> Observation {
        serde_json::from_value(v).unwrap()
    }

    /// Empty observation still yields a full, finite vector
    #[test]
    fn test_empty_observation_defaults() {
        let eng = engineer();
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();
        let result = eng.engineer_at(&Observation::new(), now);

        assert_eq!(result.vector.as_slice().len(), FEATURE_COUNT);
        assert!(result.vector.is_finite());

        let v = &result.vector;
        assert_eq!(value(&eng, v, "exit_bandwidth"), 7.5);
        assert!((value(&eng, v, "guard_bandwidth") - 9.0).abs() < 1e-12);
        assert!((value(&eng, v, "middle_bandwidth") - 8.25).abs() < 1e-12);
        assert_eq!(value(&eng, v, "hour_of_day"), 10.0);
        assert_eq!(value(&eng, v, "day_of_week"), 2.0); // Wednesday
        // DE / NL / DE
        assert_eq!(value(&eng, v, "country_diversity_score"), 2.0);
        assert_eq!(value(&eng, v, "same_country_guard_exit"), 1.0);
        assert_eq!(value(&eng, v, "same_country_guard_middle"), 0.0);

        assert!(result.fallbacks.contains(&FeatureFallback::TimestampNow));
    }

    #[test]
    fn test_bandwidth_derivations() {
        let eng = engineer();
        let o = obs(json!({
            "bandwidth": 2.0,
            "guard_bandwidth": 4.0,
            "middle_bandwidth": 0.0,
            "timestamp": "2025-01-15T10:00:00Z",
        }));
        let v = eng.engineer(&o).vector;

        assert!((value(&eng, &v, "guard_to_middle_bw_ratio") - 4.0 / 0.001).abs() < 1e-6);
        assert!((value(&eng, &v, "guard_to_exit_bw_ratio") - 4.0 / 2.001).abs() < 1e-12);
        assert_eq!(value(&eng, &v, "total_circuit_bandwidth"), 6.0);
        assert_eq!(value(&eng, &v, "min_bandwidth"), 0.0);
        assert_eq!(value(&eng, &v, "max_bandwidth"), 4.0);
        assert_eq!(value(&eng, &v, "bandwidth_range"), 4.0);
        let expected_std = (8.0f64 / 3.0).sqrt();
        assert!((value(&eng, &v, "std_bandwidth") - expected_std).abs() < 1e-12);
    }

    #[test]
    fn test_unparsable_timestamp_uses_fixed_constants() {
        let eng = engineer();
        let result = eng.engineer(&obs(json!({ "timestamp": "not a date" })));

        assert_eq!(value(&eng, &result.vector, "hour_of_day"), 14.0);
        assert_eq!(value(&eng, &result.vector, "day_of_week"), 3.0);
        assert!(result
            .fallbacks
            .iter()
            .any(|f| matches!(f, FeatureFallback::TimestampUnparsable { .. })));
    }

    #[test]
    fn test_invalid_numbers_degrade_to_defaults() {
        let eng = engineer();
        let result = eng.engineer(&obs(json!({
            "bandwidth": "fast",
            "total_bytes": -5,
            "stream_count": [1, 2],
            "timestamp": "2025-01-15T10:00:00Z",
        })));

        assert!(result.vector.is_finite());
        assert_eq!(value(&eng, &result.vector, "exit_bandwidth"), 7.5);
        assert_eq!(value(&eng, &result.vector, "stream_count"), 3.0);
        assert_eq!(
            value(&eng, &result.vector, "cell_count_actual"),
            (500_000.0f64 / 512.0).floor()
        );

        for field in ["bandwidth", "total_bytes", "stream_count"] {
            assert!(result
                .fallbacks
                .contains(&FeatureFallback::InvalidValue { field: field.to_string() }));
        }
    }

    #[test]
    fn test_huge_values_stay_finite() {
        let eng = engineer();
        let result = eng.engineer(&obs(json!({ "bandwidth": 1.0e308, "total_bytes": 1.0e308 })));
        assert!(result.vector.is_finite());
        assert!(result
            .fallbacks
            .iter()
            .any(|f| matches!(f, FeatureFallback::NonFiniteDerived { .. })));
    }

    #[test]
    fn test_encoder_hit_and_miss() {
        let eng = engineer_with_country_encoders();
        let result = eng.engineer(&obs(json!({
            "exit_country": "US",
            "guard_country": "ZZ",
            "timestamp": "2025-01-15T10:00:00Z",
        })));

        assert_eq!(value(&eng, &result.vector, "exit_country_encoded"), 4.0);
        assert_eq!(value(&eng, &result.vector, "guard_country_encoded"), 0.0);
        assert_eq!(value(&eng, &result.vector, "middle_country_encoded"), 3.0);
        assert_eq!(value(&eng, &result.vector, "exit_as_number"), 4000.0);
        assert_eq!(value(&eng, &result.vector, "as_path_length"), 5.0);

        assert!(result.fallbacks.contains(&FeatureFallback::EncoderMiss {
            encoder: GUARD_COUNTRY_ENCODER.to_string(),
            value: "ZZ".to_string(),
        }));
        // Fingerprint encoders are not loaded here
        assert!(result
            .fallbacks
            .iter()
            .any(|f| matches!(f, FeatureFallback::HashBucket { .. })));
    }

    #[test]
    fn test_hash_fallback_bounded() {
        let eng = engineer();
        let result = eng.engineer(&obs(json!({ "exit_country": "US", "guard_fingerprint": "ABCDEF" })));

        let exit_code = value(&eng, &result.vector, "exit_country_encoded");
        assert!((0.0..50.0).contains(&exit_code));
        let fp_code = value(&eng, &result.vector, "guard_fingerprint_encoded");
        assert!((0.0..500.0).contains(&fp_code));
    }

    /// Same observation, same process → same vector
    #[test]
    fn test_idempotent_within_process() {
        let eng = engineer();
        let o = obs(json!({
            "exit_country": "FR",
            "bandwidth": 3.3,
            "exit_fingerprint": "F00D",
            "timestamp": "2025-02-01 08:00:00",
        }));
        let first = eng.engineer(&o);
        let second = eng.engineer(&o);
        assert_eq!(first.vector, second.vector);
    }

    #[test]
    fn test_reserved_and_unknown_slots_zero() {
        let eng = engineer();
        let v = eng.engineer(&Observation::new()).vector;
        for i in 70..FEATURE_COUNT {
            assert_eq!(v.get(i), Some(0.0));
        }

        // A layout with names the engineer never produces
        let mut names: Vec<String> = crate::logic::features::DEFAULT_FEATURE_LAYOUT
            .iter()
            .map(|s| s.to_string())
            .collect();
        names[0] = "from_some_future_pipeline".to_string();
        let custom = FeatureEngineer::new(Arc::new(FeatureNames::new(names).unwrap()), EncoderStore::new());
        let v = custom.engineer(&Observation::new()).vector;
        assert_eq!(v.get(0), Some(0.0));
        assert_eq!(v.get(2), Some(7.5));
    }

    #[test]
    fn test_weekend_and_night_flags() {
        let eng = engineer();
        let v = eng
            .engineer(&obs(json!({ "timestamp": "2025-01-18 23:10:05" })))
            .vector;
        assert_eq!(value(&eng, &v, "is_weekend"), 1.0);
        assert_eq!(value(&eng, &v, "is_night"), 1.0);

        let v = eng
            .engineer(&obs(json!({ "timestamp": "2025-01-15 12:00:00" })))
            .vector;
        assert_eq!(value(&eng, &v, "is_weekend"), 0.0);
        assert_eq!(value(&eng, &v, "is_night"), 0.0);
    }
}
