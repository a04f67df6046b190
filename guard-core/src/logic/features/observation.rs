//! Observation - raw, partial circuit data
//!
//! An observation is an unordered JSON object. No key is required; the
//! feature engineer substitutes a default for anything missing or invalid.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of reading one field from an observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<T> {
    Missing,
    Valid(T),
    Invalid,
}

impl<T> Field<T> {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Field::Invalid)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Observation(Map<String, Value>);

impl Observation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace one field
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Copy of `self` with every field of `overrides` written over it
    pub fn merged(&self, overrides: &Observation) -> Observation {
        let mut merged = self.0.clone();
        for (key, value) in &overrides.0 {
            merged.insert(key.clone(), value.clone());
        }
        Observation(merged)
    }

    /// Read a finite number. Numeric strings are accepted; `null` counts as
    /// missing.
    pub fn number(&self, key: &str) -> Field<f64> {
        match self.0.get(key) {
            None | Some(Value::Null) => Field::Missing,
            Some(Value::Number(n)) => match n.as_f64() {
                Some(v) if v.is_finite() => Field::Valid(v),
                _ => Field::Invalid,
            },
            Some(Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Field::Valid(v),
                _ => Field::Invalid,
            },
            Some(_) => Field::Invalid,
        }
    }

    /// Read a non-empty string
    pub fn text(&self, key: &str) -> Field<&str> {
        match self.0.get(key) {
            None | Some(Value::Null) => Field::Missing,
            Some(Value::String(s)) if !s.trim().is_empty() => Field::Valid(s.trim()),
            Some(_) => Field::Invalid,
        }
    }
}

impl From<Map<String, Value>> for Observation {
    fn from(map: Map<String, Value>) -> Self {
        Observation(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Observation {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Observation(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
