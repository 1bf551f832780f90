//! Feature payload forwarded to the prediction worker.
//!
//! A [`FeaturePayload`] is built once from the inbound request body and is
//! immutable afterwards. It only admits the recognized feature names and
//! numeric values, and serializes them in [`FEATURE_NAMES`] order so the
//! worker receives a stable column order.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Number, Value};

use crate::error::BridgeError;

/// Recognized feature names, in the column order the model expects.
pub const FEATURE_NAMES: [&str; 12] = [
    "area",
    "bedrooms",
    "bathrooms",
    "stories",
    "mainroad",
    "guestroom",
    "basement",
    "hotwaterheating",
    "airconditioning",
    "parking",
    "prefarea",
    "furnishingstatus",
];

/// Validated, ordered mapping of feature name to numeric value.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePayload {
    values: Vec<(&'static str, Number)>,
}

impl FeaturePayload {
    /// Validate a decoded request body.
    ///
    /// The body must be a JSON object whose keys are all recognized feature
    /// names and whose values are all JSON numbers. Missing features are
    /// accepted; the worker decides whether a partial payload is usable.
    pub fn from_json(body: &Value) -> Result<Self, BridgeError> {
        let Value::Object(map) = body else {
            return Err(BridgeError::Validation(format!(
                "expected a JSON object of features, got {}",
                json_kind(body)
            )));
        };

        if let Some(unknown) = map
            .keys()
            .find(|key| !FEATURE_NAMES.contains(&key.as_str()))
        {
            return Err(BridgeError::Validation(format!(
                "unknown feature '{unknown}'"
            )));
        }

        let mut values = Vec::with_capacity(map.len());
        for name in FEATURE_NAMES {
            match map.get(name) {
                None => {}
                Some(Value::Number(n)) => values.push((name, n.clone())),
                Some(other) => {
                    return Err(BridgeError::Validation(format!(
                        "feature '{name}' must be a number, got {}",
                        json_kind(other)
                    )));
                }
            }
        }

        Ok(Self { values })
    }

    /// Value of a single feature, if present.
    pub fn get(&self, name: &str) -> Option<&Number> {
        self.values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Serialize to the single JSON text handed to the worker.
    pub fn to_json_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for FeaturePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
