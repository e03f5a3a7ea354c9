//! Wire value types for jsbox.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A JSON-representable value as it travels over the protocol.
///
/// Every response line the engine writes is one of these, serialized.
/// Runtime-only things (closures, injected capabilities) do not appear
/// here; the kernel lowers them to `Null` before a value crosses the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Delegate to value_to_json for consistent JSON representation.
        // Non-finite floats serialize as null.
        value_to_json(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(json_to_value(json))
    }
}

impl Value {
    /// True if the value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Type name as reported by `typeof`-style introspection.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) | Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for Value {
    /// Human-readable rendering: strings print bare, everything else as JSON.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", value_to_json(other)),
        }
    }
}

/// Convert serde_json::Value to a wire Value.
///
/// Whole numbers become `Int`, everything else maps one-to-one.
pub fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => {
            Value::Array(items.into_iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect(),
        ),
    }
}

/// Convert a wire Value to serde_json::Value for serialization.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => {
            // integral doubles print without a fraction, the way
            // JSON.stringify renders them
            if f.fract() == 0.0 && f.abs() <= 9_007_199_254_740_992.0 {
                serde_json::Value::Number((*f as i64).into())
            } else {
                serde_json::Number::from_f64(*f)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
        }
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_numbers_become_int() {
        let v = json_to_value(serde_json::json!(42));
        assert_eq!(v, Value::Int(42));
    }

    #[test]
    fn fractional_numbers_become_float() {
        let v = json_to_value(serde_json::json!(1.5));
        assert_eq!(v, Value::Float(1.5));
    }

    #[test]
    fn nested_structures_round_trip() {
        let json = serde_json::json!({
            "name": "alice",
            "tags": ["a", "b"],
            "meta": { "depth": 3, "active": true, "score": 0.5, "gone": null }
        });
        let value = json_to_value(json.clone());
        assert_eq!(value_to_json(&value), json);
    }

    #[test]
    fn serialized_value_round_trips_deep_equal() {
        let value = Value::Object(BTreeMap::from([
            ("x".to_string(), Value::Int(1)),
            (
                "ys".to_string(),
                Value::Array(vec![Value::Bool(false), Value::Null, Value::Float(2.25)]),
            ),
        ]));
        let line = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn integral_floats_serialize_without_fraction() {
        assert_eq!(serde_json::to_string(&Value::Float(1000.0)).unwrap(), "1000");
        assert_eq!(serde_json::to_string(&Value::Float(-0.0)).unwrap(), "0");
        assert_eq!(serde_json::to_string(&Value::Float(1.5)).unwrap(), "1.5");
        // beyond 2^53 the integer digits are no longer exact
        assert_ne!(
            serde_json::to_string(&Value::Float(1e19)).unwrap(),
            "10000000000000000000"
        );
    }

    #[test]
    fn nan_serializes_as_null() {
        let line = serde_json::to_string(&Value::Float(f64::NAN)).unwrap();
        assert_eq!(line, "null");
    }

    #[test]
    fn display_strings_print_bare() {
        assert_eq!(Value::String("hi".into()).to_string(), "hi");
        assert_eq!(Value::Int(7).to_string(), "7");
        assert_eq!(
            Value::Array(vec![Value::Int(1), Value::Int(2)]).to_string(),
            "[1,2]"
        );
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Bool(true).type_name(), "boolean");
        assert_eq!(Value::Float(0.0).type_name(), "number");
        assert_eq!(Value::Object(BTreeMap::new()).type_name(), "object");
    }
}
