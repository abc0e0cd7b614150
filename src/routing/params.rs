//! Typed navigation parameters.
//!
//! Parameters arrive as strings (path bindings, query pairs) or as typed
//! values supplied by the caller. Coercions accept the string form of a
//! value, so `"42"` satisfies [`ParamValue::as_int`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, RouterError};

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Map(Parameters),
}

impl ParamValue {
    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::String(_) => "string",
            ParamValue::Int(_) => "integer",
            ParamValue::Bool(_) => "bool",
            ParamValue::Double(_) => "double",
            ParamValue::Map(_) => "map",
        }
    }

    /// Borrow the value as a string. Only string values qualify.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Coerce to an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            ParamValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerce to a bool. Accepts `true/false`, `1/0`, `yes/no`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            ParamValue::Int(0) => Some(false),
            ParamValue::Int(1) => Some(true),
            ParamValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Coerce to a double. Integers widen.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            ParamValue::Double(d) => Some(*d),
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Borrow a nested map.
    pub fn as_map(&self) -> Option<&Parameters> {
        match self {
            ParamValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::String(s) => f.write_str(s),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Double(d) => write!(f, "{d}"),
            ParamValue::Map(m) => write!(f, "{{{} entries}}", m.len()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Double(value)
    }
}

impl From<Parameters> for ParamValue {
    fn from(value: Parameters) -> Self {
        ParamValue::Map(value)
    }
}

/// Ordered, string-keyed parameter map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters {
    values: BTreeMap<String, ParamValue>,
}

impl Parameters {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }

    /// Copy every entry of `other` over this map, replacing existing keys.
    pub fn merge(&mut self, other: &Parameters) {
        for (key, value) in other.iter() {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Look up a string parameter, failing if it is absent or not a string.
    pub fn require_str(&self, key: &str) -> Result<&str> {
        let value = self.require(key)?;
        value
            .as_str()
            .ok_or_else(|| mismatch(key, "string", value, "pass the value as text"))
    }

    /// Look up a parameter coercible to an integer.
    pub fn require_int(&self, key: &str) -> Result<i64> {
        let value = self.require(key)?;
        value.as_int().ok_or_else(|| {
            mismatch(
                key,
                "integer",
                value,
                &format!("use a whole number such as {key}=42"),
            )
        })
    }

    /// Look up a parameter coercible to a bool.
    pub fn require_bool(&self, key: &str) -> Result<bool> {
        let value = self.require(key)?;
        value
            .as_bool()
            .ok_or_else(|| mismatch(key, "bool", value, "use true/false, 1/0 or yes/no"))
    }

    /// Look up a parameter coercible to a double.
    pub fn require_double(&self, key: &str) -> Result<f64> {
        let value = self.require(key)?;
        value.as_double().ok_or_else(|| {
            mismatch(
                key,
                "double",
                value,
                &format!("use a decimal number such as {key}=1.5"),
            )
        })
    }

    fn require(&self, key: &str) -> Result<&ParamValue> {
        self.values.get(key).ok_or_else(|| {
            RouterError::parameter(
                key,
                "missing required parameter",
                format!("add `{key}` to the path or query string"),
            )
        })
    }
}

fn mismatch(key: &str, expected: &str, actual: &ParamValue, suggestion: &str) -> RouterError {
    RouterError::parameter(
        key,
        format!("expected {expected}, got {} {actual:?}", actual.type_name()),
        suggestion,
    )
}

impl FromIterator<(String, ParamValue)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
