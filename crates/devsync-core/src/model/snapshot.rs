use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CoreError;

/// A single decoded device field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Boolean view: booleans, `0`/`1`, and the usual textual spellings.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Number(n) if *n == 0.0 => Some(false),
            Self::Number(n) if *n == 1.0 => Some(true),
            Self::Number(_) => None,
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "1" => Some(true),
                "false" | "off" | "0" => Some(false),
                _ => None,
            },
        }
    }

    /// Numeric view. Devices often send numbers as strings (`"21.5"`).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Self::Bool(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            // Integral values print without a trailing ".0".
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{n:.0}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// The most recently decoded device state.
///
/// Built once per successful poll and never mutated afterwards; the
/// store swaps whole snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    fields: BTreeMap<String, FieldValue>,
    fetched_at: DateTime<Utc>,
}

impl DeviceSnapshot {
    /// Decode a raw state object, flattening nested objects into
    /// `.`-joined keys. Nulls and arrays are dropped.
    pub fn decode(
        state: &Map<String, Value>,
        required: &[&str],
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        let mut fields = BTreeMap::new();
        flatten_into(&mut fields, None, state);

        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|f| !fields.contains_key(*f))
            .collect();
        if !missing.is_empty() {
            return Err(CoreError::Decode {
                message: format!("missing required field(s): {}", missing.join(", ")),
            });
        }

        Ok(Self { fields, fetched_at })
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

fn flatten_into(out: &mut BTreeMap<String, FieldValue>, prefix: Option<&str>, map: &Map<String, Value>) {
    for (key, value) in map {
        let name = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Bool(b) => {
                out.insert(name, FieldValue::Bool(*b));
            }
            Value::Number(n) => {
                if let Some(n) = n.as_f64() {
                    out.insert(name, FieldValue::Number(n));
                }
            }
            Value::String(s) => {
                out.insert(name, FieldValue::Text(s.clone()));
            }
            Value::Object(inner) => flatten_into(out, Some(&name), inner),
            Value::Null | Value::Array(_) => {}
        }
    }
}
