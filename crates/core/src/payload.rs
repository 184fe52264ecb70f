//! Payloads: the two container shapes the engine marshals.
//!
//! A payload is either a mapping with unique keys (order irrelevant) or a
//! sequence (order relevant). Anything else is rejected when converting from a
//! generic [`Value`] or JSON document.

use crate::error::{Error, Result};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Mapping key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Integer key
    Int(i64),
    /// String key
    String(String),
}

impl Key {
    /// Approximate footprint, same scale as [`Value::estimated_size`].
    pub fn estimated_size(&self) -> u64 {
        match self {
            Key::Int(_) => 8,
            Key::String(s) => s.len() as u64,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{}", i),
            Key::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(s)
    }
}

/// Container shape of a payload or shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    /// Keyed entries, merged by key
    Mapping,
    /// Ordered elements
    Sequence,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Mapping => f.write_str("mapping"),
            Shape::Sequence => f.write_str("sequence"),
        }
    }
}

/// The object being marshalled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Mapping with unique keys
    Mapping(BTreeMap<Key, Value>),
    /// Ordered sequence
    Sequence(Vec<Value>),
}

impl Payload {
    /// Empty payload of the given shape.
    pub fn empty(shape: Shape) -> Self {
        match shape {
            Shape::Mapping => Payload::Mapping(BTreeMap::new()),
            Shape::Sequence => Payload::Sequence(Vec::new()),
        }
    }

    /// Container shape
    pub fn shape(&self) -> Shape {
        match self {
            Payload::Mapping(_) => Shape::Mapping,
            Payload::Sequence(_) => Shape::Sequence,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        match self {
            Payload::Mapping(m) => m.len(),
            Payload::Sequence(s) => s.len(),
        }
    }

    /// Check if the payload has no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-entry size estimates in iteration order.
    ///
    /// Mapping entries count their key and value; sequence elements count the
    /// value only.
    pub fn entry_sizes(&self) -> Vec<u64> {
        match self {
            Payload::Mapping(m) => m
                .iter()
                .map(|(k, v)| k.estimated_size() + v.estimated_size())
                .collect(),
            Payload::Sequence(s) => s.iter().map(Value::estimated_size).collect(),
        }
    }

    /// Try to get as mapping
    pub fn as_mapping(&self) -> Option<&BTreeMap<Key, Value>> {
        match self {
            Payload::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Try to get as sequence
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Payload::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a JSON document whose top level is an object or an array.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        Payload::try_from(Value::from(json))
    }

    /// Convert into a JSON document.
    ///
    /// Integer keys become their decimal string form.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Payload::Mapping(m) => serde_json::Value::Object(
                m.into_iter()
                    .map(|(k, v)| (k.to_string(), v.into_json()))
                    .collect(),
            ),
            Payload::Sequence(s) => {
                serde_json::Value::Array(s.into_iter().map(Value::into_json).collect())
            }
        }
    }
}

impl TryFrom<Value> for Payload {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Payload::Mapping(
                fields.into_iter().map(|(k, v)| (Key::String(k), v)).collect(),
            )),
            Value::Array(items) => Ok(Payload::Sequence(items)),
            other => Err(Error::UnsupportedPayload(other.type_name())),
        }
    }
}

impl From<BTreeMap<Key, Value>> for Payload {
    fn from(m: BTreeMap<Key, Value>) -> Self {
        Payload::Mapping(m)
    }
}

impl From<Vec<Value>> for Payload {
    fn from(s: Vec<Value>) -> Self {
        Payload::Sequence(s)
    }
}

impl FromIterator<(Key, Value)> for Payload {
    fn from_iter<I: IntoIterator<Item = (Key, Value)>>(iter: I) -> Self {
        Payload::Mapping(iter.into_iter().collect())
    }
}

impl FromIterator<Value> for Payload {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Payload::Sequence(iter.into_iter().collect())
    }
}
