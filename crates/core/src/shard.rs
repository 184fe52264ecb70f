//! Shard: the unit a backend marshals.
//!
//! Sequence elements travel with their original index so the loader can put
//! them back in payload order no matter which bin they were packed into.

use crate::payload::{Key, Payload, Shape};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// One partition of a payload, in wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shard {
    /// Mapping entries
    Mapping(Vec<(Key, Value)>),
    /// Sequence elements tagged with their original index
    Sequence(Vec<(u64, Value)>),
}

impl Shard {
    /// Empty shard of the given shape.
    pub fn empty(shape: Shape) -> Self {
        match shape {
            Shape::Mapping => Shard::Mapping(Vec::new()),
            Shape::Sequence => Shard::Sequence(Vec::new()),
        }
    }

    /// Container shape
    pub fn shape(&self) -> Shape {
        match self {
            Shard::Mapping(_) => Shape::Mapping,
            Shard::Sequence(_) => Shape::Sequence,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        match self {
            Shard::Mapping(entries) => entries.len(),
            Shard::Sequence(elements) => elements.len(),
        }
    }

    /// Check if shard is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The whole payload as a single shard (indices `0..len` for sequences).
impl From<Payload> for Shard {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Mapping(m) => Shard::Mapping(m.into_iter().collect()),
            Payload::Sequence(s) => {
                Shard::Sequence(s.into_iter().enumerate().map(|(i, v)| (i as u64, v)).collect())
            }
        }
    }
}
