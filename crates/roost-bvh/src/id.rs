//! Shape identifiers.

use std::fmt;

/// Identifies a shape within a [`ShapeRegistry`](crate::ShapeRegistry).
///
/// Ids are handed out sequentially by the registry and never reused
/// for the lifetime of that registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u32);

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ShapeId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
