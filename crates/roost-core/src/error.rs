//! Buffer growth errors.

use std::error::Error;
use std::fmt;

/// Errors that can occur when growing a reusable buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CapacityError {
    /// The next power of two above the request does not fit in `usize`.
    Overflow {
        /// Number of elements requested.
        requested: usize,
    },
    /// The request exceeds a hard limit imposed by the buffer's index type.
    IndexLimit {
        /// Number of elements requested.
        requested: usize,
        /// Largest element count the index type can address.
        limit: usize,
    },
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow { requested } => {
                write!(f, "capacity overflow: cannot grow to fit {requested} elements")
            }
            Self::IndexLimit { requested, limit } => {
                write!(
                    f,
                    "capacity limit exceeded: requested {requested} elements, limit {limit}"
                )
            }
        }
    }
}

impl Error for CapacityError {}
