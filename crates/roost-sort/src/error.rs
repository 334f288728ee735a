//! Sort errors.

use std::error::Error;
use std::fmt;

/// Errors reported by [`sort_and_compute_offsets`](crate::sort_and_compute_offsets).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SortError {
    /// The offset table has no room for the trailing total.
    EmptyOffsetTable,
    /// An entry's key has no slot in the offset table.
    KeyOutOfRange {
        /// The offending key.
        key: u32,
        /// Number of keys the table covers.
        key_count: usize,
    },
    /// More entries than `u32` offsets can address.
    TooManyEntries {
        /// Number of entries supplied.
        len: usize,
    },
}

impl fmt::Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyOffsetTable => write!(f, "offset table must hold at least one entry"),
            Self::KeyOutOfRange { key, key_count } => {
                write!(f, "key {key} out of range for {key_count} keys")
            }
            Self::TooManyEntries { len } => {
                write!(f, "{len} entries exceed the u32 offset range")
            }
        }
    }
}

impl Error for SortError {}
