//! Data-parallel bitonic sorting of `(key, value)` pairs.
//!
//! The sort is expressed as a fixed network of compare-and-swap passes
//! (see [`BitonicPlan`]); each pass touches disjoint pairs and runs in
//! parallel. Buffers of any length are accepted: the network is laid out
//! over the next power of two and the missing tail behaves as entries
//! with the largest possible key, so it never moves.
//!
//! [`sort_and_compute_offsets`] additionally derives a start-offset table
//! from the sorted keys, the same table a counting sort produces.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bitonic;
pub mod error;
pub mod offsets;

pub use bitonic::{sort_pairs, BitonicPass, BitonicPlan, SortEntry};
pub use error::SortError;
pub use offsets::sort_and_compute_offsets;
