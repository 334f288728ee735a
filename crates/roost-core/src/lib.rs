//! Core primitives shared by the Roost acceleration structures.
//!
//! This crate provides the small set of types every other Roost crate
//! builds on:
//!
//! - [`BoundingBox`]: axis-aligned box with union, volume and signed distance.
//! - [`BoundedItem`]: the contract an item must meet to be stored in a tree.
//! - [`capacity`]: power-of-two growth for buffers that are reused across frames.
//! - [`CapacityError`]: the one failure buffer growth can report.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bounds;
pub mod capacity;
pub mod error;

pub use bounds::{BoundedItem, BoundingBox};
pub use capacity::{check_u32_index, grow_len, pow2_capacity, reserve_pow2, MIN_CAPACITY};
pub use error::CapacityError;
