//! Uniform spatial hash grid for large agent populations.
//!
//! Every frame the grid bins a fixed-capacity agent buffer into uniform
//! cells with a counting sort split into five ordered dispatches:
//!
//! 1. [`ClearOffsets`](GridPhase::ClearOffsets): zero the per-cell counts.
//! 2. [`HashCount`](GridPhase::HashCount): hash each agent and count it atomically.
//! 3. [`PrefixSum`](GridPhase::PrefixSum): exclusive scan of the counts within each group.
//! 4. [`CarryGroups`](GridPhase::CarryGroups): scan the group totals and add the carries.
//! 5. [`Reorder`](GridPhase::Reorder): claim a slot per agent and copy it into the write buffer.
//!
//! The result is an offset table (agents of cell `c` occupy
//! `offsets[c]..offsets[c + 1]` of the reordered buffer) that downstream
//! kernels use for neighbour search. The phases are supplied by a
//! [`GridKernels`] implementation; [`CpuKernels`] runs each one as a
//! rayon parallel iterator.
//!
//! [`SortedCellIndex`] derives the same offset table with the bitonic
//! sort from `roost-sort` instead.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod agents;
pub mod config;
pub mod error;
pub mod grid;
pub mod kernels;
pub mod layout;
pub mod sorted;

pub use agents::{AgentBuffer, AgentBuffers, AgentLayout, AgentRecordsMut};
pub use config::{AgentProfile, CellSizing, GridConfig};
pub use error::GridError;
pub use grid::{AliveCounter, GridFrame, SpatialHashGrid};
pub use kernels::{CpuKernels, GridKernels, GridPhase, HashJob};
pub use layout::GridLayout;
pub use sorted::SortedCellIndex;
