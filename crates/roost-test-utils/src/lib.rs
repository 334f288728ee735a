//! Test fixtures and invariant checks for Roost development.
//!
//! [`fixtures`] builds deterministic shape sets and agent swarms from a
//! seed. [`invariants`] holds the `assert_*` helpers shared by the
//! integration tests of every crate: tree structure, query agreement
//! with brute force, and offset-table and reorder correctness.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod invariants;

pub use fixtures::{
    agent_id, disjoint_spheres, random_shapes, random_spheres, random_swarm, rng, shape_items,
    swarm_layout, SWARM_STRIDE,
};
pub use invariants::{
    assert_grid_invariants, assert_nearest_matches_brute_force, assert_offsets_well_formed,
    assert_tree_invariants, run_full_grid_compliance,
};
