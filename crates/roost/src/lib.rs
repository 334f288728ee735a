//! Roost: spatial acceleration for large flocking simulations.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Roost sub-crates. Each frame a simulation typically
//!
//! 1. rebuilds a [`CollisionWorld`](bvh::CollisionWorld) over its obstacles
//!    and answers "nearest surface" queries for agents, and
//! 2. rebuilds a [`SpatialHashGrid`](grid::SpatialHashGrid) over the agent
//!    buffer so neighbour search only visits the surrounding cells.
//!
//! # Quick start
//!
//! ```rust
//! use roost::prelude::*;
//! use roost::glam::Vec3;
//!
//! // Obstacles.
//! let mut shapes = ShapeRegistry::new();
//! shapes.add(Shape::sphere(Vec3::new(0.0, 0.0, 5.0), 1.0)).unwrap();
//! let mut world = CollisionWorld::new(CollisionConfig::new(), shapes).unwrap();
//! world.update().unwrap();
//! let hit = world.query(Vec3::ZERO, &QueryOptions::new());
//! assert!((hit.distance - 4.0).abs() < 1e-5);
//!
//! // Agents.
//! let positions = [Vec3::new(1.0, 1.0, 1.0), Vec3::new(-1.0, -1.0, -1.0)];
//! let mut agents = AgentBuffers::from_buffer(AgentBuffer::from_positions(&positions).unwrap());
//! let config = GridConfig::new(Vec3::ZERO, Vec3::splat(8.0), 2.0);
//! let mut grid = SpatialHashGrid::new(config).unwrap();
//! let frame = grid.rebuild(&mut agents).unwrap();
//! assert_eq!(frame.hashed, 2);
//! assert_eq!(grid.neighbours(Vec3::ZERO).count(), 2);
//! agents.swap();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`primitives`] | `roost-core` | Bounding boxes, the bounded-item contract, buffer growth |
//! | [`sort`] | `roost-sort` | Bitonic key/value sort and offset tables |
//! | [`bvh`] | `roost-bvh` | Collision shapes, the per-frame tree and nearest queries |
//! | [`grid`] | `roost-grid` | Agent buffers and the spatial hash grid |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Bounding boxes and buffer growth (`roost-core`).
pub use roost_core as primitives;

/// Bitonic sort and offset tables (`roost-sort`).
pub use roost_sort as sort;

/// Collision shapes and the bounding volume hierarchy (`roost-bvh`).
///
/// [`bvh::CollisionWorld`] is the usual entry point; [`bvh::BoundsTree`]
/// can be used directly over any [`primitives::BoundedItem`].
pub use roost_bvh as bvh;

/// Agent buffers and the spatial hash grid (`roost-grid`).
pub use roost_grid as grid;

/// The vector math types used throughout the API.
pub use glam;

/// Common imports for typical Roost usage.
///
/// ```rust
/// use roost::prelude::*;
/// ```
pub mod prelude {
    // Core
    pub use roost_core::{BoundedItem, BoundingBox, CapacityError};

    // Collision
    pub use roost_bvh::{
        BoundsTree, CollisionConfig, CollisionWorld, ConfigError, DistanceField, DistanceTable,
        QueryHit, QueryOptions, Shape, ShapeError, ShapeId, ShapeKind, ShapeRegistry, TreeConfig,
    };

    // Grid
    pub use roost_grid::{
        AgentBuffer, AgentBuffers, AgentLayout, GridConfig, GridError, GridFrame, GridKernels,
        SpatialHashGrid,
    };
}
