//! Bounding volume hierarchy and collision shapes for Roost.
//!
//! A [`BoundsTree`] is rebuilt from scratch every frame over a set of
//! [`BoundedItem`](roost_core::BoundedItem)s. The build picks splits with
//! a volume-times-count cost heuristic and flattens the result into two
//! index-aligned buffers: [`BvhNode`]s and payloads. Both are plain
//! `Pod` records so a downstream kernel can consume them as bytes.
//!
//! [`BoundsTree::nearest`] walks the flattened tree with an explicit
//! stack and evaluates a caller-supplied [`DistanceField`] at the leaves.
//! The [`shape`] and [`distance`] modules provide the analytic shapes
//! (sphere, oriented box, capsule, capped torus) and the tag-dispatched
//! [`DistanceTable`]; [`CollisionWorld`] ties a [`ShapeRegistry`] to a
//! tree and rebuilds it once per frame.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod distance;
pub mod error;
pub mod id;
pub mod node;
pub mod query;
pub mod registry;
pub mod shape;
pub mod tree;
pub mod world;

pub use config::{CollisionConfig, QueryOptions, TreeConfig};
pub use distance::{DistanceField, DistanceFn, DistanceTable};
pub use error::{ConfigError, ShapeError};
pub use id::ShapeId;
pub use node::BvhNode;
pub use query::QueryHit;
pub use registry::ShapeRegistry;
pub use shape::{Shape, ShapeData, ShapeGeometry, ShapeKind, SurfaceMaterial};
pub use tree::{BoundsTree, BuildStats};
pub use world::CollisionWorld;
