//! Flattened node records and build-time item references.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use roost_core::BoundingBox;

/// One node of a flattened bounding volume hierarchy.
///
/// A node with `item_count > 0` is a leaf covering payloads
/// `start_index..start_index + item_count`. Any other node is internal:
/// its children are the nodes at `start_index` and `start_index + 1`,
/// relative to the root offset used for the query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct BvhNode {
    /// Minimum corner of the node's bounds.
    pub bounds_min: Vec3,
    /// First payload (leaf) or left child (internal).
    pub start_index: u32,
    /// Maximum corner of the node's bounds.
    pub bounds_max: Vec3,
    /// Number of payloads; zero for internal nodes.
    pub item_count: u32,
}

impl BvhNode {
    /// A node with the given bounds and no children or items yet.
    pub fn with_bounds(bounds: BoundingBox) -> Self {
        Self {
            bounds_min: bounds.min,
            bounds_max: bounds.max,
            start_index: 0,
            item_count: 0,
        }
    }

    /// Whether this node holds payloads directly.
    pub fn is_leaf(&self) -> bool {
        self.item_count > 0
    }

    /// The node's bounds as a box.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(self.bounds_min, self.bounds_max)
    }

    /// Payload range of a leaf. Empty for internal nodes.
    pub fn item_range(&self) -> std::ops::Range<usize> {
        let start = self.start_index as usize;
        start..start + self.item_count as usize
    }
}

/// Working entry for one valid item during a build.
///
/// Item references are partitioned in place while the tree is split;
/// once the build finishes their order is the payload order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemRef {
    /// Minimum corner of the item's bounds.
    pub min: Vec3,
    /// Maximum corner of the item's bounds.
    pub max: Vec3,
    /// Center of the item's bounds.
    pub center: Vec3,
    /// Index of the item in the caller's slice.
    pub index: u32,
}
