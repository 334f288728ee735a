//! Axis-aligned bounding boxes and the bounded-item contract.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// An axis-aligned bounding box in world space.
///
/// The empty box is represented with inverted infinite corners, so that
/// growing it by any point or box yields exactly that point or box. An
/// empty box has zero size, zero volume and never contains anything.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl BoundingBox {
    /// The empty box: the identity for [`union`](Self::union).
    pub const EMPTY: Self = Self {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    /// Create a box from its two corners.
    ///
    /// The corners are taken as given; a box whose `min` exceeds `max`
    /// on any axis is treated as empty.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create a box from a center point and half extents.
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Create a degenerate box containing a single point.
    pub fn from_point(point: Vec3) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Whether this box contains no points.
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Whether both corners are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Grow this box to also cover `[min, max]`.
    pub fn grow_to_include(&mut self, min: Vec3, max: Vec3) {
        self.min = self.min.min(min);
        self.max = self.max.max(max);
    }

    /// Grow this box to also cover `point`.
    pub fn grow_to_include_point(&mut self, point: Vec3) {
        self.grow_to_include(point, point);
    }

    /// The smallest box covering both `self` and `other`.
    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// This box grown by `margin` on every side.
    pub fn expanded(self, margin: f32) -> Self {
        if self.is_empty() {
            return self;
        }
        Self {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    /// Edge lengths. Zero for an empty box.
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Center point. The origin for an empty box.
    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            (self.min + self.max) * 0.5
        }
    }

    /// Half of [`size`](Self::size).
    pub fn half_extents(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Product of the edge lengths. Zero for empty or flat boxes.
    pub fn volume(&self) -> f32 {
        let s = self.size();
        s.x * s.y * s.z
    }

    /// Whether `point` lies inside or on the boundary of this box.
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Whether `other` lies entirely inside or on the boundary of this box.
    ///
    /// Every box contains the empty box.
    pub fn contains_box(&self, other: &Self) -> bool {
        if other.is_empty() {
            return true;
        }
        other.min.cmpge(self.min).all() && other.max.cmple(self.max).all()
    }

    /// Signed distance from `point` to the surface of this box.
    ///
    /// Negative inside, positive outside, zero on the surface. The empty
    /// box is infinitely far from everything.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        if self.is_empty() {
            return f32::INFINITY;
        }
        let q = (point - self.center()).abs() - self.half_extents();
        q.max(Vec3::ZERO).length() + q.max_element().min(0.0)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// An item that can be stored in a bounding-volume tree.
///
/// The tree reads the item's bounds during the build and copies its
/// payload into the reordered payload buffer. Items reporting
/// [`is_valid`](Self::is_valid) `== false` are skipped entirely.
pub trait BoundedItem {
    /// The per-item record copied into the tree's payload buffer.
    type Payload: Copy;

    /// Minimum corner of the item's bounds.
    fn bounds_min(&self) -> Vec3;

    /// Maximum corner of the item's bounds.
    fn bounds_max(&self) -> Vec3;

    /// The record the tree stores for this item.
    fn payload(&self) -> Self::Payload;

    /// Whether this item takes part in the build.
    fn is_valid(&self) -> bool {
        true
    }

    /// The item's bounds as a box.
    fn bounds(&self) -> BoundingBox {
        BoundingBox::new(self.bounds_min(), self.bounds_max())
    }

    /// Center of the item's bounds; used to decide split sides.
    fn center(&self) -> Vec3 {
        (self.bounds_min() + self.bounds_max()) * 0.5
    }
}
