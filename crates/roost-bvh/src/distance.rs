//! Signed-distance functions and the tag-dispatched distance table.
//!
//! Every function takes a world-space point and a [`ShapeData`] and
//! returns `(signed distance, outward unit normal)`. Distances are exact
//! Euclidean distances, negative inside. Where the normal is undefined
//! (a point on a sphere's center or a capsule's core) the world up
//! vector is returned.

use glam::{Vec2, Vec3};

use crate::error::ConfigError;
use crate::shape::{ShapeData, ShapeKind, KIND_MASK};

/// Normal reported when no better direction exists.
pub const DEFAULT_NORMAL: Vec3 = Vec3::Y;

/// A distance function for one shape kind.
pub type DistanceFn = fn(Vec3, &ShapeData) -> (f32, Vec3);

/// Anything that can measure signed distance from a point to a payload.
///
/// Implemented by [`DistanceTable`] for [`ShapeData`] payloads and by
/// any closure `Fn(Vec3, &P) -> (f32, Vec3)`.
pub trait DistanceField<P: ?Sized> {
    /// Signed distance and outward normal from `point` to `payload`.
    fn distance(&self, point: Vec3, payload: &P) -> (f32, Vec3);
}

impl<P: ?Sized, F> DistanceField<P> for F
where
    F: Fn(Vec3, &P) -> (f32, Vec3),
{
    fn distance(&self, point: Vec3, payload: &P) -> (f32, Vec3) {
        self(point, payload)
    }
}

const TABLE_LEN: usize = (KIND_MASK + 1) as usize;

/// Maps a shape's kind tag to its distance function.
///
/// Tags without an entry produce `(+inf, DEFAULT_NORMAL)`, which never
/// counts as a hit and never wins a nearest query.
#[derive(Clone, Debug)]
pub struct DistanceTable {
    entries: [Option<DistanceFn>; TABLE_LEN],
}

impl DistanceTable {
    /// A table with the four built-in kinds registered.
    pub fn new() -> Self {
        let mut table = Self::empty();
        table.entries[ShapeKind::Sphere.tag() as usize] = Some(sphere_distance);
        table.entries[ShapeKind::Box.tag() as usize] = Some(box_distance);
        table.entries[ShapeKind::Capsule.tag() as usize] = Some(capsule_distance);
        table.entries[ShapeKind::Torus.tag() as usize] = Some(torus_distance);
        table
    }

    /// A table with no entries.
    pub fn empty() -> Self {
        Self {
            entries: [None; TABLE_LEN],
        }
    }

    /// Register `function` for `tag`, returning the entry it replaced.
    pub fn register(
        &mut self,
        tag: u32,
        function: DistanceFn,
    ) -> Result<Option<DistanceFn>, ConfigError> {
        let slot = self.slot_mut(tag)?;
        Ok(slot.replace(function))
    }

    /// Remove the entry for `tag`, returning it.
    pub fn unregister(&mut self, tag: u32) -> Result<Option<DistanceFn>, ConfigError> {
        Ok(self.slot_mut(tag)?.take())
    }

    /// The function registered for `tag`.
    pub fn get(&self, tag: u32) -> Option<DistanceFn> {
        self.entries.get(tag as usize).copied().flatten()
    }

    fn slot_mut(&mut self, tag: u32) -> Result<&mut Option<DistanceFn>, ConfigError> {
        self.entries
            .get_mut(tag as usize)
            .ok_or(ConfigError::TagOutOfRange {
                tag,
                max: KIND_MASK,
            })
    }
}

impl Default for DistanceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DistanceField<ShapeData> for DistanceTable {
    fn distance(&self, point: Vec3, payload: &ShapeData) -> (f32, Vec3) {
        match self.get(payload.kind_tag()) {
            Some(function) => function(point, payload),
            None => (f32::INFINITY, DEFAULT_NORMAL),
        }
    }
}

/// Unit vector along `v`, or [`DEFAULT_NORMAL`] when `v` has no direction.
pub fn unit_or_default(v: Vec3) -> Vec3 {
    let n = v.normalize_or_zero();
    if n == Vec3::ZERO {
        DEFAULT_NORMAL
    } else {
        n
    }
}

/// Sphere: `params.x` is the radius.
pub fn sphere_distance(point: Vec3, data: &ShapeData) -> (f32, Vec3) {
    let radius = data.params.x;
    let diff = point - data.translate;
    let len = diff.length();
    if len > 0.0 {
        (len - radius, diff / len)
    } else {
        (-radius, DEFAULT_NORMAL)
    }
}

/// Oriented box: `params` holds the half extents.
///
/// Outside, the normal points from the nearest surface point to `point`.
/// Inside, it is the axis of the nearest face.
pub fn box_distance(point: Vec3, data: &ShapeData) -> (f32, Vec3) {
    let q = data.to_local(point);
    let diff = q.abs() - data.params;
    let outside = diff.max(Vec3::ZERO);
    let distance = outside.length() + diff.max_element().min(0.0);
    let local = if distance > 0.0 {
        outside * q.signum()
    } else {
        largest_axis(diff) * q.signum()
    };
    (distance, unit_or_default(data.to_world_dir(local)))
}

/// Capsule: `params.x` is the radius, `params.y` the core length along local Y.
pub fn capsule_distance(point: Vec3, data: &ShapeData) -> (f32, Vec3) {
    let radius = data.params.x;
    let half = (data.params.y * 0.5).abs();
    let q = data.to_local(point);
    let core = Vec3::new(0.0, q.y.max(-half).min(half), 0.0);
    let offset = q - core;
    let len = offset.length();
    if len > 0.0 {
        (len - radius, unit_or_default(data.to_world_dir(offset / len)))
    } else {
        (-radius, DEFAULT_NORMAL)
    }
}

/// Capped torus: `params` is `(ring radius, thickness, height)`.
///
/// The core is a band of the given radius in the local XZ plane spanning
/// `height` along local Y; the surface lies `thickness` away from it.
pub fn torus_distance(point: Vec3, data: &ShapeData) -> (f32, Vec3) {
    let radius = data.params.x;
    let thickness = data.params.y;
    let half = (data.params.z * 0.5).abs();
    let q = data.to_local(point);

    let ring = Vec2::new(q.x, q.z);
    let ring_len = ring.length();
    let radial_dir = if ring_len > 0.0 { ring / ring_len } else { Vec2::X };
    let radial = ring_len - radius;
    let vertical = (q.y.abs() - half).max(0.0) * q.y.signum();

    let offset = Vec3::new(radial_dir.x * radial, vertical, radial_dir.y * radial);
    let len = offset.length();
    if len > 0.0 {
        (len - thickness, unit_or_default(data.to_world_dir(offset / len)))
    } else {
        (-thickness, DEFAULT_NORMAL)
    }
}

fn largest_axis(v: Vec3) -> Vec3 {
    if v.x >= v.y && v.x >= v.z {
        Vec3::X
    } else if v.y >= v.z {
        Vec3::Y
    } else {
        Vec3::Z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;
    use glam::Quat;
    use proptest::prelude::*;
    use std::f32::consts::FRAC_PI_2;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn close_vec(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    // ── Sphere ──────────────────────────────────────────────────

    #[test]
    fn sphere_outside_inside_center() {
        let data = Shape::sphere(Vec3::new(1.0, 0.0, 0.0), 2.0).data();
        let (d, n) = sphere_distance(Vec3::new(5.0, 0.0, 0.0), &data);
        assert!(close(d, 2.0));
        assert!(close_vec(n, Vec3::X));

        let (d, n) = sphere_distance(Vec3::new(1.0, -1.0, 0.0), &data);
        assert!(close(d, -1.0));
        assert!(close_vec(n, -Vec3::Y));

        let (d, n) = sphere_distance(Vec3::new(1.0, 0.0, 0.0), &data);
        assert!(close(d, -2.0));
        assert_eq!(n, DEFAULT_NORMAL);
    }

    // ── Box ─────────────────────────────────────────────────────

    #[test]
    fn box_face_edge_and_inside() {
        let data = Shape::cuboid(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0)).data();
        let (d, n) = box_distance(Vec3::new(3.0, 0.0, 0.0), &data);
        assert!(close(d, 2.0));
        assert!(close_vec(n, Vec3::X));

        let (d, n) = box_distance(Vec3::new(2.0, 3.0, 0.0), &data);
        assert!(close(d, 2f32.sqrt()));
        assert!(close_vec(n, Vec3::new(1.0, 1.0, 0.0).normalize()));

        let (d, n) = box_distance(Vec3::new(0.0, 0.0, 2.5), &data);
        assert!(close(d, -0.5));
        assert!(close_vec(n, Vec3::Z));
    }

    #[test]
    fn rotated_box_normal_is_in_world_space() {
        let data = Shape::cuboid(Vec3::ZERO, Vec3::new(1.0, 3.0, 1.0))
            .with_rotation(Quat::from_rotation_z(FRAC_PI_2))
            .data();
        // Local Y now points along world -X; the long side lies on the X axis.
        let (d, n) = box_distance(Vec3::new(-5.0, 0.0, 0.0), &data);
        assert!(close(d, 2.0));
        assert!(close_vec(n, -Vec3::X));
    }

    // ── Capsule ─────────────────────────────────────────────────

    #[test]
    fn capsule_side_and_cap() {
        let data = Shape::capsule(Vec3::ZERO, 0.5, 2.0).data();
        let (d, n) = capsule_distance(Vec3::new(2.0, 0.5, 0.0), &data);
        assert!(close(d, 1.5));
        assert!(close_vec(n, Vec3::X));

        let (d, n) = capsule_distance(Vec3::new(0.0, 3.0, 0.0), &data);
        assert!(close(d, 1.5));
        assert!(close_vec(n, Vec3::Y));

        let (d, _) = capsule_distance(Vec3::new(0.0, 0.2, 0.0), &data);
        assert!(close(d, -0.5));
    }

    // ── Torus ───────────────────────────────────────────────────

    #[test]
    fn torus_ring_and_hole() {
        let data = Shape::torus(Vec3::ZERO, 2.0, 0.5, 0.0).data();
        let (d, _) = torus_distance(Vec3::new(2.0, 0.0, 0.0), &data);
        assert!(close(d, -0.5));

        let (d, n) = torus_distance(Vec3::ZERO, &data);
        assert!(close(d, 1.5));
        assert!(close_vec(n, -Vec3::X));

        let (d, n) = torus_distance(Vec3::new(0.0, 0.0, 2.0) + Vec3::Y * 1.5, &data);
        assert!(close(d, 1.0));
        assert!(close_vec(n, Vec3::Y));
    }

    #[test]
    fn torus_height_extrudes_the_ring() {
        let data = Shape::torus(Vec3::ZERO, 2.0, 0.5, 2.0).data();
        let (d, _) = torus_distance(Vec3::new(2.0, 0.9, 0.0), &data);
        assert!(close(d, -0.5));
        let (d, _) = torus_distance(Vec3::new(2.0, 2.0, 0.0), &data);
        assert!(close(d, 0.5));
    }

    // ── Table ───────────────────────────────────────────────────

    #[test]
    fn unknown_tag_never_hits() {
        let table = DistanceTable::new();
        let mut data = Shape::sphere(Vec3::ZERO, 1.0).data();
        data.type_word = 0x0E;
        let (d, n) = table.distance(Vec3::ZERO, &data);
        assert_eq!(d, f32::INFINITY);
        assert_eq!(n, DEFAULT_NORMAL);
    }

    #[test]
    fn register_replaces_and_rejects_wide_tags() {
        fn flat(_: Vec3, _: &ShapeData) -> (f32, Vec3) {
            (-7.0, Vec3::Z)
        }
        let mut table = DistanceTable::new();
        let previous = table.register(ShapeKind::Sphere.tag(), flat).unwrap();
        assert!(previous.is_some());
        let data = Shape::sphere(Vec3::ZERO, 1.0).data();
        assert_eq!(table.distance(Vec3::X * 10.0, &data), (-7.0, Vec3::Z));
        assert!(matches!(
            table.register(16, flat),
            Err(ConfigError::TagOutOfRange { tag: 16, max: 15 })
        ));
        assert!(table.unregister(ShapeKind::Sphere.tag()).unwrap().is_some());
        assert!(table.get(ShapeKind::Sphere.tag()).is_none());
        assert!(DistanceTable::empty().get(0).is_none());
    }

    #[test]
    fn closures_are_distance_fields() {
        let field = |p: Vec3, r: &f32| (p.length() - *r, unit_or_default(p));
        assert!(close(field.distance(Vec3::X * 3.0, &1.0).0, 2.0));
    }

    proptest! {
        #[test]
        fn sphere_normal_matches_finite_difference(
            x in -10.0f32..10.0,
            y in -10.0f32..10.0,
            z in -10.0f32..10.0,
        ) {
            let p = Vec3::new(x, y, z);
            prop_assume!(p.length() > 0.5);
            let data = Shape::sphere(Vec3::ZERO, 1.0).data();
            let (d, n) = sphere_distance(p, &data);
            let h = 1e-2;
            let g = Vec3::new(
                sphere_distance(p + Vec3::X * h, &data).0 - d,
                sphere_distance(p + Vec3::Y * h, &data).0 - d,
                sphere_distance(p + Vec3::Z * h, &data).0 - d,
            ).normalize();
            prop_assert!((g - n).length() < 0.05);
        }
    }
}
