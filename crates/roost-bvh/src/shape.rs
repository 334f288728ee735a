//! Analytic collision shapes and their packed payload record.
//!
//! A [`Shape`] is the authoring-side description: geometry, a pose and a
//! surface material. [`Shape::data`] packs it into a [`ShapeData`], the
//! 16-word record stored in the tree's payload buffer and read by the
//! distance functions in [`distance`](crate::distance).

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Quat, Vec3};
use roost_core::BoundingBox;

use crate::error::ShapeError;

/// Low nibble of [`ShapeData::type_word`]: the shape kind tag.
pub const KIND_MASK: u32 = 0x0F;

/// Bit offset of the material tag within [`ShapeData::type_word`].
pub const MATERIAL_SHIFT: u32 = 4;

/// The analytic shape kinds with built-in distance functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ShapeKind {
    /// A ball.
    Sphere = 0,
    /// An oriented rectangular box.
    Box = 1,
    /// A segment along the local Y axis swept by a ball.
    Capsule = 2,
    /// A ring in the local XZ plane extruded along local Y and swept by a ball.
    Torus = 3,
}

impl ShapeKind {
    /// Every built-in kind.
    pub const ALL: [ShapeKind; 4] = [Self::Sphere, Self::Box, Self::Capsule, Self::Torus];

    /// The kind's tag value.
    pub fn tag(self) -> u32 {
        self as u32
    }

    /// The kind for a tag, if it is a built-in one.
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Sphere),
            1 => Some(Self::Box),
            2 => Some(Self::Capsule),
            3 => Some(Self::Torus),
            _ => None,
        }
    }
}

/// Surface material tag carried alongside a shape (4 bits).
///
/// The tag is opaque to Roost; downstream kernels use it to pick a
/// reaction when an agent touches the shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SurfaceMaterial(pub u8);

impl SurfaceMaterial {
    /// Largest representable tag.
    pub const MAX: u8 = 0x0F;
}

/// Packed per-shape record consumed by the distance functions.
///
/// The three axes are the shape's local basis expressed in world space
/// (unit vectors). `params` holds the geometry:
///
/// | kind | `params` |
/// |------|----------|
/// | sphere | `(radius, 0, 0)` |
/// | box | half extents |
/// | capsule | `(radius, height, 0)` |
/// | torus | `(radius, thickness, height)` |
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ShapeData {
    /// Local X axis in world space.
    pub x_axis: Vec3,
    /// Local Y axis in world space.
    pub y_axis: Vec3,
    /// Local Z axis in world space.
    pub z_axis: Vec3,
    /// Shape center in world space.
    pub translate: Vec3,
    /// Kind-specific geometry parameters.
    pub params: Vec3,
    /// Kind tag in the low nibble, material tag in the next nibble.
    pub type_word: u32,
}

impl ShapeData {
    /// The kind tag, `type_word & 0x0F`.
    pub fn kind_tag(&self) -> u32 {
        self.type_word & KIND_MASK
    }

    /// The built-in kind, if the tag names one.
    pub fn kind(&self) -> Option<ShapeKind> {
        ShapeKind::from_tag(self.kind_tag())
    }

    /// The material tag.
    pub fn material(&self) -> SurfaceMaterial {
        SurfaceMaterial(((self.type_word >> MATERIAL_SHIFT) & KIND_MASK) as u8)
    }

    /// `point` in the shape's local frame.
    pub fn to_local(&self, point: Vec3) -> Vec3 {
        let d = point - self.translate;
        Vec3::new(d.dot(self.x_axis), d.dot(self.y_axis), d.dot(self.z_axis))
    }

    /// A local-frame direction expressed in world space.
    pub fn to_world_dir(&self, local: Vec3) -> Vec3 {
        self.x_axis * local.x + self.y_axis * local.y + self.z_axis * local.z
    }
}

/// Geometry of a [`Shape`], in its local frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShapeGeometry {
    /// Ball of the given radius.
    Sphere {
        /// Radius.
        radius: f32,
    },
    /// Box with the given half extents along the local axes.
    Box {
        /// Half edge lengths.
        half_extents: Vec3,
    },
    /// Capsule along local Y; `height` is the distance between the cap centers.
    Capsule {
        /// Radius of the swept ball.
        radius: f32,
        /// Length of the core segment.
        height: f32,
    },
    /// Ring of `radius` in the local XZ plane, extruded over `height`
    /// along local Y and swept by a ball of radius `thickness`.
    Torus {
        /// Ring radius.
        radius: f32,
        /// Tube radius.
        thickness: f32,
        /// Extrusion length along local Y.
        height: f32,
    },
}

/// A posed analytic shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shape {
    /// Local geometry.
    pub geometry: ShapeGeometry,
    /// World-space center.
    pub center: Vec3,
    /// Orientation of the local frame.
    pub rotation: Quat,
    /// Surface material tag.
    pub material: SurfaceMaterial,
}

impl Shape {
    fn posed(geometry: ShapeGeometry, center: Vec3) -> Self {
        Self {
            geometry,
            center,
            rotation: Quat::IDENTITY,
            material: SurfaceMaterial::default(),
        }
    }

    /// An unrotated sphere.
    pub fn sphere(center: Vec3, radius: f32) -> Self {
        Self::posed(ShapeGeometry::Sphere { radius }, center)
    }

    /// An axis-aligned box; rotate it with [`with_rotation`](Self::with_rotation).
    pub fn cuboid(center: Vec3, half_extents: Vec3) -> Self {
        Self::posed(ShapeGeometry::Box { half_extents }, center)
    }

    /// A capsule along world Y; rotate it with [`with_rotation`](Self::with_rotation).
    pub fn capsule(center: Vec3, radius: f32, height: f32) -> Self {
        Self::posed(ShapeGeometry::Capsule { radius, height }, center)
    }

    /// A torus lying in the world XZ plane.
    pub fn torus(center: Vec3, radius: f32, thickness: f32, height: f32) -> Self {
        Self::posed(
            ShapeGeometry::Torus {
                radius,
                thickness,
                height,
            },
            center,
        )
    }

    /// The same shape with a different orientation.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// The same shape with a different material.
    pub fn with_material(mut self, material: SurfaceMaterial) -> Self {
        self.material = material;
        self
    }

    /// The shape's kind.
    pub fn kind(&self) -> ShapeKind {
        match self.geometry {
            ShapeGeometry::Sphere { .. } => ShapeKind::Sphere,
            ShapeGeometry::Box { .. } => ShapeKind::Box,
            ShapeGeometry::Capsule { .. } => ShapeKind::Capsule,
            ShapeGeometry::Torus { .. } => ShapeKind::Torus,
        }
    }

    /// Check dimensions, pose and material.
    pub fn validate(&self) -> Result<(), ShapeError> {
        if !self.center.is_finite()
            || !self.rotation.is_finite()
            || self.rotation.length_squared() < 1e-12
        {
            return Err(ShapeError::NonFiniteTransform);
        }
        if self.material.0 > SurfaceMaterial::MAX {
            return Err(ShapeError::InvalidDimension {
                name: "material",
                value: self.material.0 as f32,
            });
        }
        match self.geometry {
            ShapeGeometry::Sphere { radius } => positive("radius", radius),
            ShapeGeometry::Box { half_extents } => {
                positive("half_extents.x", half_extents.x)?;
                positive("half_extents.y", half_extents.y)?;
                positive("half_extents.z", half_extents.z)
            }
            ShapeGeometry::Capsule { radius, height } => {
                positive("radius", radius)?;
                non_negative("height", height)
            }
            ShapeGeometry::Torus {
                radius,
                thickness,
                height,
            } => {
                non_negative("radius", radius)?;
                positive("thickness", thickness)?;
                non_negative("height", height)
            }
        }
    }

    fn basis(&self) -> Mat3 {
        Mat3::from_quat(self.rotation.normalize())
    }

    /// World-space bounds of the shape.
    pub fn bounds(&self) -> BoundingBox {
        let basis = self.basis();
        let half = match self.geometry {
            ShapeGeometry::Sphere { radius } => Vec3::splat(radius),
            ShapeGeometry::Box { half_extents } => rotated_extents(&basis, half_extents),
            ShapeGeometry::Capsule { radius, height } => {
                basis.y_axis.abs() * (height * 0.5) + Vec3::splat(radius)
            }
            ShapeGeometry::Torus {
                radius,
                thickness,
                height,
            } => rotated_extents(
                &basis,
                Vec3::new(radius + thickness, height * 0.5 + thickness, radius + thickness),
            ),
        };
        BoundingBox::from_center_half_extents(self.center, half)
    }

    /// Pack the shape into its payload record.
    pub fn data(&self) -> ShapeData {
        let basis = self.basis();
        let params = match self.geometry {
            ShapeGeometry::Sphere { radius } => Vec3::new(radius, 0.0, 0.0),
            ShapeGeometry::Box { half_extents } => half_extents,
            ShapeGeometry::Capsule { radius, height } => Vec3::new(radius, height, 0.0),
            ShapeGeometry::Torus {
                radius,
                thickness,
                height,
            } => Vec3::new(radius, thickness, height),
        };
        let material = (self.material.0 as u32 & KIND_MASK) << MATERIAL_SHIFT;
        ShapeData {
            x_axis: basis.x_axis,
            y_axis: basis.y_axis,
            z_axis: basis.z_axis,
            translate: self.center,
            params,
            type_word: self.kind().tag() | material,
        }
    }
}

fn rotated_extents(basis: &Mat3, local_half: Vec3) -> Vec3 {
    basis.x_axis.abs() * local_half.x
        + basis.y_axis.abs() * local_half.y
        + basis.z_axis.abs() * local_half.z
}

fn positive(name: &'static str, value: f32) -> Result<(), ShapeError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ShapeError::InvalidDimension { name, value })
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ShapeError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ShapeError::InvalidDimension { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn shape_data_is_sixteen_words() {
        assert_eq!(std::mem::size_of::<ShapeData>(), 64);
    }

    #[test]
    fn type_word_packs_kind_and_material() {
        let data = Shape::torus(Vec3::ZERO, 2.0, 0.5, 1.0)
            .with_material(SurfaceMaterial(9))
            .data();
        assert_eq!(data.kind(), Some(ShapeKind::Torus));
        assert_eq!(data.material(), SurfaceMaterial(9));
        assert_eq!(data.type_word, 3 | (9 << 4));
    }

    #[test]
    fn kind_tags_round_trip() {
        for kind in ShapeKind::ALL {
            assert_eq!(ShapeKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ShapeKind::from_tag(7), None);
    }

    #[test]
    fn sphere_bounds() {
        let b = Shape::sphere(Vec3::new(1.0, 2.0, 3.0), 0.5).bounds();
        assert_eq!(b.min, Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(b.max, Vec3::new(1.5, 2.5, 3.5));
    }

    #[test]
    fn rotated_box_bounds_grow() {
        let cube = Shape::cuboid(Vec3::ZERO, Vec3::ONE);
        let turned = cube.with_rotation(Quat::from_rotation_y(FRAC_PI_4));
        let b = turned.bounds();
        let expected = 2f32.sqrt();
        assert!((b.max.x - expected).abs() < 1e-5);
        assert!((b.max.z - expected).abs() < 1e-5);
        assert!((b.max.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn capsule_bounds_cover_caps() {
        let b = Shape::capsule(Vec3::ZERO, 0.5, 2.0).bounds();
        assert!((b.max.y - 1.5).abs() < 1e-6);
        assert!((b.max.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn local_frame_round_trip() {
        let data = Shape::cuboid(Vec3::new(1.0, 0.0, 0.0), Vec3::ONE)
            .with_rotation(Quat::from_rotation_z(0.3))
            .data();
        let p = Vec3::new(2.0, 3.0, -1.0);
        let local = data.to_local(p);
        let back = data.to_world_dir(local) + data.translate;
        assert!((back - p).length() < 1e-5);
    }

    #[test]
    fn validate_rejects_bad_dimensions() {
        assert!(Shape::sphere(Vec3::ZERO, 1.0).validate().is_ok());
        assert!(matches!(
            Shape::sphere(Vec3::ZERO, -1.0).validate(),
            Err(ShapeError::InvalidDimension { name: "radius", .. })
        ));
        assert!(Shape::cuboid(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0))
            .validate()
            .is_err());
        assert!(Shape::torus(Vec3::ZERO, 1.0, f32::NAN, 0.0).validate().is_err());
        assert_eq!(
            Shape::sphere(Vec3::splat(f32::INFINITY), 1.0).validate(),
            Err(ShapeError::NonFiniteTransform)
        );
        assert!(Shape::sphere(Vec3::ZERO, 1.0)
            .with_material(SurfaceMaterial(16))
            .validate()
            .is_err());
    }
}
