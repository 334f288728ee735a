//! Cell lattice geometry: dimensions, hashing and center snapping.

use glam::{IVec3, UVec3, Vec3};
use roost_core::BoundingBox;

use crate::config::GridConfig;
use crate::error::GridError;

/// The cell lattice of a grid.
///
/// Cells are indexed linearly as `x + dims.x * (y + dims.y * z)`. The
/// covered region can follow a moving target (see [`follow`](Self::follow)),
/// but its center is always snapped to the lattice of the configured
/// center so that cell boundaries never drift between frames.
#[derive(Clone, Debug, PartialEq)]
pub struct GridLayout {
    anchor: Vec3,
    center: Vec3,
    size: Vec3,
    cell_size: f32,
    dims: UVec3,
    cell_count: usize,
}

impl GridLayout {
    /// Build the lattice described by a validated config.
    pub fn from_config(config: &GridConfig) -> Result<Self, GridError> {
        config.validate()?;
        let [x, y, z] = config.dims();
        let dims = UVec3::new(x as u32, y as u32, z as u32);
        Ok(Self {
            anchor: config.center,
            center: config.center,
            size: config.size,
            cell_size: config.cell_size,
            dims,
            cell_count: (x * y * z) as usize,
        })
    }

    /// Cells per axis.
    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    /// Edge length of a cell.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Current (snapped) center of the covered region.
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Extent of the covered region.
    pub fn size(&self) -> Vec3 {
        self.size
    }

    /// Minimum corner of the covered region.
    pub fn min_bound(&self) -> Vec3 {
        self.center - self.size * 0.5
    }

    /// Cell coordinates of `point`, without clamping.
    pub fn cell_coords(&self, point: Vec3) -> IVec3 {
        ((point - self.min_bound()) / self.cell_size).floor().as_ivec3()
    }

    /// Whether `coords` names a cell of the lattice.
    pub fn contains_coords(&self, coords: IVec3) -> bool {
        coords.cmpge(IVec3::ZERO).all() && coords.cmplt(self.dims.as_ivec3()).all()
    }

    /// `coords` clamped into the lattice.
    pub fn clamp_coords(&self, coords: IVec3) -> UVec3 {
        coords
            .max(IVec3::ZERO)
            .min(self.dims.as_ivec3() - IVec3::ONE)
            .as_uvec3()
    }

    /// Linear index of in-range cell coordinates.
    pub fn linear_index(&self, coords: UVec3) -> usize {
        let d = self.dims;
        coords.x as usize + d.x as usize * (coords.y as usize + d.y as usize * coords.z as usize)
    }

    /// Linear index of `coords`, or `None` outside the lattice.
    pub fn checked_index(&self, coords: IVec3) -> Option<usize> {
        self.contains_coords(coords)
            .then(|| self.linear_index(coords.as_uvec3()))
    }

    /// Cell coordinates of a linear index.
    pub fn coords_of(&self, index: usize) -> UVec3 {
        let dx = self.dims.x as usize;
        let dy = self.dims.y as usize;
        UVec3::new(
            (index % dx) as u32,
            ((index / dx) % dy) as u32,
            (index / (dx * dy)) as u32,
        )
    }

    /// Hash `point` to a cell.
    ///
    /// Returns the linear cell index and whether the point had to be
    /// clamped into a border cell. Non-finite positions land in a clamped
    /// cell and are always reported as clamped.
    pub fn cell_of(&self, point: Vec3) -> (u32, bool) {
        let raw = self.cell_coords(point);
        let clamped = !point.is_finite() || !self.contains_coords(raw);
        let cell = self.linear_index(self.clamp_coords(raw));
        (cell as u32, clamped)
    }

    /// World-space bounds of a cell.
    pub fn cell_bounds(&self, index: usize) -> BoundingBox {
        let min = self.min_bound() + self.coords_of(index).as_vec3() * self.cell_size;
        BoundingBox::new(min, min + Vec3::splat(self.cell_size))
    }

    /// Where the region's center would sit if it followed `target`.
    ///
    /// The result differs from the configured center by a whole number
    /// of cells on every axis.
    pub fn snapped_to(&self, target: Vec3) -> Vec3 {
        let cell = self.cell_size;
        let anchor_min = self.anchor - self.size * 0.5;
        let rel = self.anchor - anchor_min;
        let phase = rel - (rel / cell).floor() * cell;
        anchor_min + ((target - anchor_min) / cell).floor() * cell + phase
    }

    /// Move the covered region to follow `target`, snapped to the lattice.
    pub fn follow(&mut self, target: Vec3) {
        self.center = self.snapped_to(target);
    }

    /// Return the covered region to the configured center.
    pub fn reset_center(&mut self) {
        self.center = self.anchor;
    }
}
