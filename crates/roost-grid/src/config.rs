//! Grid configuration and cell sizing.

use glam::Vec3;

use crate::error::GridError;

/// Configuration for a [`SpatialHashGrid`](crate::SpatialHashGrid).
///
/// The grid covers the box of extent `size` centered on `center`, cut
/// into cubic cells of edge `cell_size`. Agents outside the box are
/// clamped into the nearest border cell.
#[derive(Clone, Debug, PartialEq)]
pub struct GridConfig {
    /// Center of the covered region, and the anchor of the cell lattice.
    pub center: Vec3,

    /// Extent of the covered region on each axis.
    pub size: Vec3,

    /// Edge length of a cell.
    ///
    /// Should be at least the largest interaction radius of any agent so
    /// that every neighbour lies in the surrounding 3x3x3 block.
    pub cell_size: f32,

    /// Cells per dispatch group in the prefix-sum phases. Default: 256.
    pub group_size: u32,

    /// Hash only the first `K` agents, with `K` read from an attached
    /// counter each rebuild. Default: `false`.
    pub alive_count: bool,
}

impl GridConfig {
    /// Default cells per dispatch group.
    pub const DEFAULT_GROUP_SIZE: u32 = 256;

    /// Largest supported cell count. Offsets and counts are `u32`, and the
    /// table carries one trailing entry.
    pub const MAX_CELL_COUNT: usize = (u32::MAX - 1) as usize;

    /// Create a config with the default group size and alive-count off.
    pub fn new(center: Vec3, size: Vec3, cell_size: f32) -> Self {
        Self {
            center,
            size,
            cell_size,
            group_size: Self::DEFAULT_GROUP_SIZE,
            alive_count: false,
        }
    }

    /// Create a config whose cell size is derived from agent profiles.
    ///
    /// `fallback` is used when no profile reports a radius.
    pub fn sized_for(
        center: Vec3,
        size: Vec3,
        profiles: &[AgentProfile],
        sizing: &CellSizing,
        fallback: f32,
    ) -> Self {
        Self::new(center, size, sizing.cell_size(profiles, fallback))
    }

    /// Cells per axis: `ceil(size / cell_size)`, at least one.
    pub fn dims(&self) -> [u64; 3] {
        let d = (self.size / self.cell_size).ceil().max(Vec3::ONE);
        [d.x as u64, d.y as u64, d.z as u64]
    }

    /// Check every field, including that the cell count fits.
    pub fn validate(&self) -> Result<(), GridError> {
        if !self.center.is_finite() {
            return Err(GridError::InvalidConfig {
                reason: "center must be finite".into(),
            });
        }
        if !self.size.is_finite() || self.size.min_element() <= 0.0 {
            return Err(GridError::InvalidConfig {
                reason: format!("size must be finite and positive, got {}", self.size),
            });
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(GridError::InvalidConfig {
                reason: format!("cell_size must be finite and positive, got {}", self.cell_size),
            });
        }
        if self.group_size == 0 {
            return Err(GridError::InvalidConfig {
                reason: "group_size must be at least 1".into(),
            });
        }
        let [x, y, z] = self.dims();
        let cells = x
            .checked_mul(y)
            .and_then(|xy| xy.checked_mul(z))
            .filter(|&c| c <= Self::MAX_CELL_COUNT as u64);
        if cells.is_none() {
            return Err(GridError::InvalidConfig {
                reason: format!("{x}x{y}x{z} cells exceed {}", Self::MAX_CELL_COUNT),
            });
        }
        Ok(())
    }
}

/// Interaction radii of one kind of agent.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentProfile {
    /// Display name.
    pub name: String,
    /// Every radius the agent uses to look for neighbours
    /// (separation, alignment, cohesion, threat, ...).
    pub radii: Vec<f32>,
}

impl AgentProfile {
    /// Create a profile.
    pub fn new(name: impl Into<String>, radii: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            radii,
        }
    }

    /// Largest finite, positive radius, or zero.
    pub fn largest_radius(&self) -> f32 {
        self.radii
            .iter()
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
            .fold(0.0, f32::max)
    }
}

/// Derives a cell size from the largest interaction radius.
#[derive(Clone, Debug, PartialEq)]
pub struct CellSizing {
    /// Multiplier applied to the largest radius. Default: 1.0.
    pub ratio: f32,
    /// Smallest cell size returned. Default: 0.01.
    pub min_cell_size: f32,
}

impl CellSizing {
    /// Default ratio.
    pub const DEFAULT_RATIO: f32 = 1.0;

    /// Default lower bound on the cell size.
    pub const DEFAULT_MIN_CELL_SIZE: f32 = 0.01;

    /// A sizing with the given ratio and the default minimum.
    pub fn new(ratio: f32) -> Self {
        Self {
            ratio,
            min_cell_size: Self::DEFAULT_MIN_CELL_SIZE,
        }
    }

    /// Check that the ratio and minimum are finite and positive.
    pub fn validate(&self) -> Result<(), GridError> {
        if !self.ratio.is_finite() || self.ratio <= 0.0 {
            return Err(GridError::InvalidConfig {
                reason: format!("cell size ratio must be finite and positive, got {}", self.ratio),
            });
        }
        if !self.min_cell_size.is_finite() || self.min_cell_size <= 0.0 {
            return Err(GridError::InvalidConfig {
                reason: format!(
                    "min_cell_size must be finite and positive, got {}",
                    self.min_cell_size
                ),
            });
        }
        Ok(())
    }

    /// Largest radius across `profiles` times the ratio, or `fallback` if
    /// none of them has a radius.
    pub fn cell_size(&self, profiles: &[AgentProfile], fallback: f32) -> f32 {
        let largest = profiles
            .iter()
            .map(AgentProfile::largest_radius)
            .fold(0.0, f32::max);
        if largest > 0.0 {
            (largest * self.ratio).max(self.min_cell_size)
        } else {
            fallback
        }
    }
}

impl Default for CellSizing {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RATIO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dims_round_up() {
        let cfg = GridConfig::new(Vec3::ZERO, Vec3::new(10.0, 4.5, 1.0), 2.0);
        assert_eq!(cfg.dims(), [5, 3, 1]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let base = GridConfig::new(Vec3::ZERO, Vec3::splat(10.0), 1.0);
        assert!(GridConfig { cell_size: 0.0, ..base.clone() }.validate().is_err());
        assert!(GridConfig { cell_size: f32::NAN, ..base.clone() }.validate().is_err());
        assert!(GridConfig { size: Vec3::new(1.0, 0.0, 1.0), ..base.clone() }.validate().is_err());
        assert!(GridConfig { group_size: 0, ..base.clone() }.validate().is_err());
        assert!(GridConfig { center: Vec3::splat(f32::INFINITY), ..base }.validate().is_err());
    }

    #[test]
    fn validate_rejects_huge_cell_counts() {
        let cfg = GridConfig::new(Vec3::ZERO, Vec3::splat(1.0e6), 0.1);
        assert!(matches!(cfg.validate(), Err(GridError::InvalidConfig { .. })));
    }

    #[test]
    fn cell_size_uses_largest_radius() {
        let profiles = vec![
            AgentProfile::new("sparrow", vec![1.0, 2.5, 0.5]),
            AgentProfile::new("hawk", vec![4.0, f32::NAN]),
        ];
        let sizing = CellSizing::new(1.5);
        assert_eq!(sizing.cell_size(&profiles, 9.0), 6.0);
        assert_eq!(sizing.cell_size(&[], 9.0), 9.0);
        let cfg = GridConfig::sized_for(Vec3::ZERO, Vec3::splat(60.0), &profiles, &sizing, 9.0);
        assert_eq!(cfg.cell_size, 6.0);
    }

    #[test]
    fn cell_size_has_a_floor() {
        let profiles = vec![AgentProfile::new("gnat", vec![0.001])];
        let sizing = CellSizing::new(1.0);
        assert_eq!(sizing.cell_size(&profiles, 1.0), CellSizing::DEFAULT_MIN_CELL_SIZE);
        assert!(sizing.validate().is_ok());
        assert!(CellSizing::new(-1.0).validate().is_err());
    }
}
