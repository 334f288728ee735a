//! Benchmark profiles for the Roost flocking infrastructure.
//!
//! Provides pre-built scenes for benchmarks and profiling:
//!
//! - [`flock_profile`]: 50K agents in a 200x100x200 region
//! - [`stress_flock_profile`]: 500K agents in the same region
//! - [`obstacle_field`]: a collision world of mixed shapes
//! - [`scatter_point`]: deterministic point placement via seed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::error::Error;

use glam::{Quat, Vec3};
use roost_bvh::{CollisionConfig, CollisionWorld, Shape, ShapeRegistry};
use roost_grid::{AgentBuffer, AgentBuffers, AgentLayout, GridConfig, GridError};

/// Region covered by the flock profiles.
pub const FLOCK_REGION: Vec3 = Vec3::new(200.0, 100.0, 200.0);

/// Words per agent record: position, velocity, heading id, padding.
pub const AGENT_STRIDE: usize = 8;

/// Deterministic point in `[-half, half]` for index `i` of `seed`.
pub fn scatter_point(seed: u64, i: u64, half: Vec3) -> Vec3 {
    let mix = |k: u64| {
        let h = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(i.wrapping_mul(1442695040888963407))
            .wrapping_add(k.wrapping_mul(2862933555777941757));
        ((h >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
    };
    Vec3::new(mix(1), mix(2), mix(3)) * half
}

fn flock(seed: u64, count: usize) -> Result<(GridConfig, AgentBuffers), GridError> {
    let config = GridConfig::new(Vec3::ZERO, FLOCK_REGION, 4.0);
    let layout = AgentLayout::new(AGENT_STRIDE, 0)?;
    let mut buffer = AgentBuffer::new(layout, count)?;
    for i in 0..count {
        let p = scatter_point(seed, i as u64, FLOCK_REGION * 0.5);
        let record = buffer.record_mut(i);
        layout.set_position(record, p);
        record[3..6].copy_from_slice(&scatter_point(seed ^ 0xfeed, i as u64, Vec3::ONE).to_array());
        record[6] = i as f32;
    }
    Ok((config, AgentBuffers::from_buffer(buffer)))
}

/// 50K agents with 4-unit interaction radius.
pub fn flock_profile(seed: u64) -> Result<(GridConfig, AgentBuffers), GridError> {
    flock(seed, 50_000)
}

/// 500K agents in the same region, ten times denser.
pub fn stress_flock_profile(seed: u64) -> Result<(GridConfig, AgentBuffers), GridError> {
    flock(seed, 500_000)
}

/// A world of `count` mixed obstacles spread over [`FLOCK_REGION`].
///
/// The tree is not built yet; call [`CollisionWorld::update`].
pub fn obstacle_field(seed: u64, count: usize) -> Result<CollisionWorld, Box<dyn Error>> {
    let mut registry = ShapeRegistry::new();
    for i in 0..count {
        let center = scatter_point(seed, i as u64, FLOCK_REGION * 0.5);
        let size = 0.5 + (i % 7) as f32 * 0.25;
        let shape = match i % 4 {
            0 => Shape::sphere(center, size),
            1 => Shape::cuboid(center, Vec3::new(size, size * 2.0, size * 0.5)),
            2 => Shape::capsule(center, size * 0.5, size * 3.0),
            _ => Shape::torus(center, size * 2.0, size * 0.25, size * 0.5),
        };
        let rotation = Quat::from_rotation_y(i as f32 * 0.37) * Quat::from_rotation_x(i as f32 * 0.11);
        registry.add(shape.with_rotation(rotation))?;
    }
    Ok(CollisionWorld::new(CollisionConfig::new(), registry)?)
}
