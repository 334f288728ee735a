//! Deterministic shape sets and agent swarms.
//!
//! Every generator takes a seed and uses [`ChaCha8Rng`], so a failing
//! test reproduces exactly.

use glam::{EulerRot, Quat, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use roost_bvh::world::ShapeItem;
use roost_bvh::{Shape, ShapeId};
use roost_grid::{AgentBuffer, AgentBuffers, AgentLayout, GridConfig};

/// Words per swarm record: position followed by the agent id.
pub const SWARM_STRIDE: usize = 4;

/// Seeded generator used by every fixture.
pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

fn random_point(rng: &mut ChaCha8Rng, half: Vec3) -> Vec3 {
    Vec3::new(
        rng.random_range(-half.x..=half.x),
        rng.random_range(-half.y..=half.y),
        rng.random_range(-half.z..=half.z),
    )
}

/// `count` spheres with centers in `[-extent, extent]^3` and radii in `[0.1, 1.0]`.
pub fn random_spheres(seed: u64, count: usize, extent: f32) -> Vec<Shape> {
    let mut rng = rng(seed);
    (0..count)
        .map(|_| {
            let center = random_point(&mut rng, Vec3::splat(extent));
            Shape::sphere(center, rng.random_range(0.1..=1.0))
        })
        .collect()
}

/// `count` shapes of every kind, randomly posed.
pub fn random_shapes(seed: u64, count: usize, extent: f32) -> Vec<Shape> {
    let mut rng = rng(seed);
    (0..count)
        .map(|i| {
            let center = random_point(&mut rng, Vec3::splat(extent));
            let a = rng.random_range(0.1f32..=1.0);
            let b = rng.random_range(0.1f32..=1.0);
            let shape = match i % 4 {
                0 => Shape::sphere(center, a),
                1 => Shape::cuboid(center, Vec3::new(a, b, (a + b) * 0.5)),
                2 => Shape::capsule(center, a * 0.5, b * 2.0),
                _ => Shape::torus(center, a + 0.5, b * 0.3, b),
            };
            let rotation = Quat::from_euler(
                EulerRot::XYZ,
                rng.random_range(-3.1f32..=3.1),
                rng.random_range(-3.1f32..=3.1),
                rng.random_range(-3.1f32..=3.1),
            );
            shape.with_rotation(rotation)
        })
        .collect()
}

/// Four unit spheres far apart on the X and Z axes.
pub fn disjoint_spheres() -> [Shape; 4] {
    [
        Shape::sphere(Vec3::new(-10.0, 0.0, 0.0), 1.0),
        Shape::sphere(Vec3::new(10.0, 0.0, 0.0), 1.0),
        Shape::sphere(Vec3::new(0.0, 0.0, -10.0), 1.0),
        Shape::sphere(Vec3::new(0.0, 0.0, 10.0), 1.0),
    ]
}

/// Tree build items for `shapes`, all enabled, ids in slice order.
pub fn shape_items(shapes: &[Shape]) -> Vec<ShapeItem> {
    shapes
        .iter()
        .enumerate()
        .map(|(i, shape)| ShapeItem {
            id: ShapeId(i as u32),
            bounds: shape.bounds(),
            data: shape.data(),
            enabled: true,
        })
        .collect()
}

/// Layout of swarm records: position at word 0, id at word 3.
pub fn swarm_layout() -> AgentLayout {
    AgentLayout::new(SWARM_STRIDE, 0).expect("swarm layout holds a position")
}

/// Id stored in a swarm record.
pub fn agent_id(record: &[f32]) -> u32 {
    record[3] as u32
}

/// `count` agents scattered over the region of `config`.
///
/// With `spill > 0` the scatter box is enlarged by that fraction, so
/// some agents fall outside the grid and get clamped.
pub fn random_swarm(seed: u64, count: usize, config: &GridConfig, spill: f32) -> AgentBuffers {
    let mut rng = rng(seed);
    let half = config.size * 0.5 * (1.0 + spill);
    let layout = swarm_layout();
    let mut buffer = AgentBuffer::new(layout, count).expect("swarm fits");
    for i in 0..count {
        let position = config.center + random_point(&mut rng, half);
        let record = buffer.record_mut(i);
        layout.set_position(record, position);
        record[3] = i as f32;
    }
    AgentBuffers::from_buffer(buffer)
}
