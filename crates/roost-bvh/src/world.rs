//! A shape registry, its tree and its distance table, rebuilt per frame.

use glam::Vec3;
use roost_core::capacity::reserve_pow2;
use roost_core::{BoundedItem, BoundingBox, CapacityError};
use tracing::{debug, instrument};

use crate::config::{CollisionConfig, QueryOptions};
use crate::distance::DistanceTable;
use crate::error::ConfigError;
use crate::id::ShapeId;
use crate::query::QueryHit;
use crate::registry::ShapeRegistry;
use crate::shape::ShapeData;
use crate::tree::{BoundsTree, BuildStats};

/// One registered shape as seen by the tree builder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeItem {
    /// Registry id of the shape.
    pub id: ShapeId,
    /// Bounds including the world's margin.
    pub bounds: BoundingBox,
    /// Packed payload.
    pub data: ShapeData,
    /// Disabled shapes are skipped by the build.
    pub enabled: bool,
}

impl BoundedItem for ShapeItem {
    type Payload = ShapeData;

    fn bounds_min(&self) -> Vec3 {
        self.bounds.min
    }

    fn bounds_max(&self) -> Vec3 {
        self.bounds.max
    }

    fn payload(&self) -> ShapeData {
        self.data
    }

    fn is_valid(&self) -> bool {
        self.enabled
    }
}

/// Collision shapes plus the acceleration structure over them.
///
/// The world owns its [`ShapeRegistry`]. Call [`update`](Self::update)
/// once per frame, after shapes have moved, to rebuild the tree; queries
/// then run against that frame's tree.
#[derive(Clone, Debug)]
pub struct CollisionWorld {
    config: CollisionConfig,
    registry: ShapeRegistry,
    items: Vec<ShapeItem>,
    tree: BoundsTree<ShapeData>,
    table: DistanceTable,
    frame: u64,
}

impl CollisionWorld {
    /// Create a world over `registry` with the built-in distance table.
    pub fn new(config: CollisionConfig, registry: ShapeRegistry) -> Result<Self, ConfigError> {
        config.validate()?;
        let tree = BoundsTree::with_config(config.tree.clone())?;
        let mut registry = registry;
        registry.take_dirty();
        let mut world = Self {
            config,
            registry,
            items: Vec::new(),
            tree,
            table: DistanceTable::new(),
            frame: 0,
        };
        world.refill();
        Ok(world)
    }

    fn refill(&mut self) {
        let margin = self.config.grow_bounds;
        self.items.clear();
        self.items
            .extend(self.registry.iter().map(|(id, shape, enabled)| ShapeItem {
                id,
                bounds: shape.bounds().expanded(margin),
                data: shape.data(),
                enabled,
            }));
    }

    /// Rebuild the tree for this frame.
    ///
    /// The item array is refilled from the registry only when it changed.
    #[instrument(skip_all, fields(frame = self.frame))]
    pub fn update(&mut self) -> Result<BuildStats, CapacityError> {
        if self.registry.take_dirty() {
            reserve_pow2(&mut self.items, self.registry.len())?;
            self.refill();
            debug!(shapes = self.items.len(), "collision items refilled");
        }
        self.frame += 1;
        self.tree.build(&self.items)
    }

    /// Nearest shape to `point` using this frame's tree.
    pub fn query(&self, point: Vec3, options: &QueryOptions) -> QueryHit {
        self.tree.nearest(point, &self.table, options)
    }

    /// Nearest shape to `point` by measuring every built shape.
    pub fn query_brute_force(&self, point: Vec3, options: &QueryOptions) -> QueryHit {
        self.tree.nearest_brute_force(point, &self.table, options)
    }

    /// The registry. Mutations take effect at the next [`update`](Self::update).
    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    /// Mutable access to the registry.
    pub fn registry_mut(&mut self) -> &mut ShapeRegistry {
        &mut self.registry
    }

    /// The distance table used by queries.
    pub fn distance_table(&self) -> &DistanceTable {
        &self.table
    }

    /// Mutable access to the distance table, to register custom kinds.
    pub fn distance_table_mut(&mut self) -> &mut DistanceTable {
        &mut self.table
    }

    /// The tree of the last update.
    pub fn tree(&self) -> &BoundsTree<ShapeData> {
        &self.tree
    }

    /// The item array the last update built from.
    pub fn items(&self) -> &[ShapeItem] {
        &self.items
    }

    /// Number of completed updates.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// The world's configuration.
    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }
}
