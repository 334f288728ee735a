//! Per-frame construction of the flattened bounding volume hierarchy.
//!
//! The build is top-down. Each node tries `split_tests` candidate planes
//! on each of the three axes and scores a candidate by the sum of its
//! children's `volume * item_count`. The cheapest candidate is taken only
//! if it beats the node's own cost and the node is above the depth limit;
//! otherwise the node becomes a leaf. Items are partitioned in place, so
//! every leaf covers a contiguous run of item references, and the payload
//! buffer is written in that final order.

use bytemuck::Pod;
use roost_core::capacity::{check_u32_index, reserve_pow2};
use roost_core::{BoundedItem, BoundingBox, CapacityError};
use tracing::{debug, instrument};

use crate::config::TreeConfig;
use crate::error::ConfigError;
use crate::node::{BvhNode, ItemRef};

/// Summary of one build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Nodes written to the node buffer.
    pub node_count: usize,
    /// Nodes that ended up as leaves.
    pub leaf_count: usize,
    /// Items that took part in the build.
    pub valid_items: usize,
    /// Items skipped because they were invalid or had unusable bounds.
    pub skipped_items: usize,
    /// Depth of the deepest node. The root is depth 0.
    pub depth: u32,
}

#[derive(Clone, Copy, Debug)]
struct SplitCandidate {
    axis: usize,
    position: f32,
    cost: f32,
}

/// A bounding volume hierarchy rebuilt from scratch on every [`build`](Self::build).
///
/// The node, item-reference and payload buffers are kept between builds
/// and only ever grow, so a steady-state frame does not allocate. All
/// slices returned by the accessors describe the most recent build.
#[derive(Clone, Debug)]
pub struct BoundsTree<P> {
    config: TreeConfig,
    nodes: Vec<BvhNode>,
    items: Vec<ItemRef>,
    payloads: Vec<P>,
    stats: BuildStats,
}

impl<P: Copy> BoundsTree<P> {
    /// An empty tree with the default [`TreeConfig`].
    pub fn new() -> Self {
        Self {
            config: TreeConfig::new(),
            nodes: Vec::new(),
            items: Vec::new(),
            payloads: Vec::new(),
            stats: BuildStats::default(),
        }
    }

    /// An empty tree with a validated custom config.
    pub fn with_config(config: TreeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Rebuild the tree over `items`.
    ///
    /// Invalid items, and items whose bounds are empty or not finite, are
    /// skipped. With no usable items the tree is left with zero nodes.
    /// Fails only if the item count cannot be addressed with `u32`
    /// indices or a buffer cannot grow.
    #[instrument(skip_all, fields(items = items.len()))]
    pub fn build<T>(&mut self, items: &[T]) -> Result<BuildStats, CapacityError>
    where
        T: BoundedItem<Payload = P>,
    {
        check_u32_index(items.len())?;
        self.nodes.clear();
        self.items.clear();
        self.payloads.clear();
        self.stats = BuildStats::default();

        reserve_pow2(&mut self.items, items.len())?;
        let mut root = BoundingBox::EMPTY;
        for (index, item) in items.iter().enumerate() {
            let bounds = item.bounds();
            if !item.is_valid() || bounds.is_empty() || !bounds.is_finite() {
                self.stats.skipped_items += 1;
                continue;
            }
            root.grow_to_include(bounds.min, bounds.max);
            self.items.push(ItemRef {
                min: bounds.min,
                max: bounds.max,
                center: item.center(),
                index: index as u32,
            });
        }

        let count = self.items.len();
        self.stats.valid_items = count;
        if count == 0 {
            debug!(skipped = self.stats.skipped_items, "no valid items, tree left empty");
            return Ok(self.stats);
        }

        reserve_pow2(&mut self.nodes, 2 * count - 1)?;
        self.nodes.push(BvhNode::with_bounds(root));
        self.split(0, 0, count, 0);

        reserve_pow2(&mut self.payloads, count)?;
        self.payloads
            .extend(self.items.iter().map(|r| items[r.index as usize].payload()));

        self.stats.node_count = self.nodes.len();
        debug!(
            nodes = self.stats.node_count,
            leaves = self.stats.leaf_count,
            depth = self.stats.depth,
            skipped = self.stats.skipped_items,
            "tree built"
        );
        Ok(self.stats)
    }

    fn split(&mut self, parent: usize, start: usize, count: usize, depth: u32) {
        self.stats.depth = self.stats.depth.max(depth);
        let bounds = self.nodes[parent].bounds();
        let parent_cost = node_cost(&bounds, count);

        let candidate = if count > 1 && depth < self.config.max_depth {
            self.choose_split(&bounds, start, count)
        } else {
            None
        };

        if let Some(split) = candidate.filter(|c| c.cost < parent_cost) {
            let mut left = BoundingBox::EMPTY;
            let mut right = BoundingBox::EMPTY;
            let mut left_count = 0;
            for i in start..start + count {
                let item = self.items[i];
                if item.center[split.axis] < split.position {
                    left.grow_to_include(item.min, item.max);
                    self.items.swap(start + left_count, i);
                    left_count += 1;
                } else {
                    right.grow_to_include(item.min, item.max);
                }
            }

            if left_count > 0 && left_count < count {
                let left_index = self.nodes.len();
                self.nodes.push(BvhNode::with_bounds(left));
                self.nodes.push(BvhNode::with_bounds(right));
                self.nodes[parent].start_index = left_index as u32;
                self.nodes[parent].item_count = 0;

                self.split(left_index, start, left_count, depth + 1);
                self.split(left_index + 1, start + left_count, count - left_count, depth + 1);
                return;
            }
        }

        self.nodes[parent].start_index = start as u32;
        self.nodes[parent].item_count = count as u32;
        self.stats.leaf_count += 1;
    }

    fn choose_split(&self, bounds: &BoundingBox, start: usize, count: usize) -> Option<SplitCandidate> {
        let tests = self.config.split_tests;
        let mut best: Option<SplitCandidate> = None;
        for axis in 0..3 {
            let lo = bounds.min[axis];
            let hi = bounds.max[axis];
            for i in 0..tests {
                let t = (i + 1) as f32 / (tests + 1) as f32;
                let position = lo + (hi - lo) * t;
                let cost = self.evaluate_split(axis, position, start, count);
                if best.is_none_or(|b| cost < b.cost) {
                    best = Some(SplitCandidate {
                        axis,
                        position,
                        cost,
                    });
                }
            }
        }
        best
    }

    fn evaluate_split(&self, axis: usize, position: f32, start: usize, count: usize) -> f32 {
        let mut left = BoundingBox::EMPTY;
        let mut right = BoundingBox::EMPTY;
        let mut left_count = 0usize;
        let mut right_count = 0usize;
        for item in &self.items[start..start + count] {
            if item.center[axis] < position {
                left.grow_to_include(item.min, item.max);
                left_count += 1;
            } else {
                right.grow_to_include(item.min, item.max);
                right_count += 1;
            }
        }
        node_cost(&left, left_count) + node_cost(&right, right_count)
    }

    /// Nodes of the most recent build; the root is at index 0.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Number of nodes written by the most recent build.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the most recent build produced no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Payloads in leaf order, index-aligned with the leaves' item ranges.
    pub fn payloads(&self) -> &[P] {
        &self.payloads
    }

    /// Item references in leaf order; `item_refs()[i].index` is the
    /// caller's index of the item whose payload sits at `payloads()[i]`.
    pub fn item_refs(&self) -> &[ItemRef] {
        &self.items
    }

    /// Bounds of the root node, if any.
    pub fn root_bounds(&self) -> Option<BoundingBox> {
        self.nodes.first().map(BvhNode::bounds)
    }

    /// Statistics of the most recent build.
    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    /// The tree's configuration.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// The node buffer as raw bytes.
    pub fn node_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }
}

impl<P: Pod> BoundsTree<P> {
    /// The payload buffer as raw bytes.
    pub fn payload_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.payloads)
    }
}

impl<P: Copy> Default for BoundsTree<P> {
    fn default() -> Self {
        Self::new()
    }
}

fn node_cost(bounds: &BoundingBox, count: usize) -> f32 {
    bounds.volume() * count as f32
}
