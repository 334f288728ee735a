//! Invariant checks for trees, queries and grids.
//!
//! These functions panic with a descriptive message on the first
//! violation. They are shared by the integration tests of the tree and
//! grid crates and by the property tests that drive them with random
//! input.

use glam::Vec3;
use roost_bvh::{BoundsTree, DistanceField, QueryOptions};
use roost_grid::{AgentBuffer, AgentBuffers, GridFrame, SpatialHashGrid};

/// Assert the structural invariants of the last build of `tree`.
///
/// - every internal node's children follow it and their union is its bounds,
/// - every node is reachable from the root exactly once,
/// - every leaf's bounds contain its items' bounds,
/// - the leaves cover every payload exactly once,
/// - no node is deeper than the configured limit,
/// - every split is cheaper than the leaf it replaced, by volume × count.
pub fn assert_tree_invariants<P: Copy>(tree: &BoundsTree<P>) {
    let nodes = tree.nodes();
    let stats = tree.stats();
    assert_eq!(tree.payloads().len(), stats.valid_items, "payload count");
    assert_eq!(tree.item_refs().len(), stats.valid_items, "item ref count");
    if stats.valid_items == 0 {
        assert!(nodes.is_empty(), "tree without items has {} nodes", nodes.len());
        return;
    }
    assert!(
        nodes.len() < 2 * stats.valid_items,
        "{} nodes for {} items",
        nodes.len(),
        stats.valid_items
    );

    let mut seen = vec![false; nodes.len()];
    let mut covered = vec![0u32; stats.valid_items];
    let mut leaves = 0;
    let mut stack = vec![(0usize, 0u32)];
    while let Some((index, depth)) = stack.pop() {
        assert!(!seen[index], "node {index} reached twice");
        seen[index] = true;
        assert!(
            depth <= tree.config().max_depth,
            "node {index} at depth {depth} exceeds {}",
            tree.config().max_depth
        );
        let node = nodes[index];
        let bounds = node.bounds();
        if node.is_leaf() {
            leaves += 1;
            for i in node.item_range() {
                assert!(i < covered.len(), "leaf {index} covers item {i} out of range");
                covered[i] += 1;
                let item = tree.item_refs()[i];
                assert!(
                    bounds.contains_point(item.min) && bounds.contains_point(item.max),
                    "leaf {index} does not contain item {i}"
                );
            }
            continue;
        }
        let left = node.start_index as usize;
        assert!(left > index, "node {index} has child {left} before it");
        assert!(left + 1 < nodes.len(), "node {index} has children past the end");
        for child in [left, left + 1] {
            assert!(
                bounds.contains_box(&nodes[child].bounds()),
                "child {child} escapes parent {index}"
            );
            stack.push((child, depth + 1));
        }
        assert_eq!(
            bounds,
            nodes[left].bounds().union(nodes[left + 1].bounds()),
            "node {index} is not the union of its children"
        );
    }
    assert!(seen.iter().all(|&s| s), "unreachable nodes in the tree");
    assert_eq!(leaves, stats.leaf_count, "leaf count");
    assert!(
        covered.iter().all(|&c| c == 1),
        "payload covered {:?} times",
        covered.iter().find(|&&c| c != 1)
    );

    // Children always follow their parent, so one reverse pass sees both
    // children's item counts before the parent.
    let mut counts = vec![0usize; nodes.len()];
    for index in (0..nodes.len()).rev() {
        let node = nodes[index];
        if node.is_leaf() {
            counts[index] = node.item_count as usize;
            continue;
        }
        let left = node.start_index as usize;
        counts[index] = counts[left] + counts[left + 1];
        let cost = |i: usize| nodes[i].bounds().volume() * counts[i] as f32;
        assert!(
            cost(left) + cost(left + 1) < cost(index),
            "node {index} split at cost {} + {} without beating {}",
            cost(left),
            cost(left + 1),
            cost(index)
        );
    }
    assert_eq!(counts[0], stats.valid_items, "root item count");
}

/// Assert that the tree walk and the brute-force scan agree at `point`.
pub fn assert_nearest_matches_brute_force<P, F>(
    tree: &BoundsTree<P>,
    field: &F,
    point: Vec3,
    options: &QueryOptions,
) where
    P: Copy,
    F: DistanceField<P> + ?Sized,
{
    let walked = tree.nearest(point, field, options);
    let scanned = tree.nearest_brute_force(point, field, options);
    assert!(!walked.truncated, "query at {point} was truncated");
    assert_eq!(walked.hits, scanned.hits, "hit count at {point}");
    if scanned.distance.is_finite() {
        let tolerance = 1e-4 * scanned.distance.abs().max(1.0);
        assert!(
            (walked.distance - scanned.distance).abs() <= tolerance,
            "distance at {point}: walked {} vs scanned {}",
            walked.distance,
            scanned.distance
        );
    } else {
        assert_eq!(walked.distance, scanned.distance, "distance at {point}");
    }
}

/// Assert that `offsets` is a valid start-offset table over `live` entries.
pub fn assert_offsets_well_formed(offsets: &[u32], live: usize) {
    assert!(!offsets.is_empty(), "offset table has no sentinel");
    assert_eq!(offsets[0], 0, "first offset");
    assert_eq!(
        *offsets.last().unwrap_or(&0) as usize,
        live,
        "sentinel does not match the live count"
    );
    for (cell, pair) in offsets.windows(2).enumerate() {
        assert!(
            pair[0] <= pair[1],
            "offsets decrease at cell {cell}: {} > {}",
            pair[0],
            pair[1]
        );
    }
}

fn sorted_records(buffer: &AgentBuffer, live: usize) -> Vec<Vec<u32>> {
    let stride = buffer.layout().stride();
    let mut records: Vec<Vec<u32>> = buffer.records()[..live * stride]
        .chunks(stride)
        .map(|r| r.iter().map(|w| w.to_bits()).collect())
        .collect();
    records.sort_unstable();
    records
}

/// Assert the result of the last rebuild of `grid`.
///
/// `read` is the buffer the rebuild hashed and `write` the one it
/// reordered into, i.e. the buffers before the caller swaps them.
///
/// - the offset table is well formed over the hashed agents,
/// - every agent in a cell's range hashes to that cell,
/// - each cell's population matches a direct count,
/// - the reordered records are a permutation of the hashed ones.
pub fn assert_grid_invariants(grid: &SpatialHashGrid, read: &AgentBuffer, write: &AgentBuffer) {
    let live = grid.hashed_count();
    let layout = grid.layout();
    assert_offsets_well_formed(grid.offsets(), live);

    let mut expected = vec![0usize; layout.cell_count()];
    for i in 0..live {
        let (cell, _) = layout.cell_of(read.position(i));
        expected[cell as usize] += 1;
    }
    for (cell, &count) in expected.iter().enumerate() {
        let range = grid.cell_range(cell).unwrap_or(0..0);
        assert_eq!(range.len(), count, "population of cell {cell}");
        for i in range {
            let (hashed, _) = layout.cell_of(write.position(i));
            assert_eq!(hashed as usize, cell, "agent {i} sits in cell {cell} but hashes to {hashed}");
        }
    }

    assert!(
        sorted_records(read, live) == sorted_records(write, live),
        "reordered records are not a permutation of the hashed records"
    );
}

/// Rebuild `grid` from `agents`, check every invariant, then swap.
pub fn run_full_grid_compliance(grid: &mut SpatialHashGrid, agents: &mut AgentBuffers) -> GridFrame {
    let frame = match grid.rebuild(agents) {
        Ok(frame) => frame,
        Err(e) => panic!("rebuild failed: {e}"),
    };
    assert_eq!(frame.hashed, grid.hashed_count(), "frame report hashed count");
    assert_grid_invariants(grid, agents.read(), agents.write());
    agents.swap();
    frame
}
