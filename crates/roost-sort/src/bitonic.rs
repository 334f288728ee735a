//! The bitonic sorting network and its pass schedule.

use bytemuck::{Pod, Zeroable};
use rayon::prelude::*;

/// A sortable `(key, value)` pair. Only the key takes part in comparisons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct SortEntry {
    /// Sort key.
    pub key: u32,
    /// Value carried along with the key.
    pub value: u32,
}

impl SortEntry {
    /// Create an entry.
    pub fn new(key: u32, value: u32) -> Self {
        Self { key, value }
    }
}

/// One compare-and-swap pass over the whole buffer.
///
/// The buffer is split into blocks of `2 * group_width` entries. On the
/// first step of a stage (a *flip* pass) entry `h` of each block is
/// compared with its mirror `2 * group_width - 1 - h`; on later steps it is
/// compared with `h + group_width`. The smaller key always ends up at the
/// lower index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitonicPass {
    /// Stage index, `0..stage_count`.
    pub stage: u32,
    /// Step within the stage, `0..=stage`.
    pub step: u32,
    /// Distance between the halves of each block.
    pub group_width: usize,
    /// Span of a compared pair on a flip pass: `2 * group_width - 1`.
    /// Entry `h` of a block is compared with `group_height - h`.
    pub group_height: usize,
}

impl BitonicPass {
    /// Whether this pass compares mirrored pairs.
    pub fn is_flip(&self) -> bool {
        self.step == 0
    }

    /// Entries per block.
    pub fn block_len(&self) -> usize {
        self.group_width * 2
    }
}

/// The pass schedule for sorting a buffer of a given length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitonicPlan {
    len: usize,
    padded_len: usize,
    stage_count: u32,
}

impl BitonicPlan {
    /// Plan a sort of `len` entries.
    pub fn new(len: usize) -> Self {
        let padded_len = len.max(1).next_power_of_two();
        Self {
            len,
            padded_len,
            stage_count: padded_len.trailing_zeros(),
        }
    }

    /// Number of real entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there is nothing to sort.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Length of the network: the next power of two at or above `len`.
    pub fn padded_len(&self) -> usize {
        self.padded_len
    }

    /// `log2(padded_len)`.
    pub fn stage_count(&self) -> u32 {
        self.stage_count
    }

    /// Total number of passes: `stages * (stages + 1) / 2`.
    pub fn pass_count(&self) -> usize {
        let s = self.stage_count as usize;
        s * (s + 1) / 2
    }

    /// Compare-and-swap pairs evaluated by each pass: `padded_len / 2`.
    pub fn pairs_per_pass(&self) -> usize {
        self.padded_len / 2
    }

    /// The passes in dispatch order.
    pub fn passes(&self) -> impl Iterator<Item = BitonicPass> {
        let stages = self.stage_count;
        (0..stages).flat_map(|stage| {
            (0..=stage).map(move |step| {
                let group_width = 1usize << (stage - step);
                BitonicPass {
                    stage,
                    step,
                    group_width,
                    group_height: 2 * group_width - 1,
                }
            })
        })
    }
}

/// Sort `entries` by key, ascending, in place.
///
/// The sort is not stable: entries with equal keys may come out in any
/// order. Empty and single-entry buffers are left untouched.
pub fn sort_pairs(entries: &mut [SortEntry]) {
    let plan = BitonicPlan::new(entries.len());
    for pass in plan.passes() {
        apply_pass(entries, pass);
    }
}

/// Run a single pass of the network over `entries`.
///
/// Pairs whose upper index falls past the end of the buffer are skipped:
/// the absent entry stands for a maximal key, so the comparison would
/// never swap.
pub fn apply_pass(entries: &mut [SortEntry], pass: BitonicPass) {
    let block = pass.block_len();
    let width = pass.group_width;
    let height = pass.group_height;
    let flip = pass.is_flip();
    entries
        .par_chunks_mut(block)
        .with_min_len(64)
        .for_each(|chunk| {
            let len = chunk.len();
            for h in 0..width {
                let hi = if flip { height - h } else { h + width };
                if hi >= len {
                    continue;
                }
                if chunk[h].key > chunk[hi].key {
                    chunk.swap(h, hi);
                }
            }
        });
}
