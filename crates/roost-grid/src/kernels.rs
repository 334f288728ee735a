//! The five grid phases and their CPU implementation.
//!
//! A [`GridKernels`] implementation supplies one entry point per phase.
//! The grid owns every buffer and calls the entry points in order; each
//! call must be complete when it returns, so a later phase always sees
//! the full effect of an earlier one.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;

use crate::agents::AgentBuffer;
use crate::layout::GridLayout;

/// One dispatch of the grid pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GridPhase {
    /// Zero the per-cell counts.
    ClearOffsets,
    /// Hash every live agent and count it into its cell.
    HashCount,
    /// Exclusive scan of the counts within each group, plus group totals.
    PrefixSum,
    /// Scan the group totals and add each group's carry to its offsets.
    CarryGroups,
    /// Claim a slot per agent and copy its record to the write buffer.
    Reorder,
}

impl GridPhase {
    /// Every phase in dispatch order.
    pub const ALL: [GridPhase; 5] = [
        Self::ClearOffsets,
        Self::HashCount,
        Self::PrefixSum,
        Self::CarryGroups,
        Self::Reorder,
    ];

    /// Stable name of the phase.
    pub fn name(self) -> &'static str {
        match self {
            Self::ClearOffsets => "clear_offsets",
            Self::HashCount => "hash_count",
            Self::PrefixSum => "prefix_sum",
            Self::CarryGroups => "carry_groups",
            Self::Reorder => "reorder",
        }
    }
}

impl fmt::Display for GridPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The agents one rebuild hashes.
#[derive(Clone, Copy, Debug)]
pub struct HashJob<'a> {
    /// Cell lattice of this frame.
    pub layout: &'a GridLayout,
    /// The read buffer.
    pub agents: &'a AgentBuffer,
    /// Number of leading agents to hash.
    pub live: usize,
}

impl HashJob<'_> {
    /// Cell of agent `index` and whether it was clamped.
    pub fn cell_of(&self, index: usize) -> (u32, bool) {
        self.layout.cell_of(self.agents.position(index))
    }
}

/// The per-phase entry points of the grid pipeline.
///
/// Buffers passed in are already sized: `counts` and `offsets` cover
/// every cell, the group-sum buffers cover every group, `sources` and
/// the write slice cover exactly the live agents.
pub trait GridKernels: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Whether this kernel set can run `phase`. Checked for every phase
    /// before a rebuild starts.
    fn resolves(&self, phase: GridPhase) -> bool {
        let _ = phase;
        true
    }

    /// Phase 1: store zero into every count.
    fn clear_offsets(&self, counts: &[AtomicU32]);

    /// Phase 2: for each live agent, increment the count of its cell.
    ///
    /// Returns the number of agents clamped into a border cell.
    fn hash_count(&self, job: &HashJob<'_>, counts: &[AtomicU32]) -> usize;

    /// Phase 3: split the cells into groups of `group_size`; write each
    /// group's exclusive scan to `offsets` and its total to `group_sums`.
    fn prefix_sum(
        &self,
        counts: &[AtomicU32],
        offsets: &mut [u32],
        group_sums: &mut [u32],
        group_size: usize,
    );

    /// Phase 4a: one Hillis-Steele round,
    /// `write[i] = read[i] + read[i - sum_offset]` (or `read[i]` below `sum_offset`).
    fn carry_round(&self, read: &[u32], write: &mut [u32], sum_offset: usize);

    /// Phase 4b: add `scanned[g - 1]` (the inclusive total of all earlier
    /// groups) to every offset of group `g`, and seed each cell's claim
    /// cursor in `cursors` with its final offset.
    fn add_carry(
        &self,
        offsets: &mut [u32],
        cursors: &[AtomicU32],
        scanned: &[u32],
        group_size: usize,
    );

    /// Phase 5: for each live agent, fetch-and-increment its cell's cursor
    /// to claim a slot, record the agent in `sources[slot]`, then copy
    /// every claimed agent's record into its slot of `write`.
    fn reorder(
        &self,
        job: &HashJob<'_>,
        cursors: &[AtomicU32],
        sources: &[AtomicU32],
        write: &mut [f32],
    );
}

/// Reference kernels running each phase as a rayon parallel iterator.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuKernels;

impl GridKernels for CpuKernels {
    fn name(&self) -> &str {
        "cpu"
    }

    fn clear_offsets(&self, counts: &[AtomicU32]) {
        counts
            .par_iter()
            .for_each(|c| c.store(0, Ordering::Relaxed));
    }

    fn hash_count(&self, job: &HashJob<'_>, counts: &[AtomicU32]) -> usize {
        (0..job.live)
            .into_par_iter()
            .map(|i| {
                let (cell, clamped) = job.cell_of(i);
                if let Some(count) = counts.get(cell as usize) {
                    count.fetch_add(1, Ordering::Relaxed);
                }
                usize::from(clamped)
            })
            .sum()
    }

    fn prefix_sum(
        &self,
        counts: &[AtomicU32],
        offsets: &mut [u32],
        group_sums: &mut [u32],
        group_size: usize,
    ) {
        counts
            .par_chunks(group_size)
            .zip(offsets.par_chunks_mut(group_size))
            .zip(group_sums.par_iter_mut())
            .for_each(|((counts, offsets), total)| {
                let mut running = 0u32;
                for (count, offset) in counts.iter().zip(offsets.iter_mut()) {
                    *offset = running;
                    running += count.load(Ordering::Relaxed);
                }
                *total = running;
            });
    }

    fn carry_round(&self, read: &[u32], write: &mut [u32], sum_offset: usize) {
        write.par_iter_mut().enumerate().for_each(|(i, w)| {
            *w = if i >= sum_offset {
                read[i] + read[i - sum_offset]
            } else {
                read[i]
            };
        });
    }

    fn add_carry(
        &self,
        offsets: &mut [u32],
        cursors: &[AtomicU32],
        scanned: &[u32],
        group_size: usize,
    ) {
        offsets
            .par_chunks_mut(group_size)
            .zip(cursors.par_chunks(group_size))
            .enumerate()
            .for_each(|(group, (offsets, cursors))| {
                let carry = match group {
                    0 => 0,
                    g => scanned.get(g - 1).copied().unwrap_or(0),
                };
                for (offset, cursor) in offsets.iter_mut().zip(cursors) {
                    *offset += carry;
                    cursor.store(*offset, Ordering::Relaxed);
                }
            });
    }

    fn reorder(
        &self,
        job: &HashJob<'_>,
        cursors: &[AtomicU32],
        sources: &[AtomicU32],
        write: &mut [f32],
    ) {
        (0..job.live).into_par_iter().for_each(|i| {
            let (cell, _) = job.cell_of(i);
            let Some(cursor) = cursors.get(cell as usize) else {
                return;
            };
            let slot = cursor.fetch_add(1, Ordering::Relaxed) as usize;
            if let Some(source) = sources.get(slot) {
                source.store(i as u32, Ordering::Relaxed);
            }
        });

        let stride = job.agents.layout().stride();
        let read = job.agents.records();
        write
            .par_chunks_mut(stride)
            .zip(sources.par_iter())
            .for_each(|(dst, source)| {
                let s = source.load(Ordering::Relaxed) as usize * stride;
                if let Some(src) = read.get(s..s + stride) {
                    dst.copy_from_slice(src);
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atomics(values: &[u32]) -> Vec<AtomicU32> {
        values.iter().map(|&v| AtomicU32::new(v)).collect()
    }

    fn loads(values: &[AtomicU32]) -> Vec<u32> {
        values.iter().map(|v| v.load(Ordering::Relaxed)).collect()
    }

    #[test]
    fn phase_names_and_order() {
        let names: Vec<_> = GridPhase::ALL.iter().map(|p| p.to_string()).collect();
        assert_eq!(
            names,
            vec!["clear_offsets", "hash_count", "prefix_sum", "carry_groups", "reorder"]
        );
    }

    #[test]
    fn clear_zeroes_counts() {
        let counts = atomics(&[3, 1, 4]);
        CpuKernels.clear_offsets(&counts);
        assert_eq!(loads(&counts), vec![0, 0, 0]);
    }

    #[test]
    fn prefix_sum_is_local_per_group() {
        let counts = atomics(&[1, 2, 3, 4, 5]);
        let mut offsets = vec![0; 5];
        let mut sums = vec![0; 3];
        CpuKernels.prefix_sum(&counts, &mut offsets, &mut sums, 2);
        assert_eq!(offsets, vec![0, 1, 0, 3, 0]);
        assert_eq!(sums, vec![3, 7, 5]);
    }

    #[test]
    fn carry_rounds_give_inclusive_scan() {
        let mut a = vec![3, 7, 5, 1, 2];
        let mut b = vec![0; 5];
        let mut offset = 1;
        let mut in_b = false;
        while offset < a.len() {
            if in_b {
                CpuKernels.carry_round(&b, &mut a, offset);
            } else {
                CpuKernels.carry_round(&a, &mut b, offset);
            }
            in_b = !in_b;
            offset *= 2;
        }
        let scanned = if in_b { &b } else { &a };
        assert_eq!(scanned, &vec![3, 10, 15, 16, 18]);
    }

    #[test]
    fn add_carry_seeds_cursors() {
        let mut offsets = vec![0, 1, 0, 3, 0];
        let cursors = atomics(&[0; 5]);
        CpuKernels.add_carry(&mut offsets, &cursors, &[3, 10, 15], 2);
        assert_eq!(offsets, vec![0, 1, 3, 6, 10]);
        assert_eq!(loads(&cursors), offsets);
    }

    struct Partial;

    impl GridKernels for Partial {
        fn name(&self) -> &str {
            "partial"
        }

        fn resolves(&self, phase: GridPhase) -> bool {
            phase != GridPhase::Reorder
        }

        fn clear_offsets(&self, counts: &[AtomicU32]) {
            CpuKernels.clear_offsets(counts)
        }

        fn hash_count(&self, job: &HashJob<'_>, counts: &[AtomicU32]) -> usize {
            CpuKernels.hash_count(job, counts)
        }

        fn prefix_sum(&self, c: &[AtomicU32], o: &mut [u32], s: &mut [u32], g: usize) {
            CpuKernels.prefix_sum(c, o, s, g)
        }

        fn carry_round(&self, r: &[u32], w: &mut [u32], o: usize) {
            CpuKernels.carry_round(r, w, o)
        }

        fn add_carry(&self, o: &mut [u32], c: &[AtomicU32], s: &[u32], g: usize) {
            CpuKernels.add_carry(o, c, s, g)
        }

        fn reorder(&self, _: &HashJob<'_>, _: &[AtomicU32], _: &[AtomicU32], _: &mut [f32]) {}
    }

    #[test]
    fn resolves_defaults_to_all_phases() {
        assert!(GridPhase::ALL.iter().all(|p| CpuKernels.resolves(*p)));
        assert!(!Partial.resolves(GridPhase::Reorder));
        assert!(Partial.resolves(GridPhase::HashCount));
    }
}
