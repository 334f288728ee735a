//! Cell index built with the bitonic sort instead of the counting sort.

use rayon::prelude::*;
use roost_core::capacity::{check_u32_index, reserve_pow2};
use roost_sort::{sort_and_compute_offsets, SortEntry};

use crate::agents::AgentBuffer;
use crate::error::GridError;
use crate::layout::GridLayout;

/// Agent indices sorted by cell, with a start-offset table.
///
/// The offset table has the same shape and contents as the one
/// [`SpatialHashGrid`](crate::SpatialHashGrid) builds. Instead of moving
/// records, the index keeps the agent order: [`cell_agents`](Self::cell_agents)
/// yields indices into the unsorted buffer. Order within a cell is
/// unspecified.
#[derive(Clone, Debug, Default)]
pub struct SortedCellIndex {
    entries: Vec<SortEntry>,
    offsets: Vec<u32>,
}

impl SortedCellIndex {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash the first `live` agents of `agents` and sort them by cell.
    pub fn build(
        &mut self,
        layout: &GridLayout,
        agents: &AgentBuffer,
        live: usize,
    ) -> Result<(), GridError> {
        let live = live.min(agents.len());
        check_u32_index(live)?;
        reserve_pow2(&mut self.entries, live)?;

        self.entries.clear();
        self.entries.par_extend((0..live).into_par_iter().map(|i| {
            let (cell, _) = layout.cell_of(agents.position(i));
            SortEntry::new(cell, i as u32)
        }));
        self.offsets.clear();
        self.offsets.resize(layout.cell_count() + 1, 0);
        sort_and_compute_offsets(&mut self.entries, &mut self.offsets)?;
        Ok(())
    }

    /// Offset table: one entry per cell plus the trailing agent count.
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Indices of the agents in cell `cell`. Empty for unknown cells.
    pub fn cell_agents(&self, cell: usize) -> impl Iterator<Item = usize> + '_ {
        let range = match (self.offsets.get(cell), self.offsets.get(cell + 1)) {
            (Some(&start), Some(&end)) => start as usize..end as usize,
            _ => 0..0,
        };
        self.entries[range].iter().map(|e| e.value as usize)
    }

    /// Agent indices in cell order.
    pub fn order(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|e| e.value as usize)
    }

    /// Number of agents indexed by the last build.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the last build indexed no agents.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy the indexed records of `agents` into `out` in cell order,
    /// producing the same layout the grid's reorder phase writes.
    ///
    /// `out` must use the layout of `agents` and hold at least
    /// [`len`](Self::len) records.
    pub fn gather(&self, agents: &AgentBuffer, out: &mut AgentBuffer) -> Result<(), GridError> {
        let layout = agents.layout();
        if out.layout() != layout || out.len() < self.entries.len() {
            return Err(GridError::InvalidLayout {
                stride: out.layout().stride(),
                position_offset: out.layout().position_offset(),
            });
        }
        let stride = layout.stride();
        let read = agents.records();
        out.records_mut()[..self.entries.len() * stride]
            .par_chunks_mut(stride)
            .zip(self.entries.par_iter())
            .for_each(|(dst, entry)| {
                let s = entry.value as usize * stride;
                if let Some(src) = read.get(s..s + stride) {
                    dst.copy_from_slice(src);
                }
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use glam::Vec3;

    fn layout() -> GridLayout {
        GridLayout::from_config(&GridConfig::new(Vec3::ZERO, Vec3::splat(4.0), 2.0)).unwrap()
    }

    #[test]
    fn groups_agents_by_cell() {
        let agents = AgentBuffer::from_positions(&[
            Vec3::splat(1.0),
            Vec3::splat(-1.0),
            Vec3::splat(1.5),
            Vec3::new(1.0, -1.0, -1.0),
        ])
        .unwrap();
        let mut index = SortedCellIndex::new();
        index.build(&layout(), &agents, agents.len()).unwrap();

        assert_eq!(index.offsets(), &[0, 1, 2, 2, 2, 2, 2, 2, 4]);
        assert_eq!(index.cell_agents(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(index.cell_agents(1).collect::<Vec<_>>(), vec![3]);
        let mut last: Vec<_> = index.cell_agents(7).collect();
        last.sort_unstable();
        assert_eq!(last, vec![0, 2]);
        assert_eq!(index.cell_agents(99).count(), 0);
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn live_limits_the_build() {
        let agents = AgentBuffer::from_positions(&[Vec3::ZERO; 10]).unwrap();
        let mut index = SortedCellIndex::new();
        index.build(&layout(), &agents, 3).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(*index.offsets().last().unwrap(), 3);
        index.build(&layout(), &agents, 50).unwrap();
        assert_eq!(index.len(), 10);
    }

    #[test]
    fn gather_writes_cell_order() {
        let agents =
            AgentBuffer::from_positions(&[Vec3::splat(1.0), Vec3::splat(-1.0)]).unwrap();
        let mut index = SortedCellIndex::new();
        index.build(&layout(), &agents, 2).unwrap();
        let mut out = AgentBuffer::new(agents.layout(), 2).unwrap();
        index.gather(&agents, &mut out).unwrap();
        assert_eq!(out.position(0), Vec3::splat(-1.0));
        assert_eq!(out.position(1), Vec3::splat(1.0));

        let mut short = AgentBuffer::new(agents.layout(), 1).unwrap();
        assert!(index.gather(&agents, &mut short).is_err());
    }
}
