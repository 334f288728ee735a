//! The spatial hash grid and its per-frame rebuild.

use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use glam::{IVec3, UVec3, Vec3};
use roost_core::capacity::{check_u32_index, grow_len};
use smallvec::SmallVec;
use tracing::{debug, error, instrument, warn};

use crate::agents::AgentBuffers;
use crate::config::GridConfig;
use crate::error::GridError;
use crate::kernels::{CpuKernels, GridKernels, GridPhase, HashJob};
use crate::layout::GridLayout;

/// Externally maintained count of live agents, for alive-count mode.
pub type AliveCounter = Arc<AtomicU32>;

/// Report of one completed rebuild.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GridFrame {
    /// Rebuild sequence number, starting at 1.
    pub frame: u64,
    /// Agents hashed this frame.
    pub hashed: usize,
    /// Agents clamped into a border cell.
    pub clamped: usize,
    /// Cells in the lattice.
    pub cell_count: usize,
    /// Dispatch groups in the prefix-sum phases.
    pub group_count: usize,
    /// Hillis-Steele rounds over the group totals.
    pub carry_rounds: u32,
    /// Kernel dispatches issued.
    pub dispatches: u32,
}

/// A uniform grid over a fixed-capacity agent buffer, rebuilt every frame.
///
/// After a successful [`rebuild`](Self::rebuild) the agents of cell `c`
/// occupy records `offsets()[c]..offsets()[c + 1]` of the write buffer
/// of the [`AgentBuffers`] passed in. The offset table stays valid until
/// the next rebuild. If the kernel set cannot run a phase, the grid
/// disables itself and keeps serving the last good table until
/// [`enable`](Self::enable) is called.
pub struct SpatialHashGrid {
    config: GridConfig,
    layout: GridLayout,
    kernels: Box<dyn GridKernels>,
    counts: Vec<AtomicU32>,
    offsets: Vec<u32>,
    group_sums: Vec<u32>,
    group_sums_back: Vec<u32>,
    sources: Vec<AtomicU32>,
    alive: Option<AliveCounter>,
    enabled: bool,
    frame: u64,
    last: Option<GridFrame>,
}

impl SpatialHashGrid {
    /// A grid using the [`CpuKernels`].
    pub fn new(config: GridConfig) -> Result<Self, GridError> {
        Self::with_kernels(config, Box::new(CpuKernels))
    }

    /// A grid using a custom kernel set.
    pub fn with_kernels(
        config: GridConfig,
        kernels: Box<dyn GridKernels>,
    ) -> Result<Self, GridError> {
        let layout = GridLayout::from_config(&config)?;
        let mut grid = Self {
            config,
            layout,
            kernels,
            counts: Vec::new(),
            offsets: Vec::new(),
            group_sums: Vec::new(),
            group_sums_back: Vec::new(),
            sources: Vec::new(),
            alive: None,
            enabled: true,
            frame: 0,
            last: None,
        };
        grid.size_cell_buffers()?;
        Ok(grid)
    }

    fn group_count(&self) -> usize {
        self.layout
            .cell_count()
            .div_ceil(self.config.group_size as usize)
    }

    fn size_cell_buffers(&mut self) -> Result<(), GridError> {
        let cells = self.layout.cell_count();
        let groups = self.group_count();
        grow_len(&mut self.counts, cells, || AtomicU32::new(0))?;
        grow_len(&mut self.offsets, cells + 1, || 0)?;
        grow_len(&mut self.group_sums, groups, || 0)?;
        grow_len(&mut self.group_sums_back, groups, || 0)?;
        self.offsets[..=cells].fill(0);
        Ok(())
    }

    /// Replace the configuration. The offset table is reset to empty.
    pub fn reconfigure(&mut self, config: GridConfig) -> Result<(), GridError> {
        let layout = GridLayout::from_config(&config)?;
        self.config = config;
        self.layout = layout;
        self.last = None;
        self.size_cell_buffers()
    }

    /// Replace the kernel set. A disabled grid stays disabled until
    /// [`enable`](Self::enable) is called.
    pub fn set_kernels(&mut self, kernels: Box<dyn GridKernels>) {
        self.kernels = kernels;
    }

    /// Attach the live-agent counter read in alive-count mode.
    pub fn attach_alive_counter(&mut self, counter: AliveCounter) {
        self.alive = Some(counter);
    }

    /// Move the covered region to follow `target`, snapped to the lattice.
    pub fn follow(&mut self, target: Vec3) {
        self.layout.follow(target);
    }

    /// Resume rebuilding after the grid disabled itself.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Stop rebuilding; the last table stays readable.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Whether rebuilds run.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn live_count(&self, capacity: usize) -> Result<usize, GridError> {
        if !self.config.alive_count {
            return Ok(capacity);
        }
        let counter = self.alive.as_ref().ok_or(GridError::AliveCounterMissing)?;
        Ok((counter.load(Ordering::Acquire) as usize).min(capacity))
    }

    /// Rebuild the grid from the read buffer of `agents`.
    ///
    /// Runs the five phases in order, writing the reordered records into
    /// the write buffer. Records past the live count are not touched. The
    /// caller swaps the buffers once the rest of the frame is done.
    #[instrument(skip_all, fields(frame = self.frame + 1))]
    pub fn rebuild(&mut self, agents: &mut AgentBuffers) -> Result<GridFrame, GridError> {
        if !self.enabled {
            return Err(GridError::Disabled);
        }
        if let Some(phase) = GridPhase::ALL
            .into_iter()
            .find(|p| !self.kernels.resolves(*p))
        {
            error!(
                %phase,
                kernels = self.kernels.name(),
                "grid kernel unresolved, disabling spatial hash"
            );
            self.enabled = false;
            return Err(GridError::KernelMissing {
                phase,
                kernels: self.kernels.name().to_string(),
            });
        }

        let live = self.live_count(agents.len())?;
        check_u32_index(live)?;
        self.size_cell_buffers()?;
        grow_len(&mut self.sources, live, || AtomicU32::new(0))?;

        let cells = self.layout.cell_count();
        let groups = self.group_count();
        let group_size = self.config.group_size as usize;

        let (read, mut write) = agents.split();
        let job = HashJob {
            layout: &self.layout,
            agents: read,
            live,
        };
        let kernels = self.kernels.as_ref();
        let counts = &self.counts[..cells];
        let offsets = &mut self.offsets[..cells];

        kernels.clear_offsets(counts);
        let clamped = kernels.hash_count(&job, counts);
        kernels.prefix_sum(counts, offsets, &mut self.group_sums[..groups], group_size);

        let mut rounds = 0u32;
        let mut in_back = false;
        let mut sum_offset = 1;
        while sum_offset < groups {
            if in_back {
                kernels.carry_round(
                    &self.group_sums_back[..groups],
                    &mut self.group_sums[..groups],
                    sum_offset,
                );
            } else {
                kernels.carry_round(
                    &self.group_sums[..groups],
                    &mut self.group_sums_back[..groups],
                    sum_offset,
                );
            }
            in_back = !in_back;
            rounds += 1;
            sum_offset *= 2;
        }
        let scanned = if in_back {
            &self.group_sums_back[..groups]
        } else {
            &self.group_sums[..groups]
        };
        kernels.add_carry(offsets, counts, scanned, group_size);
        self.offsets[cells] = live as u32;

        let stride = write.layout().stride();
        kernels.reorder(
            &job,
            counts,
            &self.sources[..live],
            &mut write.records_mut()[..live * stride],
        );

        self.frame += 1;
        let report = GridFrame {
            frame: self.frame,
            hashed: live,
            clamped,
            cell_count: cells,
            group_count: groups,
            carry_rounds: rounds,
            dispatches: 5 + rounds,
        };
        if clamped > 0 {
            warn!(clamped, "agents outside the grid were clamped into border cells");
        }
        debug!(
            hashed = live,
            cells,
            groups,
            rounds,
            "spatial hash rebuilt"
        );
        self.last = Some(report);
        Ok(report)
    }

    /// Offset table of the last rebuild: one entry per cell plus a
    /// trailing entry holding the hashed agent count.
    pub fn offsets(&self) -> &[u32] {
        &self.offsets[..=self.layout.cell_count()]
    }

    /// The offset table as raw bytes.
    pub fn offset_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.offsets())
    }

    /// Agents hashed by the last rebuild.
    pub fn hashed_count(&self) -> usize {
        self.offsets[self.layout.cell_count()] as usize
    }

    /// Reordered-buffer range of cell `cell`.
    pub fn cell_range(&self, cell: usize) -> Option<Range<usize>> {
        if cell >= self.layout.cell_count() {
            return None;
        }
        Some(self.offsets[cell] as usize..self.offsets[cell + 1] as usize)
    }

    /// Number of agents in cell `cell`.
    pub fn cell_population(&self, cell: usize) -> Option<usize> {
        self.cell_range(cell).map(|r| r.len())
    }

    /// Non-empty ranges of the up to 27 cells around `point`.
    ///
    /// The center cell is `point`'s cell clamped into the lattice, so
    /// clamped agents are found from outside the grid too. Every agent
    /// within `cell_size` of `point` lies in one of the ranges.
    pub fn neighbour_ranges(&self, point: Vec3) -> SmallVec<[Range<usize>; 27]> {
        let center = self.layout.clamp_coords(self.layout.cell_coords(point)).as_ivec3();
        let mut ranges = SmallVec::new();
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let Some(cell) = self.layout.checked_index(center + IVec3::new(dx, dy, dz))
                    else {
                        continue;
                    };
                    if let Some(range) = self.cell_range(cell).filter(|r| !r.is_empty()) {
                        ranges.push(range);
                    }
                }
            }
        }
        ranges
    }

    /// Reordered-buffer indices of the agents around `point`.
    pub fn neighbours(&self, point: Vec3) -> impl Iterator<Item = usize> {
        self.neighbour_ranges(point).into_iter().flatten()
    }

    /// The current cell lattice.
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Cells per axis.
    pub fn dims(&self) -> UVec3 {
        self.layout.dims()
    }

    /// Edge length of a cell.
    pub fn cell_size(&self) -> f32 {
        self.layout.cell_size()
    }

    /// The grid's configuration.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Name of the kernel set in use.
    pub fn kernel_name(&self) -> &str {
        self.kernels.name()
    }

    /// Report of the last successful rebuild.
    pub fn last_frame(&self) -> Option<GridFrame> {
        self.last
    }
}

impl std::fmt::Debug for SpatialHashGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialHashGrid")
            .field("config", &self.config)
            .field("kernels", &self.kernels.name())
            .field("enabled", &self.enabled)
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentBuffer, AgentLayout};

    fn config() -> GridConfig {
        GridConfig {
            group_size: 4,
            ..GridConfig::new(Vec3::ZERO, Vec3::splat(8.0), 2.0)
        }
    }

    fn buffers(positions: &[Vec3]) -> AgentBuffers {
        AgentBuffers::from_buffer(AgentBuffer::from_positions(positions).unwrap())
    }

    #[test]
    fn fresh_grid_has_empty_table() {
        let grid = SpatialHashGrid::new(config()).unwrap();
        assert_eq!(grid.dims(), UVec3::splat(4));
        assert_eq!(grid.offsets().len(), 65);
        assert!(grid.offsets().iter().all(|&o| o == 0));
        assert_eq!(grid.hashed_count(), 0);
        assert!(grid.last_frame().is_none());
    }

    #[test]
    fn rebuild_buckets_agents() {
        let mut grid = SpatialHashGrid::new(config()).unwrap();
        let positions = [
            Vec3::new(3.0, 3.0, 3.0),
            Vec3::new(-3.0, -3.0, -3.0),
            Vec3::new(3.5, 3.5, 3.5),
            Vec3::new(-3.5, -3.5, -3.5),
            Vec3::new(0.5, -3.0, 1.0),
        ];
        let mut agents = buffers(&positions);
        let frame = grid.rebuild(&mut agents).unwrap();
        assert_eq!(frame.hashed, 5);
        assert_eq!(frame.clamped, 0);
        assert_eq!(frame.cell_count, 64);
        assert_eq!(frame.group_count, 16);
        assert_eq!(frame.carry_rounds, 4);
        assert_eq!(frame.dispatches, 9);

        assert_eq!(grid.cell_range(0), Some(0..2));
        assert_eq!(grid.cell_range(34), Some(2..3));
        assert_eq!(grid.cell_range(63), Some(3..5));
        assert_eq!(grid.cell_population(5), Some(0));
        assert_eq!(grid.hashed_count(), 5);
        let write = agents.write();
        for i in 0..2 {
            assert!(write.position(i).x < -2.9);
        }
        assert_eq!(write.position(2), Vec3::new(0.5, -3.0, 1.0));
        for i in 3..5 {
            assert!(write.position(i).x > 2.9);
        }
    }

    #[test]
    fn neighbours_cover_adjacent_cells() {
        let mut grid = SpatialHashGrid::new(config()).unwrap();
        let mut agents = buffers(&[
            Vec3::new(-3.0, -3.0, -3.0),
            Vec3::new(-1.0, -3.0, -3.0),
            Vec3::new(3.0, 3.0, 3.0),
        ]);
        grid.rebuild(&mut agents).unwrap();
        let near: Vec<_> = grid.neighbours(Vec3::new(-3.0, -3.0, -3.0)).collect();
        assert_eq!(near.len(), 2);
        let far: Vec<_> = grid.neighbours(Vec3::new(3.0, 3.0, 3.0)).collect();
        assert_eq!(far.len(), 1);
        assert_eq!(agents.write().position(far[0]), Vec3::splat(3.0));
    }

    #[test]
    fn clamped_agents_are_counted_and_kept() {
        let mut grid = SpatialHashGrid::new(config()).unwrap();
        let mut agents = buffers(&[Vec3::splat(100.0), Vec3::ZERO, Vec3::splat(-100.0)]);
        let frame = grid.rebuild(&mut agents).unwrap();
        assert_eq!(frame.clamped, 2);
        assert_eq!(grid.cell_range(63), Some(2..3));
        assert_eq!(grid.cell_range(0), Some(0..1));
    }

    #[test]
    fn alive_count_limits_hashing() {
        let cfg = GridConfig {
            alive_count: true,
            ..config()
        };
        let mut grid = SpatialHashGrid::new(cfg).unwrap();
        let mut agents = buffers(&[Vec3::ZERO; 6]);
        assert_eq!(grid.rebuild(&mut agents), Err(GridError::AliveCounterMissing));

        let counter: AliveCounter = Arc::new(AtomicU32::new(4));
        grid.attach_alive_counter(counter.clone());
        assert_eq!(grid.rebuild(&mut agents).unwrap().hashed, 4);
        counter.store(100, Ordering::Release);
        assert_eq!(grid.rebuild(&mut agents).unwrap().hashed, 6);
    }

    #[test]
    fn empty_agent_buffer() {
        let mut grid = SpatialHashGrid::new(config()).unwrap();
        let mut agents = AgentBuffers::new(AgentLayout::POSITION_ONLY, 0).unwrap();
        let frame = grid.rebuild(&mut agents).unwrap();
        assert_eq!(frame.hashed, 0);
        assert!(grid.offsets().iter().all(|&o| o == 0));
    }

    #[test]
    fn reconfigure_resets_table() {
        let mut grid = SpatialHashGrid::new(config()).unwrap();
        let mut agents = buffers(&[Vec3::ZERO]);
        grid.rebuild(&mut agents).unwrap();
        grid.reconfigure(GridConfig::new(Vec3::ZERO, Vec3::splat(8.0), 1.0))
            .unwrap();
        assert_eq!(grid.offsets().len(), 513);
        assert_eq!(grid.hashed_count(), 0);
        assert!(grid.last_frame().is_none());
        assert_eq!(grid.rebuild(&mut agents).unwrap().hashed, 1);
    }

    #[test]
    fn single_group_needs_no_carry_rounds() {
        let cfg = GridConfig::new(Vec3::ZERO, Vec3::splat(4.0), 2.0);
        let mut grid = SpatialHashGrid::new(cfg).unwrap();
        let mut agents = buffers(&[Vec3::ONE, -Vec3::ONE]);
        let frame = grid.rebuild(&mut agents).unwrap();
        assert_eq!(frame.group_count, 1);
        assert_eq!(frame.carry_rounds, 0);
        assert_eq!(frame.dispatches, 5);
    }

    struct NoCarry;

    impl GridKernels for NoCarry {
        fn name(&self) -> &str {
            "no-carry"
        }

        fn resolves(&self, phase: GridPhase) -> bool {
            phase != GridPhase::CarryGroups
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

        fn carry_round(&self, _: &[u32], _: &mut [u32], _: usize) {}

        fn add_carry(&self, _: &mut [u32], _: &[AtomicU32], _: &[u32], _: usize) {}

        fn reorder(&self, _: &HashJob<'_>, _: &[AtomicU32], _: &[AtomicU32], _: &mut [f32]) {}
    }

    #[test]
    fn unresolved_phase_disables_grid() {
        let mut grid = SpatialHashGrid::new(config()).unwrap();
        let mut agents = buffers(&[Vec3::ZERO, Vec3::ONE]);
        grid.rebuild(&mut agents).unwrap();
        let good = grid.offsets().to_vec();

        grid.set_kernels(Box::new(NoCarry));
        assert_eq!(
            grid.rebuild(&mut agents),
            Err(GridError::KernelMissing {
                phase: GridPhase::CarryGroups,
                kernels: "no-carry".into(),
            })
        );
        assert!(!grid.is_enabled());
        assert_eq!(grid.offsets(), &good[..]);
        assert_eq!(grid.rebuild(&mut agents), Err(GridError::Disabled));

        grid.set_kernels(Box::new(CpuKernels));
        assert_eq!(grid.rebuild(&mut agents), Err(GridError::Disabled));
        grid.enable();
        assert_eq!(grid.rebuild(&mut agents).unwrap().frame, 2);
    }
}
