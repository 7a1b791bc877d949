use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};

use collapse_access::ChunkAccessContext;
use collapse_engine::ColumnTask;
use collapse_geom::{BlockBounds, BlockPos, CHUNK_SIZE, Vec3};
use collapse_shape::{
    LocalColumn, bounds_for_slice, columns_for_slice, expand_for_outline, resolve_facing,
    should_clear,
};
use collapse_world::{BoundaryChecker, PartitionStore, StoreError, VoxelState};

use crate::config::{CollapseConfig, ScanMode, ShapeScope};
use crate::{ColumnWorkResult, ScanFailure};

/// Read-only view a worker scans against.
pub trait ScanWorld: PartitionStore + BoundaryChecker {}

impl<T: PartitionStore + BoundaryChecker + ?Sized> ScanWorld for T {}

/// Everything a scan needs besides the task and the world.
#[derive(Clone, Copy)]
pub(crate) struct ScanEnv<'a> {
    pub config: &'a CollapseConfig,
    pub access: &'a ChunkAccessContext,
    pub epicenter: Vec3,
    /// Layers per job outside `ChunkVolume` mode.
    pub layer_budget: u32,
    /// Checked between layers. `None` for inline scans, which always run.
    pub cancel: Option<&'a AtomicBool>,
}

/// Runs one job. Never panics and never returns an error: faults become a
/// `MissingPartition` result.
pub(crate) fn run_scan(task: ColumnTask, world: &dyn ScanWorld, env: &ScanEnv<'_>) -> ColumnWorkResult {
    let partition = task.partition();
    let stats = env.access.stats();
    let _scope = stats.scan_scope();
    let _bypass = env.access.bypass(partition);
    let boundary_radius = world.boundary_radius();

    if !world.is_resident(partition) {
        stats.record_missing_partition();
        return ColumnWorkResult::failed(task, ScanFailure::MissingPartition, boundary_radius);
    }
    if !env.config.allow_boundary_bypass && !world.contains(partition) {
        stats.record_boundary_rejection();
        return ColumnWorkResult::failed(task, ScanFailure::OutsideBoundary, boundary_radius);
    }

    match catch_unwind(AssertUnwindSafe(|| scan_layers(task, world, env))) {
        Ok(Ok(mut result)) => {
            result.boundary_radius = boundary_radius;
            result
        }
        Ok(Err(err)) => {
            log::debug!(target: "scheduler", "scan of {} faulted: {}", partition, err);
            stats.record_scan_fault();
            ColumnWorkResult::failed(task, ScanFailure::MissingPartition, boundary_radius)
        }
        Err(_) => {
            log::warn!(target: "scheduler", "scan of {} panicked", partition);
            stats.record_scan_fault();
            ColumnWorkResult::failed(task, ScanFailure::MissingPartition, boundary_radius)
        }
    }
}

fn full_footprint() -> impl Iterator<Item = LocalColumn> {
    (0..CHUNK_SIZE as u8).flat_map(|lz| (0..CHUNK_SIZE as u8).map(move |lx| LocalColumn { lx, lz }))
}

fn scan_layers(
    task: ColumnTask,
    world: &dyn ScanWorld,
    env: &ScanEnv<'_>,
) -> Result<ColumnWorkResult, StoreError> {
    let cfg = env.config;
    let partition = task.partition();
    let partition_bounds = partition.bounds(task.min_depth(), task.max_depth());

    let (columns, shape_bounds): (Vec<LocalColumn>, BlockBounds) = match task.ring_slice() {
        Some(slice) => {
            let facing = resolve_facing(partition.center(), env.epicenter);
            let bounds = match cfg.slice_shape_scope {
                ShapeScope::Partition => partition_bounds,
                ShapeScope::Slice => {
                    let stripe =
                        bounds_for_slice(partition, facing, slice, task.min_depth(), task.max_depth());
                    if cfg.fill_shape.is_shell() {
                        expand_for_outline(stripe, facing, cfg.thickness, &partition_bounds)
                    } else {
                        stripe
                    }
                }
            };
            (columns_for_slice(facing, slice).to_vec(), bounds)
        }
        None => (full_footprint().collect(), partition_bounds),
    };

    let chunk_mode = cfg.scan_mode == ScanMode::ChunkVolume;
    let layer_budget = if chunk_mode {
        task.remaining_layers()
    } else {
        env.layer_budget.max(1)
    };

    let (ox, oz) = (partition.origin_x(), partition.origin_z());
    let mut cleared = Vec::new();
    let mut drained = Vec::new();
    let mut cursor = Some(task);
    let mut next_depth = task.current_depth();
    let mut layers = 0u32;

    while let Some(layer) = cursor {
        if layers >= layer_budget {
            break;
        }
        if env.cancel.is_some_and(|c| c.load(Ordering::Acquire)) {
            break;
        }
        let y = layer.current_depth();
        for col in &columns {
            let pos = BlockPos::new(ox + i32::from(col.lx), y, oz + i32::from(col.lz));
            if !should_clear(pos, &shape_bounds, cfg.fill_shape, cfg.thickness) {
                continue;
            }
            match world.read_voxel(pos)? {
                VoxelState::Solid { .. } => cleared.push(pos),
                VoxelState::Fluid { .. } if cfg.drain_fluids => drained.push(pos),
                VoxelState::Fluid { .. } | VoxelState::Air | VoxelState::Unbreakable { .. } => {}
            }
        }
        layers += 1;
        cursor = layer.advance();
        if let Some(n) = cursor {
            next_depth = n.current_depth();
        }
    }

    Ok(ColumnWorkResult {
        task,
        next_depth,
        column_complete: cursor.is_none(),
        cleared,
        drained,
        chunk_mode_used: chunk_mode,
        failure: None,
        boundary_radius: 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use collapse_geom::ChunkCoord;
    use collapse_shape::FillShape;
    use collapse_world::{TerrainParams, VoxelWorld, WorldBorder};

    /// Resident everywhere; the read path panics.
    struct BrokenStore;

    impl PartitionStore for BrokenStore {
        fn is_resident(&self, _chunk: ChunkCoord) -> bool {
            true
        }

        fn read_voxel(&self, pos: BlockPos) -> Result<VoxelState, StoreError> {
            panic!("corrupt voxel at {pos}");
        }

        fn depth_bounds(&self) -> (i32, i32) {
            (0, 7)
        }
    }

    impl BoundaryChecker for BrokenStore {
        fn contains(&self, _chunk: ChunkCoord) -> bool {
            true
        }

        fn boundary_radius(&self) -> f32 {
            f32::INFINITY
        }
    }

    fn world() -> VoxelWorld {
        let w = VoxelWorld::new(0, 7, 1, TerrainParams::flat(5));
        w.ensure_loaded(ChunkCoord::new(0, 0));
        w
    }

    fn env<'a>(config: &'a CollapseConfig, access: &'a ChunkAccessContext) -> ScanEnv<'a> {
        ScanEnv {
            config,
            access,
            epicenter: Vec3::ZERO,
            layer_budget: config.layers_per_job,
            cancel: None,
        }
    }

    #[test]
    fn column_scan_steps_layers_per_job() {
        let w = world();
        let cfg = CollapseConfig {
            layers_per_job: 3,
            ..CollapseConfig::default()
        };
        let access = ChunkAccessContext::new("test");
        let task = ColumnTask::bottom_up(ChunkCoord::new(0, 0), 0, 7, 0.0);
        let r = run_scan(task, &w, &env(&cfg, &access));
        assert!(r.failure.is_none());
        assert!(!r.column_complete);
        assert_eq!(r.next_depth, 3);
        // bedrock at y=0 is skipped, stone at y=1 and y=2 is cleared
        assert_eq!(r.cleared.len(), 2 * 256);
        assert!(r.cleared.iter().all(|p| p.y == 1 || p.y == 2));
        assert_eq!(access.bypass_count(ChunkCoord::new(0, 0)), 0);
    }

    #[test]
    fn chunk_volume_finishes_in_one_job() {
        let w = world();
        let cfg = CollapseConfig {
            scan_mode: ScanMode::ChunkVolume,
            ..CollapseConfig::default()
        };
        let access = ChunkAccessContext::new("test");
        let task = ColumnTask::top_down(ChunkCoord::new(0, 0), 0, 7, 0.0);
        let r = run_scan(task, &w, &env(&cfg, &access));
        assert!(r.column_complete);
        assert!(r.chunk_mode_used);
        assert_eq!(r.cleared.len(), 5 * 256);
    }

    #[test]
    fn slice_scan_touches_one_stripe() {
        let w = world();
        let cfg = CollapseConfig {
            scan_mode: ScanMode::RingSlice,
            layers_per_job: 8,
            ..CollapseConfig::default()
        };
        let access = ChunkAccessContext::new("test");
        let task = ColumnTask::bottom_up(ChunkCoord::new(0, 0), 0, 7, 0.0).with_ring_slice(2);
        let mut e = env(&cfg, &access);
        e.epicenter = Vec3::new(-100.0, 0.0, 8.0);
        let r = run_scan(task, &w, &e);
        assert!(r.column_complete);
        assert_eq!(r.cleared.len(), 5 * 16);
        assert!(r.cleared.iter().all(|p| p.x == 2));
    }

    #[test]
    fn walls_keep_interior() {
        let w = world();
        let cfg = CollapseConfig {
            scan_mode: ScanMode::ChunkVolume,
            fill_shape: FillShape::Walls,
            ..CollapseConfig::default()
        };
        let access = ChunkAccessContext::new("test");
        let task = ColumnTask::bottom_up(ChunkCoord::new(0, 0), 0, 7, 0.0);
        let r = run_scan(task, &w, &env(&cfg, &access));
        assert!(r.cleared.iter().all(|p| p.x == 0 || p.x == 15 || p.z == 0 || p.z == 15));
        assert_eq!(r.cleared.len(), 5 * 60);
    }

    #[test]
    fn missing_and_rejected_carry_no_positions() {
        let w = world();
        let cfg = CollapseConfig::default();
        let access = ChunkAccessContext::new("test");
        let missing = ColumnTask::bottom_up(ChunkCoord::new(1, 1), 0, 7, 0.0);
        let r = run_scan(missing, &w, &env(&cfg, &access));
        assert_eq!(r.failure, Some(ScanFailure::MissingPartition));
        assert!(r.cleared.is_empty() && r.drained.is_empty());

        w.set_border(WorldBorder {
            center: Vec3::new(100.0, 0.0, 100.0),
            radius: 8.0,
        });
        let task = ColumnTask::bottom_up(ChunkCoord::new(0, 0), 0, 7, 0.0);
        let r = run_scan(task, &w, &env(&cfg, &access));
        assert_eq!(r.failure, Some(ScanFailure::OutsideBoundary));
        assert_eq!(r.boundary_radius, 8.0);
        let snap = access.stats().snapshot();
        assert_eq!(snap.missing_partitions, 1);
        assert_eq!(snap.boundary_rejections, 1);
    }

    #[test]
    fn cancel_flag_stops_before_first_layer() {
        let w = world();
        let cfg = CollapseConfig::default();
        let access = ChunkAccessContext::new("test");
        let flag = AtomicBool::new(true);
        let mut e = env(&cfg, &access);
        e.cancel = Some(&flag);
        let task = ColumnTask::bottom_up(ChunkCoord::new(0, 0), 0, 7, 0.0);
        let r = run_scan(task, &w, &e);
        assert!(!r.column_complete);
        assert_eq!(r.next_depth, 0);
        assert!(r.cleared.is_empty());
    }

    #[test]
    fn panicking_read_reports_missing_and_releases_bypass() {
        let cfg = CollapseConfig::default();
        let access = ChunkAccessContext::new("test");
        let coord = ChunkCoord::new(2, -1);
        let task = ColumnTask::bottom_up(coord, 0, 7, 0.0);
        let r = run_scan(task, &BrokenStore, &env(&cfg, &access));
        assert_eq!(r.failure, Some(ScanFailure::MissingPartition));
        assert_eq!(r.task, task);
        assert!(r.cleared.is_empty() && r.drained.is_empty());
        assert_eq!(access.bypass_count(coord), 0);
        assert_eq!(access.stats().active_scans(), 0);
        assert_eq!(access.stats().snapshot().scan_faults, 1);
    }

    #[test]
    fn slice_scope_keeps_solid_shapes_on_the_stripe() {
        let w = world();
        let access = ChunkAccessContext::new("test");
        let coord = ChunkCoord::new(0, 0);
        let epicenter = Vec3::new(-100.0, 0.0, 8.0);
        let facing = resolve_facing(coord.center(), epicenter);
        for shape in FillShape::ALL.into_iter().filter(|s| !s.is_shell()) {
            let cfg = CollapseConfig {
                scan_mode: ScanMode::RingSlice,
                slice_shape_scope: ShapeScope::Slice,
                fill_shape: shape,
                thickness: 16,
                layers_per_job: 8,
                ..CollapseConfig::default()
            };
            let task = ColumnTask::bottom_up(coord, 0, 7, 0.0).with_ring_slice(0);
            let mut e = env(&cfg, &access);
            e.epicenter = epicenter;
            let r = run_scan(task, &w, &e);

            let stripe = bounds_for_slice(coord, facing, 0, 0, 7);
            let mut expected: Vec<BlockPos> = stripe
                .positions()
                .filter(|&p| should_clear(p, &stripe, shape, 16))
                .filter(|&p| matches!(w.read_voxel(p), Ok(VoxelState::Solid { .. })))
                .collect();
            let mut got = r.cleared.clone();
            expected.sort();
            got.sort();
            assert_eq!(got, expected, "{shape}");
        }
    }
}
