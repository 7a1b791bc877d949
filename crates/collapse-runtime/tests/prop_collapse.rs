use collapse_access::ChunkAccessContext;
use collapse_engine::DestructionEngine;
use collapse_geom::{BlockPos, ChunkCoord, Vec3};
use collapse_runtime::{CollapseConfig, CollapseScheduler, ScanMode};
use collapse_shape::{FillShape, should_clear};
use collapse_world::{Block, TerrainParams, VoxelWorld};
use proptest::prelude::*;

fn shape_strategy() -> impl Strategy<Value = FillShape> {
    prop::sample::select(FillShape::ALL.to_vec())
}

fn mode_strategy() -> impl Strategy<Value = ScanMode> {
    prop::sample::select(vec![ScanMode::Column, ScanMode::RingSlice, ScanMode::ChunkVolume])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // Whatever the scan strategy, the voxels left standing are exactly the
    // ones the shape predicate spares (plus bedrock).
    #[test]
    fn collapse_matches_shape_predicate(
        shape in shape_strategy(),
        mode in mode_strategy(),
        thickness in 0i32..5,
        layers in 1u32..6,
        from_bottom in any::<bool>(),
    ) {
        let world = VoxelWorld::new(0, 9, 0, TerrainParams::flat(9));
        world.load_all();
        let coord = ChunkCoord::new(0, 0);
        let mut engine = DestructionEngine::new(0, 9, 4);
        engine.enqueue_ring(0, 0.0, vec![coord]);
        let config = CollapseConfig {
            workers: 1,
            scan_mode: mode,
            fill_shape: shape,
            thickness,
            layers_per_job: layers,
            from_bottom,
            ..CollapseConfig::default()
        };
        engine.activate_ring(0, config.from_bottom, config.slice_mode());
        let sched = CollapseScheduler::new(config, ChunkAccessContext::new("prop"), Vec3::new(-50.0, 0.0, 3.0));
        let mut writer = world.writer();
        let mut guard = 0;
        while sched.step_inline(&mut engine, &world, &mut writer) {
            guard += 1;
            prop_assert!(guard < 10_000);
        }

        let bounds = coord.bounds(0, 9);
        for y in 0..=9 {
            for z in 0..16 {
                for x in 0..16 {
                    let pos = BlockPos::new(x, y, z);
                    let b = world.block_at(pos).unwrap();
                    let expected = if y == 0 {
                        Block::BEDROCK
                    } else if should_clear(pos, &bounds, shape, thickness) {
                        Block::AIR
                    } else {
                        Block::STONE
                    };
                    prop_assert_eq!(b, expected, "at {}", pos);
                }
            }
        }
    }
}
