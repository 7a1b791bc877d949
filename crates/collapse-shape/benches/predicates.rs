use criterion::{Criterion, black_box, criterion_group, criterion_main};

use collapse_geom::{BlockPos, ChunkCoord, Vec3};
use collapse_shape::{
    FillShape, SLICE_COUNT, bounds_for_slice, columns_for_slice, resolve_facing, should_clear,
};

fn bench_partition_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition_scan");
    let bounds = ChunkCoord::new(3, -2).bounds(0, 255);
    for shape in FillShape::ALL {
        group.bench_function(shape.name(), |b| {
            b.iter(|| {
                let mut hits = 0u32;
                for y in bounds.min.y..=bounds.max.y {
                    for z in bounds.min.z..=bounds.max.z {
                        for x in bounds.min.x..=bounds.max.x {
                            if should_clear(BlockPos::new(x, y, z), &bounds, shape, 2) {
                                hits += 1;
                            }
                        }
                    }
                }
                black_box(hits);
            })
        });
    }
    group.finish();
}

fn bench_slice_plan(c: &mut Criterion) {
    let chunk = ChunkCoord::new(7, 9);
    let epi = Vec3::new(0.0, 64.0, 0.0);
    c.bench_function("slice_plan_16", |b| {
        b.iter(|| {
            let facing = resolve_facing(chunk.center(), black_box(epi));
            for s in 0..SLICE_COUNT {
                black_box(columns_for_slice(facing, s));
                black_box(bounds_for_slice(chunk, facing, s, 0, 255));
            }
        })
    });
}

criterion_group!(benches, bench_partition_scan, bench_slice_plan);
criterion_main!(benches);
