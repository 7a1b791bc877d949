use collapse_geom::{BlockBounds, BlockPos};
use collapse_shape::{FillShape, should_clear};
use proptest::prelude::*;

fn arb_shape() -> impl Strategy<Value = FillShape> {
    prop::sample::select(FillShape::ALL.to_vec())
}

fn arb_box() -> impl Strategy<Value = BlockBounds> {
    (-50i32..50, -50i32..50, -50i32..50, 1i32..24, 1i32..24, 1i32..24).prop_map(
        |(x, y, z, sx, sy, sz)| {
            BlockBounds::new(
                BlockPos::new(x, y, z),
                BlockPos::new(x + sx - 1, y + sy - 1, z + sz - 1),
            )
        },
    )
}

proptest! {
    // Same inputs, same answer, regardless of what was evaluated before
    #[test]
    fn predicates_are_pure(b in arb_box(), shape in arb_shape(), t in -2i32..8, samples in prop::collection::vec((0i32..24, 0i32..24, 0i32..24), 1..32)) {
        let pts: Vec<BlockPos> = samples
            .iter()
            .map(|(x, y, z)| BlockPos::new(b.min.x + x % b.size_x(), b.min.y + y % b.size_y(), b.min.z + z % b.size_z()))
            .collect();
        let forward: Vec<bool> = pts.iter().map(|p| should_clear(*p, &b, shape, t)).collect();
        let mut backward: Vec<bool> = pts.iter().rev().map(|p| should_clear(*p, &b, shape, t)).collect();
        backward.reverse();
        prop_assert_eq!(forward, backward);
    }

    // Walls never touch the top or bottom layer away from the vertical faces; outline does
    #[test]
    fn walls_exclude_caps(b in arb_box(), t in -2i32..6) {
        let t_eff = t.max(1);
        for y in [b.min.y, b.max.y] {
            for z in b.min.z..=b.max.z {
                for x in b.min.x..=b.max.x {
                    let p = BlockPos::new(x, y, z);
                    let near_vertical = x - b.min.x < t_eff || b.max.x - x < t_eff
                        || z - b.min.z < t_eff || b.max.z - z < t_eff;
                    prop_assert_eq!(should_clear(p, &b, FillShape::Walls, t), near_vertical);
                    prop_assert!(should_clear(p, &b, FillShape::Outline, t));
                }
            }
        }
    }

    // A Y-dominant box makes Vector identical to Column
    #[test]
    fn vector_on_tall_box_is_column(x in -50i32..50, y in -50i32..50, z in -50i32..50, sx in 2i32..12, sz in 2i32..12, extra in 0i32..20, t in -1i32..6) {
        let sy = sx.max(sz) + extra;
        let b = BlockBounds::new(BlockPos::new(x, y, z), BlockPos::new(x + sx - 1, y + sy - 1, z + sz - 1));
        for py in b.min.y..=b.max.y {
            for pz in b.min.z..=b.max.z {
                for px in b.min.x..=b.max.x {
                    let p = BlockPos::new(px, py, pz);
                    prop_assert_eq!(
                        should_clear(p, &b, FillShape::Vector, t),
                        should_clear(p, &b, FillShape::Column, t)
                    );
                }
            }
        }
    }

    // Matrix clears any point inside the box
    #[test]
    fn matrix_clears_all(b in arb_box()) {
        prop_assert!(should_clear(b.min, &b, FillShape::Matrix, 0));
        prop_assert!(should_clear(b.max, &b, FillShape::Matrix, 0));
    }
}
