use collapse_geom::{BlockBounds, BlockPos, CHUNK_SIZE, ChunkCoord};
use proptest::prelude::*;

fn small_i32() -> impl Strategy<Value = i32> {
    -1_000_000i32..=1_000_000
}

fn arb_pos() -> impl Strategy<Value = BlockPos> {
    (-64i32..=64, -64i32..=64, -64i32..=64).prop_map(|(x, y, z)| BlockPos::new(x, y, z))
}

proptest! {
    // Corner order never matters and both corners are contained
    #[test]
    fn new_normalizes_corners(a in arb_pos(), b in arb_pos()) {
        let ab = BlockBounds::new(a, b);
        let ba = BlockBounds::new(b, a);
        prop_assert_eq!(ab, ba);
        prop_assert!(ab.contains(a));
        prop_assert!(ab.contains(b));
        prop_assert!(ab.size_x() >= 1 && ab.size_y() >= 1 && ab.size_z() >= 1);
    }

    // Every block maps into the chunk whose bounds contain it
    #[test]
    fn block_chunk_roundtrip(x in small_i32(), z in small_i32()) {
        let c = ChunkCoord::from_block(x, z);
        let b = c.bounds(0, 0);
        prop_assert!(b.contains(BlockPos::new(x, 0, z)));
        prop_assert_eq!(b.size_x(), CHUNK_SIZE);
    }

    // Intersection stays inside both inputs
    #[test]
    fn intersection_is_contained(a in arb_pos(), b in arb_pos(), c in arb_pos(), d in arb_pos()) {
        let lhs = BlockBounds::new(a, b);
        let rhs = BlockBounds::new(c, d);
        if let Some(i) = lhs.intersect(&rhs) {
            prop_assert!(lhs.contains(i.min) && lhs.contains(i.max));
            prop_assert!(rhs.contains(i.min) && rhs.contains(i.max));
        }
    }
}
