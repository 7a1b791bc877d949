//! Directional slicing of a partition into sixteen one-voxel stripes.
//!
//! A partition on the east side of the epicenter is peeled west-to-east,
//! one stripe of 16 columns per slice, so the collapse front visibly moves
//! outward. Slice 0 is always the stripe nearest the epicenter.

use collapse_geom::{BlockBounds, BlockPos, CHUNK_SIZE, ChunkCoord, Vec3};
use serde::{Deserialize, Serialize};

pub const SLICE_COUNT: u8 = CHUNK_SIZE as u8;

/// Direction from the epicenter toward the partition. +X is east, +Z south.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    East,
    West,
    North,
    South,
}

impl Facing {
    pub const ALL: [Facing; 4] = [Facing::East, Facing::West, Facing::North, Facing::South];

    /// True when stripes are cut perpendicular to the X axis.
    #[inline]
    pub fn slices_along_x(self) -> bool {
        matches!(self, Facing::East | Facing::West)
    }

    /// Local x (east/west) or z (north/south) of the stripe for `slice`.
    #[inline]
    pub fn stripe_offset(self, slice: u8) -> i32 {
        let s = i32::from(slice & (SLICE_COUNT - 1));
        match self {
            Facing::East | Facing::South => s,
            Facing::West | Facing::North => CHUNK_SIZE - 1 - s,
        }
    }
}

/// Column position inside a partition, both components in `0..16`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalColumn {
    pub lx: u8,
    pub lz: u8,
}

pub fn resolve_facing(partition_center: Vec3, epicenter: Vec3) -> Facing {
    let d = partition_center - epicenter;
    if d.x.abs() >= d.z.abs() {
        if d.x >= 0.0 { Facing::East } else { Facing::West }
    } else if d.z >= 0.0 {
        Facing::South
    } else {
        Facing::North
    }
}

pub fn columns_for_slice(facing: Facing, slice: u8) -> [LocalColumn; CHUNK_SIZE as usize] {
    debug_assert!(slice < SLICE_COUNT);
    let offset = facing.stripe_offset(slice) as u8;
    let mut out = [LocalColumn { lx: 0, lz: 0 }; CHUNK_SIZE as usize];
    for (i, col) in out.iter_mut().enumerate() {
        let along = i as u8;
        *col = if facing.slices_along_x() {
            LocalColumn {
                lx: offset,
                lz: along,
            }
        } else {
            LocalColumn {
                lx: along,
                lz: offset,
            }
        };
    }
    out
}

pub fn bounds_for_slice(
    chunk: ChunkCoord,
    facing: Facing,
    slice: u8,
    min_y: i32,
    max_y: i32,
) -> BlockBounds {
    debug_assert!(slice < SLICE_COUNT);
    let offset = facing.stripe_offset(slice);
    let (x0, z0) = (chunk.origin_x(), chunk.origin_z());
    if facing.slices_along_x() {
        BlockBounds::new(
            BlockPos::new(x0 + offset, min_y, z0),
            BlockPos::new(x0 + offset, max_y, z0 + CHUNK_SIZE - 1),
        )
    } else {
        BlockBounds::new(
            BlockPos::new(x0, min_y, z0 + offset),
            BlockPos::new(x0 + CHUNK_SIZE - 1, max_y, z0 + offset),
        )
    }
}

/// Widens a slice box by `thickness - 1` toward the slices not yet visited,
/// along the slicing axis only, and clamps it to `partition`.
pub fn expand_for_outline(
    bounds: BlockBounds,
    facing: Facing,
    thickness: i32,
    partition: &BlockBounds,
) -> BlockBounds {
    let grow = (thickness - 1).max(0);
    let mut out = bounds;
    match facing {
        Facing::East => out.max.x += grow,
        Facing::West => out.min.x -= grow,
        Facing::South => out.max.z += grow,
        Facing::North => out.min.z -= grow,
    }
    out.intersect(partition).unwrap_or(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_follows_dominant_axis() {
        let epi = Vec3::new(0.0, 64.0, 0.0);
        assert_eq!(resolve_facing(Vec3::new(40.0, 0.0, 8.0), epi), Facing::East);
        assert_eq!(resolve_facing(Vec3::new(-40.0, 0.0, 8.0), epi), Facing::West);
        assert_eq!(resolve_facing(Vec3::new(8.0, 0.0, 40.0), epi), Facing::South);
        assert_eq!(resolve_facing(Vec3::new(8.0, 0.0, -40.0), epi), Facing::North);
    }

    #[test]
    fn ties_prefer_x_axis() {
        let epi = Vec3::ZERO;
        assert_eq!(resolve_facing(Vec3::new(24.0, 0.0, 24.0), epi), Facing::East);
        assert_eq!(resolve_facing(Vec3::new(-24.0, 0.0, -24.0), epi), Facing::West);
        assert_eq!(resolve_facing(epi, epi), Facing::East);
    }

    #[test]
    fn first_slice_is_nearest_epicenter() {
        let chunk = ChunkCoord::new(2, 0);
        let b = bounds_for_slice(chunk, Facing::East, 0, 0, 10);
        assert_eq!(b.min.x, 32);
        assert_eq!(b.max.x, 32);
        let w = bounds_for_slice(ChunkCoord::new(-3, 0), Facing::West, 0, 0, 10);
        assert_eq!(w.min.x, -33);
        let n = bounds_for_slice(ChunkCoord::new(0, -1), Facing::North, 0, 0, 10);
        assert_eq!((n.min.z, n.max.z), (-1, -1));
        assert_eq!((n.min.x, n.max.x), (0, 15));
    }

    #[test]
    fn slice_bounds_match_columns() {
        let chunk = ChunkCoord::new(-1, 4);
        for facing in Facing::ALL {
            for s in 0..SLICE_COUNT {
                let b = bounds_for_slice(chunk, facing, s, 0, 0);
                for col in columns_for_slice(facing, s) {
                    let p = BlockPos::new(
                        chunk.origin_x() + i32::from(col.lx),
                        0,
                        chunk.origin_z() + i32::from(col.lz),
                    );
                    assert!(b.contains(p), "{facing:?} slice {s} misses {p:?}");
                }
                assert_eq!(b.volume(), 16);
            }
        }
    }

    #[test]
    fn outline_expansion_grows_inward_and_clamps() {
        let chunk = ChunkCoord::new(0, 0);
        let part = chunk.bounds(0, 31);
        let b = bounds_for_slice(chunk, Facing::East, 3, 0, 31);
        let e = expand_for_outline(b, Facing::East, 4, &part);
        assert_eq!((e.min.x, e.max.x), (3, 6));
        assert_eq!((e.min.z, e.max.z), (0, 15));
        let last = bounds_for_slice(chunk, Facing::East, 15, 0, 31);
        assert_eq!(expand_for_outline(last, Facing::East, 4, &part), last);
        let north = bounds_for_slice(chunk, Facing::North, 0, 0, 31);
        let n = expand_for_outline(north, Facing::North, 3, &part);
        assert_eq!((n.min.z, n.max.z), (13, 15));
        assert_eq!(expand_for_outline(north, Facing::North, 0, &part), north);
    }
}
