//! Coordinate and bounds types shared by the collapse crates.
#![forbid(unsafe_code)]

use core::fmt;
use core::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Horizontal edge length of a partition in voxels.
pub const CHUNK_SIZE: i32 = 16;

/// World-space point, used for epicenters and partition centers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn horizontal_distance(self, other: Vec3) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    #[inline]
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    #[inline]
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Partition coordinate. Partitions span the full world height, so only the
/// horizontal indices are tracked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    #[inline]
    pub fn from_block(x: i32, z: i32) -> Self {
        Self {
            cx: x.div_euclid(CHUNK_SIZE),
            cz: z.div_euclid(CHUNK_SIZE),
        }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cz: self.cz + dz,
        }
    }

    #[inline]
    pub fn origin_x(self) -> i32 {
        self.cx * CHUNK_SIZE
    }

    #[inline]
    pub fn origin_z(self) -> i32 {
        self.cz * CHUNK_SIZE
    }

    /// Horizontal center of the partition in world space (y is zero).
    #[inline]
    pub fn center(self) -> Vec3 {
        let half = CHUNK_SIZE as f32 * 0.5;
        Vec3::new(
            self.origin_x() as f32 + half,
            0.0,
            self.origin_z() as f32 + half,
        )
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.cx - other.cx);
        let dz = i64::from(self.cz - other.cz);
        dx * dx + dz * dz
    }

    /// Full-height bounds of this partition between `min_y` and `max_y`.
    #[inline]
    pub fn bounds(self, min_y: i32, max_y: i32) -> BlockBounds {
        BlockBounds::new(
            BlockPos::new(self.origin_x(), min_y, self.origin_z()),
            BlockPos::new(
                self.origin_x() + CHUNK_SIZE - 1,
                max_y,
                self.origin_z() + CHUNK_SIZE - 1,
            ),
        )
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.cx, self.cz)
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<ChunkCoord> for (i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cz)
    }
}

/// A single voxel position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn chunk(self) -> ChunkCoord {
        ChunkCoord::from_block(self.x, self.z)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<(i32, i32, i32)> for BlockPos {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

/// Inclusive voxel box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockBounds {
    pub min: BlockPos,
    pub max: BlockPos,
}

impl BlockBounds {
    /// Builds a box from two corners in any order.
    #[inline]
    pub fn new(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    #[inline]
    pub fn contains(&self, p: BlockPos) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    #[inline]
    pub fn size_x(&self) -> i32 {
        self.max.x - self.min.x + 1
    }

    #[inline]
    pub fn size_y(&self) -> i32 {
        self.max.y - self.min.y + 1
    }

    #[inline]
    pub fn size_z(&self) -> i32 {
        self.max.z - self.min.z + 1
    }

    #[inline]
    pub fn volume(&self) -> i64 {
        i64::from(self.size_x()) * i64::from(self.size_y()) * i64::from(self.size_z())
    }

    /// Clamps this box into `outer`. Returns `None` when they do not overlap.
    pub fn intersect(&self, outer: &BlockBounds) -> Option<BlockBounds> {
        let min = BlockPos::new(
            self.min.x.max(outer.min.x),
            self.min.y.max(outer.min.y),
            self.min.z.max(outer.min.z),
        );
        let max = BlockPos::new(
            self.max.x.min(outer.max.x),
            self.max.y.min(outer.max.y),
            self.max.z.min(outer.max.z),
        );
        if min.x > max.x || min.y > max.y || min.z > max.z {
            return None;
        }
        Some(BlockBounds { min, max })
    }

    /// Every position in the box, x fastest, then z, then y.
    pub fn positions(&self) -> impl Iterator<Item = BlockPos> + '_ {
        let (min, max) = (self.min, self.max);
        (min.y..=max.y).flat_map(move |y| {
            (min.z..=max.z).flat_map(move |z| (min.x..=max.x).map(move |x| BlockPos::new(x, y, z)))
        })
    }
}
