//! World-facing interfaces of the collapse core and an in-memory voxel
//! world that implements them.
#![forbid(unsafe_code)]

pub mod block;
pub mod chunk;
pub mod terrain;
pub mod world;

use collapse_geom::{BlockPos, ChunkCoord};

pub use block::{Block, VoxelState};
pub use chunk::ChunkBuf;
pub use terrain::TerrainParams;
pub use world::{VoxelWorld, VoxelWorldStats, WorldBorder, WorldWriter};

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("partition {0} is not resident")]
    NotResident(ChunkCoord),
    #[error("partition {0} is outside the world border")]
    OutsideBorder(ChunkCoord),
    #[error("{0} is outside the world height")]
    OutOfRange(BlockPos),
}

/// Read side of the voxel store. Called from worker threads.
pub trait PartitionStore: Send + Sync {
    fn is_resident(&self, chunk: ChunkCoord) -> bool;

    fn read_voxel(&self, pos: BlockPos) -> Result<VoxelState, StoreError>;

    /// Inclusive `(min_y, max_y)` of the world.
    fn depth_bounds(&self) -> (i32, i32);
}

/// The movable world boundary.
pub trait BoundaryChecker: Send + Sync {
    fn contains(&self, chunk: ChunkCoord) -> bool;

    fn boundary_radius(&self) -> f32;
}

/// Write side of the voxel store. Main thread only; implementors should
/// not be `Send`.
pub trait WorldMutator {
    fn clear_voxel(&mut self, pos: BlockPos);

    /// Destroys a solid voxel with side effects (drops). Returns whether
    /// anything was broken.
    fn break_voxel(&mut self, pos: BlockPos) -> bool;

    fn drain_fluid(&mut self, pos: BlockPos);

    /// Hint that a scan found `chunk` missing.
    fn request_partition(&mut self, _chunk: ChunkCoord) {}
}
