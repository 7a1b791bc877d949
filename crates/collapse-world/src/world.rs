use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use collapse_access::BypassRegistry;
use collapse_geom::{BlockPos, CHUNK_SIZE, ChunkCoord, Vec3};
use hashbrown::{HashMap, HashSet};

use crate::block::{Block, VoxelState};
use crate::chunk::ChunkBuf;
use crate::terrain::{TerrainParams, generate_chunk};
use crate::{BoundaryChecker, PartitionStore, StoreError, WorldMutator};

/// Square world border centered on `center` with half-width `radius`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldBorder {
    pub center: Vec3,
    pub radius: f32,
}

impl WorldBorder {
    pub const UNBOUNDED: WorldBorder = WorldBorder {
        center: Vec3::ZERO,
        radius: f32::INFINITY,
    };

    /// True when any part of the chunk footprint lies inside the border.
    pub fn contains_chunk(&self, chunk: ChunkCoord) -> bool {
        let x0 = chunk.origin_x() as f32;
        let z0 = chunk.origin_z() as f32;
        let x1 = x0 + CHUNK_SIZE as f32;
        let z1 = z0 + CHUNK_SIZE as f32;
        x1 > self.center.x - self.radius
            && x0 < self.center.x + self.radius
            && z1 > self.center.z - self.radius
            && z0 < self.center.z + self.radius
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoxelWorldStats {
    pub resident_chunks: usize,
    pub pending_loads: usize,
    pub drops: u64,
}

/// In-memory, lazily generated voxel world.
///
/// Reads are safe from any thread; each chunk sits behind its own lock so
/// workers only contend when they touch the same partition. Mutation goes
/// through [`WorldWriter`], which cannot leave the thread that created it.
pub struct VoxelWorld {
    min_y: i32,
    max_y: i32,
    extent: i32,
    terrain: TerrainParams,
    chunks: RwLock<HashMap<ChunkCoord, Arc<RwLock<ChunkBuf>>>>,
    pending: Mutex<VecDeque<ChunkCoord>>,
    border: RwLock<WorldBorder>,
    bypass: Option<Arc<BypassRegistry>>,
    drops: AtomicU64,
}

impl VoxelWorld {
    /// A world whose loadable area is the square of chunks within `extent`
    /// of the origin chunk.
    pub fn new(min_y: i32, max_y: i32, extent: i32, terrain: TerrainParams) -> Self {
        Self {
            min_y: min_y.min(max_y),
            max_y: min_y.max(max_y),
            extent: extent.max(0),
            terrain,
            chunks: RwLock::new(HashMap::new()),
            pending: Mutex::new(VecDeque::new()),
            border: RwLock::new(WorldBorder::UNBOUNDED),
            bypass: None,
            drops: AtomicU64::new(0),
        }
    }

    /// Rejects reads outside the border unless `registry` has a bypass for
    /// the partition.
    pub fn with_border_enforcement(mut self, registry: Arc<BypassRegistry>) -> Self {
        self.bypass = Some(registry);
        self
    }

    pub fn set_border(&self, border: WorldBorder) {
        *self.border.write().unwrap_or_else(PoisonError::into_inner) = border;
    }

    pub fn border(&self) -> WorldBorder {
        *self.border.read().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn is_loadable(&self, chunk: ChunkCoord) -> bool {
        chunk.cx.abs() <= self.extent && chunk.cz.abs() <= self.extent
    }

    /// Every loadable chunk, row by row.
    pub fn loadable_chunks(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        (-self.extent..=self.extent)
            .flat_map(move |cz| (-self.extent..=self.extent).map(move |cx| ChunkCoord::new(cx, cz)))
    }

    fn chunk(&self, chunk: ChunkCoord) -> Option<Arc<RwLock<ChunkBuf>>> {
        self.chunks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&chunk)
            .cloned()
    }

    /// Generates `chunk` now if it is loadable and not yet resident.
    pub fn ensure_loaded(&self, chunk: ChunkCoord) -> bool {
        if !self.is_loadable(chunk) {
            return false;
        }
        if self.is_resident(chunk) {
            return true;
        }
        let buf = generate_chunk(&self.terrain, chunk, self.min_y, self.max_y);
        self.chunks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(chunk)
            .or_insert_with(|| Arc::new(RwLock::new(buf)));
        true
    }

    pub fn load_all(&self) {
        let all: Vec<ChunkCoord> = self.loadable_chunks().collect();
        for c in all {
            self.ensure_loaded(c);
        }
    }

    pub fn unload(&self, chunk: ChunkCoord) -> bool {
        self.chunks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&chunk)
            .is_some()
    }

    /// Queues a chunk for a later [`VoxelWorld::load_pending`].
    pub fn request_load(&self, chunk: ChunkCoord) {
        if !self.is_loadable(chunk) || self.is_resident(chunk) {
            return;
        }
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !pending.contains(&chunk) {
            pending.push_back(chunk);
        }
    }

    /// Loads up to `max` queued chunks. Returns how many were generated.
    pub fn load_pending(&self, max: usize) -> usize {
        let batch: Vec<ChunkCoord> = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            let n = max.min(pending.len());
            pending.drain(..n).collect()
        };
        let mut loaded = 0;
        for c in batch {
            if !self.is_resident(c) && self.ensure_loaded(c) {
                loaded += 1;
            }
        }
        if loaded > 0 {
            log::debug!(target: "collapse", "loaded {} pending partitions", loaded);
        }
        loaded
    }

    pub fn block_at(&self, pos: BlockPos) -> Option<Block> {
        let chunk = self.chunk(pos.chunk())?;
        let buf = chunk.read().unwrap_or_else(PoisonError::into_inner);
        buf.get_world(pos.x, pos.y, pos.z)
    }

    pub fn count_non_air(&self, chunk: ChunkCoord) -> Option<usize> {
        let c = self.chunk(chunk)?;
        let buf = c.read().unwrap_or_else(PoisonError::into_inner);
        Some(buf.count_non_air())
    }

    /// Distinct chunks currently resident.
    pub fn resident_chunks(&self) -> HashSet<ChunkCoord> {
        self.chunks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }

    pub fn stats(&self) -> VoxelWorldStats {
        VoxelWorldStats {
            resident_chunks: self.chunks.read().unwrap_or_else(PoisonError::into_inner).len(),
            pending_loads: self.pending.lock().unwrap_or_else(PoisonError::into_inner).len(),
            drops: self.drops.load(Ordering::Relaxed),
        }
    }

    /// Main-thread mutation handle.
    pub fn writer(&self) -> WorldWriter<'_> {
        WorldWriter {
            world: self,
            _main_thread: PhantomData,
        }
    }

    fn replace_block(&self, pos: BlockPos, with: Block) -> Option<Block> {
        let chunk = self.chunk(pos.chunk())?;
        let mut buf = chunk.write().unwrap_or_else(PoisonError::into_inner);
        buf.set_world(pos.x, pos.y, pos.z, with)
    }
}

impl PartitionStore for VoxelWorld {
    fn is_resident(&self, chunk: ChunkCoord) -> bool {
        self.chunks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&chunk)
    }

    fn read_voxel(&self, pos: BlockPos) -> Result<VoxelState, StoreError> {
        let coord = pos.chunk();
        if pos.y < self.min_y || pos.y > self.max_y {
            return Err(StoreError::OutOfRange(pos));
        }
        if let Some(registry) = &self.bypass {
            if !self.border().contains_chunk(coord) && !registry.is_bypassing(coord) {
                return Err(StoreError::OutsideBorder(coord));
            }
        }
        let chunk = self.chunk(coord).ok_or(StoreError::NotResident(coord))?;
        let buf = chunk.read().unwrap_or_else(PoisonError::into_inner);
        buf.get_world(pos.x, pos.y, pos.z)
            .map(Block::voxel_state)
            .ok_or(StoreError::OutOfRange(pos))
    }

    fn depth_bounds(&self) -> (i32, i32) {
        (self.min_y, self.max_y)
    }
}

impl BoundaryChecker for VoxelWorld {
    fn contains(&self, chunk: ChunkCoord) -> bool {
        self.border().contains_chunk(chunk)
    }

    fn boundary_radius(&self) -> f32 {
        self.border().radius
    }
}

/// Mutation handle for a [`VoxelWorld`]. Not `Send`: it stays on the thread
/// that applies collapse results.
pub struct WorldWriter<'w> {
    world: &'w VoxelWorld,
    _main_thread: PhantomData<*const ()>,
}

impl WorldWriter<'_> {
    pub fn world(&self) -> &VoxelWorld {
        self.world
    }
}

impl WorldMutator for WorldWriter<'_> {
    fn clear_voxel(&mut self, pos: BlockPos) {
        self.world.replace_block(pos, Block::AIR);
    }

    fn break_voxel(&mut self, pos: BlockPos) -> bool {
        match self.world.block_at(pos).map(Block::voxel_state) {
            Some(VoxelState::Solid { .. }) => {
                self.world.replace_block(pos, Block::AIR);
                self.world.drops.fetch_add(1, Ordering::Relaxed);
                true
            }
            _ => false,
        }
    }

    fn drain_fluid(&mut self, pos: BlockPos) {
        if let Some(VoxelState::Fluid { .. }) = self.world.block_at(pos).map(Block::voxel_state) {
            self.world.replace_block(pos, Block::AIR);
        }
    }

    fn request_partition(&mut self, chunk: ChunkCoord) {
        self.world.request_load(chunk);
    }
}
