use std::sync::{Mutex, MutexGuard, PoisonError};

use collapse_geom::ChunkCoord;
use hashbrown::HashMap;

const SHARDS: usize = 16;

/// Ref-counted set of partitions that workers may currently read outside
/// the normal boundary rules.
///
/// Counts are sharded by coordinate so pushes for different partitions
/// rarely share a lock. Several holders may bypass the same partition at
/// once; the registry only knows how many, not who.
pub struct BypassRegistry {
    shards: Box<[Mutex<HashMap<ChunkCoord, usize>>]>,
}

impl Default for BypassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BypassRegistry {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARDS).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    #[inline]
    fn shard(&self, coord: ChunkCoord) -> MutexGuard<'_, HashMap<ChunkCoord, usize>> {
        let h = (coord.cx as u32).wrapping_mul(0x9E37_79B1) ^ (coord.cz as u32).wrapping_mul(0x85EB_CA77);
        let idx = (h >> 28) as usize % SHARDS;
        self.shards[idx]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds one holder for `coord`. Returns the new count.
    pub fn push(&self, coord: ChunkCoord) -> usize {
        let mut shard = self.shard(coord);
        let count = shard.entry(coord).or_insert(0);
        *count += 1;
        *count
    }

    /// Releases one holder for `coord`. Returns the remaining count, or
    /// `None` when nothing was held (the call is ignored).
    pub fn pop(&self, coord: ChunkCoord) -> Option<usize> {
        let mut shard = self.shard(coord);
        let Some(count) = shard.get_mut(&coord) else {
            log::warn!(target: "bypass", "pop without push for ({}, {})", coord.cx, coord.cz);
            return None;
        };
        *count -= 1;
        let left = *count;
        if left == 0 {
            shard.remove(&coord);
        }
        Some(left)
    }

    pub fn is_bypassing(&self, coord: ChunkCoord) -> bool {
        self.shard(coord).contains_key(&coord)
    }

    pub fn bypass_count(&self, coord: ChunkCoord) -> usize {
        self.shard(coord).get(&coord).copied().unwrap_or(0)
    }

    /// Number of partitions with at least one holder.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pushes `coord` and returns a guard that pops it when dropped,
    /// including during unwinding.
    pub fn acquire(&self, coord: ChunkCoord) -> BypassGuard<'_> {
        self.push(coord);
        BypassGuard {
            registry: self,
            coord,
        }
    }
}

/// Scoped bypass; releases its count on drop.
pub struct BypassGuard<'a> {
    registry: &'a BypassRegistry,
    coord: ChunkCoord,
}

impl BypassGuard<'_> {
    #[inline]
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }
}

impl Drop for BypassGuard<'_> {
    fn drop(&mut self) {
        self.registry.pop(self.coord);
    }
}
