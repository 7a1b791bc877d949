use collapse_geom::ChunkCoord;
use collapse_shape::SLICE_COUNT;
use serde::{Deserialize, Serialize};

/// One pending unit of collapse work: a partition scanned layer by layer
/// from `current_depth` toward one end of `[min_depth, max_depth]`.
///
/// Tasks are values. Every transition returns a new task and leaves the
/// receiver untouched.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnTask {
    partition: ChunkCoord,
    current_depth: i32,
    min_depth: i32,
    max_depth: i32,
    step: i8,
    radius_at_enqueue: f32,
    sticky: bool,
    ring_slice: Option<u8>,
}

impl ColumnTask {
    /// A task covering `[min_depth, max_depth]`, starting at the bottom
    /// (`step = +1`) or the top (`step = -1`).
    pub fn new(
        partition: ChunkCoord,
        min_depth: i32,
        max_depth: i32,
        from_bottom: bool,
        radius_at_enqueue: f32,
    ) -> Self {
        let (min_depth, max_depth) = (min_depth.min(max_depth), min_depth.max(max_depth));
        let (current_depth, step) = if from_bottom {
            (min_depth, 1)
        } else {
            (max_depth, -1)
        };
        Self {
            partition,
            current_depth,
            min_depth,
            max_depth,
            step,
            radius_at_enqueue,
            sticky: false,
            ring_slice: None,
        }
    }

    #[inline]
    pub fn bottom_up(partition: ChunkCoord, min_depth: i32, max_depth: i32, radius: f32) -> Self {
        Self::new(partition, min_depth, max_depth, true, radius)
    }

    #[inline]
    pub fn top_down(partition: ChunkCoord, min_depth: i32, max_depth: i32, radius: f32) -> Self {
        Self::new(partition, min_depth, max_depth, false, radius)
    }

    /// Restricts the task to one directional slice of its partition.
    pub fn with_ring_slice(self, slice: u8) -> Self {
        debug_assert!(slice < SLICE_COUNT);
        Self {
            ring_slice: Some(slice.min(SLICE_COUNT - 1)),
            ..self
        }
    }

    /// Next layer, or `None` once stepping would leave the depth range.
    pub fn advance(&self) -> Option<Self> {
        let next = self.current_depth.checked_add(i32::from(self.step))?;
        if next < self.min_depth || next > self.max_depth {
            return None;
        }
        Some(Self {
            current_depth: next,
            ..*self
        })
    }

    pub fn with_sticky(self, sticky: bool) -> Self {
        Self { sticky, ..self }
    }

    /// Continuation at `depth`, or `None` when `depth` is out of range.
    pub fn with_depth(self, depth: i32) -> Option<Self> {
        if depth < self.min_depth || depth > self.max_depth {
            return None;
        }
        Some(Self {
            current_depth: depth,
            ..self
        })
    }

    #[inline]
    pub fn partition(&self) -> ChunkCoord {
        self.partition
    }

    #[inline]
    pub fn current_depth(&self) -> i32 {
        self.current_depth
    }

    #[inline]
    pub fn min_depth(&self) -> i32 {
        self.min_depth
    }

    #[inline]
    pub fn max_depth(&self) -> i32 {
        self.max_depth
    }

    #[inline]
    pub fn step(&self) -> i32 {
        i32::from(self.step)
    }

    #[inline]
    pub fn radius_at_enqueue(&self) -> f32 {
        self.radius_at_enqueue
    }

    #[inline]
    pub fn is_sticky(&self) -> bool {
        self.sticky
    }

    #[inline]
    pub fn ring_slice(&self) -> Option<u8> {
        self.ring_slice
    }

    /// Layers left including the current one.
    pub fn remaining_layers(&self) -> u32 {
        if self.step > 0 {
            (self.max_depth - self.current_depth + 1) as u32
        } else {
            (self.current_depth - self.min_depth + 1) as u32
        }
    }

    /// Checks the invariants a freshly deserialized task must satisfy.
    pub fn is_valid(&self) -> bool {
        (self.step == 1 || self.step == -1)
            && self.min_depth <= self.max_depth
            && self.current_depth >= self.min_depth
            && self.current_depth <= self.max_depth
            && self.ring_slice.is_none_or(|s| s < SLICE_COUNT)
    }
}
