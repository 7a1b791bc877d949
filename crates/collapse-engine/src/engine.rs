use std::collections::VecDeque;

use collapse_geom::ChunkCoord;
use collapse_shape::SLICE_COUNT;
use serde::{Deserialize, Serialize};

use crate::task::ColumnTask;

/// A batch of partitions that becomes eligible once the collapse radius
/// reaches `radius_threshold`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RingPlan {
    pub index: u32,
    pub radius_threshold: f32,
    pub partitions: Vec<ChunkCoord>,
    activated: bool,
}

impl RingPlan {
    #[inline]
    pub fn is_activated(&self) -> bool {
        self.activated
    }
}

/// What a synchronous consumer did with a polled task.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColumnStep {
    /// Requeue this continuation.
    Continue(ColumnTask),
    /// The column is done; counts toward `current_radius`.
    Complete,
    /// Dropped without completing, e.g. rejected by the world boundary.
    Abandon,
}

impl From<Option<ColumnTask>> for ColumnStep {
    fn from(next: Option<ColumnTask>) -> Self {
        match next {
            Some(task) => ColumnStep::Continue(task),
            None => ColumnStep::Complete,
        }
    }
}

/// Serializable engine state, for an outer layer that persists sessions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub pending: Vec<ColumnTask>,
    pub rings: Vec<RingPlan>,
    pub active_tasks_per_step: usize,
    pub depth_bounds: (i32, i32),
    pub target_radius: f32,
    pub current_radius: f32,
    pub finished: bool,
}

/// Pending column work for one collapse session. Main thread only.
///
/// Sticky tasks live in a priority lane that is always drained before the
/// normal lane.
pub struct DestructionEngine {
    priority: VecDeque<ColumnTask>,
    normal: VecDeque<ColumnTask>,
    rings: Vec<RingPlan>,
    active_tasks_per_step: usize,
    depth_bounds: (i32, i32),
    target_radius: f32,
    current_radius: f32,
    finished: bool,
}

impl DestructionEngine {
    pub fn new(min_depth: i32, max_depth: i32, active_tasks_per_step: usize) -> Self {
        Self {
            priority: VecDeque::new(),
            normal: VecDeque::new(),
            rings: Vec::new(),
            active_tasks_per_step: active_tasks_per_step.max(1),
            depth_bounds: (min_depth.min(max_depth), min_depth.max(max_depth)),
            target_radius: 0.0,
            current_radius: 0.0,
            finished: false,
        }
    }

    /// Registers a ring. A second registration of the same index is ignored.
    pub fn enqueue_ring(&mut self, index: u32, radius_threshold: f32, partitions: Vec<ChunkCoord>) {
        if self.rings.iter().any(|r| r.index == index) {
            log::warn!(target: "collapse", "ring {} already registered; ignoring", index);
            return;
        }
        self.rings.push(RingPlan {
            index,
            radius_threshold,
            partitions,
            activated: false,
        });
    }

    /// Expands ring `index` into column tasks. Returns how many tasks were
    /// queued; zero when the ring is unknown or already active.
    pub fn activate_ring(&mut self, index: u32, from_bottom: bool, slice_mode: bool) -> usize {
        let (min_depth, max_depth) = self.depth_bounds;
        let Some(ring) = self.rings.iter_mut().find(|r| r.index == index) else {
            return 0;
        };
        if ring.activated {
            return 0;
        }
        ring.activated = true;
        let before = self.normal.len();
        for &partition in &ring.partitions {
            let task = ColumnTask::new(
                partition,
                min_depth,
                max_depth,
                from_bottom,
                ring.radius_threshold,
            );
            if slice_mode {
                for slice in 0..SLICE_COUNT {
                    self.normal.push_back(task.with_ring_slice(slice));
                }
            } else {
                self.normal.push_back(task);
            }
        }
        let queued = self.normal.len() - before;
        log::debug!(
            target: "collapse",
            "ring {} activated: {} partitions, {} tasks (slices={})",
            index,
            ring.partitions.len(),
            queued,
            slice_mode
        );
        queued
    }

    /// Indices of registered rings whose threshold is within `radius` and
    /// which have not been activated yet, in registration order.
    pub fn rings_ready_at(&self, radius: f32) -> Vec<u32> {
        self.rings
            .iter()
            .filter(|r| !r.activated && r.radius_threshold <= radius)
            .map(|r| r.index)
            .collect()
    }

    pub fn poll_column(&mut self) -> Option<ColumnTask> {
        self.priority.pop_front().or_else(|| self.normal.pop_front())
    }

    pub fn requeue_column(&mut self, task: ColumnTask) {
        if task.is_sticky() {
            self.priority.push_front(task);
        } else {
            self.normal.push_back(task);
        }
    }

    /// Records a finished column. `current_radius` only ever grows.
    pub fn on_column_complete(&mut self, task: &ColumnTask) {
        if task.radius_at_enqueue() > self.current_radius {
            self.current_radius = task.radius_at_enqueue();
        }
    }

    /// Runs up to `active_tasks_per_step` tasks through `consumer` on the
    /// calling thread. `budget` is handed to every call unchanged. Returns
    /// whether any task was taken.
    pub fn consume_columns<C, F, R>(&mut self, ctx: &mut C, budget: usize, mut consumer: F) -> bool
    where
        F: FnMut(ColumnTask, &mut C, usize) -> R,
        R: Into<ColumnStep>,
    {
        let mut worked = false;
        for _ in 0..self.active_tasks_per_step {
            let Some(task) = self.poll_column() else {
                break;
            };
            worked = true;
            match consumer(task, ctx, budget).into() {
                ColumnStep::Continue(next) => self.requeue_column(next),
                ColumnStep::Complete => self.on_column_complete(&task),
                ColumnStep::Abandon => {}
            }
        }
        worked
    }

    /// Drops every pending task for `partition`. Returns how many went.
    pub fn remove_chunk_tasks(&mut self, partition: ChunkCoord) -> usize {
        let before = self.pending_len();
        self.priority.retain(|t| t.partition() != partition);
        self.normal.retain(|t| t.partition() != partition);
        before - self.pending_len()
    }

    pub fn mark_finished(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished && self.pending_len() == 0 && self.rings.iter().all(|r| r.activated)
    }

    #[inline]
    pub fn pending_len(&self) -> usize {
        self.priority.len() + self.normal.len()
    }

    pub fn rings_remaining(&self) -> usize {
        self.rings.iter().filter(|r| !r.activated).count()
    }

    pub fn rings(&self) -> &[RingPlan] {
        &self.rings
    }

    #[inline]
    pub fn active_tasks_per_step(&self) -> usize {
        self.active_tasks_per_step
    }

    #[inline]
    pub fn depth_bounds(&self) -> (i32, i32) {
        self.depth_bounds
    }

    #[inline]
    pub fn current_radius(&self) -> f32 {
        self.current_radius
    }

    #[inline]
    pub fn target_radius(&self) -> f32 {
        self.target_radius
    }

    pub fn set_target_radius(&mut self, radius: f32) {
        self.target_radius = radius;
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            pending: self
                .priority
                .iter()
                .chain(self.normal.iter())
                .copied()
                .collect(),
            rings: self.rings.clone(),
            active_tasks_per_step: self.active_tasks_per_step,
            depth_bounds: self.depth_bounds,
            target_radius: self.target_radius,
            current_radius: self.current_radius,
            finished: self.finished,
        }
    }

    /// Rebuilds an engine from a snapshot. Tasks that violate the task
    /// invariants are dropped with a warning.
    pub fn restore(snapshot: EngineSnapshot) -> Self {
        let (min_depth, max_depth) = snapshot.depth_bounds;
        let mut engine = Self::new(min_depth, max_depth, snapshot.active_tasks_per_step);
        engine.rings = snapshot.rings;
        engine.target_radius = snapshot.target_radius;
        engine.current_radius = snapshot.current_radius;
        engine.finished = snapshot.finished;
        let mut dropped = 0usize;
        for task in snapshot.pending {
            if !task.is_valid() {
                dropped += 1;
                continue;
            }
            if task.is_sticky() {
                engine.priority.push_back(task);
            } else {
                engine.normal.push_back(task);
            }
        }
        if dropped > 0 {
            log::warn!(target: "collapse", "restore dropped {} invalid tasks", dropped);
        }
        engine
    }
}
