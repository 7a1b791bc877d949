//! Collapse scheduler: worker pool, read-only partition scans, main-thread apply.
#![forbid(unsafe_code)]

pub mod config;
mod scan;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use collapse_access::ChunkAccessContext;
use collapse_engine::{ColumnStep, ColumnTask, DestructionEngine};
use collapse_geom::{BlockPos, ChunkCoord, Vec3};
use collapse_world::WorldMutator;
use crossbeam_channel::{Receiver, Sender, unbounded};
use hashbrown::HashSet;
use rayon::{ThreadPool, ThreadPoolBuilder};

pub use config::{CollapseConfig, ScanMode, ShapeScope, load_config_from_path};
pub use scan::ScanWorld;

use crate::scan::{ScanEnv, run_scan};

/// Why a scan produced nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanFailure {
    /// The partition was not loaded, or reading it faulted.
    MissingPartition,
    /// The partition lies outside the world boundary.
    OutsideBoundary,
}

/// Outcome of one scan job, applied on the main thread by
/// [`CollapseScheduler::flush`].
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnWorkResult {
    pub task: ColumnTask,
    /// Layer the continuation starts at when the column is not complete.
    pub next_depth: i32,
    pub column_complete: bool,
    pub cleared: Vec<BlockPos>,
    pub drained: Vec<BlockPos>,
    pub chunk_mode_used: bool,
    pub failure: Option<ScanFailure>,
    pub boundary_radius: f32,
}

impl ColumnWorkResult {
    pub(crate) fn failed(task: ColumnTask, failure: ScanFailure, boundary_radius: f32) -> Self {
        Self {
            task,
            next_depth: task.current_depth(),
            column_complete: false,
            cleared: Vec::new(),
            drained: Vec::new(),
            chunk_mode_used: false,
            failure: Some(failure),
            boundary_radius,
        }
    }
}

struct ScanJob {
    task: ColumnTask,
    world: Arc<dyn ScanWorld>,
}

/// A result on its way back to `flush`, tagged with where it was scanned.
struct Finished {
    result: ColumnWorkResult,
    pooled: bool,
}

struct WorkerShared {
    config: CollapseConfig,
    access: ChunkAccessContext,
    epicenter: Vec3,
    closed: AtomicBool,
}

impl WorkerShared {
    fn env(&self, cancellable: bool) -> ScanEnv<'_> {
        ScanEnv {
            config: &self.config,
            access: &self.access,
            epicenter: self.epicenter,
            layer_budget: self.config.layers_per_job,
            cancel: cancellable.then_some(&self.closed),
        }
    }
}

/// Picks the pool size: the configured count (0 = auto), clamped to
/// `1..=cores - 1`.
pub fn resolve_worker_count(configured: usize) -> usize {
    let cores = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2);
    let max = cores.saturating_sub(1).max(1);
    if configured == 0 {
        max
    } else {
        configured.clamp(1, max)
    }
}

/// Owns the worker pool for one collapse session.
///
/// `submit` never blocks. Workers only read; everything they find comes back
/// as a [`ColumnWorkResult`] that `flush` applies through a [`WorldMutator`]
/// on the calling thread.
pub struct CollapseScheduler {
    shared: Arc<WorkerShared>,
    job_tx: Option<Sender<ScanJob>>,
    res_tx: Sender<Finished>,
    res_rx: Receiver<Finished>,
    _pool: Option<ThreadPool>,
    queued: Arc<AtomicUsize>,
    in_flight: usize,
    pub workers: usize,
}

impl CollapseScheduler {
    pub fn new(config: CollapseConfig, access: ChunkAccessContext, epicenter: Vec3) -> Self {
        let (job_tx, job_rx) = unbounded::<ScanJob>();
        let (res_tx, res_rx) = unbounded::<Finished>();
        let workers = resolve_worker_count(config.workers);
        let shared = Arc::new(WorkerShared {
            config,
            access,
            epicenter,
            closed: AtomicBool::new(false),
        });
        let queued = Arc::new(AtomicUsize::new(0));

        let label = shared.access.label().to_owned();
        let pool = match ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(move |i| format!("collapse-{label}-{i}"))
            .build()
        {
            Ok(pool) => {
                for _ in 0..workers {
                    let rx = job_rx.clone();
                    let tx = res_tx.clone();
                    let shared = Arc::clone(&shared);
                    let queued = Arc::clone(&queued);
                    pool.spawn(move || {
                        while let Ok(job) = rx.recv() {
                            queued.fetch_sub(1, Ordering::Relaxed);
                            let result = run_scan(job.task, job.world.as_ref(), &shared.env(true));
                            if tx.send(Finished { result, pooled: true }).is_err() {
                                break;
                            }
                        }
                    });
                }
                Some(pool)
            }
            Err(err) => {
                log::warn!(target: "scheduler", "worker pool unavailable ({err}); scanning inline");
                None
            }
        };
        let job_tx = pool.as_ref().map(|_| job_tx);
        log::info!(
            target: "scheduler",
            "session '{}': {} workers, {} tasks per step",
            shared.access.label(),
            if pool.is_some() { workers } else { 0 },
            shared.config.active_tasks_per_step
        );

        Self {
            shared,
            job_tx,
            res_tx,
            res_rx,
            _pool: pool,
            queued,
            in_flight: 0,
            workers,
        }
    }

    #[inline]
    pub fn config(&self) -> &CollapseConfig {
        &self.shared.config
    }

    #[inline]
    pub fn access(&self) -> &ChunkAccessContext {
        &self.shared.access
    }

    #[inline]
    pub fn epicenter(&self) -> Vec3 {
        self.shared.epicenter
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Hands `task` to the pool, or scans it on this thread when the
    /// scheduler is closed or the pool is gone. Either way its result is
    /// picked up by the next `flush`.
    pub fn submit<W: ScanWorld + 'static>(&mut self, world: &Arc<W>, task: ColumnTask) {
        let world: Arc<dyn ScanWorld> = world.clone();
        self.in_flight += 1;
        let job = ScanJob { task, world };
        let job = match (&self.job_tx, self.is_closed()) {
            (Some(tx), false) => {
                self.queued.fetch_add(1, Ordering::Relaxed);
                match tx.send(job) {
                    Ok(()) => return,
                    Err(rejected) => {
                        self.queued.fetch_sub(1, Ordering::Relaxed);
                        rejected.into_inner()
                    }
                }
            }
            _ => job,
        };
        self.shared.access.stats().record_inline_fallback();
        let result = run_scan(job.task, job.world.as_ref(), &self.shared.env(false));
        // res_rx lives in self, so the channel is always connected
        let _ = self.res_tx.send(Finished { result, pooled: false });
    }

    /// Submits polled tasks until `active_tasks_per_step` are outstanding.
    /// Returns how many were submitted.
    pub fn pump<W: ScanWorld + 'static>(
        &mut self,
        engine: &mut DestructionEngine,
        world: &Arc<W>,
    ) -> usize {
        let mut submitted = 0;
        while self.in_flight < engine.active_tasks_per_step() {
            let Some(task) = engine.poll_column() else {
                break;
            };
            self.submit(world, task);
            submitted += 1;
        }
        submitted
    }

    /// Applies every finished result. Returns whether anything was applied.
    ///
    /// Once the scheduler is closed, pool results are not applied: their
    /// tasks go back to the engine unchanged.
    pub fn flush<M: WorldMutator>(&mut self, writer: &mut M, engine: &mut DestructionEngine) -> bool {
        let finished: Vec<Finished> = self.res_rx.try_iter().collect();
        if finished.is_empty() {
            return false;
        }
        self.in_flight = self.in_flight.saturating_sub(finished.len());
        let closed = self.is_closed();
        let mut applied = false;
        let mut rejected: HashSet<ChunkCoord> = HashSet::new();
        for Finished { result, pooled } in finished {
            if closed && pooled {
                engine.requeue_column(result.task);
                continue;
            }
            applied = true;
            if let Some(p) = self.apply_result(result, writer, engine) {
                rejected.insert(p);
            }
        }
        for p in rejected {
            engine.remove_chunk_tasks(p);
        }
        applied
    }

    /// Applies one result. Returns the partition when it was rejected by
    /// the boundary, so the caller can purge its remaining tasks.
    fn apply_result<M: WorldMutator>(
        &self,
        result: ColumnWorkResult,
        writer: &mut M,
        engine: &mut DestructionEngine,
    ) -> Option<ChunkCoord> {
        let cfg = &self.shared.config;
        let stats = self.shared.access.stats();
        let task = result.task;
        match result.failure {
            Some(ScanFailure::MissingPartition) => {
                writer.request_partition(task.partition());
                engine.requeue_column(task);
                return None;
            }
            Some(ScanFailure::OutsideBoundary) => return Some(task.partition()),
            None => {}
        }

        for &pos in &result.cleared {
            if cfg.drop_items {
                writer.break_voxel(pos);
            } else {
                writer.clear_voxel(pos);
            }
        }
        for &pos in &result.drained {
            writer.drain_fluid(pos);
        }
        stats.record_blocks_cleared(result.cleared.len() as u64);
        stats.record_fluids_drained(result.drained.len() as u64);

        if result.column_complete {
            stats.record_column_processed();
            engine.on_column_complete(&task);
            return None;
        }
        match task.with_depth(result.next_depth) {
            Some(next) => {
                let sticky = cfg.finish_columns_first || task.is_sticky();
                engine.requeue_column(next.with_sticky(sticky));
            }
            None => {
                stats.record_column_processed();
                engine.on_column_complete(&task);
            }
        }
        None
    }

    /// Runs one step on the calling thread without the pool: up to
    /// `active_tasks_per_step` tasks are scanned and applied immediately.
    pub fn step_inline<W: ScanWorld, M: WorldMutator>(
        &self,
        engine: &mut DestructionEngine,
        world: &W,
        writer: &mut M,
    ) -> bool {
        let base = self.shared.env(false);
        let cfg = &self.shared.config;
        let stats = self.shared.access.stats();
        let mut rejected: Vec<ChunkCoord> = Vec::new();
        let budget = if cfg.scan_mode == ScanMode::ChunkVolume {
            usize::MAX
        } else {
            cfg.layers_per_job as usize
        };
        let worked = engine.consume_columns(writer, budget, |task, writer, budget| {
            let env = ScanEnv {
                layer_budget: u32::try_from(budget).unwrap_or(u32::MAX),
                ..base
            };
            let result = run_scan(task, world, &env);
            match result.failure {
                Some(ScanFailure::MissingPartition) => {
                    writer.request_partition(task.partition());
                    return ColumnStep::Continue(task);
                }
                Some(ScanFailure::OutsideBoundary) => {
                    rejected.push(task.partition());
                    return ColumnStep::Abandon;
                }
                None => {}
            }
            for &pos in &result.cleared {
                if cfg.drop_items {
                    writer.break_voxel(pos);
                } else {
                    writer.clear_voxel(pos);
                }
            }
            for &pos in &result.drained {
                writer.drain_fluid(pos);
            }
            stats.record_blocks_cleared(result.cleared.len() as u64);
            stats.record_fluids_drained(result.drained.len() as u64);
            if result.column_complete {
                stats.record_column_processed();
                return ColumnStep::Complete;
            }
            match task.with_depth(result.next_depth) {
                Some(next) => ColumnStep::Continue(next.with_sticky(cfg.finish_columns_first || task.is_sticky())),
                None => {
                    stats.record_column_processed();
                    ColumnStep::Complete
                }
            }
        });
        for p in rejected {
            engine.remove_chunk_tasks(p);
        }
        worked
    }

    /// Stops the pool. Workers finish their current layer and exit. Pool
    /// results flushed after this are not applied and their tasks are
    /// requeued unchanged; later submissions run inline and apply normally.
    pub fn close(&mut self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.job_tx = None;
        log::info!(
            target: "scheduler",
            "session '{}' closed with {} jobs in flight",
            self.shared.access.label(),
            self.in_flight
        );
    }
    /// Submitted jobs whose results have not been flushed yet.
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// (jobs waiting for a worker, scans running right now)
    pub fn queue_debug_counts(&self) -> (usize, usize) {
        (
            self.queued.load(Ordering::Relaxed),
            self.shared.access.stats().active_scans(),
        )
    }
}

impl Drop for CollapseScheduler {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
        self.job_tx = None;
    }
}
