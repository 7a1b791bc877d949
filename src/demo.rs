use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use collapse_access::{BypassRegistry, ChunkAccessContext, SessionStatsSnapshot};
use collapse_engine::DestructionEngine;
use collapse_geom::{CHUNK_SIZE, ChunkCoord, Vec3};
use collapse_runtime::{CollapseConfig, CollapseScheduler};
use collapse_world::{TerrainParams, VoxelWorld, WorldBorder};
use hashbrown::HashMap;
use serde::Deserialize;

/// `[demo]` table: the world to build and how the radius grows.
#[derive(Clone, Debug, Deserialize)]
pub struct DemoConfig {
    /// Loadable area, in chunks from the origin chunk.
    #[serde(default = "default_extent")]
    pub extent: i32,
    #[serde(default)]
    pub min_y: i32,
    #[serde(default = "default_max_y")]
    pub max_y: i32,
    /// Epicenter x and z in blocks.
    #[serde(default = "default_epicenter")]
    pub epicenter: [f32; 2],
    #[serde(default = "default_start_radius")]
    pub start_radius: f32,
    #[serde(default = "default_radius_growth")]
    pub radius_growth: f32,
    #[serde(default = "default_max_radius")]
    pub max_radius: f32,
    /// Half-width of the square world border; none means unbounded.
    #[serde(default)]
    pub border_radius: Option<f32>,
    #[serde(default = "default_true")]
    pub preload: bool,
    #[serde(default = "default_loads_per_step")]
    pub loads_per_step: usize,
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    #[serde(default)]
    pub step_ms: u64,
    /// Scan on the main thread through the engine instead of the pool.
    #[serde(default)]
    pub sync: bool,
    #[serde(default)]
    pub terrain: TerrainParams,
}

fn default_extent() -> i32 {
    4
}
fn default_max_y() -> i32 {
    63
}
fn default_epicenter() -> [f32; 2] {
    [8.0, 8.0]
}
fn default_start_radius() -> f32 {
    16.0
}
fn default_radius_growth() -> f32 {
    4.0
}
fn default_max_radius() -> f32 {
    64.0
}
fn default_true() -> bool {
    true
}
fn default_loads_per_step() -> usize {
    4
}
fn default_max_steps() -> u32 {
    100_000
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            extent: default_extent(),
            min_y: 0,
            max_y: default_max_y(),
            epicenter: default_epicenter(),
            start_radius: default_start_radius(),
            radius_growth: default_radius_growth(),
            max_radius: default_max_radius(),
            border_radius: None,
            preload: true,
            loads_per_step: default_loads_per_step(),
            max_steps: default_max_steps(),
            step_ms: 0,
            sync: false,
            terrain: TerrainParams::default(),
        }
    }
}

impl DemoConfig {
    pub fn epicenter(&self) -> Vec3 {
        Vec3::new(self.epicenter[0], 0.0, self.epicenter[1])
    }
}

#[derive(Debug, Default, Deserialize)]
struct DemoFile {
    #[serde(default)]
    demo: DemoConfig,
}

/// Reads the `[demo]` table. The collapse settings in the same file are
/// loaded separately by `collapse_runtime::load_config_from_path`.
pub fn load_demo_from_path(path: &Path) -> Result<DemoConfig, Box<dyn std::error::Error>> {
    let s = std::fs::read_to_string(path)?;
    let file: DemoFile = toml::from_str(&s)?;
    Ok(file.demo)
}

/// Groups chunks into rings one chunk wide around the epicenter. Ring `i`
/// opens once the radius reaches `i * 16` blocks. Within a ring, chunks
/// nearest the epicenter chunk come first.
pub fn plan_rings(
    chunks: impl IntoIterator<Item = ChunkCoord>,
    epicenter: Vec3,
    max_radius: f32,
) -> Vec<(u32, f32, Vec<ChunkCoord>)> {
    let origin = ChunkCoord::from_block(epicenter.x.floor() as i32, epicenter.z.floor() as i32);
    let mut by_ring: HashMap<u32, Vec<ChunkCoord>> = HashMap::new();
    for c in chunks {
        let d = c.center().horizontal_distance(epicenter);
        if d > max_radius {
            continue;
        }
        let ring = (d / CHUNK_SIZE as f32).floor() as u32;
        by_ring.entry(ring).or_default().push(c);
    }
    let mut rings: Vec<(u32, f32, Vec<ChunkCoord>)> = by_ring
        .into_iter()
        .map(|(i, mut cs)| {
            cs.sort_by_key(|c| (c.distance_sq(origin), *c));
            (i, i as f32 * CHUNK_SIZE as f32, cs)
        })
        .collect();
    rings.sort_by_key(|r| r.0);
    rings
}

pub struct DemoReport {
    pub steps: u32,
    pub elapsed: Duration,
    pub current_radius: f32,
    pub stats: SessionStatsSnapshot,
    pub remaining_blocks: usize,
}

/// Builds the world, plans the rings, and drives one collapse session until
/// every ring is done or `max_steps` runs out.
pub fn run(collapse: CollapseConfig, demo: &DemoConfig) -> DemoReport {
    let registry = Arc::new(BypassRegistry::new());
    let world = Arc::new(
        VoxelWorld::new(demo.min_y, demo.max_y, demo.extent, demo.terrain.clone())
            .with_border_enforcement(Arc::clone(&registry)),
    );
    if let Some(r) = demo.border_radius {
        world.set_border(WorldBorder {
            center: demo.epicenter(),
            radius: r,
        });
    }
    if demo.preload {
        world.load_all();
    }

    let epicenter = demo.epicenter();
    let mut engine = DestructionEngine::new(demo.min_y, demo.max_y, collapse.active_tasks_per_step);
    let rings = plan_rings(world.loadable_chunks(), epicenter, demo.max_radius);
    log::info!(
        target: "collapse",
        "{} rings over {} chunks, epicenter ({}, {})",
        rings.len(),
        rings.iter().map(|r| r.2.len()).sum::<usize>(),
        epicenter.x,
        epicenter.z
    );
    for (index, threshold, partitions) in rings {
        engine.enqueue_ring(index, threshold, partitions);
    }

    let from_bottom = collapse.from_bottom;
    let slice_mode = collapse.slice_mode();
    let access = ChunkAccessContext::with_registry("demo", Arc::clone(&registry));
    let mut sched = CollapseScheduler::new(collapse, access.clone(), epicenter);
    let mut writer = world.writer();

    let started = Instant::now();
    let mut radius = demo.start_radius;
    let mut steps = 0;
    while steps < demo.max_steps {
        steps += 1;
        engine.set_target_radius(radius);
        for index in engine.rings_ready_at(radius) {
            engine.activate_ring(index, from_bottom, slice_mode);
        }

        if demo.sync {
            sched.step_inline(&mut engine, world.as_ref(), &mut writer);
        } else {
            sched.pump(&mut engine, &world);
            sched.flush(&mut writer, &mut engine);
        }
        world.load_pending(demo.loads_per_step);

        if radius >= demo.max_radius && engine.rings_remaining() == 0 {
            engine.mark_finished();
        }
        if engine.is_finished() && sched.in_flight() == 0 {
            break;
        }
        if steps % 100 == 0 {
            let (queued, running) = sched.queue_debug_counts();
            log::info!(
                target: "collapse",
                "step {}: radius {:.1} reached {:.1}, pending {}, in flight {} (queued {}, running {})",
                steps,
                radius,
                engine.current_radius(),
                engine.pending_len(),
                sched.in_flight(),
                queued,
                running
            );
        }
        radius = (radius + demo.radius_growth).min(demo.max_radius);
        if demo.step_ms > 0 {
            thread::sleep(Duration::from_millis(demo.step_ms));
        } else if !demo.sync && sched.in_flight() > 0 {
            thread::yield_now();
        }
    }

    if !engine.is_finished() {
        log::warn!(
            target: "collapse",
            "stopped after {} steps with {} tasks pending",
            steps,
            engine.pending_len()
        );
    }
    sched.close();
    let stats = access.finish_session();
    let remaining_blocks = world
        .resident_chunks()
        .into_iter()
        .filter_map(|c| world.count_non_air(c))
        .sum();

    DemoReport {
        steps,
        elapsed: started.elapsed(),
        current_radius: engine.current_radius(),
        stats,
        remaining_blocks,
    }
}
