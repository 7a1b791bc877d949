//! Drives a progressive collapse over a generated voxel world.
#![forbid(unsafe_code)]

mod demo;

use std::path::PathBuf;

use clap::Parser;
use collapse_runtime::{CollapseConfig, ScanMode, load_config_from_path};
use collapse_shape::FillShape;

use crate::demo::{DemoConfig, load_demo_from_path};

#[derive(Parser, Debug)]
#[command(name = "collapse", version, about = "Progressive voxel collapse around an epicenter")]
struct Cli {
    /// TOML with collapse settings at the top level and an optional [demo] table
    #[arg(long)]
    config: Option<PathBuf>,

    /// matrix | column | row | vector | outline | walls
    #[arg(long)]
    shape: Option<FillShape>,

    /// column | ring_slice | chunk_volume
    #[arg(long)]
    mode: Option<ScanMode>,

    #[arg(long)]
    thickness: Option<i32>,

    /// Worker threads (0 = all cores but one)
    #[arg(long)]
    workers: Option<usize>,

    /// Stop growing the radius here (blocks)
    #[arg(long)]
    radius: Option<f32>,

    #[arg(long)]
    seed: Option<i32>,

    /// Scan on the main thread instead of the worker pool
    #[arg(long)]
    sync: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();
    let cli = Cli::parse();

    let (mut collapse, mut demo) = match &cli.config {
        Some(path) => {
            let collapse = load_config_from_path(path)?;
            let demo = load_demo_from_path(path)?;
            log::info!(target: "collapse", "loaded config from {}", path.display());
            (collapse, demo)
        }
        None => (CollapseConfig::default(), DemoConfig::default()),
    };

    if let Some(shape) = cli.shape {
        collapse.fill_shape = shape;
    }
    if let Some(mode) = cli.mode {
        collapse.scan_mode = mode;
    }
    if let Some(t) = cli.thickness {
        collapse.thickness = t;
    }
    if let Some(w) = cli.workers {
        collapse.workers = w;
    }
    if let Some(r) = cli.radius {
        demo.max_radius = r;
    }
    if let Some(seed) = cli.seed {
        demo.terrain.seed = seed;
    }
    demo.sync |= cli.sync;

    log::info!(
        target: "collapse",
        "shape={} thickness={} mode={:?} from_bottom={} sync={}",
        collapse.fill_shape,
        collapse.thickness,
        collapse.scan_mode,
        collapse.from_bottom,
        demo.sync
    );

    let report = demo::run(collapse, &demo);
    println!(
        "collapse finished in {} steps ({:.2?}): radius {:.1}, {} columns, {} blocks cleared, {} fluids drained, {} blocks left",
        report.steps,
        report.elapsed,
        report.current_radius,
        report.stats.columns_processed,
        report.stats.blocks_cleared,
        report.stats.fluids_drained,
        report.remaining_blocks
    );
    Ok(())
}
