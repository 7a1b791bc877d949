use std::path::Path;

use collapse_shape::FillShape;
use serde::{Deserialize, Serialize};

/// How a worker walks a partition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Up to `layers_per_job` layers of the full 16x16 footprint per job.
    #[default]
    Column,
    /// Like `Column`, but rings are split into 16 directional slices.
    RingSlice,
    /// Every remaining layer in one job.
    ChunkVolume,
}

impl std::str::FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "column" => Ok(ScanMode::Column),
            "ring_slice" | "slice" => Ok(ScanMode::RingSlice),
            "chunk_volume" | "chunk" => Ok(ScanMode::ChunkVolume),
            _ => Err(format!("unknown scan mode '{s}'")),
        }
    }
}

/// Box handed to the shape predicate when scanning a slice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeScope {
    #[default]
    Partition,
    /// The slice stripe, widened for shell shapes.
    Slice,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollapseConfig {
    /// Requested worker count; 0 picks every core but one.
    #[serde(default)]
    pub workers: usize,
    #[serde(default = "default_active_tasks")]
    pub active_tasks_per_step: usize,
    #[serde(default = "default_layers_per_job")]
    pub layers_per_job: u32,
    #[serde(default)]
    pub scan_mode: ScanMode,
    #[serde(default = "default_true")]
    pub from_bottom: bool,
    #[serde(default)]
    pub fill_shape: FillShape,
    #[serde(default = "default_thickness")]
    pub thickness: i32,
    #[serde(default)]
    pub slice_shape_scope: ShapeScope,
    #[serde(default)]
    pub drop_items: bool,
    #[serde(default = "default_true")]
    pub drain_fluids: bool,
    #[serde(default)]
    pub allow_boundary_bypass: bool,
    #[serde(default = "default_true")]
    pub finish_columns_first: bool,
}

fn default_active_tasks() -> usize {
    8
}
fn default_layers_per_job() -> u32 {
    4
}
fn default_thickness() -> i32 {
    1
}
fn default_true() -> bool {
    true
}

impl Default for CollapseConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            active_tasks_per_step: default_active_tasks(),
            layers_per_job: default_layers_per_job(),
            scan_mode: ScanMode::default(),
            from_bottom: true,
            fill_shape: FillShape::default(),
            thickness: default_thickness(),
            slice_shape_scope: ShapeScope::default(),
            drop_items: false,
            drain_fluids: true,
            allow_boundary_bypass: false,
            finish_columns_first: true,
        }
    }
}

impl CollapseConfig {
    #[inline]
    pub fn slice_mode(&self) -> bool {
        self.scan_mode == ScanMode::RingSlice
    }
}

pub fn load_config_from_path(path: &Path) -> Result<CollapseConfig, Box<dyn std::error::Error>> {
    let s = std::fs::read_to_string(path)?;
    let cfg: CollapseConfig = toml::from_str(&s)?;
    Ok(cfg)
}
