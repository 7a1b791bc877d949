//! Shared access state for collapse workers: the partition bypass registry
//! and per-session diagnostics.
#![forbid(unsafe_code)]

mod bypass;
mod context;
mod stats;

pub use bypass::{BypassGuard, BypassRegistry};
pub use context::ChunkAccessContext;
pub use stats::{ScanScope, SessionStats, SessionStatsSnapshot};
