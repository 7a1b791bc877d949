use std::sync::Arc;

use collapse_geom::ChunkCoord;

use crate::bypass::{BypassGuard, BypassRegistry};
use crate::stats::{SessionStats, SessionStatsSnapshot};

/// Explicit access context handed to every worker job and to the store
/// that enforces the world boundary.
///
/// The bypass registry is usually shared process-wide across sessions; the
/// stats belong to one session.
#[derive(Clone)]
pub struct ChunkAccessContext {
    label: Arc<str>,
    registry: Arc<BypassRegistry>,
    stats: Arc<SessionStats>,
}

impl ChunkAccessContext {
    pub fn new(label: &str) -> Self {
        Self::with_registry(label, Arc::new(BypassRegistry::new()))
    }

    /// A fresh session that shares an existing bypass registry.
    pub fn with_registry(label: &str, registry: Arc<BypassRegistry>) -> Self {
        log::info!(target: "collapse", "session '{}' started", label);
        Self {
            label: Arc::from(label),
            registry,
            stats: Arc::new(SessionStats::new()),
        }
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn registry(&self) -> &Arc<BypassRegistry> {
        &self.registry
    }

    #[inline]
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    #[inline]
    pub fn bypass(&self, coord: ChunkCoord) -> BypassGuard<'_> {
        self.registry.acquire(coord)
    }

    #[inline]
    pub fn is_bypassing(&self, coord: ChunkCoord) -> bool {
        self.registry.is_bypassing(coord)
    }

    #[inline]
    pub fn bypass_count(&self, coord: ChunkCoord) -> usize {
        self.registry.bypass_count(coord)
    }

    /// Flushes the session summary to the log and returns it.
    pub fn finish_session(&self) -> SessionStatsSnapshot {
        let s = self.stats.snapshot();
        log::info!(
            target: "collapse",
            "session '{}' done: columns={} cleared={} drained={} missing={} rejected={} faults={} inline={} peak_scans={}",
            self.label,
            s.columns_processed,
            s.blocks_cleared,
            s.fluids_drained,
            s.missing_partitions,
            s.boundary_rejections,
            s.scan_faults,
            s.inline_fallbacks,
            s.peak_concurrent_scans
        );
        s
    }
}
