use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Point-in-time copy of a session's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStatsSnapshot {
    pub columns_processed: u64,
    pub blocks_cleared: u64,
    pub fluids_drained: u64,
    pub missing_partitions: u64,
    pub boundary_rejections: u64,
    pub scan_faults: u64,
    pub inline_fallbacks: u64,
    pub peak_concurrent_scans: usize,
}

/// Observational counters for one collapse session. Safe to bump from any
/// thread; nothing reads them to make decisions.
#[derive(Default)]
pub struct SessionStats {
    columns_processed: AtomicU64,
    blocks_cleared: AtomicU64,
    fluids_drained: AtomicU64,
    missing_partitions: AtomicU64,
    boundary_rejections: AtomicU64,
    scan_faults: AtomicU64,
    inline_fallbacks: AtomicU64,
    active_scans: AtomicUsize,
    peak_scans: AtomicUsize,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_column_processed(&self) {
        self.columns_processed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_blocks_cleared(&self, n: u64) {
        self.blocks_cleared.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_fluids_drained(&self, n: u64) {
        self.fluids_drained.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_missing_partition(&self) {
        self.missing_partitions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_boundary_rejection(&self) {
        self.boundary_rejections.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_scan_fault(&self) {
        self.scan_faults.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_inline_fallback(&self) {
        self.inline_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Marks one scan as running until the returned scope drops.
    pub fn scan_scope(&self) -> ScanScope<'_> {
        let now = self.active_scans.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_scans.fetch_max(now, Ordering::AcqRel);
        ScanScope { stats: self }
    }

    pub fn active_scans(&self) -> usize {
        self.active_scans.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> SessionStatsSnapshot {
        SessionStatsSnapshot {
            columns_processed: self.columns_processed.load(Ordering::Relaxed),
            blocks_cleared: self.blocks_cleared.load(Ordering::Relaxed),
            fluids_drained: self.fluids_drained.load(Ordering::Relaxed),
            missing_partitions: self.missing_partitions.load(Ordering::Relaxed),
            boundary_rejections: self.boundary_rejections.load(Ordering::Relaxed),
            scan_faults: self.scan_faults.load(Ordering::Relaxed),
            inline_fallbacks: self.inline_fallbacks.load(Ordering::Relaxed),
            peak_concurrent_scans: self.peak_scans.load(Ordering::Relaxed),
        }
    }
}

pub struct ScanScope<'a> {
    stats: &'a SessionStats,
}

impl Drop for ScanScope<'_> {
    fn drop(&mut self) {
        self.stats.active_scans.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_scope_tracks_peak() {
        let stats = SessionStats::new();
        {
            let _a = stats.scan_scope();
            let _b = stats.scan_scope();
            assert_eq!(stats.active_scans(), 2);
        }
        let _c = stats.scan_scope();
        assert_eq!(stats.active_scans(), 1);
        assert_eq!(stats.snapshot().peak_concurrent_scans, 2);
    }

    #[test]
    fn counters_accumulate() {
        let stats = SessionStats::new();
        stats.record_blocks_cleared(40);
        stats.record_blocks_cleared(2);
        stats.record_column_processed();
        stats.record_missing_partition();
        let snap = stats.snapshot();
        assert_eq!(snap.blocks_cleared, 42);
        assert_eq!(snap.columns_processed, 1);
        assert_eq!(snap.missing_partitions, 1);
        assert_eq!(snap.scan_faults, 0);
    }
}
