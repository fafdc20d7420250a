//! Runtime counters for the memory engine.
//!
//! Lightweight lock-free counters incremented on the hot paths and read
//! on dashboard export. The snapshot formats as Prometheus-compatible
//! text for hosts that scrape.

use std::sync::atomic::{AtomicU64, Ordering};

// ---------------------------------------------------------------------------
// Counters (lock-free)
// ---------------------------------------------------------------------------

/// Atomic counters for high-frequency engine events.
#[derive(Debug)]
pub struct EngineCounters {
    /// Records stored since startup.
    pub records_stored: AtomicU64,
    /// Records deleted since startup.
    pub records_deleted: AtomicU64,
    /// Retrieval calls served.
    pub retrievals_served: AtomicU64,
    /// Records promoted by consolidation.
    pub records_consolidated: AtomicU64,
    /// Semantic candidates merged into existing facts.
    pub records_integrated: AtomicU64,
    /// Associations formed.
    pub associations_formed: AtomicU64,
    /// Associations removed by pruning.
    pub associations_pruned: AtomicU64,
    /// Buffer evictions.
    pub buffer_evictions: AtomicU64,
    /// Patterns detected across all miner runs.
    pub patterns_detected: AtomicU64,
    /// Decay passes completed.
    pub decay_passes: AtomicU64,
    /// Import entries skipped as malformed or invalid.
    pub import_entries_skipped: AtomicU64,
}

impl EngineCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records_stored: AtomicU64::new(0),
            records_deleted: AtomicU64::new(0),
            retrievals_served: AtomicU64::new(0),
            records_consolidated: AtomicU64::new(0),
            records_integrated: AtomicU64::new(0),
            associations_formed: AtomicU64::new(0),
            associations_pruned: AtomicU64::new(0),
            buffer_evictions: AtomicU64::new(0),
            patterns_detected: AtomicU64::new(0),
            decay_passes: AtomicU64::new(0),
            import_entries_skipped: AtomicU64::new(0),
        }
    }

    /// Bump a counter by `n`.
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            records_stored: self.records_stored.load(Ordering::Relaxed),
            records_deleted: self.records_deleted.load(Ordering::Relaxed),
            retrievals_served: self.retrievals_served.load(Ordering::Relaxed),
            records_consolidated: self.records_consolidated.load(Ordering::Relaxed),
            records_integrated: self.records_integrated.load(Ordering::Relaxed),
            associations_formed: self.associations_formed.load(Ordering::Relaxed),
            associations_pruned: self.associations_pruned.load(Ordering::Relaxed),
            buffer_evictions: self.buffer_evictions.load(Ordering::Relaxed),
            patterns_detected: self.patterns_detected.load(Ordering::Relaxed),
            decay_passes: self.decay_passes.load(Ordering::Relaxed),
            import_entries_skipped: self.import_entries_skipped.load(Ordering::Relaxed),
        }
    }
}

impl Default for EngineCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of counter values at a point in time.
#[derive(Debug, Clone, Copy)]
pub struct CounterSnapshot {
    /// Records stored.
    pub records_stored: u64,
    /// Records deleted.
    pub records_deleted: u64,
    /// Retrieval calls served.
    pub retrievals_served: u64,
    /// Records consolidated.
    pub records_consolidated: u64,
    /// Records integrated via merge.
    pub records_integrated: u64,
    /// Associations formed.
    pub associations_formed: u64,
    /// Associations pruned.
    pub associations_pruned: u64,
    /// Buffer evictions.
    pub buffer_evictions: u64,
    /// Patterns detected.
    pub patterns_detected: u64,
    /// Decay passes completed.
    pub decay_passes: u64,
    /// Import entries skipped.
    pub import_entries_skipped: u64,
}

impl CounterSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let fields: [(&str, &str, u64); 11] = [
            ("records_stored", "Records stored", self.records_stored),
            ("records_deleted", "Records deleted", self.records_deleted),
            ("retrievals_served", "Retrieval calls served", self.retrievals_served),
            (
                "records_consolidated",
                "Records promoted by consolidation",
                self.records_consolidated,
            ),
            (
                "records_integrated",
                "Semantic facts merged during consolidation",
                self.records_integrated,
            ),
            ("associations_formed", "Associations formed", self.associations_formed),
            ("associations_pruned", "Associations pruned", self.associations_pruned),
            ("buffer_evictions", "Short-term buffer evictions", self.buffer_evictions),
            ("patterns_detected", "Patterns detected", self.patterns_detected),
            ("decay_passes", "Decay passes completed", self.decay_passes),
            (
                "import_entries_skipped",
                "Import entries skipped as invalid",
                self.import_entries_skipped,
            ),
        ];

        let mut out = String::new();
        for (name, help, value) in fields {
            out.push_str(&format!(
                "# HELP engram_{name}_total {help}\n\
                 # TYPE engram_{name}_total counter\n\
                 engram_{name}_total {value}\n"
            ));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
