//! Short-term buffer — the bounded working set feeding consolidation.
//!
//! The buffer tracks handles (id + admission time) into the store
//! rather than owning record copies; the store stays the single source
//! of truth. At capacity, the entry with the lowest retention score is
//! evicted from the working set — the record itself stays in storage,
//! unconsolidated, where decay will eventually reclaim it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::BufferConfig;
use crate::memory::MemoryRecord;
use crate::storage::MemoryStore;
use crate::types::MemoryId;

/// One working-set entry.
#[derive(Debug, Clone)]
pub struct BufferEntry {
    /// The buffered record's id.
    pub id: MemoryId,
    /// When the record was admitted to the buffer.
    pub admitted_at: DateTime<Utc>,
}

/// Buffer occupancy statistics.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BufferStats {
    /// Current number of entries.
    pub size: usize,
    /// Configured capacity.
    pub capacity: usize,
    /// `size / capacity`.
    pub utilization: f32,
    /// Mean importance of buffered records (0 when empty).
    pub avg_importance: f32,
    /// Age in seconds of the oldest entry (0 when empty).
    pub oldest_age_secs: i64,
}

/// Bounded, insertion-ordered working set of recent memories.
#[derive(Debug)]
pub struct ShortTermBuffer {
    config: BufferConfig,
    entries: Vec<BufferEntry>,
}

impl ShortTermBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new(config: BufferConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
        }
    }

    /// Retention score blending effective importance, admission
    /// recency, and access frequency.
    #[must_use]
    pub fn retention_score(
        record: &MemoryRecord,
        admitted_at: DateTime<Utc>,
        now: DateTime<Utc>,
        window_secs: u64,
    ) -> f32 {
        let age_secs = (now - admitted_at).num_seconds().max(0) as f32;
        let window = window_secs.max(1) as f32;
        let recency = (-age_secs / window).exp();
        let frequency = (record.metadata.access_count as f32 / 10.0).min(1.0);
        0.5 * record.effective_importance() + 0.3 * recency + 0.2 * frequency
    }

    /// Admit a record to the working set.
    ///
    /// At capacity, the entry with the lowest retention score is evicted
    /// first and its id returned; the evicted record remains in storage.
    /// Re-admitting a buffered id refreshes its admission time instead.
    pub fn admit(
        &mut self,
        record: &MemoryRecord,
        store: &MemoryStore,
        now: DateTime<Utc>,
    ) -> Option<MemoryId> {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == record.id) {
            entry.admitted_at = now;
            return None;
        }

        let mut evicted = None;
        if self.entries.len() >= self.config.capacity {
            let weakest = self
                .entries
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    let score_a = self.score_of(a, store, now);
                    let score_b = self.score_of(b, store, now);
                    score_a
                        .partial_cmp(&score_b)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(i, _)| i);
            if let Some(index) = weakest {
                let entry = self.entries.remove(index);
                debug!(id = %entry.id, "buffer evicted weakest entry");
                evicted = Some(entry.id);
            }
        }

        self.entries.push(BufferEntry {
            id: record.id.clone(),
            admitted_at: now,
        });
        evicted
    }

    fn score_of(&self, entry: &BufferEntry, store: &MemoryStore, now: DateTime<Utc>) -> f32 {
        store
            .get(&entry.id)
            .map_or(0.0, |record| {
                Self::retention_score(record, entry.admitted_at, now, self.config.window_secs)
            })
    }

    /// Entries ready for consolidation: admitted longer ago than the
    /// window, **or** important enough to skip the wait.
    #[must_use]
    pub fn ready_for_consolidation(
        &self,
        store: &MemoryStore,
        now: DateTime<Utc>,
    ) -> Vec<MemoryId> {
        self.entries
            .iter()
            .filter(|entry| {
                let aged_out = (now - entry.admitted_at).num_seconds()
                    >= self.config.window_secs as i64;
                let important_enough = store.get(&entry.id).is_some_and(|record| {
                    record.metadata.importance >= self.config.auto_consolidate_threshold
                });
                aged_out || important_enough
            })
            .map(|entry| entry.id.clone())
            .collect()
    }

    /// Apply decay to every buffered record. Returns the number touched.
    pub fn apply_decay(&self, store: &mut MemoryStore, rate: f32) -> usize {
        let mut touched = 0;
        for entry in &self.entries {
            if let Some(record) = store.get_mut(&entry.id) {
                record.apply_decay(rate);
                touched += 1;
            }
        }
        touched
    }

    /// Remove an entry from the working set. Returns whether it existed.
    pub fn remove(&mut self, id: &MemoryId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| &entry.id != id);
        self.entries.len() < before
    }

    /// Whether an id is buffered.
    #[must_use]
    pub fn contains(&self, id: &MemoryId) -> bool {
        self.entries.iter().any(|entry| &entry.id == id)
    }

    /// Buffered ids in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<MemoryId> {
        self.entries.iter().map(|entry| entry.id.clone()).collect()
    }

    /// Current entry count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the working set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Occupancy statistics.
    #[must_use]
    pub fn stats(&self, store: &MemoryStore, now: DateTime<Utc>) -> BufferStats {
        let size = self.entries.len();
        let importance_sum: f32 = self
            .entries
            .iter()
            .filter_map(|entry| store.get(&entry.id))
            .map(|record| record.metadata.importance)
            .sum();
        let oldest_age_secs = self
            .entries
            .iter()
            .map(|entry| (now - entry.admitted_at).num_seconds())
            .max()
            .unwrap_or(0);

        BufferStats {
            size,
            capacity: self.config.capacity,
            utilization: size as f32 / self.config.capacity.max(1) as f32,
            avg_importance: if size == 0 {
                0.0
            } else {
                importance_sum / size as f32
            },
            oldest_age_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
