//! Inverted indexes over the record collection.
//!
//! Four independent sibling structures composed behind [`IndexSet`]:
//! entity → ids, tag → ids (case-folded), kind → ids, and calendar-day
//! → ids. Each supports `add`/`remove`/`query`/`clear`/`stats`; the
//! entity index adds AND composition, the tag index adds OR.
//!
//! Invariant held by all four: a key with no remaining ids is deleted,
//! so every surviving entry set is non-empty.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::memory::MemoryRecord;
use crate::types::{EntityRef, MemoryId, MemoryKind};

/// Size statistics for one index.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IndexStats {
    /// Number of distinct keys.
    pub keys: usize,
    /// Total id entries across all keys.
    pub entries: usize,
}

// ---------------------------------------------------------------------------
// Entity index
// ---------------------------------------------------------------------------

/// Entity → memory-id index. Entities are matched exactly.
#[derive(Debug, Default)]
pub struct EntityIndex {
    map: HashMap<EntityRef, HashSet<MemoryId>>,
}

impl EntityIndex {
    /// Index a record under each of its entity references.
    pub fn add(&mut self, record: &MemoryRecord) {
        for entity in &record.metadata.entity_refs {
            self.map
                .entry(entity.clone())
                .or_default()
                .insert(record.id.clone());
        }
    }

    /// Remove a record id from every entity it was indexed under.
    pub fn remove(&mut self, id: &MemoryId) {
        self.map.retain(|_, ids| {
            ids.remove(id);
            !ids.is_empty()
        });
    }

    /// Ids of records mentioning `entity`.
    #[must_use]
    pub fn query(&self, entity: &EntityRef) -> Vec<MemoryId> {
        self.map
            .get(entity)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Ids of records mentioning **all** of `entities` (intersection).
    #[must_use]
    pub fn query_all(&self, entities: &[EntityRef]) -> Vec<MemoryId> {
        let mut iter = entities.iter();
        let Some(first) = iter.next() else {
            return Vec::new();
        };
        let Some(mut acc) = self.map.get(first).cloned() else {
            return Vec::new();
        };
        for entity in iter {
            match self.map.get(entity) {
                Some(ids) => acc.retain(|id| ids.contains(id)),
                None => return Vec::new(),
            }
            if acc.is_empty() {
                return Vec::new();
            }
        }
        acc.into_iter().collect()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Key/entry counts.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            keys: self.map.len(),
            entries: self.map.values().map(HashSet::len).sum(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tag index
// ---------------------------------------------------------------------------

/// Tag → memory-id index. Keys are case-folded so `Work` and `work`
/// share a bucket.
#[derive(Debug, Default)]
pub struct TagIndex {
    map: HashMap<String, HashSet<MemoryId>>,
}

impl TagIndex {
    /// Index a record under each of its (folded) tags.
    pub fn add(&mut self, record: &MemoryRecord) {
        for tag in &record.metadata.tags {
            self.map
                .entry(tag.to_lowercase())
                .or_default()
                .insert(record.id.clone());
        }
    }

    /// Remove a record id from every tag it was indexed under.
    pub fn remove(&mut self, id: &MemoryId) {
        self.map.retain(|_, ids| {
            ids.remove(id);
            !ids.is_empty()
        });
    }

    /// Ids of records carrying `tag` (case-insensitive).
    #[must_use]
    pub fn query(&self, tag: &str) -> Vec<MemoryId> {
        self.map
            .get(&tag.to_lowercase())
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Ids of records carrying **any** of `tags` (union).
    #[must_use]
    pub fn query_any(&self, tags: &[String]) -> Vec<MemoryId> {
        let mut acc: HashSet<MemoryId> = HashSet::new();
        for tag in tags {
            if let Some(ids) = self.map.get(&tag.to_lowercase()) {
                acc.extend(ids.iter().cloned());
            }
        }
        acc.into_iter().collect()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Key/entry counts.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            keys: self.map.len(),
            entries: self.map.values().map(HashSet::len).sum(),
        }
    }
}

// ---------------------------------------------------------------------------
// Kind index
// ---------------------------------------------------------------------------

/// Kind → memory-id index. Cardinality is four, so removal is a plain
/// scan of one bucket.
#[derive(Debug, Default)]
pub struct KindIndex {
    map: HashMap<MemoryKind, Vec<MemoryId>>,
}

impl KindIndex {
    /// Index a record under its kind.
    pub fn add(&mut self, record: &MemoryRecord) {
        self.map
            .entry(record.kind())
            .or_default()
            .push(record.id.clone());
    }

    /// Remove a record id from whichever bucket holds it.
    pub fn remove(&mut self, id: &MemoryId) {
        self.map.retain(|_, ids| {
            ids.retain(|existing| existing != id);
            !ids.is_empty()
        });
    }

    /// Ids of records of `kind`.
    #[must_use]
    pub fn query(&self, kind: MemoryKind) -> Vec<MemoryId> {
        self.map.get(&kind).cloned().unwrap_or_default()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Key/entry counts.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            keys: self.map.len(),
            entries: self.map.values().map(Vec::len).sum(),
        }
    }
}

// ---------------------------------------------------------------------------
// Temporal index
// ---------------------------------------------------------------------------

/// Calendar-day → memory-id index, keyed `YYYY-MM-DD` on `created_at`.
///
/// A `BTreeMap` keeps day buckets ordered so range and prefix queries
/// are simple key-range walks.
#[derive(Debug, Default)]
pub struct TemporalIndex {
    map: BTreeMap<String, HashSet<MemoryId>>,
}

/// Bucket key for a timestamp.
#[must_use]
pub fn day_bucket(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

impl TemporalIndex {
    /// Index a record under its creation day.
    pub fn add(&mut self, record: &MemoryRecord) {
        self.map
            .entry(day_bucket(record.metadata.created_at))
            .or_default()
            .insert(record.id.clone());
    }

    /// Remove a record id from its day bucket.
    pub fn remove(&mut self, id: &MemoryId) {
        self.map.retain(|_, ids| {
            ids.remove(id);
            !ids.is_empty()
        });
    }

    /// Ids created on the bucket day of `at`.
    #[must_use]
    pub fn query(&self, at: DateTime<Utc>) -> Vec<MemoryId> {
        self.map
            .get(&day_bucket(at))
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Ids created between `start` and `end`, both day buckets inclusive.
    #[must_use]
    pub fn query_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<MemoryId> {
        let (start_key, end_key) = (day_bucket(start), day_bucket(end));
        if start_key > end_key {
            return Vec::new();
        }
        self.map
            .range(start_key..=end_key)
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect()
    }

    /// Ids created within the last `days` days of `now`, inclusive.
    #[must_use]
    pub fn query_last_days(&self, days: i64, now: DateTime<Utc>) -> Vec<MemoryId> {
        self.query_range(now - Duration::days(days), now)
    }

    /// Ids created within a month, given a `YYYY-MM` prefix.
    #[must_use]
    pub fn query_month(&self, month_prefix: &str) -> Vec<MemoryId> {
        self.map
            .range(month_prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(month_prefix))
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Key/entry counts.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            keys: self.map.len(),
            entries: self.map.values().map(HashSet::len).sum(),
        }
    }
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

/// The four indexes composed behind one facade, kept in lockstep by the
/// storage layer: every stored record is added to all four, every
/// deleted record removed from all four.
#[derive(Debug, Default)]
pub struct IndexSet {
    /// Entity → ids.
    pub entities: EntityIndex,
    /// Tag → ids.
    pub tags: TagIndex,
    /// Kind → ids.
    pub kinds: KindIndex,
    /// Day → ids.
    pub temporal: TemporalIndex,
}

/// Combined statistics over the four indexes.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IndexSetStats {
    /// Entity index sizes.
    pub entities: IndexStats,
    /// Tag index sizes.
    pub tags: IndexStats,
    /// Kind index sizes.
    pub kinds: IndexStats,
    /// Temporal index sizes.
    pub temporal: IndexStats,
}

impl IndexSet {
    /// Add a record to all four indexes.
    pub fn add(&mut self, record: &MemoryRecord) {
        self.entities.add(record);
        self.tags.add(record);
        self.kinds.add(record);
        self.temporal.add(record);
    }

    /// Remove a record id from all four indexes.
    pub fn remove(&mut self, id: &MemoryId) {
        self.entities.remove(id);
        self.tags.remove(id);
        self.kinds.remove(id);
        self.temporal.remove(id);
    }

    /// Re-index a record whose tags/entities may have changed.
    pub fn refresh(&mut self, record: &MemoryRecord) {
        self.remove(&record.id);
        self.add(record);
    }

    /// Drop everything from all four indexes.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.tags.clear();
        self.kinds.clear();
        self.temporal.clear();
    }

    /// Combined statistics.
    #[must_use]
    pub fn stats(&self) -> IndexSetStats {
        IndexSetStats {
            entities: self.entities.stats(),
            tags: self.tags.stats(),
            kinds: self.kinds.stats(),
            temporal: self.temporal.stats(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{EpisodicContent, MemoryContent};
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("timestamp")
    }

    fn record(id: &str, entities: &[&str], tags: &[&str], created: i64) -> MemoryRecord {
        MemoryRecord::new_at(
            MemoryId::from(id),
            MemoryContent::Episodic(
                EpisodicContent::new(
                    "event",
                    entities.iter().map(|e| EntityRef::from(*e)).collect(),
                    ts(created),
                )
                .with_topics(tags.iter().copied()),
            ),
            ts(created),
        )
    }

    #[test]
    fn entity_intersection_requires_all() {
        let mut index = EntityIndex::default();
        index.add(&record("m1", &["john", "jane"], &[], 0));
        index.add(&record("m2", &["john"], &[], 0));

        let both = index.query_all(&[EntityRef::from("john"), EntityRef::from("jane")]);
        assert_eq!(both, vec![MemoryId::from("m1")]);

        let john = index.query(&EntityRef::from("john"));
        assert_eq!(john.len(), 2);
    }

    #[test]
    fn tag_keys_are_case_folded() {
        let mut index = TagIndex::default();
        index.add(&record("m1", &["x"], &["Work"], 0));

        assert_eq!(index.query("work").len(), 1);
        assert_eq!(index.query("WORK").len(), 1);
        assert_eq!(index.stats().keys, 1);
    }

    #[test]
    fn tag_union_collects_any_match() {
        let mut index = TagIndex::default();
        index.add(&record("m1", &["x"], &["work"], 0));
        index.add(&record("m2", &["x"], &["travel"], 0));
        index.add(&record("m3", &["x"], &["cooking"], 0));

        let any = index.query_any(&["work".to_string(), "travel".to_string()]);
        assert_eq!(any.len(), 2);
    }

    #[test]
    fn removing_last_id_deletes_the_key() {
        let mut index = TagIndex::default();
        index.add(&record("m1", &["x"], &["solo"], 0));
        assert_eq!(index.stats().keys, 1);

        index.remove(&MemoryId::from("m1"));
        assert_eq!(index.stats().keys, 0);
        assert!(index.query("solo").is_empty());
    }

    #[test]
    fn temporal_range_is_inclusive_of_both_ends() {
        let day = 86_400;
        let mut index = TemporalIndex::default();
        index.add(&record("d0", &["x"], &[], 0));
        index.add(&record("d1", &["x"], &[], day));
        index.add(&record("d2", &["x"], &[], 2 * day));
        index.add(&record("d3", &["x"], &[], 3 * day));

        let ids = index.query_range(ts(0), ts(2 * day));
        assert_eq!(ids.len(), 3);
        assert!(!ids.contains(&MemoryId::from("d3")));
    }

    #[test]
    fn temporal_month_prefix_scan() {
        let mut index = TemporalIndex::default();
        // 2026-08-05 and 2026-09-01
        index.add(&record("aug", &["x"], &[], 1_786_300_000));
        index.add(&record("sep", &["x"], &[], 1_788_600_000));

        let aug = index.query_month("2026-08");
        assert_eq!(aug, vec![MemoryId::from("aug")]);
    }

    #[test]
    fn kind_index_buckets_by_kind() {
        let mut set = IndexSet::default();
        set.add(&record("m1", &["x"], &[], 0));
        assert_eq!(set.kinds.query(MemoryKind::Episodic).len(), 1);
        assert!(set.kinds.query(MemoryKind::Semantic).is_empty());

        set.remove(&MemoryId::from("m1"));
        assert!(set.kinds.query(MemoryKind::Episodic).is_empty());
        assert_eq!(set.stats().kinds.keys, 0);
    }
}
