//! In-memory record storage — the arena behind the storage contract.
//!
//! [`MemoryStore`] owns the canonical copy of every record, keeps the
//! four inverted indexes and the vector index in lockstep, and answers
//! filtered queries. It is a single-writer structure: callers serialize
//! access externally (the service facade owns the lock).
//!
//! Bulk export is a JSON array of serialized records; import is
//! per-entry fault tolerant. A compact bincode variant exists for
//! hosts that snapshot large stores.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EmbeddingConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{EngramError, Result};
use crate::index::{IndexSet, IndexSetStats};
use crate::memory::{MemoryContent, MemoryRecord};
use crate::types::{EntityRef, MemoryId, MemoryKind};
use crate::vector::{VectorHit, VectorIndex};

/// Unconsolidated records whose decay factor falls below this are
/// dropped by [`MemoryStore::optimize`].
pub const OPTIMIZE_DECAY_FLOOR: f32 = 0.01;

// ---------------------------------------------------------------------------
// Query filter
// ---------------------------------------------------------------------------

/// Sort key for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Order by creation time.
    #[default]
    CreatedAt,
    /// Order by last access time.
    LastAccessedAt,
    /// Order by importance.
    Importance,
    /// Order by confidence.
    Confidence,
}

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Largest / newest first.
    #[default]
    Descending,
    /// Smallest / oldest first.
    Ascending,
}

/// Filter for [`MemoryStore::query`].
///
/// Fields combine conjunctively; the tag and entity lists are each
/// any-match (disjunctive) within themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryQuery {
    /// Restrict to one kind.
    pub kind: Option<MemoryKind>,
    /// Match records carrying any of these tags (case-insensitive).
    #[serde(default)]
    pub tags: Vec<String>,
    /// Match records mentioning any of these entities.
    #[serde(default)]
    pub entities: Vec<EntityRef>,
    /// Only records created at or after this instant.
    pub created_after: Option<DateTime<Utc>>,
    /// Only records created at or before this instant.
    pub created_before: Option<DateTime<Utc>>,
    /// Minimum importance.
    pub min_importance: Option<f32>,
    /// Minimum confidence.
    pub min_confidence: Option<f32>,
    /// Only consolidated records.
    #[serde(default)]
    pub consolidated_only: bool,
    /// Sort key.
    #[serde(default)]
    pub sort_by: SortKey,
    /// Sort direction.
    #[serde(default)]
    pub direction: SortDirection,
    /// Maximum number of results (after offset).
    pub limit: Option<usize>,
    /// Results to skip from the front of the sorted list.
    #[serde(default)]
    pub offset: usize,
}

impl MemoryQuery {
    /// Restrict to one kind.
    #[must_use]
    pub fn with_kind(mut self, kind: MemoryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Add an any-match tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add an any-match entity.
    #[must_use]
    pub fn with_entity(mut self, entity: EntityRef) -> Self {
        self.entities.push(entity);
        self
    }

    /// Restrict to a creation-time range (inclusive).
    #[must_use]
    pub fn with_created_between(mut self, after: DateTime<Utc>, before: DateTime<Utc>) -> Self {
        self.created_after = Some(after);
        self.created_before = Some(before);
        self
    }

    /// Set a minimum importance.
    #[must_use]
    pub fn with_min_importance(mut self, min: f32) -> Self {
        self.min_importance = Some(min);
        self
    }

    /// Set the sort key and direction.
    #[must_use]
    pub fn sorted_by(mut self, key: SortKey, direction: SortDirection) -> Self {
        self.sort_by = key;
        self.direction = direction;
        self
    }

    /// Cap the number of results.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a record passes every filter field.
    #[must_use]
    pub fn matches(&self, record: &MemoryRecord) -> bool {
        if let Some(kind) = self.kind {
            if record.kind() != kind {
                return false;
            }
        }
        if !self.tags.is_empty() {
            let any = self.tags.iter().any(|wanted| {
                record
                    .metadata
                    .tags
                    .iter()
                    .any(|tag| tag.eq_ignore_ascii_case(wanted))
            });
            if !any {
                return false;
            }
        }
        if !self.entities.is_empty() {
            let any = self
                .entities
                .iter()
                .any(|wanted| record.metadata.entity_refs.contains(wanted));
            if !any {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if record.metadata.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if record.metadata.created_at > before {
                return false;
            }
        }
        if let Some(min) = self.min_importance {
            if record.metadata.importance < min {
                return false;
            }
        }
        if let Some(min) = self.min_confidence {
            if record.metadata.confidence < min {
                return false;
            }
        }
        if self.consolidated_only && !record.is_consolidated {
            return false;
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Compact binary mirror
// ---------------------------------------------------------------------------

/// Binary-friendly mirror of [`MemoryRecord`]: identical fields, but
/// the content enum nests under its own key instead of flattening into
/// the record, which keeps the encoding expressible in non-self-
/// describing formats.
#[derive(Serialize, Deserialize)]
struct CompactRecord {
    id: MemoryId,
    content: MemoryContent,
    privacy: crate::types::PrivacyLevel,
    metadata: crate::memory::MemoryMetadata,
    version: u32,
    revisions: Vec<crate::memory::Revision>,
    is_consolidated: bool,
    decay_factor: f32,
}

impl From<&MemoryRecord> for CompactRecord {
    fn from(record: &MemoryRecord) -> Self {
        Self {
            id: record.id.clone(),
            content: record.content.clone(),
            privacy: record.privacy,
            metadata: record.metadata.clone(),
            version: record.version,
            revisions: record.revisions.clone(),
            is_consolidated: record.is_consolidated,
            decay_factor: record.decay_factor,
        }
    }
}

impl From<CompactRecord> for MemoryRecord {
    fn from(compact: CompactRecord) -> Self {
        Self {
            id: compact.id,
            content: compact.content,
            privacy: compact.privacy,
            metadata: compact.metadata,
            version: compact.version,
            revisions: compact.revisions,
            is_consolidated: compact.is_consolidated,
            decay_factor: compact.decay_factor,
        }
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Aggregate statistics over the store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    /// Total record count.
    pub total: usize,
    /// Record count per kind, keyed by the kind tag.
    pub by_kind: HashMap<String, usize>,
    /// Consolidated record count.
    pub consolidated: usize,
    /// Mean importance over all records (0 when empty).
    pub avg_importance: f32,
    /// Mean confidence over all records (0 when empty).
    pub avg_confidence: f32,
    /// Index sizes.
    pub indexes: IndexSetStats,
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// The canonical in-memory record store.
pub struct MemoryStore {
    records: HashMap<MemoryId, MemoryRecord>,
    indexes: IndexSet,
    vector: VectorIndex,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("records", &self.records.len())
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Create an empty store with the fallback embedding provider.
    #[must_use]
    pub fn new(embedding: &EmbeddingConfig) -> Self {
        Self {
            records: HashMap::new(),
            indexes: IndexSet::default(),
            vector: VectorIndex::new(embedding),
        }
    }

    /// Create an empty store with an injected embedding provider.
    #[must_use]
    pub fn with_embedding_provider(
        embedding: &EmbeddingConfig,
        provider: Box<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            records: HashMap::new(),
            indexes: IndexSet::default(),
            vector: VectorIndex::with_provider(embedding, provider),
        }
    }

    // -- writes -------------------------------------------------------------

    /// Validate and store a record, updating every index.
    ///
    /// Storing an id that already exists replaces the previous record
    /// (the caller-assigned id is the identity).
    ///
    /// # Errors
    /// Returns [`EngramError::Validation`] without mutating anything if
    /// the record fails its kind-specific checks.
    pub fn store(&mut self, record: MemoryRecord) -> Result<()> {
        record.validate()?;

        if self.records.contains_key(&record.id) {
            debug!(id = %record.id, "replacing existing record");
            self.indexes.remove(&record.id);
            self.vector.remove(&record.id);
        }

        self.indexes.add(&record);
        if let Err(error) = self.vector.index_record(&record) {
            // Similarity search degrades; the record is still stored.
            warn!(id = %record.id, %error, "failed to embed record");
        }
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Store a batch. All records are validated up front; nothing is
    /// written unless every record passes.
    ///
    /// # Errors
    /// Returns the first validation failure.
    pub fn bulk_store(&mut self, records: Vec<MemoryRecord>) -> Result<usize> {
        for record in &records {
            record.validate()?;
        }
        let count = records.len();
        for record in records {
            self.store(record)?;
        }
        Ok(count)
    }

    /// Replace a record's content through the versioning path.
    ///
    /// # Errors
    /// [`EngramError::NotFound`] for an unknown id; validation errors
    /// leave the record untouched.
    pub fn update(
        &mut self,
        id: &MemoryId,
        content: MemoryContent,
        change_description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| EngramError::NotFound(id.clone()))?;
        record.update_content(content, change_description, now)?;
        let refreshed = record.clone();
        self.indexes.refresh(&refreshed);
        self.vector.remove(id);
        if let Err(error) = self.vector.index_record(&refreshed) {
            warn!(id = %id, %error, "failed to re-embed updated record");
        }
        Ok(())
    }

    /// Delete a record, cascading to every index.
    ///
    /// # Errors
    /// [`EngramError::NotFound`] for an unknown id.
    pub fn delete(&mut self, id: &MemoryId) -> Result<MemoryRecord> {
        let record = self
            .records
            .remove(id)
            .ok_or_else(|| EngramError::NotFound(id.clone()))?;
        self.indexes.remove(id);
        self.vector.remove(id);
        Ok(record)
    }

    /// Delete a batch, ignoring unknown ids. Returns the deleted count.
    pub fn bulk_delete(&mut self, ids: &[MemoryId]) -> usize {
        ids.iter().filter(|id| self.delete(id).is_ok()).count()
    }

    /// Drop every record and index entry.
    pub fn clear(&mut self) {
        self.records.clear();
        self.indexes.clear();
        self.vector.clear();
    }

    /// Drop unconsolidated records that have decayed to irrelevance
    /// (`decay_factor < 0.01`). Returns the number removed.
    pub fn optimize(&mut self) -> usize {
        let doomed: Vec<MemoryId> = self
            .records
            .values()
            .filter(|r| !r.is_consolidated && r.decay_factor < OPTIMIZE_DECAY_FLOOR)
            .map(|r| r.id.clone())
            .collect();
        for id in &doomed {
            self.indexes.remove(id);
            self.vector.remove(id);
            self.records.remove(id);
        }
        if !doomed.is_empty() {
            debug!(removed = doomed.len(), "optimize dropped decayed records");
        }
        doomed.len()
    }

    /// Apply decay to every record. Returns the number touched.
    pub fn apply_decay_all(&mut self, rate: f32) -> usize {
        for record in self.records.values_mut() {
            record.apply_decay(rate);
        }
        self.records.len()
    }

    // -- reads --------------------------------------------------------------

    /// Fetch a record, bumping its access count and last-accessed time.
    pub fn retrieve(&mut self, id: &MemoryId, now: DateTime<Utc>) -> Option<MemoryRecord> {
        let record = self.records.get_mut(id)?;
        record.record_access(now);
        Some(record.clone())
    }

    /// Peek at a record without touching access statistics.
    #[must_use]
    pub fn get(&self, id: &MemoryId) -> Option<&MemoryRecord> {
        self.records.get(id)
    }

    /// Mutable access for engine-internal field updates (importance,
    /// consolidation flag). Callers changing tags or entities must go
    /// through [`MemoryStore::update`] so indexes stay consistent.
    pub(crate) fn get_mut(&mut self, id: &MemoryId) -> Option<&mut MemoryRecord> {
        self.records.get_mut(id)
    }

    /// Re-embed a record after an in-place content mutation (merge path).
    pub(crate) fn refresh_vector(&mut self, id: &MemoryId) {
        let Some(record) = self.records.get(id).cloned() else {
            return;
        };
        self.vector.remove(id);
        if let Err(error) = self.vector.index_record(&record) {
            warn!(id = %id, %error, "failed to re-embed merged record");
        }
    }

    /// Whether a record exists.
    #[must_use]
    pub fn exists(&self, id: &MemoryId) -> bool {
        self.records.contains_key(id)
    }

    /// Total record count.
    #[must_use]
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Clones of every record, in arbitrary order.
    #[must_use]
    pub fn get_all(&self) -> Vec<MemoryRecord> {
        self.records.values().cloned().collect()
    }

    /// Iterate records in place.
    pub fn iter(&self) -> impl Iterator<Item = &MemoryRecord> {
        self.records.values()
    }

    /// Filtered, sorted, paged query.
    #[must_use]
    pub fn query(&self, query: &MemoryQuery) -> Vec<MemoryRecord> {
        let mut results: Vec<MemoryRecord> = self
            .records
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();

        results.sort_by(|a, b| {
            let ordering = match query.sort_by {
                SortKey::CreatedAt => a.metadata.created_at.cmp(&b.metadata.created_at),
                SortKey::LastAccessedAt => {
                    a.metadata.last_accessed_at.cmp(&b.metadata.last_accessed_at)
                }
                SortKey::Importance => a
                    .metadata
                    .importance
                    .partial_cmp(&b.metadata.importance)
                    .unwrap_or(std::cmp::Ordering::Equal),
                SortKey::Confidence => a
                    .metadata
                    .confidence
                    .partial_cmp(&b.metadata.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal),
            };
            match query.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });

        let end = query
            .limit
            .map_or(results.len(), |limit| {
                query.offset.saturating_add(limit).min(results.len())
            });
        let start = query.offset.min(results.len());
        results[start..end].to_vec()
    }

    // -- index-backed lookups ----------------------------------------------

    /// Records mentioning an entity.
    #[must_use]
    pub fn get_by_entity(&self, entity: &EntityRef) -> Vec<MemoryRecord> {
        self.resolve(self.indexes.entities.query(entity))
    }

    /// Records mentioning **all** given entities.
    #[must_use]
    pub fn get_by_entities_all(&self, entities: &[EntityRef]) -> Vec<MemoryRecord> {
        self.resolve(self.indexes.entities.query_all(entities))
    }

    /// Records carrying a tag (case-insensitive).
    #[must_use]
    pub fn get_by_tag(&self, tag: &str) -> Vec<MemoryRecord> {
        self.resolve(self.indexes.tags.query(tag))
    }

    /// Records carrying **any** of the given tags.
    #[must_use]
    pub fn get_by_tags_any(&self, tags: &[String]) -> Vec<MemoryRecord> {
        self.resolve(self.indexes.tags.query_any(tags))
    }

    /// Records of a kind.
    #[must_use]
    pub fn get_by_kind(&self, kind: MemoryKind) -> Vec<MemoryRecord> {
        self.resolve(self.indexes.kinds.query(kind))
    }

    /// Records created within the last `days` days.
    #[must_use]
    pub fn get_recent(&self, days: i64, now: DateTime<Utc>) -> Vec<MemoryRecord> {
        self.resolve(self.indexes.temporal.query_last_days(days, now))
    }

    /// Records created within a day range (inclusive day buckets).
    #[must_use]
    pub fn get_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<MemoryRecord> {
        self.resolve(self.indexes.temporal.query_range(start, end))
    }

    /// Records created in a month (`YYYY-MM`).
    #[must_use]
    pub fn get_by_month(&self, month_prefix: &str) -> Vec<MemoryRecord> {
        self.resolve(self.indexes.temporal.query_month(month_prefix))
    }

    fn resolve(&self, ids: Vec<MemoryId>) -> Vec<MemoryRecord> {
        ids.iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect()
    }

    // -- similarity ----------------------------------------------------------

    /// Top-k records most similar to a free-text query.
    ///
    /// # Errors
    /// Propagates embedding-provider failures.
    pub fn search_similar(&mut self, text: &str, k: usize) -> Result<Vec<VectorHit>> {
        self.vector.search_text(text, k)
    }

    /// Top-k records most similar to an existing record.
    #[must_use]
    pub fn find_similar(&self, id: &MemoryId, k: usize) -> Vec<VectorHit> {
        self.vector.find_similar(id, k)
    }

    /// Rebuild the approximate-search graph if the collection is large
    /// enough to warrant it.
    pub fn rebuild_vector_index(&mut self) {
        self.vector.build();
    }

    // -- serialization -------------------------------------------------------

    /// Export every record as a JSON array.
    ///
    /// # Errors
    /// Returns [`EngramError::Serialization`] on encoder failure.
    pub fn export_json(&self) -> Result<String> {
        let records: Vec<&MemoryRecord> = self.records.values().collect();
        serde_json::to_string(&records).map_err(|e| EngramError::Serialization(e.to_string()))
    }

    /// Import records from a JSON array produced by
    /// [`MemoryStore::export_json`].
    ///
    /// Individually malformed entries (bad structure, unknown kind,
    /// failed validation) are logged and skipped; the rest of the batch
    /// still lands. Returns the number of records imported.
    ///
    /// # Errors
    /// Only a top-level parse failure is fatal.
    pub fn import_json(&mut self, json: &str) -> Result<usize> {
        self.import_json_counted(json).map(|(imported, _)| imported)
    }

    /// Import with a skip count, for callers tracking metrics.
    ///
    /// # Errors
    /// Only a top-level parse failure is fatal.
    pub(crate) fn import_json_counted(&mut self, json: &str) -> Result<(usize, usize)> {
        let entries: Vec<serde_json::Value> =
            serde_json::from_str(json).map_err(|e| EngramError::Import(e.to_string()))?;

        let (mut imported, mut skipped) = (0, 0);
        for (position, entry) in entries.into_iter().enumerate() {
            let record = match MemoryRecord::from_json(entry) {
                Ok(record) => record,
                Err(error) => {
                    warn!(position, %error, "skipping unparseable import entry");
                    skipped += 1;
                    continue;
                }
            };
            match self.store(record) {
                Ok(()) => imported += 1,
                Err(error) => {
                    warn!(position, %error, "skipping invalid import entry");
                    skipped += 1;
                }
            }
        }
        Ok((imported, skipped))
    }

    /// Export every record in the compact binary format.
    ///
    /// The canonical JSON shape carries the kind tag beside the content
    /// (a flattened encoding bincode cannot express), so the binary
    /// path goes through a plain nested mirror of the record.
    ///
    /// # Errors
    /// Returns [`EngramError::Serialization`] on encoder failure.
    pub fn export_bytes(&self) -> Result<Vec<u8>> {
        let records: Vec<CompactRecord> =
            self.records.values().map(CompactRecord::from).collect();
        bincode::serialize(&records).map_err(|e| EngramError::Serialization(e.to_string()))
    }

    /// Import records from the compact binary format. Binary batches are
    /// all-or-nothing: a corrupt stream imports nothing.
    ///
    /// # Errors
    /// Returns [`EngramError::Import`] on decode failure.
    pub fn import_bytes(&mut self, bytes: &[u8]) -> Result<usize> {
        let records: Vec<CompactRecord> =
            bincode::deserialize(bytes).map_err(|e| EngramError::Import(e.to_string()))?;
        let mut imported = 0;
        for record in records {
            match self.store(record.into()) {
                Ok(()) => imported += 1,
                Err(error) => warn!(%error, "skipping invalid binary import entry"),
            }
        }
        Ok(imported)
    }

    // -- stats ----------------------------------------------------------------

    /// Aggregate statistics.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let total = self.records.len();
        let mut by_kind: HashMap<String, usize> = HashMap::new();
        let mut consolidated = 0;
        let mut importance_sum = 0.0_f32;
        let mut confidence_sum = 0.0_f32;

        for record in self.records.values() {
            *by_kind.entry(record.kind().as_str().to_string()).or_default() += 1;
            if record.is_consolidated {
                consolidated += 1;
            }
            importance_sum += record.metadata.importance;
            confidence_sum += record.metadata.confidence;
        }

        let denominator = if total == 0 { 1.0 } else { total as f32 };
        StoreStats {
            total,
            by_kind,
            consolidated,
            avg_importance: importance_sum / denominator,
            avg_confidence: confidence_sum / denominator,
            indexes: self.indexes.stats(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{EpisodicContent, SemanticContent};
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("timestamp")
    }

    fn store() -> MemoryStore {
        MemoryStore::new(&EmbeddingConfig::default())
    }

    fn episodic(id: &str, entities: &[&str], tags: &[&str], created: i64) -> MemoryRecord {
        MemoryRecord::new_at(
            MemoryId::from(id),
            MemoryContent::Episodic(
                EpisodicContent::new(
                    format!("event {id}"),
                    entities.iter().map(|e| EntityRef::from(*e)).collect(),
                    ts(created),
                )
                .with_topics(tags.iter().copied()),
            ),
            ts(created),
        )
    }

    #[test]
    fn store_and_retrieve_bumps_access() {
        let mut store = store();
        store.store(episodic("m1", &["john"], &["work"], 100)).expect("store");

        let first = store.retrieve(&MemoryId::from("m1"), ts(200)).expect("found");
        assert_eq!(first.metadata.access_count, 1);

        let second = store.retrieve(&MemoryId::from("m1"), ts(300)).expect("found");
        assert_eq!(second.metadata.access_count, 2);
        assert_eq!(second.metadata.last_accessed_at, ts(300));

        // peeking does not bump
        let peeked = store.get(&MemoryId::from("m1")).expect("found");
        assert_eq!(peeked.metadata.access_count, 2);
    }

    #[test]
    fn invalid_record_is_rejected_before_mutation() {
        let mut store = store();
        let invalid = episodic("bad", &[], &[], 0); // no participants
        assert!(store.store(invalid).is_err());
        assert_eq!(store.count(), 0);
        assert_eq!(store.stats().indexes.entities.keys, 0);
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let mut store = store();
        let err = store
            .update(
                &MemoryId::from("ghost"),
                MemoryContent::Episodic(EpisodicContent::new(
                    "x",
                    vec![EntityRef::from("a")],
                    ts(0),
                )),
                "change",
                ts(0),
            )
            .expect_err("unknown id must fail");
        assert!(matches!(err, EngramError::NotFound(_)));
    }

    #[test]
    fn delete_cascades_to_every_index() {
        let mut store = store();
        store.store(episodic("m1", &["john"], &["work"], 100)).expect("store");
        store.store(episodic("m2", &["jane"], &["home"], 100)).expect("store");

        store.delete(&MemoryId::from("m1")).expect("delete");

        assert!(store.get_by_entity(&EntityRef::from("john")).is_empty());
        assert!(store.get_by_tag("work").is_empty());
        assert_eq!(store.get_by_kind(MemoryKind::Episodic).len(), 1);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn entity_lookup_matches_only_referenced_records() {
        let mut store = store();
        store.store(episodic("e1", &["john"], &["work"], 0)).expect("store");
        store.store(episodic("e2", &["jane"], &[], 0)).expect("store");

        let johns = store.get_by_entity(&EntityRef::from("john"));
        assert_eq!(johns.len(), 1);
        assert_eq!(johns[0].id, MemoryId::from("e1"));
    }

    #[test]
    fn query_is_conjunctive_across_fields() {
        let mut store = store();
        store.store(episodic("m1", &["john"], &["work"], 100).with_importance(0.9)).expect("store");
        store.store(episodic("m2", &["john"], &["home"], 200).with_importance(0.9)).expect("store");
        store.store(episodic("m3", &["john"], &["work"], 300).with_importance(0.1)).expect("store");

        let results = store.query(
            &MemoryQuery::default()
                .with_entity(EntityRef::from("john"))
                .with_tag("work")
                .with_min_importance(0.5),
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, MemoryId::from("m1"));
    }

    #[test]
    fn query_sorts_and_pages() {
        let mut store = store();
        for i in 0..5 {
            store
                .store(episodic(&format!("m{i}"), &["x"], &[], i * 100))
                .expect("store");
        }

        let query = MemoryQuery {
            sort_by: SortKey::CreatedAt,
            direction: SortDirection::Ascending,
            limit: Some(2),
            offset: 1,
            ..MemoryQuery::default()
        };
        let results = store.query(&query);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, MemoryId::from("m1"));
        assert_eq!(results[1].id, MemoryId::from("m2"));
    }

    #[test]
    fn export_import_round_trips() {
        let mut store = store();
        for i in 0..5 {
            store
                .store(episodic(&format!("m{i}"), &["x"], &["t"], i))
                .expect("store");
        }

        let json = store.export_json().expect("export");
        store.clear();
        assert_eq!(store.count(), 0);

        let imported = store.import_json(&json).expect("import");
        assert_eq!(imported, 5);
        assert_eq!(store.count(), 5);
        for i in 0..5 {
            assert!(store.exists(&MemoryId::from(format!("m{i}").as_str())));
        }
    }

    #[test]
    fn import_skips_bad_entries_but_counts_good_ones() {
        let mut store = store();
        let good = serde_json::to_value(&episodic("ok", &["x"], &[], 0)).expect("value");
        let batch = serde_json::json!([
            good,
            { "id": "bad", "kind": "prophetic", "content": {} },
            42,
        ]);

        let imported = store.import_json(&batch.to_string()).expect("import");
        assert_eq!(imported, 1);
        assert!(store.exists(&MemoryId::from("ok")));
    }

    #[test]
    fn import_top_level_garbage_is_fatal() {
        let mut store = store();
        assert!(matches!(
            store.import_json("not json at all"),
            Err(EngramError::Import(_))
        ));
    }

    #[test]
    fn bincode_round_trip_matches_json_contents() {
        let mut store = store();
        store.store(episodic("m1", &["x"], &["t"], 0)).expect("store");
        let bytes = store.export_bytes().expect("export");

        let mut other = MemoryStore::new(&EmbeddingConfig::default());
        let imported = other.import_bytes(&bytes).expect("import");
        assert_eq!(imported, 1);
        assert!(other.exists(&MemoryId::from("m1")));
    }

    #[test]
    fn optimize_drops_decayed_unconsolidated_records() {
        let mut store = store();
        store.store(episodic("fading", &["x"], &[], 0)).expect("store");
        store.store(episodic("kept", &["x"], &[], 0)).expect("store");

        if let Some(record) = store.get_mut(&MemoryId::from("fading")) {
            record.decay_factor = 0.005;
        }
        if let Some(record) = store.get_mut(&MemoryId::from("kept")) {
            record.decay_factor = 0.005;
            record.is_consolidated = true;
        }

        let removed = store.optimize();
        assert_eq!(removed, 1);
        assert!(!store.exists(&MemoryId::from("fading")));
        assert!(store.exists(&MemoryId::from("kept")));
    }

    #[test]
    fn semantic_records_index_their_subject() {
        let mut store = store();
        let fact = MemoryRecord::new_at(
            MemoryId::from("s1"),
            MemoryContent::Semantic(SemanticContent::new(
                "john",
                "favorite_color",
                crate::memory::FactValue::text("blue"),
            )),
            ts(0),
        );
        store.store(fact).expect("store");
        assert_eq!(store.get_by_entity(&EntityRef::from("john")).len(), 1);
    }

    #[test]
    fn similarity_search_finds_related_content() {
        let mut store = store();
        store.store(episodic("m1", &["john"], &["roadmap"], 0)).expect("store");

        let hits = store.search_similar("event m1 roadmap", 3).expect("search");
        assert!(!hits.is_empty());
        assert_eq!(hits[0].id, MemoryId::from("m1"));
    }
}
