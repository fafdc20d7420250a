//! Consolidation engine — promotes buffered memories to long-term.
//!
//! Each buffer-ready record goes through three stages: importance
//! reassessment (bounded boosts for access frequency, entity richness,
//! confidence, and related consolidated knowledge), an integration
//! attempt for semantic facts (contradictions merge into the existing
//! fact instead of storing a duplicate), and finally promotion. After
//! the batch, recurring entity pairs and tags across the consolidated
//! set are tallied as detected patterns.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::buffer::ShortTermBuffer;
use crate::config::ConsolidationConfig;
use crate::error::Result;
use crate::memory::{MemoryContent, MemoryRecord};
use crate::storage::MemoryStore;
use crate::types::{EntityRef, MemoryId};

// Importance reassessment bounds.
const ACCESS_BOOST_STEP: f32 = 0.03;
const ACCESS_BOOST_CAP: f32 = 0.3;
const ENTITY_BOOST_STEP: f32 = 0.02;
const ENTITY_BOOST_CAP: f32 = 0.2;
const CONFIDENCE_BOOST_FACTOR: f32 = 0.1;
const RELATED_BOOST_STEP: f32 = 0.04;
const RELATED_BOOST_CAP: f32 = 0.2;
/// Only the first N entities of a candidate count toward relatedness.
const RELATED_ENTITY_PREFIX: usize = 3;

/// Outcome of one consolidation pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ConsolidationReport {
    /// Buffer entries examined.
    pub processed: usize,
    /// Records promoted to long-term.
    pub consolidated: usize,
    /// Semantic candidates merged into existing facts.
    pub integrated: usize,
    /// Recurring entity-pair and tag patterns tallied after the batch.
    pub patterns_detected: usize,
}

/// Promotes short-term records into long-term storage.
#[derive(Debug, Clone)]
pub struct ConsolidationEngine {
    config: ConsolidationConfig,
}

impl ConsolidationEngine {
    /// Create an engine with the given configuration.
    #[must_use]
    pub fn new(config: ConsolidationConfig) -> Self {
        Self { config }
    }

    /// Run one consolidation pass over the buffer's ready entries.
    ///
    /// # Errors
    /// Propagates storage failures; per-record merge conflicts are
    /// internal and do not abort the batch.
    pub fn consolidate(
        &self,
        buffer: &mut ShortTermBuffer,
        store: &mut MemoryStore,
        now: DateTime<Utc>,
    ) -> Result<ConsolidationReport> {
        let ready = buffer.ready_for_consolidation(store, now);
        let mut report = ConsolidationReport {
            processed: ready.len(),
            ..ConsolidationReport::default()
        };

        for id in ready {
            let Some(candidate) = store.get(&id).cloned() else {
                // Deleted behind the buffer's back; just drop the handle.
                buffer.remove(&id);
                continue;
            };
            if candidate.is_consolidated {
                buffer.remove(&id);
                continue;
            }

            let reassessed = self.reassess_importance(&candidate, store);

            if let Some(existing_id) = self.find_contradicting_fact(&candidate, store) {
                self.integrate(&id, &existing_id, &candidate, store, now)?;
                buffer.remove(&id);
                report.integrated += 1;
                continue;
            }

            if let Some(record) = store.get_mut(&id) {
                record.metadata.importance = reassessed;
                record.is_consolidated = true;
                record.metadata.last_modified_at = now;
            }
            buffer.remove(&id);
            report.consolidated += 1;
            debug!(id = %id, importance = reassessed, "record consolidated");
        }

        report.patterns_detected = self.tally_patterns(store);
        info!(
            processed = report.processed,
            consolidated = report.consolidated,
            integrated = report.integrated,
            patterns = report.patterns_detected,
            "consolidation pass complete"
        );
        Ok(report)
    }

    /// Reassess a candidate's importance with bounded boosts, capped at 1.0.
    #[must_use]
    pub fn reassess_importance(&self, candidate: &MemoryRecord, store: &MemoryStore) -> f32 {
        let access_boost =
            (candidate.metadata.access_count as f32 * ACCESS_BOOST_STEP).min(ACCESS_BOOST_CAP);
        let entity_boost = (candidate.metadata.entity_refs.len() as f32 * ENTITY_BOOST_STEP)
            .min(ENTITY_BOOST_CAP);
        let confidence_boost = candidate.metadata.confidence * CONFIDENCE_BOOST_FACTOR;

        let related = self.count_related_consolidated(candidate, store);
        let related_boost = (related as f32 * RELATED_BOOST_STEP).min(RELATED_BOOST_CAP);

        (candidate.metadata.importance
            + access_boost
            + entity_boost
            + confidence_boost
            + related_boost)
            .min(1.0)
    }

    /// Consolidated records sharing at least one of the candidate's
    /// first three entities.
    fn count_related_consolidated(&self, candidate: &MemoryRecord, store: &MemoryStore) -> usize {
        let prefix: Vec<&EntityRef> = candidate
            .metadata
            .entity_refs
            .iter()
            .take(RELATED_ENTITY_PREFIX)
            .collect();
        if prefix.is_empty() {
            return 0;
        }
        store
            .iter()
            .filter(|other| {
                other.id != candidate.id
                    && other.is_consolidated
                    && other
                        .metadata
                        .entity_refs
                        .iter()
                        .any(|e| prefix.contains(&e))
            })
            .count()
    }

    /// A consolidated semantic record sharing the candidate's subject
    /// entity that contradicts it, if any.
    fn find_contradicting_fact(
        &self,
        candidate: &MemoryRecord,
        store: &MemoryStore,
    ) -> Option<MemoryId> {
        let MemoryContent::Semantic(incoming) = &candidate.content else {
            return None;
        };
        let subject = EntityRef::new(incoming.subject.clone());
        store
            .get_by_entity(&subject)
            .into_iter()
            .find(|other| {
                other.id != candidate.id
                    && other.is_consolidated
                    && matches!(
                        &other.content,
                        MemoryContent::Semantic(existing) if existing.contradicts(incoming)
                    )
            })
            .map(|other| other.id)
    }

    /// Merge the candidate into the existing fact and delete the
    /// candidate; the existing record absorbs the knowledge.
    fn integrate(
        &self,
        candidate_id: &MemoryId,
        existing_id: &MemoryId,
        candidate: &MemoryRecord,
        store: &mut MemoryStore,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(existing) = store.get_mut(existing_id) {
            existing.merge_semantic(candidate, self.config.merge_policy, now)?;
        }
        store.refresh_vector(existing_id);
        store.delete(candidate_id)?;
        debug!(candidate = %candidate_id, into = %existing_id, "semantic fact integrated");
        Ok(())
    }

    /// Count recurring patterns over the consolidated set: entity pairs
    /// co-occurring in `min_pattern_support` records and tags appearing
    /// in that many records each count once.
    fn tally_patterns(&self, store: &MemoryStore) -> usize {
        let min_support = self.config.min_pattern_support;
        let mut pair_counts: HashMap<(EntityRef, EntityRef), usize> = HashMap::new();
        let mut tag_counts: HashMap<String, usize> = HashMap::new();

        for record in store.iter().filter(|r| r.is_consolidated) {
            let entities = &record.metadata.entity_refs;
            for i in 0..entities.len() {
                for j in (i + 1)..entities.len() {
                    let pair = if entities[i] <= entities[j] {
                        (entities[i].clone(), entities[j].clone())
                    } else {
                        (entities[j].clone(), entities[i].clone())
                    };
                    *pair_counts.entry(pair).or_default() += 1;
                }
            }
            let unique_tags: HashSet<String> = record
                .metadata
                .tags
                .iter()
                .map(|t| t.to_lowercase())
                .collect();
            for tag in unique_tags {
                *tag_counts.entry(tag).or_default() += 1;
            }
        }

        let entity_patterns = pair_counts.values().filter(|&&c| c >= min_support).count();
        let tag_patterns = tag_counts.values().filter(|&&c| c >= min_support).count();
        entity_patterns + tag_patterns
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BufferConfig, EmbeddingConfig, MergePolicy};
    use crate::memory::{EpisodicContent, FactValue, SemanticContent};
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("timestamp")
    }

    fn setup() -> (ConsolidationEngine, ShortTermBuffer, MemoryStore) {
        (
            ConsolidationEngine::new(ConsolidationConfig::default()),
            ShortTermBuffer::new(BufferConfig {
                capacity: 50,
                window_secs: 3600,
                auto_consolidate_threshold: 0.8,
            }),
            MemoryStore::new(&EmbeddingConfig::default()),
        )
    }

    fn episodic(id: &str, entities: &[&str], importance: f32, created: i64) -> MemoryRecord {
        MemoryRecord::new_at(
            MemoryId::from(id),
            MemoryContent::Episodic(EpisodicContent::new(
                format!("event {id}"),
                entities.iter().map(|e| EntityRef::from(*e)).collect(),
                ts(created),
            )),
            ts(created),
        )
        .with_importance(importance)
    }

    fn fact(id: &str, value: &str, created: i64) -> MemoryRecord {
        MemoryRecord::new_at(
            MemoryId::from(id),
            MemoryContent::Semantic(SemanticContent::new(
                "john",
                "favorite_color",
                FactValue::text(value),
            )),
            ts(created),
        )
    }

    #[test]
    fn promotes_aged_buffer_entries() {
        let (engine, mut buffer, mut store) = setup();
        let record = episodic("m1", &["john"], 0.4, 0);
        store.store(record.clone()).expect("store");
        buffer.admit(&record, &store, ts(0));

        let report = engine
            .consolidate(&mut buffer, &mut store, ts(4_000))
            .expect("consolidate");

        assert_eq!(report.processed, 1);
        assert_eq!(report.consolidated, 1);
        assert!(store.get(&MemoryId::from("m1")).expect("exists").is_consolidated);
        assert!(buffer.is_empty());
    }

    #[test]
    fn importance_boosts_are_bounded() {
        let (engine, _, mut store) = setup();
        let mut record = episodic("m1", &["a", "b", "c", "d", "e"], 0.5, 0);
        record.metadata.access_count = 100; // boost capped at 0.3
        record.metadata.confidence = 1.0;
        store.store(record.clone()).expect("store");

        let reassessed = engine.reassess_importance(&record, &store);
        // 0.5 + 0.3 (access) + 0.1 (5 entities × 0.02) + 0.1 (confidence) = 1.0 cap
        assert!((reassessed - 1.0).abs() < 1e-6);
    }

    #[test]
    fn related_consolidated_records_boost_importance() {
        let (engine, _, mut store) = setup();
        for i in 0..3 {
            let mut related = episodic(&format!("r{i}"), &["john"], 0.5, 0);
            related.is_consolidated = true;
            store.store(related).expect("store");
        }
        let candidate = episodic("new", &["john"], 0.5, 0);
        store.store(candidate.clone()).expect("store");

        let reassessed = engine.reassess_importance(&candidate, &store);
        // 0.5 + 0.02 (1 entity) + 0.05 (confidence 0.5) + 0.12 (3 related × 0.04)
        assert!((reassessed - 0.69).abs() < 1e-4);
    }

    #[test]
    fn contradictory_fact_is_integrated_not_duplicated() {
        let (engine, mut buffer, mut store) = setup();

        let mut existing = fact("old", "blue", 1_000);
        existing.is_consolidated = true;
        store.store(existing).expect("store");

        let incoming = fact("new", "red", 2_000);
        store.store(incoming.clone()).expect("store");
        buffer.admit(&incoming, &store, ts(2_000));

        let report = engine
            .consolidate(&mut buffer, &mut store, ts(10_000))
            .expect("consolidate");

        assert_eq!(report.integrated, 1);
        assert_eq!(report.consolidated, 0);
        // Candidate consumed; existing carries the newer value.
        assert!(!store.exists(&MemoryId::from("new")));
        let survivor = store.get(&MemoryId::from("old")).expect("exists");
        match &survivor.content {
            MemoryContent::Semantic(c) => assert_eq!(c.value, FactValue::text("red")),
            _ => panic!("expected semantic content"),
        }
    }

    #[test]
    fn confidence_wins_policy_keeps_trusted_value() {
        let config = ConsolidationConfig {
            merge_policy: MergePolicy::ConfidenceWins,
            ..ConsolidationConfig::default()
        };
        let engine = ConsolidationEngine::new(config);
        let mut buffer = ShortTermBuffer::new(BufferConfig::default());
        let mut store = MemoryStore::new(&EmbeddingConfig::default());

        let mut existing = fact("old", "blue", 1_000).with_confidence(0.95);
        existing.is_consolidated = true;
        store.store(existing).expect("store");

        let incoming = fact("new", "red", 2_000).with_confidence(0.1);
        store.store(incoming.clone()).expect("store");
        buffer.admit(&incoming, &store, ts(2_000));

        engine
            .consolidate(&mut buffer, &mut store, ts(10_000))
            .expect("consolidate");

        let survivor = store.get(&MemoryId::from("old")).expect("exists");
        match &survivor.content {
            MemoryContent::Semantic(c) => assert_eq!(c.value, FactValue::text("blue")),
            _ => panic!("expected semantic content"),
        }
    }

    #[test]
    fn tallies_recurring_entity_pairs_and_tags() {
        let (engine, mut buffer, mut store) = setup();
        for i in 0..3 {
            let record = episodic(&format!("m{i}"), &["john", "jane"], 0.5, i)
                .with_tags(["standup"]);
            store.store(record.clone()).expect("store");
            buffer.admit(&record, &store, ts(i));
        }

        let report = engine
            .consolidate(&mut buffer, &mut store, ts(10_000))
            .expect("consolidate");

        assert_eq!(report.consolidated, 3);
        // One recurring pair (john, jane) + one recurring tag (standup).
        assert_eq!(report.patterns_detected, 2);
    }
}
