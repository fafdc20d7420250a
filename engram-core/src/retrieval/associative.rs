//! Associative retrieval — "what connects to what I'm recalling".
//!
//! Derives a set of seed records (explicit ids when given, otherwise
//! entity/topic-matched recent records) and scores every other record
//! by its **strongest** affinity to any seed: a weighted blend of
//! entity overlap, tag overlap, kind match, and temporal proximity
//! with a 48-hour half-life.

use crate::memory::MemoryRecord;
use crate::retrieval::{
    RetrievalContext, RetrievalOptions, RetrievalStrategy, RetrievedMemory, filter_and_sort,
};
use crate::similarity::pairwise_affinity;
use crate::storage::MemoryStore;

const W_ENTITY: f32 = 0.4;
const W_TAG: f32 = 0.3;
const W_KIND: f32 = 0.1;
const W_TEMPORAL: f32 = 0.2;
const TEMPORAL_HALF_LIFE_SECS: f64 = 48.0 * 3600.0;
/// How many derived seeds to keep when none are given explicitly.
const MAX_DERIVED_SEEDS: usize = 5;

/// Scores records by affinity to seed memories.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssociativeStrategy;

impl AssociativeStrategy {
    /// Resolve the seed set: explicit ids first, otherwise the most
    /// recent records sharing an entity or topic with the context.
    fn seeds(ctx: &RetrievalContext, store: &MemoryStore) -> Vec<MemoryRecord> {
        if !ctx.seed_ids.is_empty() {
            return ctx
                .seed_ids
                .iter()
                .filter_map(|id| store.get(id).cloned())
                .collect();
        }

        let mut candidates: Vec<MemoryRecord> = store
            .iter()
            .filter(|record| {
                let entity_match = ctx
                    .entities
                    .iter()
                    .any(|e| record.metadata.entity_refs.contains(e));
                let topic_match = ctx.topics.iter().any(|topic| {
                    record
                        .metadata
                        .tags
                        .iter()
                        .any(|tag| tag.eq_ignore_ascii_case(topic))
                });
                entity_match || topic_match
            })
            .cloned()
            .collect();
        candidates.sort_by(|a, b| b.metadata.created_at.cmp(&a.metadata.created_at));
        candidates.truncate(MAX_DERIVED_SEEDS);
        candidates
    }

    /// Strongest affinity between a record and any seed.
    fn best_affinity(record: &MemoryRecord, seeds: &[MemoryRecord]) -> f32 {
        seeds
            .iter()
            .filter(|seed| seed.id != record.id)
            .map(|seed| {
                pairwise_affinity(
                    record,
                    seed,
                    W_ENTITY,
                    W_TAG,
                    W_KIND,
                    W_TEMPORAL,
                    TEMPORAL_HALF_LIFE_SECS,
                )
            })
            .fold(0.0_f32, f32::max)
    }
}

impl RetrievalStrategy for AssociativeStrategy {
    fn name(&self) -> &'static str {
        "associative"
    }

    fn relevance(
        &self,
        record: &MemoryRecord,
        ctx: &RetrievalContext,
        store: &MemoryStore,
    ) -> f32 {
        Self::best_affinity(record, &Self::seeds(ctx, store))
    }

    fn retrieve(
        &self,
        ctx: &RetrievalContext,
        opts: &RetrievalOptions,
        store: &MemoryStore,
    ) -> Vec<RetrievedMemory> {
        let seeds = Self::seeds(ctx, store);
        if seeds.is_empty() {
            return Vec::new();
        }

        let scored = store
            .iter()
            .filter(|record| !seeds.iter().any(|seed| seed.id == record.id))
            .map(|record| RetrievedMemory {
                record: record.clone(),
                relevance: Self::best_affinity(record, &seeds),
                reason: "associated with seed memories".to_string(),
            })
            .collect();
        filter_and_sort(scored, opts)
    }
}
