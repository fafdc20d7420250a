//! Contextual retrieval — "what's relevant to this conversation".
//!
//! Blends entity overlap, topic match, raw text overlap with recent
//! conversation turns, and recency with a 24-hour half-life.

use crate::memory::MemoryRecord;
use crate::retrieval::{RetrievalContext, RetrievalStrategy, WeightedSum};
use crate::similarity::{half_life_decay, jaccard_entities, text_overlap};
use crate::storage::MemoryStore;

const W_ENTITIES: f32 = 0.3;
const W_TOPICS: f32 = 0.3;
const W_TEXT: f32 = 0.2;
const W_RECENCY: f32 = 0.2;
const RECENCY_HALF_LIFE_SECS: f64 = 24.0 * 3600.0;

/// Scores records against the current conversational context.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextualStrategy;

impl ContextualStrategy {
    /// Fraction of context topics matched by the record's tags, with a
    /// fuzzy contains-either-way comparison ("planning" matches
    /// "sprint-planning").
    fn topic_match(record: &MemoryRecord, topics: &[String]) -> f32 {
        if topics.is_empty() {
            return 0.0;
        }
        let matched = topics
            .iter()
            .filter(|topic| {
                let topic = topic.to_lowercase();
                record.metadata.tags.iter().any(|tag| {
                    let tag = tag.to_lowercase();
                    tag.contains(&topic) || topic.contains(&tag)
                })
            })
            .count();
        matched as f32 / topics.len() as f32
    }

    /// Best token overlap between the record text and any recent turn.
    fn conversation_overlap(record: &MemoryRecord, messages: &[String]) -> f32 {
        let text = record.content.text();
        messages
            .iter()
            .map(|message| text_overlap(&text, message))
            .fold(0.0_f32, f32::max)
    }
}

impl RetrievalStrategy for ContextualStrategy {
    fn name(&self) -> &'static str {
        "contextual"
    }

    fn relevance(
        &self,
        record: &MemoryRecord,
        ctx: &RetrievalContext,
        _store: &MemoryStore,
    ) -> f32 {
        let mut sum = WeightedSum::default();

        if !ctx.entities.is_empty() {
            sum.add(
                W_ENTITIES,
                jaccard_entities(&record.metadata.entity_refs, &ctx.entities),
            );
        }
        if !ctx.topics.is_empty() {
            sum.add(W_TOPICS, Self::topic_match(record, &ctx.topics));
        }
        if !ctx.recent_messages.is_empty() {
            sum.add(
                W_TEXT,
                Self::conversation_overlap(record, &ctx.recent_messages),
            );
        }

        let age_secs = (ctx.reference_time - record.metadata.created_at).num_seconds() as f64;
        sum.add(W_RECENCY, half_life_decay(age_secs, RECENCY_HALF_LIFE_SECS));

        sum.value()
    }
}
