//! Query retrieval — a direct filter pass-through to storage.
//!
//! Filtering, not ranking, is the point: the storage filter does the
//! selection, an optional substring match narrows by serialized
//! content, and relevance is simply the mean of effective importance
//! and confidence.

use tracing::warn;

use crate::memory::MemoryRecord;
use crate::retrieval::{
    RetrievalContext, RetrievalOptions, RetrievalStrategy, RetrievedMemory, filter_and_sort,
};
use crate::storage::{MemoryQuery, MemoryStore};

/// Pass-through strategy over [`MemoryStore::query`].
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryStrategy;

impl QueryStrategy {
    /// Whether the record's serialized form contains `needle`
    /// (case-insensitive).
    fn content_contains(record: &MemoryRecord, needle: &str) -> bool {
        match serde_json::to_string(record) {
            Ok(serialized) => serialized
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Err(error) => {
                warn!(id = %record.id, %error, "could not serialize record for text filter");
                false
            }
        }
    }
}

impl RetrievalStrategy for QueryStrategy {
    fn name(&self) -> &'static str {
        "query"
    }

    fn relevance(
        &self,
        record: &MemoryRecord,
        _ctx: &RetrievalContext,
        _store: &MemoryStore,
    ) -> f32 {
        (record.effective_importance() + record.metadata.confidence) / 2.0
    }

    fn retrieve(
        &self,
        ctx: &RetrievalContext,
        opts: &RetrievalOptions,
        store: &MemoryStore,
    ) -> Vec<RetrievedMemory> {
        let query = ctx.query.clone().unwrap_or_else(MemoryQuery::default);
        let mut matched = store.query(&query);

        if let Some(needle) = &ctx.text {
            matched.retain(|record| Self::content_contains(record, needle));
        }

        let scored = matched
            .into_iter()
            .map(|record| {
                let relevance = self.relevance(&record, ctx, store);
                RetrievedMemory {
                    record,
                    relevance,
                    reason: "matched query filter".to_string(),
                }
            })
            .collect();
        filter_and_sort(scored, opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::memory::{EpisodicContent, MemoryContent};
    use crate::types::{EntityRef, MemoryId, MemoryKind};
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("timestamp")
    }

    fn record(id: &str, description: &str, importance: f32) -> MemoryRecord {
        MemoryRecord::new_at(
            MemoryId::from(id),
            MemoryContent::Episodic(EpisodicContent::new(
                description,
                vec![EntityRef::from("x")],
                ts(0),
            )),
            ts(0),
        )
        .with_importance(importance)
    }

    #[test]
    fn filter_pass_through_applies_storage_query() {
        let mut store = MemoryStore::new(&EmbeddingConfig::default());
        store.store(record("a", "standup notes", 0.9)).expect("store");
        store.store(record("b", "lunch order", 0.2)).expect("store");

        let ctx = RetrievalContext::at(ts(100)).with_query(
            MemoryQuery::default()
                .with_kind(MemoryKind::Episodic)
                .with_min_importance(0.5),
        );
        let results = QueryStrategy.retrieve(&ctx, &RetrievalOptions::default(), &store);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.id, MemoryId::from("a"));
    }

    #[test]
    fn text_filter_narrows_by_serialized_content() {
        let mut store = MemoryStore::new(&EmbeddingConfig::default());
        store.store(record("a", "standup notes", 0.5)).expect("store");
        store.store(record("b", "lunch order", 0.5)).expect("store");

        let ctx = RetrievalContext::at(ts(100)).with_text("STANDUP");
        let results = QueryStrategy.retrieve(&ctx, &RetrievalOptions::default(), &store);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.id, MemoryId::from("a"));
    }

    #[test]
    fn relevance_is_importance_confidence_mean() {
        let store = MemoryStore::new(&EmbeddingConfig::default());
        let mut r = record("a", "x", 0.8).with_confidence(0.4);
        r.decay_factor = 0.5;
        // (0.8 × 0.5 + 0.4) / 2 = 0.4
        let score = QueryStrategy.relevance(&r, &RetrievalContext::at(ts(0)), &store);
        assert!((score - 0.4).abs() < 1e-6);
    }
}
