//! Retrieval strategy framework.
//!
//! A common contract — score records against a context, filter, rank,
//! optionally re-rank for diversity, truncate — with five
//! interchangeable strategies behind it:
//!
//! - [`ContextualStrategy`] — entities + topics + conversation overlap + recency
//! - [`AssociativeStrategy`] — affinity to seed memories
//! - [`TemporalStrategy`] — time ranges and calendar patterns
//! - [`EmotionalStrategy`] — emotional-state similarity
//! - [`QueryStrategy`] — direct filter pass-through
//!
//! Every weighted sum normalizes by the weights actually applied, so a
//! context that omits a field does not bias scores downward.

pub mod associative;
pub mod contextual;
pub mod emotional;
pub mod query;
pub mod temporal;

pub use associative::AssociativeStrategy;
pub use contextual::ContextualStrategy;
pub use emotional::EmotionalStrategy;
pub use query::QueryStrategy;
pub use temporal::TemporalStrategy;

use chrono::{DateTime, Utc};

use crate::config::RetrievalConfig;
use crate::memory::MemoryRecord;
use crate::similarity::record_similarity;
use crate::storage::{MemoryQuery, MemoryStore};
use crate::types::{EntityRef, MemoryId, RelevanceScore};

// ---------------------------------------------------------------------------
// Context & options
// ---------------------------------------------------------------------------

/// The caller's emotional state, for emotional retrieval.
#[derive(Debug, Clone)]
pub struct EmotionCue {
    /// Current primary emotion.
    pub emotion: String,
    /// Its intensity (0.0 to 1.0).
    pub intensity: f32,
    /// Its valence (-1.0 to 1.0).
    pub valence: f32,
}

/// What the agent is currently talking about — the raw material every
/// strategy scores against.
#[derive(Debug, Clone)]
pub struct RetrievalContext {
    /// Entities in play in the conversation.
    pub entities: Vec<EntityRef>,
    /// Topics in play.
    pub topics: Vec<String>,
    /// Recent conversation turns, newest last.
    pub recent_messages: Vec<String>,
    /// The caller's emotional state, if known.
    pub emotion: Option<EmotionCue>,
    /// A time window of interest (temporal strategy).
    pub time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Explicit seed memories (associative strategy).
    pub seed_ids: Vec<MemoryId>,
    /// A storage filter (query strategy).
    pub query: Option<MemoryQuery>,
    /// Full-text substring filter on serialized content (query strategy).
    pub text: Option<String>,
    /// The "now" anchor all recency math is computed against.
    pub reference_time: DateTime<Utc>,
}

impl RetrievalContext {
    /// An empty context anchored at the current wall-clock time.
    #[must_use]
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// An empty context anchored at an explicit reference time.
    #[must_use]
    pub fn at(reference_time: DateTime<Utc>) -> Self {
        Self {
            entities: Vec::new(),
            topics: Vec::new(),
            recent_messages: Vec::new(),
            emotion: None,
            time_range: None,
            seed_ids: Vec::new(),
            query: None,
            text: None,
            reference_time,
        }
    }

    /// Add an entity in play.
    #[must_use]
    pub fn with_entity(mut self, entity: EntityRef) -> Self {
        self.entities.push(entity);
        self
    }

    /// Add a topic in play.
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topics.push(topic.into());
        self
    }

    /// Add a recent conversation turn.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.recent_messages.push(message.into());
        self
    }

    /// Set the emotional state.
    #[must_use]
    pub fn with_emotion(mut self, cue: EmotionCue) -> Self {
        self.emotion = Some(cue);
        self
    }

    /// Set the time window of interest.
    #[must_use]
    pub fn with_time_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.time_range = Some((start, end));
        self
    }

    /// Add an explicit seed memory.
    #[must_use]
    pub fn with_seed(mut self, id: MemoryId) -> Self {
        self.seed_ids.push(id);
        self
    }

    /// Set the storage filter for the query strategy.
    #[must_use]
    pub fn with_query(mut self, query: MemoryQuery) -> Self {
        self.query = Some(query);
        self
    }

    /// Set the full-text substring filter.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

impl Default for RetrievalContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Knobs applied by the shared post-processing pass.
#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    /// Maximum results returned.
    pub limit: usize,
    /// Results scoring below this are dropped.
    pub min_relevance: f32,
    /// Records less important than this are dropped.
    pub min_importance: f32,
    /// Drop records not yet consolidated.
    pub consolidated_only: bool,
    /// Diversity re-ranking weight in (0, 1]; `None` disables it.
    pub diversity: Option<f32>,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            min_relevance: 0.0,
            min_importance: 0.0,
            consolidated_only: false,
            diversity: None,
        }
    }
}

impl RetrievalOptions {
    /// Build options from the engine-level retrieval config.
    #[must_use]
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            limit: config.default_limit,
            min_relevance: config.min_relevance,
            min_importance: 0.0,
            consolidated_only: false,
            diversity: (config.diversity_weight > 0.0).then_some(config.diversity_weight),
        }
    }
}

/// One ranked retrieval result.
#[derive(Debug, Clone)]
pub struct RetrievedMemory {
    /// The retrieved record.
    pub record: MemoryRecord,
    /// Relevance in [0, 1].
    pub relevance: f32,
    /// Why the strategy surfaced this record.
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Strategy contract
// ---------------------------------------------------------------------------

/// A retrieval strategy: scores records against a context and returns
/// a ranked result list.
pub trait RetrievalStrategy {
    /// Stable strategy name (used in result reasons and metrics).
    fn name(&self) -> &'static str;

    /// Relevance of one record to the context, in [0, 1].
    fn relevance(&self, record: &MemoryRecord, ctx: &RetrievalContext, store: &MemoryStore)
    -> f32;

    /// Score the whole store and post-process. Strategies with their own
    /// candidate generation (e.g. the query strategy) override this.
    fn retrieve(
        &self,
        ctx: &RetrievalContext,
        opts: &RetrievalOptions,
        store: &MemoryStore,
    ) -> Vec<RetrievedMemory> {
        let scored = store
            .iter()
            .map(|record| RetrievedMemory {
                record: record.clone(),
                relevance: self.relevance(record, ctx, store),
                reason: format!("{} match", self.name()),
            })
            .collect();
        filter_and_sort(scored, opts)
    }
}

// ---------------------------------------------------------------------------
// Shared post-processing
// ---------------------------------------------------------------------------

/// Drop, rank, optionally diversify, and truncate scored results.
#[must_use]
pub fn filter_and_sort(
    mut results: Vec<RetrievedMemory>,
    opts: &RetrievalOptions,
) -> Vec<RetrievedMemory> {
    results.retain(|r| {
        r.relevance >= opts.min_relevance
            && r.record.metadata.importance >= opts.min_importance
            && (!opts.consolidated_only || r.record.is_consolidated)
    });

    results.sort_by_key(|r| std::cmp::Reverse(RelevanceScore::new(r.relevance)));

    if let Some(weight) = opts.diversity {
        if weight > 0.0 && results.len() > 1 {
            results = diversity_rerank(results, weight.min(1.0));
        }
    }

    results.truncate(opts.limit);
    results
}

/// Greedy diversity re-ranking.
///
/// Walks the score-ordered candidates; each one's score is blended with
/// its dissimilarity to the already-selected set
/// (`score×(1-d) + min_dissimilarity×d`, dissimilarity = 1 − max
/// pairwise similarity), and the blended score determines its sorted
/// insertion position.
fn diversity_rerank(candidates: Vec<RetrievedMemory>, weight: f32) -> Vec<RetrievedMemory> {
    let mut selected: Vec<(f32, RetrievedMemory)> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let blended = if selected.is_empty() {
            candidate.relevance
        } else {
            let max_similarity = selected
                .iter()
                .map(|(_, chosen)| record_similarity(&candidate.record, &chosen.record))
                .fold(0.0_f32, f32::max);
            let dissimilarity = 1.0 - max_similarity;
            candidate.relevance * (1.0 - weight) + dissimilarity * weight
        };

        let position = selected
            .iter()
            .position(|(score, _)| *score < blended)
            .unwrap_or(selected.len());
        selected.insert(position, (blended, candidate));
    }

    selected.into_iter().map(|(_, result)| result).collect()
}

/// Weighted-sum helper: accumulates `weight × value` pairs and
/// normalizes by the total weight applied.
#[derive(Debug, Default)]
pub(crate) struct WeightedSum {
    sum: f32,
    total_weight: f32,
}

impl WeightedSum {
    pub(crate) fn add(&mut self, weight: f32, value: f32) {
        self.sum += weight * value;
        self.total_weight += weight;
    }

    pub(crate) fn value(&self) -> f32 {
        if self.total_weight <= 0.0 {
            0.0
        } else {
            (self.sum / self.total_weight).clamp(0.0, 1.0)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
