//! The memory engine — storage, graph, buffer, consolidation,
//! retrieval, mining, and attention composed behind one surface.
//!
//! The engine is synchronous and owns no timers: hosts drive the
//! periodic work by calling [`MemoryEngine::decay_once`] and
//! [`MemoryEngine::consolidate_once`] on their own schedule (the
//! service facade does exactly that).

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::association::AssociationEngine;
use crate::attention::AttentionMechanism;
use crate::buffer::{BufferStats, ShortTermBuffer};
use crate::config::EngramConfig;
use crate::consolidation::{ConsolidationEngine, ConsolidationReport};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::graph::{AssociationGraph, GraphStats};
use crate::memory::{MemoryContent, MemoryRecord};
use crate::metrics::{CounterSnapshot, EngineCounters};
use crate::patterns::{DetectedPattern, PatternMiner};
use crate::retrieval::{RetrievalContext, RetrievalOptions, RetrievalStrategy, RetrievedMemory};
use crate::storage::{MemoryStore, StoreStats};
use crate::types::MemoryId;
use crate::vector::VectorHit;

/// Outcome of one decay pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DecayReport {
    /// Records whose decay factor was updated.
    pub records_decayed: usize,
    /// Graph edges removed for falling below the prune threshold.
    pub edges_pruned: usize,
}

/// Combined statistics across every component.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    /// Storage and index sizes.
    pub store: StoreStats,
    /// Graph sizes.
    pub graph: GraphStats,
    /// Buffer occupancy.
    pub buffer: BufferStats,
    /// Accumulated pattern count.
    pub patterns: usize,
}

/// The composed memory engine.
pub struct MemoryEngine {
    config: EngramConfig,
    store: MemoryStore,
    graph: AssociationGraph,
    associations: AssociationEngine,
    buffer: ShortTermBuffer,
    consolidator: ConsolidationEngine,
    miner: PatternMiner,
    attention: AttentionMechanism,
    counters: EngineCounters,
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("records", &self.store.count())
            .field("edges", &self.graph.edge_count())
            .finish_non_exhaustive()
    }
}

impl MemoryEngine {
    /// Create an engine with the fallback embedding provider.
    #[must_use]
    pub fn new(config: EngramConfig) -> Self {
        let store = MemoryStore::new(&config.embedding);
        Self::assemble(config, store)
    }

    /// Create an engine with an injected embedding provider.
    #[must_use]
    pub fn with_embedding_provider(
        config: EngramConfig,
        provider: Box<dyn EmbeddingProvider>,
    ) -> Self {
        let store = MemoryStore::with_embedding_provider(&config.embedding, provider);
        Self::assemble(config, store)
    }

    fn assemble(config: EngramConfig, store: MemoryStore) -> Self {
        Self {
            store,
            graph: AssociationGraph::new(),
            associations: AssociationEngine::new(config.associations.clone()),
            buffer: ShortTermBuffer::new(config.buffer.clone()),
            consolidator: ConsolidationEngine::new(config.consolidation.clone()),
            miner: PatternMiner::new(config.patterns.clone()),
            attention: AttentionMechanism::new(config.attention.clone()),
            counters: EngineCounters::new(),
            config,
        }
    }

    // -- write path -----------------------------------------------------------

    /// Store a new memory: validate, index, admit to the buffer, and
    /// form associations against the existing corpus.
    ///
    /// # Errors
    /// Validation failures reject the record before any mutation.
    pub fn remember(&mut self, record: MemoryRecord) -> Result<()> {
        self.remember_at(record, Utc::now())
    }

    /// [`MemoryEngine::remember`] with an explicit clock (tests, replays).
    ///
    /// # Errors
    /// Validation failures reject the record before any mutation.
    pub fn remember_at(&mut self, record: MemoryRecord, now: DateTime<Utc>) -> Result<()> {
        self.store.store(record.clone())?;
        EngineCounters::add(&self.counters.records_stored, 1);

        if self.buffer.admit(&record, &self.store, now).is_some() {
            EngineCounters::add(&self.counters.buffer_evictions, 1);
        }

        let formed = self
            .associations
            .associate_new(&record, &self.store, &mut self.graph, now);
        EngineCounters::add(&self.counters.associations_formed, formed as u64);
        Ok(())
    }

    /// Replace a record's content through the versioning path.
    ///
    /// # Errors
    /// Unknown id or invalid content.
    pub fn update(
        &mut self,
        id: &MemoryId,
        content: MemoryContent,
        change_description: impl Into<String>,
    ) -> Result<()> {
        self.store
            .update(id, content, change_description, Utc::now())
    }

    /// Delete a record everywhere: storage, indexes, buffer, and every
    /// graph edge touching it.
    ///
    /// # Errors
    /// Unknown id.
    pub fn forget(&mut self, id: &MemoryId) -> Result<MemoryRecord> {
        let record = self.store.delete(id)?;
        self.buffer.remove(id);
        self.graph.remove_memory(id);
        EngineCounters::add(&self.counters.records_deleted, 1);
        Ok(record)
    }

    // -- read path ------------------------------------------------------------

    /// Run a retrieval strategy, bump access statistics for every hit,
    /// and reinforce associations among the co-retrieved set.
    pub fn recall(
        &mut self,
        strategy: &dyn RetrievalStrategy,
        ctx: &RetrievalContext,
        opts: Option<RetrievalOptions>,
    ) -> Vec<RetrievedMemory> {
        let opts =
            opts.unwrap_or_else(|| RetrievalOptions::from_config(&self.config.retrieval));
        let results = strategy.retrieve(ctx, &opts, &self.store);

        let ids: Vec<MemoryId> = results.iter().map(|r| r.record.id.clone()).collect();
        for id in &ids {
            self.store.retrieve(id, ctx.reference_time);
        }
        self.associations
            .reinforce_coactivation(&ids, &mut self.graph);

        EngineCounters::add(&self.counters.retrievals_served, 1);
        results
    }

    /// Top-k records most similar to a free-text query.
    ///
    /// # Errors
    /// Propagates embedding-provider failures.
    pub fn search_similar(&mut self, text: &str, k: usize) -> Result<Vec<VectorHit>> {
        self.store.search_similar(text, k)
    }

    /// Spread activation outward from a memory through the graph.
    #[must_use]
    pub fn spread_activation(
        &self,
        source: &MemoryId,
        max_hops: usize,
        decay_factor: f32,
    ) -> std::collections::HashMap<MemoryId, f32> {
        self.associations
            .spread_activation(&self.graph, source, max_hops, decay_factor)
    }

    /// Ids within `hops` steps of a memory, either direction.
    #[must_use]
    pub fn associated(&self, id: &MemoryId, hops: usize) -> Vec<MemoryId> {
        self.graph.get_neighborhood(id, hops).into_iter().collect()
    }

    /// Clusters of memories joined by strong mutual edges.
    #[must_use]
    pub fn find_clusters(&self, min_strength: f32) -> Vec<Vec<MemoryId>> {
        self.associations.find_clusters(&self.graph, min_strength)
    }

    // -- periodic work ---------------------------------------------------------

    /// One consolidation pass at the current wall-clock time.
    ///
    /// # Errors
    /// Propagates storage failures.
    pub fn consolidate_once(&mut self) -> Result<ConsolidationReport> {
        self.consolidate_at(Utc::now())
    }

    /// One consolidation pass with an explicit clock.
    ///
    /// # Errors
    /// Propagates storage failures.
    pub fn consolidate_at(&mut self, now: DateTime<Utc>) -> Result<ConsolidationReport> {
        let report = self
            .consolidator
            .consolidate(&mut self.buffer, &mut self.store, now)?;
        EngineCounters::add(
            &self.counters.records_consolidated,
            report.consolidated as u64,
        );
        EngineCounters::add(&self.counters.records_integrated, report.integrated as u64);
        Ok(report)
    }

    /// One decay pass: every record's decay factor and every edge
    /// strength shrink by `rate`; edges below the prune threshold are
    /// removed. `decay_once(0.0)` is a no-op.
    pub fn decay_once(&mut self, rate: f32) -> DecayReport {
        let records_decayed = self.store.apply_decay_all(rate);
        self.graph.apply_decay(rate);
        let edges_pruned = if rate > 0.0 {
            self.graph.prune_weak(self.config.associations.prune_threshold)
        } else {
            0
        };
        EngineCounters::add(&self.counters.decay_passes, 1);
        EngineCounters::add(&self.counters.associations_pruned, edges_pruned as u64);
        DecayReport {
            records_decayed,
            edges_pruned,
        }
    }

    /// Drop unconsolidated records that have decayed to irrelevance.
    pub fn optimize(&mut self) -> usize {
        let removed = self.store.optimize();
        // Cascade graph edges and buffer handles for anything dropped.
        if removed > 0 {
            let alive: std::collections::HashSet<MemoryId> = self
                .store
                .iter()
                .map(|record| record.id.clone())
                .collect();
            let mut dead: std::collections::HashSet<MemoryId> =
                std::collections::HashSet::new();
            for source in self.graph.source_ids() {
                for edge in self.graph.get_outgoing(&source) {
                    if !alive.contains(&edge.source) {
                        dead.insert(edge.source.clone());
                    }
                    if !alive.contains(&edge.target) {
                        dead.insert(edge.target.clone());
                    }
                }
            }
            for id in &dead {
                self.graph.remove_memory(id);
            }
            for id in self.buffer.ids() {
                if !alive.contains(&id) {
                    self.buffer.remove(&id);
                }
            }
        }
        removed
    }

    /// Run the full pattern-mining batch over the corpus. Returns the
    /// number of patterns found this run.
    pub fn mine_patterns(&mut self) -> usize {
        self.mine_patterns_at(Utc::now())
    }

    /// [`MemoryEngine::mine_patterns`] with an explicit clock.
    pub fn mine_patterns_at(&mut self, now: DateTime<Utc>) -> usize {
        let records = self.store.get_all();
        let found = self.miner.mine_all(&records, now);
        EngineCounters::add(&self.counters.patterns_detected, found as u64);
        info!(found, "pattern mining complete");
        found
    }

    /// Re-weight importance across the corpus via the attention
    /// mechanism. Returns the number of records updated.
    pub fn apply_attention(&mut self) -> usize {
        self.apply_attention_at(Utc::now())
    }

    /// [`MemoryEngine::apply_attention`] with an explicit clock.
    pub fn apply_attention_at(&mut self, now: DateTime<Utc>) -> usize {
        let records = self.store.get_all();
        let scores = self
            .attention
            .score_batch(&records, now, |id| Some(self.graph.degree(id)));

        let mut updated = 0;
        for (id, score) in scores {
            if let Some(record) = self.store.get_mut(&id) {
                self.attention.apply_to_importance(record, score);
                updated += 1;
            }
        }
        updated
    }

    // -- serialization ---------------------------------------------------------

    /// Export every record as a JSON array.
    ///
    /// # Errors
    /// Serialization failures.
    pub fn export_json(&self) -> Result<String> {
        self.store.export_json()
    }

    /// Import records from a JSON array; per-entry failures are skipped
    /// and counted in the metrics.
    ///
    /// # Errors
    /// Top-level parse failures only.
    pub fn import_json(&mut self, json: &str) -> Result<usize> {
        let (imported, skipped) = self.store.import_json_counted(json)?;
        EngineCounters::add(&self.counters.records_stored, imported as u64);
        EngineCounters::add(&self.counters.import_entries_skipped, skipped as u64);
        Ok(imported)
    }

    // -- accessors -------------------------------------------------------------

    /// The record store.
    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Mutable store access for host-driven maintenance.
    pub fn store_mut(&mut self) -> &mut MemoryStore {
        &mut self.store
    }

    /// The association graph.
    #[must_use]
    pub fn graph(&self) -> &AssociationGraph {
        &self.graph
    }

    /// The short-term buffer.
    #[must_use]
    pub fn buffer(&self) -> &ShortTermBuffer {
        &self.buffer
    }

    /// Accumulated mined patterns, keyed by pattern id.
    #[must_use]
    pub fn patterns(&self) -> &std::collections::HashMap<String, DetectedPattern> {
        self.miner.patterns()
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngramConfig {
        &self.config
    }

    /// Metrics snapshot.
    #[must_use]
    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Combined statistics across components.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats_at(Utc::now())
    }

    /// [`MemoryEngine::stats`] with an explicit clock.
    #[must_use]
    pub fn stats_at(&self, now: DateTime<Utc>) -> EngineStats {
        EngineStats {
            store: self.store.stats(),
            graph: self.graph.stats(),
            buffer: self.buffer.stats(&self.store, now),
            patterns: self.miner.patterns().len(),
        }
    }

    /// Drop every record, edge, buffer entry, and mined pattern.
    pub fn clear(&mut self) {
        self.store.clear();
        self.graph.clear();
        self.buffer.clear();
        self.miner.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
