//! Configuration for the Engram memory engine.
//!
//! Maps directly to `engram.toml`. Every field has a serde default so a
//! partial (or empty) file yields a fully usable configuration.

use serde::{Deserialize, Serialize};

/// Top-level Engram configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngramConfig {
    /// Short-term buffer capacity and admission behavior.
    #[serde(default)]
    pub buffer: BufferConfig,
    /// Association formation and graph maintenance.
    #[serde(default)]
    pub associations: AssociationConfig,
    /// Consolidation engine settings.
    #[serde(default)]
    pub consolidation: ConsolidationConfig,
    /// Retrieval framework defaults.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Attention mechanism weights and blending.
    #[serde(default)]
    pub attention: AttentionConfig,
    /// Pattern miner thresholds.
    #[serde(default)]
    pub patterns: PatternConfig,
    /// Embedding / vector index settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl EngramConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns [`crate::EngramError::Config`] if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::EngramError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Short-term buffer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Maximum number of records held in the working set.
    #[serde(default = "default_50")]
    pub capacity: usize,
    /// Age (seconds) after which a buffered record is ready for
    /// consolidation regardless of importance.
    #[serde(default = "default_3600")]
    pub window_secs: u64,
    /// Importance at or above which a record is ready for consolidation
    /// regardless of age.
    #[serde(default = "default_0_8")]
    pub auto_consolidate_threshold: f32,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            window_secs: 3600,
            auto_consolidate_threshold: 0.8,
        }
    }
}

/// Association engine and graph configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociationConfig {
    /// Stop forming edges once a new record holds this many.
    #[serde(default = "default_10")]
    pub max_associations_per_memory: usize,
    /// Minimum pairwise signal strength for an edge to be persisted.
    #[serde(default = "default_0_3")]
    pub min_similarity_threshold: f32,
    /// Temporal-proximity window (seconds); records further apart than
    /// this contribute zero temporal signal.
    #[serde(default = "default_172800")]
    pub temporal_window_secs: u64,
    /// Strength added when an edge is explicitly reinforced.
    #[serde(default = "default_0_1")]
    pub reinforcement_increment: f32,
    /// Strength added to each pairwise edge among a co-retrieved set.
    #[serde(default = "default_0_05")]
    pub coactivation_increment: f32,
    /// Edges below this strength are removed by a prune pass.
    #[serde(default = "default_0_05")]
    pub prune_threshold: f32,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            max_associations_per_memory: 10,
            min_similarity_threshold: 0.3,
            temporal_window_secs: 172_800,
            reinforcement_increment: 0.1,
            coactivation_increment: 0.05,
            prune_threshold: 0.05,
        }
    }
}

/// Consolidation engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    /// How contradictory semantic facts are resolved on merge.
    #[serde(default)]
    pub merge_policy: MergePolicy,
    /// Minimum co-occurrence count for the post-batch pattern tally.
    #[serde(default = "default_3")]
    pub min_pattern_support: usize,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            merge_policy: MergePolicy::NewestWins,
            min_pattern_support: 3,
        }
    }
}

/// Policy for resolving contradictory semantic facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// The record with the later creation time supplies the value.
    #[default]
    NewestWins,
    /// The record with the higher confidence supplies the value.
    ConfidenceWins,
}

/// Retrieval framework defaults (per-strategy weights are fixed; these
/// are the knobs a host tunes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default maximum number of results.
    #[serde(default = "default_10")]
    pub default_limit: usize,
    /// Results scoring below this are dropped.
    #[serde(default = "default_0_0")]
    pub min_relevance: f32,
    /// Diversity re-ranking weight in [0, 1]; 0 disables re-ranking.
    #[serde(default = "default_0_0")]
    pub diversity_weight: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            min_relevance: 0.0,
            diversity_weight: 0.0,
        }
    }
}

/// Attention mechanism configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttentionConfig {
    /// Weight of the recency factor.
    #[serde(default = "default_0_25")]
    pub recency_weight: f32,
    /// Weight of the access-frequency factor.
    #[serde(default = "default_0_2")]
    pub frequency_weight: f32,
    /// Weight of the graph-connectivity factor.
    #[serde(default = "default_0_2")]
    pub connectivity_weight: f32,
    /// Weight of the emotional-salience factor.
    #[serde(default = "default_0_15")]
    pub emotional_weight: f32,
    /// Weight of the interaction-pattern factor.
    #[serde(default = "default_0_2")]
    pub interaction_weight: f32,
    /// Whether to fold pairwise self-attention into the score.
    #[serde(default)]
    pub self_attention: bool,
    /// Blend factor: `importance' = importance×(1-β) + score×β`.
    #[serde(default = "default_0_3")]
    pub blend_factor: f32,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            recency_weight: 0.25,
            frequency_weight: 0.2,
            connectivity_weight: 0.2,
            emotional_weight: 0.15,
            interaction_weight: 0.2,
            self_attention: false,
            blend_factor: 0.3,
        }
    }
}

/// Pattern miner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Minimum support for any mined pattern.
    #[serde(default = "default_3")]
    pub min_support: usize,
    /// Window (seconds) within which adjacent episodic records form a
    /// temporal sequence.
    #[serde(default = "default_86400")]
    pub temporal_window_secs: u64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            min_support: 3,
            temporal_window_secs: 86_400,
        }
    }
}

/// Embedding and vector index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Dimensionality of the fallback hashed bag-of-words vectors.
    #[serde(default = "default_100")]
    pub dimensions: usize,
    /// Minimum cosine similarity for a vector-search hit.
    #[serde(default = "default_0_3")]
    pub min_similarity: f32,
    /// Entries kept in the text→embedding memoization cache.
    #[serde(default = "default_256")]
    pub cache_size: usize,
    /// Build the HNSW graph once the index holds this many vectors;
    /// below it, brute-force scan is faster than a build.
    #[serde(default = "default_100")]
    pub hnsw_build_threshold: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: 100,
            min_similarity: 0.3,
            cache_size: 256,
            hnsw_build_threshold: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_0_0() -> f32 {
    0.0
}
fn default_0_05() -> f32 {
    0.05
}
fn default_0_1() -> f32 {
    0.1
}
fn default_0_15() -> f32 {
    0.15
}
fn default_0_2() -> f32 {
    0.2
}
fn default_0_25() -> f32 {
    0.25
}
fn default_0_3() -> f32 {
    0.3
}
fn default_0_8() -> f32 {
    0.8
}
fn default_3() -> usize {
    3
}
fn default_10() -> usize {
    10
}
fn default_50() -> usize {
    50
}
fn default_100() -> usize {
    100
}
fn default_256() -> usize {
    256
}
fn default_3600() -> u64 {
    3600
}
fn default_86400() -> u64 {
    86_400
}
fn default_172800() -> u64 {
    172_800
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
