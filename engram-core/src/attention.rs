//! Attention mechanism — periodic importance re-weighting.
//!
//! Computes a per-record composite attention score from recency,
//! access frequency, graph connectivity, emotional salience, and
//! interaction pattern, then blends it back into stored importance.
//! Weights are normalized so they always behave as fractions of one.

use chrono::{DateTime, Utc};

use crate::config::AttentionConfig;
use crate::memory::MemoryRecord;
use crate::memory::emotional::has_emotion_tag;
use crate::similarity::pairwise_affinity;
use crate::types::MemoryId;

const RECENCY_SCALE_DAYS: f64 = 30.0;
const FREQUENCY_SATURATION: f32 = 100.0;
const CONNECTIVITY_SATURATION: f32 = 20.0;
const EMOTIONAL_TAG_SCORE: f32 = 0.8;
const SELF_ATTENTION_WEIGHT: f32 = 0.1;
const SELF_ATTENTION_HALF_LIFE_SECS: f64 = 48.0 * 3600.0;

/// Computes attention scores and folds them into importance.
#[derive(Debug, Clone)]
pub struct AttentionMechanism {
    config: AttentionConfig,
}

impl AttentionMechanism {
    /// Create a mechanism with the given weights and blend factor.
    #[must_use]
    pub fn new(config: AttentionConfig) -> Self {
        Self { config }
    }

    /// Composite attention score for one record, in [0, 1].
    ///
    /// `association_count` is the record's degree in the association
    /// graph; when the caller has no graph at hand, the entity/tag
    /// count stands in for connectivity.
    #[must_use]
    pub fn score(
        &self,
        record: &MemoryRecord,
        now: DateTime<Utc>,
        association_count: Option<usize>,
    ) -> f32 {
        let w = &self.config;
        let total_weight = w.recency_weight
            + w.frequency_weight
            + w.connectivity_weight
            + w.emotional_weight
            + w.interaction_weight;
        if total_weight <= 0.0 {
            return 0.0;
        }

        let age_days =
            (now - record.metadata.created_at).num_seconds().max(0) as f64 / 86_400.0;
        let recency = (-age_days / RECENCY_SCALE_DAYS).exp() as f32;

        let frequency = ((record.metadata.access_count as f32 + 1.0).ln()
            / FREQUENCY_SATURATION.ln())
        .min(1.0);

        let connectivity = match association_count {
            Some(count) => {
                ((count as f32 + 1.0).ln() / CONNECTIVITY_SATURATION.ln()).min(1.0)
            }
            None => {
                let surface =
                    record.metadata.entity_refs.len() + record.metadata.tags.len();
                (surface as f32 / 10.0).min(1.0)
            }
        };

        let emotional = if has_emotion_tag(&record.metadata.tags) {
            EMOTIONAL_TAG_SCORE
        } else {
            record.metadata.importance * 0.5
        };

        let lifetime = (now - record.metadata.created_at).num_seconds();
        let interaction = if lifetime <= 0 {
            0.0
        } else {
            let idle = (now - record.metadata.last_accessed_at).num_seconds().max(0);
            (1.0 - idle as f32 / lifetime as f32).max(0.0)
        };

        let weighted = w.recency_weight * recency
            + w.frequency_weight * frequency
            + w.connectivity_weight * connectivity
            + w.emotional_weight * emotional
            + w.interaction_weight * interaction;
        (weighted / total_weight).clamp(0.0, 1.0)
    }

    /// Score a whole batch. When self-attention is enabled, each
    /// record's mean pairwise affinity against the rest of the batch is
    /// folded in as a small additive term, capped at 1.0.
    #[must_use]
    pub fn score_batch<F>(
        &self,
        records: &[MemoryRecord],
        now: DateTime<Utc>,
        association_count_of: F,
    ) -> Vec<(MemoryId, f32)>
    where
        F: Fn(&MemoryId) -> Option<usize>,
    {
        records
            .iter()
            .map(|record| {
                let mut score = self.score(record, now, association_count_of(&record.id));
                if self.config.self_attention && records.len() > 1 {
                    let affinity_sum: f32 = records
                        .iter()
                        .filter(|other| other.id != record.id)
                        .map(|other| {
                            pairwise_affinity(
                                record,
                                other,
                                0.4,
                                0.3,
                                0.1,
                                0.2,
                                SELF_ATTENTION_HALF_LIFE_SECS,
                            )
                        })
                        .sum();
                    let self_attention = affinity_sum / (records.len() - 1) as f32;
                    score = (score + self_attention * SELF_ATTENTION_WEIGHT).min(1.0);
                }
                (record.id.clone(), score)
            })
            .collect()
    }

    /// Blend an attention score into a record's stored importance:
    /// `importance' = importance×(1−β) + score×β`, clamped to [0, 1].
    pub fn apply_to_importance(&self, record: &mut MemoryRecord, score: f32) {
        let beta = self.config.blend_factor.clamp(0.0, 1.0);
        record.metadata.importance =
            (record.metadata.importance * (1.0 - beta) + score * beta).clamp(0.0, 1.0);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
