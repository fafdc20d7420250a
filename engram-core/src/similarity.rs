//! Shared similarity primitives used by association formation,
//! retrieval scoring, diversity re-ranking, and attention.

use std::collections::HashSet;

use crate::memory::MemoryRecord;
use crate::types::EntityRef;

/// Jaccard overlap of two entity lists, in [0, 1].
#[must_use]
pub fn jaccard_entities(a: &[EntityRef], b: &[EntityRef]) -> f32 {
    let left: HashSet<&EntityRef> = a.iter().collect();
    let right: HashSet<&EntityRef> = b.iter().collect();
    jaccard(&left, &right)
}

/// Jaccard overlap of two tag lists (case-folded), in [0, 1].
#[must_use]
pub fn jaccard_tags(a: &[String], b: &[String]) -> f32 {
    let left: HashSet<String> = a.iter().map(|t| t.to_lowercase()).collect();
    let right: HashSet<String> = b.iter().map(|t| t.to_lowercase()).collect();
    jaccard(&left.iter().collect(), &right.iter().collect())
}

fn jaccard<T: std::hash::Hash + Eq>(left: &HashSet<T>, right: &HashSet<T>) -> f32 {
    if left.is_empty() && right.is_empty() {
        return 0.0;
    }
    let intersection = left.intersection(right).count();
    let union = left.union(right).count();
    intersection as f32 / union as f32
}

/// Token-level overlap of two texts: the fraction of the smaller
/// token set shared with the larger, in [0, 1].
#[must_use]
pub fn text_overlap(a: &str, b: &str) -> f32 {
    let left: HashSet<String> = tokens(a);
    let right: HashSet<String> = tokens(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    shared as f32 / left.len().min(right.len()) as f32
}

fn tokens(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|t| {
            t.to_lowercase()
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_string()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

/// Exponential decay with the given half-life: 1.0 at age 0, 0.5 at
/// one half-life, and so on.
#[must_use]
pub fn half_life_decay(age_secs: f64, half_life_secs: f64) -> f32 {
    if half_life_secs <= 0.0 {
        return 0.0;
    }
    (-(std::f64::consts::LN_2) * age_secs.max(0.0) / half_life_secs).exp() as f32
}

/// Pairwise affinity of two records: the weighted blend of entity
/// overlap, tag overlap, kind match, and temporal proximity used by
/// associative retrieval and self-attention.
#[must_use]
pub fn pairwise_affinity(
    a: &MemoryRecord,
    b: &MemoryRecord,
    w_entity: f32,
    w_tag: f32,
    w_kind: f32,
    w_temporal: f32,
    temporal_half_life_secs: f64,
) -> f32 {
    let entity = jaccard_entities(&a.metadata.entity_refs, &b.metadata.entity_refs);
    let tag = jaccard_tags(&a.metadata.tags, &b.metadata.tags);
    let kind = if a.kind() == b.kind() { 1.0 } else { 0.0 };
    let age = (a.metadata.created_at - b.metadata.created_at)
        .num_seconds()
        .unsigned_abs() as f64;
    let temporal = half_life_decay(age, temporal_half_life_secs);

    let total = w_entity + w_tag + w_kind + w_temporal;
    if total <= 0.0 {
        return 0.0;
    }
    (w_entity * entity + w_tag * tag + w_kind * kind + w_temporal * temporal) / total
}

/// Overlap heuristic used by diversity re-ranking: the mean of kind
/// match, tag overlap, and entity overlap.
#[must_use]
pub fn record_similarity(a: &MemoryRecord, b: &MemoryRecord) -> f32 {
    let kind = if a.kind() == b.kind() { 1.0 } else { 0.0 };
    let tag = jaccard_tags(&a.metadata.tags, &b.metadata.tags);
    let entity = jaccard_entities(&a.metadata.entity_refs, &b.metadata.entity_refs);
    (kind + tag + entity) / 3.0
}
