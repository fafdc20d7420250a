//! Pattern miner — batch frequent-pattern detection over the corpus.
//!
//! Five independent, stateless miners: entity co-occurrence, topic
//! clusters, temporal sequences, emotional transition cycles, and
//! time-of-day behavior. Results accumulate in a map keyed by pattern
//! id; re-running a miner overwrites its previous findings and nothing
//! is pruned automatically — patterns are derived data, regenerated at
//! will.

use std::collections::HashMap;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PatternConfig;
use crate::memory::{MemoryContent, MemoryRecord};
use crate::types::{EntityRef, MemoryId};

// ---------------------------------------------------------------------------
// Pattern model
// ---------------------------------------------------------------------------

/// The five mined pattern families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Two entities that keep appearing together.
    EntityCooccurrence,
    /// A recurring exact tag combination.
    TopicCluster,
    /// Episodic events that follow each other within a window.
    TemporalSequence,
    /// A recurring emotion-to-emotion transition.
    EmotionalCycle,
    /// A busy hour of the day.
    Behavioral,
}

/// Kind-specific payload of a detected pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatternData {
    /// The co-occurring entity pair.
    EntityPair {
        /// First entity (lexicographically smaller).
        a: EntityRef,
        /// Second entity.
        b: EntityRef,
    },
    /// The recurring tag set.
    Topics {
        /// Sorted tags forming the cluster key.
        tags: Vec<String>,
    },
    /// A recurring event sequence.
    Sequence {
        /// Tags shared by the adjacent events.
        tags: Vec<String>,
        /// Mean gap between adjacent events, in seconds.
        avg_gap_secs: i64,
    },
    /// An emotion transition.
    Transition {
        /// Emotion transitioned from.
        from: String,
        /// Emotion transitioned to.
        to: String,
    },
    /// A busy hour of day.
    TimeOfDay {
        /// Hour of day (0-23, UTC).
        hour: u32,
        /// Coarse label: morning, afternoon, evening, night.
        label: String,
    },
}

/// One mined pattern. Derived, never authoritative: re-running the
/// miner regenerates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedPattern {
    /// Deterministic id; identical findings overwrite on re-run.
    pub id: String,
    /// Pattern family.
    pub kind: PatternKind,
    /// Human-readable summary.
    pub description: String,
    /// Records/occurrences exhibiting the pattern.
    pub support: usize,
    /// Support relative to the population, in [0, 1].
    pub confidence: f32,
    /// Contributing record ids.
    pub memory_ids: Vec<MemoryId>,
    /// Kind-specific payload.
    pub data: PatternData,
    /// When this run detected the pattern.
    pub detected_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Miner
// ---------------------------------------------------------------------------

/// Accumulating batch pattern miner.
#[derive(Debug)]
pub struct PatternMiner {
    config: PatternConfig,
    patterns: HashMap<String, DetectedPattern>,
}

impl PatternMiner {
    /// Create a miner with the given thresholds.
    #[must_use]
    pub fn new(config: PatternConfig) -> Self {
        Self {
            config,
            patterns: HashMap::new(),
        }
    }

    /// Run all five miners over `records`, folding results into the
    /// accumulated map. Returns the number of patterns found this run.
    pub fn mine_all(&mut self, records: &[MemoryRecord], now: DateTime<Utc>) -> usize {
        let mut found = Vec::new();
        found.extend(self.mine_entity_cooccurrence(records, now));
        found.extend(self.mine_topic_clusters(records, now));
        found.extend(self.mine_temporal_sequences(records, now));
        found.extend(self.mine_emotional_cycles(records, now));
        found.extend(self.mine_behavioral(records, now));

        let count = found.len();
        for pattern in found {
            self.patterns.insert(pattern.id.clone(), pattern);
        }
        count
    }

    /// Entity pairs appearing together in at least `min_support` records.
    #[must_use]
    pub fn mine_entity_cooccurrence(
        &self,
        records: &[MemoryRecord],
        now: DateTime<Utc>,
    ) -> Vec<DetectedPattern> {
        let total = records.len().max(1);
        let mut pairs: HashMap<(EntityRef, EntityRef), Vec<MemoryId>> = HashMap::new();

        for record in records {
            let entities = &record.metadata.entity_refs;
            for i in 0..entities.len() {
                for j in (i + 1)..entities.len() {
                    let key = if entities[i] <= entities[j] {
                        (entities[i].clone(), entities[j].clone())
                    } else {
                        (entities[j].clone(), entities[i].clone())
                    };
                    pairs.entry(key).or_default().push(record.id.clone());
                }
            }
        }

        pairs
            .into_iter()
            .filter(|(_, ids)| ids.len() >= self.config.min_support)
            .map(|((a, b), ids)| DetectedPattern {
                id: format!("entity_cooccurrence:{a}+{b}"),
                kind: PatternKind::EntityCooccurrence,
                description: format!("{a} and {b} appear together in {} memories", ids.len()),
                support: ids.len(),
                confidence: ids.len() as f32 / total as f32,
                memory_ids: ids,
                data: PatternData::EntityPair { a, b },
                detected_at: now,
            })
            .collect()
    }

    /// Records sharing an exact (sorted, folded) tag combination.
    #[must_use]
    pub fn mine_topic_clusters(
        &self,
        records: &[MemoryRecord],
        now: DateTime<Utc>,
    ) -> Vec<DetectedPattern> {
        let total = records.len().max(1);
        let mut clusters: HashMap<Vec<String>, Vec<MemoryId>> = HashMap::new();

        for record in records {
            if record.metadata.tags.is_empty() {
                continue;
            }
            let mut key: Vec<String> = record
                .metadata
                .tags
                .iter()
                .map(|t| t.to_lowercase())
                .collect();
            key.sort();
            key.dedup();
            clusters.entry(key).or_default().push(record.id.clone());
        }

        clusters
            .into_iter()
            .filter(|(_, ids)| ids.len() >= self.config.min_support)
            .map(|(tags, ids)| DetectedPattern {
                id: format!("topic_cluster:{}", tags.join("+")),
                kind: PatternKind::TopicCluster,
                description: format!(
                    "{} memories share the topic set [{}]",
                    ids.len(),
                    tags.join(", ")
                ),
                support: ids.len(),
                confidence: ids.len() as f32 / total as f32,
                memory_ids: ids,
                data: PatternData::Topics { tags },
                detected_at: now,
            })
            .collect()
    }

    /// Adjacent episodic events within the temporal window that share a
    /// tag, bucketed by the shared-tag combination.
    #[must_use]
    pub fn mine_temporal_sequences(
        &self,
        records: &[MemoryRecord],
        now: DateTime<Utc>,
    ) -> Vec<DetectedPattern> {
        let mut episodic: Vec<&MemoryRecord> = records
            .iter()
            .filter(|r| matches!(r.content, MemoryContent::Episodic(_)))
            .collect();
        episodic.sort_by_key(|r| r.metadata.created_at);

        let window_secs = self.config.temporal_window_secs as i64;
        let mut buckets: HashMap<Vec<String>, (Vec<MemoryId>, Vec<i64>)> = HashMap::new();

        for pair in episodic.windows(2) {
            let (earlier, later) = (pair[0], pair[1]);
            let gap = (later.metadata.created_at - earlier.metadata.created_at).num_seconds();
            if gap > window_secs {
                continue;
            }
            let mut shared: Vec<String> = earlier
                .metadata
                .tags
                .iter()
                .map(|t| t.to_lowercase())
                .filter(|tag| {
                    later
                        .metadata
                        .tags
                        .iter()
                        .any(|other| other.to_lowercase() == *tag)
                })
                .collect();
            if shared.is_empty() {
                continue;
            }
            shared.sort();
            shared.dedup();

            let (ids, gaps) = buckets.entry(shared).or_default();
            ids.push(earlier.id.clone());
            ids.push(later.id.clone());
            gaps.push(gap);
        }

        let total_episodic = episodic.len().max(1);
        buckets
            .into_iter()
            .filter(|(_, (_, gaps))| gaps.len() >= self.config.min_support)
            .map(|(tags, (mut ids, gaps))| {
                ids.dedup();
                let avg_gap_secs = gaps.iter().sum::<i64>() / gaps.len() as i64;
                DetectedPattern {
                    id: format!("temporal_sequence:{}", tags.join("+")),
                    kind: PatternKind::TemporalSequence,
                    description: format!(
                        "events tagged [{}] recur about {avg_gap_secs}s apart",
                        tags.join(", ")
                    ),
                    support: gaps.len(),
                    confidence: (gaps.len() as f32 / total_episodic as f32).min(1.0),
                    memory_ids: ids,
                    data: PatternData::Sequence { tags, avg_gap_secs },
                    detected_at: now,
                }
            })
            .collect()
    }

    /// Recurring transitions between consecutive primary emotions.
    #[must_use]
    pub fn mine_emotional_cycles(
        &self,
        records: &[MemoryRecord],
        now: DateTime<Utc>,
    ) -> Vec<DetectedPattern> {
        let mut emotional: Vec<(&MemoryRecord, &str)> = records
            .iter()
            .filter_map(|r| match &r.content {
                MemoryContent::Emotional(content) => Some((r, content.emotion.as_str())),
                _ => None,
            })
            .collect();
        emotional.sort_by_key(|(r, _)| r.metadata.created_at);

        let mut transitions: HashMap<(String, String), Vec<MemoryId>> = HashMap::new();
        for pair in emotional.windows(2) {
            let ((earlier, from), (later, to)) = (pair[0], pair[1]);
            let key = (from.to_lowercase(), to.to_lowercase());
            let ids = transitions.entry(key).or_default();
            ids.push(earlier.id.clone());
            ids.push(later.id.clone());
        }

        let total_transitions = emotional.len().saturating_sub(1).max(1);
        transitions
            .into_iter()
            .filter(|(_, ids)| ids.len() / 2 >= self.config.min_support)
            .map(|((from, to), mut ids)| {
                ids.dedup();
                let support = ids.len() / 2;
                DetectedPattern {
                    id: format!("emotional_cycle:{from}->{to}"),
                    kind: PatternKind::EmotionalCycle,
                    description: format!("{from} tends to be followed by {to}"),
                    support,
                    confidence: (support as f32 / total_transitions as f32).min(1.0),
                    memory_ids: ids,
                    data: PatternData::Transition { from, to },
                    detected_at: now,
                }
            })
            .collect()
    }

    /// The top three busiest hours of the day meeting the support
    /// threshold.
    #[must_use]
    pub fn mine_behavioral(
        &self,
        records: &[MemoryRecord],
        now: DateTime<Utc>,
    ) -> Vec<DetectedPattern> {
        let total = records.len().max(1);
        let mut hours: HashMap<u32, Vec<MemoryId>> = HashMap::new();
        for record in records {
            hours
                .entry(record.metadata.created_at.hour())
                .or_default()
                .push(record.id.clone());
        }

        let mut busiest: Vec<(u32, Vec<MemoryId>)> = hours
            .into_iter()
            .filter(|(_, ids)| ids.len() >= self.config.min_support)
            .collect();
        busiest.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(&b.0)));
        busiest.truncate(3);

        busiest
            .into_iter()
            .map(|(hour, ids)| {
                let label = time_of_day_label(hour);
                DetectedPattern {
                    id: format!("behavioral:hour_{hour}"),
                    kind: PatternKind::Behavioral,
                    description: format!(
                        "{} memories formed around {hour:02}:00 ({label})",
                        ids.len()
                    ),
                    support: ids.len(),
                    confidence: ids.len() as f32 / total as f32,
                    memory_ids: ids,
                    data: PatternData::TimeOfDay {
                        hour,
                        label: label.to_string(),
                    },
                    detected_at: now,
                }
            })
            .collect()
    }

    /// The accumulated pattern map.
    #[must_use]
    pub fn patterns(&self) -> &HashMap<String, DetectedPattern> {
        &self.patterns
    }

    /// Look up one pattern by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&DetectedPattern> {
        self.patterns.get(id)
    }

    /// Drop every accumulated pattern.
    pub fn clear(&mut self) {
        self.patterns.clear();
    }
}

/// Coarse label for an hour of the day.
fn time_of_day_label(hour: u32) -> &'static str {
    match hour {
        5..=11 => "morning",
        12..=16 => "afternoon",
        17..=21 => "evening",
        _ => "night",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
