//! Association engine — forms, reinforces, and traverses links.
//!
//! For every newly stored record the engine compares it against the
//! existing corpus through five pairwise signals; only the strongest
//! signal for a pair is persisted as an edge, and only when it clears
//! the similarity threshold. Spreading activation and clustering read
//! the resulting graph.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::AssociationConfig;
use crate::graph::AssociationGraph;
use crate::memory::{MemoryContent, MemoryRecord};
use crate::similarity::{jaccard_entities, jaccard_tags};
use crate::storage::MemoryStore;
use crate::types::{AssociationKind, MemoryId};

/// Forms and maintains associations between memories.
#[derive(Debug, Clone)]
pub struct AssociationEngine {
    config: AssociationConfig,
}

impl AssociationEngine {
    /// Create an engine with the given configuration.
    #[must_use]
    pub fn new(config: AssociationConfig) -> Self {
        Self { config }
    }

    // -- signal computation --------------------------------------------------

    /// The strongest of the five pairwise signals between two records,
    /// or `None` when every signal is zero.
    ///
    /// Signals: entity co-occurrence (Jaccard), topic similarity
    /// (Jaccard), temporal proximity (linear falloff inside the
    /// configured window), emotional similarity (emotional pairs only),
    /// and explicit reference (hard 1.0 when one record's content
    /// mentions the other's id).
    #[must_use]
    pub fn strongest_signal(
        &self,
        a: &MemoryRecord,
        b: &MemoryRecord,
    ) -> Option<(AssociationKind, f32)> {
        let mut best: Option<(AssociationKind, f32)> = None;
        let mut consider = |kind: AssociationKind, strength: f32| {
            if strength > 0.0 && best.is_none_or(|(_, s)| strength > s) {
                best = Some((kind, strength));
            }
        };

        consider(
            AssociationKind::SharedEntity,
            jaccard_entities(&a.metadata.entity_refs, &b.metadata.entity_refs),
        );
        consider(
            AssociationKind::SharedTopic,
            jaccard_tags(&a.metadata.tags, &b.metadata.tags),
        );
        consider(AssociationKind::Temporal, self.temporal_proximity(a, b));

        if let (MemoryContent::Emotional(left), MemoryContent::Emotional(right)) =
            (&a.content, &b.content)
        {
            consider(AssociationKind::Emotional, left.similarity(right));
        }

        if a.content.references(&b.id) || b.content.references(&a.id) {
            consider(AssociationKind::Reference, 1.0);
        }

        best
    }

    /// Linear temporal proximity: 1.0 for simultaneous records, falling
    /// to 0.0 at the edge of the configured window.
    fn temporal_proximity(&self, a: &MemoryRecord, b: &MemoryRecord) -> f32 {
        let window = self.config.temporal_window_secs as f64;
        if window <= 0.0 {
            return 0.0;
        }
        let delta = (a.metadata.created_at - b.metadata.created_at)
            .num_seconds()
            .unsigned_abs() as f64;
        (1.0 - delta / window).max(0.0) as f32
    }

    // -- formation -----------------------------------------------------------

    /// Form edges from a newly stored record to the existing corpus.
    ///
    /// Comparison stops once the new record holds the configured maximum
    /// number of edges. Returns the number of edges formed.
    pub fn associate_new(
        &self,
        record: &MemoryRecord,
        store: &MemoryStore,
        graph: &mut AssociationGraph,
        now: DateTime<Utc>,
    ) -> usize {
        let mut formed = 0;
        for other in store.iter() {
            if other.id == record.id {
                continue;
            }
            if graph.degree(&record.id) >= self.config.max_associations_per_memory {
                break;
            }
            if let Some((kind, strength)) = self.strongest_signal(record, other) {
                if strength >= self.config.min_similarity_threshold
                    && graph.add_association(
                        record.id.clone(),
                        other.id.clone(),
                        kind,
                        strength,
                        now,
                    )
                {
                    formed += 1;
                }
            }
        }
        if formed > 0 {
            debug!(id = %record.id, formed, "associations formed");
        }
        formed
    }

    /// Reinforce every existing pairwise edge among a co-retrieved set
    /// by the configured increment. Missing edges are not created.
    /// Returns the number of edges reinforced.
    pub fn reinforce_coactivation(
        &self,
        ids: &[MemoryId],
        graph: &mut AssociationGraph,
    ) -> usize {
        let delta = self.config.coactivation_increment;
        let mut reinforced = 0;
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                if graph.reinforce_association(&ids[i], &ids[j], delta) {
                    reinforced += 1;
                }
                if graph.reinforce_association(&ids[j], &ids[i], delta) {
                    reinforced += 1;
                }
            }
        }
        reinforced
    }

    // -- traversal -----------------------------------------------------------

    /// Spread activation outward from `source` along outgoing edges.
    ///
    /// Each hop injects `previous × decay_factor`; a reached node keeps
    /// the strongest activation among all paths into it
    /// (`max(existing, injected × edge_strength)`), not a cumulative
    /// sum. The source itself is reported at 1.0.
    #[must_use]
    pub fn spread_activation(
        &self,
        graph: &AssociationGraph,
        source: &MemoryId,
        max_hops: usize,
        decay_factor: f32,
    ) -> HashMap<MemoryId, f32> {
        let mut activation: HashMap<MemoryId, f32> = HashMap::new();
        activation.insert(source.clone(), 1.0);

        let mut queue: std::collections::VecDeque<(MemoryId, usize)> =
            std::collections::VecDeque::new();
        queue.push_back((source.clone(), 0));
        while let Some((node, hops)) = queue.pop_front() {
            if hops >= max_hops {
                continue;
            }
            let current = activation.get(&node).copied().unwrap_or(0.0);
            let injected = current * decay_factor;
            for edge in graph.get_outgoing(&node) {
                let incoming = injected * edge.strength;
                let existing = activation.get(&edge.target).copied().unwrap_or(0.0);
                if incoming > existing {
                    activation.insert(edge.target.clone(), incoming);
                    queue.push_back((edge.target.clone(), hops + 1));
                }
            }
        }
        activation
    }

    /// Group memories connected by strong *mutual* edges: both
    /// directions present at or above `min_strength`. Union-find over
    /// those pairs; only groups of two or more are returned.
    #[must_use]
    pub fn find_clusters(
        &self,
        graph: &AssociationGraph,
        min_strength: f32,
    ) -> Vec<Vec<MemoryId>> {
        // Collect mutual strong pairs.
        let mut members: Vec<MemoryId> = Vec::new();
        let mut index_of: HashMap<MemoryId, usize> = HashMap::new();
        let mut pairs: Vec<(usize, usize)> = Vec::new();

        let mut intern = |id: &MemoryId, members: &mut Vec<MemoryId>,
                          index_of: &mut HashMap<MemoryId, usize>| {
            *index_of.entry(id.clone()).or_insert_with(|| {
                members.push(id.clone());
                members.len() - 1
            })
        };

        let mut seen: HashMap<(MemoryId, MemoryId), ()> = HashMap::new();
        for id in graph.source_ids() {
            for edge in graph.get_outgoing(&id) {
                if edge.strength < min_strength {
                    continue;
                }
                let reverse_strong = graph
                    .get_outgoing(&edge.target)
                    .iter()
                    .any(|back| back.target == id && back.strength >= min_strength);
                if !reverse_strong {
                    continue;
                }
                let key = if id < edge.target {
                    (id.clone(), edge.target.clone())
                } else {
                    (edge.target.clone(), id.clone())
                };
                if seen.insert(key, ()).is_some() {
                    continue;
                }
                let a = intern(&id, &mut members, &mut index_of);
                let b = intern(&edge.target, &mut members, &mut index_of);
                pairs.push((a, b));
            }
        }

        // Union-find over the pairs.
        let mut parent: Vec<usize> = (0..members.len()).collect();
        fn find(parent: &mut Vec<usize>, x: usize) -> usize {
            if parent[x] != x {
                let root = find(parent, parent[x]);
                parent[x] = root;
            }
            parent[x]
        }
        for (a, b) in pairs {
            let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
            if ra != rb {
                parent[ra] = rb;
            }
        }

        let mut clusters: HashMap<usize, Vec<MemoryId>> = HashMap::new();
        for (i, id) in members.iter().enumerate() {
            let root = find(&mut parent, i);
            clusters.entry(root).or_default().push(id.clone());
        }
        let mut result: Vec<Vec<MemoryId>> = clusters
            .into_values()
            .filter(|c| c.len() >= 2)
            .collect();
        for cluster in &mut result {
            cluster.sort();
        }
        result.sort();
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
