//! Association graph — directed weighted links between memories.
//!
//! Edges are keyed by `(source, target, kind)`; an add that matches an
//! existing triple reinforces that edge instead of duplicating it.
//! Both outgoing and incoming adjacency lists are maintained so either
//! endpoint reaches its edges in O(1); every mutation touches both
//! lists to keep the two views identical.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AssociationKind, MemoryId};

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// One directed association between two memories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Association {
    /// Edge source.
    pub source: MemoryId,
    /// Edge target.
    pub target: MemoryId,
    /// Why the memories are linked.
    pub kind: AssociationKind,
    /// Link strength in [0, 1].
    pub strength: f32,
    /// When the edge was first formed.
    pub created_at: DateTime<Utc>,
    /// How many times the edge has been reinforced.
    pub reinforcement_count: u32,
}

/// Aggregate statistics over the graph.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GraphStats {
    /// Number of nodes with at least one edge.
    pub nodes: usize,
    /// Number of directed edges.
    pub edges: usize,
    /// Mean edge strength (0 when empty).
    pub avg_strength: f32,
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// Directed weighted multigraph over memory ids.
#[derive(Debug, Default)]
pub struct AssociationGraph {
    outgoing: HashMap<MemoryId, Vec<Association>>,
    incoming: HashMap<MemoryId, Vec<Association>>,
}

impl AssociationGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge `source → target` of `kind` with the given strength.
    ///
    /// Self-edges are ignored. If the `(source, target, kind)` triple
    /// already exists, the existing edge is reinforced instead: its
    /// strength becomes the max of old and new (capped at 1.0) and its
    /// reinforcement count grows. Returns `true` when a new edge was
    /// created.
    pub fn add_association(
        &mut self,
        source: MemoryId,
        target: MemoryId,
        kind: AssociationKind,
        strength: f32,
        now: DateTime<Utc>,
    ) -> bool {
        if source == target {
            return false;
        }
        let strength = strength.clamp(0.0, 1.0);

        if let Some(edges) = self.outgoing.get_mut(&source) {
            if let Some(edge) = edges
                .iter_mut()
                .find(|e| e.target == target && e.kind == kind)
            {
                edge.strength = edge.strength.max(strength).min(1.0);
                edge.reinforcement_count += 1;
                let (new_strength, new_count) = (edge.strength, edge.reinforcement_count);
                Self::mirror(&mut self.incoming, &target, &source, kind, |mirror| {
                    mirror.strength = new_strength;
                    mirror.reinforcement_count = new_count;
                });
                return false;
            }
        }

        let edge = Association {
            source: source.clone(),
            target: target.clone(),
            kind,
            strength,
            created_at: now,
            reinforcement_count: 0,
        };
        self.outgoing.entry(source).or_default().push(edge.clone());
        self.incoming.entry(target).or_default().push(edge);
        true
    }

    /// Apply `f` to the incoming-side copy of the `(source, target, kind)`
    /// edge, keeping the two adjacency views identical.
    fn mirror<F>(
        incoming: &mut HashMap<MemoryId, Vec<Association>>,
        target: &MemoryId,
        source: &MemoryId,
        kind: AssociationKind,
        f: F,
    ) where
        F: FnOnce(&mut Association),
    {
        if let Some(edges) = incoming.get_mut(target) {
            if let Some(edge) = edges
                .iter_mut()
                .find(|e| &e.source == source && e.kind == kind)
            {
                f(edge);
            }
        }
    }

    /// Edges leaving `id`.
    #[must_use]
    pub fn get_outgoing(&self, id: &MemoryId) -> &[Association] {
        self.outgoing.get(id).map_or(&[], Vec::as_slice)
    }

    /// Edges arriving at `id`.
    #[must_use]
    pub fn get_incoming(&self, id: &MemoryId) -> &[Association] {
        self.incoming.get(id).map_or(&[], Vec::as_slice)
    }

    /// All edges touching `id`, outgoing first.
    #[must_use]
    pub fn get_all(&self, id: &MemoryId) -> Vec<&Association> {
        self.get_outgoing(id)
            .iter()
            .chain(self.get_incoming(id).iter())
            .collect()
    }

    /// Number of edges touching `id` in either direction.
    #[must_use]
    pub fn degree(&self, id: &MemoryId) -> usize {
        self.get_outgoing(id).len() + self.get_incoming(id).len()
    }

    /// Every edge of the given kind.
    #[must_use]
    pub fn get_by_kind(&self, kind: AssociationKind) -> Vec<&Association> {
        self.outgoing
            .values()
            .flatten()
            .filter(|e| e.kind == kind)
            .collect()
    }

    /// Neighbor ids (either direction) connected at or above
    /// `min_strength`, deduplicated.
    #[must_use]
    pub fn get_strongly_associated(&self, id: &MemoryId, min_strength: f32) -> Vec<MemoryId> {
        let mut neighbors: HashSet<MemoryId> = HashSet::new();
        for edge in self.get_outgoing(id) {
            if edge.strength >= min_strength {
                neighbors.insert(edge.target.clone());
            }
        }
        for edge in self.get_incoming(id) {
            if edge.strength >= min_strength {
                neighbors.insert(edge.source.clone());
            }
        }
        neighbors.into_iter().collect()
    }

    /// Shortest path (by hop count) from `start` to `end` over outgoing
    /// edges, at most `max_depth` hops. Returns the node sequence
    /// including both endpoints, or `None` if unreachable.
    #[must_use]
    pub fn find_path(
        &self,
        start: &MemoryId,
        end: &MemoryId,
        max_depth: usize,
    ) -> Option<Vec<MemoryId>> {
        if start == end {
            return Some(vec![start.clone()]);
        }

        let mut parents: HashMap<MemoryId, MemoryId> = HashMap::new();
        let mut queue: VecDeque<(MemoryId, usize)> = VecDeque::new();
        queue.push_back((start.clone(), 0));

        while let Some((node, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for edge in self.get_outgoing(&node) {
                if edge.target == *start || parents.contains_key(&edge.target) {
                    continue;
                }
                parents.insert(edge.target.clone(), node.clone());
                if edge.target == *end {
                    // Reconstruct by walking parents back to the start.
                    let mut path = vec![end.clone()];
                    let mut cursor = node;
                    while cursor != *start {
                        path.push(cursor.clone());
                        cursor = parents[&cursor].clone();
                    }
                    path.push(start.clone());
                    path.reverse();
                    return Some(path);
                }
                queue.push_back((edge.target.clone(), depth + 1));
            }
        }
        None
    }

    /// The union of all ids reachable from `id` within `hops` steps,
    /// following edges in both directions, excluding `id` itself.
    #[must_use]
    pub fn get_neighborhood(&self, id: &MemoryId, hops: usize) -> HashSet<MemoryId> {
        let mut visited: HashSet<MemoryId> = HashSet::new();
        let mut frontier: Vec<MemoryId> = vec![id.clone()];

        for _ in 0..hops {
            let mut next: Vec<MemoryId> = Vec::new();
            for node in &frontier {
                for edge in self.get_outgoing(node) {
                    if edge.target != *id && visited.insert(edge.target.clone()) {
                        next.push(edge.target.clone());
                    }
                }
                for edge in self.get_incoming(node) {
                    if edge.source != *id && visited.insert(edge.source.clone()) {
                        next.push(edge.source.clone());
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        visited
    }

    /// Strengthen the first outgoing edge `source → target` (any kind)
    /// by `delta`, capped at 1.0. Returns `false` without creating
    /// anything if no such edge exists.
    pub fn reinforce_association(
        &mut self,
        source: &MemoryId,
        target: &MemoryId,
        delta: f32,
    ) -> bool {
        let Some(edges) = self.outgoing.get_mut(source) else {
            return false;
        };
        let Some(edge) = edges.iter_mut().find(|e| &e.target == target) else {
            return false;
        };
        edge.strength = (edge.strength + delta).clamp(0.0, 1.0);
        edge.reinforcement_count += 1;
        let (kind, new_strength, new_count) =
            (edge.kind, edge.strength, edge.reinforcement_count);
        Self::mirror(&mut self.incoming, target, source, kind, |mirror| {
            mirror.strength = new_strength;
            mirror.reinforcement_count = new_count;
        });
        true
    }

    /// Multiply every edge strength by `(1 - rate)`.
    pub fn apply_decay(&mut self, rate: f32) {
        let factor = 1.0 - rate.clamp(0.0, 1.0);
        for edges in self.outgoing.values_mut() {
            for edge in edges {
                edge.strength = (edge.strength * factor).clamp(0.0, 1.0);
            }
        }
        for edges in self.incoming.values_mut() {
            for edge in edges {
                edge.strength = (edge.strength * factor).clamp(0.0, 1.0);
            }
        }
    }

    /// Remove edges weaker than `threshold` from both adjacency
    /// directions. Returns the number of edges removed.
    pub fn prune_weak(&mut self, threshold: f32) -> usize {
        let mut removed = 0;
        self.outgoing.retain(|_, edges| {
            let before = edges.len();
            edges.retain(|e| e.strength >= threshold);
            removed += before - edges.len();
            !edges.is_empty()
        });
        self.incoming.retain(|_, edges| {
            edges.retain(|e| e.strength >= threshold);
            !edges.is_empty()
        });
        removed
    }

    /// Remove a memory from the graph entirely: its own adjacency lists
    /// and every edge elsewhere referencing it as source or target.
    pub fn remove_memory(&mut self, id: &MemoryId) {
        self.outgoing.remove(id);
        self.incoming.remove(id);
        self.outgoing.retain(|_, edges| {
            edges.retain(|e| &e.source != id && &e.target != id);
            !edges.is_empty()
        });
        self.incoming.retain(|_, edges| {
            edges.retain(|e| &e.source != id && &e.target != id);
            !edges.is_empty()
        });
    }

    /// Ids with at least one outgoing edge.
    #[must_use]
    pub fn source_ids(&self) -> Vec<MemoryId> {
        self.outgoing.keys().cloned().collect()
    }

    /// Total number of directed edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(Vec::len).sum()
    }

    /// Whether any edge references `id`.
    #[must_use]
    pub fn touches(&self, id: &MemoryId) -> bool {
        self.outgoing
            .values()
            .flatten()
            .chain(self.incoming.values().flatten())
            .any(|e| &e.source == id || &e.target == id)
    }

    /// Drop every edge.
    pub fn clear(&mut self) {
        self.outgoing.clear();
        self.incoming.clear();
    }

    /// Aggregate statistics.
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        let edges = self.edge_count();
        let strength_sum: f32 = self
            .outgoing
            .values()
            .flatten()
            .map(|e| e.strength)
            .sum();
        let mut nodes: HashSet<&MemoryId> = HashSet::new();
        for edge in self.outgoing.values().flatten() {
            nodes.insert(&edge.source);
            nodes.insert(&edge.target);
        }
        GraphStats {
            nodes: nodes.len(),
            edges,
            avg_strength: if edges == 0 {
                0.0
            } else {
                strength_sum / edges as f32
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("timestamp")
    }

    fn id(s: &str) -> MemoryId {
        MemoryId::from(s)
    }

    fn graph_with_chain() -> AssociationGraph {
        // a → b → c → d
        let mut graph = AssociationGraph::new();
        graph.add_association(id("a"), id("b"), AssociationKind::SharedEntity, 0.8, ts(0));
        graph.add_association(id("b"), id("c"), AssociationKind::SharedTopic, 0.6, ts(0));
        graph.add_association(id("c"), id("d"), AssociationKind::Temporal, 0.4, ts(0));
        graph
    }

    #[test]
    fn duplicate_triple_reinforces_instead_of_duplicating() {
        let mut graph = AssociationGraph::new();
        assert!(graph.add_association(id("a"), id("b"), AssociationKind::SharedTopic, 0.3, ts(0)));
        assert!(!graph.add_association(id("a"), id("b"), AssociationKind::SharedTopic, 0.5, ts(1)));

        assert_eq!(graph.edge_count(), 1);
        let edge = &graph.get_outgoing(&id("a"))[0];
        assert!((edge.strength - 0.5).abs() < 1e-6);
        assert_eq!(edge.reinforcement_count, 1);

        // different kind is a distinct edge
        assert!(graph.add_association(id("a"), id("b"), AssociationKind::Temporal, 0.2, ts(2)));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn incoming_view_mirrors_outgoing() {
        let mut graph = AssociationGraph::new();
        graph.add_association(id("a"), id("b"), AssociationKind::SharedEntity, 0.7, ts(0));

        assert_eq!(graph.get_outgoing(&id("a")).len(), 1);
        assert_eq!(graph.get_incoming(&id("b")).len(), 1);
        assert_eq!(graph.get_incoming(&id("b"))[0].source, id("a"));

        graph.reinforce_association(&id("a"), &id("b"), 0.2);
        assert!((graph.get_incoming(&id("b"))[0].strength - 0.9).abs() < 1e-6);
    }

    #[test]
    fn reinforcing_a_missing_edge_creates_nothing() {
        let mut graph = AssociationGraph::new();
        assert!(!graph.reinforce_association(&id("a"), &id("b"), 0.5));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn find_path_returns_shortest_by_hops() {
        let mut graph = graph_with_chain();
        // shortcut a → c
        graph.add_association(id("a"), id("c"), AssociationKind::Reference, 0.9, ts(0));

        let path = graph.find_path(&id("a"), &id("d"), 5).expect("path");
        assert_eq!(path, vec![id("a"), id("c"), id("d")]);
    }

    #[test]
    fn find_path_respects_max_depth() {
        let graph = graph_with_chain();
        assert!(graph.find_path(&id("a"), &id("d"), 3).is_some());
        assert!(graph.find_path(&id("a"), &id("d"), 2).is_none());
    }

    #[test]
    fn find_path_is_directional() {
        let graph = graph_with_chain();
        assert!(graph.find_path(&id("d"), &id("a"), 5).is_none());
    }

    #[test]
    fn neighborhood_spans_both_directions_and_excludes_origin() {
        let graph = graph_with_chain();

        let one_hop = graph.get_neighborhood(&id("b"), 1);
        assert!(one_hop.contains(&id("a")));
        assert!(one_hop.contains(&id("c")));
        assert!(!one_hop.contains(&id("b")));
        assert_eq!(one_hop.len(), 2);

        let two_hops = graph.get_neighborhood(&id("b"), 2);
        assert!(two_hops.contains(&id("d")));
        assert_eq!(two_hops.len(), 3);
    }

    #[test]
    fn strongly_associated_filters_by_strength() {
        let graph = graph_with_chain();
        let strong = graph.get_strongly_associated(&id("b"), 0.7);
        assert_eq!(strong, vec![id("a")]);

        let all = graph.get_strongly_associated(&id("b"), 0.0);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn decay_shrinks_and_prune_removes() {
        let mut graph = graph_with_chain();
        graph.apply_decay(0.5);

        let strengths: Vec<f32> = graph
            .get_outgoing(&id("a"))
            .iter()
            .map(|e| e.strength)
            .collect();
        assert!((strengths[0] - 0.4).abs() < 1e-6);

        // decayed strengths are 0.4, 0.3, 0.2 — only the last is weak
        let removed = graph.prune_weak(0.25);
        assert_eq!(removed, 1);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn decay_zero_is_a_noop() {
        let mut graph = graph_with_chain();
        let before: Vec<f32> = graph.get_outgoing(&id("a")).iter().map(|e| e.strength).collect();
        graph.apply_decay(0.0);
        let after: Vec<f32> = graph.get_outgoing(&id("a")).iter().map(|e| e.strength).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn remove_memory_strips_every_reference() {
        let mut graph = graph_with_chain();
        graph.add_association(id("d"), id("b"), AssociationKind::Emotional, 0.5, ts(0));

        graph.remove_memory(&id("b"));

        assert!(!graph.touches(&id("b")));
        assert!(graph.get_outgoing(&id("b")).is_empty());
        assert!(graph.get_incoming(&id("b")).is_empty());
        // unrelated edge survives
        assert_eq!(graph.get_outgoing(&id("c")).len(), 1);
    }

    #[test]
    fn stats_counts_nodes_and_edges() {
        let graph = graph_with_chain();
        let stats = graph.stats();
        assert_eq!(stats.edges, 3);
        assert_eq!(stats.nodes, 4);
        assert!(stats.avg_strength > 0.0);
    }
}
