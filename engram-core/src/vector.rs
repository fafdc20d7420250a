//! Vector similarity index — the optional fifth index.
//!
//! Maps memory ids to embeddings and answers cosine-similarity top-k
//! queries with a minimum-similarity cutoff. Small collections are
//! scanned brute-force; past a build threshold the index constructs an
//! HNSW graph (`instant-distance`) for approximate search.
//!
//! Embeddings come from an injected [`EmbeddingProvider`]; without one,
//! the deterministic hashed bag-of-words fallback is used. Recent
//! text→embedding results are memoized in an LRU cache.

use std::num::NonZeroUsize;

use instant_distance::{Builder, HnswMap, Point, Search};
use lru::LruCache;

use crate::config::EmbeddingConfig;
use crate::embedding::{Embedding, EmbeddingProvider, HashedBagOfWordsProvider};
use crate::error::Result;
use crate::memory::MemoryRecord;
use crate::types::MemoryId;

// ---------------------------------------------------------------------------
// Point adapter
// ---------------------------------------------------------------------------

/// A point in the index, normalized so cosine distance is a dot product.
#[derive(Clone, Debug)]
struct VectorPoint {
    normalized: Vec<f32>,
}

impl VectorPoint {
    fn from_embedding(embedding: &Embedding) -> Self {
        let norm = embedding
            .0
            .iter()
            .map(|x| x * x)
            .sum::<f32>()
            .sqrt()
            .max(f32::EPSILON);
        Self {
            normalized: embedding.0.iter().map(|x| x / norm).collect(),
        }
    }
}

impl Point for VectorPoint {
    /// Cosine distance = 1 - cosine similarity.
    fn distance(&self, other: &Self) -> f32 {
        if self.normalized.len() != other.normalized.len() {
            return 1.0;
        }
        let dot: f32 = self
            .normalized
            .iter()
            .zip(other.normalized.iter())
            .map(|(a, b)| a * b)
            .sum();
        (1.0 - dot).max(0.0)
    }
}

// ---------------------------------------------------------------------------
// Results & stats
// ---------------------------------------------------------------------------

/// A single similarity hit.
#[derive(Debug, Clone)]
pub struct VectorHit {
    /// The matching memory id.
    pub id: MemoryId,
    /// Cosine similarity to the query, in [-1, 1].
    pub similarity: f32,
}

/// Statistics about the vector index state.
#[derive(Debug, Clone)]
pub struct VectorIndexStats {
    /// Total number of indexed vectors.
    pub total_points: usize,
    /// Insertions/removals since the last build.
    pub dirty_count: usize,
    /// Whether the HNSW graph has been built.
    pub is_built: bool,
    /// Name of the embedding model in use.
    pub model: String,
}

// ---------------------------------------------------------------------------
// VectorIndex
// ---------------------------------------------------------------------------

/// Cosine-similarity index over memory embeddings.
pub struct VectorIndex {
    provider: Box<dyn EmbeddingProvider>,
    min_similarity: f32,
    build_threshold: usize,
    points: Vec<VectorPoint>,
    ids: Vec<MemoryId>,
    map: Option<HnswMap<VectorPoint, MemoryId>>,
    dirty_count: usize,
    cache: LruCache<String, Embedding>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("points", &self.points.len())
            .field("model", &self.provider.model_name())
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Create an index backed by the hashed bag-of-words fallback.
    #[must_use]
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self::with_provider(
            config,
            Box::new(HashedBagOfWordsProvider::new(config.dimensions)),
        )
    }

    /// Create an index with an injected embedding provider.
    #[must_use]
    pub fn with_provider(config: &EmbeddingConfig, provider: Box<dyn EmbeddingProvider>) -> Self {
        let cache_size = NonZeroUsize::new(config.cache_size.max(1))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            provider,
            min_similarity: config.min_similarity,
            build_threshold: config.hnsw_build_threshold,
            points: Vec::new(),
            ids: Vec::new(),
            map: None,
            dirty_count: 0,
            cache: LruCache::new(cache_size),
        }
    }

    /// Embed `text`, memoizing through the LRU cache.
    ///
    /// # Errors
    /// Propagates provider failures.
    pub fn embed(&mut self, text: &str) -> Result<Embedding> {
        if let Some(hit) = self.cache.get(text) {
            return Ok(hit.clone());
        }
        let embedding = self.provider.embed(text)?;
        self.cache.put(text.to_string(), embedding.clone());
        Ok(embedding)
    }

    /// Embed a record's content text and insert it.
    ///
    /// # Errors
    /// Propagates provider failures.
    pub fn index_record(&mut self, record: &MemoryRecord) -> Result<()> {
        let embedding = self.embed(&record.content.text())?;
        self.insert(record.id.clone(), &embedding);
        Ok(())
    }

    /// Insert a pre-computed embedding for a memory id.
    pub fn insert(&mut self, id: MemoryId, embedding: &Embedding) {
        self.points.push(VectorPoint::from_embedding(embedding));
        self.ids.push(id);
        self.dirty_count += 1;
    }

    /// Remove a memory id from the index.
    pub fn remove(&mut self, id: &MemoryId) {
        let mut i = 0;
        while i < self.ids.len() {
            if &self.ids[i] == id {
                self.ids.swap_remove(i);
                self.points.swap_remove(i);
                self.dirty_count += 1;
                // swapped element now occupies position i
            } else {
                i += 1;
            }
        }
    }

    /// Number of indexed vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Build the HNSW graph when the collection is large enough.
    /// Below the threshold this is a no-op; brute-force scan wins there.
    pub fn build(&mut self) {
        if self.points.len() < self.build_threshold {
            return;
        }
        let builder = Builder::default().seed(42);
        self.map = Some(builder.build(self.points.clone(), self.ids.clone()));
        self.dirty_count = 0;
    }

    /// Top-k ids most similar to `text`, above the minimum similarity.
    ///
    /// # Errors
    /// Propagates provider failures.
    pub fn search_text(&mut self, text: &str, k: usize) -> Result<Vec<VectorHit>> {
        let query = self.embed(text)?;
        Ok(self.search(&query, k))
    }

    /// Top-k ids most similar to a query embedding, above the minimum
    /// similarity, most similar first.
    #[must_use]
    pub fn search(&self, query: &Embedding, k: usize) -> Vec<VectorHit> {
        let query_point = VectorPoint::from_embedding(query);

        let mut hits: Vec<VectorHit> = if let Some(map) = &self.map {
            let mut search = Search::default();
            map.search(&query_point, &mut search)
                .take(k.saturating_mul(2))
                .map(|item| VectorHit {
                    id: item.value.clone(),
                    similarity: 1.0 - item.distance,
                })
                .collect()
        } else {
            self.points
                .iter()
                .enumerate()
                .map(|(i, point)| VectorHit {
                    id: self.ids[i].clone(),
                    similarity: 1.0 - query_point.distance(point),
                })
                .collect()
        };

        hits.retain(|hit| hit.similarity >= self.min_similarity);
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        hits
    }

    /// Ids most similar to an already-indexed record, excluding itself.
    /// Returns an empty list for an unknown id.
    #[must_use]
    pub fn find_similar(&self, id: &MemoryId, k: usize) -> Vec<VectorHit> {
        let Some(position) = self.ids.iter().position(|existing| existing == id) else {
            return Vec::new();
        };
        let query = Embedding(self.points[position].normalized.clone());
        let mut hits = self.search(&query, k + 1);
        hits.retain(|hit| &hit.id != id);
        hits.truncate(k);
        hits
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.points.clear();
        self.ids.clear();
        self.map = None;
        self.dirty_count = 0;
        self.cache.clear();
    }

    /// Index state for debugging and stats surfaces.
    #[must_use]
    pub fn stats(&self) -> VectorIndexStats {
        VectorIndexStats {
            total_points: self.points.len(),
            dirty_count: self.dirty_count,
            is_built: self.map.is_some(),
            model: self.provider.model_name().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
