//! Vector embedding abstraction layer.
//!
//! Provides a trait-based interface for generating text embeddings used
//! by the vector index for similarity search. Hosts inject a real model
//! behind [`EmbeddingProvider`]; without one, the deterministic hashed
//! bag-of-words provider keeps similarity search functional offline.

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// Embedding vector
// ---------------------------------------------------------------------------

/// A dense vector embedding for similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    /// Cosine similarity between two embeddings.
    /// Returns 0.0 for mismatched dimensions or zero-magnitude vectors.
    #[must_use]
    pub fn cosine_similarity(&self, other: &Self) -> f32 {
        if self.0.len() != other.0.len() || self.0.is_empty() {
            return 0.0;
        }
        let (mut dot, mut norm_a, mut norm_b) = (0.0_f32, 0.0_f32, 0.0_f32);
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }
        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom < f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    /// Dimensionality of the embedding.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Generate vector embeddings from text.
///
/// Implementations must be `Send + Sync` so the vector index can be
/// shared with a host-side async runtime.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string.
    ///
    /// # Errors
    /// Returns an error if the underlying model fails.
    fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed a batch of texts. Default implementation loops over
    /// [`EmbeddingProvider::embed`].
    ///
    /// # Errors
    /// Returns an error if any embedding in the batch fails.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// The dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// A human-readable name for the model.
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Hashed bag-of-words provider (deterministic fallback)
// ---------------------------------------------------------------------------

/// Deterministic fallback provider: hashed bag-of-words, L2-normalized.
///
/// Each whitespace-separated token is case-folded and hashed into one of
/// `dims` buckets (FNV-1a); the bucket counts are normalized to unit
/// length. No model download, no randomness, identical output for
/// identical input — exactly what tests and offline hosts need.
pub struct HashedBagOfWordsProvider {
    dims: usize,
}

impl HashedBagOfWordsProvider {
    /// Create a provider with the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dims: dimensions.max(1),
        }
    }
}

impl Default for HashedBagOfWordsProvider {
    fn default() -> Self {
        Self::new(100)
    }
}

/// FNV-1a over the token bytes; stable across platforms and runs.
fn fnv1a(token: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for byte in token.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

impl EmbeddingProvider for HashedBagOfWordsProvider {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let mut counts = vec![0.0_f32; self.dims];
        for token in text.split_whitespace() {
            let token = token.to_lowercase();
            let token = token.trim_matches(|c: char| !c.is_alphanumeric());
            if token.is_empty() {
                continue;
            }
            let bucket = (fnv1a(token) % self.dims as u64) as usize;
            counts[bucket] += 1.0;
        }

        let magnitude: f32 = counts.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude < f32::EPSILON {
            return Ok(Embedding(counts));
        }
        Ok(Embedding(counts.iter().map(|x| x / magnitude).collect()))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "hashed-bag-of-words"
    }
}

// ---------------------------------------------------------------------------
// Random provider (integration testing)
// ---------------------------------------------------------------------------

/// An embedding provider that returns random unit-length vectors.
///
/// Useful for integration tests that need non-zero, diverse embeddings
/// without a real model and without hashed-BoW collisions.
pub struct RandomEmbeddingProvider {
    dims: usize,
}

impl RandomEmbeddingProvider {
    /// Create a new random provider.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dims: dimensions }
    }
}

impl EmbeddingProvider for RandomEmbeddingProvider {
    fn embed(&self, _text: &str) -> Result<Embedding> {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let raw: Vec<f32> = (0..self.dims).map(|_| rng.gen_range(-1.0..1.0)).collect();

        let magnitude: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude < f32::EPSILON {
            return Ok(Embedding(vec![0.0; self.dims]));
        }
        Ok(Embedding(raw.iter().map(|x| x / magnitude).collect()))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "random-unit-vector"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
