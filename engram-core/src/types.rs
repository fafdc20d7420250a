//! Core type definitions for the Engram memory system.
//!
//! All types are serializable and cheap to clone; identifiers are
//! caller-assigned opaque strings so that hosts can keep their own
//! id scheme (conversation ids, ULIDs, database keys).

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Unique identifier for a memory record.
///
/// Opaque and immutable; assigned by the caller at record creation.
/// [`MemoryId::generate`] mints a fresh UUID-backed id for hosts that
/// do not carry their own scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemoryId(pub String);

impl MemoryId {
    /// Wrap an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MemoryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Reference to an entity (person, place, thing) mentioned by a memory.
///
/// Entities are compared exactly; normalisation is the host's concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef(pub String);

impl EntityRef {
    /// Wrap an entity name or id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Memory Kind
// ---------------------------------------------------------------------------

/// Discriminant for the four memory kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// "What happened" — a recorded event.
    Episodic,
    /// "What I know" — a subject/predicate/value fact.
    Semantic,
    /// "What I know how to do" — a named multi-step skill.
    Procedural,
    /// "How I felt" — an emotional episode with triggers.
    Emotional,
}

impl MemoryKind {
    /// All four kinds, in canonical order.
    pub const ALL: [Self; 4] = [
        Self::Episodic,
        Self::Semantic,
        Self::Procedural,
        Self::Emotional,
    ];

    /// Stable lowercase name, matching the serialized kind tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Episodic => "episodic",
            Self::Semantic => "semantic",
            Self::Procedural => "procedural",
            Self::Emotional => "emotional",
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Privacy
// ---------------------------------------------------------------------------

/// Sensitivity level of a memory record.
///
/// Ordered from least to most sensitive so that "at or above" checks
/// can use plain comparison.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    /// Shareable with anyone.
    Public,
    /// Internal to the agent; the default for most kinds.
    #[default]
    Private,
    /// Personal or emotionally charged content.
    Sensitive,
    /// Never leaves the engine unsealed.
    Confidential,
}

// ---------------------------------------------------------------------------
// Association Kind
// ---------------------------------------------------------------------------

/// Why two memories are linked in the association graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    /// The two memories mention overlapping entities.
    SharedEntity,
    /// The two memories share topics/tags.
    SharedTopic,
    /// The two memories occurred close together in time.
    Temporal,
    /// The two memories carry similar emotional signatures.
    Emotional,
    /// One memory's content explicitly references the other's id.
    Reference,
}

impl AssociationKind {
    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SharedEntity => "shared_entity",
            Self::SharedTopic => "shared_topic",
            Self::Temporal => "temporal",
            Self::Emotional => "emotional",
            Self::Reference => "reference",
        }
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Relevance Score
// ---------------------------------------------------------------------------

/// Composite score used to rank memories during retrieval.
///
/// Wraps [`OrderedFloat`] so results can be sorted without partial-order
/// escape hatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RelevanceScore(pub OrderedFloat<f32>);

impl RelevanceScore {
    /// Create a relevance score from a raw f32, clamped to [0, 1].
    #[must_use]
    pub fn new(score: f32) -> Self {
        Self(OrderedFloat(score.clamp(0.0, 1.0)))
    }

    /// Get the raw score value.
    #[must_use]
    pub fn value(self) -> f32 {
        self.0.into_inner()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
