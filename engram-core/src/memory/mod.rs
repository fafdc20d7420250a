//! Memory record model — shared metadata plus per-kind content payloads.
//!
//! The four kinds from the cognitive-science taxonomy:
//!
//! - **Episodic** — "What happened" (Tulving, 1972)
//! - **Semantic** — "What I know" (Tulving, 1985)
//! - **Procedural** — "What I know how to do" (Anderson ACT-R, 1993)
//! - **Emotional** — "How I felt" (Russell circumplex, 1980)
//!
//! A [`MemoryRecord`] is the unit the whole engine operates on: stored,
//! indexed, linked, buffered, consolidated, retrieved, and re-weighted.

pub mod emotional;
pub mod episodic;
pub mod procedural;
pub mod semantic;

pub use emotional::EmotionalContent;
pub use episodic::EpisodicContent;
pub use procedural::ProceduralContent;
pub use semantic::{FactValue, SemanticContent};

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngramError, Result};
use crate::types::{EntityRef, MemoryId, MemoryKind, PrivacyLevel};

// ---------------------------------------------------------------------------
// Content — closed sum over the four kinds
// ---------------------------------------------------------------------------

/// Kind-specific payload of a memory record.
///
/// Serialized adjacently tagged so a record's JSON carries `kind` and
/// `content` as sibling fields; an unknown kind tag fails this entry's
/// deserialization without touching the rest of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum MemoryContent {
    /// A recorded event.
    Episodic(EpisodicContent),
    /// A subject/predicate/value fact.
    Semantic(SemanticContent),
    /// A named, ordered skill.
    Procedural(ProceduralContent),
    /// An emotional episode.
    Emotional(EmotionalContent),
}

impl MemoryContent {
    /// The kind discriminant for this payload.
    #[must_use]
    pub fn kind(&self) -> MemoryKind {
        match self {
            Self::Episodic(_) => MemoryKind::Episodic,
            Self::Semantic(_) => MemoryKind::Semantic,
            Self::Procedural(_) => MemoryKind::Procedural,
            Self::Emotional(_) => MemoryKind::Emotional,
        }
    }

    /// Run the kind-specific required-field and range checks.
    ///
    /// # Errors
    /// Returns the first failed check as a human-readable reason.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Self::Episodic(c) => c.validate(),
            Self::Semantic(c) => c.validate(),
            Self::Procedural(c) => c.validate(),
            Self::Emotional(c) => c.validate(),
        }
    }

    /// Tags this payload contributes to the record at creation time
    /// (episodic topics; the primary emotion of an emotional record).
    #[must_use]
    pub fn seed_tags(&self) -> Vec<String> {
        match self {
            Self::Episodic(c) => c.topics.clone(),
            Self::Emotional(c) => vec![c.emotion.clone()],
            Self::Semantic(_) | Self::Procedural(_) => Vec::new(),
        }
    }

    /// Entity references this payload contributes at creation time
    /// (episodic participants; the semantic subject).
    #[must_use]
    pub fn seed_entities(&self) -> Vec<EntityRef> {
        match self {
            Self::Episodic(c) => c.participants.clone(),
            Self::Semantic(c) => vec![EntityRef::new(c.subject.clone())],
            Self::Procedural(_) | Self::Emotional(_) => Vec::new(),
        }
    }

    /// Whether this payload's free text literally mentions `id`.
    /// Used for the explicit-reference association signal.
    #[must_use]
    pub fn references(&self, id: &MemoryId) -> bool {
        self.text().contains(id.as_str())
    }

    /// Flatten the payload's free text for full-text search and the
    /// fallback embedding.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Episodic(c) => c.text(),
            Self::Semantic(c) => c.text(),
            Self::Procedural(c) => c.text(),
            Self::Emotional(c) => c.text(),
        }
    }

    /// Apply `f` to every free-text field in place.
    ///
    /// This is the cipher boundary's hook: sealing and unsealing are
    /// text transforms, leaving structure, ids, and metadata untouched.
    ///
    /// # Errors
    /// Propagates the first transform failure.
    pub fn map_text<F>(&mut self, f: F) -> Result<()>
    where
        F: Fn(&str) -> Result<String>,
    {
        match self {
            Self::Episodic(c) => c.map_text(&f),
            Self::Semantic(c) => c.map_text(&f),
            Self::Procedural(c) => c.map_text(&f),
            Self::Emotional(c) => c.map_text(&f),
        }
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Shared metadata carried by every memory record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMetadata {
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last retrieved (access-bumping path).
    pub last_accessed_at: DateTime<Utc>,
    /// When the record content was last modified.
    pub last_modified_at: DateTime<Utc>,
    /// How many times the record has been retrieved. Monotonic.
    #[serde(default)]
    pub access_count: u32,
    /// How significant the record is (0.0 to 1.0).
    pub importance: f32,
    /// How much the record is trusted (0.0 to 1.0).
    pub confidence: f32,
    /// Where the record came from (conversation id, sensor, import).
    #[serde(default)]
    pub source: String,
    /// Topic labels. Case-folded by the tag index; stored as given.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Entities this record is about.
    #[serde(default)]
    pub entity_refs: Vec<EntityRef>,
    /// Free-form host context (session ids, channel, locale, ...).
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl MemoryMetadata {
    /// Fresh metadata stamped at `now` with neutral importance/confidence.
    #[must_use]
    pub fn new_at(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            last_accessed_at: now,
            last_modified_at: now,
            access_count: 0,
            importance: 0.5,
            confidence: 0.5,
            source: String::new(),
            tags: Vec::new(),
            entity_refs: Vec::new(),
            context: HashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Revision trail
// ---------------------------------------------------------------------------

/// One content update in a record's revision trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    /// What changed, in the caller's words.
    pub description: String,
    /// Back-reference to the superseded version, `"{id}_v{n}"`.
    pub previous_version: String,
    /// When the update happened.
    pub modified_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// MemoryRecord
// ---------------------------------------------------------------------------

/// One memory: caller-assigned id, kind-tagged content, shared metadata,
/// revision trail, consolidation flag, and decay state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Opaque unique identifier, immutable, assigned by the caller.
    pub id: MemoryId,
    /// Kind tag plus kind-specific payload.
    #[serde(flatten)]
    pub content: MemoryContent,
    /// Sensitivity level; emotional records default to sensitive.
    #[serde(default)]
    pub privacy: PrivacyLevel,
    /// Shared metadata.
    pub metadata: MemoryMetadata,
    /// Content version, starting at 1.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Change trail, one entry per content update.
    #[serde(default)]
    pub revisions: Vec<Revision>,
    /// Whether consolidation has promoted this record to long-term.
    #[serde(default)]
    pub is_consolidated: bool,
    /// Multiplicative retention in [0, 1]; 1.0 when fresh.
    #[serde(default = "default_decay_factor")]
    pub decay_factor: f32,
}

fn default_version() -> u32 {
    1
}

fn default_decay_factor() -> f32 {
    1.0
}

impl MemoryRecord {
    /// Create a record at the current wall-clock time.
    #[must_use]
    pub fn new(id: MemoryId, content: MemoryContent) -> Self {
        Self::new_at(id, content, Utc::now())
    }

    /// Create a record with an explicit creation time (tests, imports).
    ///
    /// Tags and entity references are seeded from the payload: episodic
    /// topics and participants, the semantic subject, the primary
    /// emotion of an emotional record.
    #[must_use]
    pub fn new_at(id: MemoryId, content: MemoryContent, now: DateTime<Utc>) -> Self {
        let mut metadata = MemoryMetadata::new_at(now);
        metadata.tags = content.seed_tags();
        metadata.entity_refs = content.seed_entities();

        let privacy = match content.kind() {
            MemoryKind::Emotional => PrivacyLevel::Sensitive,
            _ => PrivacyLevel::default(),
        };

        Self {
            id,
            content,
            privacy,
            metadata,
            version: 1,
            revisions: Vec::new(),
            is_consolidated: false,
            decay_factor: 1.0,
        }
    }

    /// Set importance (clamped to [0, 1]).
    #[must_use]
    pub fn with_importance(mut self, importance: f32) -> Self {
        self.metadata.importance = importance.clamp(0.0, 1.0);
        self
    }

    /// Set confidence (clamped to [0, 1]).
    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.metadata.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set the source label.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.metadata.source = source.into();
        self
    }

    /// Add tags (deduplicated, case-insensitively).
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            self.add_tag(tag.into());
        }
        self
    }

    /// Add entity references (deduplicated).
    #[must_use]
    pub fn with_entities<I>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = EntityRef>,
    {
        for entity in entities {
            self.add_entity(entity);
        }
        self
    }

    /// Override the privacy level.
    #[must_use]
    pub fn with_privacy(mut self, privacy: PrivacyLevel) -> Self {
        self.privacy = privacy;
        self
    }

    /// Attach a free-form context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.context.insert(key.into(), value.into());
        self
    }

    /// The record's kind discriminant.
    #[must_use]
    pub fn kind(&self) -> MemoryKind {
        self.content.kind()
    }

    /// Importance after decay: `importance × decay_factor`.
    #[must_use]
    pub fn effective_importance(&self) -> f32 {
        self.metadata.importance * self.decay_factor
    }

    /// Run kind-specific validation plus shared range checks.
    ///
    /// # Errors
    /// Returns [`EngramError::Validation`] naming the failed check.
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().is_empty() {
            return Err(self.invalid("id must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.metadata.importance) {
            return Err(self.invalid("importance must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.metadata.confidence) {
            return Err(self.invalid("confidence must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.decay_factor) {
            return Err(self.invalid("decay_factor must be within [0, 1]"));
        }
        self.content.validate().map_err(|reason| self.invalid(&reason))
    }

    /// Record a retrieval: bump access count and last-accessed time.
    pub fn record_access(&mut self, now: DateTime<Utc>) {
        self.metadata.access_count += 1;
        self.metadata.last_accessed_at = now;
    }

    /// Multiply the decay factor by `(1 - rate)`. A rate of 0 is a no-op;
    /// the factor never leaves [0, 1].
    pub fn apply_decay(&mut self, rate: f32) {
        let rate = rate.clamp(0.0, 1.0);
        self.decay_factor = (self.decay_factor * (1.0 - rate)).clamp(0.0, 1.0);
    }

    /// Replace the content, bumping the version and recording the change
    /// in the revision trail.
    ///
    /// # Errors
    /// Rejects a kind change or invalid replacement content; the record
    /// is untouched on error.
    pub fn update_content(
        &mut self,
        content: MemoryContent,
        change_description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if content.kind() != self.kind() {
            return Err(self.invalid("content update cannot change the memory kind"));
        }
        content.validate().map_err(|reason| self.invalid(&reason))?;

        self.revisions.push(Revision {
            description: change_description.into(),
            previous_version: format!("{}_v{}", self.id, self.version),
            modified_at: now,
        });
        self.content = content;
        self.version += 1;
        self.metadata.last_modified_at = now;
        Ok(())
    }

    /// Add a tag unless an equal tag (case-insensitive) is present.
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        let folded = tag.to_lowercase();
        if !self
            .metadata
            .tags
            .iter()
            .any(|t| t.to_lowercase() == folded)
        {
            self.metadata.tags.push(tag);
        }
    }

    /// Add an entity reference unless already present.
    pub fn add_entity(&mut self, entity: EntityRef) {
        if !self.metadata.entity_refs.contains(&entity) {
            self.metadata.entity_refs.push(entity);
        }
    }

    /// Decode one record from a JSON value, typing kind-tag and shape
    /// failures as [`EngramError::Deserialization`].
    ///
    /// # Errors
    /// Unknown kinds and malformed structures.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| EngramError::Deserialization(e.to_string()))
    }

    fn invalid(&self, reason: &str) -> EngramError {
        EngramError::Validation {
            id: self.id.clone(),
            reason: reason.to_string(),
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

    fn episodic(id: &str) -> MemoryRecord {
        MemoryRecord::new_at(
            MemoryId::from(id),
            MemoryContent::Episodic(EpisodicContent::new(
                "met john at the standup",
                vec![EntityRef::from("john")],
                ts(1_000),
            )),
            ts(1_000),
        )
    }

    #[test]
    fn seeds_tags_and_entities_from_content() {
        let record = MemoryRecord::new_at(
            MemoryId::from("m1"),
            MemoryContent::Episodic(
                EpisodicContent::new("standup", vec![EntityRef::from("john")], ts(0))
                    .with_topics(["work", "planning"]),
            ),
            ts(0),
        );
        assert_eq!(record.metadata.tags, vec!["work", "planning"]);
        assert_eq!(record.metadata.entity_refs, vec![EntityRef::from("john")]);
    }

    #[test]
    fn emotional_records_default_to_sensitive() {
        let record = MemoryRecord::new_at(
            MemoryId::from("e1"),
            MemoryContent::Emotional(EmotionalContent::new("joy", 0.8, 0.7, 0.5, ["promotion"])),
            ts(0),
        );
        assert_eq!(record.privacy, PrivacyLevel::Sensitive);
        assert_eq!(record.metadata.tags, vec!["joy"]);
    }

    #[test]
    fn effective_importance_tracks_decay() {
        let mut record = episodic("m1").with_importance(0.8);
        assert!((record.effective_importance() - 0.8).abs() < 1e-6);

        record.apply_decay(0.5);
        assert!((record.decay_factor - 0.5).abs() < 1e-6);
        assert!((record.effective_importance() - 0.4).abs() < 1e-6);

        record.apply_decay(0.0); // no-op
        assert!((record.decay_factor - 0.5).abs() < 1e-6);
    }

    #[test]
    fn update_bumps_version_and_keeps_trail() {
        let mut record = episodic("m1");
        let updated = EpisodicContent::new(
            "met john and jane at the standup",
            vec![EntityRef::from("john"), EntityRef::from("jane")],
            ts(1_000),
        );
        record
            .update_content(
                MemoryContent::Episodic(updated),
                "added jane",
                ts(2_000),
            )
            .expect("update");

        assert_eq!(record.version, 2);
        assert_eq!(record.revisions.len(), 1);
        assert_eq!(record.revisions[0].previous_version, "m1_v1");
        assert_eq!(record.metadata.last_modified_at, ts(2_000));
    }

    #[test]
    fn update_rejects_kind_change() {
        let mut record = episodic("m1");
        let err = record
            .update_content(
                MemoryContent::Semantic(SemanticContent::new(
                    "john",
                    "role",
                    FactValue::text("engineer"),
                )),
                "oops",
                ts(2_000),
            )
            .expect_err("kind change must fail");
        assert!(matches!(err, EngramError::Validation { .. }));
        assert_eq!(record.version, 1);
    }

    #[test]
    fn tags_deduplicate_case_insensitively() {
        let mut record = episodic("m1");
        record.add_tag("Work");
        record.add_tag("work");
        record.add_tag("WORK");
        assert_eq!(
            record
                .metadata
                .tags
                .iter()
                .filter(|t| t.to_lowercase() == "work")
                .count(),
            1
        );
    }

    #[test]
    fn record_json_carries_kind_beside_content() {
        let record = episodic("m1");
        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["kind"], "episodic");
        assert!(value["content"]["description"].is_string());

        let back: MemoryRecord = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back.kind(), MemoryKind::Episodic);
        assert_eq!(back.id, record.id);
    }

    #[test]
    fn unknown_kind_is_a_typed_deserialization_error() {
        let json = serde_json::json!({
            "id": "x1",
            "kind": "prophetic",
            "content": {},
            "metadata": {
                "created_at": "2026-01-01T00:00:00Z",
                "last_accessed_at": "2026-01-01T00:00:00Z",
                "last_modified_at": "2026-01-01T00:00:00Z",
                "importance": 0.5,
                "confidence": 0.5
            }
        });
        let err = MemoryRecord::from_json(json).expect_err("unknown kind must fail");
        assert!(matches!(err, EngramError::Deserialization(_)));
    }
}
