//! Semantic content — "What I know" (Tulving, 1985).
//!
//! Distilled subject/predicate/value facts. Two facts about the same
//! subject and predicate with different values contradict each other;
//! consolidation resolves the conflict by merge policy instead of
//! letting both survive.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::MergePolicy;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Fact values
// ---------------------------------------------------------------------------

/// The asserted value of a semantic fact.
///
/// A closed set of value shapes keeps serialization format-agnostic
/// (both the JSON and the compact binary export handle it) and makes
/// contradiction checks plain equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactValue {
    /// A textual value ("blue", "engineer").
    Text(String),
    /// A numeric value (42.0, 1.85).
    Number(f64),
    /// A boolean value.
    Flag(bool),
    /// A list of textual values.
    List(Vec<String>),
}

impl FactValue {
    /// Convenience constructor for textual values.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Whether the value carries no information (empty text or list).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Number(_) | Self::Flag(_) => false,
        }
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Flag(b) => write!(f, "{b}"),
            Self::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Payload of a semantic memory — one fact or belief.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticContent {
    /// Who or what the fact is about.
    pub subject: String,
    /// The property or relation being asserted (the knowledge type).
    pub predicate: String,
    /// The asserted value.
    pub value: FactValue,
    /// Ids or notes supporting this fact.
    #[serde(default)]
    pub evidence: Vec<String>,
    /// Trail of values this fact displaced during merges.
    #[serde(default)]
    pub contradictions: Vec<String>,
}

impl SemanticContent {
    /// Create semantic content for a fact.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        value: FactValue,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            value,
            evidence: Vec::new(),
            contradictions: Vec::new(),
        }
    }

    /// Append an evidence entry.
    #[must_use]
    pub fn with_evidence(mut self, entry: impl Into<String>) -> Self {
        self.evidence.push(entry.into());
        self
    }

    /// Whether `self` and `other` assert different values for the same
    /// subject and predicate.
    #[must_use]
    pub fn contradicts(&self, other: &Self) -> bool {
        self.subject == other.subject
            && self.predicate == other.predicate
            && self.value != other.value
    }

    /// Required-field checks for semantic records.
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.subject.trim().is_empty() {
            return Err("semantic record requires a subject".to_string());
        }
        if self.predicate.trim().is_empty() {
            return Err("semantic record requires a predicate".to_string());
        }
        if self.value.is_empty() {
            return Err("semantic record requires a non-empty value".to_string());
        }
        Ok(())
    }

    pub(crate) fn text(&self) -> String {
        format!("{} {} {}", self.subject, self.predicate, self.value)
    }

    pub(crate) fn map_text<F>(&mut self, f: &F) -> Result<()>
    where
        F: Fn(&str) -> Result<String>,
    {
        if let FactValue::Text(s) = &self.value {
            self.value = FactValue::Text(f(s)?);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Outcome of merging a contradictory fact into an existing one.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The value that survived.
    pub winning_value: FactValue,
    /// The value that was displaced into the contradiction trail.
    pub displaced_value: FactValue,
}

impl crate::memory::MemoryRecord {
    /// Merge a contradictory semantic record into this one.
    ///
    /// `self` survives with the policy-chosen value; the incoming record
    /// is consumed by the caller. Confidence becomes the average of the
    /// two; the displaced value joins the contradiction trail and the
    /// incoming record's id joins the evidence trail.
    ///
    /// # Errors
    /// Returns a validation error if either record is not semantic or
    /// the two do not actually contradict.
    pub fn merge_semantic(
        &mut self,
        incoming: &crate::memory::MemoryRecord,
        policy: MergePolicy,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<MergeOutcome> {
        let (existing, candidate) = match (&self.content, &incoming.content) {
            (
                crate::memory::MemoryContent::Semantic(a),
                crate::memory::MemoryContent::Semantic(b),
            ) => (a, b),
            _ => {
                return Err(crate::EngramError::Validation {
                    id: self.id.clone(),
                    reason: "merge requires two semantic records".to_string(),
                });
            }
        };
        if !existing.contradicts(candidate) {
            return Err(crate::EngramError::Validation {
                id: self.id.clone(),
                reason: "records do not contradict; nothing to merge".to_string(),
            });
        }

        let incoming_wins = match policy {
            MergePolicy::NewestWins => incoming.metadata.created_at > self.metadata.created_at,
            MergePolicy::ConfidenceWins => {
                incoming.metadata.confidence > self.metadata.confidence
            }
        };

        let (winning_value, displaced_value) = if incoming_wins {
            (candidate.value.clone(), existing.value.clone())
        } else {
            (existing.value.clone(), candidate.value.clone())
        };

        let mut merged = existing.clone();
        merged.value = winning_value.clone();
        merged
            .contradictions
            .push(format!("displaced value: {displaced_value}"));
        merged.evidence.push(format!("merged from {}", incoming.id));

        let averaged_confidence = (self.metadata.confidence + incoming.metadata.confidence) / 2.0;

        self.update_content(
            crate::memory::MemoryContent::Semantic(merged),
            format!("merged contradictory fact from {}", incoming.id),
            now,
        )?;
        self.metadata.confidence = averaged_confidence.clamp(0.0, 1.0);

        Ok(MergeOutcome {
            winning_value,
            displaced_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryContent, MemoryRecord};
    use crate::types::MemoryId;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("timestamp")
    }

    fn fact(id: &str, value: &str, created: i64) -> MemoryRecord {
        MemoryRecord::new_at(
            MemoryId::from(id),
            MemoryContent::Semantic(SemanticContent::new(
                "john",
                "favorite_color",
                FactValue::text(value),
            )),
            ts(created),
        )
    }

    #[test]
    fn contradiction_needs_same_subject_and_predicate() {
        let blue = SemanticContent::new("john", "favorite_color", FactValue::text("blue"));
        let red = SemanticContent::new("john", "favorite_color", FactValue::text("red"));
        let other_subject =
            SemanticContent::new("jane", "favorite_color", FactValue::text("red"));
        let same_value = SemanticContent::new("john", "favorite_color", FactValue::text("blue"));

        assert!(blue.contradicts(&red));
        assert!(!blue.contradicts(&other_subject));
        assert!(!blue.contradicts(&same_value));
    }

    #[test]
    fn empty_value_is_invalid() {
        let content = SemanticContent::new("john", "nickname", FactValue::text("  "));
        assert!(content.validate().is_err());

        let numeric = SemanticContent::new("john", "age", FactValue::Number(34.0));
        assert!(numeric.validate().is_ok());
    }

    #[test]
    fn newest_wins_takes_later_created_at() {
        let mut existing = fact("s1", "blue", 1_000);
        let incoming = fact("s2", "red", 2_000);

        let outcome = existing
            .merge_semantic(&incoming, MergePolicy::NewestWins, ts(3_000))
            .expect("merge");

        assert_eq!(outcome.winning_value, FactValue::text("red"));
        match &existing.content {
            MemoryContent::Semantic(c) => {
                assert_eq!(c.value, FactValue::text("red"));
                assert_eq!(c.contradictions.len(), 1);
                assert!(c.evidence.iter().any(|e| e.contains("s2")));
            }
            _ => panic!("expected semantic content"),
        }
        assert_eq!(existing.version, 2);
    }

    #[test]
    fn confidence_wins_takes_higher_confidence() {
        let mut existing = fact("s1", "blue", 1_000).with_confidence(0.9);
        let incoming = fact("s2", "red", 2_000).with_confidence(0.2);

        let outcome = existing
            .merge_semantic(&incoming, MergePolicy::ConfidenceWins, ts(3_000))
            .expect("merge");

        assert_eq!(outcome.winning_value, FactValue::text("blue"));
        assert!((existing.metadata.confidence - 0.55).abs() < 1e-6);
    }

    #[test]
    fn merge_rejects_non_contradictory_pair() {
        let mut existing = fact("s1", "blue", 1_000);
        let same = fact("s2", "blue", 2_000);
        assert!(
            existing
                .merge_semantic(&same, MergePolicy::NewestWins, ts(3_000))
                .is_err()
        );
    }
}
