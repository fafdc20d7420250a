//! Emotional content — "How I felt" (Russell's circumplex, 1980).
//!
//! Emotional episodes with intensity/valence/arousal coordinates and
//! the triggers that set them off. Similarity between two emotional
//! records blends name match, coordinate closeness, and trigger overlap.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Emotion labels recognised by tag-based emotional scoring.
pub const EMOTION_KEYWORDS: &[&str] = &[
    "joy",
    "happy",
    "sad",
    "sadness",
    "angry",
    "anger",
    "fear",
    "afraid",
    "anxious",
    "anxiety",
    "excited",
    "excitement",
    "love",
    "grateful",
    "gratitude",
    "frustrated",
    "frustration",
    "surprise",
    "surprised",
    "disgust",
    "calm",
    "proud",
    "pride",
    "shame",
    "guilt",
    "hope",
    "trust",
];

/// Whether any of `tags` names an emotion (case-insensitive).
#[must_use]
pub fn has_emotion_tag(tags: &[String]) -> bool {
    tags.iter()
        .any(|tag| EMOTION_KEYWORDS.contains(&tag.to_lowercase().as_str()))
}

// Similarity blend weights; they sum to 1.
const W_EMOTION_MATCH: f32 = 0.35;
const W_VALENCE: f32 = 0.25;
const W_INTENSITY: f32 = 0.2;
const W_TRIGGERS: f32 = 0.2;

/// Payload of an emotional memory — one felt episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionalContent {
    /// Primary emotion label.
    pub emotion: String,
    /// How strongly it was felt (0.0 to 1.0).
    pub intensity: f32,
    /// Unpleasant (-1.0) to pleasant (+1.0).
    pub valence: f32,
    /// Calm (0.0) to activated (1.0).
    pub arousal: f32,
    /// What set the emotion off. At least one trigger is required.
    pub triggers: Vec<String>,
    /// Optional free-text note about the circumstances.
    #[serde(default)]
    pub note: Option<String>,
}

impl EmotionalContent {
    /// Create emotional content. Coordinates are clamped to their ranges.
    #[must_use]
    pub fn new<I, S>(
        emotion: impl Into<String>,
        intensity: f32,
        valence: f32,
        arousal: f32,
        triggers: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            emotion: emotion.into(),
            intensity: intensity.clamp(0.0, 1.0),
            valence: valence.clamp(-1.0, 1.0),
            arousal: arousal.clamp(0.0, 1.0),
            triggers: triggers.into_iter().map(Into::into).collect(),
            note: None,
        }
    }

    /// Attach a free-text note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Similarity to another emotional episode, in [0, 1].
    ///
    /// Weighted blend: emotion-name match, valence closeness, intensity
    /// closeness, and Jaccard overlap of the trigger sets.
    #[must_use]
    pub fn similarity(&self, other: &Self) -> f32 {
        let emotion_match = if self.emotion.eq_ignore_ascii_case(&other.emotion) {
            1.0
        } else {
            0.0
        };
        // Valence spans [-1, 1], so the gap is normalised by 2.
        let valence_closeness = 1.0 - (self.valence - other.valence).abs() / 2.0;
        let intensity_closeness = 1.0 - (self.intensity - other.intensity).abs();

        let mine: HashSet<String> = self.triggers.iter().map(|t| t.to_lowercase()).collect();
        let theirs: HashSet<String> = other.triggers.iter().map(|t| t.to_lowercase()).collect();
        let intersection = mine.intersection(&theirs).count();
        let union = mine.union(&theirs).count();
        let trigger_overlap = if union == 0 {
            0.0
        } else {
            intersection as f32 / union as f32
        };

        (W_EMOTION_MATCH * emotion_match
            + W_VALENCE * valence_closeness
            + W_INTENSITY * intensity_closeness
            + W_TRIGGERS * trigger_overlap)
            .clamp(0.0, 1.0)
    }

    /// Required-field and range checks for emotional records.
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.emotion.trim().is_empty() {
            return Err("emotional record requires a primary emotion".to_string());
        }
        if !(0.0..=1.0).contains(&self.intensity) {
            return Err("intensity must be within [0, 1]".to_string());
        }
        if !(-1.0..=1.0).contains(&self.valence) {
            return Err("valence must be within [-1, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.arousal) {
            return Err("arousal must be within [0, 1]".to_string());
        }
        if self.triggers.is_empty() {
            return Err("emotional record requires at least one trigger".to_string());
        }
        Ok(())
    }

    pub(crate) fn text(&self) -> String {
        let mut text = self.emotion.clone();
        for trigger in &self.triggers {
            text.push(' ');
            text.push_str(trigger);
        }
        if let Some(note) = &self.note {
            text.push(' ');
            text.push_str(note);
        }
        text
    }

    pub(crate) fn map_text<F>(&mut self, f: &F) -> Result<()>
    where
        F: Fn(&str) -> Result<String>,
    {
        for trigger in &mut self.triggers {
            *trigger = f(trigger)?;
        }
        if let Some(note) = &self.note {
            self.note = Some(f(note)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_episodes_score_one() {
        let a = EmotionalContent::new("joy", 0.8, 0.7, 0.6, ["promotion"]);
        let sim = a.similarity(&a.clone());
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn different_emotions_score_lower() {
        let joy = EmotionalContent::new("joy", 0.8, 0.7, 0.6, ["promotion"]);
        let fear = EmotionalContent::new("fear", 0.8, -0.7, 0.6, ["deadline"]);
        let same = joy.similarity(&joy.clone());
        let cross = joy.similarity(&fear);
        assert!(cross < same);
        assert!(cross < 0.6);
    }

    #[test]
    fn trigger_overlap_contributes() {
        let a = EmotionalContent::new("joy", 0.8, 0.7, 0.6, ["promotion", "team"]);
        let shared = EmotionalContent::new("joy", 0.8, 0.7, 0.6, ["promotion"]);
        let disjoint = EmotionalContent::new("joy", 0.8, 0.7, 0.6, ["weather"]);
        assert!(a.similarity(&shared) > a.similarity(&disjoint));
    }

    #[test]
    fn ranges_are_validated() {
        let mut content = EmotionalContent::new("joy", 0.5, 0.5, 0.5, ["x"]);
        assert!(content.validate().is_ok());
        content.intensity = 1.5;
        assert!(content.validate().is_err());
        content.intensity = 0.5;
        content.triggers.clear();
        assert!(content.validate().is_err());
    }

    #[test]
    fn emotion_tags_are_recognised() {
        assert!(has_emotion_tag(&["Joy".to_string()]));
        assert!(!has_emotion_tag(&["project".to_string()]));
    }
}
