//! Emotional retrieval — "what resonates with how I feel".
//!
//! Emotional records are scored by direct state similarity to the
//! caller's emotion cue; any record can contribute through
//! emotion-keyword tags; a small boost rewards important, intense
//! memories.

use crate::memory::emotional::has_emotion_tag;
use crate::memory::{MemoryContent, MemoryRecord};
use crate::retrieval::{EmotionCue, RetrievalContext, RetrievalStrategy, WeightedSum};
use crate::storage::MemoryStore;

const W_STATE: f32 = 0.6;
const W_KEYWORD: f32 = 0.3;
const W_BOOST: f32 = 0.1;

// State-similarity blend.
const W_NAME: f32 = 0.4;
const W_VALENCE: f32 = 0.3;
const W_INTENSITY: f32 = 0.3;

/// Scores records by emotional resonance.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmotionalStrategy;

impl EmotionalStrategy {
    /// Similarity between the caller's cue and an emotional record:
    /// name match, valence closeness, intensity closeness.
    fn state_similarity(cue: &EmotionCue, record: &MemoryRecord) -> f32 {
        let MemoryContent::Emotional(content) = &record.content else {
            return 0.0;
        };
        let name = if content.emotion.eq_ignore_ascii_case(&cue.emotion) {
            1.0
        } else {
            0.0
        };
        let valence = 1.0 - (content.valence - cue.valence).abs() / 2.0;
        let intensity = 1.0 - (content.intensity - cue.intensity).abs();
        W_NAME * name + W_VALENCE * valence + W_INTENSITY * intensity
    }

    /// Intensity of the record's emotional payload (0 for other kinds).
    fn record_intensity(record: &MemoryRecord) -> f32 {
        match &record.content {
            MemoryContent::Emotional(content) => content.intensity,
            _ => 0.0,
        }
    }
}

impl RetrievalStrategy for EmotionalStrategy {
    fn name(&self) -> &'static str {
        "emotional"
    }

    fn relevance(
        &self,
        record: &MemoryRecord,
        ctx: &RetrievalContext,
        _store: &MemoryStore,
    ) -> f32 {
        let mut sum = WeightedSum::default();

        if let Some(cue) = &ctx.emotion {
            sum.add(W_STATE, Self::state_similarity(cue, record));
        }
        sum.add(
            W_KEYWORD,
            if has_emotion_tag(&record.metadata.tags) {
                1.0
            } else {
                0.0
            },
        );
        sum.add(
            W_BOOST,
            record.metadata.importance * Self::record_intensity(record),
        );

        sum.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::memory::{EmotionalContent, EpisodicContent};
    use crate::types::{EntityRef, MemoryId};
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("timestamp")
    }

    fn emotional(id: &str, emotion: &str, intensity: f32, valence: f32) -> MemoryRecord {
        MemoryRecord::new_at(
            MemoryId::from(id),
            MemoryContent::Emotional(EmotionalContent::new(
                emotion,
                intensity,
                valence,
                0.5,
                ["trigger"],
            )),
            ts(0),
        )
    }

    fn cue(emotion: &str, intensity: f32, valence: f32) -> EmotionCue {
        EmotionCue {
            emotion: emotion.to_string(),
            intensity,
            valence,
        }
    }

    #[test]
    fn matching_emotion_scores_highest() {
        let store = MemoryStore::new(&EmbeddingConfig::default());
        let strategy = EmotionalStrategy;
        let ctx = RetrievalContext::at(ts(100)).with_emotion(cue("joy", 0.8, 0.7));

        let joy = emotional("joy", "joy", 0.8, 0.7);
        let fear = emotional("fear", "fear", 0.8, -0.7);

        assert!(
            strategy.relevance(&joy, &ctx, &store) > strategy.relevance(&fear, &ctx, &store)
        );
    }

    #[test]
    fn emotion_tags_lift_non_emotional_records() {
        let store = MemoryStore::new(&EmbeddingConfig::default());
        let strategy = EmotionalStrategy;
        let ctx = RetrievalContext::at(ts(100));

        let tagged = MemoryRecord::new_at(
            MemoryId::from("tagged"),
            MemoryContent::Episodic(EpisodicContent::new(
                "celebrated the launch",
                vec![EntityRef::from("team")],
                ts(0),
            )),
            ts(0),
        )
        .with_tags(["joy"]);
        let plain = MemoryRecord::new_at(
            MemoryId::from("plain"),
            MemoryContent::Episodic(EpisodicContent::new(
                "filed the report",
                vec![EntityRef::from("team")],
                ts(0),
            )),
            ts(0),
        );

        assert!(
            strategy.relevance(&tagged, &ctx, &store)
                > strategy.relevance(&plain, &ctx, &store)
        );
    }

    #[test]
    fn importance_and_intensity_boost() {
        let store = MemoryStore::new(&EmbeddingConfig::default());
        let strategy = EmotionalStrategy;
        let ctx = RetrievalContext::at(ts(100)).with_emotion(cue("joy", 0.8, 0.7));

        let vivid = emotional("vivid", "joy", 0.9, 0.7).with_importance(0.9);
        let faint = emotional("faint", "joy", 0.1, 0.7).with_importance(0.1);

        assert!(
            strategy.relevance(&vivid, &ctx, &store)
                > strategy.relevance(&faint, &ctx, &store)
        );
    }
}
