//! Temporal retrieval — "what happened around then".
//!
//! Blends time-range membership, recency with a 7-day half-life, and
//! calendar-pattern match (same hour / weekday / calendar date as the
//! reference time).

use chrono::{Datelike, Timelike};

use crate::memory::MemoryRecord;
use crate::retrieval::{RetrievalContext, RetrievalStrategy, WeightedSum};
use crate::similarity::half_life_decay;
use crate::storage::MemoryStore;

const W_RANGE: f32 = 0.5;
const W_RECENCY: f32 = 0.3;
const W_PATTERN: f32 = 0.2;
const RECENCY_HALF_LIFE_SECS: f64 = 7.0 * 24.0 * 3600.0;

// Calendar-pattern sub-weights.
const W_SAME_HOUR: f32 = 0.5;
const W_SAME_WEEKDAY: f32 = 0.3;
const W_SAME_DATE: f32 = 0.2;

/// Scores records by temporal closeness and calendar rhythm.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemporalStrategy;

impl TemporalStrategy {
    /// Calendar-pattern score vs. the reference time: same hour of day,
    /// same weekday, same calendar date (month + day).
    fn pattern_score(record: &MemoryRecord, ctx: &RetrievalContext) -> f32 {
        let created = record.metadata.created_at;
        let reference = ctx.reference_time;

        let mut score = 0.0;
        if created.hour() == reference.hour() {
            score += W_SAME_HOUR;
        }
        if created.weekday() == reference.weekday() {
            score += W_SAME_WEEKDAY;
        }
        if created.month() == reference.month() && created.day() == reference.day() {
            score += W_SAME_DATE;
        }
        score
    }
}

impl RetrievalStrategy for TemporalStrategy {
    fn name(&self) -> &'static str {
        "temporal"
    }

    fn relevance(
        &self,
        record: &MemoryRecord,
        ctx: &RetrievalContext,
        _store: &MemoryStore,
    ) -> f32 {
        let mut sum = WeightedSum::default();

        if let Some((start, end)) = ctx.time_range {
            let inside =
                record.metadata.created_at >= start && record.metadata.created_at <= end;
            sum.add(W_RANGE, if inside { 1.0 } else { 0.0 });
        }

        let age_secs = (ctx.reference_time - record.metadata.created_at).num_seconds() as f64;
        sum.add(W_RECENCY, half_life_decay(age_secs, RECENCY_HALF_LIFE_SECS));
        sum.add(W_PATTERN, Self::pattern_score(record, ctx));

        sum.value()
    }
}
