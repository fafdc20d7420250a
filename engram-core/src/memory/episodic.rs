//! Episodic content — "What happened" (Tulving, 1972).
//!
//! The raw stream of experience: every significant event the agent
//! witnesses or takes part in becomes an episodic record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::EntityRef;

/// Payload of an episodic memory — one recorded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodicContent {
    /// Natural-language description of the event.
    pub description: String,
    /// Who took part. At least one participant is required.
    pub participants: Vec<EntityRef>,
    /// When the event started.
    pub started_at: DateTime<Utc>,
    /// When the event ended, if bounded.
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    /// Event duration in seconds, if known independently of the end time.
    #[serde(default)]
    pub duration_secs: Option<i64>,
    /// Where the event happened, in the host's terms.
    #[serde(default)]
    pub location: Option<String>,
    /// Topic labels; seeded into the record's tags at creation.
    #[serde(default)]
    pub topics: Vec<String>,
}

impl EpisodicContent {
    /// Create episodic content for an event.
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        participants: Vec<EntityRef>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            description: description.into(),
            participants,
            started_at,
            ended_at: None,
            duration_secs: None,
            location: None,
            topics: Vec::new(),
        }
    }

    /// Set topic labels.
    #[must_use]
    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Set the end time (duration derived if not set explicitly).
    #[must_use]
    pub fn with_ended_at(mut self, ended_at: DateTime<Utc>) -> Self {
        self.ended_at = Some(ended_at);
        if self.duration_secs.is_none() {
            self.duration_secs = Some((ended_at - self.started_at).num_seconds());
        }
        self
    }

    /// Set the location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Required-field checks for episodic records.
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.description.trim().is_empty() {
            return Err("episodic record requires a non-empty description".to_string());
        }
        if self.participants.is_empty() {
            return Err("episodic record requires at least one participant".to_string());
        }
        if let Some(ended_at) = self.ended_at {
            if ended_at < self.started_at {
                return Err("episodic record cannot end before it starts".to_string());
            }
        }
        Ok(())
    }

    pub(crate) fn text(&self) -> String {
        let mut text = self.description.clone();
        if let Some(location) = &self.location {
            text.push(' ');
            text.push_str(location);
        }
        for topic in &self.topics {
            text.push(' ');
            text.push_str(topic);
        }
        text
    }

    pub(crate) fn map_text<F>(&mut self, f: &F) -> Result<()>
    where
        F: Fn(&str) -> Result<String>,
    {
        self.description = f(&self.description)?;
        if let Some(location) = &self.location {
            self.location = Some(f(location)?);
        }
        Ok(())
    }
}
