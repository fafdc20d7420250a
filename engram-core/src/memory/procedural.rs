//! Procedural content — "What I know how to do" (Anderson ACT-R, 1993).
//!
//! Named, ordered skills with success/failure tracking. Outcomes feed
//! back into record importance: practice that works makes the skill
//! more prominent, repeated failure demotes it.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Importance added per recorded success (capped at 1.0).
pub const SUCCESS_IMPORTANCE_STEP: f32 = 0.05;
/// Importance removed per recorded failure (floored at 0.1).
pub const FAILURE_IMPORTANCE_STEP: f32 = 0.05;
/// Importance never drops below this through failures alone.
pub const FAILURE_IMPORTANCE_FLOOR: f32 = 0.1;

/// Payload of a procedural memory — one learned skill or routine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProceduralContent {
    /// Skill name (e.g. "book_meeting_room", "summarize_thread").
    pub name: String,
    /// What the skill accomplishes.
    pub description: String,
    /// Ordered steps. At least one is required.
    pub steps: Vec<String>,
    /// Times the skill was applied successfully.
    #[serde(default)]
    pub success_count: u32,
    /// Times the skill failed.
    #[serde(default)]
    pub failure_count: u32,
}

impl ProceduralContent {
    /// Create procedural content for a skill.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        steps: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            steps,
            success_count: 0,
            failure_count: 0,
        }
    }

    /// Success rate over all recorded outcomes, 0.0 when unused.
    #[must_use]
    pub fn success_rate(&self) -> f32 {
        let total = self.success_count + self.failure_count;
        if total == 0 {
            0.0
        } else {
            self.success_count as f32 / total as f32
        }
    }

    /// Required-field checks for procedural records.
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("procedural record requires a name".to_string());
        }
        if self.description.trim().is_empty() {
            return Err("procedural record requires a description".to_string());
        }
        if self.steps.is_empty() {
            return Err("procedural record requires at least one step".to_string());
        }
        Ok(())
    }

    pub(crate) fn text(&self) -> String {
        let mut text = format!("{} {}", self.name, self.description);
        for step in &self.steps {
            text.push(' ');
            text.push_str(step);
        }
        text
    }

    pub(crate) fn map_text<F>(&mut self, f: &F) -> Result<()>
    where
        F: Fn(&str) -> Result<String>,
    {
        self.description = f(&self.description)?;
        for step in &mut self.steps {
            *step = f(step)?;
        }
        Ok(())
    }
}

impl crate::memory::MemoryRecord {
    /// Record a successful application of a procedural skill: bumps the
    /// success counter and raises importance by a fixed step, capped at 1.0.
    ///
    /// No-op for non-procedural records.
    pub fn record_success(&mut self) {
        if let crate::memory::MemoryContent::Procedural(content) = &mut self.content {
            content.success_count += 1;
            self.metadata.importance =
                (self.metadata.importance + SUCCESS_IMPORTANCE_STEP).min(1.0);
        }
    }

    /// Record a failed application: bumps the failure counter and lowers
    /// importance by a fixed step, floored at 0.1.
    ///
    /// No-op for non-procedural records.
    pub fn record_failure(&mut self) {
        if let crate::memory::MemoryContent::Procedural(content) = &mut self.content {
            content.failure_count += 1;
            self.metadata.importance = (self.metadata.importance - FAILURE_IMPORTANCE_STEP)
                .max(FAILURE_IMPORTANCE_FLOOR);
        }
    }
}
