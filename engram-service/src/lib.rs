//! # Engram Service
//!
//! Host facade around [`MemoryEngine`]: owns the engine behind a lock,
//! runs the periodic decay and consolidation ticks on tokio interval
//! tasks, and exposes the convenience lookups a conversational host
//! actually calls.
//!
//! The engine itself is synchronous and timer-free; this crate is the
//! only place scheduling lives, and [`MemoryService::dispose`] is the
//! only way to stop it. Tick failures are caught and logged per tick —
//! a failing pass never kills the timer.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use engram_core::config::EngramConfig;
use engram_core::consolidation::ConsolidationReport;
use engram_core::engine::{DecayReport, EngineStats, MemoryEngine};
use engram_core::error::Result;
use engram_core::memory::MemoryRecord;
use engram_core::retrieval::{RetrievalContext, RetrievalOptions, RetrievalStrategy, RetrievedMemory};
use engram_core::types::{EntityRef, MemoryId, MemoryKind};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Service-level configuration: engine settings plus tick scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Seconds between decay ticks; 0 disables the decay timer.
    #[serde(default = "default_decay_interval")]
    pub decay_interval_secs: u64,
    /// Decay rate applied per tick.
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f32,
    /// Seconds between consolidation ticks; 0 disables the timer.
    #[serde(default = "default_consolidation_interval")]
    pub consolidation_interval_secs: u64,
    /// Engine configuration.
    #[serde(default)]
    pub engine: EngramConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            decay_interval_secs: 3600,
            decay_rate: 0.01,
            consolidation_interval_secs: 600,
            engine: EngramConfig::default(),
        }
    }
}

fn default_decay_interval() -> u64 {
    3600
}
fn default_decay_rate() -> f32 {
    0.01
}
fn default_consolidation_interval() -> u64 {
    600
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// The host-facing memory service.
///
/// Cheap to share: callers clone the inner engine handle via
/// [`MemoryService::engine`] if they need direct access; the
/// convenience methods cover the common paths.
pub struct MemoryService {
    engine: Arc<RwLock<MemoryEngine>>,
    decay_task: Option<JoinHandle<()>>,
    consolidation_task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for MemoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryService")
            .field("decay_timer", &self.decay_task.is_some())
            .field("consolidation_timer", &self.consolidation_task.is_some())
            .finish_non_exhaustive()
    }
}

impl MemoryService {
    /// Create the service and start whichever timers the config enables.
    ///
    /// Must be called from within a tokio runtime when any interval is
    /// non-zero.
    #[must_use]
    pub fn new(config: ServiceConfig) -> Self {
        let engine = Arc::new(RwLock::new(MemoryEngine::new(config.engine.clone())));

        let decay_task = (config.decay_interval_secs > 0).then(|| {
            let engine = Arc::clone(&engine);
            let interval = Duration::from_secs(config.decay_interval_secs);
            let rate = config.decay_rate;
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.tick().await; // the immediate first tick
                loop {
                    ticker.tick().await;
                    run_tick("decay", || {
                        let report = engine.write().decay_once(rate);
                        debug!(
                            records = report.records_decayed,
                            pruned = report.edges_pruned,
                            "decay tick"
                        );
                        Ok(())
                    });
                }
            })
        });

        let consolidation_task = (config.consolidation_interval_secs > 0).then(|| {
            let engine = Arc::clone(&engine);
            let interval = Duration::from_secs(config.consolidation_interval_secs);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    run_tick("consolidation", || {
                        let report = engine.write().consolidate_once()?;
                        debug!(
                            consolidated = report.consolidated,
                            integrated = report.integrated,
                            "consolidation tick"
                        );
                        Ok(())
                    });
                }
            })
        });

        info!(
            decay = config.decay_interval_secs,
            consolidation = config.consolidation_interval_secs,
            "memory service started"
        );

        Self {
            engine,
            decay_task,
            consolidation_task,
        }
    }

    /// A service with no timers, for hosts that drive ticks themselves.
    #[must_use]
    pub fn without_timers(engine_config: EngramConfig) -> Self {
        Self::new(ServiceConfig {
            decay_interval_secs: 0,
            consolidation_interval_secs: 0,
            engine: engine_config,
            ..ServiceConfig::default()
        })
    }

    /// Shared handle to the engine for direct access.
    #[must_use]
    pub fn engine(&self) -> Arc<RwLock<MemoryEngine>> {
        Arc::clone(&self.engine)
    }

    // -- convenience passthroughs ---------------------------------------------

    /// Store a new memory.
    ///
    /// # Errors
    /// Validation failures.
    pub fn remember(&self, record: MemoryRecord) -> Result<()> {
        self.engine.write().remember(record)
    }

    /// Run a retrieval strategy.
    pub fn recall(
        &self,
        strategy: &dyn RetrievalStrategy,
        ctx: &RetrievalContext,
        opts: Option<RetrievalOptions>,
    ) -> Vec<RetrievedMemory> {
        self.engine.write().recall(strategy, ctx, opts)
    }

    /// Delete a memory everywhere.
    ///
    /// # Errors
    /// Unknown id.
    pub fn forget(&self, id: &MemoryId) -> Result<MemoryRecord> {
        self.engine.write().forget(id)
    }

    /// Memories mentioning an entity.
    #[must_use]
    pub fn memories_for_entity(&self, entity: &EntityRef) -> Vec<MemoryRecord> {
        self.engine.read().store().get_by_entity(entity)
    }

    /// Memories carrying a tag.
    #[must_use]
    pub fn memories_with_tag(&self, tag: &str) -> Vec<MemoryRecord> {
        self.engine.read().store().get_by_tag(tag)
    }

    /// Memories of one kind.
    #[must_use]
    pub fn memories_of_kind(&self, kind: MemoryKind) -> Vec<MemoryRecord> {
        self.engine.read().store().get_by_kind(kind)
    }

    /// Memories created within the last `days` days.
    #[must_use]
    pub fn recent_memories(&self, days: i64) -> Vec<MemoryRecord> {
        self.engine
            .read()
            .store()
            .get_recent(days, chrono_now())
    }

    /// Ids associated with a memory within `hops` steps.
    #[must_use]
    pub fn associated(&self, id: &MemoryId, hops: usize) -> Vec<MemoryId> {
        self.engine.read().associated(id, hops)
    }

    /// Force a consolidation pass outside the timer.
    ///
    /// # Errors
    /// Propagates storage failures.
    pub fn consolidate_now(&self) -> Result<ConsolidationReport> {
        self.engine.write().consolidate_once()
    }

    /// Force a decay pass outside the timer.
    pub fn decay_now(&self, rate: f32) -> DecayReport {
        self.engine.write().decay_once(rate)
    }

    /// Combined engine statistics.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.engine.read().stats()
    }

    /// Stop both timers. Safe to call any number of times; after the
    /// first call the service is a plain synchronous facade.
    pub fn dispose(&mut self) {
        let mut stopped = false;
        if let Some(task) = self.decay_task.take() {
            task.abort();
            stopped = true;
        }
        if let Some(task) = self.consolidation_task.take() {
            task.abort();
            stopped = true;
        }
        if stopped {
            info!("memory service timers stopped");
        }
    }
}

impl Drop for MemoryService {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Run one tick body, containing both errors and panics so the timer
/// survives.
fn run_tick<F>(name: &str, body: F)
where
    F: FnOnce() -> Result<()>,
{
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(body)) {
        Ok(Ok(())) => {}
        Ok(Err(error)) => warn!(tick = name, %error, "tick failed"),
        Err(_) => warn!(tick = name, "tick panicked"),
    }
}

fn chrono_now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::memory::{EpisodicContent, MemoryContent};
    use engram_core::retrieval::ContextualStrategy;

    fn episodic(id: &str, entity: &str) -> MemoryRecord {
        MemoryRecord::new(
            MemoryId::from(id),
            MemoryContent::Episodic(EpisodicContent::new(
                format!("event {id}"),
                vec![EntityRef::from(entity)],
                chrono::Utc::now(),
            )),
        )
    }

    #[tokio::test]
    async fn remember_and_lookup_round_trip() {
        let service = MemoryService::without_timers(EngramConfig::default());
        service.remember(episodic("m1", "john")).expect("remember");

        let johns = service.memories_for_entity(&EntityRef::from("john"));
        assert_eq!(johns.len(), 1);
        assert_eq!(johns[0].id, MemoryId::from("m1"));

        let recalled = service.recall(
            &ContextualStrategy,
            &RetrievalContext::new().with_entity(EntityRef::from("john")),
            None,
        );
        assert!(!recalled.is_empty());
    }

    #[tokio::test]
    async fn dispose_twice_is_safe() {
        let mut service = MemoryService::new(ServiceConfig {
            decay_interval_secs: 3600,
            consolidation_interval_secs: 3600,
            ..ServiceConfig::default()
        });
        service.dispose();
        service.dispose(); // no-op
    }

    #[tokio::test(start_paused = true)]
    async fn decay_timer_ticks() {
        let service = MemoryService::new(ServiceConfig {
            decay_interval_secs: 10,
            decay_rate: 0.5,
            consolidation_interval_secs: 0,
            ..ServiceConfig::default()
        });
        service.remember(episodic("m1", "john")).expect("remember");

        // Let the paused clock run past two tick periods.
        tokio::time::sleep(Duration::from_secs(25)).await;

        let engine = service.engine();
        let factor = engine
            .read()
            .store()
            .get(&MemoryId::from("m1"))
            .expect("exists")
            .decay_factor;
        assert!(factor < 1.0, "decay tick should have run, factor={factor}");
    }

    #[tokio::test]
    async fn manual_passes_work_without_timers() {
        let service = MemoryService::without_timers(EngramConfig::default());
        service.remember(episodic("m1", "john")).expect("remember");

        let decay = service.decay_now(0.25);
        assert_eq!(decay.records_decayed, 1);

        let report = service.consolidate_now().expect("consolidate");
        assert_eq!(report.consolidated, 0); // nothing ready yet

        let stats = service.stats();
        assert_eq!(stats.store.total, 1);
        assert_eq!(stats.buffer.size, 1);
    }
}
