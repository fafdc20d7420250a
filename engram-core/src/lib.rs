//! # Engram Core Library
//!
//! Agent-agnostic memory engine for conversational agents.
//!
//! Every agent gets a [`MemoryEngine`] holding structured memories
//! grounded in cognitive science:
//!
//! - **Episodic** — "What happened" (Tulving, 1972)
//! - **Semantic** — "What I know" (Tulving, 1985)
//! - **Procedural** — "What I know how to do" (Anderson ACT-R, 1993)
//! - **Emotional** — "How I felt" (Russell circumplex, 1980)
//!
//! Records are indexed four ways (entity, tag, kind, day), linked into
//! a weighted association graph, admitted to a bounded short-term
//! buffer, and periodically consolidated into long-term storage.
//! Retrieval runs through five interchangeable strategies; batch
//! pattern mining and attention-based importance re-weighting run over
//! the full corpus on demand.
//!
//! The engine is single-writer and synchronous: it owns no timers and
//! performs no I/O beyond config loading. The `engram-service` crate
//! wraps it with a lock and the periodic decay/consolidation ticks.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod association;
pub mod attention;
pub mod buffer;
pub mod cipher;
pub mod config;
pub mod consolidation;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod graph;
pub mod index;
pub mod memory;
pub mod metrics;
pub mod patterns;
pub mod retrieval;
pub mod similarity;
pub mod storage;
pub mod types;
pub mod vector;

pub use config::EngramConfig;
pub use engine::MemoryEngine;
pub use error::EngramError;
pub use memory::{MemoryContent, MemoryRecord};
pub use storage::{MemoryQuery, MemoryStore};
pub use types::*;
