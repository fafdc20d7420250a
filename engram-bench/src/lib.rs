//! Benchmark-only crate; see `benches/memory_engine.rs`.
