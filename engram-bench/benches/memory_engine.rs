//! Engram benchmark suite.
//!
//! Tracks the hot paths a conversational host hits every turn:
//!   record_store_single ............ store + index one record
//!   contextual_retrieve_from_500 ... strategy pass over 500 records
//!   graph_neighborhood_2_hops ...... bounded traversal
//!   decay_pass_500 ................. full decay tick

use chrono::{DateTime, TimeZone, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use engram_core::config::{EmbeddingConfig, EngramConfig};
use engram_core::engine::MemoryEngine;
use engram_core::graph::AssociationGraph;
use engram_core::memory::{EpisodicContent, MemoryContent, MemoryRecord};
use engram_core::retrieval::{ContextualStrategy, RetrievalContext, RetrievalOptions, RetrievalStrategy};
use engram_core::storage::MemoryStore;
use engram_core::types::{AssociationKind, EntityRef, MemoryId};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().expect("timestamp")
}

fn make_record(i: usize) -> MemoryRecord {
    MemoryRecord::new_at(
        MemoryId::from(format!("mem-{i}").as_str()),
        MemoryContent::Episodic(
            EpisodicContent::new(
                format!("event number {i} happened during the conversation"),
                vec![
                    EntityRef::from("agent"),
                    EntityRef::from(format!("person-{}", i % 20).as_str()),
                ],
                ts(i as i64 * 60),
            )
            .with_topics([format!("topic-{}", i % 10)]),
        ),
        ts(i as i64 * 60),
    )
    .with_importance(((i % 100) as f32 / 100.0).clamp(0.1, 0.9))
}

fn populated_store(n: usize) -> MemoryStore {
    let mut store = MemoryStore::new(&EmbeddingConfig::default());
    for i in 0..n {
        store.store(make_record(i)).expect("store");
    }
    store
}

fn bench_record_store(c: &mut Criterion) {
    c.bench_function("record_store_single", |b| {
        let mut store = MemoryStore::new(&EmbeddingConfig::default());
        let mut i = 0;
        b.iter(|| {
            store.store(black_box(make_record(i))).expect("store");
            i += 1;
        });
    });
}

fn bench_contextual_retrieval(c: &mut Criterion) {
    let store = populated_store(500);
    let ctx = RetrievalContext::at(ts(500 * 60))
        .with_entity(EntityRef::from("person-3"))
        .with_topic("topic-3");
    let opts = RetrievalOptions::default();

    c.bench_function("contextual_retrieve_from_500", |b| {
        b.iter(|| {
            let results = ContextualStrategy.retrieve(
                black_box(&ctx),
                black_box(&opts),
                black_box(&store),
            );
            black_box(results);
        });
    });
}

fn bench_graph_neighborhood(c: &mut Criterion) {
    let mut graph = AssociationGraph::new();
    // A ring with chords: every node links to the next and to +7.
    for i in 0..500usize {
        let a = MemoryId::from(format!("mem-{i}").as_str());
        let b = MemoryId::from(format!("mem-{}", (i + 1) % 500).as_str());
        let chord = MemoryId::from(format!("mem-{}", (i + 7) % 500).as_str());
        graph.add_association(a.clone(), b, AssociationKind::Temporal, 0.6, ts(0));
        graph.add_association(a, chord, AssociationKind::SharedTopic, 0.4, ts(0));
    }
    let origin = MemoryId::from("mem-0");

    c.bench_function("graph_neighborhood_2_hops", |b| {
        b.iter(|| {
            let hood = graph.get_neighborhood(black_box(&origin), 2);
            black_box(hood);
        });
    });
}

fn bench_decay_pass(c: &mut Criterion) {
    c.bench_function("decay_pass_500", |b| {
        let mut engine = MemoryEngine::new(EngramConfig::default());
        for i in 0..500 {
            engine
                .remember_at(make_record(i), ts(i as i64 * 60))
                .expect("remember");
        }
        b.iter(|| {
            let report = engine.decay_once(black_box(0.001));
            black_box(report);
        });
    });
}

criterion_group!(
    benches,
    bench_record_store,
    bench_contextual_retrieval,
    bench_graph_neighborhood,
    bench_decay_pass
);
criterion_main!(benches);
