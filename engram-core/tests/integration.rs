//! Integration tests — end-to-end memory flows.
//!
//! Full lifecycle scenarios: store → associate → buffer → consolidate →
//! retrieve → decay → export/import, plus the cross-component
//! invariants (cascading deletes, graph consistency, buffer bounds).

use chrono::{DateTime, TimeZone, Utc};

use engram_core::config::{BufferConfig, EngramConfig, PatternConfig};
use engram_core::engine::MemoryEngine;
use engram_core::memory::{
    EmotionalContent, EpisodicContent, FactValue, MemoryContent, MemoryRecord, SemanticContent,
};
use engram_core::patterns::{PatternKind, PatternMiner};
use engram_core::retrieval::{
    AssociativeStrategy, ContextualStrategy, QueryStrategy, RetrievalContext, RetrievalOptions,
};
use engram_core::storage::MemoryQuery;
use engram_core::types::{EntityRef, MemoryId, MemoryKind};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().expect("timestamp")
}

fn episodic(id: &str, entities: &[&str], tags: &[&str], created: i64) -> MemoryRecord {
    MemoryRecord::new_at(
        MemoryId::from(id),
        MemoryContent::Episodic(
            EpisodicContent::new(
                format!("event {id}"),
                entities.iter().map(|e| EntityRef::from(*e)).collect(),
                ts(created),
            )
            .with_topics(tags.iter().copied()),
        ),
        ts(created),
    )
}

fn semantic(id: &str, subject: &str, predicate: &str, value: &str, created: i64) -> MemoryRecord {
    MemoryRecord::new_at(
        MemoryId::from(id),
        MemoryContent::Semantic(SemanticContent::new(
            subject,
            predicate,
            FactValue::text(value),
        )),
        ts(created),
    )
}

// ---------------------------------------------------------------------------
// Full lifecycle: store → consolidate → recall → decay → export/import
// ---------------------------------------------------------------------------

#[test]
fn full_memory_lifecycle() {
    let mut engine = MemoryEngine::new(EngramConfig::default());

    // 1. A morning of events around john.
    for i in 0..5 {
        engine
            .remember_at(
                episodic(&format!("m{i}"), &["john"], &["standup"], i * 600),
                ts(i * 600),
            )
            .expect("remember");
    }

    // 2. Associations formed among the john records.
    assert!(engine.graph().edge_count() > 0);

    // 3. Consolidation after the buffer window promotes them.
    let report = engine.consolidate_at(ts(10_000)).expect("consolidate");
    assert_eq!(report.consolidated, 5);
    assert!(engine.store().iter().all(|r| r.is_consolidated));

    // 4. Contextual recall surfaces the records and bumps access.
    let ctx = RetrievalContext::at(ts(10_100)).with_entity(EntityRef::from("john"));
    let results = engine.recall(&ContextualStrategy, &ctx, None);
    assert!(!results.is_empty());
    assert!(
        engine
            .store()
            .get(&results[0].record.id)
            .expect("exists")
            .metadata
            .access_count
            >= 1
    );

    // 5. Decay shrinks retention monotonically but never below zero.
    engine.decay_once(0.1);
    for record in engine.store().iter() {
        assert!(record.decay_factor < 1.0);
        assert!(record.decay_factor > 0.0);
        assert!(record.effective_importance() <= record.metadata.importance);
    }

    // 6. Export, wipe, import — identical ids come back.
    let json = engine.export_json().expect("export");
    engine.clear();
    assert_eq!(engine.store().count(), 0);

    let imported = engine.import_json(&json).expect("import");
    assert_eq!(imported, 5);
    for i in 0..5 {
        assert!(engine.store().exists(&MemoryId::from(format!("m{i}").as_str())));
    }
}

// ---------------------------------------------------------------------------
// Cascading delete
// ---------------------------------------------------------------------------

#[test]
fn delete_cascades_to_indexes_and_graph() {
    let mut engine = MemoryEngine::new(EngramConfig::default());
    engine
        .remember_at(episodic("e1", &["john"], &["work"], 0), ts(0))
        .expect("remember");
    engine
        .remember_at(episodic("e2", &["john"], &["work"], 60), ts(60))
        .expect("remember");

    // e2 linked to e1 at storage time.
    assert!(engine.graph().edge_count() >= 1);

    engine.forget(&MemoryId::from("e1")).expect("forget");

    let by_entity = engine.store().get_by_entity(&EntityRef::from("john"));
    assert_eq!(by_entity.len(), 1);
    assert_eq!(by_entity[0].id, MemoryId::from("e2"));
    assert!(engine.store().get_by_tag("work").len() == 1);
    assert!(!engine.graph().touches(&MemoryId::from("e1")));
}

// ---------------------------------------------------------------------------
// Entity scoping
// ---------------------------------------------------------------------------

#[test]
fn entity_lookup_returns_only_referencing_records() {
    let mut engine = MemoryEngine::new(EngramConfig::default());
    engine
        .remember_at(episodic("e1", &["john"], &["work"], 0), ts(0))
        .expect("remember");
    engine
        .remember_at(episodic("e2", &["jane"], &[], 0), ts(0))
        .expect("remember");

    let johns = engine.store().get_by_entity(&EntityRef::from("john"));
    assert_eq!(johns.len(), 1);
    assert_eq!(johns[0].id, MemoryId::from("e1"));
}

// ---------------------------------------------------------------------------
// Contradiction and newest-wins consolidation
// ---------------------------------------------------------------------------

#[test]
fn contradictory_facts_merge_newest_wins() {
    let mut engine = MemoryEngine::new(EngramConfig::default());

    let s1 = semantic("s1", "john", "favorite_color", "blue", 1_000);
    let s2 = semantic("s2", "john", "favorite_color", "red", 2_000);

    // The two records contradict.
    match (&s1.content, &s2.content) {
        (MemoryContent::Semantic(a), MemoryContent::Semantic(b)) => {
            assert!(a.contradicts(b));
        }
        _ => unreachable!(),
    }

    engine.remember_at(s1, ts(1_000)).expect("remember");
    // Consolidate s1 first so it is long-term knowledge.
    engine.consolidate_at(ts(10_000)).expect("consolidate");

    engine.remember_at(s2, ts(10_500)).expect("remember");
    let report = engine.consolidate_at(ts(20_000)).expect("consolidate");
    assert_eq!(report.integrated, 1);

    // The candidate was consumed; the survivor holds the newer value.
    assert!(!engine.store().exists(&MemoryId::from("s2")));
    let survivor = engine.store().get(&MemoryId::from("s1")).expect("exists");
    match &survivor.content {
        MemoryContent::Semantic(c) => assert_eq!(c.value, FactValue::text("red")),
        _ => panic!("expected semantic content"),
    }
}

// ---------------------------------------------------------------------------
// Buffer bounds
// ---------------------------------------------------------------------------

#[test]
fn buffer_never_exceeds_capacity_and_clears() {
    let config = EngramConfig {
        buffer: BufferConfig {
            capacity: 50,
            ..BufferConfig::default()
        },
        ..EngramConfig::default()
    };
    let mut engine = MemoryEngine::new(config);

    for i in 0..100 {
        engine
            .remember_at(
                episodic(&format!("m{i}"), &["someone"], &[], i),
                ts(i),
            )
            .expect("remember");
        assert!(engine.buffer().len() <= 50, "buffer exceeded 50 at insert {i}");
    }
    assert_eq!(engine.buffer().len(), 50);
    assert_eq!(engine.store().count(), 100);

    engine.clear();
    assert_eq!(engine.buffer().len(), 0);
}

// ---------------------------------------------------------------------------
// Graph invariants
// ---------------------------------------------------------------------------

#[test]
fn unreachable_paths_and_missing_edges() {
    let mut engine = MemoryEngine::new(EngramConfig::default());
    // Two islands with nothing in common, far apart in time.
    engine
        .remember_at(episodic("a", &["john"], &["work"], 0), ts(0))
        .expect("remember");
    engine
        .remember_at(
            episodic("b", &["maria"], &["sailing"], 90_000_000),
            ts(90_000_000),
        )
        .expect("remember");

    assert!(
        engine
            .graph()
            .find_path(&MemoryId::from("a"), &MemoryId::from("b"), 5)
            .is_none()
    );
}

// ---------------------------------------------------------------------------
// Pattern mining scenario
// ---------------------------------------------------------------------------

#[test]
fn mining_thirty_records_yields_topic_cluster() {
    let mut records = Vec::new();
    // Ten records sharing the exact tag trio, twenty with unique tags.
    for i in 0..10 {
        records.push(episodic(
            &format!("c{i}"),
            &["x"],
            &["rust", "memory", "agents"],
            i * 100,
        ));
    }
    for i in 0..20 {
        records.push(episodic(
            &format!("u{i}"),
            &["x"],
            &[&format!("solo-{i}")],
            50_000 + i * 100,
        ));
    }

    let mut miner = PatternMiner::new(PatternConfig::default());
    miner.mine_all(&records, ts(100_000));

    let cluster = miner
        .patterns()
        .values()
        .find(|p| p.kind == PatternKind::TopicCluster)
        .expect("a topic cluster");
    assert!(cluster.support >= 3);
    assert_eq!(cluster.support, 10);
}

// ---------------------------------------------------------------------------
// Associative recall across linked memories
// ---------------------------------------------------------------------------

#[test]
fn associative_recall_follows_shared_entities() {
    let mut engine = MemoryEngine::new(EngramConfig::default());
    engine
        .remember_at(episodic("seed", &["john", "jane"], &["project"], 0), ts(0))
        .expect("remember");
    engine
        .remember_at(
            episodic("related", &["jane"], &["project"], 3_600),
            ts(3_600),
        )
        .expect("remember");
    engine
        .remember_at(
            episodic("noise", &["bob"], &["gardening"], 8_000_000),
            ts(8_000_000),
        )
        .expect("remember");

    let ctx = RetrievalContext::at(ts(4_000)).with_seed(MemoryId::from("seed"));
    let results = engine.recall(&AssociativeStrategy, &ctx, None);

    assert!(!results.is_empty());
    assert_eq!(results[0].record.id, MemoryId::from("related"));
}

// ---------------------------------------------------------------------------
// Query strategy + emotional defaults
// ---------------------------------------------------------------------------

#[test]
fn query_recall_filters_by_kind_and_importance() {
    let mut engine = MemoryEngine::new(EngramConfig::default());
    engine
        .remember_at(
            episodic("keep", &["x"], &[], 0).with_importance(0.9),
            ts(0),
        )
        .expect("remember");
    engine
        .remember_at(
            episodic("drop", &["x"], &[], 0).with_importance(0.1),
            ts(0),
        )
        .expect("remember");
    engine
        .remember_at(
            MemoryRecord::new_at(
                MemoryId::from("feeling"),
                MemoryContent::Emotional(EmotionalContent::new(
                    "joy",
                    0.9,
                    0.8,
                    0.6,
                    ["shipping the release"],
                )),
                ts(0),
            )
            .with_importance(0.9),
            ts(0),
        )
        .expect("remember");

    let ctx = RetrievalContext::at(ts(100)).with_query(
        MemoryQuery::default()
            .with_kind(MemoryKind::Episodic)
            .with_min_importance(0.5),
    );
    let results = engine.recall(&QueryStrategy, &ctx, Some(RetrievalOptions::default()));

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].record.id, MemoryId::from("keep"));
}

// ---------------------------------------------------------------------------
// Generated ids
// ---------------------------------------------------------------------------

#[test]
fn hosts_without_an_id_scheme_can_mint_ids() {
    let mut engine = MemoryEngine::new(EngramConfig::default());
    let id = MemoryId::generate();
    engine
        .remember_at(
            MemoryRecord::new_at(
                id.clone(),
                MemoryContent::Episodic(EpisodicContent::new(
                    "first conversation",
                    vec![EntityRef::from("user")],
                    ts(0),
                )),
                ts(0),
            ),
            ts(0),
        )
        .expect("remember");
    assert!(engine.store().exists(&id));
}

// ---------------------------------------------------------------------------
// Co-retrieval reinforcement
// ---------------------------------------------------------------------------

#[test]
fn recall_reinforces_existing_edges() {
    let mut engine = MemoryEngine::new(EngramConfig::default());
    engine
        .remember_at(episodic("a", &["john"], &["work"], 0), ts(0))
        .expect("remember");
    engine
        .remember_at(episodic("b", &["john"], &["work"], 60), ts(60))
        .expect("remember");

    let strength_before: f32 = engine
        .graph()
        .get_outgoing(&MemoryId::from("b"))
        .iter()
        .map(|e| e.strength)
        .sum();

    let ctx = RetrievalContext::at(ts(200)).with_entity(EntityRef::from("john"));
    engine.recall(&ContextualStrategy, &ctx, None);

    let strength_after: f32 = engine
        .graph()
        .get_outgoing(&MemoryId::from("b"))
        .iter()
        .map(|e| e.strength)
        .sum();
    assert!(
        strength_after >= strength_before,
        "co-retrieval should not weaken edges"
    );
}
