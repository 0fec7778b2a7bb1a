//! Readers running alongside a writer must only ever see whole mutations.
//!
//! Run with:
//!   cargo test --test test_concurrency

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use taglens::{Attributes, EntityRef, QuerySpec, TagEngine, TagId};

const ENTITIES: usize = 40;

fn seeded_engine() -> Arc<TagEngine> {
    let engine = Arc::new(TagEngine::new());
    for i in 0..ENTITIES {
        let attrs = Attributes::from([("name".to_string(), format!("Entity {i}"))]);
        engine.upsert_entity("document", &format!("D{i}"), attrs).unwrap();
    }
    engine
}

#[test]
fn readers_never_see_partial_tag_delete() {
    let engine = seeded_engine();
    let stop = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut seen: HashMap<TagId, usize> = HashMap::new();
                while !stop.load(Ordering::Relaxed) {
                    let counts = engine.counts_by_tag().unwrap();
                    for (id, count) in &counts {
                        // Counts only grow while a tag lives; delete drops it whole.
                        let last = seen.entry(*id).or_insert(0);
                        assert!(*count >= *last, "count shrank from {last} to {count}");
                        *last = *count;
                    }
                    for gone in seen.keys().filter(|id| !counts.contains_key(id)).copied().collect::<Vec<_>>() {
                        assert!(engine.entities_of(gone).unwrap().is_empty());
                        seen.remove(&gone);
                    }
                    assert!(engine.is_consistent().unwrap());
                }
            })
        })
        .collect();

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            let everyone: Vec<EntityRef> = (0..ENTITIES)
                .map(|i| EntityRef::new("document", format!("D{i}")))
                .collect();
            for round in 0..50 {
                let tag = engine.create_tag(&format!("Round {round}")).unwrap();
                for entity in &everyone {
                    engine.assign(tag.id, entity).unwrap();
                }
                engine.delete_tag(tag.id).unwrap();
            }
        })
    };

    writer.join().unwrap();
    stop.store(true, Ordering::Relaxed);
    for r in readers {
        r.join().unwrap();
    }
    assert!(engine.list_tags().unwrap().is_empty());
}

#[test]
fn concurrent_queries_match_serial_result() {
    let engine = seeded_engine();
    let tag = engine.create_tag("Shared").unwrap();
    for i in (0..ENTITIES).step_by(2) {
        engine.assign(tag.id, &EntityRef::new("document", format!("D{i}"))).unwrap();
    }
    let expected = engine.query(&QuerySpec::new().tag(tag.id).text("entity")).unwrap();
    assert_eq!(expected.len(), ENTITIES / 2);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let expected = expected.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    let got = engine.query(&QuerySpec::new().tag(tag.id).text("entity")).unwrap();
                    assert_eq!(got, expected);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}
