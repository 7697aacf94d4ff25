//! Micro benchmarks for the normalized-cache write path.

use std::sync::Arc;

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput,
};
use graft::{
    CacheConfig, EdgeMap, EdgeMapNode, Editor, FieldIdentifier, Snapshot, WriteQuery, QUERY_ROOT,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::json;

const ENTITY_COUNT: usize = 1_024;

fn items_query() -> WriteQuery {
    WriteQuery::new(
        QUERY_ROOT,
        EdgeMap::new(EdgeMapNode::default().with_child("items", EdgeMapNode::default())),
    )
}

fn viewer_query() -> WriteQuery {
    WriteQuery::new(
        QUERY_ROOT,
        EdgeMap::new(EdgeMapNode::default().with_child("viewer", EdgeMapNode::default())),
    )
}

fn feed_payload(rng: &mut ChaCha8Rng, count: usize) -> serde_json::Value {
    let items: Vec<serde_json::Value> = (0..count)
        .map(|index| {
            let friend = if index > 0 {
                json!({ "id": rng.gen_range(0..index) as i64 })
            } else {
                json!(null)
            };
            json!({
                "id": index as i64,
                "name": format!("entity-{index}"),
                "score": rng.gen_range(0..1_000i64),
                "extra": index % 7 == 0,
                "friend": friend,
            })
        })
        .collect();
    json!({ "items": items })
}

fn merge_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    group.sample_size(30);

    let config = Arc::new(CacheConfig::new(Arc::new(FieldIdentifier::new("id"))));
    let query = items_query();
    let mut rng = ChaCha8Rng::seed_from_u64(0xCAFE_D00D);
    let payload = feed_payload(&mut rng, ENTITY_COUNT);

    group.throughput(Throughput::Elements(ENTITY_COUNT as u64));
    group.bench_function("initial_write", |b| {
        b.iter_batched(
            || payload.clone(),
            |payload| {
                let mut editor = Editor::new(config.clone(), Arc::new(Snapshot::empty()));
                editor.merge(&query, payload).expect("merge");
                black_box(editor.commit().snapshot.len());
            },
            BatchSize::SmallInput,
        );
    });

    let warm = {
        let mut editor = Editor::new(config.clone(), Arc::new(Snapshot::empty()));
        editor.merge(&query, payload.clone()).expect("merge");
        Arc::new(editor.commit().snapshot)
    };

    group.throughput(Throughput::Elements(ENTITY_COUNT as u64));
    group.bench_function("noop_remerge", |b| {
        b.iter_batched(
            || payload.clone(),
            |payload| {
                let mut editor = Editor::new(config.clone(), warm.clone());
                editor.merge(&query, payload).expect("merge");
                black_box(editor.commit().edited.len());
            },
            BatchSize::SmallInput,
        );
    });

    let update_query = viewer_query();
    group.throughput(Throughput::Elements(1));
    group.bench_function("single_entity_update", |b| {
        b.iter_batched(
            || json!({ "viewer": { "id": 5, "score": 1_001 } }),
            |payload| {
                let mut editor = Editor::new(config.clone(), warm.clone());
                editor.merge(&update_query, payload).expect("merge");
                black_box(editor.commit().edited.len());
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, merge_benchmark);
criterion_main!(benches);
