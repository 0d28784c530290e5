use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use querito_core::{
    normalize, normalize_resource, EntryState, FilterValue, ListQuery, QueryOptions, ResourceDef,
    SortSpec,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

fn query_with_fields(count: usize) -> ListQuery {
    let mut query = ListQuery::new()
        .sort(SortSpec::desc("createdAt"))
        .page(1)
        .limit(20);
    for i in 0..count {
        let value = match i % 4 {
            0 => FilterValue::Eq(format!("value{i}").into()),
            1 => FilterValue::Like(format!("term{i}").into()),
            2 => FilterValue::Gte((i as i64).into()),
            _ => FilterValue::In(vec!["ACTIVE".into(), "PREVIEW".into()]),
        };
        query = query.filter(format!("field{i:02}"), value);
    }
    query
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    for size in [1, 5, 20].iter() {
        let query = query_with_fields(*size);
        group.bench_with_input(BenchmarkId::new("fields", size), &query, |b, query| {
            b.iter(|| normalize(black_box("question-list"), black_box(query)));
        });
    }

    let pokemon = ResourceDef::new("pokemon-list", "/pokemon").with_search_field("name");
    let search = ListQuery::new()
        .filter("search", "pika")
        .filter("rarity", "RARE")
        .filter("type", "all")
        .page(2)
        .limit(20);
    group.bench_function("resource_rewrite", |b| {
        b.iter(|| normalize_resource(black_box(&pokemon), black_box(&search)));
    });

    group.finish();
}

fn bench_entry_lifecycle(c: &mut Criterion) {
    let key = normalize("reward-list", &query_with_fields(3))
        .unwrap()
        .cache_key;
    let options = QueryOptions::default();
    let payload = Arc::new(json!({"items": [1, 2, 3]}));

    c.bench_function("entry_fetch_complete", |b| {
        b.iter(|| {
            let now = Instant::now();
            let mut state = EntryState::new(key.clone(), &options, now);
            let ticket = state.begin_fetch();
            state.complete(ticket.generation, Ok(Arc::clone(&payload)), now);
            black_box(state.decide(now, true))
        });
    });
}

criterion_group!(benches, bench_normalize, bench_entry_lifecycle);
criterion_main!(benches);
