//! Query building and rendering benchmarks.

use bakeshop_finder::{IndexOptions, PackageQuery, find_index};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn faceted_options() -> IndexOptions {
    IndexOptions {
        has: vec!["models".to_string(), "behaviors".to_string()],
        keyword: vec!["auth".to_string()],
        version: Some("2.x".to_string()),
        query: Some("acl".to_string()),
        watchers: Some(5),
        since: Some("2024-01-01".to_string()),
        sort: Some("watchers".to_string()),
        direction: Some("asc".to_string()),
        ..IndexOptions::default()
    }
}

fn bench_find_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_index");
    let empty = IndexOptions::default();
    let faceted = faceted_options();

    group.bench_function("empty", |b| {
        b.iter(|| {
            let _ = black_box(find_index(PackageQuery::new(), black_box(&empty)));
        });
    });

    group.bench_function("faceted", |b| {
        b.iter(|| {
            let _ = black_box(find_index(PackageQuery::new(), black_box(&faceted)));
        });
    });

    group.finish();
}

fn bench_to_sql(c: &mut Criterion) {
    let mut group = c.benchmark_group("to_sql");
    let spec = find_index(PackageQuery::new(), &faceted_options()).finish();

    group.bench_function("faceted", |b| {
        b.iter(|| {
            let _ = black_box(spec.to_sql());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_find_index, bench_to_sql);
criterion_main!(benches);
