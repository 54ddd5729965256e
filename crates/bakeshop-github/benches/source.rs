//! Datasource hot-path benchmarks: template resolution, cache keys, and
//! record normalization.

use bakeshop_github::{PathTemplate, RequestFields, ResponseCache, normalize};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

fn request_fields() -> RequestFields {
    let mut fields = RequestFields::new();
    fields.insert("owner".to_string(), "cakephp".to_string());
    fields.insert("repo".to_string(), "debug_kit".to_string());
    fields.insert("_action".to_string(), "contributors".to_string());
    fields
}

fn bench_template(c: &mut Criterion) {
    let mut group = c.benchmark_group("template");
    let template = PathTemplate::parse("/repos/:owner/:repo/:_action").unwrap();
    let fields = request_fields();

    group.bench_function("parse", |b| {
        b.iter(|| {
            let _ = black_box(PathTemplate::parse(black_box("/repos/:owner/:repo/:_action")));
        });
    });

    group.bench_function("resolve", |b| {
        b.iter(|| {
            let _ = black_box(template.resolve(black_box(&fields)));
        });
    });

    group.finish();
}

fn bench_cache_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache");
    let cache = ResponseCache::new(Duration::from_secs(60), "github");

    group.bench_function("key", |b| {
        b.iter(|| {
            let _ = black_box(cache.key(black_box("/repos/cakephp/debug_kit"), None));
        });
    });

    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    let payload: sonic_rs::Value = sonic_rs::from_str(
        r#"[
            {"login":"alice","contributions":120},
            {"login":"bob","contributions":88},
            {"login":"carol","contributions":61},
            {"login":"dave","contributions":12}
        ]"#,
    )
    .unwrap();

    group.bench_function("contributors", |b| {
        b.iter(|| {
            let _ = black_box(normalize(
                black_box("repository"),
                black_box(Some("contributors")),
                black_box(&payload),
            ));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_template, bench_cache_key, bench_normalize);
criterion_main!(benches);
