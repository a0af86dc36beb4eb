//! Benchmarks for dependency deduplication

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use energylens::analytics::dedupe_dependents;
use energylens::models::TraceEntry;

fn build_traces(records: usize, hops: usize, distinct: usize) -> Vec<Vec<TraceEntry>> {
    (0..records)
        .map(|r| {
            (0..hops)
                .map(|h| {
                    let n = (r * hops + h) % distinct;
                    TraceEntry::new(format!("svc-{n}"), format!("api-{}", n % 3), 1.5)
                })
                .collect()
        })
        .collect()
}

fn bench_dedupe(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedupe_dependents");

    for (records, distinct) in [(100, 5), (1_000, 20), (10_000, 200)] {
        let traces = build_traces(records, 4, distinct);
        group.bench_function(format!("{records}_records_{distinct}_services"), |b| {
            b.iter(|| dedupe_dependents(black_box(&traces)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dedupe);
criterion_main!(benches);
