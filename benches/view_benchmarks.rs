//! Result view benchmarks: column filtering and sorting over fetched rowsets.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::time::Duration;

use querybench::value::{Row, RowValue};
use querybench::view::{apply_view, ColumnFilters, SortState};

fn make_rows(size: usize) -> Vec<Row> {
    (0..size)
        .map(|i| {
            let score = if i % 7 == 0 {
                RowValue::Null
            } else {
                RowValue::from(((i * 7919) % 1000) as i64)
            };
            Row::new()
                .with("id", i as i64)
                .with("name", format!("project-{:05}", (i * 31) % size).as_str())
                .with("status", if i % 3 == 0 { "active" } else { "archived" })
                .with("score", score)
        })
        .collect()
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("column_filter");
    for size in [1_000usize, 10_000] {
        let rows = make_rows(size);
        let mut filters = ColumnFilters::new();
        filters.insert("status".to_string(), "ACT".to_string());

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| apply_view(black_box(&rows), &filters, None));
        });
    }
    group.finish();
}

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort");
    for size in [1_000usize, 10_000] {
        let rows = make_rows(size);
        let by_score = SortState::descending("score");
        let by_name = SortState::ascending("name");

        group.bench_with_input(BenchmarkId::new("numeric", size), &size, |b, _| {
            b.iter(|| apply_view(black_box(&rows), &ColumnFilters::new(), Some(&by_score)));
        });
        group.bench_with_input(BenchmarkId::new("text", size), &size, |b, _| {
            b.iter(|| apply_view(black_box(&rows), &ColumnFilters::new(), Some(&by_name)));
        });
    }
    group.finish();
}

fn bench_filter_and_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_and_sort");
    for size in [1_000usize, 10_000] {
        let rows = make_rows(size);
        let mut filters = ColumnFilters::new();
        filters.insert("name".to_string(), "project-00".to_string());
        let sort = SortState::ascending("score");

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| apply_view(black_box(&rows), &filters, Some(&sort)));
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(2));
    targets = bench_filter, bench_sort, bench_filter_and_sort
}
criterion_main!(benches);
