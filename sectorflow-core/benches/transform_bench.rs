//! Benchmarks for the join → filter → aggregate path.

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sectorflow_core::transform::{
    aggregate_by_sector, filter_rows, left_join, FilterCriteria, ReferenceRow, SeriesRow,
};

const SECTORS: [&str; 4] = ["TECHNOLOGY", "FINANCE", "ENERGY", "HEALTHCARE"];

fn make_series(symbols: usize, days: usize) -> Vec<SeriesRow> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut rows = Vec::with_capacity(symbols * days);
    for s in 0..symbols {
        for d in 0..days {
            let base = 100.0 + (s * 7 + d) as f64 % 50.0;
            rows.push(SeriesRow {
                symbol: format!("S{s:03}"),
                timestamp: start + Duration::days(d as i64),
                open: Some(base),
                high: Some(base + 2.0),
                low: Some(base - 2.0),
                close: Some(base + 0.5),
                volume: Some(1_000.0 + d as f64),
            });
        }
    }
    rows
}

fn make_reference(symbols: usize) -> Vec<ReferenceRow> {
    (0..symbols)
        .map(|s| ReferenceRow {
            symbol: format!("S{s:03}"),
            sector: Some(SECTORS[s % SECTORS.len()].to_string()),
        })
        .collect()
}

fn bench_pipeline(c: &mut Criterion) {
    let series = make_series(50, 750);
    let reference = make_reference(50);
    let criteria = FilterCriteria::default();

    c.bench_function("left_join_50x750", |b| {
        b.iter(|| left_join(black_box(&series), black_box(&reference)))
    });

    let joined = left_join(&series, &reference);
    c.bench_function("filter_aggregate_50x750", |b| {
        b.iter(|| aggregate_by_sector(filter_rows(black_box(&joined), &criteria)))
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
