//! Cleaning and modeling throughput benchmark
//!
//! Measures the cleaner and the split/scale/fit path on synthetic village
//! tables of increasing size.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench cleaning_throughput
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use electrify::cleaning::clean;
use electrify::config::{CleaningConfig, ModelConfig, SplitConfig};
use electrify::model::fit_and_report;
use electrify::preprocess::prepare;
use electrify::table::{Table, REQUIRED_COLUMNS};
use std::fmt::Write;

/// Deterministic village table with a sprinkling of gaps, duplicates and
/// out-of-range values
fn synthetic_csv(rows: usize) -> String {
    let mut csv = REQUIRED_COLUMNS.join(",");
    csv.push('\n');
    for i in 0..rows {
        let population = 500 + (i * 7919) % 90_000;
        let area = 1.0 + (i % 97) as f64;
        let density = if i % 53 == 0 {
            -1.0
        } else {
            population as f64 / area
        };
        let distance = (i % 120) as f64 + 0.5;
        let electrification = 100.0 - 0.6 * distance + (i % 11) as f64;
        let population = if i % 29 == 0 {
            String::new()
        } else {
            population.to_string()
        };
        // every 31st row repeats the previous village name
        let name = if i % 31 == 0 && i > 0 { i - 1 } else { i };
        let _ = writeln!(
            csv,
            "V{name},{population},{area},{density},{distance},{electrification}"
        );
    }
    csv
}

fn load(csv: &str) -> Table {
    Table::from_reader(csv.as_bytes(), "bench").unwrap()
}

fn bench_cleaning(c: &mut Criterion) {
    let mut group = c.benchmark_group("clean");
    let config = CleaningConfig::default();

    for rows in [100, 1_000, 10_000] {
        let csv = synthetic_csv(rows);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &csv, |b, csv| {
            b.iter(|| clean(black_box(load(csv)), &config).unwrap());
        });
    }
    group.finish();
}

fn bench_modeling(c: &mut Criterion) {
    let mut group = c.benchmark_group("prepare_and_fit");
    let split = SplitConfig::default();
    let model = ModelConfig::default();

    for rows in [100, 1_000, 10_000] {
        let (cleaned, _) = clean(load(&synthetic_csv(rows)), &CleaningConfig::default()).unwrap();
        group.throughput(Throughput::Elements(cleaned.n_rows() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &cleaned, |b, table| {
            b.iter(|| {
                let prepared = prepare(black_box(table), &split).unwrap();
                fit_and_report(&prepared, &model).unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cleaning, bench_modeling);
criterion_main!(benches);
