use std::hint::black_box;

use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, Criterion};
use schedule_engine::{expand, marked_dates, EngineConfig, Frequency, RecurrenceRule};

fn bench_expansion(c: &mut Criterion) {
    let base = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
    let config = EngineConfig::default();

    let daily = RecurrenceRule::new(Frequency::Daily, 1);
    c.bench_function("expand daily to horizon", |b| {
        b.iter(|| expand(black_box(base), black_box(&daily), NaiveDate::MAX))
    });

    let monthly = RecurrenceRule::new(Frequency::Monthly, 1);
    c.bench_function("expand monthly to horizon", |b| {
        b.iter(|| expand(black_box(base), black_box(&monthly), NaiveDate::MAX))
    });

    let window_end = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
    c.bench_function("marked dates for one year", |b| {
        b.iter(|| marked_dates(black_box(base), Some(&daily), window_end, &config))
    });
}

criterion_group!(benches, bench_expansion);
criterion_main!(benches);
