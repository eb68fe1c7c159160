//! Criterion benchmarks for FinBlue hot paths.
//!
//! Benchmarks:
//! 1. Series annotation (SMA 50/200 + RSI 14 over the full history)
//! 2. Engine replay (state machine + settlement) at several history lengths

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use finblue_core::domain::Bar;
use finblue_core::engine::{run, EngineParams};
use finblue_core::series::{annotate, Windows};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2015, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.02).sin() * 25.0 + i as f64 * 0.01;
            Bar {
                symbol: "BENCH".into(),
                date: base_date + chrono::Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000,
                adj_close: close,
            }
        })
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_annotate(c: &mut Criterion) {
    let bars = make_bars(1_260);
    c.bench_function("annotate_5y", |b| {
        b.iter(|| annotate(black_box(&bars), Windows::default()))
    });
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_replay");
    for years in [5usize, 20] {
        let bars = make_bars(years * 252);
        let prices = annotate(&bars, Windows::default()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(years), &prices, |b, prices| {
            b.iter(|| run(black_box(prices), EngineParams::default()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_annotate, bench_replay);
criterion_main!(benches);
