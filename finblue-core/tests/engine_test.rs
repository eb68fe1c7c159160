//! Integration tests for the backtest engine.
//!
//! Tests:
//! 1. Flat market: no cross ever, capital idle, management fee only
//! 2. Golden cross then death cross: round trip with both fees
//! 3. Trailing stop: forced exit without a death cross; the peak restarts on re-entry
//! 4. Same-day stop-loss and death cross: exactly one exit, no re-entry that day
//! 5. Full pipeline: bars → annotate → run

use chrono::NaiveDate;
use finblue_core::domain::{Bar, PricePoint};
use finblue_core::engine::{
    run, step, BacktestError, EngineParams, Phase, PositionState, TransitionKind,
};
use finblue_core::series::{annotate, Windows};

const CAPITAL: f64 = 100_000.0;

fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 3).unwrap() + chrono::Duration::days(i as i64)
}

/// Build a series from (close, golden?) rows: golden → fast above slow,
/// otherwise fast below slow.
fn crossing_series(rows: &[(f64, bool)]) -> Vec<PricePoint> {
    rows.iter()
        .enumerate()
        .map(|(i, &(close, golden))| {
            let (fast, slow) = if golden { (2.0, 1.0) } else { (1.0, 2.0) };
            PricePoint::new(day(i), close, fast, slow)
        })
        .collect()
}

fn approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn flat_market_never_trades() {
    let prices: Vec<PricePoint> = (0..300)
        .map(|i| PricePoint::new(day(i), 100.0, 100.0, 100.0))
        .collect();
    let result = run(&prices, EngineParams::new(CAPITAL, 10.0)).unwrap();

    assert_eq!(result.daily_values.len(), 300);
    assert!(result.daily_values.iter().all(|&v| v == CAPITAL));
    assert!(result.events.is_empty());
    assert_eq!(result.final_phase, Phase::Flat);

    let s = result.settlement;
    assert_eq!(s.gross_profit, 0.0);
    approx(s.management_fee, 2_000.0);
    assert_eq!(s.performance_fee, 0.0);
    approx(s.net_client_value, 98_000.0);
}

#[test]
fn golden_then_death_cross_round_trip() {
    // Death cross until day 10, golden from day 10 to 39, death from day 40.
    // Price steps from 50 to 60 without ever falling, so the stop never fires.
    let rows: Vec<(f64, bool)> = (0..50)
        .map(|i| {
            let close = if i <= 10 {
                50.0
            } else if i >= 40 {
                60.0
            } else {
                50.0 + (i - 10) as f64 / 3.0
            };
            (close, (10..40).contains(&i))
        })
        .collect();
    let prices = crossing_series(&rows);
    let result = run(&prices, EngineParams::new(CAPITAL, 10.0)).unwrap();

    let kinds: Vec<_> = result.events.iter().map(|e| (e.date, e.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            (day(10), TransitionKind::Entry),
            (day(40), TransitionKind::SignalExit)
        ]
    );
    assert_eq!(result.events[0].price, 50.0);
    assert_eq!(result.events[1].price, 60.0);

    // Flat before entry and after exit.
    assert!(result.daily_values[..10].iter().all(|&v| v == CAPITAL));
    approx(result.daily_values[49], 120_000.0);

    let s = result.settlement;
    approx(s.gross_profit, 20_000.0);
    approx(s.performance_fee, 4_000.0);
    approx(s.management_fee, 2_000.0);
    approx(s.total_fees, 6_000.0);
    approx(s.net_client_value, 114_000.0);
}

#[test]
fn trailing_stop_exits_without_death_cross() {
    let prices = crossing_series(&[
        (100.0, true),
        (110.0, true),
        (120.0, true),
        (115.0, true),
        (107.0, true),
    ]);
    let result = run(&prices, EngineParams::new(CAPITAL, 10.0)).unwrap();

    assert_eq!(result.events.len(), 2);
    let exit = result.events[1];
    assert_eq!(exit.kind, TransitionKind::StopLossExit);
    assert_eq!(exit.date, day(4));
    assert_eq!(exit.price, 107.0);
    assert_eq!(exit.peak_price, 120.0);
    assert!(exit.drawdown() > 0.10);

    assert_eq!(result.final_phase, Phase::Flat);
    approx(result.settlement.final_value, CAPITAL * 1.07);
}

#[test]
fn peak_restarts_at_each_entry() {
    // First trip peaks at 200 and exits on the death cross at 190. The second
    // trip enters at 100 and peaks at 120; measured from 200 it would have
    // stopped out on day 6.
    let prices = crossing_series(&[
        (100.0, false),
        (100.0, true),
        (200.0, true),
        (190.0, false),
        (100.0, false),
        (100.0, true),
        (120.0, true),
        (105.0, true),
    ]);
    let result = run(&prices, EngineParams::new(CAPITAL, 10.0)).unwrap();

    let kinds: Vec<_> = result.events.iter().map(|e| (e.date, e.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            (day(1), TransitionKind::Entry),
            (day(3), TransitionKind::SignalExit),
            (day(5), TransitionKind::Entry),
            (day(7), TransitionKind::StopLossExit),
        ]
    );
    assert_eq!(result.events[2].peak_price, 100.0);

    let stop = result.events[3];
    assert_eq!(stop.peak_price, 120.0);
    approx(stop.drawdown(), 0.125);

    // 1,000 shares sold at 190, then 1,900 shares bought at 100 and stopped at 105.
    approx(result.settlement.final_value, 199_500.0);
}

#[test]
fn stop_loss_and_death_cross_same_day_exit_once() {
    let prices = crossing_series(&[(100.0, true), (85.0, false), (86.0, true)]);
    let result = run(&prices, EngineParams::new(CAPITAL, 10.0)).unwrap();

    let on_day_1: Vec<_> = result.events.iter().filter(|e| e.date == day(1)).collect();
    assert_eq!(on_day_1.len(), 1);
    assert_eq!(on_day_1[0].kind, TransitionKind::StopLossExit);

    // Re-entry waits for the next day.
    assert_eq!(result.events[2].kind, TransitionKind::Entry);
    assert_eq!(result.events[2].date, day(2));
    approx(result.daily_values[1], 85_000.0);
}

#[test]
fn stop_loss_exit_suppresses_same_day_reentry() {
    let mut state = PositionState::Long {
        shares: 10.0,
        peak_price: 100.0,
    };
    let p = PricePoint::new(day(0), 80.0, 2.0, 1.0);
    let out = step(state, &p, 0.10);
    assert_eq!(out.event.map(|e| e.kind), Some(TransitionKind::StopLossExit));
    assert_eq!(out.state.phase(), Phase::Flat);

    state = out.state;
    let next = step(state, &PricePoint::new(day(1), 80.0, 2.0, 1.0), 0.10);
    assert_eq!(next.event.map(|e| e.kind), Some(TransitionKind::Entry));
}

#[test]
fn full_stop_loss_never_fires() {
    let prices = crossing_series(&[(100.0, true), (1.0, true), (0.5, true)]);
    let result = run(&prices, EngineParams::new(CAPITAL, 100.0)).unwrap();
    assert_eq!(result.exits_by(TransitionKind::StopLossExit), 0);
    assert_eq!(result.final_phase, Phase::Long);
    approx(result.settlement.final_value, 500.0);
    assert!(result.settlement.net_client_value < 0.0);
}

#[test]
fn input_series_is_not_mutated() {
    let prices = crossing_series(&[(10.0, true), (12.0, false)]);
    let before = prices.clone();
    let _ = run(&prices, EngineParams::default()).unwrap();
    assert_eq!(prices, before);
}

#[test]
fn out_of_order_dates_rejected() {
    let mut prices = crossing_series(&[(10.0, true), (11.0, true), (12.0, true)]);
    prices.swap(1, 2);
    let err = run(&prices, EngineParams::default()).unwrap_err();
    assert!(matches!(err, BacktestError::InvalidInput { index: 2, .. }));
}

fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            symbol: "TRENT.NS".into(),
            date: day(i),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 10_000,
            adj_close: close,
        })
        .collect()
}

#[test]
fn pipeline_rising_market_enters_on_first_eligible_day() {
    let closes: Vec<f64> = (0..260).map(|i| 100.0 + i as f64 * 0.5).collect();
    let bars = bars_from_closes(&closes);
    let prices = annotate(&bars, Windows::default()).unwrap();
    assert_eq!(prices.len(), 61);
    assert_eq!(prices[0].date, day(199));

    let result = run(&prices, EngineParams::default()).unwrap();
    assert_eq!(result.daily_values.len(), prices.len());
    assert_eq!(result.entries(), 1);
    assert_eq!(result.events[0].date, day(199));

    let entry = closes[199];
    let last = closes[259];
    approx(result.settlement.gross_profit, CAPITAL * (last / entry - 1.0));
}

#[test]
fn pipeline_short_history_is_insufficient() {
    let bars = bars_from_closes(&vec![100.0; 150]);
    let prices = annotate(&bars, Windows::default()).unwrap();
    assert_eq!(
        run(&prices, EngineParams::default()).unwrap_err(),
        BacktestError::InsufficientData
    );
}
