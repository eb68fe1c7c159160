//! Performance metrics over a replay.
//!
//! Each metric is a pure function of the daily value curve or the transition
//! log. Nothing here touches the engine state machine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use finblue_core::engine::{BacktestResult, TransitionEvent, TransitionKind};

/// Trading days per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Aggregate statistics for a single backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Gross profit over initial capital, as a fraction.
    pub total_return: f64,
    /// `total_return` × 100.
    pub roi_pct: f64,
    pub cagr: f64,
    pub sharpe: f64,
    /// Largest peak-to-trough decline of the daily value curve, as a negative fraction.
    pub max_drawdown: f64,
    /// Number of entries.
    pub trade_count: usize,
    pub signal_exits: usize,
    pub stop_loss_exits: usize,
    /// Fraction of closed round trips that exited above their entry value.
    pub win_rate: f64,
    /// Fraction of replay days spent holding shares.
    pub exposure: f64,
}

impl PerformanceMetrics {
    pub fn compute(
        dates: &[NaiveDate],
        daily_values: &[f64],
        events: &[TransitionEvent],
        initial_capital: f64,
    ) -> Self {
        let total = total_return(daily_values, initial_capital);
        Self {
            total_return: total,
            roi_pct: total * 100.0,
            cagr: cagr(daily_values, initial_capital),
            sharpe: sharpe_ratio(daily_values),
            max_drawdown: max_drawdown(daily_values),
            trade_count: count(events, TransitionKind::Entry),
            signal_exits: count(events, TransitionKind::SignalExit),
            stop_loss_exits: count(events, TransitionKind::StopLossExit),
            win_rate: win_rate(events),
            exposure: exposure(dates, events),
        }
    }

    pub fn from_result(result: &BacktestResult) -> Self {
        Self::compute(
            &result.dates,
            &result.daily_values,
            &result.events,
            result.initial_capital,
        )
    }
}

fn count(events: &[TransitionEvent], kind: TransitionKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

/// (final - capital) / capital. Zero for an empty curve or non-positive capital.
pub fn total_return(daily_values: &[f64], initial_capital: f64) -> f64 {
    match daily_values.last() {
        Some(&last) if initial_capital > 0.0 => (last - initial_capital) / initial_capital,
        _ => 0.0,
    }
}

/// Compound annual growth over `daily_values.len()` trading days.
pub fn cagr(daily_values: &[f64], initial_capital: f64) -> f64 {
    let Some(&last) = daily_values.last() else {
        return 0.0;
    };
    if initial_capital <= 0.0 || last <= 0.0 {
        return 0.0;
    }
    let years = daily_values.len() as f64 / TRADING_DAYS_PER_YEAR;
    (last / initial_capital).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe ratio of day-over-day returns, zero risk-free rate.
///
/// Returns 0.0 for fewer than two returns or a flat curve.
pub fn sharpe_ratio(daily_values: &[f64]) -> f64 {
    let returns = daily_returns(daily_values);
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = var.sqrt();
    if std < 1e-15 {
        return 0.0;
    }
    mean / std * TRADING_DAYS_PER_YEAR.sqrt()
}

pub fn max_drawdown(daily_values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &v in daily_values {
        peak = peak.max(v);
        if peak > 0.0 {
            worst = worst.min((v - peak) / peak);
        }
    }
    worst
}

/// Fraction of closed round trips whose exit value beat the entry value.
pub fn win_rate(events: &[TransitionEvent]) -> f64 {
    let mut closed = 0usize;
    let mut wins = 0usize;
    let mut entry_value = None;
    for e in events {
        match (e.kind, entry_value) {
            (TransitionKind::Entry, _) => entry_value = Some(e.value),
            (kind, Some(v)) if kind.is_exit() => {
                closed += 1;
                if e.value > v {
                    wins += 1;
                }
                entry_value = None;
            }
            _ => {}
        }
    }
    if closed == 0 {
        0.0
    } else {
        wins as f64 / closed as f64
    }
}

/// Fraction of replay days spent long.
///
/// An entry on day `i` is long from day `i`; an exit on day `j` is flat from day `j`.
/// A position still open at the end counts through the last day.
pub fn exposure(dates: &[NaiveDate], events: &[TransitionEvent]) -> f64 {
    if dates.is_empty() {
        return 0.0;
    }
    let index_of = |date: NaiveDate| dates.partition_point(|d| *d < date);
    let mut held = 0usize;
    let mut open = None;
    for e in events {
        match (e.kind, open) {
            (TransitionKind::Entry, _) => open = Some(index_of(e.date)),
            (kind, Some(start)) if kind.is_exit() => {
                held += index_of(e.date).saturating_sub(start);
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        held += dates.len().saturating_sub(start);
    }
    held as f64 / dates.len() as f64
}

/// Day-over-day simple returns. Empty for fewer than two values.
pub fn daily_returns(daily_values: &[f64]) -> Vec<f64> {
    daily_values
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}
