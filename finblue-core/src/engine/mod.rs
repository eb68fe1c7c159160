//! Backtest engine: replays a trend-following strategy over a price series.
//!
//! The run is a sequential fold: a fresh [`PositionState`] is threaded through
//! [`step`] once per day, in date order, and the resulting daily values are
//! settled with the fee schedule. No I/O, no shared state, and the input is
//! never mutated, so repeated runs over the same series are bit-identical.

pub mod error;
pub mod settlement;
pub mod state;

pub use error::BacktestError;
pub use settlement::{FeeSchedule, Settlement};
pub use state::{step, DayOutcome, Phase, PositionState, TransitionEvent, TransitionKind};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::PricePoint;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;
pub const DEFAULT_STOP_LOSS_PCT: f64 = 10.0;

/// Parameters of a single run, passed by value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineParams {
    pub initial_capital: f64,
    /// Trailing stop distance in percent, in (0, 100].
    pub stop_loss_pct: f64,
    pub fees: FeeSchedule,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            stop_loss_pct: DEFAULT_STOP_LOSS_PCT,
            fees: FeeSchedule::default(),
        }
    }
}

impl EngineParams {
    pub fn new(initial_capital: f64, stop_loss_pct: f64) -> Self {
        Self {
            initial_capital,
            stop_loss_pct,
            fees: FeeSchedule::default(),
        }
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(BacktestError::param(
                "initial_capital",
                self.initial_capital,
                "must be a positive finite amount",
            ));
        }
        if !self.stop_loss_pct.is_finite()
            || self.stop_loss_pct <= 0.0
            || self.stop_loss_pct > 100.0
        {
            return Err(BacktestError::param(
                "stop_loss_pct",
                self.stop_loss_pct,
                "must be in (0, 100]",
            ));
        }
        for (name, rate) in [
            ("management_fee_rate", self.fees.management_rate),
            ("performance_fee_rate", self.fees.performance_rate),
        ] {
            if !rate.is_finite() || rate < 0.0 {
                return Err(BacktestError::param(name, rate, "must be a non-negative rate"));
            }
        }
        Ok(())
    }
}

/// Immutable outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Mark-to-market value per replayed day, same order as the input.
    pub daily_values: Vec<f64>,
    /// Date of each entry in `daily_values`.
    pub dates: Vec<NaiveDate>,
    /// Every phase change, in order.
    pub events: Vec<TransitionEvent>,
    /// Phase at the end of the replay (an open position is marked, not closed).
    pub final_phase: Phase,
    pub initial_capital: f64,
    pub fees: FeeSchedule,
    #[serde(flatten)]
    pub settlement: Settlement,
}

impl BacktestResult {
    pub fn entries(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.kind == TransitionKind::Entry)
            .count()
    }

    pub fn exits_by(&self, kind: TransitionKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }
}

/// Check the series the engine assumes: non-empty, strictly increasing dates,
/// positive finite closes, finite averages.
pub fn validate_series(prices: &[PricePoint]) -> Result<(), BacktestError> {
    if prices.is_empty() {
        return Err(BacktestError::InsufficientData);
    }
    for (i, p) in prices.iter().enumerate() {
        if !p.close.is_finite() || p.close <= 0.0 {
            return Err(BacktestError::input(
                i,
                p.date,
                format!("close must be positive and finite, got {}", p.close),
            ));
        }
        if !p.sma_fast.is_finite() || !p.sma_slow.is_finite() {
            return Err(BacktestError::input(i, p.date, "moving average undefined"));
        }
        if i > 0 && p.date <= prices[i - 1].date {
            return Err(BacktestError::input(
                i,
                p.date,
                format!("date not after previous day {}", prices[i - 1].date),
            ));
        }
    }
    Ok(())
}

/// Replay `prices` and settle.
///
/// Parameters are validated before the series; both are validated before the
/// first day is replayed, so a failure never yields a partial result.
pub fn run(prices: &[PricePoint], params: EngineParams) -> Result<BacktestResult, BacktestError> {
    params.validate()?;
    validate_series(prices)?;

    let stop_loss_frac = params.stop_loss_pct / 100.0;
    let mut state = PositionState::new(params.initial_capital);
    let mut daily_values = Vec::with_capacity(prices.len());
    let mut events = Vec::new();

    for point in prices {
        let outcome = step(state, point, stop_loss_frac);
        if let Some(event) = outcome.event {
            tracing::trace!(
                date = %event.date,
                kind = ?event.kind,
                price = event.price,
                value = event.value,
                "position transition"
            );
            events.push(event);
        }
        daily_values.push(outcome.value);
        state = outcome.state;
    }

    let final_value = daily_values
        .last()
        .copied()
        .unwrap_or(params.initial_capital);
    let settlement = Settlement::settle(final_value, params.initial_capital, &params.fees);

    tracing::debug!(
        days = daily_values.len(),
        transitions = events.len(),
        final_value,
        net_client_value = settlement.net_client_value,
        "backtest replay complete"
    );

    Ok(BacktestResult {
        daily_values,
        dates: prices.iter().map(|p| p.date).collect(),
        events,
        final_phase: state.phase(),
        initial_capital: params.initial_capital,
        fees: params.fees,
        settlement,
    })
}
