//! Position state machine and the pure per-day transition.
//!
//! A run owns exactly one [`PositionState`]. Each day it is moved into
//! [`step`], which returns the next state, the day's mark-to-market value and
//! the transition that fired, if any. Nothing else is mutated.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::PricePoint;

/// Full-allocation, long-only position.
///
/// Capital is either entirely cash or entirely shares; there is no third
/// representation, so "exactly one of balance/shares is non-zero" cannot be
/// violated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PositionState {
    Flat { balance: f64 },
    /// `peak_price` is the highest close since entry, including the entry close.
    Long { shares: f64, peak_price: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Flat,
    Long,
}

impl PositionState {
    /// Starting state of every run: all capital in cash.
    pub fn new(initial_capital: f64) -> Self {
        Self::Flat {
            balance: initial_capital,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::Flat { .. } => Phase::Flat,
            Self::Long { .. } => Phase::Long,
        }
    }

    /// Cash on hand (zero while long).
    pub fn balance(&self) -> f64 {
        match *self {
            Self::Flat { balance } => balance,
            Self::Long { .. } => 0.0,
        }
    }

    /// Shares held (zero while flat).
    pub fn shares(&self) -> f64 {
        match *self {
            Self::Flat { .. } => 0.0,
            Self::Long { shares, .. } => shares,
        }
    }

    /// Mark-to-market value at `close`.
    pub fn value_at(&self, close: f64) -> f64 {
        match *self {
            Self::Flat { balance } => balance,
            Self::Long { shares, .. } => shares * close,
        }
    }
}

/// Why the phase changed on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Golden cross while flat.
    Entry,
    /// Death cross while long.
    SignalExit,
    /// Drawdown from peak exceeded the stop-loss threshold.
    StopLossExit,
}

impl TransitionKind {
    pub fn is_exit(&self) -> bool {
        !matches!(self, Self::Entry)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub date: NaiveDate,
    pub kind: TransitionKind,
    /// Close at which the transition was executed.
    pub price: f64,
    /// Portfolio value right after the transition.
    pub value: f64,
    /// Peak close since entry, for exits; the entry close for entries.
    pub peak_price: f64,
}

impl TransitionEvent {
    /// Fractional decline from peak at the execution price.
    pub fn drawdown(&self) -> f64 {
        (self.peak_price - self.price) / self.peak_price
    }
}

/// Result of resolving one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayOutcome {
    pub state: PositionState,
    pub value: f64,
    pub event: Option<TransitionEvent>,
}

/// Resolve one trading day.
///
/// Branches are mutually exclusive and evaluated in order: stop-loss (long
/// only), entry (flat only), signal exit (long only). A stop-loss exit
/// therefore suppresses both the same-day death-cross exit and any same-day
/// re-entry. `sma_fast == sma_slow` holds the current phase.
///
/// `stop_loss_frac` is the threshold as a fraction (10% → 0.10); the exit
/// fires when the drawdown strictly exceeds it.
pub fn step(state: PositionState, point: &PricePoint, stop_loss_frac: f64) -> DayOutcome {
    let close = point.close;
    let (next, fired) = match state {
        PositionState::Long { shares, peak_price } => {
            let peak = peak_price.max(close);
            let drawdown = (peak - close) / peak;
            if drawdown > stop_loss_frac {
                let exit = PositionState::Flat {
                    balance: shares * close,
                };
                (exit, Some((TransitionKind::StopLossExit, peak)))
            } else if point.is_death() {
                let exit = PositionState::Flat {
                    balance: shares * close,
                };
                (exit, Some((TransitionKind::SignalExit, peak)))
            } else {
                let hold = PositionState::Long {
                    shares,
                    peak_price: peak,
                };
                (hold, None)
            }
        }
        PositionState::Flat { balance } => {
            if point.is_golden() {
                let entry = PositionState::Long {
                    shares: balance / close,
                    peak_price: close,
                };
                (entry, Some((TransitionKind::Entry, close)))
            } else {
                (state, None)
            }
        }
    };

    let value = next.value_at(close);
    let event = fired.map(|(kind, peak_price)| TransitionEvent {
        date: point.date,
        kind,
        price: close,
        value,
        peak_price,
    });

    DayOutcome {
        state: next,
        value,
        event,
    }
}
