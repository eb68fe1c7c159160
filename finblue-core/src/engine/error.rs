//! Typed engine failures. Every failure is reported; none is defaulted away.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BacktestError {
    /// No day in the series has both moving averages defined.
    #[error("insufficient data: no trading day has both moving averages defined")]
    InsufficientData,

    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("invalid input at day {index} ({date}): {reason}")]
    InvalidInput {
        index: usize,
        date: NaiveDate,
        reason: String,
    },
}

impl BacktestError {
    pub(crate) fn param(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason,
        }
    }

    pub(crate) fn input(index: usize, date: NaiveDate, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            index,
            date,
            reason: reason.into(),
        }
    }
}
