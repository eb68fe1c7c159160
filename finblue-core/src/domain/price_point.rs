//! PricePoint: a trading day annotated with the moving averages the engine reads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One eligible trading day for engine replay.
///
/// Both averages are defined; days lacking either are dropped by
/// [`crate::series::annotate`] before replay. `rsi` is carried for display
/// and never read by the engine's decision logic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
    pub sma_fast: f64,
    pub sma_slow: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64, sma_fast: f64, sma_slow: f64) -> Self {
        Self {
            date,
            close,
            sma_fast,
            sma_slow,
            rsi: None,
        }
    }

    /// Golden-cross condition: fast average strictly above slow.
    pub fn is_golden(&self) -> bool {
        self.sma_fast > self.sma_slow
    }

    /// Death-cross condition: fast average strictly below slow.
    pub fn is_death(&self) -> bool {
        self.sma_fast < self.sma_slow
    }
}
