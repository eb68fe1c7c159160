//! Latest-day trend read of an annotated series (the live dashboard signal).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::PricePoint;

/// Trading days in the default change window (about one calendar month).
pub const DEFAULT_CHANGE_WINDOW: usize = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Bullish,
    Bearish,
    /// Averages exactly equal.
    Neutral,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Bullish => "BULLISH (UP)",
            Self::Bearish => "BEARISH (DOWN)",
            Self::Neutral => "NEUTRAL",
        };
        f.write_str(label)
    }
}

impl From<&PricePoint> for Trend {
    fn from(p: &PricePoint) -> Self {
        if p.is_golden() {
            Self::Bullish
        } else if p.is_death() {
            Self::Bearish
        } else {
            Self::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendSnapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub sma_fast: f64,
    pub sma_slow: f64,
    pub rsi: Option<f64>,
    pub trend: Trend,
    /// Percent change of the close over the trailing change window.
    pub change_pct: Option<f64>,
}

impl TrendSnapshot {
    /// Snapshot of the last point, or `None` for an empty series.
    ///
    /// `change_pct` compares the last close with the close `change_window`
    /// points earlier; it is `None` when the series is too short or the
    /// base close is not positive.
    pub fn latest(prices: &[PricePoint], change_window: usize) -> Option<Self> {
        let p = prices.last()?;
        Some(Self {
            date: p.date,
            close: p.close,
            sma_fast: p.sma_fast,
            sma_slow: p.sma_slow,
            rsi: p.rsi,
            trend: Trend::from(p),
            change_pct: change_pct(prices, change_window),
        })
    }
}

/// Percent change of the last close against the close `window` points earlier.
pub fn change_pct(prices: &[PricePoint], window: usize) -> Option<f64> {
    if window == 0 {
        return None;
    }
    let last = prices.last()?;
    let base = prices.get(prices.len().checked_sub(window + 1)?)?;
    (base.close > 0.0).then(|| (last.close - base.close) / base.close * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(day: u32, fast: f64, slow: f64) -> PricePoint {
        closing(day, 10.0, fast, slow)
    }

    fn closing(day: u32, close: f64, fast: f64, slow: f64) -> PricePoint {
        PricePoint::new(NaiveDate::from_ymd_opt(2024, 2, day).unwrap(), close, fast, slow)
    }

    #[test]
    fn reads_last_point_only() {
        let snap = TrendSnapshot::latest(&[p(1, 1.0, 2.0), p(2, 3.0, 2.0)], 1).unwrap();
        assert_eq!(snap.trend, Trend::Bullish);
        assert_eq!(snap.date, NaiveDate::from_ymd_opt(2024, 2, 2).unwrap());
        assert_eq!(snap.change_pct, Some(0.0));
    }

    #[test]
    fn change_over_trailing_window() {
        let prices: Vec<PricePoint> = [80.0, 100.0, 90.0, 110.0, 125.0]
            .iter()
            .enumerate()
            .map(|(i, &c)| closing(i as u32 + 1, c, 1.0, 1.0))
            .collect();
        let snap = TrendSnapshot::latest(&prices, 3).unwrap();
        assert!((snap.change_pct.unwrap() - 25.0).abs() < 1e-12);
        assert!((change_pct(&prices, 4).unwrap() - 56.25).abs() < 1e-12);
        assert_eq!(change_pct(&prices, 5), None);
        assert_eq!(change_pct(&prices, 0), None);
    }

    #[test]
    fn non_positive_base_has_no_change() {
        let prices = [closing(1, 0.0, 1.0, 1.0), closing(2, 5.0, 1.0, 1.0)];
        assert_eq!(TrendSnapshot::latest(&prices, 1).unwrap().change_pct, None);
    }

    #[test]
    fn classifies_each_case() {
        assert_eq!(Trend::from(&p(1, 1.0, 2.0)), Trend::Bearish);
        assert_eq!(Trend::from(&p(1, 2.0, 2.0)), Trend::Neutral);
        assert_eq!(Trend::Bullish.to_string(), "BULLISH (UP)");
    }

    #[test]
    fn empty_series_has_no_snapshot() {
        assert!(TrendSnapshot::latest(&[], DEFAULT_CHANGE_WINDOW).is_none());
    }
}
