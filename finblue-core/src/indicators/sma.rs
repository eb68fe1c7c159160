//! Simple Moving Average (SMA).
//!
//! Trailing mean of closes over `period` days. The first defined value sits at
//! index `period - 1`; a NaN close poisons every window that contains it.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    /// A zero period is clamped to 1 (the SMA of one close is the close).
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut out = vec![f64::NAN; bars.len()];
        if bars.len() < self.period {
            return out;
        }

        // Prefix sums over finite closes plus a running count of NaNs, so each
        // window is O(1) and a NaN anywhere in the window is detected exactly.
        let mut sums = Vec::with_capacity(bars.len() + 1);
        let mut nans = Vec::with_capacity(bars.len() + 1);
        sums.push(0.0_f64);
        nans.push(0_usize);
        for bar in bars {
            let (s, n) = (sums[sums.len() - 1], nans[nans.len() - 1]);
            if bar.close.is_nan() {
                sums.push(s);
                nans.push(n + 1);
            } else {
                sums.push(s + bar.close);
                nans.push(n);
            }
        }

        let width = self.period as f64;
        for end in self.period..=bars.len() {
            let start = end - self.period;
            if nans[end] - nans[start] > 0 {
                continue;
            }
            out[end - 1] = (sums[end] - sums[start]) / width;
        }
        out
    }
}
