//! Relative Strength Index (RSI), Wilder smoothing.
//!
//! Seeded with the plain mean gain/loss of the first `period` changes, then
//! `avg = avg + (x - avg) / period`. A flat window reads 50.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut out = vec![f64::NAN; bars.len()];
        if bars.len() <= self.period {
            return out;
        }

        let changes: Vec<f64> = bars.windows(2).map(|w| w[1].close - w[0].close).collect();
        let seed = &changes[..self.period];
        if seed.iter().any(|c| c.is_nan()) {
            return out;
        }

        let n = self.period as f64;
        let mut gain = seed.iter().map(|c| c.max(0.0)).sum::<f64>() / n;
        let mut loss = seed.iter().map(|c| (-c).max(0.0)).sum::<f64>() / n;
        out[self.period] = strength(gain, loss);

        for (offset, &change) in changes.iter().enumerate().skip(self.period) {
            // Once the series breaks, every later value stays undefined.
            if change.is_nan() {
                break;
            }
            gain += (change.max(0.0) - gain) / n;
            loss += ((-change).max(0.0) - loss) / n;
            out[offset + 1] = strength(gain, loss);
        }
        out
    }
}

fn strength(gain: f64, loss: f64) -> f64 {
    match (gain > 0.0, loss > 0.0) {
        (false, false) => 50.0,
        (true, false) => 100.0,
        (false, true) => 0.0,
        (true, true) => 100.0 - 100.0 / (1.0 + gain / loss),
    }
}
