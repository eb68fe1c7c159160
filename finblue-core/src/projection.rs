//! Single-feature least-squares projection of close on day index.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearProjection {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination; 1.0 for a perfectly flat input.
    pub r_squared: f64,
    /// Number of observations the fit used.
    pub samples: usize,
}

impl LinearProjection {
    /// Fit `close[i] = intercept + slope * i`. Needs two finite points.
    pub fn fit(closes: &[f64]) -> Option<Self> {
        if closes.len() < 2 || closes.iter().any(|c| !c.is_finite()) {
            return None;
        }
        let n = closes.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = closes.iter().sum::<f64>() / n;

        let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
        for (i, &y) in closes.iter().enumerate() {
            let dx = i as f64 - mean_x;
            let dy = y - mean_y;
            sxy += dx * dy;
            sxx += dx * dx;
            syy += dy * dy;
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;
        let r_squared = if syy == 0.0 {
            1.0
        } else {
            (sxy * sxy) / (sxx * syy)
        };

        Some(Self {
            slope,
            intercept,
            r_squared,
            samples: closes.len(),
        })
    }

    pub fn predict(&self, index: f64) -> f64 {
        self.intercept + self.slope * index
    }

    /// Fitted values for the `horizon` days following the sample.
    pub fn project(&self, horizon: usize) -> Vec<f64> {
        (0..horizon)
            .map(|k| self.predict((self.samples + k) as f64))
            .collect()
    }
}
