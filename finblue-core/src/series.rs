//! Series annotation: bars in, engine-eligible price points out.
//!
//! Both moving averages (and RSI, for display) are computed over the full bar
//! history, then every leading day where either average is still warming up
//! is dropped. A day whose averages are undefined after the warmup (a NaN
//! close inside a window) is dropped as well, so every emitted point carries
//! two finite averages.

use thiserror::Error;

use crate::domain::{Bar, PricePoint};
use crate::indicators::{Indicator, Rsi, Sma};

/// Default fast moving-average window.
pub const DEFAULT_FAST_WINDOW: usize = 50;
/// Default slow moving-average window.
pub const DEFAULT_SLOW_WINDOW: usize = 200;
/// Default RSI period.
pub const DEFAULT_RSI_PERIOD: usize = 14;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SeriesError {
    #[error("fast window must be >= 1")]
    ZeroFastWindow,

    #[error("fast window ({fast}) must be shorter than slow window ({slow})")]
    WindowOrder { fast: usize, slow: usize },
}

/// Moving-average windows used to annotate a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Windows {
    pub fast: usize,
    pub slow: usize,
    pub rsi: usize,
}

impl Default for Windows {
    fn default() -> Self {
        Self {
            fast: DEFAULT_FAST_WINDOW,
            slow: DEFAULT_SLOW_WINDOW,
            rsi: DEFAULT_RSI_PERIOD,
        }
    }
}

impl Windows {
    pub fn validate(&self) -> Result<(), SeriesError> {
        if self.fast == 0 {
            return Err(SeriesError::ZeroFastWindow);
        }
        if self.fast >= self.slow {
            return Err(SeriesError::WindowOrder {
                fast: self.fast,
                slow: self.slow,
            });
        }
        Ok(())
    }
}

/// Annotate `bars` with both moving averages and drop ineligible days.
///
/// Returns an empty vector if the history is shorter than the slow window;
/// the engine reports that as `InsufficientData`.
pub fn annotate(bars: &[Bar], windows: Windows) -> Result<Vec<PricePoint>, SeriesError> {
    windows.validate()?;

    let fast = Sma::new(windows.fast).compute(bars);
    let slow = Sma::new(windows.slow).compute(bars);
    let rsi = Rsi::new(windows.rsi).compute(bars);

    let points = bars
        .iter()
        .enumerate()
        .filter(|(i, _)| fast[*i].is_finite() && slow[*i].is_finite())
        .map(|(i, bar)| PricePoint {
            date: bar.date,
            close: bar.close,
            sma_fast: fast[i],
            sma_slow: slow[i],
            rsi: rsi[i].is_finite().then_some(rsi[i]),
        })
        .collect();

    Ok(points)
}
