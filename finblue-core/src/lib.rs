//! FinBlue Core: price series, indicators, and the trend-following backtest engine.
//!
//! This crate contains the heart of the "Time Machine":
//! - Domain types (bars, annotated price points)
//! - SMA/RSI indicators and series annotation
//! - Position state machine (golden/death cross + trailing stop-loss)
//! - Fee settlement (management + performance fee)
//! - Trend snapshot and least-squares projection
//! - Market-data collaborators (Yahoo chart API, CSV import)

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod projection;
pub mod series;
pub mod trend;
