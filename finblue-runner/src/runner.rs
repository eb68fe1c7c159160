//! Backtest runner: wires together data loading, annotation, the engine, and metrics.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads bars through the provider, then runs. Used by the CLI.
//! - `run_from_bars()`: takes already-loaded data. No I/O; used by scans and tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use finblue_core::data::{CanonicalizeReport, DataProvider, DataSource};
use finblue_core::engine::{self, BacktestError, BacktestResult};
use finblue_core::series::{annotate, SeriesError};
use finblue_core::trend::TrendSnapshot;

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_bars, LoadError, LoadOptions, LoadedData};
use crate::metrics::PerformanceMetrics;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("indicator error: {0}")]
    Series(#[from] SeriesError),
    #[error("backtest error: {0}")]
    Backtest(#[from] BacktestError),
}

/// Current schema version for serialized reports.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Everything one backtest produced, with provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    /// Hash of the effective configuration.
    pub run_id: String,
    pub source: DataSource,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    /// Bars dropped while canonicalizing the provider's data.
    #[serde(default)]
    pub cleanup: CanonicalizeReport,
    /// Display currency code for money amounts.
    #[serde(default)]
    pub currency: String,
    /// Bars loaded, before indicator warmup.
    pub bar_count: usize,
    /// Days the engine replayed (bars with both averages defined).
    pub replay_days: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Latest annotated day, for the live dashboard.
    pub trend: Option<TrendSnapshot>,
    pub metrics: PerformanceMetrics,
    pub result: BacktestResult,
}

/// Load bars for `config.backtest.symbol` and run the backtest.
pub fn run_single_backtest(
    config: &BacktestConfig,
    provider: Option<&dyn DataProvider>,
    opts: &LoadOptions,
) -> Result<RunReport, RunError> {
    config.validate()?;
    let loaded = load_bars(&config.backtest.symbol, provider, opts)?;
    run_from_bars(config, &loaded)
}

/// Run a backtest over pre-loaded data.
pub fn run_from_bars(config: &BacktestConfig, loaded: &LoadedData) -> Result<RunReport, RunError> {
    let _span = tracing::info_span!("run_backtest", symbol = %loaded.symbol).entered();
    config.validate()?;

    let prices = annotate(&loaded.bars, config.windows())?;
    tracing::debug!(bars = loaded.bars.len(), replay_days = prices.len(), "series annotated");

    let result = engine::run(&prices, config.engine_params())?;
    let metrics = PerformanceMetrics::from_result(&result);
    tracing::info!(
        final_value = result.settlement.final_value,
        net_client_value = result.settlement.net_client_value,
        entries = metrics.trade_count,
        stop_loss_exits = metrics.stop_loss_exits,
        "backtest complete"
    );

    Ok(RunReport {
        schema_version: SCHEMA_VERSION,
        symbol: loaded.symbol.clone(),
        run_id: config.run_id(),
        source: loaded.source,
        dataset_hash: loaded.dataset_hash.clone(),
        has_synthetic: loaded.has_synthetic,
        cleanup: loaded.cleanup.clone(),
        currency: config.currency(),
        bar_count: loaded.bars.len(),
        replay_days: prices.len(),
        start_date: result.dates.first().copied(),
        end_date: result.dates.last().copied(),
        trend: TrendSnapshot::latest(&prices, config.indicators.change_window),
        metrics,
        result,
    })
}
