//! Serializable backtest configuration.
//!
//! Loaded from TOML; every option has a default, so an empty file (or no file)
//! describes the stock run: 5-year lookback, ₹100,000 capital, 10% trailing
//! stop, SMA 50/200, 2% management + 20% performance fee.
//!
//! ```toml
//! [backtest]
//! symbol = "TRENT.NS"
//! lookback_days = 1825
//! initial_capital = 100000.0
//! stop_loss_pct = 10.0
//! currency = "INR"          # optional; inferred from the symbol when absent
//!
//! [indicators]
//! sma_fast_window = 50
//! sma_slow_window = 200
//! change_window = 21
//!
//! [fees]
//! management_fee_rate = 0.02
//! performance_fee_rate = 0.20
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use finblue_core::engine::{
    BacktestError, EngineParams, FeeSchedule, DEFAULT_INITIAL_CAPITAL, DEFAULT_STOP_LOSS_PCT,
};
use finblue_core::engine::settlement::{DEFAULT_MANAGEMENT_FEE_RATE, DEFAULT_PERFORMANCE_FEE_RATE};
use finblue_core::series::{
    SeriesError, Windows, DEFAULT_FAST_WINDOW, DEFAULT_RSI_PERIOD, DEFAULT_SLOW_WINDOW,
};
use finblue_core::trend::DEFAULT_CHANGE_WINDOW;

pub const DEFAULT_SYMBOL: &str = "TRENT.NS";
/// Five calendar years, enough history for a 200-day average plus a long replay.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 5 * 365;
/// One century of calendar days; daily history never reaches further back.
pub const MAX_LOOKBACK_DAYS: u32 = 36_525;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("lookback_days must be >= 1")]
    ZeroLookback,

    #[error("lookback_days = {0} exceeds the maximum of {MAX_LOOKBACK_DAYS}")]
    LookbackTooLong(u32),

    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("currency must be a non-empty code such as \"INR\"")]
    EmptyCurrency,

    #[error("change_window must be >= 1")]
    ZeroChangeWindow,

    #[error(transparent)]
    Engine(#[from] BacktestError),

    #[error(transparent)]
    Windows(#[from] SeriesError),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub indicators: IndicatorSection,
    pub fees: FeeSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BacktestSection {
    pub symbol: String,
    /// Calendar days of history requested from the data provider.
    pub lookback_days: u32,
    pub initial_capital: f64,
    pub stop_loss_pct: f64,
    /// Display currency code. `None` infers it from the symbol's exchange suffix.
    pub currency: Option<String>,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            symbol: DEFAULT_SYMBOL.to_string(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            stop_loss_pct: DEFAULT_STOP_LOSS_PCT,
            currency: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndicatorSection {
    pub sma_fast_window: usize,
    pub sma_slow_window: usize,
    pub rsi_period: usize,
    /// Trading days behind the trend read's percent change.
    pub change_window: usize,
}

impl Default for IndicatorSection {
    fn default() -> Self {
        Self {
            sma_fast_window: DEFAULT_FAST_WINDOW,
            sma_slow_window: DEFAULT_SLOW_WINDOW,
            rsi_period: DEFAULT_RSI_PERIOD,
            change_window: DEFAULT_CHANGE_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeeSection {
    pub management_fee_rate: f64,
    pub performance_fee_rate: f64,
}

impl Default for FeeSection {
    fn default() -> Self {
        Self {
            management_fee_rate: DEFAULT_MANAGEMENT_FEE_RATE,
            performance_fee_rate: DEFAULT_PERFORMANCE_FEE_RATE,
        }
    }
}

impl BacktestConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backtest.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        if self.backtest.lookback_days == 0 {
            return Err(ConfigError::ZeroLookback);
        }
        if self.backtest.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(ConfigError::LookbackTooLong(self.backtest.lookback_days));
        }
        self.engine_params().validate()?;
        if self.backtest.currency.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(ConfigError::EmptyCurrency);
        }
        if self.indicators.change_window == 0 {
            return Err(ConfigError::ZeroChangeWindow);
        }
        self.windows().validate()?;
        Ok(())
    }

    /// Display currency: the configured code, else INR for NSE/BSE listings
    /// (`.NS`, `.BO`) and USD for everything else.
    pub fn currency(&self) -> String {
        if let Some(code) = &self.backtest.currency {
            return code.trim().to_ascii_uppercase();
        }
        let symbol = self.backtest.symbol.trim().to_ascii_uppercase();
        if symbol.ends_with(".NS") || symbol.ends_with(".BO") {
            "INR".to_string()
        } else {
            "USD".to_string()
        }
    }

    pub fn engine_params(&self) -> EngineParams {
        EngineParams {
            initial_capital: self.backtest.initial_capital,
            stop_loss_pct: self.backtest.stop_loss_pct,
            fees: FeeSchedule {
                management_rate: self.fees.management_fee_rate,
                performance_rate: self.fees.performance_fee_rate,
            },
        }
    }

    pub fn windows(&self) -> Windows {
        Windows {
            fast: self.indicators.sma_fast_window,
            slow: self.indicators.sma_slow_window,
            rsi: self.indicators.rsi_period,
        }
    }

    /// Same configuration for another symbol (watchlist scans).
    pub fn for_symbol(&self, symbol: &str) -> Self {
        let mut config = self.clone();
        config.backtest.symbol = symbol.to_string();
        config
    }

    /// Deterministic content hash of this configuration.
    ///
    /// Two runs with identical configuration over an identical dataset
    /// produce identical results, so `(run_id, dataset_hash)` identifies a run.
    pub fn run_id(&self) -> String {
        // Plain structs of strings and numbers; serialization cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }
}
