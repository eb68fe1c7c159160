//! Data provider trait and structured error types.
//!
//! `DataProvider` is the boundary to the market-data collaborator: it supplies
//! an ordered daily series for one symbol over a requested window. Yahoo and
//! CSV implementations live alongside; tests substitute their own.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw daily OHLCV bar as delivered by a provider, before canonicalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub adj_close: f64,
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("data provider has blocked requests (circuit breaker tripped, retry in {retry_in_secs}s)")]
    CircuitBreakerTripped { retry_in_secs: u64 },

    #[error("no usable bars for '{symbol}' between {start} and {end}")]
    EmptyWindow {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("data error: {0}")]
    Other(String),
}

/// Result of a successful fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub bars: Vec<RawBar>,
    pub source: DataSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Synthetic,
}

/// A source of daily bars.
pub trait DataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch daily bars for `symbol` with `start <= date <= end`.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, DataError>;

    /// False while the provider is refusing requests (rate limit, ban).
    fn is_available(&self) -> bool;

    /// Whether `fetch` goes over the network. Offline runs skip such providers.
    fn requires_network(&self) -> bool {
        true
    }
}
