//! Watchlist scan: the same configuration backtested over many symbols.

use rayon::prelude::*;
use serde::Serialize;

use finblue_core::data::DataProvider;
use finblue_core::trend::Trend;

use crate::config::BacktestConfig;
use crate::data_loader::LoadOptions;
use crate::runner::{run_single_backtest, RunError, RunReport};

/// Per-symbol outcome, in watchlist order.
#[derive(Debug)]
pub struct ScanEntry {
    pub symbol: String,
    pub outcome: Result<RunReport, RunError>,
}

/// One line of the scan table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanRow {
    pub symbol: String,
    pub trend: Option<Trend>,
    /// Latest close.
    pub close: Option<f64>,
    /// Percent change of the close over the configured change window.
    pub change_pct: Option<f64>,
    pub roi_pct: Option<f64>,
    pub net_client_value: Option<f64>,
    pub stop_loss_exits: Option<usize>,
    pub has_synthetic: bool,
    /// Failure message when the symbol could not be backtested.
    pub error: Option<String>,
}

impl From<&ScanEntry> for ScanRow {
    fn from(entry: &ScanEntry) -> Self {
        match &entry.outcome {
            Ok(report) => Self {
                symbol: entry.symbol.clone(),
                trend: report.trend.map(|t| t.trend),
                close: report.trend.map(|t| t.close),
                change_pct: report.trend.and_then(|t| t.change_pct),
                roi_pct: Some(report.metrics.roi_pct),
                net_client_value: Some(report.result.settlement.net_client_value),
                stop_loss_exits: Some(report.metrics.stop_loss_exits),
                has_synthetic: report.has_synthetic,
                error: None,
            },
            Err(e) => Self {
                symbol: entry.symbol.clone(),
                trend: None,
                close: None,
                change_pct: None,
                roi_pct: None,
                net_client_value: None,
                stop_loss_exits: None,
                has_synthetic: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Backtest every symbol independently.
///
/// A failure for one symbol is recorded in its entry and never affects the others.
pub fn scan_watchlist(
    symbols: &[String],
    config: &BacktestConfig,
    provider: Option<&dyn DataProvider>,
    opts: &LoadOptions,
    parallel: bool,
) -> Vec<ScanEntry> {
    let run_one = |symbol: &String| {
        let outcome = run_single_backtest(&config.for_symbol(symbol), provider, opts);
        if let Err(e) = &outcome {
            tracing::warn!(symbol = %symbol, error = %e, "scan entry failed");
        }
        ScanEntry {
            symbol: symbol.clone(),
            outcome,
        }
    };

    tracing::info!(symbols = symbols.len(), parallel, "scanning watchlist");
    if parallel {
        symbols.par_iter().map(run_one).collect()
    } else {
        symbols.iter().map(run_one).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::generate_synthetic_bars;
    use chrono::NaiveDate;
    use finblue_core::data::{DataError, DataSource, FetchResult};

    /// Serves synthetic history for every symbol except those starting with "BAD".
    struct Picky;

    impl DataProvider for Picky {
        fn name(&self) -> &str {
            "picky"
        }

        fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<FetchResult, DataError> {
            if symbol.starts_with("BAD") {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                });
            }
            Ok(FetchResult {
                symbol: symbol.to_string(),
                bars: generate_synthetic_bars(symbol, start, end),
                source: DataSource::CsvImport,
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn opts() -> LoadOptions {
        LoadOptions::lookback(NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(), 3 * 365).unwrap()
    }

    fn symbols() -> Vec<String> {
        ["AAA", "BAD1", "CCC", "DDD"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn failures_are_isolated_and_order_is_kept() {
        let entries = scan_watchlist(&symbols(), &BacktestConfig::default(), Some(&Picky), &opts(), true);
        let names: Vec<&str> = entries.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(names, ["AAA", "BAD1", "CCC", "DDD"]);
        assert!(entries[0].outcome.is_ok());
        assert!(matches!(entries[1].outcome, Err(RunError::Data(_))));
        assert!(entries[2].outcome.is_ok());
        assert!(entries[3].outcome.is_ok());
    }

    #[test]
    fn parallel_matches_sequential() {
        let config = BacktestConfig::default();
        let par = scan_watchlist(&symbols(), &config, Some(&Picky), &opts(), true);
        let seq = scan_watchlist(&symbols(), &config, Some(&Picky), &opts(), false);
        let par_rows: Vec<ScanRow> = par.iter().map(ScanRow::from).collect();
        let seq_rows: Vec<ScanRow> = seq.iter().map(ScanRow::from).collect();
        assert_eq!(par_rows, seq_rows);
    }

    #[test]
    fn failed_row_carries_message() {
        let entries = scan_watchlist(&symbols(), &BacktestConfig::default(), Some(&Picky), &opts(), false);
        let row = ScanRow::from(&entries[1]);
        assert!(row.roi_pct.is_none());
        assert!(row.change_pct.is_none());
        assert!(row.error.is_some_and(|m| m.contains("BAD1")));
    }

    #[test]
    fn ok_row_carries_latest_close_and_change() {
        let entries = scan_watchlist(&symbols(), &BacktestConfig::default(), Some(&Picky), &opts(), false);
        let row = ScanRow::from(&entries[0]);
        let Ok(report) = &entries[0].outcome else {
            panic!("AAA should backtest");
        };
        let snap = report.trend.unwrap();
        assert_eq!(row.close, Some(snap.close));
        assert!(row.change_pct.is_some());
        assert_eq!(row.change_pct, snap.change_pct);
    }
}
