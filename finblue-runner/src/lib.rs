//! finblue runner: backtest orchestration on top of `finblue-core`.
//!
//! - TOML configuration with defaults and validation
//! - Data loading with provider and synthetic fallback
//! - Single-symbol runner producing a report with metrics and trend
//! - Watchlist scans, parallel over symbols

pub mod config;
pub mod data_loader;
pub mod metrics;
pub mod runner;
pub mod scan;

pub use config::{BacktestConfig, ConfigError};
pub use data_loader::{generate_synthetic_bars, load_bars, LoadError, LoadOptions, LoadedData};
pub use metrics::PerformanceMetrics;
pub use runner::{run_from_bars, run_single_backtest, RunError, RunReport, SCHEMA_VERSION};
pub use scan::{scan_watchlist, ScanEntry, ScanRow};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<RunReport>();
        assert_sync::<RunReport>();
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }

    #[test]
    fn scan_entry_is_send() {
        assert_send::<ScanEntry>();
        assert_send::<LoadedData>();
    }
}
