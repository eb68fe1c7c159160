//! finblue CLI: backtest, trend, scan and projection commands.
//!
//! Commands:
//! - `backtest`: replay the crossover strategy for one symbol and print the scoreboard
//! - `trend`: latest close, change, averages, trend label and optional headlines for one symbol
//! - `scan`: backtest a watchlist, one row per symbol
//! - `project`: least-squares projection of recent closes
//!
//! Logging goes to stderr; set `FINBLUE_LOG` (e.g. `debug`, `finblue_core=trace`)
//! to change the filter.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use finblue_core::data::{CircuitBreaker, CsvProvider, DataProvider, Headline, YahooProvider};
use finblue_core::projection::LinearProjection;
use finblue_core::series::annotate;
use finblue_core::trend::TrendSnapshot;
use finblue_runner::{
    load_bars, run_single_backtest, scan_watchlist, BacktestConfig, LoadOptions, RunReport,
    ScanRow,
};

const LOG_ENV: &str = "FINBLUE_LOG";

#[derive(Parser)]
#[command(name = "finblue", about = "finblue: SMA crossover backtests with stop-loss and fee settlement")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one symbol and print the settlement scoreboard.
    Backtest {
        #[arg(long)]
        symbol: Option<String>,

        #[command(flatten)]
        settings: Settings,

        #[command(flatten)]
        data: DataArgs,

        /// Print the full report as JSON instead of the scoreboard.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show the latest trend read for one symbol.
    Trend {
        #[arg(long)]
        symbol: Option<String>,

        #[command(flatten)]
        settings: Settings,

        #[command(flatten)]
        data: DataArgs,

        /// Also show this many recent headlines (network only).
        #[arg(long, default_value_t = 0)]
        headlines: usize,
    },
    /// Backtest every symbol of a watchlist.
    Scan {
        #[arg(required = true)]
        symbols: Vec<String>,

        #[command(flatten)]
        settings: Settings,

        #[command(flatten)]
        data: DataArgs,

        /// Run symbols one after another instead of in parallel.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Project recent closes forward with a least-squares line.
    Project {
        #[arg(long)]
        symbol: Option<String>,

        /// Trading days to project.
        #[arg(long, default_value_t = 30)]
        horizon: usize,

        /// Most recent closes used for the fit.
        #[arg(long, default_value_t = 120)]
        window: usize,

        #[command(flatten)]
        settings: Settings,

        #[command(flatten)]
        data: DataArgs,
    },
}

/// Strategy settings; flags override the config file.
#[derive(Args)]
struct Settings {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial capital.
    #[arg(long)]
    capital: Option<f64>,

    /// Stop-loss threshold in percent of the peak close.
    #[arg(long)]
    stop_loss: Option<f64>,
}

#[derive(Args)]
struct DataArgs {
    /// Read `{dir}/{SYMBOL}.csv` instead of downloading.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Last day of the window (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,

    /// Offline mode: no network access.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Fall back to synthetic data when real data is unavailable.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            symbol,
            settings,
            data,
            json,
        } => run_backtest_cmd(symbol, &settings, &data, json),
        Commands::Trend {
            symbol,
            settings,
            data,
            headlines,
        } => run_trend_cmd(symbol, &settings, &data, headlines),
        Commands::Scan {
            symbols,
            settings,
            data,
            sequential,
        } => run_scan_cmd(&symbols, &settings, &data, !sequential),
        Commands::Project {
            symbol,
            horizon,
            window,
            settings,
            data,
        } => run_project_cmd(symbol, horizon, window, &settings, &data),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_config(symbol: Option<String>, settings: &Settings) -> Result<BacktestConfig> {
    let mut config = match &settings.config {
        Some(path) => BacktestConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BacktestConfig::default(),
    };
    if let Some(symbol) = symbol {
        config.backtest.symbol = symbol;
    }
    if let Some(capital) = settings.capital {
        config.backtest.initial_capital = capital;
    }
    if let Some(stop) = settings.stop_loss {
        config.backtest.stop_loss_pct = stop;
    }
    config.validate()?;
    Ok(config)
}

fn load_options(config: &BacktestConfig, data: &DataArgs) -> Result<LoadOptions> {
    let end = data
        .end
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("--end must be YYYY-MM-DD")?
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    Ok(LoadOptions::lookback(end, config.backtest.lookback_days)?
        .offline(data.offline)
        .synthetic(data.synthetic))
}

fn build_provider(data: &DataArgs) -> Result<Box<dyn DataProvider>> {
    if let Some(dir) = &data.csv_dir {
        tracing::debug!(dir = %dir.display(), "reading bars from csv");
        return Ok(Box::new(CsvProvider::new(dir)));
    }
    let breaker = Arc::new(CircuitBreaker::default_provider());
    Ok(Box::new(YahooProvider::new(breaker)?))
}

/// Prefix for money amounts in `code`.
fn currency_sign(code: &str) -> String {
    match code {
        "INR" => "₹".to_string(),
        "USD" => "$".to_string(),
        other => format!("{other} "),
    }
}

fn signed_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:+.2}%"))
}

fn run_backtest_cmd(symbol: Option<String>, settings: &Settings, data: &DataArgs, json: bool) -> Result<()> {
    let config = build_config(symbol, settings)?;
    let opts = load_options(&config, data)?;
    let provider = build_provider(data)?;

    let report = run_single_backtest(&config, Some(provider.as_ref()), &opts)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_scoreboard(&report);
    }
    Ok(())
}

fn print_scoreboard(report: &RunReport) {
    let result = &report.result;
    let s = &result.settlement;
    let capital = result.initial_capital;
    let sign = currency_sign(&report.currency);
    let money = |v: f64| format!("{sign}{v:.2}");

    println!();
    println!("=== {} ===", report.symbol);
    if let (Some(start), Some(end)) = (report.start_date, report.end_date) {
        println!("Period:          {start} to {end} ({} days)", report.replay_days);
    }
    if report.has_synthetic {
        println!("Data:            SYNTHETIC (not real market data)");
    }
    if !report.cleanup.is_clean() {
        println!(
            "Data cleanup:    {} duplicate and {} invalid bars dropped",
            report.cleanup.duplicates_removed, report.cleanup.invalid_removed
        );
    }
    if let Some(trend) = &report.trend {
        println!("Trend:           {}", trend.trend);
    }
    println!(
        "Trades:          {} entries, {} signal exits, {} stop-loss exits",
        report.metrics.trade_count, report.metrics.signal_exits, report.metrics.stop_loss_exits
    );
    println!("Final phase:     {:?}", result.final_phase);
    println!();
    println!("Initial capital: {:>16}", money(capital));
    println!("Final value:     {:>16}", money(s.final_value));
    println!(
        "Client profit:   {:>16}  (ROI {:+.2}%)",
        money(s.gross_profit),
        s.roi_pct(capital)
    );
    println!(
        "Operator fees:   {:>16}  (management {} + performance {})",
        money(s.total_fees),
        money(s.management_fee),
        money(s.performance_fee)
    );
    println!(
        "Net client value:{:>16}  (after fees {})",
        money(s.net_client_value),
        money(s.net_profit(capital))
    );
    println!();
    println!(
        "CAGR {:+.2}%  Sharpe {:.2}  Max DD {:.2}%  Exposure {:.0}%",
        report.metrics.cagr * 100.0,
        report.metrics.sharpe,
        report.metrics.max_drawdown * 100.0,
        report.metrics.exposure * 100.0
    );
}

fn run_trend_cmd(symbol: Option<String>, settings: &Settings, data: &DataArgs, headlines: usize) -> Result<()> {
    let config = build_config(symbol, settings)?;
    let opts = load_options(&config, data)?;
    let provider = build_provider(data)?;

    let loaded = load_bars(&config.backtest.symbol, Some(provider.as_ref()), &opts)?;
    let prices = annotate(&loaded.bars, config.windows())?;
    let Some(snap) = TrendSnapshot::latest(&prices, config.indicators.change_window) else {
        bail!(
            "not enough history for {}: {} bars, need {}",
            loaded.symbol,
            loaded.bars.len(),
            config.indicators.sma_slow_window
        );
    };
    let sign = currency_sign(&config.currency());

    println!("{} as of {}", loaded.symbol, snap.date);
    println!("  Close      {:>12}", format!("{sign}{:.2}", snap.close));
    println!(
        "  Change {:<3} {:>12}",
        config.indicators.change_window,
        signed_pct(snap.change_pct)
    );
    println!("  SMA {:<6} {:>12.2}", config.indicators.sma_fast_window, snap.sma_fast);
    println!("  SMA {:<6} {:>12.2}", config.indicators.sma_slow_window, snap.sma_slow);
    match snap.rsi {
        Some(rsi) => println!("  RSI {:<6} {:>12.2}", config.indicators.rsi_period, rsi),
        None => println!("  RSI {:<6} {:>12}", config.indicators.rsi_period, "n/a"),
    }
    println!("  Trend      {}", snap.trend);

    if headlines > 0 {
        print_headlines(&loaded.symbol, fetch_headlines(&loaded.symbol, headlines, data));
    }
    Ok(())
}

/// Headlines come from Yahoo only; CSV and offline runs have none.
fn fetch_headlines(symbol: &str, count: usize, data: &DataArgs) -> Vec<Headline> {
    if data.offline || data.csv_dir.is_some() {
        tracing::info!("headlines need network access; skipping");
        return Vec::new();
    }
    let provider = match YahooProvider::new(Arc::new(CircuitBreaker::default_provider())) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "headline client unavailable");
            return Vec::new();
        }
    };
    provider.headlines(symbol, count).unwrap_or_else(|e| {
        tracing::warn!(symbol, error = %e, "headline fetch failed");
        Vec::new()
    })
}

fn print_headlines(symbol: &str, headlines: Vec<Headline>) {
    println!();
    println!("Latest news for {symbol}:");
    if headlines.is_empty() {
        println!("  No recent news found.");
    }
    for (i, h) in headlines.iter().enumerate() {
        match &h.publisher {
            Some(publisher) => println!("  {}. {} ({publisher})", i + 1, h.title),
            None => println!("  {}. {}", i + 1, h.title),
        }
    }
}

fn run_scan_cmd(symbols: &[String], settings: &Settings, data: &DataArgs, parallel: bool) -> Result<()> {
    let config = build_config(None, settings)?;
    let opts = load_options(&config, data)?;
    let provider = build_provider(data)?;

    let entries = scan_watchlist(symbols, &config, Some(provider.as_ref()), &opts, parallel);
    let rows: Vec<ScanRow> = entries.iter().map(ScanRow::from).collect();

    println!(
        "{:<14} {:<16} {:>12} {:>10} {:>10} {:>16} {:>6}",
        "SYMBOL",
        "TREND",
        "CLOSE",
        format!("CHG {}D", config.indicators.change_window),
        "ROI %",
        "NET VALUE",
        "STOPS"
    );
    for row in &rows {
        match &row.error {
            Some(err) => println!("{:<14} error: {err}", row.symbol),
            None => println!(
                "{:<14} {:<16} {:>12.2} {:>10} {:>10.2} {:>16.2} {:>6}{}",
                row.symbol,
                row.trend.map(|t| t.to_string()).unwrap_or_else(|| "-".into()),
                row.close.unwrap_or_default(),
                signed_pct(row.change_pct),
                row.roi_pct.unwrap_or_default(),
                row.net_client_value.unwrap_or_default(),
                row.stop_loss_exits.unwrap_or_default(),
                if row.has_synthetic { "  (synthetic)" } else { "" }
            ),
        }
    }

    let failed = rows.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        eprintln!("{failed} of {} symbols failed", rows.len());
        std::process::exit(1);
    }
    Ok(())
}

fn run_project_cmd(
    symbol: Option<String>,
    horizon: usize,
    window: usize,
    settings: &Settings,
    data: &DataArgs,
) -> Result<()> {
    if window < 2 {
        bail!("--window must be at least 2");
    }
    let config = build_config(symbol, settings)?;
    let opts = load_options(&config, data)?;
    let provider = build_provider(data)?;

    let loaded = load_bars(&config.backtest.symbol, Some(provider.as_ref()), &opts)?;
    let tail = &loaded.bars[loaded.bars.len().saturating_sub(window)..];
    let closes: Vec<f64> = tail.iter().map(|b| b.close).collect();
    let Some(fit) = LinearProjection::fit(&closes) else {
        bail!("not enough history for {}: {} bars", loaded.symbol, loaded.bars.len());
    };

    println!(
        "{}: fit over {} closes, slope {:+.4}/day, R² {:.3}",
        loaded.symbol, fit.samples, fit.slope, fit.r_squared
    );
    for (k, value) in fit.project(horizon).iter().enumerate() {
        println!("  t+{:<4} {:>12.2}", k + 1, value);
    }
    Ok(())
}
