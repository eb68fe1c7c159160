//! Yahoo Finance chart API provider.
//!
//! Daily bars from the v8 chart endpoint, with exponential-backoff retries and
//! the shared circuit breaker. The endpoint is unofficial; `CsvProvider` is the
//! offline fallback. Recent headlines come from the v1 search endpoint.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DataProvider, DataSource, FetchResult, RawBar};

const CHART_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const SEARCH_BASE_URL: &str = "https://query2.finance.yahoo.com/v1/finance/search";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<Quote>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Quote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    news: Vec<NewsItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewsItem {
    title: Option<String>,
    publisher: Option<String>,
    link: Option<String>,
}

/// One news item about a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub publisher: Option<String>,
    pub link: Option<String>,
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    base_url: String,
    search_url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            base_url: CHART_BASE_URL.to_string(),
            search_url: SEARCH_BASE_URL.to_string(),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Point the provider at another chart endpoint (mirrors, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Point headline lookups at another search endpoint.
    pub fn with_search_url(mut self, search_url: impl Into<String>) -> Self {
        self.search_url = search_url.into();
        self
    }

    fn blocked(&self) -> DataError {
        DataError::CircuitBreakerTripped {
            retry_in_secs: self.circuit_breaker.remaining_cooldown().as_secs(),
        }
    }

    fn search_url(&self, symbol: &str, count: usize) -> String {
        format!(
            "{}?q={symbol}&quotesCount=0&newsCount={count}",
            self.search_url
        )
    }

    /// Up to `count` recent headlines for `symbol`, newest first.
    ///
    /// One attempt, no retries: headlines are an optional read-out. Items
    /// without a title are skipped.
    pub fn headlines(&self, symbol: &str, count: usize) -> Result<Vec<Headline>, DataError> {
        let _span = tracing::info_span!("yahoo_headlines", symbol, count).entered();
        if count == 0 {
            return Ok(Vec::new());
        }
        if !self.circuit_breaker.is_allowed() {
            return Err(self.blocked());
        }

        let resp = self
            .client
            .get(self.search_url(symbol, count))
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        let status = resp.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            self.circuit_breaker.trip();
            return Err(self.blocked());
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.circuit_breaker.record_failure();
            return Err(DataError::RateLimited { retry_after_secs: 60 });
        }
        if !status.is_success() {
            self.circuit_breaker.record_failure();
            return Err(DataError::Other(format!("HTTP {status} for {symbol} headlines")));
        }

        let search: SearchResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("unparseable search for {symbol}: {e}"))
        })?;
        self.circuit_breaker.record_success();
        let headlines = Self::parse_headlines(search, count);
        tracing::debug!(headlines = headlines.len(), "headlines fetched");
        Ok(headlines)
    }

    fn parse_headlines(resp: SearchResponse, count: usize) -> Vec<Headline> {
        resp.news
            .into_iter()
            .filter_map(|item| {
                let title = item.title?.trim().to_string();
                (!title.is_empty()).then_some(Headline {
                    title,
                    publisher: item.publisher,
                    link: item.link,
                })
            })
            .take(count)
            .collect()
    }

    fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .succ_opt()
            .unwrap_or(end)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp();
        format!(
            "{}/{symbol}?period1={start_ts}&period2={end_ts}&interval=1d&includeAdjustedClose=true",
            self.base_url
        )
    }

    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<RawBar>, DataError> {
        let Some(results) = resp.chart.result else {
            return Err(match resp.chart.error {
                Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                },
                Some(err) => {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
                None => DataError::ResponseFormatChanged("empty result with no error".into()),
            });
        };

        let data = results
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;
        let timestamps = data
            .timestamp
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;
        let adj = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose)
            .unwrap_or_default();

        let at = |v: &[Option<f64>], i: usize| v.get(i).copied().flatten();

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            // Holidays come back as rows of nulls.
            let Some(close) = at(&quote.close, i) else {
                continue;
            };

            bars.push(RawBar {
                date,
                open: at(&quote.open, i).unwrap_or(f64::NAN),
                high: at(&quote.high, i).unwrap_or(f64::NAN),
                low: at(&quote.low, i).unwrap_or(f64::NAN),
                close,
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
                adj_close: at(&adj, i).unwrap_or(close),
            });
        }

        if bars.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        Ok(bars)
    }

    fn fetch_with_retry(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawBar>, DataError> {
        let url = self.chart_url(symbol, start, end);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                tracing::debug!(symbol, attempt, delay_ms = delay.as_millis() as u64, "retrying chart request");
                std::thread::sleep(delay);
            }
            if !self.circuit_breaker.is_allowed() {
                return Err(self.blocked());
            }

            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(self.blocked());
            }
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(DataError::AuthenticationRequired(
                    "Yahoo Finance requires authentication".into(),
                ));
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                });
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after_secs = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::RateLimited { retry_after_secs });
                continue;
            }
            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                continue;
            }

            let chart: ChartResponse = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!("unparseable chart for {symbol}: {e}"))
            })?;
            let bars = Self::parse_response(symbol, chart)?;
            self.circuit_breaker.record_success();
            return Ok(bars);
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let _span = tracing::info_span!("yahoo_fetch", symbol, %start, %end).entered();
        let bars = self.fetch_with_retry(symbol, start, end)?;
        tracing::debug!(bars = bars.len(), "chart fetched");
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::YahooFinance,
        })
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Vec<RawBar>, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooProvider::parse_response("TRENT.NS", resp)
    }

    #[test]
    fn parses_rows_and_skips_null_days() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1704182400,1704268800,1704355200],
            "indicators":{
                "quote":[{"open":[10.0,null,11.0],"high":[12.0,null,12.5],
                          "low":[9.5,null,10.5],"close":[11.0,null,12.0],
                          "volume":[100,null,200]}],
                "adjclose":[{"adjclose":[10.9,null,11.9]}]
            }}],"error":null}}"#;
        let bars = parse(json).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[1].close, 12.0);
        assert_eq!(bars[1].adj_close, 11.9);
        assert_eq!(bars[1].volume, 200);
    }

    #[test]
    fn not_found_maps_to_symbol_error() {
        let json = r#"{"chart":{"result":null,
            "error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(parse(json), Err(DataError::SymbolNotFound { .. })));
    }

    #[test]
    fn unknown_error_is_format_change() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"x"}}}"#;
        assert!(matches!(parse(json), Err(DataError::ResponseFormatChanged(_))));
    }

    #[test]
    fn headlines_skip_untitled_items_and_respect_count() {
        let json = r#"{"quotes":[],"news":[
            {"title":"Shares climb after results","publisher":"Wire","link":"https://x/1"},
            {"publisher":"Wire"},
            {"title":"  "},
            {"title":"Board approves buyback"},
            {"title":"Analysts raise targets"},
            {"title":"Fourth story"}]}"#;
        let resp: SearchResponse = serde_json::from_str(json).unwrap();
        let headlines = YahooProvider::parse_headlines(resp, 3);
        let titles: Vec<&str> = headlines.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(
            titles,
            ["Shares climb after results", "Board approves buyback", "Analysts raise targets"]
        );
        assert_eq!(headlines[0].publisher.as_deref(), Some("Wire"));
        assert_eq!(headlines[1].link, None);
    }

    #[test]
    fn missing_news_array_is_empty() {
        let resp: SearchResponse = serde_json::from_str(r#"{"quotes":[]}"#).unwrap();
        assert!(YahooProvider::parse_headlines(resp, 3).is_empty());
    }

    #[test]
    fn tripped_breaker_reports_remaining_cooldown() {
        let cb = Arc::new(CircuitBreaker::new(Duration::from_secs(600), 1));
        cb.trip();
        let provider = YahooProvider::new(cb).unwrap().with_base_url("http://127.0.0.1:9/chart");
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

        let err = provider.fetch("GOOG", day, day).unwrap_err();
        let DataError::CircuitBreakerTripped { retry_in_secs } = &err else {
            panic!("expected a tripped breaker, got {err:?}");
        };
        assert!(*retry_in_secs > 500 && *retry_in_secs <= 600);
        assert!(err.to_string().contains("retry in"));

        assert!(matches!(
            provider.headlines("GOOG", 3),
            Err(DataError::CircuitBreakerTripped { .. })
        ));
        assert!(provider.headlines("GOOG", 0).unwrap().is_empty());
    }

    #[test]
    fn search_url_asks_for_news_only() {
        let cb = Arc::new(CircuitBreaker::default_provider());
        let provider = YahooProvider::new(cb)
            .unwrap()
            .with_search_url("http://localhost/search");
        assert_eq!(
            provider.search_url("RELIANCE.NS", 3),
            "http://localhost/search?q=RELIANCE.NS&quotesCount=0&newsCount=3"
        );
    }

    #[test]
    fn url_covers_whole_end_day() {
        let cb = Arc::new(CircuitBreaker::default_provider());
        let provider = YahooProvider::new(cb)
            .unwrap()
            .with_base_url("http://localhost/chart");
        let url = provider.chart_url(
            "GOOG",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        assert_eq!(
            url,
            "http://localhost/chart/GOOG?period1=1704067200&period2=1704153600&interval=1d&includeAdjustedClose=true"
        );
    }
}
