//! Yahoo Finance data provider.
//!
//! Fetches daily history from Yahoo's v8 chart API and returns it as a
//! two-level table keyed by `(field, symbol)`, with the fields `Adj Close`,
//! `Close`, `High`, `Low`, `Open` and `Volume`. Rows are kept exactly as the
//! API sent them, holes included.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes; every parse failure surfaces as `ResponseFormatChanged`.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{FetchError, FetchRequest, MarketDataProvider};
use super::raw::RawHistory;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
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
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Network knobs for the Yahoo provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YahooSettings {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for YahooSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    settings: YahooSettings,
}

impl YahooProvider {
    pub fn new(
        circuit_breaker: Arc<CircuitBreaker>,
        settings: YahooSettings,
    ) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.request_timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| FetchError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            settings,
        })
    }

    /// Build the chart API URL for a request.
    fn chart_url(request: &FetchRequest) -> String {
        let start_ts = day_start_ts(request.start);
        let end_ts = day_start_ts(request.end) + 86_399;
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval={interval}\
             &includeAdjustedClose=true",
            symbol = request.symbol,
            interval = request.interval.as_query(),
        )
    }

    /// Turn the chart payload into a two-level history.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<RawHistory, FetchError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => FetchError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                FetchError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => FetchError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::ResponseFormatChanged("result array is empty".into()))?;

        // A valid symbol with no trading days in range comes back without timestamps.
        let timestamps = data.timestamp.unwrap_or_default();
        if timestamps.is_empty() {
            return Err(FetchError::EmptyHistory {
                symbol: symbol.to_string(),
            });
        }

        let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
        let adj_close = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose)
            .unwrap_or_default();

        let dates = timestamps
            .iter()
            .map(|&ts| {
                chrono::DateTime::from_timestamp(ts, 0)
                    .map(|dt| dt.date_naive())
                    .ok_or_else(|| {
                        FetchError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                    })
            })
            .collect::<Result<Vec<NaiveDate>, _>>()?;

        let n = dates.len();
        let index = DateChunked::from_naive_date("Date".into(), dates).into_series();

        let field = |name: &str, values: Vec<Option<f64>>| {
            (
                (name.to_string(), symbol.to_string()),
                Series::new(name.into(), pad(values, n)),
            )
        };

        RawHistory::two_level(
            symbol,
            index,
            vec![
                field("Adj Close", adj_close),
                field("Close", quote.close),
                field("High", quote.high),
                field("Low", quote.low),
                field("Open", quote.open),
                field("Volume", quote.volume),
            ],
        )
    }

    /// Execute the request with retry and circuit breaker logic.
    fn fetch_with_retry(&self, request: &FetchRequest) -> Result<RawHistory, FetchError> {
        let symbol = request.symbol.as_str();
        if !self.circuit_breaker.is_allowed() {
            return Err(FetchError::CircuitBreakerTripped);
        }

        let url = Self::chart_url(request);
        let mut last_error = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let delay = self.settings.base_delay * 2u32.pow(attempt - 1);
                tracing::debug!(symbol, attempt, ?delay, "retrying chart request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(FetchError::CircuitBreakerTripped);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        self.circuit_breaker.trip();
                        return Err(FetchError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(FetchError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(FetchError::AuthenticationRequired(
                            "Yahoo Finance requires authentication".into(),
                        ));
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(FetchError::SymbolNotFound {
                            symbol: symbol.to_string(),
                        });
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(FetchError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| {
                        FetchError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })?;

                    let history = Self::parse_response(symbol, chart)?;
                    self.circuit_breaker.record_success();
                    return Ok(history);
                }
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(FetchError::NetworkUnreachable(e.to_string()));
                }
                Err(e) => return Err(FetchError::NetworkUnreachable(e.to_string())),
            }
        }

        Err(last_error.unwrap_or_else(|| FetchError::Other("max retries exceeded".into())))
    }
}

impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(&self, request: &FetchRequest) -> Result<RawHistory, FetchError> {
        let history = self.fetch_with_retry(request)?;
        tracing::debug!(
            symbol = %request.symbol,
            rows = history.height(),
            "fetched chart history"
        );
        Ok(history)
    }
}

fn day_start_ts(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

/// Quote arrays can be shorter than the timestamp array when Yahoo trims
/// trailing nulls; pad so every column has one slot per timestamp.
fn pad(mut values: Vec<Option<f64>>, len: usize) -> Vec<Option<f64>> {
    values.resize(len, None);
    values
}
