//! Market data provider trait and structured fetch errors.
//!
//! The MarketDataProvider trait abstracts over data sources (Yahoo Finance,
//! a directory of CSV files, prepared in-memory histories) so the pipeline
//! can be pointed at live data, offline data, or test fixtures.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::raw::RawHistory;

/// Sampling interval of the requested history. Only daily bars are screened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Daily,
}

impl Interval {
    /// Query-string value used by chart APIs.
    pub fn as_query(&self) -> &'static str {
        match self {
            Interval::Daily => "1d",
        }
    }
}

/// What to fetch for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub interval: Interval,
}

impl FetchRequest {
    /// Daily history covering `years` calendar years up to and including `end`.
    pub fn lookback(symbol: impl Into<String>, years: u32, end: NaiveDate) -> Self {
        let start = end
            .checked_sub_months(Months::new(years.saturating_mul(12)))
            .unwrap_or(NaiveDate::MIN);
        Self {
            symbol: symbol.into(),
            start,
            end,
            interval: Interval::Daily,
        }
    }

    /// Whether `date` falls inside `start..=end`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        (self.start..=self.end).contains(&date)
    }
}

/// Structured error types for data retrieval.
///
/// Every variant means "no usable history for this symbol"; the runner
/// reports all of them as data unavailability for the ticker.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
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

    #[error("provider returned no rows for {symbol}")]
    EmptyHistory { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("failed to read local data: {0}")]
    Io(String),

    #[error("failed to build history frame: {0}")]
    Frame(String),

    #[error("data error: {0}")]
    Other(String),
}

impl From<polars::error::PolarsError> for FetchError {
    fn from(e: polars::error::PolarsError) -> Self {
        FetchError::Frame(e.to_string())
    }
}

/// Trait for market data providers.
///
/// Implementations return the history exactly as the source delivered it;
/// picking the close column and dropping bad rows happens downstream.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the raw daily history described by `request`.
    fn fetch(&self, request: &FetchRequest) -> Result<RawHistory, FetchError>;
}
