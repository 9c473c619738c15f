//! Deterministic provider backed by prepared histories.
//!
//! Each symbol maps to either a history or a forced failure; an optional
//! per-symbol delay simulates a slow upstream. Unknown symbols fail with
//! `SymbolNotFound`.

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;
use polars::prelude::*;

use super::provider::{FetchError, FetchRequest, MarketDataProvider};
use super::raw::RawHistory;

#[derive(Default)]
pub struct InMemoryProvider {
    entries: HashMap<String, Result<RawHistory, FetchError>>,
    delays: HashMap<String, Duration>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(mut self, history: RawHistory) -> Self {
        self.entries
            .insert(history.symbol().to_string(), Ok(history));
        self
    }

    pub fn with_failure(mut self, symbol: impl Into<String>, error: FetchError) -> Self {
        self.entries.insert(symbol.into(), Err(error));
        self
    }

    pub fn with_delay(mut self, symbol: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(symbol.into(), delay);
        self
    }

    /// Convenience: flat `Date, Close` history over consecutive calendar days.
    pub fn with_closes(
        self,
        symbol: &str,
        start: NaiveDate,
        closes: &[f64],
    ) -> Result<Self, FetchError> {
        let history = daily_close_history(symbol, start, closes)?;
        Ok(self.with_history(history))
    }
}

/// Build a flat `Date, Close` history, one row per calendar day from `start`.
pub fn daily_close_history(
    symbol: &str,
    start: NaiveDate,
    closes: &[f64],
) -> Result<RawHistory, FetchError> {
    let dates: Vec<NaiveDate> = start.iter_days().take(closes.len()).collect();
    let frame = DataFrame::new(vec![
        DateChunked::from_naive_date("Date".into(), dates)
            .into_series()
            .into(),
        Series::new("Close".into(), closes).into(),
    ])?;
    RawHistory::flat(symbol, frame)
}

impl MarketDataProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn fetch(&self, request: &FetchRequest) -> Result<RawHistory, FetchError> {
        if let Some(delay) = self.delays.get(&request.symbol) {
            std::thread::sleep(*delay);
        }
        match self.entries.get(&request.symbol) {
            Some(entry) => entry.clone(),
            None => Err(FetchError::SymbolNotFound {
                symbol: request.symbol.clone(),
            }),
        }
    }
}
