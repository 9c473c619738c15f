//! Offline provider: one CSV file per symbol in a directory.
//!
//! Files are read with a header row (`<dir>/<SYMBOL>.csv`); the first column
//! is taken as the date index. Rows dated outside the requested range are
//! dropped. No type inference is forced on dates, so rows with unparseable
//! dates survive until the cleaner coerces them.

use std::path::{Path, PathBuf};

use polars::prelude::*;

use super::clean::coerce_dates;
use super::provider::{FetchError, FetchRequest, MarketDataProvider};
use super::raw::RawHistory;

pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    fn read(path: &Path) -> Result<DataFrame, FetchError> {
        LazyCsvReader::new(path)
            .with_has_header(true)
            .finish()
            .and_then(|lf| lf.collect())
            .map_err(|e| FetchError::Io(format!("{}: {e}", path.display())))
    }

    /// Keep rows dated inside `request.start..=request.end`.
    fn restrict(frame: &DataFrame, request: &FetchRequest) -> Result<DataFrame, FetchError> {
        let Some(index) = frame.get_columns().first() else {
            return Err(FetchError::Frame("history frame has no columns".into()));
        };
        let keep: Vec<bool> = coerce_dates(index)?
            .into_iter()
            .map(|date| date.map_or(true, |d| request.covers(d)))
            .collect();
        let mask = BooleanChunked::from_slice("in_range".into(), &keep);
        Ok(frame.filter(&mask)?)
    }
}

impl MarketDataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_directory"
    }

    fn fetch(&self, request: &FetchRequest) -> Result<RawHistory, FetchError> {
        let path = self.path_for(&request.symbol);
        if !path.is_file() {
            return Err(FetchError::SymbolNotFound {
                symbol: request.symbol.clone(),
            });
        }

        let file = Self::read(&path)?;
        let frame = Self::restrict(&file, request)?;
        if frame.height() == 0 {
            return Err(FetchError::EmptyHistory {
                symbol: request.symbol.clone(),
            });
        }
        tracing::debug!(
            symbol = %request.symbol,
            rows = frame.height(),
            dropped = file.height() - frame.height(),
            path = %path.display(),
            "loaded csv history"
        );
        RawHistory::flat(&request.symbol, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::raw::ColumnLayout;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn scratch_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "barrel_csv_provider_{}_{id}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn request(symbol: &str) -> FetchRequest {
        FetchRequest::lookback(symbol, 5, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
    }

    #[test]
    fn reads_flat_history() {
        let dir = scratch_dir();
        std::fs::write(
            dir.join("KO.csv"),
            "Date,Open,Close\n2024-01-02,59.0,59.2\n2024-01-03,59.3,59.5\n",
        )
        .unwrap();

        let provider = CsvProvider::new(&dir);
        let raw = provider.fetch(&request("KO")).unwrap();
        assert_eq!(raw.layout(), ColumnLayout::Flat);
        assert_eq!(raw.height(), 2);
        assert_eq!(raw.value_names(), vec!["Open", "Close"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rows_outside_request_are_dropped() {
        let dir = scratch_dir();
        std::fs::write(
            dir.join("KO.csv"),
            "Date,Close\n2018-06-01,40.0\n2024-12-30,60.0\nnot-a-date,61.0\n2024-12-31,62.0\n2025-01-02,99.0\n",
        )
        .unwrap();

        let raw = CsvProvider::new(&dir).fetch(&request("KO")).unwrap();
        let index = raw.index().as_materialized_series();
        let kept: Vec<&str> = index.str().unwrap().into_iter().flatten().collect();
        assert_eq!(kept, vec!["2024-12-30", "not-a-date", "2024-12-31"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn history_entirely_after_end_is_empty() {
        let dir = scratch_dir();
        std::fs::write(dir.join("NEW.csv"), "Date,Close\n2025-03-03,10.0\n").unwrap();
        let err = CsvProvider::new(&dir).fetch(&request("NEW")).unwrap_err();
        assert!(matches!(err, FetchError::EmptyHistory { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_symbol_not_found() {
        let dir = scratch_dir();
        let provider = CsvProvider::new(&dir);
        let err = provider.fetch(&request("NOPE")).unwrap_err();
        assert!(matches!(err, FetchError::SymbolNotFound { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn header_only_file_is_empty_history() {
        let dir = scratch_dir();
        std::fs::write(dir.join("F.csv"), "Date,Close\n").unwrap();
        let provider = CsvProvider::new(&dir);
        let err = provider.fetch(&request("F")).unwrap_err();
        assert!(matches!(
            err,
            FetchError::EmptyHistory { .. } | FetchError::Io(_)
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
