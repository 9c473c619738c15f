//! Provider → normalizer → cleaner integration.
//!
//! Exercises the data path the screener runs for every ticker, across the
//! providers and header shapes it has to cope with.

use std::path::PathBuf;

use barrel_core::data::memory::daily_close_history;
use barrel_core::data::{
    CsvProvider, InMemoryProvider, NormalizeStrategy, SeriesCleaner, SeriesNormalizer,
};
use barrel_core::{CleanError, FetchError, FetchRequest, MarketDataProvider, RawHistory};
use chrono::NaiveDate;
use polars::prelude::*;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 3, 1).unwrap()
}

fn request(symbol: &str) -> FetchRequest {
    FetchRequest::lookback(symbol, 5, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
}

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("barrel_data_it_{tag}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

// ── In-memory ────────────────────────────────────────────────────────

#[test]
fn in_memory_history_flows_to_price_series() {
    let closes: Vec<f64> = (0..400).map(|i| 50.0 + (i % 7) as f64).collect();
    let provider = InMemoryProvider::new()
        .with_closes("KO", start(), &closes)
        .unwrap();

    let raw = provider.fetch(&request("KO")).unwrap();
    let normalized = SeriesNormalizer.normalize(&raw).unwrap();
    assert_eq!(normalized.strategy(), NormalizeStrategy::FlatExactClose);
    assert_eq!(normalized.latest_close(), Some(*closes.last().unwrap()));

    for window in [120, 360] {
        let series = SeriesCleaner::new(window).clean(&normalized).unwrap();
        assert_eq!(series.len(), window);
        assert_eq!(series.last().unwrap().close, *closes.last().unwrap());
    }

    // Window larger than the history keeps everything.
    let series = SeriesCleaner::new(720).clean(&normalized).unwrap();
    assert_eq!(series.len(), 400);
}

#[test]
fn latest_close_is_taken_before_windowing() {
    let closes: Vec<f64> = (0..30).map(|i| i as f64).collect();
    let raw = daily_close_history("X", start(), &closes).unwrap();
    let normalized = SeriesNormalizer.normalize(&raw).unwrap();
    let series = SeriesCleaner::new(120).clean(&normalized).unwrap();
    assert_eq!(normalized.latest_close(), Some(29.0));
    assert_eq!(series.stats().max, 29.0);
}

#[test]
fn forced_failure_surfaces_unchanged() {
    let provider =
        InMemoryProvider::new().with_failure("BBB", FetchError::EmptyHistory { symbol: "BBB".into() });
    assert!(matches!(
        provider.fetch(&request("BBB")),
        Err(FetchError::EmptyHistory { .. })
    ));
}

// ── Two-level headers ────────────────────────────────────────────────

#[test]
fn two_level_download_shape_prefers_exact_close() {
    let dates: Vec<String> = start()
        .iter_days()
        .take(15)
        .map(|d| d.to_string())
        .collect();
    let adj: Vec<f64> = (0..15).map(|i| 1.0 + i as f64).collect();
    let close: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
    let raw = RawHistory::two_level(
        "HPQ",
        Series::new("Date".into(), dates),
        vec![
            (("Adj Close".into(), "HPQ".into()), Series::new("".into(), adj)),
            (("Close".into(), "HPQ".into()), Series::new("".into(), close)),
        ],
    )
    .unwrap();

    let normalized = SeriesNormalizer.normalize(&raw).unwrap();
    assert_eq!(normalized.strategy(), NormalizeStrategy::TwoLevelExactClose);
    let series = SeriesCleaner::new(120).clean(&normalized).unwrap();
    assert_eq!(series.first().unwrap().close, 100.0);
    assert_eq!(series.len(), 15);
}

// ── CSV directory ────────────────────────────────────────────────────

#[test]
fn csv_export_with_gaps_and_garbage() {
    let dir = scratch_dir("gaps");
    let mut body = String::from("Date,Open,High,Low,Close,Volume\n");
    for (i, date) in start().iter_days().take(14).enumerate() {
        let close = match i {
            3 => String::new(),
            7 => "null".to_string(),
            _ => format!("{:.2}", 20.0 + i as f64),
        };
        body.push_str(&format!("{date},1,2,0.5,{close},1000\n"));
    }
    std::fs::write(dir.join("F.csv"), body).unwrap();

    let provider = CsvProvider::new(&dir);
    let raw = provider.fetch(&request("F")).unwrap();
    let normalized = SeriesNormalizer.normalize(&raw).unwrap();
    assert_eq!(normalized.strategy(), NormalizeStrategy::FlatExactClose);

    let series = SeriesCleaner::new(120).clean(&normalized).unwrap();
    assert_eq!(series.len(), 12);
    assert_eq!(series.last().unwrap().close, 33.0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn csv_without_close_column_is_schema_error() {
    let dir = scratch_dir("noclose");
    std::fs::write(
        dir.join("Q.csv"),
        "Date,Open,High\n2024-01-02,1,2\n2024-01-03,1,2\n",
    )
    .unwrap();
    let raw = CsvProvider::new(&dir).fetch(&request("Q")).unwrap();
    let err = SeriesNormalizer.normalize(&raw).unwrap_err();
    assert_eq!(err.to_string(), "close column not found");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn short_csv_is_insufficient() {
    let dir = scratch_dir("short");
    let mut body = String::from("Date,Close\n");
    for (i, date) in start().iter_days().take(9).enumerate() {
        body.push_str(&format!("{date},{}\n", 10 + i));
    }
    std::fs::write(dir.join("S.csv"), body).unwrap();

    let raw = CsvProvider::new(&dir).fetch(&request("S")).unwrap();
    let normalized = SeriesNormalizer.normalize(&raw).unwrap();
    assert_eq!(normalized.latest_close(), Some(18.0));
    let err = SeriesCleaner::new(120).clean(&normalized).unwrap_err();
    assert!(matches!(err, CleanError::InsufficientData { found: 9, required: 10 }));
    let _ = std::fs::remove_dir_all(&dir);
}
