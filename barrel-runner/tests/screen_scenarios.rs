//! End-to-end screening scenarios over deterministic providers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use barrel_core::data::memory::daily_close_history;
use barrel_core::data::{CsvProvider, InMemoryProvider};
use barrel_core::{
    FetchError, FetchRequest, ForecastConfig, ForecastEngine, MarketDataProvider, RawHistory,
    Ticker, Universe,
};
use barrel_runner::{
    FailureKind, ForecastHorizon, HistoricalWindow, ScreenOptions, ScreenRequest, ScreenRow,
    Screener,
};
use chrono::NaiveDate;
use polars::prelude::*;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
}

fn screener(provider: InMemoryProvider) -> Screener {
    Screener::new(
        Arc::new(provider),
        ForecastEngine::new(ForecastConfig::default()).unwrap(),
        ScreenOptions::new(as_of()),
    )
}

fn fire(window: HistoricalWindow, horizon: ForecastHorizon) -> ScreenRequest {
    ScreenRequest::new(window, horizon, 1)
}

fn wave(n: usize, level: f64) -> Vec<f64> {
    (0..n)
        .map(|i| level + 3.0 * (i as f64 * 0.21).sin() + 0.4 * (i as f64 * 1.3).cos())
        .collect()
}

#[test]
fn constant_series_and_unavailable_ticker() {
    let provider = InMemoryProvider::new()
        .with_closes("AAA", start(), &[100.0; 150])
        .unwrap()
        .with_failure(
            "BBB",
            FetchError::NetworkUnreachable("connection refused".into()),
        );
    let universe = Universe::new(vec![Ticker::new("A", "AAA"), Ticker::new("B", "BBB")]);

    let report = screener(provider).run(
        &universe,
        &fire(HistoricalWindow::Days120, ForecastHorizon::Days30),
    );
    assert_eq!(report.outcomes.len(), 2);

    let a = report.outcomes[0].row();
    assert_eq!(a.ticker, "AAA");
    assert_eq!(a.on_mkt, Some(100.0));
    assert_eq!(a.minimo, Some(100.0));
    assert_eq!(a.media, Some(100.0));
    assert_eq!(a.massimo, Some(100.0));
    assert!((a.forecast_value.unwrap() - 100.0).abs() < 1e-9);
    assert!(a.delta_pct.unwrap().abs() < 1e-9);

    assert_eq!(report.outcomes[1].row(), &ScreenRow::empty("BBB"));
    assert_eq!(
        report.outcomes[1].failure().map(|(k, _)| k),
        Some(FailureKind::DataUnavailable)
    );
}

#[test]
fn nine_row_series_keeps_market_price() {
    let closes: Vec<f64> = (0..9).map(|i| 20.0 + i as f64 * 0.5).collect();
    let provider = InMemoryProvider::new()
        .with_closes("NINE", start(), &closes)
        .unwrap();
    let universe = Universe::new(vec![Ticker::new("Nine", "NINE")]);

    let report = screener(provider).run(
        &universe,
        &fire(HistoricalWindow::Days120, ForecastHorizon::Days30),
    );
    let outcome = &report.outcomes[0];
    assert_eq!(
        outcome.failure().map(|(k, _)| k),
        Some(FailureKind::InsufficientData)
    );
    assert_eq!(outcome.row(), &ScreenRow::price_only("NINE", Some(24.0)));
}

#[test]
fn failing_ticker_does_not_disturb_others() {
    let provider = || {
        InMemoryProvider::new()
            .with_closes("X1", start(), &wave(200, 40.0))
            .unwrap()
            .with_closes("X3", start(), &wave(400, 75.0))
            .unwrap()
    };
    let with_failure = provider().with_failure(
        "X2",
        FetchError::ResponseFormatChanged("missing chart".into()),
    );

    let full = Universe::new(vec![
        Ticker::new("One", "X1"),
        Ticker::new("Two", "X2"),
        Ticker::new("Three", "X3"),
    ]);
    let without = Universe::new(vec![Ticker::new("One", "X1"), Ticker::new("Three", "X3")]);
    let request = fire(HistoricalWindow::Days360, ForecastHorizon::Days60);

    let report = screener(with_failure).run(&full, &request);
    let baseline = screener(provider()).run(&without, &request);

    assert_eq!(report.outcomes.len(), 3);
    assert!(report.outcomes[1].is_degraded());
    assert_eq!(report.outcomes[0], baseline.outcomes[0]);
    assert_eq!(report.outcomes[2], baseline.outcomes[1]);
}

/// Flat history with prices but nothing that looks like a close column.
fn history_without_close(symbol: &str, n: usize) -> RawHistory {
    let dates: Vec<NaiveDate> = start().iter_days().take(n).collect();
    let frame = DataFrame::new(vec![
        DateChunked::from_naive_date("Date".into(), dates)
            .into_series()
            .into(),
        Series::new("Open".into(), vec![30.0; n]).into(),
        Series::new("Volume".into(), vec![1000.0; n]).into(),
    ])
    .unwrap();
    RawHistory::flat(symbol, frame).unwrap()
}

#[test]
fn failures_at_every_stage_stay_isolated() {
    let provider = || {
        InMemoryProvider::new()
            .with_closes("X1", start(), &wave(200, 40.0))
            .unwrap()
            .with_closes("X5", start(), &wave(400, 75.0))
            .unwrap()
    };
    let with_failures = provider()
        .with_failure("X2", FetchError::NetworkUnreachable("reset".into()))
        .with_history(history_without_close("X3", 200))
        .with_closes("X4", start(), &[7.0, 7.5, 8.0, 8.5, 9.0, 9.5])
        .unwrap();

    let full = Universe::new(
        ["X1", "X2", "X3", "X4", "X5"]
            .iter()
            .map(|s| Ticker::new(*s, *s))
            .collect(),
    );
    let without = Universe::new(vec![Ticker::new("X1", "X1"), Ticker::new("X5", "X5")]);
    let request = fire(HistoricalWindow::Days120, ForecastHorizon::Days30);

    let report = screener(with_failures).run(&full, &request);
    let baseline = screener(provider()).run(&without, &request);

    let kinds: Vec<Option<FailureKind>> = report
        .outcomes
        .iter()
        .map(|o| o.failure().map(|(k, _)| k))
        .collect();
    assert_eq!(
        kinds,
        vec![
            None,
            Some(FailureKind::DataUnavailable),
            Some(FailureKind::SchemaError),
            Some(FailureKind::InsufficientData),
            None,
        ]
    );

    // No close column means no market price; a short series still has one.
    assert_eq!(report.outcomes[2].row(), &ScreenRow::empty("X3"));
    assert_eq!(report.outcomes[3].row(), &ScreenRow::price_only("X4", Some(9.5)));

    assert_eq!(report.outcomes[0], baseline.outcomes[0]);
    assert_eq!(report.outcomes[4], baseline.outcomes[1]);
}

#[test]
fn offline_rows_after_as_of_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let mut body = String::from("Date,Close\n");
    for (i, date) in start().iter_days().take(60).enumerate() {
        let close = if i < 30 { 10.0 } else { 99.0 };
        body.push_str(&format!("{date},{close}\n"));
    }
    std::fs::write(dir.path().join("CSV1.csv"), body).unwrap();

    let as_of = start().iter_days().nth(29).unwrap();
    let s = Screener::new(
        Arc::new(CsvProvider::new(dir.path())),
        ForecastEngine::new(ForecastConfig::default()).unwrap(),
        ScreenOptions::new(as_of),
    );
    let report = s.run(
        &Universe::new(vec![Ticker::new("Csv", "CSV1")]),
        &fire(HistoricalWindow::Days120, ForecastHorizon::Days30),
    );

    let row = report.outcomes[0].row();
    assert!(!report.outcomes[0].is_degraded());
    assert_eq!(row.on_mkt, Some(10.0));
    assert_eq!(row.massimo, Some(10.0));
    assert!((row.forecast_value.unwrap() - 10.0).abs() < 1e-9);
}

/// Slow provider that records how many fetches overlap.
struct OverlapProvider {
    delay: Duration,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl MarketDataProvider for OverlapProvider {
    fn name(&self) -> &str {
        "overlap"
    }

    fn fetch(&self, request: &FetchRequest) -> Result<RawHistory, FetchError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.running.fetch_sub(1, Ordering::SeqCst);
        daily_close_history(&request.symbol, start(), &[5.0; 20])
    }
}

#[test]
fn timed_out_fetches_still_count_against_workers() {
    for workers in [1, 2] {
        let provider = Arc::new(OverlapProvider {
            delay: Duration::from_millis(250),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let s = Screener::new(
            provider.clone(),
            ForecastEngine::new(ForecastConfig::default()).unwrap(),
            ScreenOptions {
                workers,
                ticker_timeout: Duration::from_millis(30),
                ..ScreenOptions::new(as_of())
            },
        );
        let universe = Universe::new(
            (0..5)
                .map(|i| Ticker::new(format!("T{i}"), format!("T{i}")))
                .collect(),
        );
        let report = s.run(
            &universe,
            &fire(HistoricalWindow::Days120, ForecastHorizon::Days30),
        );

        assert_eq!(report.degraded_count(), 5);
        assert!(report
            .outcomes
            .iter()
            .all(|o| o.failure().map(|(k, _)| k) == Some(FailureKind::Timeout)));
        assert!(
            provider.peak.load(Ordering::SeqCst) <= workers,
            "{} overlapping fetches with {workers} workers",
            provider.peak.load(Ordering::SeqCst)
        );
    }
}

#[test]
fn identical_inputs_give_identical_rows() {
    let provider = InMemoryProvider::new()
        .with_closes("W", start(), &wave(800, 12.0))
        .unwrap();
    let s = screener(provider);
    let universe = Universe::new(vec![Ticker::new("W", "W")]);
    let request = fire(HistoricalWindow::Days720, ForecastHorizon::Days120);

    let first = s.run(&universe, &request).into_rows();
    let second = s.run(&universe, &request).into_rows();
    assert_eq!(first, second);
}

#[test]
fn worker_count_does_not_change_output() {
    let symbols = ["P1", "P2", "P3", "P4", "P5", "P6"];
    let build = || {
        symbols.iter().enumerate().fold(InMemoryProvider::new(), |p, (i, s)| {
            p.with_closes(s, start(), &wave(150 + 10 * i, 10.0 + i as f64))
                .unwrap()
        })
    };
    let universe = Universe::new(symbols.iter().map(|s| Ticker::new(*s, *s)).collect());
    let request = fire(HistoricalWindow::Days120, ForecastHorizon::Days30);

    let run = |workers: usize| {
        Screener::new(
            Arc::new(build()),
            ForecastEngine::new(ForecastConfig::default()).unwrap(),
            ScreenOptions {
                workers,
                ..ScreenOptions::new(as_of())
            },
        )
        .run(&universe, &request)
        .into_rows()
    };
    assert_eq!(run(1), run(6));
}

#[test]
fn hang_becomes_timeout_row() {
    let provider = InMemoryProvider::new()
        .with_closes("HANG", start(), &[5.0; 50])
        .unwrap()
        .with_delay("HANG", Duration::from_secs(5))
        .with_closes("OK", start(), &[5.0; 50])
        .unwrap();
    let s = Screener::new(
        Arc::new(provider),
        ForecastEngine::new(ForecastConfig::default()).unwrap(),
        ScreenOptions {
            ticker_timeout: Duration::from_millis(150),
            ..ScreenOptions::new(as_of())
        },
    );
    let universe = Universe::new(vec![Ticker::new("Hang", "HANG"), Ticker::new("Ok", "OK")]);
    let report = s.run(
        &universe,
        &fire(HistoricalWindow::Days120, ForecastHorizon::Days30),
    );

    assert_eq!(
        report.outcomes[0].failure().map(|(k, _)| k),
        Some(FailureKind::Timeout)
    );
    assert_eq!(report.outcomes[1].row().forecast_value, Some(5.0));
}

#[test]
fn zero_trigger_count_skips_pipeline() {
    let report = screener(InMemoryProvider::new()).run(
        &Universe::default_barrel(),
        &ScreenRequest::new(HistoricalWindow::Days120, ForecastHorizon::Days30, 0),
    );
    assert!(report.outcomes.is_empty());
    assert_eq!(report.complete_count() + report.degraded_count(), 0);
}
