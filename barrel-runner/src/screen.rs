//! Batch screening over a universe.
//!
//! Tickers run on a bounded Rayon pool. Each ticker's pipeline runs on its
//! own thread so a hung fetch or fit can be abandoned once the per-ticker
//! budget is spent; the pool worker then records a `Timeout` row and moves
//! on. An abandoned thread keeps its in-flight permit until it exits, so at
//! most `workers` pipelines touch the provider at any time. Results are
//! collected by ticker index, so row order always matches the universe order
//! regardless of completion order.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use rayon::prelude::*;

use barrel_core::{ForecastEngine, MarketDataProvider, Ticker, Universe};

use crate::pipeline::{degraded, PipelineError, TickerPipeline};
use crate::request::ScreenRequest;
use crate::row::{ScreenRow, TickerOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenOptions {
    /// Upper bound on tickers processed concurrently.
    pub workers: usize,
    /// Wall-clock budget for fetch + fit of one ticker.
    pub ticker_timeout: Duration,
    pub lookback_years: u32,
    /// Last day of the requested history.
    pub as_of: NaiveDate,
}

impl ScreenOptions {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            workers: 4,
            ticker_timeout: Duration::from_secs(120),
            lookback_years: 5,
            as_of,
        }
    }
}

/// One screening pass: the request plus one outcome per ticker, in order.
#[derive(Debug, Clone)]
pub struct ScreenReport {
    pub request: ScreenRequest,
    pub outcomes: Vec<TickerOutcome>,
    pub elapsed: Duration,
}

impl ScreenReport {
    pub fn rows(&self) -> Vec<&ScreenRow> {
        self.outcomes.iter().map(TickerOutcome::row).collect()
    }

    pub fn into_rows(self) -> Vec<ScreenRow> {
        self.outcomes.into_iter().map(TickerOutcome::into_row).collect()
    }

    pub fn complete_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_degraded()).count()
    }

    pub fn degraded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_degraded()).count()
    }
}

pub struct Screener {
    provider: Arc<dyn MarketDataProvider>,
    engine: ForecastEngine,
    options: ScreenOptions,
}

impl Screener {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        engine: ForecastEngine,
        options: ScreenOptions,
    ) -> Self {
        Self {
            provider,
            engine,
            options,
        }
    }

    pub fn options(&self) -> &ScreenOptions {
        &self.options
    }

    /// Screen every ticker of `universe`. Never fails: a ticker that cannot
    /// be evaluated yields a degraded row. A request that has not fired
    /// returns an empty report without touching the provider.
    pub fn run(&self, universe: &Universe, request: &ScreenRequest) -> ScreenReport {
        let started = Instant::now();
        if !request.fired() {
            tracing::debug!("screen not triggered, returning no rows");
            return ScreenReport {
                request: *request,
                outcomes: Vec::new(),
                elapsed: started.elapsed(),
            };
        }

        let pipeline = TickerPipeline::new(
            Arc::clone(&self.provider),
            self.engine.clone(),
            request.window.days(),
            request.horizon.days(),
            self.options.lookback_years,
            self.options.as_of,
        );
        let workers = self.options.workers.max(1);
        let timeout = self.options.ticker_timeout;

        tracing::info!(
            tickers = universe.len(),
            window = %request.window,
            horizon = %request.horizon,
            workers,
            provider = pipeline.provider_name(),
            "screen started"
        );

        let gate = InFlightGate::new(workers);
        let evaluate = |ticker: &Ticker| evaluate_with_timeout(&pipeline, &gate, ticker, timeout);
        let outcomes: Vec<TickerOutcome> = match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("barrel-screen-{i}"))
            .build()
        {
            Ok(pool) => pool.install(|| universe.tickers.par_iter().map(evaluate).collect()),
            Err(e) => {
                tracing::warn!(error = %e, "worker pool unavailable, screening sequentially");
                universe.tickers.iter().map(evaluate).collect()
            }
        };

        let report = ScreenReport {
            request: *request,
            outcomes,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            complete = report.complete_count(),
            degraded = report.degraded_count(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "screen finished"
        );
        report
    }
}

/// Counting gate over running ticker pipelines.
struct InFlightGate {
    available: Mutex<usize>,
    freed: Condvar,
}

/// One running pipeline. Dropping it frees the slot.
struct InFlightPermit {
    gate: Arc<InFlightGate>,
}

impl InFlightGate {
    fn new(slots: usize) -> Arc<Self> {
        Arc::new(Self {
            available: Mutex::new(slots.max(1)),
            freed: Condvar::new(),
        })
    }

    /// Block until a slot is free and take it.
    fn acquire(self: &Arc<Self>) -> InFlightPermit {
        let mut available = self
            .available
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while *available == 0 {
            available = self
                .freed
                .wait(available)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *available -= 1;
        InFlightPermit {
            gate: Arc::clone(self),
        }
    }
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        let mut available = self
            .gate
            .available
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *available += 1;
        self.gate.freed.notify_one();
    }
}

/// Run one ticker on a dedicated thread and wait at most `timeout`.
///
/// The deadline starts once a slot is free. A timed-out thread is detached
/// and left to finish on its own; its result is discarded and its slot is
/// released only when it exits.
fn evaluate_with_timeout(
    pipeline: &TickerPipeline,
    gate: &Arc<InFlightGate>,
    ticker: &Ticker,
    timeout: Duration,
) -> TickerOutcome {
    let permit = gate.acquire();
    let (tx, rx) = mpsc::channel();
    let worker_pipeline = pipeline.clone();
    let worker_ticker = ticker.clone();

    let spawned = std::thread::Builder::new()
        .name(format!("barrel-ticker-{}", ticker.symbol))
        .spawn(move || {
            let _permit = permit;
            let outcome = worker_pipeline.evaluate(&worker_ticker);
            let _ = tx.send(outcome);
        });

    if let Err(e) = spawned {
        tracing::warn!(symbol = %ticker.symbol, error = %e, "could not spawn ticker thread, running inline");
        let _permit = gate.acquire();
        return pipeline.evaluate(ticker);
    }

    match rx.recv_timeout(timeout) {
        Ok(outcome) => outcome,
        Err(RecvTimeoutError::Timeout) => degraded(ticker, None, PipelineError::Timeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => degraded(
            ticker,
            None,
            PipelineError::WorkerPanicked(format!("pipeline thread for {} exited", ticker.symbol)),
        ),
    }
}
