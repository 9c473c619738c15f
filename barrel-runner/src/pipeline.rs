//! Per-ticker pipeline: fetch → normalize → clean → forecast.
//!
//! `evaluate` never fails. Every stage error is turned into a degraded row
//! that keeps whatever market price was captured before the failure.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;

use barrel_core::data::{SeriesCleaner, SeriesNormalizer};
use barrel_core::{
    CleanError, FetchError, FetchRequest, ForecastEngine, MarketDataProvider, ModelFitError,
    SchemaError, Ticker,
};

use crate::row::{FailureKind, ScreenRow, TickerOutcome};

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("history has no valid close price")]
    NoClosePrice,

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("{0}")]
    Clean(#[from] CleanError),

    #[error("model fit failed: {0}")]
    Model(#[from] ModelFitError),

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("worker panicked: {0}")]
    WorkerPanicked(String),
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Fetch(_) | PipelineError::NoClosePrice => FailureKind::DataUnavailable,
            PipelineError::Schema(_) => FailureKind::SchemaError,
            PipelineError::Clean(CleanError::InsufficientData { .. }) => {
                FailureKind::InsufficientData
            }
            PipelineError::Clean(_) => FailureKind::SchemaError,
            PipelineError::Model(_) | PipelineError::WorkerPanicked(_) => {
                FailureKind::ModelFitError
            }
            PipelineError::Timeout(_) => FailureKind::Timeout,
        }
    }
}

/// Everything one ticker needs. Cheap to clone; the provider is shared.
#[derive(Clone)]
pub struct TickerPipeline {
    provider: Arc<dyn MarketDataProvider>,
    normalizer: SeriesNormalizer,
    cleaner: SeriesCleaner,
    engine: ForecastEngine,
    horizon: usize,
    lookback_years: u32,
    as_of: NaiveDate,
}

impl TickerPipeline {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        engine: ForecastEngine,
        window: usize,
        horizon: usize,
        lookback_years: u32,
        as_of: NaiveDate,
    ) -> Self {
        Self {
            provider,
            normalizer: SeriesNormalizer,
            cleaner: SeriesCleaner::new(window),
            engine,
            horizon,
            lookback_years,
            as_of,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run the pipeline for one ticker and classify the result.
    #[tracing::instrument(skip(self, ticker), fields(symbol = %ticker.symbol))]
    pub fn evaluate(&self, ticker: &Ticker) -> TickerOutcome {
        let mut on_mkt = None;
        match self.run(ticker, &mut on_mkt) {
            Ok(row) => {
                tracing::debug!(
                    forecast_value = ?row.forecast_value,
                    delta_pct = ?row.delta_pct,
                    "ticker complete"
                );
                TickerOutcome::Complete(row)
            }
            Err(err) => degraded(ticker, on_mkt, err),
        }
    }

    fn run(&self, ticker: &Ticker, on_mkt: &mut Option<f64>) -> Result<ScreenRow, PipelineError> {
        let request = FetchRequest::lookback(&ticker.symbol, self.lookback_years, self.as_of);
        let raw = self.provider.fetch(&request)?;
        tracing::debug!(rows = raw.height(), layout = ?raw.layout(), "fetched history");

        let normalized = self.normalizer.normalize(&raw)?;
        let price = normalized.latest_close().ok_or(PipelineError::NoClosePrice)?;
        *on_mkt = Some(price);

        let series = self.cleaner.clean(&normalized)?;
        let stats = series.stats();

        let forecast = self.engine.forecast(&series, self.horizon)?;
        tracing::debug!(model = %forecast.summary, "model fitted");

        Ok(ScreenRow::complete(
            ticker.symbol.clone(),
            price,
            stats,
            forecast.result,
        ))
    }
}

/// Build the degraded outcome for a failed ticker.
pub fn degraded(ticker: &Ticker, on_mkt: Option<f64>, err: PipelineError) -> TickerOutcome {
    let kind = err.kind();
    let reason = err.to_string();
    tracing::warn!(symbol = %ticker.symbol, kind = %kind, %reason, "ticker degraded");
    TickerOutcome::Degraded {
        row: ScreenRow::price_only(ticker.symbol.clone(), on_mkt),
        kind,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barrel_core::data::InMemoryProvider;
    use barrel_core::ForecastConfig;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn pipeline(provider: InMemoryProvider) -> TickerPipeline {
        TickerPipeline::new(
            Arc::new(provider),
            ForecastEngine::new(ForecastConfig::default()).unwrap(),
            120,
            30,
            5,
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
    }

    #[test]
    fn fetch_failure_has_no_price() {
        let p = pipeline(
            InMemoryProvider::new()
                .with_failure("BBB", FetchError::NetworkUnreachable("down".into())),
        );
        let outcome = p.evaluate(&Ticker::new("B", "BBB"));
        assert_eq!(outcome.row(), &ScreenRow::empty("BBB"));
        assert_eq!(outcome.failure().unwrap().0, FailureKind::DataUnavailable);
    }

    #[test]
    fn short_history_keeps_price() {
        let closes: Vec<f64> = (0..9).map(|i| 10.0 + i as f64).collect();
        let p = pipeline(InMemoryProvider::new().with_closes("S", start(), &closes).unwrap());
        let outcome = p.evaluate(&Ticker::new("Short", "S"));
        assert_eq!(outcome.failure().unwrap().0, FailureKind::InsufficientData);
        assert_eq!(outcome.row().on_mkt, Some(18.0));
        assert_eq!(outcome.row().minimo, None);
        assert_eq!(outcome.row().forecast_value, None);
    }

    #[test]
    fn complete_row_for_constant_series() {
        let p = pipeline(
            InMemoryProvider::new()
                .with_closes("AAA", start(), &[100.0; 150])
                .unwrap(),
        );
        let outcome = p.evaluate(&Ticker::new("A", "AAA"));
        let row = outcome.row();
        assert!(!outcome.is_degraded());
        assert_eq!(row.on_mkt, Some(100.0));
        assert_eq!(row.minimo, Some(100.0));
        assert_eq!(row.media, Some(100.0));
        assert_eq!(row.massimo, Some(100.0));
        assert_eq!(row.forecast_value, Some(100.0));
        assert_eq!(row.delta_pct, Some(0.0));
    }

    #[test]
    fn error_kinds_cover_taxonomy() {
        assert_eq!(
            PipelineError::Schema(SchemaError::CloseColumnNotFound).kind(),
            FailureKind::SchemaError
        );
        assert_eq!(
            PipelineError::Model(ModelFitError::NotConverged { iterations: 5 }).kind(),
            FailureKind::ModelFitError
        );
        assert_eq!(
            PipelineError::Timeout(Duration::from_secs(1)).kind(),
            FailureKind::Timeout
        );
        assert_eq!(PipelineError::NoClosePrice.kind(), FailureKind::DataUnavailable);
    }
}
