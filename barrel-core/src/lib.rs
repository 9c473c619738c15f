//! BARREL Core: the per-ticker forecasting pipeline.
//!
//! This crate contains everything a single ticker goes through:
//! - Domain types (tickers, cleaned price series)
//! - Market data providers (Yahoo Finance, CSV directory, in-memory)
//! - Close-column normalization over flat and two-level column layouts
//! - Series cleaning and minimum-length validation
//! - ARMA model fitting with point forecasts and confidence intervals

pub mod data;
pub mod domain;
pub mod model;

pub use data::{
    CleanError, FetchError, FetchRequest, MarketDataProvider, NormalizedSeries, RawHistory,
    SchemaError, SeriesCleaner, SeriesNormalizer, Universe,
};
pub use domain::{PricePoint, PriceSeries, SeriesStats, Ticker};
pub use model::{ArmaOrder, Forecast, ForecastConfig, ForecastEngine, ForecastResult, ModelFitError};
