//! BARREL Runner: screen orchestration.
//!
//! This crate builds on `barrel-core` to provide:
//! - TOML screener configuration with validated defaults
//! - Trigger request types (historical window, forecast horizon)
//! - The per-ticker pipeline with failure classification
//! - A bounded worker pool with per-ticker timeouts and ordered collection
//! - CSV, JSON and plain-text table export

pub mod config;
pub mod export;
pub mod pipeline;
pub mod request;
pub mod row;
pub mod screen;

pub use config::{ConfigError, ScreenerConfig};
pub use export::{export_csv, export_json, format_summary, format_table, import_json};
pub use pipeline::{PipelineError, TickerPipeline};
pub use request::{ForecastHorizon, HistoricalWindow, RequestError, ScreenRequest};
pub use row::{delta_pct, FailureKind, ScreenRow, TickerOutcome};
pub use screen::{ScreenOptions, ScreenReport, Screener};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn pipeline_crosses_threads() {
        assert_send::<TickerPipeline>();
        assert_sync::<TickerPipeline>();
        assert_send::<TickerOutcome>();
        assert_send::<PipelineError>();
    }

    #[test]
    fn screener_is_shareable() {
        assert_send::<Screener>();
        assert_sync::<Screener>();
        assert_send::<ScreenReport>();
        assert_sync::<ScreenReport>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<ScreenerConfig>();
        assert_sync::<ScreenerConfig>();
        assert_send::<ScreenRequest>();
        assert_sync::<ScreenRequest>();
    }
}
