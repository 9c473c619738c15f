//! Screen output records and the per-ticker outcome.

use serde::{Deserialize, Serialize};

use barrel_core::{ForecastResult, SeriesStats};

/// Failure taxonomy reported for degraded rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DataUnavailable,
    SchemaError,
    InsufficientData,
    ModelFitError,
    Timeout,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::DataUnavailable => "DataUnavailable",
            FailureKind::SchemaError => "SchemaError",
            FailureKind::InsufficientData => "InsufficientData",
            FailureKind::ModelFitError => "ModelFitError",
            FailureKind::Timeout => "Timeout",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One output row. Missing values are `None` and serialize as `null`,
/// never as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenRow {
    pub ticker: String,
    pub on_mkt: Option<f64>,
    pub minimo: Option<f64>,
    pub media: Option<f64>,
    pub massimo: Option<f64>,
    pub forecast_min: Option<f64>,
    pub forecast_value: Option<f64>,
    pub forecast_max: Option<f64>,
    pub delta_pct: Option<f64>,
}

impl ScreenRow {
    /// Row with every derived field missing.
    pub fn empty(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            on_mkt: None,
            minimo: None,
            media: None,
            massimo: None,
            forecast_min: None,
            forecast_value: None,
            forecast_max: None,
            delta_pct: None,
        }
    }

    /// Degraded row keeping only the market price captured before failure.
    pub fn price_only(ticker: impl Into<String>, on_mkt: Option<f64>) -> Self {
        Self {
            on_mkt,
            ..Self::empty(ticker)
        }
    }

    pub fn complete(
        ticker: impl Into<String>,
        on_mkt: f64,
        stats: SeriesStats,
        forecast: ForecastResult,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            on_mkt: Some(on_mkt),
            minimo: Some(stats.min),
            media: Some(stats.mean),
            massimo: Some(stats.max),
            forecast_min: Some(forecast.forecast_min),
            forecast_value: Some(forecast.forecast_value),
            forecast_max: Some(forecast.forecast_max),
            delta_pct: delta_pct(forecast.forecast_value, on_mkt),
        }
    }
}

/// Percentage change from the market price to the forecast. `None` when the
/// price is zero or either input is not finite.
pub fn delta_pct(forecast_value: f64, on_mkt: f64) -> Option<f64> {
    if on_mkt == 0.0 || !on_mkt.is_finite() || !forecast_value.is_finite() {
        return None;
    }
    Some((forecast_value - on_mkt) / on_mkt * 100.0)
}

/// What the per-ticker pipeline produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TickerOutcome {
    Complete(ScreenRow),
    Degraded {
        row: ScreenRow,
        kind: FailureKind,
        reason: String,
    },
}

impl TickerOutcome {
    pub fn row(&self) -> &ScreenRow {
        match self {
            TickerOutcome::Complete(row) | TickerOutcome::Degraded { row, .. } => row,
        }
    }

    pub fn into_row(self) -> ScreenRow {
        match self {
            TickerOutcome::Complete(row) | TickerOutcome::Degraded { row, .. } => row,
        }
    }

    pub fn failure(&self) -> Option<(FailureKind, &str)> {
        match self {
            TickerOutcome::Complete(_) => None,
            TickerOutcome::Degraded { kind, reason, .. } => Some((*kind, reason.as_str())),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, TickerOutcome::Degraded { .. })
    }
}
