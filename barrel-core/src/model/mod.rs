//! Forecasting: fixed-order ARMA fit, point forecasts and confidence
//! intervals.
//!
//! The engine is stateless. Every call fits from scratch on the series it is
//! given, so the same series always yields the same forecast.

pub mod arma;
pub mod linalg;
pub mod optimize;
pub mod transform;

use std::fmt;

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::domain::PriceSeries;
pub use arma::FittedArma;
pub use optimize::NelderMead;

/// Model order `(p, d, q)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArmaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArmaOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Shortest level series a fit is attempted on.
    pub fn min_observations(&self) -> usize {
        self.d + self.p + self.q + 2
    }
}

impl Default for ArmaOrder {
    fn default() -> Self {
        Self::new(2, 0, 2)
    }
}

impl fmt::Display for ArmaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelFitError {
    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("need at least {needed} observations to fit, found {found}")]
    InsufficientObservations { needed: usize, found: usize },

    #[error("optimizer did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error("numerical failure: {0}")]
    NumericalFailure(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub order: ArmaOrder,
    /// Two-sided interval coverage, in (0, 1).
    pub confidence: f64,
    pub max_iterations: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            order: ArmaOrder::default(),
            confidence: 0.95,
            max_iterations: NelderMead::default().max_iterations,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<(), ModelFitError> {
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(ModelFitError::InvalidConfig(format!(
                "confidence must be in (0, 1), got {}",
                self.confidence
            )));
        }
        if self.max_iterations == 0 {
            return Err(ModelFitError::InvalidConfig(
                "max_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Final-step forecast with its interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub forecast_min: f64,
    pub forecast_value: f64,
    pub forecast_max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastStep {
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Every forecast step plus the final one surfaced downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub steps: Vec<ForecastStep>,
    pub result: ForecastResult,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct ForecastEngine {
    config: ForecastConfig,
    optimizer: NelderMead,
    z: f64,
}

impl ForecastEngine {
    pub fn new(config: ForecastConfig) -> Result<Self, ModelFitError> {
        config.validate()?;
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ModelFitError::InvalidConfig(e.to_string()))?;
        let z = normal.inverse_cdf(1.0 - (1.0 - config.confidence) / 2.0);
        let optimizer = NelderMead {
            max_iterations: config.max_iterations,
            ..NelderMead::default()
        };
        Ok(Self {
            config,
            optimizer,
            z,
        })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Standard normal quantile used for the interval half-width.
    pub fn z(&self) -> f64 {
        self.z
    }

    /// Fit the configured order to `series` and forecast `horizon` steps.
    pub fn forecast(&self, series: &PriceSeries, horizon: usize) -> Result<Forecast, ModelFitError> {
        if horizon == 0 {
            return Err(ModelFitError::InvalidConfig(
                "forecast horizon must be at least 1".into(),
            ));
        }

        let closes = series.closes();
        let fitted = arma::fit(&closes, self.config.order, &self.optimizer)?;
        let values = fitted.forecast(horizon);
        let variances = fitted.forecast_variance(horizon);

        let steps: Vec<ForecastStep> = values
            .iter()
            .zip(&variances)
            .map(|(&value, &var)| {
                let half = self.z * var.max(0.0).sqrt();
                ForecastStep {
                    value,
                    lower: value - half,
                    upper: value + half,
                }
            })
            .collect();

        if steps
            .iter()
            .any(|s| !(s.value.is_finite() && s.lower.is_finite() && s.upper.is_finite()))
        {
            return Err(ModelFitError::NumericalFailure(
                "forecast is not finite".into(),
            ));
        }

        let last = steps[steps.len() - 1];
        let result = ForecastResult {
            forecast_min: last.lower,
            forecast_value: last.value,
            forecast_max: last.upper,
        };

        tracing::debug!(
            observations = closes.len(),
            horizon,
            forecast_value = result.forecast_value,
            forecast_min = result.forecast_min,
            forecast_max = result.forecast_max,
            "forecast computed"
        );

        Ok(Forecast {
            steps,
            result,
            summary: fitted.summary(),
        })
    }
}
