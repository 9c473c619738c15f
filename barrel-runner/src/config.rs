//! Screener configuration loaded from TOML.
//!
//! Every section is optional. A missing `[[tickers]]` array means the
//! default BARREL universe.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use barrel_core::data::{UniverseError, YahooSettings};
use barrel_core::model::{ArmaOrder, ForecastConfig};
use barrel_core::{Ticker, Universe};

use crate::request::{ForecastHorizon, HistoricalWindow, RequestError, ScreenRequest};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("pool.workers must be at least 1")]
    NoWorkers,

    #[error("pool.ticker_timeout_secs must be at least 1")]
    ZeroTimeout,

    #[error("model.confidence must be in (0, 1), got {0}")]
    InvalidConfidence(f64),

    #[error("fetch.lookback_years must be at least 1")]
    ZeroLookback,

    #[error("invalid universe: {0}")]
    Universe(#[from] UniverseError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenSection {
    pub historical_window: usize,
    pub forecast_horizon: usize,
}

impl Default for ScreenSection {
    fn default() -> Self {
        Self {
            historical_window: HistoricalWindow::default().days(),
            forecast_horizon: ForecastHorizon::default().days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    pub lookback_years: u32,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
}

impl Default for FetchSection {
    fn default() -> Self {
        let yahoo = YahooSettings::default();
        Self {
            lookback_years: 5,
            max_retries: yahoo.max_retries,
            request_timeout_secs: yahoo.request_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSection {
    pub workers: usize,
    pub ticker_timeout_secs: u64,
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            workers: 4,
            ticker_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub confidence: f64,
}

impl Default for ModelSection {
    fn default() -> Self {
        let config = ForecastConfig::default();
        Self {
            p: config.order.p,
            d: config.order.d,
            q: config.order.q,
            confidence: config.confidence,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    pub screen: ScreenSection,
    pub fetch: FetchSection,
    pub pool: PoolSection,
    pub model: ModelSection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickers: Option<Vec<Ticker>>,
}

impl ScreenerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        HistoricalWindow::try_from(self.screen.historical_window)?;
        ForecastHorizon::try_from(self.screen.forecast_horizon)?;
        if self.pool.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.pool.ticker_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.fetch.lookback_years == 0 {
            return Err(ConfigError::ZeroLookback);
        }
        let confidence = self.model.confidence;
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(ConfigError::InvalidConfidence(confidence));
        }
        self.universe().validate()?;
        Ok(())
    }

    /// Configured tickers, or the default BARREL universe.
    pub fn universe(&self) -> Universe {
        match &self.tickers {
            Some(tickers) => Universe::new(tickers.clone()),
            None => Universe::default_barrel(),
        }
    }

    pub fn screen_request(&self, trigger_count: u32) -> Result<ScreenRequest, ConfigError> {
        Ok(ScreenRequest::new(
            HistoricalWindow::try_from(self.screen.historical_window)?,
            ForecastHorizon::try_from(self.screen.forecast_horizon)?,
            trigger_count,
        ))
    }

    pub fn forecast_config(&self) -> ForecastConfig {
        ForecastConfig {
            order: ArmaOrder::new(self.model.p, self.model.d, self.model.q),
            confidence: self.model.confidence,
            ..ForecastConfig::default()
        }
    }

    pub fn yahoo_settings(&self) -> YahooSettings {
        YahooSettings {
            max_retries: self.fetch.max_retries,
            request_timeout: Duration::from_secs(self.fetch.request_timeout_secs),
            ..YahooSettings::default()
        }
    }

    pub fn ticker_timeout(&self) -> Duration {
        Duration::from_secs(self.pool.ticker_timeout_secs)
    }
}
