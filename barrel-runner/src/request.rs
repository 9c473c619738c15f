//! Screening trigger: historical window, forecast horizon, trigger count.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("historical window must be one of 120, 360, 720 (got {0})")]
    UnsupportedWindow(usize),

    #[error("forecast horizon must be one of 30, 60, 120 (got {0})")]
    UnsupportedHorizon(usize),
}

/// Most recent trading days used for fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum HistoricalWindow {
    Days120,
    Days360,
    Days720,
}

impl HistoricalWindow {
    pub const ALL: [HistoricalWindow; 3] = [Self::Days120, Self::Days360, Self::Days720];

    pub fn days(self) -> usize {
        match self {
            Self::Days120 => 120,
            Self::Days360 => 360,
            Self::Days720 => 720,
        }
    }
}

impl Default for HistoricalWindow {
    fn default() -> Self {
        Self::Days120
    }
}

impl TryFrom<usize> for HistoricalWindow {
    type Error = RequestError;

    fn try_from(days: usize) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|w| w.days() == days)
            .ok_or(RequestError::UnsupportedWindow(days))
    }
}

impl From<HistoricalWindow> for usize {
    fn from(w: HistoricalWindow) -> usize {
        w.days()
    }
}

impl fmt::Display for HistoricalWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.days())
    }
}

/// Future trading days forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum ForecastHorizon {
    Days30,
    Days60,
    Days120,
}

impl ForecastHorizon {
    pub const ALL: [ForecastHorizon; 3] = [Self::Days30, Self::Days60, Self::Days120];

    pub fn days(self) -> usize {
        match self {
            Self::Days30 => 30,
            Self::Days60 => 60,
            Self::Days120 => 120,
        }
    }
}

impl Default for ForecastHorizon {
    fn default() -> Self {
        Self::Days30
    }
}

impl TryFrom<usize> for ForecastHorizon {
    type Error = RequestError;

    fn try_from(days: usize) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|h| h.days() == days)
            .ok_or(RequestError::UnsupportedHorizon(days))
    }
}

impl From<ForecastHorizon> for usize {
    fn from(h: ForecastHorizon) -> usize {
        h.days()
    }
}

impl fmt::Display for ForecastHorizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.days())
    }
}

/// One refresh request. A trigger count of zero means the refresh never
/// fired, and the screen returns no rows without touching any provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRequest {
    pub window: HistoricalWindow,
    pub horizon: ForecastHorizon,
    pub trigger_count: u32,
}

impl ScreenRequest {
    pub fn new(window: HistoricalWindow, horizon: ForecastHorizon, trigger_count: u32) -> Self {
        Self {
            window,
            horizon,
            trigger_count,
        }
    }

    pub fn fired(&self) -> bool {
        self.trigger_count > 0
    }
}
