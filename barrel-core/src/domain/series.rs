//! PriceSeries: the cleaned close-price history a model is fitted on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One cleaned observation: trading date and closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("series has no observations")]
    Empty,

    #[error("dates must be strictly increasing: {previous} is followed by {next}")]
    NotIncreasing { previous: NaiveDate, next: NaiveDate },

    #[error("non-finite close {value} on {date}")]
    NonFiniteClose { date: NaiveDate, value: f64 },
}

/// Non-empty, ordered close-price series with unique, strictly increasing
/// dates.
///
/// The position of a point in the series is its synthetic sequential index;
/// the model never looks at calendar gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, rejecting empty input, out-of-order dates and
    /// non-finite closes.
    pub fn new(points: Vec<PricePoint>) -> Result<Self, SeriesError> {
        if points.is_empty() {
            return Err(SeriesError::Empty);
        }
        for window in points.windows(2) {
            if window[1].date <= window[0].date {
                return Err(SeriesError::NotIncreasing {
                    previous: window[0].date,
                    next: window[1].date,
                });
            }
        }
        if let Some(bad) = points.iter().find(|p| !p.close.is_finite()) {
            return Err(SeriesError::NonFiniteClose {
                date: bad.date,
                value: bad.close,
            });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Min / mean / max of the closes.
    pub fn stats(&self) -> SeriesStats {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for p in &self.points {
            min = min.min(p.close);
            max = max.max(p.close);
            sum += p.close;
        }
        SeriesStats {
            min,
            mean: sum / self.points.len() as f64,
            max,
        }
    }
}

/// Summary statistics over the historical window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}
