//! Series cleaning: window, coerce, validate.
//!
//! Order matters and is fixed:
//! 1. drop rows whose close is missing (null or NaN),
//! 2. keep the last `window` remaining rows,
//! 3. coerce dates and closes to `NaiveDate` / `f64`, unparseable values
//!    becoming missing, and drop those rows again,
//! 4. require at least `MIN_OBSERVATIONS` rows.
//!
//! Because coercion happens after windowing, a window containing garbage
//! values ends up shorter than `window`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use thiserror::Error;

use super::normalize::{NormalizedSeries, CLOSE_COLUMN, DATE_COLUMN};
use crate::domain::{PricePoint, PriceSeries, SeriesError};

/// Fewest observations an ARMA(2,0,2) fit is attempted on.
pub const MIN_OBSERVATIONS: usize = 10;

#[derive(Debug, Clone, Error)]
pub enum CleanError {
    #[error("insufficient data: {found} valid rows, need at least {required}")]
    InsufficientData { found: usize, required: usize },

    #[error("invalid series: {0}")]
    Series(#[from] SeriesError),

    #[error("failed to clean series frame: {0}")]
    Frame(String),
}

impl From<PolarsError> for CleanError {
    fn from(e: PolarsError) -> Self {
        CleanError::Frame(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesCleaner {
    window: usize,
}

impl SeriesCleaner {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn clean(&self, series: &NormalizedSeries) -> Result<PriceSeries, CleanError> {
        let frame = series.frame();
        let close_dtype = frame.column(CLOSE_COLUMN)?.dtype().clone();

        let mut present = col(CLOSE_COLUMN).is_not_null();
        if close_dtype.is_float() {
            present = present.and(col(CLOSE_COLUMN).is_not_nan());
        }
        let tail = IdxSize::try_from(self.window).unwrap_or(IdxSize::MAX);

        let windowed = frame
            .clone()
            .lazy()
            .filter(present)
            .tail(tail)
            .collect()?;

        let dates = coerce_dates(windowed.column(DATE_COLUMN)?)?;
        let closes = coerce_closes(windowed.column(CLOSE_COLUMN)?)?;

        let mut points: Vec<PricePoint> = dates
            .into_iter()
            .zip(closes)
            .filter_map(|(date, close)| {
                Some(PricePoint {
                    date: date?,
                    close: close.filter(|c| c.is_finite())?,
                })
            })
            .collect();

        // Providers deliver ascending dates; repeated dates keep the later row.
        points.sort_by_key(|p| p.date);
        points.dedup_by(|later, kept| {
            if later.date == kept.date {
                *kept = *later;
                true
            } else {
                false
            }
        });

        tracing::debug!(
            raw_rows = frame.height(),
            windowed_rows = windowed.height(),
            valid_rows = points.len(),
            window = self.window,
            "cleaned series"
        );

        if points.len() < MIN_OBSERVATIONS {
            return Err(CleanError::InsufficientData {
                found: points.len(),
                required: MIN_OBSERVATIONS,
            });
        }

        Ok(PriceSeries::new(points)?)
    }
}

/// Read a date column of any supported dtype; unreadable values become `None`.
pub(crate) fn coerce_dates(column: &Column) -> PolarsResult<Vec<Option<NaiveDate>>> {
    let series = column.as_materialized_series();
    let dates = match series.dtype() {
        DataType::Date => series.date()?.as_date_iter().collect(),
        DataType::Datetime(_, _) => {
            let as_date = series.cast(&DataType::Date)?;
            as_date.date()?.as_date_iter().collect()
        }
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_date))
            .collect(),
        _ => vec![None; series.len()],
    };
    Ok(dates)
}

fn coerce_closes(column: &Column) -> Result<Vec<Option<f64>>, CleanError> {
    let as_float = column.as_materialized_series().cast(&DataType::Float64)?;
    Ok(as_float.f64()?.into_iter().collect())
}

/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY-MM-DD HH:MM:SS` and RFC 3339.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}
