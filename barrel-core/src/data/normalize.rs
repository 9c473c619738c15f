//! Close-column normalization.
//!
//! Providers disagree on header shape: a chart download keyed by symbol is
//! two-level, a CSV export is flat, and either may name the close column
//! differently. The normalizer tries a fixed list of strategies in order and
//! the first one that matches picks the close column. Exact matches are tried
//! before fuzzy ones, and two-level headers never fall through to the flat
//! strategies.

use polars::prelude::*;
use thiserror::Error;

use super::raw::{ColumnLayout, RawHistory};

pub const DATE_COLUMN: &str = "date";
pub const CLOSE_COLUMN: &str = "close";

#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    #[error("close column not found")]
    CloseColumnNotFound,

    #[error("failed to assemble close series: {0}")]
    Frame(String),
}

impl From<PolarsError> for SchemaError {
    fn from(e: PolarsError) -> Self {
        SchemaError::Frame(e.to_string())
    }
}

/// Close-column extraction strategies, in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeStrategy {
    /// Two-level header with a top-level field named exactly `Close`;
    /// the first such column wins.
    TwoLevelExactClose,
    /// Two-level header, flattened with `_`; first name containing "close"
    /// (case-insensitive).
    TwoLevelFlattenedClose,
    /// Flat header with a column named exactly `Close`.
    FlatExactClose,
    /// Flat header with exactly one value column, whatever its name.
    FlatSingleColumn,
    /// Flat header; first column name containing "close" (case-insensitive).
    FlatContainsClose,
}

impl NormalizeStrategy {
    pub const ORDER: [NormalizeStrategy; 5] = [
        NormalizeStrategy::TwoLevelExactClose,
        NormalizeStrategy::TwoLevelFlattenedClose,
        NormalizeStrategy::FlatExactClose,
        NormalizeStrategy::FlatSingleColumn,
        NormalizeStrategy::FlatContainsClose,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NormalizeStrategy::TwoLevelExactClose => "two_level_exact_close",
            NormalizeStrategy::TwoLevelFlattenedClose => "two_level_flattened_close",
            NormalizeStrategy::FlatExactClose => "flat_exact_close",
            NormalizeStrategy::FlatSingleColumn => "flat_single_column",
            NormalizeStrategy::FlatContainsClose => "flat_contains_close",
        }
    }

    /// Position (within `value_columns()`) of the column this strategy picks.
    pub fn select(&self, raw: &RawHistory) -> Option<usize> {
        match (self, raw.layout()) {
            (NormalizeStrategy::TwoLevelExactClose, ColumnLayout::TwoLevel) => raw
                .column_levels()?
                .iter()
                .position(|(field, _)| field == "Close"),
            (NormalizeStrategy::TwoLevelFlattenedClose, ColumnLayout::TwoLevel) => {
                first_containing_close(&raw.value_names())
            }
            (NormalizeStrategy::FlatExactClose, ColumnLayout::Flat) => {
                raw.value_names().iter().position(|name| name == "Close")
            }
            (NormalizeStrategy::FlatSingleColumn, ColumnLayout::Flat) => {
                (raw.value_columns().len() == 1).then_some(0)
            }
            (NormalizeStrategy::FlatContainsClose, ColumnLayout::Flat) => {
                first_containing_close(&raw.value_names())
            }
            _ => None,
        }
    }
}

fn first_containing_close(names: &[String]) -> Option<usize> {
    names
        .iter()
        .position(|name| name.to_lowercase().contains("close"))
}

/// `(date, close)` frame extracted from a raw history. Values keep the types
/// they arrived with; coercion is the cleaner's job.
#[derive(Debug, Clone)]
pub struct NormalizedSeries {
    frame: DataFrame,
    strategy: NormalizeStrategy,
}

impl NormalizedSeries {
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn strategy(&self) -> NormalizeStrategy {
        self.strategy
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Last finite close in the full history, before any windowing.
    pub fn latest_close(&self) -> Option<f64> {
        let series = self
            .frame
            .column(CLOSE_COLUMN)
            .ok()?
            .as_materialized_series()
            .cast(&DataType::Float64)
            .ok()?;
        let closes = series.f64().ok()?;
        let last = closes
            .into_iter()
            .rev()
            .flatten()
            .find(|v| v.is_finite());
        last
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesNormalizer;

impl SeriesNormalizer {
    /// Pick the close column and pair it with the date index.
    pub fn normalize(&self, raw: &RawHistory) -> Result<NormalizedSeries, SchemaError> {
        let (strategy, position) = NormalizeStrategy::ORDER
            .iter()
            .find_map(|s| s.select(raw).map(|pos| (*s, pos)))
            .ok_or(SchemaError::CloseColumnNotFound)?;

        let close = &raw.value_columns()[position];
        tracing::debug!(
            symbol = raw.symbol(),
            strategy = strategy.name(),
            column = %close.name(),
            "selected close column"
        );

        let frame = DataFrame::new(vec![
            raw.index()
                .as_materialized_series()
                .clone()
                .with_name(DATE_COLUMN.into())
                .into(),
            close
                .as_materialized_series()
                .clone()
                .with_name(CLOSE_COLUMN.into())
                .into(),
        ])?;

        Ok(NormalizedSeries { frame, strategy })
    }
}
