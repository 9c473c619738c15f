//! RawHistory: a provider's price table before any interpretation.
//!
//! Column headers come in two shapes. Single-symbol CSV exports are flat
//! (`Date, Open, High, Low, Close, ...`). Chart downloads keyed by symbol are
//! two-level: every value column is addressed by a `(field, symbol)` pair,
//! e.g. `("Close", "KO")`.

use polars::prelude::*;

use super::provider::FetchError;

/// Name given to the date index column of two-level histories.
pub const INDEX_COLUMN: &str = "Date";

/// Separator used when two-level headers are flattened to a single name.
pub const FLATTEN_SEPARATOR: &str = "_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLayout {
    Flat,
    TwoLevel,
}

/// Tabular daily history as received. Column 0 of the frame is always the
/// date index; the remaining columns are values.
#[derive(Debug, Clone)]
pub struct RawHistory {
    symbol: String,
    frame: DataFrame,
    levels: Option<Vec<(String, String)>>,
}

impl RawHistory {
    /// Wrap a flat frame whose first column is the date index.
    pub fn flat(symbol: impl Into<String>, frame: DataFrame) -> Result<Self, FetchError> {
        if frame.width() == 0 {
            return Err(FetchError::Frame("history frame has no columns".into()));
        }
        Ok(Self {
            symbol: symbol.into(),
            frame,
            levels: None,
        })
    }

    /// Build a two-level history from an index and `(field, symbol)`-keyed columns.
    ///
    /// Value columns are stored under their flattened name, so duplicated
    /// header pairs are rejected.
    pub fn two_level(
        symbol: impl Into<String>,
        index: Series,
        columns: Vec<((String, String), Series)>,
    ) -> Result<Self, FetchError> {
        let mut levels = Vec::with_capacity(columns.len());
        let mut frame_columns: Vec<Column> = Vec::with_capacity(columns.len() + 1);
        frame_columns.push(index.with_name(INDEX_COLUMN.into()).into());

        for ((field, sub), series) in columns {
            let flat_name = format!("{field}{FLATTEN_SEPARATOR}{sub}");
            frame_columns.push(series.with_name(flat_name.into()).into());
            levels.push((field, sub));
        }

        let frame = DataFrame::new(frame_columns)?;
        Ok(Self {
            symbol: symbol.into(),
            frame,
            levels: Some(levels),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn layout(&self) -> ColumnLayout {
        if self.levels.is_some() {
            ColumnLayout::TwoLevel
        } else {
            ColumnLayout::Flat
        }
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// The date index column.
    pub fn index(&self) -> &Column {
        &self.frame.get_columns()[0]
    }

    /// All non-index columns, in header order.
    pub fn value_columns(&self) -> &[Column] {
        &self.frame.get_columns()[1..]
    }

    /// `(field, symbol)` header pairs, parallel to `value_columns()`.
    /// `None` for flat histories.
    pub fn column_levels(&self) -> Option<&[(String, String)]> {
        self.levels.as_deref()
    }

    /// Single-level names of the value columns (flattened for two-level).
    pub fn value_names(&self) -> Vec<String> {
        self.value_columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }
}
