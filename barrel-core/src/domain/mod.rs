//! Domain types for the screener

pub mod series;
pub mod ticker;

pub use series::{PricePoint, PriceSeries, SeriesError, SeriesStats};
pub use ticker::Ticker;
