//! Market data retrieval, close-column normalization and series cleaning

pub mod circuit_breaker;
pub mod clean;
pub mod csv_source;
pub mod memory;
pub mod normalize;
pub mod provider;
pub mod raw;
pub mod universe;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use clean::{CleanError, SeriesCleaner, MIN_OBSERVATIONS};
pub use csv_source::CsvProvider;
pub use memory::InMemoryProvider;
pub use normalize::{NormalizeStrategy, NormalizedSeries, SchemaError, SeriesNormalizer};
pub use provider::{FetchError, FetchRequest, Interval, MarketDataProvider};
pub use raw::{ColumnLayout, RawHistory};
pub use universe::{Universe, UniverseError};
pub use yahoo::{YahooProvider, YahooSettings};
