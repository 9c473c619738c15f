//! Ticker universe: ordered display-name → symbol table.
//!
//! Stored as TOML with one `[[tickers]]` entry per ticker. Order is
//! significant; the screener emits rows in exactly this order.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Ticker;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read universe file {path}: {message}")]
    Read { path: String, message: String },

    #[error("parse universe TOML: {0}")]
    Parse(String),

    #[error("serialize universe: {0}")]
    Serialize(String),

    #[error("ticker {name:?} has an empty symbol")]
    EmptySymbol { name: String },

    #[error("symbol {symbol} appears more than once")]
    DuplicateSymbol { symbol: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Universe {
    pub tickers: Vec<Ticker>,
}

/// The BARREL #2 screening universe.
const BARREL: [(&str, &str); 29] = [
    ("ALPHABET INC", "GOOGL"),
    ("AMAZON", "AMZN"),
    ("ATOSSA THERAPEUTICS INC", "ATOS"),
    ("ALIBABA GROUP HOLDING", "BABA"),
    ("AMERICA AIRLINES", "AAL"),
    ("BANK OF AMERICA CORP", "BAC"),
    ("BEYOND MEAT", "BYND"),
    ("CERENCE", "CRNC"),
    ("COMCAST CORPORATION", "CMCSA"),
    ("COTERRA ENERGY INC", "CTRA"),
    ("CRONOS GROUP INC", "CRON"),
    ("DELTA AIRLINES", "DAL"),
    ("DEVON ENERGY CORPORATION", "DVN"),
    ("FISERV", "FISV"),
    ("FORD MOTOR CO", "F"),
    ("HASBRO", "HAS"),
    ("HP INC", "HPQ"),
    ("HUNTINGTON BANCSHARES INC", "HBAN"),
    ("INCANNEX HEALTHCARE INC", "IXHL"),
    ("INTEL", "INTC"),
    ("LYFT INC", "LYFT"),
    ("PAYPAL HOLDINGS INC", "PYPL"),
    ("PINTEREST INC", "PINS"),
    ("RIVIAN AUTOMOTIVE INC", "RIVN"),
    ("SNAP INC", "SNAP"),
    ("THE COCA-COLA COMPANY", "KO"),
    ("TESLA", "TSLA"),
    ("TILRAY BRANDS INC", "TLRY"),
    ("UNIQURE NV", "QURE"),
];

impl Universe {
    pub fn new(tickers: Vec<Ticker>) -> Self {
        Self { tickers }
    }

    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        let content = std::fs::read_to_string(path).map_err(|e| UniverseError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, UniverseError> {
        let universe: Self =
            toml::from_str(content).map_err(|e| UniverseError::Parse(e.to_string()))?;
        universe.validate()?;
        Ok(universe)
    }

    pub fn to_toml(&self) -> Result<String, UniverseError> {
        toml::to_string_pretty(self).map_err(|e| UniverseError::Serialize(e.to_string()))
    }

    pub fn default_barrel() -> Self {
        Self {
            tickers: BARREL
                .iter()
                .map(|(name, symbol)| Ticker::new(*name, *symbol))
                .collect(),
        }
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.tickers.iter().map(|t| t.symbol.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// Symbols must be non-empty and unique. An empty universe is valid.
    pub fn validate(&self) -> Result<(), UniverseError> {
        let mut seen = HashSet::with_capacity(self.tickers.len());
        for ticker in &self.tickers {
            if ticker.symbol.trim().is_empty() {
                return Err(UniverseError::EmptySymbol {
                    name: ticker.name.clone(),
                });
            }
            if !seen.insert(ticker.symbol.as_str()) {
                return Err(UniverseError::DuplicateSymbol {
                    symbol: ticker.symbol.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::default_barrel()
    }
}
