//! Bar source trait and structured data error types.
//!
//! The `BarSource` trait abstracts over wherever daily bars come from (a live
//! broker API, a backtest data feed, CSV files) so the engine can be driven by
//! any host and mocked in tests.

use crate::domain::Bar;
use thiserror::Error;

/// Structured error types for bar retrieval.
///
/// None of these abort a trading step: the cache logs them and the affected
/// computation degrades to "unavailable".
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no bars returned for {symbol}")]
    Empty { symbol: String },

    #[error("request timed out for {symbol}")]
    Timeout { symbol: String },

    #[error("data source failure: {0}")]
    Source(String),
}

/// Anything that can hand out the most recent `length` daily bars of a symbol.
pub trait BarSource {
    /// Fetch up to `length` of the most recent daily bars, ascending by date.
    ///
    /// `symbol` is already in the source's spelling.
    fn get_bars(&self, symbol: &str, length: usize) -> Result<Vec<Bar>, DataError>;
}
