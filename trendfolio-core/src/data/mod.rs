//! Bar retrieval, symbol translation, and universe helpers

pub mod cache;
pub mod provider;
pub mod symbols;
pub mod universe;

pub use cache::BarCache;
pub use provider::{BarSource, DataError};
pub use symbols::SymbolMapper;
pub use universe::{normalize_ticker, SectorMap, UNKNOWN_SECTOR};
