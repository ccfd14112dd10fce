//! Position sizers: turn a selection and an exposure target into share counts.
//!
//! Sizers are portfolio-aware (they use portfolio value and exposure) but
//! selection-agnostic: they never add or drop names for ranking reasons.

pub mod risk_budget;

pub use risk_budget::{inverse_vol_weights, RiskSizer};

use serde::{Deserialize, Serialize};

/// Market readings for one selected symbol. Missing readings are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SizingInput {
    pub symbol: String,
    pub price: Option<f64>,
    pub atr: Option<f64>,
    pub vol: Option<f64>,
}

/// A sized position target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingTarget {
    pub symbol: String,
    pub shares: i64,
    pub price: f64,
    /// Inverse-volatility weight within the sized set.
    pub weight: f64,
    pub stop_distance: f64,
    pub risk_dollars: f64,
}

impl SizingTarget {
    pub fn notional(&self) -> f64 {
        self.shares as f64 * self.price
    }
}

/// Position sizing logic
///
/// # Responsibilities
/// - Convert portfolio value + exposure + per-symbol readings → target shares
/// - Apply risk budgets and drop allocations too small to trade
///
/// # Non-Responsibilities
/// - Sizers do NOT choose which symbols to hold (that's the selector's job)
/// - Sizers do NOT emit orders (the engine diffs targets against holdings)
pub trait Sizer: Send + Sync {
    /// Targets in input order. Symbols that cannot be sized are omitted;
    /// an empty result means hold cash.
    fn size(&self, inputs: &[SizingInput], portfolio_value: f64, exposure: f64)
        -> Vec<SizingTarget>;

    /// Sizer name for logging
    fn name(&self) -> &str;
}
