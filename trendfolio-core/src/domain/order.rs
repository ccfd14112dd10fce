//! Order instructions emitted to the host.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Why the engine emitted an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderReason {
    /// Price fell through the ATR trailing stop.
    TrailingStop,
    /// Portfolio drawdown breaker liquidation.
    DrawdownBreaker,
    /// Held symbol dropped out of the selection.
    Deselected,
    /// Move toward the sized target quantity.
    Rebalance,
}

/// Fire-and-forget market order instruction. Quantity is always positive;
/// direction is carried by `side`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderInstruction {
    pub symbol: String,
    pub quantity: f64,
    pub side: OrderSide,
    pub reason: OrderReason,
}

impl OrderInstruction {
    pub fn new(
        symbol: impl Into<String>,
        quantity: f64,
        side: OrderSide,
        reason: OrderReason,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: quantity.abs(),
            side,
            reason,
        }
    }

    /// Signed share change: positive for buys.
    pub fn signed_quantity(&self) -> f64 {
        match self.side {
            OrderSide::Buy => self.quantity,
            OrderSide::Sell => -self.quantity,
        }
    }
}

impl fmt::Display for OrderInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:.0}", self.side, self.symbol, self.quantity)
    }
}
