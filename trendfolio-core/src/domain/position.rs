use serde::{Deserialize, Serialize};

/// Open position as reported by the host: positive quantity is long,
/// negative is short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
}

impl Position {
    pub fn new(symbol: impl Into<String>, quantity: f64) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
        }
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0.0
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0.0
    }

    /// Whole shares held, truncated toward zero.
    pub fn whole_shares(&self) -> i64 {
        self.quantity.trunc() as i64
    }

    pub fn market_value(&self, current_price: f64) -> f64 {
        self.quantity * current_price
    }

    /// The order that flattens this position, if any.
    pub fn closing_side(&self) -> Option<super::OrderSide> {
        if self.is_long() {
            Some(super::OrderSide::Sell)
        } else if self.is_short() {
            Some(super::OrderSide::Buy)
        } else {
            None
        }
    }
}
