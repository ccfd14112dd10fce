//! Domain types for the trendfolio engine.

pub mod bar;
pub mod order;
pub mod position;

pub use bar::{Bar, BarSeries};
pub use order::{OrderInstruction, OrderReason, OrderSide};
pub use position::Position;

/// Symbol type alias
pub type Symbol = String;
