//! Strategy engine — one synchronous step per trading period.
//!
//! The engine owns its [`EngineState`] exclusively and talks to the outside
//! world only through a [`crate::host::Host`]. Each step:
//!
//! 1. Guards: trailing stops, then the drawdown breaker (every step)
//! 2. Gates: cooldown, rebalance cadence
//! 3. Decisions: regime exposure, ranking, sector-capped selection
//! 4. Orders: deselection exits, risk-budgeted sizing, share deltas

pub mod rebalance;
pub mod state;
pub mod step;

pub use rebalance::{delta_orders, deselection_exits};
pub use state::{EngineConfig, EngineState, RebalanceOutcome, StepReport};
pub use step::Engine;
