//! Host runtime contract.
//!
//! The engine makes decisions; the host owns everything else: the clock, bar
//! retrieval, prices, account state and order routing. Calls are synchronous
//! and the host serializes engine steps, one per trading period.
//!
//! All symbols crossing this boundary are in the host's (source) spelling.
//! The engine translates with [`crate::data::SymbolMapper`].

use crate::data::{BarSource, SectorMap};
use crate::domain::{OrderInstruction, Position};
use chrono::NaiveDate;

pub trait Host: BarSource {
    /// Date of the trading period being processed.
    fn current_date(&self) -> NaiveDate;

    /// True when driven by a historical data feed rather than a live broker.
    fn is_backtesting(&self) -> bool {
        false
    }

    fn get_last_price(&self, symbol: &str) -> Option<f64>;

    fn get_portfolio_value(&self) -> f64;

    fn get_open_positions(&self) -> Vec<Position>;

    fn get_position(&self, symbol: &str) -> Option<Position>;

    /// Fire-and-forget. The engine never waits for a fill.
    fn submit_order(&mut self, order: &OrderInstruction);

    /// Universe used when the configuration names none.
    fn default_universe(&self, _limit: usize) -> Vec<String> {
        Vec::new()
    }

    /// Sector labels, read once at engine construction.
    fn sector_map(&self) -> SectorMap {
        SectorMap::default()
    }
}
