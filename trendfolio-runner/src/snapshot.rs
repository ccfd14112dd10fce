//! Point-in-time host over a [`BarStore`] and a portfolio snapshot.
//!
//! The host answers every engine query as of one date: bars dated on or
//! before it (the as-of bar is served and trimmed by the engine's
//! no-lookahead rule), last prices from the latest such bar, and a
//! portfolio value of cash plus marked positions. Orders are recorded, not
//! filled.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use trendfolio_core::data::{BarSource, DataError, SectorMap, SymbolMapper};
use trendfolio_core::domain::{Bar, OrderInstruction, Position};
use trendfolio_core::Host;

use crate::store::BarStore;

#[derive(Debug)]
pub struct SnapshotHost<'a> {
    store: &'a BarStore,
    as_of: NaiveDate,
    symbols: SymbolMapper,
    cash: f64,
    /// Keyed by the spelling the positions file used.
    positions: BTreeMap<String, f64>,
    orders: Vec<OrderInstruction>,
}

impl<'a> SnapshotHost<'a> {
    pub fn new(
        store: &'a BarStore,
        as_of: NaiveDate,
        backtesting: bool,
        cash: f64,
        positions: &[Position],
    ) -> Self {
        let mut held = BTreeMap::new();
        for p in positions {
            *held.entry(p.symbol.trim().to_ascii_uppercase()).or_insert(0.0) += p.quantity;
        }
        held.retain(|_, q| *q != 0.0);
        Self {
            store,
            as_of,
            symbols: SymbolMapper::new(backtesting),
            cash,
            positions: held,
            orders: Vec::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Orders submitted so far, in submission order.
    pub fn orders(&self) -> &[OrderInstruction] {
        &self.orders
    }

    pub fn into_orders(self) -> Vec<OrderInstruction> {
        self.orders
    }

    /// Bars visible on the as-of date for a symbol in any spelling.
    fn visible(&self, symbol: &str) -> Option<&'a [Bar]> {
        let bars = self.store.bars(&self.symbols.to_canonical(symbol))?;
        let end = bars.partition_point(|b| b.date <= self.as_of);
        Some(&bars[..end])
    }
}

impl BarSource for SnapshotHost<'_> {
    fn get_bars(&self, symbol: &str, length: usize) -> Result<Vec<Bar>, DataError> {
        let bars = self.visible(symbol).ok_or_else(|| DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        })?;
        if bars.is_empty() {
            return Err(DataError::Empty {
                symbol: symbol.to_string(),
            });
        }
        let start = bars.len().saturating_sub(length);
        Ok(bars[start..].to_vec())
    }
}

impl Host for SnapshotHost<'_> {
    fn current_date(&self) -> NaiveDate {
        self.as_of
    }

    fn is_backtesting(&self) -> bool {
        self.symbols.is_backtesting()
    }

    fn get_last_price(&self, symbol: &str) -> Option<f64> {
        self.visible(symbol)?.last().map(|b| b.close)
    }

    fn get_portfolio_value(&self) -> f64 {
        let mut value = self.cash;
        for (symbol, qty) in &self.positions {
            match self.get_last_price(symbol) {
                Some(px) => value += qty * px,
                None => tracing::warn!(%symbol, qty, "[snapshot] no price, valued at zero"),
            }
        }
        value
    }

    fn get_open_positions(&self) -> Vec<Position> {
        self.positions
            .iter()
            .map(|(s, q)| Position::new(s.clone(), *q))
            .collect()
    }

    fn get_position(&self, symbol: &str) -> Option<Position> {
        let key = symbol.trim().to_ascii_uppercase();
        self.positions
            .get(&key)
            .or_else(|| self.positions.get(&self.symbols.to_canonical(&key)))
            .map(|q| Position::new(key, *q))
    }

    fn submit_order(&mut self, order: &OrderInstruction) {
        self.orders.push(order.clone());
    }

    fn default_universe(&self, limit: usize) -> Vec<String> {
        self.store.default_universe(limit)
    }

    fn sector_map(&self) -> SectorMap {
        self.store.sector_map().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            date: d(day),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100,
        }
    }

    fn store() -> BarStore {
        let mut s = BarStore::new();
        s.insert("AAPL", vec![bar(1, 10.0), bar(2, 11.0), bar(3, 12.0), bar(6, 13.0)]);
        s.insert("BRK.B", vec![bar(1, 400.0), bar(2, 401.0)]);
        s
    }

    #[test]
    fn bars_and_prices_stop_at_as_of() {
        let store = store();
        let host = SnapshotHost::new(&store, d(3), false, 0.0, &[]);
        let bars = host.get_bars("AAPL", 10).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars.last().unwrap().date, d(3));
        assert_eq!(host.get_bars("AAPL", 2).unwrap()[0].date, d(2));
        assert_eq!(host.get_last_price("AAPL"), Some(12.0));

        // a weekend as-of date sees Friday's bar
        let host = SnapshotHost::new(&store, d(5), false, 0.0, &[]);
        assert_eq!(host.get_last_price("AAPL"), Some(12.0));
    }

    #[test]
    fn missing_symbol_and_empty_window_are_errors() {
        let store = store();
        let host = SnapshotHost::new(&store, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(), false, 0.0, &[]);
        assert!(matches!(host.get_bars("AAPL", 5), Err(DataError::Empty { .. })));
        assert!(matches!(host.get_bars("ZZZ", 5), Err(DataError::SymbolNotFound { .. })));
    }

    #[test]
    fn backtest_spelling_reaches_canonical_bars() {
        let store = store();
        let host = SnapshotHost::new(&store, d(2), true, 0.0, &[]);
        assert_eq!(host.get_last_price("BRK-B"), Some(401.0));
        assert_eq!(host.get_bars("BRK-B", 5).unwrap().len(), 2);
    }

    #[test]
    fn portfolio_value_marks_positions() {
        let store = store();
        let positions = [
            Position::new("aapl", 10.0),
            Position::new("BRK-B", -1.0),
            Position::new("GONE", 5.0),
            Position::new("AAPL", 5.0),
        ];
        let host = SnapshotHost::new(&store, d(2), true, 1_000.0, &positions);
        // 1000 + 15 * 11 - 401; GONE has no price
        assert!((host.get_portfolio_value() - 764.0).abs() < 1e-9);
        assert_eq!(host.get_position("AAPL"), Some(Position::new("AAPL", 15.0)));
        assert_eq!(host.get_open_positions().len(), 3);
    }

    #[test]
    fn orders_are_recorded_not_filled() {
        use trendfolio_core::domain::{OrderReason, OrderSide};
        let store = store();
        let mut host = SnapshotHost::new(&store, d(2), false, 500.0, &[]);
        let order = OrderInstruction::new("AAPL", 3.0, OrderSide::Buy, OrderReason::Rebalance);
        host.submit_order(&order);
        assert_eq!(host.orders(), &[order]);
        assert_eq!(host.cash(), 500.0);
        assert!(host.get_position("AAPL").is_none());
    }

    mod props {
        use super::*;
        use crate::synthetic::generate_bars;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn nothing_after_as_of_is_served(offset in 0i64..120, length in 1usize..80) {
                let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
                let mut store = BarStore::new();
                store.insert("SPY", generate_bars("SPY", start, start + chrono::Duration::days(120)));

                let as_of = start + chrono::Duration::days(offset);
                let host = SnapshotHost::new(&store, as_of, false, 0.0, &[]);
                match host.get_bars("SPY", length) {
                    Ok(bars) => {
                        prop_assert!(bars.len() <= length);
                        prop_assert!(bars.iter().all(|b| b.date <= as_of));
                        prop_assert_eq!(host.get_last_price("SPY"), bars.last().map(|b| b.close));
                    }
                    Err(e) => {
                        prop_assert!(matches!(e, DataError::Empty { .. }), "unexpected error");
                        prop_assert!(host.get_last_price("SPY").is_none());
                    }
                }
            }
        }
    }
}
