//! Order generation for a rebalance: exits for deselected holdings and
//! share deltas toward sized targets.

use crate::domain::{OrderInstruction, OrderReason, OrderSide, Position};
use crate::position_management::TrailingStops;
use crate::sizers::SizingTarget;
use std::collections::{HashMap, HashSet};

/// Close every nonzero position whose symbol is not in `selected`, and stop
/// tracking it.
pub fn deselection_exits(
    positions: &[Position],
    selected: &HashSet<&str>,
    stops: &mut TrailingStops,
) -> Vec<OrderInstruction> {
    let mut orders = Vec::new();
    for pos in positions {
        if selected.contains(pos.symbol.as_str()) {
            continue;
        }
        if let Some(side) = pos.closing_side() {
            orders.push(OrderInstruction::new(
                pos.symbol.clone(),
                pos.quantity.abs(),
                side,
                OrderReason::Deselected,
            ));
            stops.remove(&pos.symbol);
        }
    }
    orders
}

/// Orders moving current whole-share holdings to each target.
///
/// Deltas of zero or worth less than `min_order_dollars` are skipped. A buy
/// raises the tracked high to at least the target's price; a sell that
/// leaves the position flat or short drops the tracked high.
pub fn delta_orders(
    targets: &[SizingTarget],
    current: &HashMap<String, i64>,
    min_order_dollars: f64,
    stops: &mut TrailingStops,
) -> Vec<OrderInstruction> {
    let mut orders = Vec::new();
    for target in targets {
        let held = current.get(&target.symbol).copied().unwrap_or(0);
        let delta = target.shares - held;
        if delta == 0 {
            continue;
        }
        let price = target.price;
        if !(price.is_finite() && price > 0.0) {
            continue;
        }
        if delta.unsigned_abs() as f64 * price < min_order_dollars {
            continue;
        }

        if delta > 0 {
            orders.push(OrderInstruction::new(
                target.symbol.clone(),
                delta as f64,
                OrderSide::Buy,
                OrderReason::Rebalance,
            ));
            stops.observe(&target.symbol, price);
        } else {
            orders.push(OrderInstruction::new(
                target.symbol.clone(),
                delta.unsigned_abs() as f64,
                OrderSide::Sell,
                OrderReason::Rebalance,
            ));
            if held + delta <= 0 {
                stops.remove(&target.symbol);
            }
        }
    }
    orders
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(symbol: &str, shares: i64, price: f64) -> SizingTarget {
        SizingTarget {
            symbol: symbol.into(),
            shares,
            price,
            weight: 1.0,
            stop_distance: 1.0,
            risk_dollars: 100.0,
        }
    }

    #[test]
    fn deselected_positions_close_in_full() {
        let mut stops = TrailingStops::new();
        stops.observe("OLD", 10.0);
        stops.observe("KEEP", 10.0);
        let positions = vec![
            Position::new("OLD", 12.0),
            Position::new("SHORTY", -3.0),
            Position::new("KEEP", 5.0),
        ];
        let selected: HashSet<&str> = ["KEEP"].into_iter().collect();
        let orders = deselection_exits(&positions, &selected, &mut stops);

        assert_eq!(orders.len(), 2);
        assert_eq!((orders[0].side, orders[0].quantity), (OrderSide::Sell, 12.0));
        assert_eq!((orders[1].side, orders[1].quantity), (OrderSide::Buy, 3.0));
        assert!(orders.iter().all(|o| o.reason == OrderReason::Deselected));
        assert!(!stops.contains("OLD"));
        assert!(stops.contains("KEEP"));
    }

    #[test]
    fn deltas_buy_and_sell() {
        let mut stops = TrailingStops::new();
        stops.observe("B", 60.0);
        let current: HashMap<String, i64> = [("B".to_string(), 50)].into_iter().collect();
        let orders = delta_orders(
            &[target("A", 100, 20.0), target("B", 30, 50.0)],
            &current,
            150.0,
            &mut stops,
        );
        assert_eq!(orders.len(), 2);
        assert_eq!((orders[0].side, orders[0].quantity), (OrderSide::Buy, 100.0));
        assert_eq!((orders[1].side, orders[1].quantity), (OrderSide::Sell, 20.0));
        // buy seeds the high; partial sell keeps it
        assert_eq!(stops.high("A"), Some(20.0));
        assert_eq!(stops.high("B"), Some(60.0));
    }

    #[test]
    fn buy_keeps_existing_higher_high() {
        let mut stops = TrailingStops::new();
        stops.observe("A", 25.0);
        delta_orders(&[target("A", 100, 20.0)], &HashMap::new(), 150.0, &mut stops);
        assert_eq!(stops.high("A"), Some(25.0));
    }

    #[test]
    fn small_and_zero_deltas_are_skipped() {
        let mut stops = TrailingStops::new();
        let current: HashMap<String, i64> =
            [("A".to_string(), 100), ("B".to_string(), 10)].into_iter().collect();
        let orders = delta_orders(
            &[target("A", 100, 20.0), target("B", 12, 50.0)],
            &current,
            150.0,
            &mut stops,
        );
        // A: delta 0; B: 2 * 50 = 100 < 150
        assert!(orders.is_empty());
        assert!(stops.is_empty());
    }
}
