/// Position guards: trailing stops and the portfolio drawdown breaker.
///
/// **Key Design Principles:**
/// 1. Guards run every step, before any rebalance logic
/// 2. Guards emit **instructions**, never fills
/// 3. **Ratchet invariant**: the trailing reference high only rises
/// 4. Missing data never forces an exit
///
/// **Module Structure:**
/// - `trailing_stop`: per-symbol highest close since entry
/// - `drawdown_breaker`: all-time equity peak, one-shot breach, cooldown
pub mod drawdown_breaker;
pub mod trailing_stop;

pub use drawdown_breaker::{drawdown, BreakerDecision, DrawdownBreaker};
pub use trailing_stop::{stop_level, TrailDecision, TrailingStops};

use crate::domain::{OrderInstruction, OrderReason, OrderSide, Position};
use crate::profile::Profile;
use chrono::NaiveDate;

/// Readings for one open position, gathered by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardInput {
    pub position: Position,
    pub price: Option<f64>,
    pub atr: Option<f64>,
}

/// Guard logic bound to a profile.
#[derive(Debug, Clone, Copy)]
pub struct PositionGuard<'a> {
    profile: &'a Profile,
}

impl<'a> PositionGuard<'a> {
    pub fn new(profile: &'a Profile) -> Self {
        Self { profile }
    }

    /// Full-exit sells for long positions that crossed their trailing stop.
    ///
    /// Shorts, flat positions and missing prices are skipped.
    pub fn trailing_exits(
        &self,
        stops: &mut TrailingStops,
        inputs: &[GuardInput],
    ) -> Vec<OrderInstruction> {
        let mut exits = Vec::new();
        for input in inputs {
            let pos = &input.position;
            if !pos.is_long() {
                continue;
            }
            let Some(price) = input.price.filter(|p| p.is_finite() && *p > 0.0) else {
                continue;
            };
            match stops.check(&pos.symbol, price, input.atr, self.profile.atr_mult_trail) {
                TrailDecision::Exit { high, stop } => {
                    tracing::info!(
                        symbol = %pos.symbol,
                        qty = pos.quantity,
                        px = price,
                        high,
                        stop,
                        "[EXIT] trail"
                    );
                    exits.push(OrderInstruction::new(
                        pos.symbol.clone(),
                        pos.quantity.abs(),
                        OrderSide::Sell,
                        OrderReason::TrailingStop,
                    ));
                }
                TrailDecision::NoAtr { .. } => {
                    tracing::debug!(symbol = %pos.symbol, "[trail] no atr, skipped");
                }
                TrailDecision::Hold { .. } => {}
            }
        }
        exits
    }

    /// Feed the breaker and, on a trip, close every nonzero position and
    /// clear all tracked highs.
    pub fn drawdown_check(
        &self,
        breaker: &mut DrawdownBreaker,
        stops: &mut TrailingStops,
        portfolio_value: f64,
        today: NaiveDate,
        positions: &[Position],
    ) -> (BreakerDecision, Vec<OrderInstruction>) {
        let decision = breaker.observe(
            portfolio_value,
            today,
            self.profile.max_drawdown,
            self.profile.cooldown_days,
        );
        let BreakerDecision::Tripped {
            drawdown,
            cooldown_until,
        } = decision
        else {
            return (decision, Vec::new());
        };

        tracing::warn!(
            drawdown,
            %cooldown_until,
            "[DD] breaker -> liquidate + cooldown"
        );
        let orders = positions
            .iter()
            .filter_map(|p| {
                p.closing_side().map(|side| {
                    OrderInstruction::new(
                        p.symbol.clone(),
                        p.quantity.abs(),
                        side,
                        OrderReason::DrawdownBreaker,
                    )
                })
            })
            .collect();
        stops.clear();
        (decision, orders)
    }
}
