//! Inverse-volatility weights under dual risk budgets.
//!
//! # Formula
//! ```text
//! weight        = (1/vol) / Σ(1/vol)
//! stop_distance = max(0.01, atr_mult_trail * ATR)
//! risk_dollars  = min(pv * total_risk_budget * weight, pv * risk_per_entry_cap)
//! by_risk       = floor(risk_dollars / stop_distance)
//! by_capital    = floor(pv * exposure * weight / price)
//! shares        = max(0, min(by_risk, by_capital))
//! ```
//!
//! # Example
//! - Portfolio: $100,000, one symbol, weight 1.0
//! - Total budget 7% ($7,000), per-entry cap 1% ($1,000)
//! - ATR: $2.00, multiplier 2.5 (stop distance $5.00)
//! - By risk: $1,000 / $5.00 = 200 shares

use super::{Sizer, SizingInput, SizingTarget};
use crate::profile::Profile;

/// Smallest stop distance used for sizing.
pub const MIN_STOP_DISTANCE: f64 = 0.01;

/// Normalized inverse-volatility weights, in input order.
///
/// Entries without a positive finite volatility are dropped from both the
/// output and the denominator.
pub fn inverse_vol_weights(vols: &[(String, Option<f64>)]) -> Vec<(String, f64)> {
    let inv: Vec<(String, f64)> = vols
        .iter()
        .filter_map(|(s, v)| {
            v.filter(|v| v.is_finite() && *v > 0.0)
                .map(|v| (s.clone(), 1.0 / v))
        })
        .collect();
    let sum: f64 = inv.iter().map(|(_, w)| w).sum();
    inv.into_iter().map(|(s, w)| (s, w / sum)).collect()
}

/// Risk-budgeted sizer.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskSizer {
    total_risk_budget: f64,
    risk_per_entry_cap: f64,
    atr_mult_trail: f64,
    min_order_dollars: f64,
}

impl RiskSizer {
    pub fn new(
        total_risk_budget: f64,
        risk_per_entry_cap: f64,
        atr_mult_trail: f64,
        min_order_dollars: f64,
    ) -> Self {
        Self {
            total_risk_budget,
            risk_per_entry_cap,
            atr_mult_trail,
            min_order_dollars,
        }
    }

    pub fn from_profile(profile: &Profile, min_order_dollars: f64) -> Self {
        Self::new(
            profile.total_risk_budget,
            profile.risk_per_entry_cap,
            profile.atr_mult_trail,
            min_order_dollars,
        )
    }

    pub fn stop_distance(&self, atr: f64) -> f64 {
        (self.atr_mult_trail * atr).max(MIN_STOP_DISTANCE)
    }

    /// Dollars at risk for a symbol with the given weight.
    pub fn risk_dollars(&self, portfolio_value: f64, weight: f64) -> f64 {
        let budget_share = portfolio_value * self.total_risk_budget * weight;
        budget_share.min(portfolio_value * self.risk_per_entry_cap)
    }
}

impl Sizer for RiskSizer {
    fn size(
        &self,
        inputs: &[SizingInput],
        portfolio_value: f64,
        exposure: f64,
    ) -> Vec<SizingTarget> {
        if !(portfolio_value.is_finite() && portfolio_value > 0.0) {
            return Vec::new();
        }
        let exposure = exposure.clamp(0.0, 1.0);

        let vols: Vec<(String, Option<f64>)> =
            inputs.iter().map(|i| (i.symbol.clone(), i.vol)).collect();
        let weights = inverse_vol_weights(&vols);

        let mut targets = Vec::with_capacity(weights.len());
        for (symbol, weight) in weights {
            let Some(input) = inputs.iter().find(|i| i.symbol == symbol) else {
                continue;
            };
            let Some(price) = input.price.filter(|p| p.is_finite() && *p > 0.0) else {
                continue;
            };
            let Some(atr) = input.atr.filter(|a| a.is_finite() && *a > 0.0) else {
                continue;
            };

            let stop_distance = self.stop_distance(atr);
            let risk_dollars = self.risk_dollars(portfolio_value, weight);
            let by_risk = (risk_dollars / stop_distance).floor() as i64;
            let by_capital = (portfolio_value * exposure * weight / price).floor() as i64;
            let shares = by_risk.min(by_capital).max(0);

            if shares == 0 || shares as f64 * price < self.min_order_dollars {
                continue;
            }
            targets.push(SizingTarget {
                symbol,
                shares,
                price,
                weight,
                stop_distance,
                risk_dollars,
            });
        }
        targets
    }

    fn name(&self) -> &str {
        "risk_budget"
    }
}
