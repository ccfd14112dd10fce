//! Fixed signal windows and tunable engine settings.

use serde::{Deserialize, Serialize};

/// Long-term trend window (daily bars).
pub const TREND_SMA_DAYS: usize = 200;
/// 12-month momentum window.
pub const MOM_12M: usize = 252;
/// 6-month momentum window.
pub const MOM_6M: usize = 126;
/// 3-month momentum window.
pub const MOM_3M: usize = 63;
/// Realized-volatility window.
pub const VOL_LOOKBACK: usize = 63;
/// Extra bars requested on top of rolling windows.
pub const LOOKBACK_BUFFER: usize = 30;
/// Ranker tolerates series this many bars shorter than requested.
pub const HISTORY_SLACK: usize = 5;
/// Trading days per year, for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Strategy-level knobs that are not part of a risk profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    /// Symbol whose 200-day trend sets the base regime.
    pub regime_symbol: String,
    /// Cap on the default universe size.
    pub max_universe: usize,
    /// Number of universe symbols sampled for breadth.
    pub breadth_sample: usize,
    /// Breadth at or below this is fully risk-off.
    pub breadth_low: f64,
    /// Breadth at or above this is fully risk-on.
    pub breadth_high: f64,
    /// Orders and allocations smaller than this are skipped.
    pub min_order_dollars: f64,
    /// Drop the still-forming bar of the current session.
    pub no_lookahead: bool,
    /// Score the universe on the rayon pool.
    pub parallel_scoring: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            regime_symbol: "SPY".into(),
            max_universe: 500,
            breadth_sample: 150,
            breadth_low: 0.35,
            breadth_high: 0.65,
            min_order_dollars: 150.0,
            no_lookahead: true,
            parallel_scoring: true,
        }
    }
}

impl EngineSettings {
    /// Bars fetched for trend and breadth readings.
    pub fn trend_lookback(&self) -> usize {
        TREND_SMA_DAYS + LOOKBACK_BUFFER
    }

    /// Bars fetched for ranking.
    pub fn rank_lookback(&self) -> usize {
        TREND_SMA_DAYS.max(MOM_12M) + LOOKBACK_BUFFER
    }
}

/// Bars fetched for an ATR reading.
pub fn atr_lookback(atr_period: usize) -> usize {
    (atr_period + 10).max(80)
}

/// Bars fetched for a realized-volatility reading.
pub fn vol_lookback() -> usize {
    (VOL_LOOKBACK + 10).max(120)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_lookbacks() {
        let s = EngineSettings::default();
        assert_eq!(s.trend_lookback(), 230);
        assert_eq!(s.rank_lookback(), 282);
        assert_eq!(atr_lookback(14), 80);
        assert_eq!(atr_lookback(100), 110);
        assert_eq!(vol_lookback(), 120);
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let s: EngineSettings = serde_json::from_str(r#"{"regime_symbol": "QQQ"}"#).unwrap();
        assert_eq!(s.regime_symbol, "QQQ");
        assert_eq!(s.breadth_sample, 150);
        assert!(s.no_lookahead);
    }
}
