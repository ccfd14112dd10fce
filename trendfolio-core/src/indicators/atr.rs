//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR is the simple rolling mean of true range over `period` bars.
//! Lookback: period (TR needs a previous close, so the first full window
//! ends at index `period`).

use super::{check_period, positive_finite, Indicator, IndicatorError};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        check_period("ATR", period, 1)?;
        Ok(Self {
            period,
            name: format!("atr_{period}"),
        })
    }
}

/// Compute the True Range series from bars.
/// TR[0] = NaN (no previous close).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = vec![f64::NAN; bars.len()];
    for i in 1..bars.len() {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let tr = true_range(bars);
        let n = tr.len();
        let mut result = vec![f64::NAN; n];
        for i in self.period..n {
            let window = &tr[(i + 1 - self.period)..=i];
            // NaN in the window propagates through the sum
            result[i] = window.iter().sum::<f64>() / self.period as f64;
        }
        result
    }
}

/// ATR at the most recent bar.
///
/// `None` with fewer than `period + 1` bars, or when the result is
/// non-finite or not positive. The engine fetches `max(period + 10, 80)`
/// bars ([`crate::settings::atr_lookback`]); that is a fetch length, not a
/// minimum.
pub fn average_true_range(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    let tail = &bars[bars.len() - (period + 1)..];
    let atr = Atr::new(period).ok()?;
    positive_finite(atr.compute(tail).last().copied())
}
