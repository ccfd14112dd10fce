//! Simple Moving Average (SMA) and the long-term trend test.
//!
//! Rolling mean of close prices over a lookback window.
//! Lookback: period - 1 (first valid value at index period-1).

use super::{check_period, Indicator, IndicatorError};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        check_period("SMA", period, 1)?;
        Ok(Self {
            period,
            name: format!("sma_{period}"),
        })
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        let mut sum: f64 = bars[..self.period].iter().map(|b| b.close).sum();
        result[self.period - 1] = sum / self.period as f64;

        for i in self.period..n {
            sum += bars[i].close - bars[i - self.period].close;
            result[i] = sum / self.period as f64;
        }
        result
    }
}

/// SMA of the last `window` closes. `None` if fewer bars or non-finite.
pub fn sma_last(bars: &[Bar], window: usize) -> Option<f64> {
    if window == 0 || bars.len() < window {
        return None;
    }
    let sum: f64 = bars[bars.len() - window..].iter().map(|b| b.close).sum();
    let sma = sum / window as f64;
    sma.is_finite().then_some(sma)
}

/// Whether the last close is strictly above its `window`-bar SMA.
/// `None` when the SMA is unavailable.
pub fn above_trend(bars: &[Bar], window: usize) -> Option<bool> {
    let sma = sma_last(bars, window)?;
    let last = bars.last()?.close;
    Some(last > sma)
}
