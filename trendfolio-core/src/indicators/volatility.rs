//! Annualized realized volatility.
//!
//! Sample standard deviation (n-1 denominator) of daily simple returns over
//! the trailing `lookback` returns, scaled by sqrt(252).
//! Lookback: period (first full window of returns ends at index `period`).

use super::{check_period, positive_finite, Indicator, IndicatorError};
use crate::domain::Bar;
use crate::settings::TRADING_DAYS_PER_YEAR;

/// Fewest return observations accepted by [`realized_vol`].
pub const MIN_RETURNS: usize = 25;

#[derive(Debug, Clone)]
pub struct RealizedVol {
    period: usize,
    name: String,
}

impl RealizedVol {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        check_period("RealizedVol", period, 2)?;
        Ok(Self {
            period,
            name: format!("rvol_{period}"),
        })
    }
}

fn simple_returns(bars: &[Bar]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| w[1].close / w[0].close - 1.0)
        .collect()
}

/// Annualized sample standard deviation. Needs at least two observations.
fn annualized_std(returns: &[f64]) -> f64 {
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt() * TRADING_DAYS_PER_YEAR.sqrt()
}

impl Indicator for RealizedVol {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut result = vec![f64::NAN; bars.len()];
        let rets = simple_returns(bars);
        // rets[j] is the return into bar j+1
        for end in self.period..=rets.len() {
            result[end] = annualized_std(&rets[end - self.period..end]);
        }
        result
    }
}

/// Realized volatility at the most recent bar.
///
/// Uses the last `lookback` returns, or all available ones when fewer, as
/// long as at least [`MIN_RETURNS`] exist. Non-finite or non-positive results
/// are `None`.
pub fn realized_vol(bars: &[Bar], lookback: usize) -> Option<f64> {
    let rets = simple_returns(bars);
    let rets: Vec<f64> = rets.into_iter().filter(|r| r.is_finite()).collect();
    if rets.len() < MIN_RETURNS.max(2) {
        return None;
    }
    let tail = &rets[rets.len().saturating_sub(lookback.max(2))..];
    positive_finite(Some(annualized_std(tail)))
}
