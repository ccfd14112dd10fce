//! Indicator library: ATR, realized volatility, SMA trend, momentum.
//!
//! Every indicator exists in two forms:
//! - a full-series [`Indicator`] implementation (one output per bar, `NaN`
//!   during warmup), used by tests and the look-ahead guard;
//! - a last-value helper returning `Option<f64>`, used by the engine, where
//!   insufficient history and degenerate numbers both collapse to `None`.
//!
//! All functions are pure: no hidden state, inputs are never mutated.

pub mod atr;
pub mod momentum;
pub mod sma;
pub mod volatility;

pub use atr::{average_true_range, true_range, Atr};
pub use momentum::{momentum, Momentum};
pub use sma::{above_trend, sma_last, Sma};
pub use volatility::{realized_vol, RealizedVol};

use crate::domain::Bar;
use thiserror::Error;

/// Invalid indicator construction parameters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndicatorError {
    #[error("{indicator} period must be >= {min}, got {period}")]
    PeriodTooShort {
        indicator: &'static str,
        period: usize,
        min: usize,
    },
}

pub(crate) fn check_period(
    indicator: &'static str,
    period: usize,
    min: usize,
) -> Result<(), IndicatorError> {
    if period < min {
        return Err(IndicatorError::PeriodTooShort {
            indicator,
            period,
            min,
        });
    }
    Ok(())
}

/// Trait for indicators.
///
/// Indicators take a full bar series and produce a numeric output series of
/// the same length. The first `lookback()` values are `f64::NAN` (warmup).
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
/// Every indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_200", "atr_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Last element if finite and strictly positive.
pub(crate) fn positive_finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
