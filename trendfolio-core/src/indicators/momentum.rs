//! Momentum as a fractional return.
//!
//! momentum[t] = close[t] / close[t-period] - 1
//! Lookback: period.

use super::{check_period, Indicator, IndicatorError};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Momentum {
    period: usize,
    name: String,
}

impl Momentum {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        check_period("Momentum", period, 1)?;
        Ok(Self {
            period,
            name: format!("momentum_{period}"),
        })
    }
}

impl Indicator for Momentum {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        for i in self.period..n {
            let prev = bars[i - self.period].close;
            if prev > 0.0 {
                result[i] = bars[i].close / prev - 1.0;
            }
        }
        result
    }
}

/// Return over the last `lookback` bars of a close series.
///
/// `None` if the series is shorter than `lookback + 1` or the historical
/// close is not positive.
pub fn momentum(closes: &[f64], lookback: usize) -> Option<f64> {
    if lookback == 0 || closes.len() < lookback + 1 {
        return None;
    }
    let last = closes[closes.len() - 1];
    let past = closes[closes.len() - 1 - lookback];
    if past.is_nan() || past <= 0.0 {
        return None;
    }
    let value = last / past - 1.0;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn momentum_series() {
        let bars = make_bars(&[100.0, 110.0, 105.0, 121.0]);
        let result = Momentum::new(2).unwrap().compute(&bars);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 0.05, DEFAULT_EPSILON);
        assert_approx(result[3], 0.10, DEFAULT_EPSILON);
    }

    #[test]
    fn momentum_last_value() {
        let closes = [50.0, 80.0, 90.0, 100.0];
        assert_approx(momentum(&closes, 3).unwrap(), 1.0, DEFAULT_EPSILON);
        assert_approx(momentum(&closes, 1).unwrap(), 1.0 / 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn needs_lookback_plus_one() {
        let closes = [100.0, 101.0, 102.0];
        assert!(momentum(&closes, 3).is_none());
        assert!(momentum(&closes, 2).is_some());
        assert!(momentum(&closes, 0).is_none());
    }

    #[test]
    fn non_positive_base_is_none() {
        assert!(momentum(&[0.0, 10.0], 1).is_none());
        assert!(momentum(&[-1.0, 10.0], 1).is_none());
        assert!(momentum(&[f64::NAN, 10.0], 1).is_none());
    }

    #[test]
    fn negative_return() {
        assert_approx(momentum(&[100.0, 90.0], 1).unwrap(), -0.1, DEFAULT_EPSILON);
    }
}
