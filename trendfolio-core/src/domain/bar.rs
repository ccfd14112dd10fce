//! Bar and BarSeries, the basic market data units.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar. The symbol lives on the owning [`BarSeries`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN or infinite (void bar).
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// Ordered daily bars for one symbol: ascending by date, no duplicate dates,
/// no void bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Build a series, enforcing the ordering invariant.
    ///
    /// Void bars are dropped, bars are sorted by date, and when two bars share
    /// a date the later one in the input wins.
    pub fn new(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Self {
        bars.retain(|b| !b.is_void());
        // stable: equal dates keep input order, so the last duplicate is last
        bars.sort_by_key(|b| b.date);
        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(prev) if prev.date == bar.date => *prev = bar,
                _ => deduped.push(bar),
            }
        }
        Self {
            symbol: symbol.into(),
            bars: deduped,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    /// Close prices in date order.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Drop the final bar when it is dated on or after `today`.
    ///
    /// A data source may expose the still-forming bar of the current session;
    /// signals must only see completed bars. Series shorter than 3 bars are
    /// left untouched.
    pub fn without_forming_bar(mut self, today: NaiveDate) -> Self {
        if self.bars.len() >= 3 {
            if let Some(last) = self.bars.last() {
                if last.date >= today {
                    self.bars.pop();
                }
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(bar(2, 100.0).is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut b = bar(2, 100.0);
        b.open = f64::NAN;
        assert!(b.is_void());
        assert!(!b.is_sane());

        let mut b = bar(2, 100.0);
        b.close = f64::INFINITY;
        assert!(b.is_void());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut b = bar(2, 100.0);
        b.high = 97.0; // below low
        assert!(!b.is_sane());
    }

    #[test]
    fn series_sorts_and_dedups() {
        let series = BarSeries::new(
            "SPY",
            vec![bar(4, 103.0), bar(2, 101.0), bar(3, 102.0), bar(3, 102.5)],
        );
        let dates: Vec<u32> = series
            .bars()
            .iter()
            .map(|b| chrono::Datelike::day(&b.date))
            .collect();
        assert_eq!(dates, vec![2, 3, 4]);
        // later duplicate wins
        assert_eq!(series.bars()[1].close, 102.5);
    }

    #[test]
    fn series_drops_void_bars() {
        let mut void = bar(3, 102.0);
        void.low = f64::NAN;
        let series = BarSeries::new("SPY", vec![bar(2, 101.0), void, bar(4, 103.0)]);
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn forming_bar_is_trimmed() {
        let series = BarSeries::new("SPY", vec![bar(2, 1.0), bar(3, 2.0), bar(4, 3.0)]);
        let today = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        let trimmed = series.without_forming_bar(today);
        assert_eq!(trimmed.len(), 2);
        assert_eq!(trimmed.last_close(), Some(2.0));
    }

    #[test]
    fn completed_bars_are_kept() {
        let series = BarSeries::new("SPY", vec![bar(2, 1.0), bar(3, 2.0), bar(4, 3.0)]);
        let today = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(series.without_forming_bar(today).len(), 3);
    }

    #[test]
    fn short_series_is_not_trimmed() {
        let series = BarSeries::new("SPY", vec![bar(3, 2.0), bar(4, 3.0)]);
        let today = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        assert_eq!(series.without_forming_bar(today).len(), 2);
    }
}
