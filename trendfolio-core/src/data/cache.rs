//! Per-trading-day memoized bar retrieval.
//!
//! Keyed by `(source symbol, lookback)`. The whole cache is discarded the
//! first time it is used on a new trading date, so a series is never stale by
//! more than the current step and never partially refreshed.
//!
//! Failures (unknown symbol, empty result, source error) are logged and
//! surface as `None`; they are not memoized, so a later call may retry.

use super::provider::BarSource;
use super::symbols::SymbolMapper;
use crate::domain::BarSeries;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;

/// The per-day bar cache.
#[derive(Debug, Default)]
pub struct BarCache {
    day: Option<NaiveDate>,
    entries: HashMap<(String, usize), Arc<BarSeries>>,
    symbols: SymbolMapper,
    no_lookahead: bool,
    fetches: usize,
}

impl BarCache {
    pub fn new(symbols: SymbolMapper, no_lookahead: bool) -> Self {
        Self {
            day: None,
            entries: HashMap::new(),
            symbols,
            no_lookahead,
            fetches: 0,
        }
    }

    pub fn symbols(&self) -> &SymbolMapper {
        &self.symbols
    }

    /// Trading date the current entries belong to.
    pub fn day(&self) -> Option<NaiveDate> {
        self.day
    }

    /// Clear everything if `today` differs from the cached day.
    /// Returns true when the cache was invalidated.
    pub fn roll_to(&mut self, today: NaiveDate) -> bool {
        if self.day == Some(today) {
            return false;
        }
        self.day = Some(today);
        self.entries.clear();
        true
    }

    /// Fetch (or reuse) the last `lookback` bars of `symbol` as of `today`.
    pub fn get<S>(
        &mut self,
        source: &S,
        today: NaiveDate,
        symbol: &str,
        lookback: usize,
    ) -> Option<Arc<BarSeries>>
    where
        S: BarSource + ?Sized,
    {
        self.roll_to(today);

        let src = self.symbols.to_source(symbol);
        let key = (src.clone(), lookback);
        if let Some(series) = self.entries.get(&key) {
            return Some(Arc::clone(series));
        }

        self.fetches += 1;
        let bars = match source.get_bars(&src, lookback) {
            Ok(bars) => bars,
            Err(err) => {
                tracing::warn!(symbol = %src, lookback, error = %err, "[data] fetch failed");
                return None;
            }
        };

        let mut series = BarSeries::new(self.symbols.to_canonical(&src), bars);
        if self.no_lookahead {
            series = series.without_forming_bar(today);
        }
        if series.is_empty() {
            tracing::warn!(symbol = %src, lookback, "[data] no usable bars");
            return None;
        }

        let series = Arc::new(series);
        self.entries.insert(key, Arc::clone(&series));
        Some(series)
    }

    /// Number of cached series.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total calls that reached the bar source.
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }
}
