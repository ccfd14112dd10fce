//! ATR trailing stop state.
//!
//! **Ratchet rule:** the tracked high only rises. The stop level is
//! `high - atr_mult_trail * ATR`, so it can loosen when ATR expands; the
//! reference point cannot.
//!
//! Invariant: a symbol is tracked only while the engine believes it holds a
//! nonzero position. Entries are seeded on buys and removed on full exits.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stop level for a tracked high.
pub fn stop_level(high: f64, atr: f64, atr_mult: f64) -> f64 {
    high - atr_mult * atr
}

/// Result of checking one position against its trailing stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrailDecision {
    /// Price above the stop.
    Hold { high: f64, stop: f64 },
    /// No ATR reading; the high was still updated.
    NoAtr { high: f64 },
    /// Price at or below the stop; the tracked high has been removed.
    Exit { high: f64, stop: f64 },
}

/// Highest close observed since entry, per symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrailingStops {
    highs: BTreeMap<String, f64>,
}

impl TrailingStops {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn high(&self, symbol: &str) -> Option<f64> {
        self.highs.get(symbol).copied()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.highs.contains_key(symbol)
    }

    /// Seed with `price` if untracked, raise if `price` is a new high.
    /// Returns the tracked high.
    pub fn observe(&mut self, symbol: &str, price: f64) -> f64 {
        let high = self.highs.entry(symbol.to_string()).or_insert(price);
        if price > *high {
            *high = price;
        }
        *high
    }

    pub fn remove(&mut self, symbol: &str) -> Option<f64> {
        self.highs.remove(symbol)
    }

    pub fn clear(&mut self) {
        self.highs.clear();
    }

    /// Drop every tracked high whose symbol fails `keep`.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.highs.retain(|symbol, _| keep(symbol));
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.highs.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.highs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highs.is_empty()
    }

    /// Update the high with `price` and test the stop.
    pub fn check(
        &mut self,
        symbol: &str,
        price: f64,
        atr: Option<f64>,
        atr_mult: f64,
    ) -> TrailDecision {
        let high = self.observe(symbol, price);
        let Some(atr) = atr else {
            return TrailDecision::NoAtr { high };
        };
        let stop = stop_level(high, atr, atr_mult);
        if price <= stop {
            self.remove(symbol);
            TrailDecision::Exit { high, stop }
        } else {
            TrailDecision::Hold { high, stop }
        }
    }
}
