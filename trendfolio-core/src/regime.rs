//! Regime detection and the breadth exposure dial.
//!
//! Base exposure comes from the regime symbol's 200-day trend. On rebalance
//! days the base is replaced by a blend of the bear and bull targets driven
//! by market breadth, when breadth can be measured reliably.
//!
//! Nothing here is persisted: a reading is recomputed every time it is asked
//! for, backed by the per-day [`BarCache`].

use crate::data::{BarCache, BarSource};
use crate::indicators::{above_trend, sma_last};
use crate::profile::Profile;
use crate::settings::{EngineSettings, TREND_SMA_DAYS};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Exposure used when the regime symbol has too little history.
pub const NEUTRAL_EXPOSURE: f64 = 1.0;

/// Fewest valid breadth readings accepted, before the 30% sample rule.
pub const MIN_BREADTH_READINGS: usize = 30;

/// Coarse market state from the regime symbol's trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    Bull,
    Bear,
    /// Regime symbol history was missing or too short.
    Unknown,
}

impl Regime {
    pub fn from_trend(above: Option<bool>) -> Self {
        match above {
            Some(true) => Self::Bull,
            Some(false) => Self::Bear,
            None => Self::Unknown,
        }
    }

    /// Exposure implied by the regime alone.
    pub fn base_exposure(&self, profile: &Profile) -> f64 {
        match self {
            Self::Bull => profile.target_exposure_bull,
            Self::Bear => profile.target_exposure_bear,
            Self::Unknown => NEUTRAL_EXPOSURE,
        }
    }
}

/// Output of one regime evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeReading {
    pub regime: Regime,
    pub base_exposure: f64,
    /// Fraction of the breadth sample above its own 200-day SMA.
    pub breadth: Option<f64>,
    /// Target exposure in [0, 1].
    pub exposure: f64,
}

/// Map breadth linearly onto [0, 1] between `low` and `high`.
pub fn breadth_dial(breadth: f64, low: f64, high: f64) -> f64 {
    let dial = (breadth - low) / (high - low).max(1e-9);
    dial.clamp(0.0, 1.0)
}

/// Interpolate between the bear and bull targets, clamped to [0, 1].
pub fn blend_exposure(dial: f64, bear: f64, bull: f64) -> f64 {
    (bear + dial * (bull - bear)).clamp(0.0, 1.0)
}

/// Fewest valid readings for a breadth sample of `sample_len` symbols.
pub fn min_breadth_readings(sample_len: usize) -> usize {
    MIN_BREADTH_READINGS.max((0.3 * sample_len as f64) as usize)
}

/// Regime evaluator bound to one profile and settings.
#[derive(Debug, Clone, Copy)]
pub struct RegimeDetector<'a> {
    profile: &'a Profile,
    settings: &'a EngineSettings,
}

impl<'a> RegimeDetector<'a> {
    pub fn new(profile: &'a Profile, settings: &'a EngineSettings) -> Self {
        Self { profile, settings }
    }

    /// Trend of the configured regime symbol.
    pub fn regime<S>(&self, cache: &mut BarCache, source: &S, today: NaiveDate) -> Regime
    where
        S: BarSource + ?Sized,
    {
        let lookback = self.settings.trend_lookback();
        let above = cache
            .get(source, today, &self.settings.regime_symbol, lookback)
            .and_then(|s| above_trend(s.bars(), TREND_SMA_DAYS));
        Regime::from_trend(above)
    }

    /// Fraction of the first `breadth_sample` universe symbols trading above
    /// their 200-day SMA. `None` when too few symbols have a valid reading.
    pub fn breadth<S>(
        &self,
        cache: &mut BarCache,
        source: &S,
        today: NaiveDate,
        universe: &[String],
    ) -> Option<f64>
    where
        S: BarSource + ?Sized,
    {
        let sample = &universe[..universe.len().min(self.settings.breadth_sample)];
        if sample.is_empty() {
            return None;
        }

        let lookback = self.settings.trend_lookback();
        let (mut above, mut total) = (0usize, 0usize);
        for symbol in sample {
            let Some(series) = cache.get(source, today, symbol, lookback) else {
                continue;
            };
            let bars = series.bars();
            let (Some(sma), Some(last)) = (sma_last(bars, TREND_SMA_DAYS), series.last_close())
            else {
                continue;
            };
            total += 1;
            if last > sma {
                above += 1;
            }
        }

        if total < min_breadth_readings(sample.len()) {
            tracing::debug!(total, sample = sample.len(), "[regime] breadth unreliable");
            return None;
        }
        Some(above as f64 / total as f64)
    }

    /// Full reading. Breadth is consulted only when `with_breadth` is set.
    pub fn read<S>(
        &self,
        cache: &mut BarCache,
        source: &S,
        today: NaiveDate,
        universe: &[String],
        with_breadth: bool,
    ) -> RegimeReading
    where
        S: BarSource + ?Sized,
    {
        let regime = self.regime(cache, source, today);
        let base_exposure = regime.base_exposure(self.profile);

        let breadth = if with_breadth {
            self.breadth(cache, source, today, universe)
        } else {
            None
        };

        let exposure = match breadth {
            Some(b) => {
                let dial = breadth_dial(b, self.settings.breadth_low, self.settings.breadth_high);
                blend_exposure(
                    dial,
                    self.profile.target_exposure_bear,
                    self.profile.target_exposure_bull,
                )
            }
            None => base_exposure,
        };

        RegimeReading {
            regime,
            base_exposure,
            breadth,
            exposure,
        }
    }
}
