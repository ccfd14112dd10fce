//! Cross-sectional ranking by trend-confirmed momentum.
//!
//! Score = 0.50·mom12 + 0.30·mom6 + 0.20·mom3 − vol_penalty·realized_vol
//!
//! Only symbols in a confirmed uptrend (last close strictly above the
//! 200-day SMA) and priced at or above `min_price` are scored. Output is
//! sorted by descending score; ties keep universe order.
//!
//! Bars are always fetched on the calling thread through the cache. When
//! parallel scoring is enabled the pure per-symbol work runs on the rayon
//! pool, and results are collected back in universe order, so the output is
//! identical to a sequential pass.

use crate::data::{BarCache, BarSource};
use crate::domain::{Bar, BarSeries};
use crate::indicators::{momentum, realized_vol, sma_last};
use crate::profile::Profile;
use crate::settings::{
    vol_lookback, EngineSettings, HISTORY_SLACK, MOM_12M, MOM_3M, MOM_6M, TREND_SMA_DAYS,
    VOL_LOOKBACK,
};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Momentum blend weights for 12/6/3 months.
pub const MOMENTUM_WEIGHTS: [f64; 3] = [0.50, 0.30, 0.20];

/// Why a symbol was left out of the ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    NoData,
    InsufficientHistory { bars: usize, needed: usize },
    BelowMinPrice { close: f64 },
    TrendUnavailable,
    BelowTrend { close: f64, sma: f64 },
    MomentumUnavailable,
    VolUnavailable,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => write!(f, "no data"),
            Self::InsufficientHistory { bars, needed } => {
                write!(f, "history {bars} < {needed}")
            }
            Self::BelowMinPrice { close } => write!(f, "close {close:.2} below min price"),
            Self::TrendUnavailable => write!(f, "trend sma unavailable"),
            Self::BelowTrend { close, sma } => write!(f, "close {close:.2} <= sma {sma:.2}"),
            Self::MomentumUnavailable => write!(f, "momentum unavailable"),
            Self::VolUnavailable => write!(f, "volatility unavailable"),
        }
    }
}

/// A scored candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub symbol: String,
    pub value: f64,
}

/// Trend filter plus the momentum blend, before the volatility penalty.
///
/// `min_bars` is the shortest series accepted.
pub fn momentum_component(bars: &[Bar], min_price: f64, min_bars: usize) -> Result<f64, Rejection> {
    if bars.len() < min_bars {
        return Err(Rejection::InsufficientHistory {
            bars: bars.len(),
            needed: min_bars,
        });
    }
    let close = bars.last().map(|b| b.close).ok_or(Rejection::NoData)?;
    if close < min_price {
        return Err(Rejection::BelowMinPrice { close });
    }
    let sma = sma_last(bars, TREND_SMA_DAYS).ok_or(Rejection::TrendUnavailable)?;
    if close <= sma {
        return Err(Rejection::BelowTrend { close, sma });
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let mut blend = 0.0;
    for (lookback, weight) in [MOM_12M, MOM_6M, MOM_3M].into_iter().zip(MOMENTUM_WEIGHTS) {
        blend += weight * momentum(&closes, lookback).ok_or(Rejection::MomentumUnavailable)?;
    }
    Ok(blend)
}

/// Final score from the momentum blend and realized volatility.
pub fn composite_score(momentum_blend: f64, vol: f64, vol_penalty: f64) -> f64 {
    momentum_blend - vol_penalty * vol
}

/// Universe ranker bound to one profile and settings.
#[derive(Debug, Clone, Copy)]
pub struct Ranker<'a> {
    profile: &'a Profile,
    settings: &'a EngineSettings,
}

impl<'a> Ranker<'a> {
    pub fn new(profile: &'a Profile, settings: &'a EngineSettings) -> Self {
        Self { profile, settings }
    }

    /// Shortest ranking series accepted.
    pub fn min_bars(&self) -> usize {
        self.settings.rank_lookback() - HISTORY_SLACK
    }

    /// Score the universe; best first.
    pub fn rank<S>(
        &self,
        cache: &mut BarCache,
        source: &S,
        today: NaiveDate,
        universe: &[String],
    ) -> Vec<Score>
    where
        S: BarSource + ?Sized,
    {
        let lookback = self.settings.rank_lookback();
        let fetched: Vec<Option<Arc<BarSeries>>> = universe
            .iter()
            .map(|symbol| cache.get(source, today, symbol, lookback))
            .collect();

        let min_price = self.profile.min_price;
        let min_bars = self.min_bars();
        let stage_one = |series: &Option<Arc<BarSeries>>| match series {
            Some(s) => momentum_component(s.bars(), min_price, min_bars),
            None => Err(Rejection::NoData),
        };
        let blends: Vec<Result<f64, Rejection>> = if self.settings.parallel_scoring {
            fetched.par_iter().map(stage_one).collect()
        } else {
            fetched.iter().map(stage_one).collect()
        };

        let mut passed_trend = 0usize;
        let mut scored = Vec::new();
        for (symbol, blend) in universe.iter().zip(blends) {
            if matches!(blend, Ok(_) | Err(Rejection::MomentumUnavailable)) {
                passed_trend += 1;
            }
            let result = blend.and_then(|b| {
                let vol = cache
                    .get(source, today, symbol, vol_lookback())
                    .and_then(|s| realized_vol(s.bars(), VOL_LOOKBACK))
                    .ok_or(Rejection::VolUnavailable)?;
                Ok(composite_score(b, vol, self.profile.vol_penalty))
            });
            match result {
                Ok(value) => scored.push(Score {
                    symbol: symbol.clone(),
                    value,
                }),
                Err(reason) => tracing::debug!(%symbol, %reason, "[rank] rejected"),
            }
        }

        sort_scores(&mut scored);
        tracing::info!(passed_trend, scored = scored.len(), "[rank]");
        scored
    }
}

/// Stable descending sort; ties keep their current order.
pub fn sort_scores(scores: &mut [Score]) {
    scores.sort_by(|a, b| b.value.total_cmp(&a.value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn ramp(n: usize, start: f64, step: f64) -> Vec<f64> {
        (0..n).map(|i| start + step * i as f64).collect()
    }

    #[test]
    fn uptrend_passes_and_blends_momentum() {
        let closes = ramp(282, 50.0, 0.5);
        let bars = make_bars(&closes);
        let blend = momentum_component(&bars, 5.0, 277).unwrap();

        let last = *closes.last().unwrap();
        let m = |lb: usize| last / closes[closes.len() - 1 - lb] - 1.0;
        let expected = 0.5 * m(252) + 0.3 * m(126) + 0.2 * m(63);
        assert!((blend - expected).abs() < 1e-12);
    }

    #[test]
    fn rejections() {
        let down = make_bars(&ramp(282, 300.0, -0.5));
        assert!(matches!(
            momentum_component(&down, 5.0, 277),
            Err(Rejection::BelowTrend { .. })
        ));

        let cheap = make_bars(&ramp(282, 1.0, 0.01));
        assert!(matches!(
            momentum_component(&cheap, 5.0, 277),
            Err(Rejection::BelowMinPrice { .. })
        ));

        let short = make_bars(&ramp(250, 50.0, 0.5));
        assert_eq!(
            momentum_component(&short, 5.0, 277),
            Err(Rejection::InsufficientHistory {
                bars: 250,
                needed: 277
            })
        );

        // long enough for the slack but not for 12-month momentum
        let almost = make_bars(&ramp(252, 50.0, 0.5));
        assert_eq!(
            momentum_component(&almost, 5.0, 200),
            Err(Rejection::MomentumUnavailable)
        );
    }

    #[test]
    fn flat_series_is_not_above_trend() {
        let flat = make_bars(&[20.0; 282]);
        assert!(matches!(
            momentum_component(&flat, 5.0, 277),
            Err(Rejection::BelowTrend { .. })
        ));
    }

    #[test]
    fn score_penalizes_volatility() {
        assert!((composite_score(0.4, 0.2, 0.25) - 0.35).abs() < 1e-12);
        assert!(composite_score(0.4, 0.4, 0.25) < composite_score(0.4, 0.2, 0.25));
    }

    #[test]
    fn sort_is_descending_and_stable() {
        let mut scores: Vec<Score> = [("A", 0.1), ("B", 0.3), ("C", 0.1), ("D", 0.3)]
            .into_iter()
            .map(|(s, v)| Score {
                symbol: s.into(),
                value: v,
            })
            .collect();
        sort_scores(&mut scores);
        let order: Vec<&str> = scores.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(order, vec!["B", "D", "A", "C"]);
    }
}
