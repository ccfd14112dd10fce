//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Frozen profile update: overrides change only the named fields
//! 2. Ranking filter: nothing ranked is below min price or at/below trend
//! 3. Selection caps: slot count, and sector caps unless the fallback fills
//! 4. Sizing ceilings: risk and capital bounds, total within exposure
//! 5. Trailing stop: fires exactly once on the cross and clears the high
//! 6. Drawdown breaker: one trip per breach

use chrono::NaiveDate;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use trendfolio_core::data::{BarCache, BarSource, DataError, SectorMap, SymbolMapper};
use trendfolio_core::domain::Bar;
use trendfolio_core::indicators::sma_last;
use trendfolio_core::position_management::{
    BreakerDecision, DrawdownBreaker, TrailDecision, TrailingStops,
};
use trendfolio_core::profile::{Profile, ProfileOverrides, ProfilePreset};
use trendfolio_core::ranking::Ranker;
use trendfolio_core::selection::select;
use trendfolio_core::settings::{EngineSettings, TREND_SMA_DAYS};
use trendfolio_core::sizers::{RiskSizer, Sizer, SizingInput};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_fraction() -> impl Strategy<Value = f64> {
    (0.001..1.0_f64).prop_map(|f| (f * 1000.0).round() / 1000.0)
}

fn arb_price() -> impl Strategy<Value = f64> {
    (5.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_overrides() -> impl Strategy<Value = ProfileOverrides> {
    (
        prop::option::of(1usize..30),
        prop::option::of(1u32..60),
        prop::option::of(arb_fraction()),
        prop::option::of(arb_fraction()),
        prop::option::of(arb_fraction()),
        prop::option::of(1usize..10),
        prop::option::of(0.5..6.0_f64),
        prop::option::of(0u32..30),
    )
        .prop_map(
            |(max_pos, every, cap, budget, bear, sector, mult, cooldown)| ProfileOverrides {
                max_positions: max_pos,
                rebalance_every_days: every,
                risk_per_entry_cap: cap,
                total_risk_budget: budget,
                target_exposure_bear: bear,
                max_sector_positions: sector,
                atr_mult_trail: mult,
                cooldown_days: cooldown,
                ..ProfileOverrides::default()
            },
        )
}

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap() + chrono::Duration::days(offset)
}

// ── 1. Frozen profile update ─────────────────────────────────────────

proptest! {
    #[test]
    fn overrides_touch_only_named_fields(o in arb_overrides(), max_return in any::<bool>()) {
        let preset = if max_return { ProfilePreset::MaxReturn } else { ProfilePreset::Balanced };
        let base = preset.profile();
        let derived = base.with_overrides(&o).unwrap();

        // base untouched
        prop_assert_eq!(base, preset.profile());

        prop_assert_eq!(derived.max_positions, o.max_positions.unwrap_or(base.max_positions));
        prop_assert_eq!(
            derived.rebalance_every_days,
            o.rebalance_every_days.unwrap_or(base.rebalance_every_days)
        );
        prop_assert_eq!(
            derived.risk_per_entry_cap,
            o.risk_per_entry_cap.unwrap_or(base.risk_per_entry_cap)
        );
        prop_assert_eq!(
            derived.total_risk_budget,
            o.total_risk_budget.unwrap_or(base.total_risk_budget)
        );
        prop_assert_eq!(
            derived.target_exposure_bear,
            o.target_exposure_bear.unwrap_or(base.target_exposure_bear)
        );
        prop_assert_eq!(
            derived.max_sector_positions,
            o.max_sector_positions.unwrap_or(base.max_sector_positions)
        );
        prop_assert_eq!(derived.atr_mult_trail, o.atr_mult_trail.unwrap_or(base.atr_mult_trail));
        prop_assert_eq!(derived.cooldown_days, o.cooldown_days.unwrap_or(base.cooldown_days));

        // fields never overridden here
        prop_assert_eq!(derived.target_exposure_bull, base.target_exposure_bull);
        prop_assert_eq!(derived.min_price, base.min_price);
        prop_assert_eq!(derived.vol_penalty, base.vol_penalty);
        prop_assert_eq!(derived.atr_period, base.atr_period);
        prop_assert_eq!(derived.max_drawdown, base.max_drawdown);
    }
}

// ── 2. Ranking filter ────────────────────────────────────────────────

/// Random-walk universe keyed by symbol; last bar dated the day before `today`.
struct WalkSource {
    series: HashMap<String, Vec<Bar>>,
}

impl WalkSource {
    fn new(seed: u64, symbols: usize, len: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut series = HashMap::new();
        for s in 0..symbols {
            let drift: f64 = rng.gen_range(-0.002..0.003);
            let mut price: f64 = rng.gen_range(2.0..200.0);
            let bars = (0..len)
                .map(|i| {
                    let r: f64 = drift + rng.gen_range(-0.03..0.03);
                    let open = price;
                    price = (price * (1.0 + r)).max(0.5);
                    Bar {
                        date: day(i as i64),
                        open,
                        high: open.max(price) * 1.01,
                        low: open.min(price) * 0.99,
                        close: price,
                        volume: 10_000,
                    }
                })
                .collect();
            series.insert(format!("S{s:02}"), bars);
        }
        Self { series }
    }

    fn symbols(&self) -> Vec<String> {
        let mut v: Vec<String> = self.series.keys().cloned().collect();
        v.sort();
        v
    }
}

impl BarSource for WalkSource {
    fn get_bars(&self, symbol: &str, length: usize) -> Result<Vec<Bar>, DataError> {
        let bars = self.series.get(symbol).ok_or_else(|| DataError::SymbolNotFound {
            symbol: symbol.into(),
        })?;
        Ok(bars[bars.len().saturating_sub(length)..].to_vec())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn ranked_symbols_pass_price_and_trend(seed in any::<u64>(), min_price in 1.0..50.0_f64) {
        let source = WalkSource::new(seed, 12, 300);
        let universe = source.symbols();
        let profile = Profile { min_price, ..Profile::default() };
        let settings = EngineSettings::default();
        let today = day(300);

        let mut cache = BarCache::new(SymbolMapper::new(false), true);
        let scores = Ranker::new(&profile, &settings).rank(&mut cache, &source, today, &universe);

        for w in scores.windows(2) {
            prop_assert!(w[0].value >= w[1].value);
        }
        for score in &scores {
            let series = cache.get(&source, today, &score.symbol, settings.rank_lookback()).unwrap();
            let last = series.last_close().unwrap();
            let sma = sma_last(series.bars(), TREND_SMA_DAYS).unwrap();
            prop_assert!(last >= min_price);
            prop_assert!(last > sma);
        }
    }

    #[test]
    fn parallel_and_sequential_rankings_agree(seed in any::<u64>()) {
        let source = WalkSource::new(seed, 16, 290);
        let universe = source.symbols();
        let profile = Profile::default();
        let parallel = EngineSettings::default();
        let sequential = EngineSettings { parallel_scoring: false, ..EngineSettings::default() };

        let mut c1 = BarCache::new(SymbolMapper::new(false), true);
        let mut c2 = BarCache::new(SymbolMapper::new(false), true);
        let a = Ranker::new(&profile, &parallel).rank(&mut c1, &source, day(290), &universe);
        let b = Ranker::new(&profile, &sequential).rank(&mut c2, &source, day(290), &universe);
        prop_assert_eq!(a, b);
    }
}

// ── 3. Selection caps ────────────────────────────────────────────────

proptest! {
    #[test]
    fn selection_respects_slots_and_caps(
        sectors in prop::collection::vec(0usize..4, 0..40),
        max_positions in 1usize..15,
        cap in 1usize..5,
    ) {
        let ranked: Vec<String> = (0..sectors.len()).map(|i| format!("T{i:02}")).collect();
        let map = SectorMap::from_pairs(
            ranked.iter().zip(&sectors).map(|(s, sec)| (s.clone(), format!("SEC{sec}"))),
        );
        let picked = select(&ranked, max_positions, cap, &map);

        prop_assert!(picked.len() <= max_positions);
        prop_assert_eq!(picked.len(), max_positions.min(ranked.len()));

        let mut unique = picked.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(unique.len(), picked.len());

        // how many could be taken with caps honored
        let mut per: HashMap<usize, usize> = HashMap::new();
        let mut capped_capacity = 0;
        for sec in &sectors {
            let c = per.entry(*sec).or_insert(0);
            if *c < cap {
                *c += 1;
                capped_capacity += 1;
            }
        }
        if capped_capacity >= picked.len() {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for s in &picked {
                *counts.entry(map.sector_of(s)).or_insert(0) += 1;
            }
            prop_assert!(counts.values().all(|&n| n <= cap));
        }
    }
}

// ── 4. Sizing ceilings ───────────────────────────────────────────────

proptest! {
    #[test]
    fn sized_shares_respect_both_ceilings(
        pv in 10_000.0..2_000_000.0_f64,
        exposure in 0.0..1.0_f64,
        budget in 0.01..0.2_f64,
        cap in 0.002..0.05_f64,
        mult in 1.0..4.0_f64,
        names in prop::collection::vec((arb_price(), 0.1..20.0_f64, 0.05..1.5_f64), 1..12),
    ) {
        let sizer = RiskSizer::new(budget, cap, mult, 150.0);
        let inputs: Vec<SizingInput> = names
            .iter()
            .enumerate()
            .map(|(i, (px, atr, vol))| SizingInput {
                symbol: format!("N{i}"),
                price: Some(*px),
                atr: Some(*atr),
                vol: Some(*vol),
            })
            .collect();
        let targets = sizer.size(&inputs, pv, exposure);

        let mut invested = 0.0;
        for t in &targets {
            let input = inputs.iter().find(|i| i.symbol == t.symbol).unwrap();
            let (px, atr) = (input.price.unwrap(), input.atr.unwrap());
            let by_risk = (sizer.risk_dollars(pv, t.weight) / sizer.stop_distance(atr)).floor();
            let by_capital = (pv * exposure * t.weight / px).floor();

            prop_assert!(t.shares > 0);
            prop_assert!(t.shares as f64 <= by_risk);
            prop_assert!(t.shares as f64 <= by_capital);
            prop_assert!(t.risk_dollars <= pv * cap + 1e-6);
            prop_assert!(t.notional() >= 150.0);
            invested += t.notional();
        }
        prop_assert!(invested <= pv * exposure + 1e-6);
    }
}

// ── 5. Trailing stop ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn trailing_stop_fires_once_on_cross(
        entry in arb_price(),
        atr in 0.1..10.0_f64,
        mult in 1.0..4.0_f64,
        path in prop::collection::vec(-0.05..0.05_f64, 1..60),
    ) {
        let mut stops = TrailingStops::new();
        stops.observe("X", entry);

        let mut price = entry;
        let mut fired = 0;
        for r in path {
            if !stops.contains("X") {
                break;
            }
            price *= 1.0 + r;
            let prior_high = stops.high("X").unwrap();
            let high = prior_high.max(price);
            match stops.check("X", price, Some(atr), mult) {
                TrailDecision::Exit { stop, .. } => {
                    prop_assert!(price <= high - mult * atr + 1e-9);
                    prop_assert!((stop - (high - mult * atr)).abs() < 1e-9);
                    prop_assert!(!stops.contains("X"));
                    fired += 1;
                }
                TrailDecision::Hold { .. } => {
                    prop_assert!(price > high - mult * atr - 1e-9);
                }
                TrailDecision::NoAtr { .. } => prop_assert!(false, "atr was given"),
            }
        }
        prop_assert!(fired <= 1);
    }
}

// ── 6. Drawdown breaker ──────────────────────────────────────────────

proptest! {
    #[test]
    fn breaker_trips_once_per_breach(
        returns in prop::collection::vec(-0.08..0.06_f64, 2..120),
        max_dd in 0.05..0.5_f64,
    ) {
        let mut breaker = DrawdownBreaker::new();
        let mut value = 100_000.0;
        let mut peak = value;
        let mut tripped_since_peak = false;
        breaker.observe(value, day(0), max_dd, 5);

        for (i, r) in returns.into_iter().enumerate() {
            value *= 1.0 + r;
            let decision = breaker.observe(value, day(i as i64 + 1), max_dd, 5);
            match decision {
                BreakerDecision::NewPeak => {
                    prop_assert!(value > peak);
                    peak = value;
                    tripped_since_peak = false;
                }
                BreakerDecision::Tripped { drawdown, .. } => {
                    prop_assert!(!tripped_since_peak);
                    prop_assert!(drawdown >= max_dd);
                    tripped_since_peak = true;
                }
                BreakerDecision::Within { drawdown } => {
                    prop_assert!(drawdown < max_dd || tripped_since_peak);
                }
                BreakerDecision::Initialized => prop_assert!(false, "already initialized"),
            }
            prop_assert_eq!(breaker.equity_peak(), Some(peak));
        }
    }
}
