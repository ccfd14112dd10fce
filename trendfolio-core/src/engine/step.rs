//! The engine and its per-period step.
//!
//! Step order:
//! 1. Trailing stops on long positions (highs of symbols no longer held are dropped)
//! 2. Drawdown breaker on portfolio value
//! 3. Cooldown gate, then rebalance cadence gate
//! 4. Regime reading (with breadth), ranking, sector-capped selection
//! 5. Exits for deselected holdings, risk sizing, delta orders
//!
//! Data problems never abort a step: they degrade individual readings to
//! `None`, which in turn skips the affected symbol.

use super::rebalance::{deselection_exits, delta_orders};
use super::state::{EngineConfig, EngineState, RebalanceOutcome, StepReport};
use crate::data::{BarCache, SymbolMapper};
use crate::domain::{OrderInstruction, Position};
use crate::host::Host;
use crate::indicators::{average_true_range, realized_vol};
use crate::position_management::{GuardInput, PositionGuard};
use crate::profile::{Profile, ProfileError, ProfilePreset};
use crate::ranking::Ranker;
use crate::regime::RegimeDetector;
use crate::selection::select;
use crate::settings::{atr_lookback, vol_lookback, EngineSettings, VOL_LOOKBACK};
use crate::sizers::{RiskSizer, Sizer, SizingInput, SizingTarget};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

/// Signal and portfolio-construction engine for one strategy run.
#[derive(Debug)]
pub struct Engine {
    preset: ProfilePreset,
    profile: Profile,
    settings: EngineSettings,
    universe: Vec<String>,
    symbols: SymbolMapper,
    sizer: RiskSizer,
    state: EngineState,
}

impl Engine {
    /// Build an engine with fresh state.
    pub fn new<H: Host + ?Sized>(config: EngineConfig, host: &H) -> Result<Self, ProfileError> {
        Self::with_state(config, host, EngineState::new())
    }

    /// Build an engine resuming from previously persisted state.
    pub fn with_state<H: Host + ?Sized>(
        config: EngineConfig,
        host: &H,
        mut state: EngineState,
    ) -> Result<Self, ProfileError> {
        let (preset, profile) = config.resolve_profile()?;
        let settings = config.settings;
        let symbols = SymbolMapper::new(host.is_backtesting());

        let raw = match config.universe {
            Some(list) if !list.is_empty() => list,
            _ => host.default_universe(settings.max_universe),
        };
        let universe = canonical_universe(raw);

        state.bar_cache = BarCache::new(symbols, settings.no_lookahead);
        state.sector_by_symbol = host.sector_map();

        let sizer = RiskSizer::from_profile(&profile, settings.min_order_dollars);

        tracing::info!(
            profile = preset.name(),
            fingerprint = %profile.fingerprint(),
            universe = universe.len(),
            sectors = state.sector_by_symbol.len(),
            backtesting = symbols.is_backtesting(),
            no_lookahead = settings.no_lookahead,
            "[INIT]"
        );

        Ok(Self {
            preset,
            profile,
            settings,
            universe,
            symbols,
            sizer,
            state,
        })
    }

    pub fn preset(&self) -> ProfilePreset {
        self.preset
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn universe(&self) -> &[String] {
        &self.universe
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn into_state(self) -> EngineState {
        self.state
    }

    /// Run one trading period. Orders go to the host as they are decided;
    /// the report repeats them.
    pub fn on_trading_iteration<H: Host + ?Sized>(&mut self, host: &mut H) -> StepReport {
        let today = host.current_date();
        self.state.bar_cache.roll_to(today);

        // 1. trailing stops, tracking only longs the host actually holds
        let positions = self.open_positions(&*host);
        let held: HashSet<&str> = positions
            .iter()
            .filter(|p| p.is_long())
            .map(|p| p.symbol.as_str())
            .collect();
        let before = self.state.highest_close.len();
        self.state.highest_close.retain(|s| held.contains(s));
        let pruned = before - self.state.highest_close.len();
        if pruned > 0 {
            tracing::debug!(pruned, "[trail] dropped highs for symbols not held");
        }
        let guard_inputs: Vec<GuardInput> = positions
            .iter()
            .filter(|p| p.is_long())
            .map(|p| {
                let price = self.last_price(&*host, &p.symbol);
                let atr = match price {
                    Some(_) => self.atr(&*host, today, &p.symbol),
                    None => None,
                };
                GuardInput {
                    position: p.clone(),
                    price,
                    atr,
                }
            })
            .collect();
        let guard = PositionGuard::new(&self.profile);
        let trail_exits = guard.trailing_exits(&mut self.state.highest_close, &guard_inputs);
        let mut exited: HashSet<String> = trail_exits.iter().map(|o| o.symbol.clone()).collect();
        let mut submitted = Vec::new();
        self.submit_all(host, trail_exits, &mut submitted);

        // 2. drawdown breaker
        let portfolio_value = host.get_portfolio_value();
        let remaining: Vec<Position> = positions
            .iter()
            .filter(|p| !exited.contains(&p.symbol))
            .cloned()
            .collect();
        let (breaker, liquidations) = guard.drawdown_check(
            &mut self.state.breaker,
            &mut self.state.highest_close,
            portfolio_value,
            today,
            &remaining,
        );
        exited.extend(liquidations.iter().map(|o| o.symbol.clone()));
        self.submit_all(host, liquidations, &mut submitted);

        let mut report = StepReport::new(today, portfolio_value, breaker);

        // 3. gates
        if self.state.in_cooldown(today) {
            tracing::info!(until = ?self.state.breaker.cooldown_until(), "[cooldown]");
            report.in_cooldown = true;
            report.orders = submitted;
            return report;
        }
        if !self
            .state
            .should_rebalance(today, self.profile.rebalance_every_days)
        {
            report.orders = submitted;
            return report;
        }
        report.rebalance_due = true;

        // 4. regime, ranking, selection
        let reading = RegimeDetector::new(&self.profile, &self.settings).read(
            &mut self.state.bar_cache,
            &*host,
            today,
            &self.universe,
            true,
        );
        let scores = Ranker::new(&self.profile, &self.settings).rank(
            &mut self.state.bar_cache,
            &*host,
            today,
            &self.universe,
        );
        let ranked: Vec<String> = scores.into_iter().map(|s| s.symbol).collect();
        let selected = select(
            &ranked,
            self.profile.max_positions,
            self.profile.max_sector_positions,
            &self.state.sector_by_symbol,
        );
        let head: Vec<&String> = selected.iter().take(8).collect();
        tracing::info!(
            n = selected.len(),
            exposure = reading.exposure,
            regime = ?reading.regime,
            breadth = ?reading.breadth,
            first = ?head,
            "[select]"
        );

        // 5. orders
        let (outcome, targets) = self.rebalance(
            host,
            today,
            &selected,
            reading.exposure,
            &exited,
            &mut submitted,
        );
        report.regime = Some(reading);
        report.ranked = ranked;
        report.selected = selected;
        report.targets = targets;
        report.outcome = Some(outcome);
        report.orders = submitted;
        self.state.last_rebalance_day = Some(today);
        report
    }

    fn rebalance<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        today: NaiveDate,
        selected: &[String],
        exposure: f64,
        exited: &HashSet<String>,
        submitted: &mut Vec<OrderInstruction>,
    ) -> (RebalanceOutcome, Vec<SizingTarget>) {
        if selected.is_empty() {
            tracing::info!("[rebalance] none selected -> hold");
            return (RebalanceOutcome::NoneSelected, Vec::new());
        }
        let exposure = exposure.clamp(0.0, 1.0);
        let portfolio_value = host.get_portfolio_value();

        // exits for everything no longer selected
        let selected_set: HashSet<&str> = selected.iter().map(|s| s.as_str()).collect();
        let positions: Vec<Position> = self
            .open_positions(&*host)
            .into_iter()
            .filter(|p| !exited.contains(&p.symbol))
            .collect();
        let exits = deselection_exits(&positions, &selected_set, &mut self.state.highest_close);
        self.submit_all(host, exits, submitted);

        // sizing
        let inputs: Vec<SizingInput> = selected
            .iter()
            .filter(|s| !exited.contains(*s))
            .map(|symbol| SizingInput {
                symbol: symbol.clone(),
                price: self.last_price(&*host, symbol),
                atr: self.atr(&*host, today, symbol),
                vol: self.realized_vol(&*host, today, symbol),
            })
            .collect();
        let targets = self.sizer.size(&inputs, portfolio_value, exposure);
        if targets.is_empty() {
            tracing::info!(
                "[rebalance] no targets after sizing -> cash \
                 (try raising total_risk_budget or target_exposure_bear)"
            );
            return (RebalanceOutcome::HoldCash, Vec::new());
        }

        // deltas against current holdings
        let current: HashMap<String, i64> = targets
            .iter()
            .filter_map(|t| {
                host.get_position(&self.symbols.to_source(&t.symbol))
                    .map(|p| (t.symbol.clone(), p.whole_shares()))
            })
            .collect();
        let orders = delta_orders(
            &targets,
            &current,
            self.settings.min_order_dollars,
            &mut self.state.highest_close,
        );
        self.submit_all(host, orders, submitted);

        let invested: f64 = targets.iter().map(|t| t.notional()).sum();
        let invested_fraction = if portfolio_value > 0.0 {
            invested / portfolio_value
        } else {
            0.0
        };
        tracing::info!(
            held = targets.len(),
            invested = invested_fraction,
            risk_budget = self.profile.total_risk_budget,
            regime_exposure = exposure,
            sizer = self.sizer.name(),
            "[rebalance]"
        );
        let outcome = RebalanceOutcome::Rebalanced {
            held: targets.len(),
            invested_fraction,
        };
        (outcome, targets)
    }

    /// Nonzero host positions in canonical spelling.
    fn open_positions<H: Host + ?Sized>(&self, host: &H) -> Vec<Position> {
        host.get_open_positions()
            .into_iter()
            .filter(|p| !p.is_flat())
            .map(|p| Position::new(self.symbols.to_canonical(&p.symbol), p.quantity))
            .collect()
    }

    fn last_price<H: Host + ?Sized>(&self, host: &H, symbol: &str) -> Option<f64> {
        host.get_last_price(&self.symbols.to_source(symbol))
            .filter(|p| p.is_finite() && *p > 0.0)
    }

    fn atr<H: Host + ?Sized>(&mut self, host: &H, today: NaiveDate, symbol: &str) -> Option<f64> {
        let period = self.profile.atr_period;
        self.state
            .bar_cache
            .get(host, today, symbol, atr_lookback(period))
            .and_then(|s| average_true_range(s.bars(), period))
    }

    fn realized_vol<H: Host + ?Sized>(
        &mut self,
        host: &H,
        today: NaiveDate,
        symbol: &str,
    ) -> Option<f64> {
        self.state
            .bar_cache
            .get(host, today, symbol, vol_lookback())
            .and_then(|s| realized_vol(s.bars(), VOL_LOOKBACK))
    }

    /// Translate to source spelling, hand to the host, and record.
    fn submit_all<H: Host + ?Sized>(
        &self,
        host: &mut H,
        orders: Vec<OrderInstruction>,
        submitted: &mut Vec<OrderInstruction>,
    ) {
        for mut order in orders {
            order.symbol = self.symbols.to_source(&order.symbol);
            tracing::info!(%order, reason = ?order.reason, "[order]");
            host.submit_order(&order);
            submitted.push(order);
        }
    }
}

/// Upper-case, trim, drop blanks and duplicates; keep first-seen order.
fn canonical_universe(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}
