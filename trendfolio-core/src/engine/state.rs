//! Engine configuration, persistent state, and per-step report types.

use crate::data::{BarCache, SectorMap};
use crate::domain::OrderInstruction;
use crate::position_management::{BreakerDecision, DrawdownBreaker, TrailingStops};
use crate::profile::{Profile, ProfileError, ProfileOverrides, ProfilePreset, DEFAULT_PROFILE};
use crate::regime::RegimeReading;
use crate::settings::EngineSettings;
use crate::sizers::SizingTarget;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Everything needed to construct an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Preset name; unknown names fall back to the default preset.
    pub profile: String,
    pub overrides: ProfileOverrides,
    /// Explicit universe; `None` asks the host for its default list.
    pub universe: Option<Vec<String>>,
    pub settings: EngineSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profile: DEFAULT_PROFILE.to_string(),
            overrides: ProfileOverrides::default(),
            universe: None,
            settings: EngineSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            ..Self::default()
        }
    }

    pub fn with_universe<I, S>(mut self, universe: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.universe = Some(universe.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_overrides(mut self, overrides: ProfileOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Effective profile: resolved preset with validated overrides applied.
    pub fn resolve_profile(&self) -> Result<(ProfilePreset, Profile), ProfileError> {
        let preset = ProfilePreset::resolve(&self.profile);
        let profile = preset.profile().with_overrides(&self.overrides)?;
        Ok((preset, profile))
    }
}

/// Mutable strategy state, owned exclusively by one engine.
///
/// The bar cache and sector map are runtime-only; everything else survives a
/// JSON round trip so a host can resume between sessions.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EngineState {
    pub last_rebalance_day: Option<NaiveDate>,
    /// Highest close since entry, per held symbol.
    #[serde(default)]
    pub highest_close: TrailingStops,
    /// Equity peak, cooldown end and arming flag.
    #[serde(flatten)]
    pub breaker: DrawdownBreaker,
    #[serde(skip)]
    pub bar_cache: BarCache,
    #[serde(skip)]
    pub sector_by_symbol: SectorMap,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebalance when none has happened yet or at least `every_days`
    /// calendar days have passed since the last one.
    pub fn should_rebalance(&self, today: NaiveDate, every_days: u32) -> bool {
        match self.last_rebalance_day {
            None => true,
            Some(last) => (today - last).num_days() >= i64::from(every_days),
        }
    }

    pub fn in_cooldown(&self, today: NaiveDate) -> bool {
        self.breaker.in_cooldown(today)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// How the rebalance stage of a step ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RebalanceOutcome {
    /// Nothing ranked; existing positions are left to the guards.
    NoneSelected,
    /// Selection existed but nothing survived sizing.
    HoldCash,
    Rebalanced {
        held: usize,
        invested_fraction: f64,
    },
}

/// What one trading step observed and did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub date: NaiveDate,
    pub portfolio_value: f64,
    pub breaker: BreakerDecision,
    pub in_cooldown: bool,
    pub rebalance_due: bool,
    pub regime: Option<RegimeReading>,
    pub ranked: Vec<String>,
    pub selected: Vec<String>,
    pub targets: Vec<SizingTarget>,
    pub outcome: Option<RebalanceOutcome>,
    /// Every instruction submitted this step, in submission order.
    pub orders: Vec<OrderInstruction>,
}

impl StepReport {
    pub(crate) fn new(date: NaiveDate, portfolio_value: f64, breaker: BreakerDecision) -> Self {
        Self {
            date,
            portfolio_value,
            breaker,
            in_cooldown: false,
            rebalance_due: false,
            regime: None,
            ranked: Vec::new(),
            selected: Vec::new(),
            targets: Vec::new(),
            outcome: None,
            orders: Vec::new(),
        }
    }

    pub fn rebalanced(&self) -> bool {
        self.outcome.is_some()
    }
}
