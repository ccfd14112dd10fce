//! Risk profiles — immutable named parameter bundles.
//!
//! Two presets ship with the engine:
//! - **Balanced**: ten names, two-week cadence, 7% total risk budget (default)
//! - **MaxReturn**: seven names, ten-day cadence, 10% total risk budget
//!
//! A profile is chosen once by name at engine construction. Field overrides
//! never mutate a profile in place: [`Profile::with_overrides`] derives a new,
//! validated instance and leaves the base untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the preset used when a requested name is unknown.
pub const DEFAULT_PROFILE: &str = "balanced";

/// Parameter bundle driving selection, sizing and risk controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    // Portfolio construction
    pub max_positions: usize,
    pub rebalance_every_days: u32,

    // Risk + exposure
    /// Loss at the trailing stop per entry, as a fraction of equity.
    pub risk_per_entry_cap: f64,
    /// Cap on the sum of per-position risk at the stop.
    pub total_risk_budget: f64,
    pub target_exposure_bull: f64,
    /// Exposure when risk-off; nonzero to avoid no-trade deadlocks.
    pub target_exposure_bear: f64,

    // Filters + scoring
    pub min_price: f64,
    pub vol_penalty: f64,

    // Diversification
    pub max_sector_positions: usize,

    // Stops
    pub atr_period: usize,
    /// Trailing distance = ATR * mult.
    pub atr_mult_trail: f64,

    // Safety
    pub max_drawdown: f64,
    pub cooldown_days: u32,
}

/// Named presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProfilePreset {
    #[default]
    Balanced,
    MaxReturn,
}

impl ProfilePreset {
    pub const ALL: [ProfilePreset; 2] = [Self::Balanced, Self::MaxReturn];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::MaxReturn => "max_return",
        }
    }

    /// Exact lookup; names are trimmed and matched case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|p| p.name() == wanted)
    }

    /// Lookup with fallback: unknown names resolve to [`DEFAULT_PROFILE`].
    pub fn resolve(name: &str) -> Self {
        match Self::from_name(name) {
            Some(preset) => preset,
            None => {
                tracing::warn!(
                    requested = name,
                    fallback = DEFAULT_PROFILE,
                    "unknown risk profile, using default"
                );
                Self::default()
            }
        }
    }

    pub fn profile(&self) -> Profile {
        match self {
            Self::Balanced => Profile {
                max_positions: 10,
                rebalance_every_days: 14,
                risk_per_entry_cap: 0.01,
                total_risk_budget: 0.07,
                target_exposure_bull: 0.98,
                target_exposure_bear: 0.20,
                min_price: 5.0,
                vol_penalty: 0.25,
                max_sector_positions: 3,
                atr_period: 14,
                atr_mult_trail: 2.7,
                max_drawdown: 0.20,
                cooldown_days: 10,
            },
            Self::MaxReturn => Profile {
                max_positions: 7,
                rebalance_every_days: 10,
                risk_per_entry_cap: 0.01,
                total_risk_budget: 0.10,
                target_exposure_bull: 0.99,
                target_exposure_bear: 0.30,
                min_price: 5.0,
                vol_penalty: 0.15,
                max_sector_positions: 2,
                atr_period: 14,
                atr_mult_trail: 3.0,
                max_drawdown: 0.20,
                cooldown_days: 7,
            },
        }
    }
}

/// Per-field overrides. `None` keeps the base value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileOverrides {
    pub max_positions: Option<usize>,
    pub rebalance_every_days: Option<u32>,
    pub risk_per_entry_cap: Option<f64>,
    pub total_risk_budget: Option<f64>,
    pub target_exposure_bull: Option<f64>,
    pub target_exposure_bear: Option<f64>,
    pub min_price: Option<f64>,
    pub vol_penalty: Option<f64>,
    pub max_sector_positions: Option<usize>,
    pub atr_period: Option<usize>,
    pub atr_mult_trail: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub cooldown_days: Option<u32>,
}

impl ProfileOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ProfileError {
    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },

    #[error("{field} must be positive and finite (got {value})")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must lie in [{min}, {max}] (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl Profile {
    /// Resolve a profile by name (falling back to the default preset) and
    /// apply overrides.
    pub fn from_name(name: &str, overrides: &ProfileOverrides) -> Result<Self, ProfileError> {
        ProfilePreset::resolve(name).profile().with_overrides(overrides)
    }

    /// Derive a new profile with the given fields replaced.
    pub fn with_overrides(&self, overrides: &ProfileOverrides) -> Result<Self, ProfileError> {
        let o = overrides;
        let derived = Profile {
            max_positions: o.max_positions.unwrap_or(self.max_positions),
            rebalance_every_days: o.rebalance_every_days.unwrap_or(self.rebalance_every_days),
            risk_per_entry_cap: o.risk_per_entry_cap.unwrap_or(self.risk_per_entry_cap),
            total_risk_budget: o.total_risk_budget.unwrap_or(self.total_risk_budget),
            target_exposure_bull: o.target_exposure_bull.unwrap_or(self.target_exposure_bull),
            target_exposure_bear: o.target_exposure_bear.unwrap_or(self.target_exposure_bear),
            min_price: o.min_price.unwrap_or(self.min_price),
            vol_penalty: o.vol_penalty.unwrap_or(self.vol_penalty),
            max_sector_positions: o.max_sector_positions.unwrap_or(self.max_sector_positions),
            atr_period: o.atr_period.unwrap_or(self.atr_period),
            atr_mult_trail: o.atr_mult_trail.unwrap_or(self.atr_mult_trail),
            max_drawdown: o.max_drawdown.unwrap_or(self.max_drawdown),
            cooldown_days: o.cooldown_days.unwrap_or(self.cooldown_days),
        };
        derived.validate()?;
        Ok(derived)
    }

    /// Check that budgets and caps are usable.
    pub fn validate(&self) -> Result<(), ProfileError> {
        let counts = [
            ("max_positions", self.max_positions),
            ("max_sector_positions", self.max_sector_positions),
            ("atr_period", self.atr_period),
            ("rebalance_every_days", self.rebalance_every_days as usize),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(ProfileError::ZeroCount { field });
            }
        }

        let positives = [
            ("risk_per_entry_cap", self.risk_per_entry_cap),
            ("total_risk_budget", self.total_risk_budget),
            ("min_price", self.min_price),
            ("atr_mult_trail", self.atr_mult_trail),
        ];
        for (field, value) in positives {
            if !(value.is_finite() && value > 0.0) {
                return Err(ProfileError::NotPositive { field, value });
            }
        }

        let ranged = [
            ("target_exposure_bull", self.target_exposure_bull, 0.0, 1.0),
            ("target_exposure_bear", self.target_exposure_bear, 0.0, 1.0),
            ("vol_penalty", self.vol_penalty, 0.0, f64::MAX),
        ];
        for (field, value, min, max) in ranged {
            if !(value.is_finite() && value >= min && value <= max) {
                return Err(ProfileError::OutOfRange {
                    field,
                    value,
                    min,
                    max,
                });
            }
        }

        if !(self.max_drawdown.is_finite() && self.max_drawdown > 0.0 && self.max_drawdown <= 1.0)
        {
            return Err(ProfileError::OutOfRange {
                field: "max_drawdown",
                value: self.max_drawdown,
                min: 0.0,
                max: 1.0,
            });
        }

        Ok(())
    }

    /// BLAKE3 hash of the canonical JSON form, for identifying runs in logs.
    pub fn fingerprint(&self) -> String {
        // Profile holds only plain numbers, so serialization cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex()[..16].to_string()
    }
}

impl Default for Profile {
    fn default() -> Self {
        ProfilePreset::default().profile()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
