//! Serializable run configuration.
//!
//! One TOML file describes a signal run: which profile and universe the
//! engine uses, where the bar CSVs live, and the portfolio snapshot the step
//! is evaluated against.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use trendfolio_core::profile::{ProfileError, DEFAULT_PROFILE};
use trendfolio_core::settings::EngineSettings;
use trendfolio_core::{EngineConfig, Profile, ProfileOverrides, ProfilePreset};

/// Unique identifier for a run configuration (content-addressable hash).
pub type RunId = String;

/// Errors from reading or validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid profile: {0}")]
    Profile(#[from] ProfileError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration for one signal run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub strategy: StrategyConfig,

    /// Engine tunables; every field falls back to its default.
    #[serde(default)]
    pub engine: EngineSettings,

    pub data: DataConfig,

    #[serde(default)]
    pub portfolio: PortfolioConfig,
}

/// Profile selection, overrides and universe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyConfig {
    pub profile: String,
    /// Explicit universe; `None` means every ticker in the data directory.
    pub universe: Option<Vec<String>>,
    pub overrides: ProfileOverrides,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            profile: DEFAULT_PROFILE.to_string(),
            universe: None,
            overrides: ProfileOverrides::default(),
        }
    }
}

/// Where bars come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    /// Directory of `TICKER.csv` / `TICKER_data.csv` files.
    pub dir: PathBuf,
    /// Backtest feeds spell class shares with a hyphen (`BRK-B`).
    #[serde(default = "default_backtesting")]
    pub backtesting: bool,
}

fn default_backtesting() -> bool {
    true
}

/// Portfolio snapshot the step runs against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PortfolioConfig {
    pub cash: f64,
    /// `symbol,quantity` CSV of open positions.
    pub positions: Option<PathBuf>,
    /// Engine state JSON, read before the step and written after it.
    pub state: Option<PathBuf>,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            cash: 100_000.0,
            positions: None,
            state: None,
        }
    }
}

impl RunConfig {
    /// Load from a TOML file. Relative paths inside the file are resolved
    /// against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.portfolio.cash.is_finite() && self.portfolio.cash >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "portfolio.cash must be a non-negative number, got {}",
                self.portfolio.cash
            )));
        }
        let e = &self.engine;
        if !(0.0..=1.0).contains(&e.breadth_low)
            || !(0.0..=1.0).contains(&e.breadth_high)
            || e.breadth_low >= e.breadth_high
        {
            return Err(ConfigError::Invalid(format!(
                "engine.breadth_low ({}) must be below engine.breadth_high ({}), both in [0, 1]",
                e.breadth_low, e.breadth_high
            )));
        }
        if e.regime_symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("engine.regime_symbol is empty".into()));
        }
        self.engine_config().resolve_profile()?;
        Ok(())
    }

    /// The engine-facing part of the configuration.
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::new(self.strategy.profile.clone())
            .with_overrides(self.strategy.overrides)
            .with_settings(self.engine.clone());
        config.universe = self.strategy.universe.clone();
        config
    }

    /// Deterministic hash of the configuration, for tagging run output.
    pub fn run_id(&self) -> RunId {
        // plain data only; serialization cannot fail
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex()[..16].to_string()
    }

    fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &PathBuf| {
            if p.is_relative() {
                base.join(p)
            } else {
                p.clone()
            }
        };
        self.data.dir = join(&self.data.dir);
        self.portfolio.positions = self.portfolio.positions.as_ref().map(join);
        self.portfolio.state = self.portfolio.state.as_ref().map(join);
    }
}

/// Every preset rendered as TOML tables keyed by name.
pub fn presets_toml() -> Result<String, ConfigError> {
    let presets: BTreeMap<&str, Profile> = ProfilePreset::ALL
        .iter()
        .map(|p| (p.name(), p.profile()))
        .collect();
    Ok(toml::to_string_pretty(&presets)?)
}
