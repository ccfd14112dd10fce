//! Single-step signal run: load data and snapshot, step the engine once,
//! persist state, report.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use trendfolio_core::domain::OrderInstruction;
use trendfolio_core::engine::{RebalanceOutcome, StepReport};
use trendfolio_core::position_management::BreakerDecision;
use trendfolio_core::profile::ProfileError;
use trendfolio_core::regime::RegimeReading;
use trendfolio_core::sizers::SizingTarget;
use trendfolio_core::{Engine, EngineState};

use crate::config::{ConfigError, RunConfig, RunId};
use crate::snapshot::SnapshotHost;
use crate::store::{read_positions, BarStore, StoreError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Store(#[from] StoreError),

    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("state file {path}: {source}")]
    StateIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is not valid engine state: {source}")]
    StateJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no bars in the data directory; nothing to run on")]
    NoData,
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Outcome of one signal run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub as_of: NaiveDate,
    pub profile: String,
    pub profile_fingerprint: String,
    pub universe_size: usize,
    pub cash: f64,
    pub portfolio_value: f64,
    pub breaker: BreakerDecision,
    pub in_cooldown: bool,
    pub rebalance_due: bool,
    pub regime: Option<RegimeReading>,
    pub outcome: Option<RebalanceOutcome>,
    pub ranked_count: usize,
    pub selected: Vec<String>,
    pub targets: Vec<SizingTarget>,
    /// Instructions in source spelling, in submission order.
    pub orders: Vec<OrderInstruction>,
}

impl SignalReport {
    fn from_step(config: &RunConfig, engine: &Engine, cash: f64, step: StepReport) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run_id: config.run_id(),
            as_of: step.date,
            profile: engine.preset().name().to_string(),
            profile_fingerprint: engine.profile().fingerprint(),
            universe_size: engine.universe().len(),
            cash,
            portfolio_value: step.portfolio_value,
            breaker: step.breaker,
            in_cooldown: step.in_cooldown,
            rebalance_due: step.rebalance_due,
            regime: step.regime,
            outcome: step.outcome,
            ranked_count: step.ranked.len(),
            selected: step.selected,
            targets: step.targets,
            orders: step.orders,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ── State persistence ────────────────────────────────────────────────

/// Read persisted engine state; a missing file means a fresh start.
pub fn load_state(path: &Path) -> Result<Option<EngineState>, RunError> {
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path).map_err(|source| RunError::StateIo {
        path: path.to_path_buf(),
        source,
    })?;
    let state = EngineState::from_json(&json).map_err(|source| RunError::StateJson {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(state))
}

/// Write engine state through a temporary file so a crash never leaves a
/// truncated state file behind.
pub fn save_state(path: &Path, state: &EngineState) -> Result<(), RunError> {
    let json = state.to_json().map_err(|source| RunError::StateJson {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    let io = |source| RunError::StateIo {
        path: path.to_path_buf(),
        source,
    };
    std::fs::write(&tmp, json).map_err(io)?;
    std::fs::rename(&tmp, path).map_err(io)
}

// ── Runs ─────────────────────────────────────────────────────────────

/// Load the data directory named by `config` and run one step.
///
/// `as_of` defaults to the latest bar date in the store.
pub fn run_signals(config: &RunConfig, as_of: Option<NaiveDate>) -> Result<SignalReport, RunError> {
    let store = BarStore::open(&config.data.dir)?;
    run_with_store(config, &store, as_of)
}

/// Run one step against an already loaded store.
pub fn run_with_store(
    config: &RunConfig,
    store: &BarStore,
    as_of: Option<NaiveDate>,
) -> Result<SignalReport, RunError> {
    let as_of = match as_of {
        Some(d) => d,
        None => store.last_date().ok_or(RunError::NoData)?,
    };

    let positions = match &config.portfolio.positions {
        Some(path) if path.exists() => read_positions(path)?,
        Some(path) => {
            tracing::warn!(path = %path.display(), "[run] positions file missing, assuming flat");
            Vec::new()
        }
        None => Vec::new(),
    };
    let state = match &config.portfolio.state {
        Some(path) => load_state(path)?,
        None => None,
    };
    let resumed = state.is_some();

    let mut host = SnapshotHost::new(
        store,
        as_of,
        config.data.backtesting,
        config.portfolio.cash,
        &positions,
    );
    let mut engine = Engine::with_state(config.engine_config(), &host, state.unwrap_or_default())?;
    tracing::info!(
        %as_of,
        run_id = %config.run_id(),
        positions = positions.len(),
        resumed,
        "[run] step"
    );

    let step = engine.on_trading_iteration(&mut host);
    let report = SignalReport::from_step(config, &engine, host.cash(), step);

    if let Some(path) = &config.portfolio.state {
        save_state(path, engine.state())?;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_state_file_is_a_fresh_start() {
        let tmp = TempDir::new().unwrap();
        assert!(load_state(&tmp.path().join("none.json")).unwrap().is_none());
    }

    #[test]
    fn state_round_trips_through_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        let mut state = EngineState::new();
        state.last_rebalance_day = NaiveDate::from_ymd_opt(2024, 7, 1);
        state.highest_close.observe("AAPL", 210.5);

        save_state(&path, &state).unwrap();
        let loaded = load_state(&path).unwrap().unwrap();
        assert_eq!(loaded.last_rebalance_day, state.last_rebalance_day);
        assert_eq!(loaded.highest_close.high("AAPL"), Some(210.5));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_state_is_reported() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_state(&path), Err(RunError::StateJson { .. })));
    }

    #[test]
    fn empty_store_has_nothing_to_run() {
        let config = RunConfig::from_toml("[data]\ndir = \"unused\"\n").unwrap();
        let err = run_with_store(&config, &BarStore::new(), None).unwrap_err();
        assert!(matches!(err, RunError::NoData));
    }
}
