//! Trendfolio Runner — a file-backed host for the trendfolio engine.
//!
//! This crate builds on `trendfolio-core` to provide:
//! - TOML run configuration
//! - CSV bar store with default-universe and sector discovery
//! - Point-in-time snapshot host over a positions file
//! - Engine state persistence between runs
//! - Deterministic synthetic data for demos and tests
//! - The single-step signal run

pub mod config;
pub mod runner;
pub mod snapshot;
pub mod store;
pub mod synthetic;

pub use config::{presets_toml, ConfigError, RunConfig, RunId};
pub use runner::{load_state, run_signals, run_with_store, save_state, RunError, SignalReport};
pub use snapshot::SnapshotHost;
pub use store::{BarStore, StoreError};
pub use synthetic::{generate_bars, synthetic_store, write_synthetic_dir};
