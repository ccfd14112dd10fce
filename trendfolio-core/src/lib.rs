//! Trendfolio Core — daily signal generation and portfolio construction for a
//! cross-sectional equity trend/momentum strategy.
//!
//! This crate contains the decision pipeline:
//! - Per-day bar cache with no-lookahead trimming and symbol translation
//! - Indicators: ATR, realized volatility, SMA trend, momentum
//! - Regime detection with a breadth exposure dial
//! - Trend-confirmed momentum ranking and sector-capped selection
//! - Inverse-volatility sizing under per-entry and total risk budgets
//! - Trailing stops and a one-shot drawdown breaker with cooldown
//!
//! It performs no I/O of its own: bars, prices, positions and order routing
//! come from a [`host::Host`] implementation.

pub mod data;
pub mod domain;
pub mod engine;
pub mod host;
pub mod indicators;
pub mod position_management;
pub mod profile;
pub mod ranking;
pub mod regime;
pub mod selection;
pub mod settings;
pub mod sizers;

pub use engine::{Engine, EngineConfig, EngineState, StepReport};
pub use host::Host;
pub use profile::{Profile, ProfileOverrides, ProfilePreset};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: values a host may move across threads are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::BarSeries>();
        require_sync::<domain::BarSeries>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::OrderInstruction>();
        require_sync::<domain::OrderInstruction>();

        // Configuration
        require_send::<Profile>();
        require_sync::<Profile>();
        require_send::<EngineConfig>();
        require_sync::<EngineConfig>();
        require_send::<settings::EngineSettings>();
        require_sync::<settings::EngineSettings>();

        // Engine types
        require_send::<Engine>();
        require_sync::<Engine>();
        require_send::<EngineState>();
        require_sync::<EngineState>();
        require_send::<StepReport>();
        require_sync::<StepReport>();
        require_send::<data::BarCache>();
        require_sync::<data::BarCache>();

        // Components
        require_send::<sizers::RiskSizer>();
        require_sync::<sizers::RiskSizer>();
        require_send::<indicators::Atr>();
        require_sync::<indicators::Atr>();
        require_send::<indicators::RealizedVol>();
        require_sync::<indicators::RealizedVol>();
    }

    /// Architecture contract: ranking sees bars and the profile, never
    /// positions or portfolio value.
    #[test]
    fn ranking_has_no_portfolio_parameter() {
        let check: fn(&[domain::Bar], f64, usize) -> Result<f64, ranking::Rejection> =
            ranking::momentum_component;
        let profile = Profile::default();
        assert_eq!(check(&[], profile.min_price, 0), Err(ranking::Rejection::NoData));
    }
}
