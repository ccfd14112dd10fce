//! Portfolio drawdown breaker with cooldown.
//!
//! The peak is the all-time high of observed portfolio value and is never
//! reset. The breaker trips once per breach: after tripping it stays disarmed
//! until a new peak is made, so a portfolio sitting in cash below the old
//! peak does not keep extending its own cooldown.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Fractional decline of `value` from `peak`.
pub fn drawdown(peak: f64, value: f64) -> f64 {
    (peak - value) / peak.max(1e-9)
}

/// What one observation did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BreakerDecision {
    /// First observation; peak initialized.
    Initialized,
    /// Value at a new high; breaker re-armed.
    NewPeak,
    /// Below the peak, within tolerance or already tripped for this breach.
    Within { drawdown: f64 },
    /// Threshold breached: liquidate and cool down.
    Tripped {
        drawdown: f64,
        cooldown_until: NaiveDate,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownBreaker {
    equity_peak: Option<f64>,
    cooldown_until: Option<NaiveDate>,
    #[serde(default = "armed_default")]
    armed: bool,
}

fn armed_default() -> bool {
    true
}

impl Default for DrawdownBreaker {
    fn default() -> Self {
        Self {
            equity_peak: None,
            cooldown_until: None,
            armed: true,
        }
    }
}

impl DrawdownBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equity_peak(&self) -> Option<f64> {
        self.equity_peak
    }

    pub fn cooldown_until(&self) -> Option<NaiveDate> {
        self.cooldown_until
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Cooldown covers every day up to and including `cooldown_until`.
    pub fn in_cooldown(&self, today: NaiveDate) -> bool {
        self.cooldown_until.is_some_and(|until| today <= until)
    }

    pub fn observe(
        &mut self,
        value: f64,
        today: NaiveDate,
        max_drawdown: f64,
        cooldown_days: u32,
    ) -> BreakerDecision {
        let Some(peak) = self.equity_peak else {
            self.equity_peak = Some(value);
            return BreakerDecision::Initialized;
        };
        if value > peak {
            self.equity_peak = Some(value);
            self.armed = true;
            return BreakerDecision::NewPeak;
        }

        let dd = drawdown(peak, value);
        if self.armed && dd >= max_drawdown {
            let until = today + Duration::days(i64::from(cooldown_days));
            self.cooldown_until = Some(until);
            self.armed = false;
            BreakerDecision::Tripped {
                drawdown: dd,
                cooldown_until: until,
            }
        } else {
            BreakerDecision::Within { drawdown: dd }
        }
    }
}
