//! Engine configuration.

use crate::error::{SyncError, SyncResult};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vitalsync_types::{
    Domain, HydrationValue, MatchTolerances, Measurement, SleepValue, WeightValue,
};

/// Configuration for the sync engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How far back a historical import reaches, in days.
    pub historical_horizon_days: i64,
    /// How long observer callbacks stay suppressed after an outbound
    /// delete (ms).
    pub observer_settle_ms: u64,
    /// Name of the main execution context thread.
    pub main_thread_name: String,
    /// Matching tolerances per domain.
    pub tolerances: TolerancePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            historical_horizon_days: 3650,
            observer_settle_ms: 2_000,
            main_thread_name: "vitalsync-main".to_string(),
            tolerances: TolerancePolicy::default(),
        }
    }
}

/// Longest historical horizon accepted, in days.
pub const MAX_HISTORICAL_HORIZON_DAYS: i64 = 36_500;

/// Widest matching time window accepted, in seconds.
pub const MAX_TOLERANCE_SECS: i64 = 7 * 86_400;

impl SyncConfig {
    /// Parses a configuration from JSON. Missing fields take defaults; the
    /// result is validated.
    pub fn from_json(json: &str) -> SyncResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the engine cannot turn into time spans.
    pub fn validate(&self) -> SyncResult<()> {
        if !(1..=MAX_HISTORICAL_HORIZON_DAYS).contains(&self.historical_horizon_days) {
            return Err(SyncError::InvalidConfig(format!(
                "historical_horizon_days must be between 1 and {MAX_HISTORICAL_HORIZON_DAYS}, got {}",
                self.historical_horizon_days
            )));
        }
        for domain in Domain::ALL {
            let tolerances = self.tolerances.for_domain(domain);
            for (kind, tolerance) in [
                ("strict", tolerances.strict),
                ("historical", tolerances.historical),
            ] {
                if !(1..=MAX_TOLERANCE_SECS).contains(&tolerance.time_secs) {
                    return Err(SyncError::InvalidConfig(format!(
                        "{domain} {kind} time tolerance must be between 1 and {MAX_TOLERANCE_SECS} seconds, got {}",
                        tolerance.time_secs
                    )));
                }
                if !tolerance.value.is_finite() || tolerance.value <= 0.0 {
                    return Err(SyncError::InvalidConfig(format!(
                        "{domain} {kind} value tolerance must be positive, got {}",
                        tolerance.value
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn historical_horizon(&self) -> SyncResult<TimeDelta> {
        TimeDelta::try_days(self.historical_horizon_days)
            .filter(|horizon| *horizon > TimeDelta::zero())
            .ok_or_else(|| {
                SyncError::InvalidConfig(format!(
                    "historical horizon of {} days is out of range",
                    self.historical_horizon_days
                ))
            })
    }

    pub fn observer_settle(&self) -> Duration {
        Duration::from_millis(self.observer_settle_ms)
    }
}

/// Strict and historical tolerances of every domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TolerancePolicy {
    pub weight: MatchTolerances,
    pub sleep: MatchTolerances,
    pub hydration: MatchTolerances,
}

impl Default for TolerancePolicy {
    fn default() -> Self {
        Self {
            weight: WeightValue::default_tolerances(),
            sleep: SleepValue::default_tolerances(),
            hydration: HydrationValue::default_tolerances(),
        }
    }
}

impl TolerancePolicy {
    pub fn for_domain(&self, domain: Domain) -> MatchTolerances {
        match domain {
            Domain::Weight => self.weight,
            Domain::Sleep => self.sleep,
            Domain::Hydration => self.hydration,
        }
    }
}
