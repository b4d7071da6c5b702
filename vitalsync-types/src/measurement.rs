//! Measurement values and matching tolerances.
//!
//! Each tracked domain has one value type implementing [`Measurement`]. The
//! trait is the small capability surface the generic reconciler needs: which
//! domain the value belongs to, how far apart two values are, whether a
//! value coming from the external store is usable, and the default
//! tolerances of the matching rule.

use crate::Domain;
use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Pounds to kilograms.
const KG_PER_LB: f64 = 0.453_592_37;

/// A domain-specific measurement payload.
pub trait Measurement:
    Debug + Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The domain this value belongs to.
    const DOMAIN: Domain;

    /// Magnitude difference between two values, always non-negative.
    fn value_delta(&self, other: &Self) -> f64;

    /// Checks that a value recorded at `timestamp` is usable.
    fn validate(&self, timestamp: DateTime<Utc>) -> Result<(), String>;

    /// Default strict and historical tolerances for this domain.
    fn default_tolerances() -> MatchTolerances;
}

/// One tier of the matching rule.
///
/// Both bounds are exclusive: a time difference equal to `time_secs` does
/// not match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Maximum timestamp difference, in seconds.
    pub time_secs: i64,
    /// Maximum value difference, in the domain's unit.
    pub value: f64,
}

impl Tolerance {
    #[must_use]
    pub const fn new(time_secs: i64, value: f64) -> Self {
        Self { time_secs, value }
    }

    /// The time window as a [`TimeDelta`].
    #[must_use]
    pub fn time_window(&self) -> TimeDelta {
        TimeDelta::seconds(self.time_secs)
    }
}

/// The two tolerance tiers of a domain.
///
/// `strict` applies to routine incremental sync, `historical` to bulk
/// reconciliation where the external store may have rounded timestamps or
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchTolerances {
    pub strict: Tolerance,
    pub historical: Tolerance,
}

// ── Weight ───────────────────────────────────────────────────────

/// Unit of a weight measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
    #[default]
    Kilograms,
    Pounds,
}

/// A body weight measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightValue {
    pub magnitude: f64,
    #[serde(default)]
    pub unit: WeightUnit,
}

impl WeightValue {
    #[must_use]
    pub const fn kilograms(magnitude: f64) -> Self {
        Self {
            magnitude,
            unit: WeightUnit::Kilograms,
        }
    }

    #[must_use]
    pub const fn pounds(magnitude: f64) -> Self {
        Self {
            magnitude,
            unit: WeightUnit::Pounds,
        }
    }

    /// The magnitude expressed in `unit`.
    #[must_use]
    pub fn in_unit(&self, unit: WeightUnit) -> f64 {
        match (self.unit, unit) {
            (WeightUnit::Kilograms, WeightUnit::Pounds) => self.magnitude / KG_PER_LB,
            (WeightUnit::Pounds, WeightUnit::Kilograms) => self.magnitude * KG_PER_LB,
            _ => self.magnitude,
        }
    }
}

impl Measurement for WeightValue {
    const DOMAIN: Domain = Domain::Weight;

    fn value_delta(&self, other: &Self) -> f64 {
        (self.magnitude - other.in_unit(self.unit)).abs()
    }

    fn validate(&self, _timestamp: DateTime<Utc>) -> Result<(), String> {
        if !self.magnitude.is_finite() || self.magnitude <= 0.0 {
            return Err(format!("weight must be positive, got {}", self.magnitude));
        }
        Ok(())
    }

    fn default_tolerances() -> MatchTolerances {
        MatchTolerances {
            strict: Tolerance::new(60, 0.1),
            historical: Tolerance::new(5 * 60, 0.2),
        }
    }
}

// ── Sleep ────────────────────────────────────────────────────────

/// A sleep session. The entry timestamp is the start of the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepValue {
    pub end: DateTime<Utc>,
    /// Subjective quality on a 1-5 scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
}

impl SleepValue {
    #[must_use]
    pub const fn new(end: DateTime<Utc>, quality: Option<u8>) -> Self {
        Self { end, quality }
    }
}

impl Measurement for SleepValue {
    const DOMAIN: Domain = Domain::Sleep;

    /// Difference of the end instants, in minutes.
    fn value_delta(&self, other: &Self) -> f64 {
        (self.end - other.end).num_milliseconds().abs() as f64 / 60_000.0
    }

    fn validate(&self, timestamp: DateTime<Utc>) -> Result<(), String> {
        if self.end <= timestamp {
            return Err(format!(
                "sleep must end after it starts ({} <= {})",
                self.end, timestamp
            ));
        }
        if let Some(q) = self.quality
            && !(1..=5).contains(&q)
        {
            return Err(format!("sleep quality must be 1-5, got {q}"));
        }
        Ok(())
    }

    fn default_tolerances() -> MatchTolerances {
        MatchTolerances {
            strict: Tolerance::new(60, 1.0),
            historical: Tolerance::new(5 * 60, 5.0),
        }
    }
}

// ── Hydration ────────────────────────────────────────────────────

/// Kind of liquid logged in a hydration entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LiquidType {
    #[default]
    Water,
    Coffee,
    Tea,
    Juice,
    Milk,
    Other,
}

/// A hydration log entry, volume in millilitres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydrationValue {
    pub volume_ml: f64,
    #[serde(default)]
    pub liquid: LiquidType,
}

impl HydrationValue {
    #[must_use]
    pub const fn new(volume_ml: f64, liquid: LiquidType) -> Self {
        Self { volume_ml, liquid }
    }

    #[must_use]
    pub const fn water(volume_ml: f64) -> Self {
        Self::new(volume_ml, LiquidType::Water)
    }
}

impl Measurement for HydrationValue {
    const DOMAIN: Domain = Domain::Hydration;

    fn value_delta(&self, other: &Self) -> f64 {
        (self.volume_ml - other.volume_ml).abs()
    }

    fn validate(&self, _timestamp: DateTime<Utc>) -> Result<(), String> {
        if !self.volume_ml.is_finite() || self.volume_ml <= 0.0 {
            return Err(format!("volume must be positive, got {}", self.volume_ml));
        }
        Ok(())
    }

    fn default_tolerances() -> MatchTolerances {
        MatchTolerances {
            strict: Tolerance::new(60, 1.0),
            historical: Tolerance::new(5 * 60, 5.0),
        }
    }
}
