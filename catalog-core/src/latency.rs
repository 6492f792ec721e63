//! Access paths and unit-tagged latency measurements.
//!
//! A measurement always carries the unit it was reported in. Two measurements
//! are only comparable when their units match; otherwise one of them has to
//! be converted explicitly with [`LatencyMeasurement::to_unit`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which store a catalog call went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPath {
    /// Straight to the backing key-value store.
    Backing,
    /// Through the in-memory acceleration tier.
    Accelerated,
}

impl AccessPath {
    pub const ALL: [AccessPath; 2] = [AccessPath::Backing, AccessPath::Accelerated];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backing => "backing",
            Self::Accelerated => "accelerated",
        }
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit a duration is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LatencyUnit {
    #[serde(rename = "ns")]
    Nanoseconds,
    #[serde(rename = "us")]
    Microseconds,
    #[serde(rename = "ms")]
    Milliseconds,
    #[serde(rename = "s")]
    Seconds,
}

impl LatencyUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nanoseconds => "ns",
            Self::Microseconds => "us",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
        }
    }

    /// Nanoseconds in one of this unit.
    pub fn nanos_per_unit(&self) -> f64 {
        match self {
            Self::Nanoseconds => 1.0,
            Self::Microseconds => 1_000.0,
            Self::Milliseconds => 1_000_000.0,
            Self::Seconds => 1_000_000_000.0,
        }
    }

    /// Express `duration` in this unit, keeping sub-unit precision.
    pub fn from_duration(&self, duration: Duration) -> f64 {
        duration.as_nanos() as f64 / self.nanos_per_unit()
    }
}

impl fmt::Display for LatencyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LatencyUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ns" | "nanoseconds" => Ok(Self::Nanoseconds),
            "us" | "µs" | "μs" | "microseconds" => Ok(Self::Microseconds),
            "ms" | "milliseconds" => Ok(Self::Milliseconds),
            "s" | "seconds" => Ok(Self::Seconds),
            other => Err(ConfigError::InvalidValue {
                field: "latency_unit".to_string(),
                value: other.to_string(),
                reason: "expected one of ns, us, ms, s".to_string(),
            }),
        }
    }
}

/// Duration of one adapter call, tagged with its unit and path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyMeasurement {
    pub operation: String,
    pub path: AccessPath,
    pub value: f64,
    pub unit: LatencyUnit,
    pub recorded_at: DateTime<Utc>,
}

impl LatencyMeasurement {
    pub fn new(
        operation: impl Into<String>,
        path: AccessPath,
        elapsed: Duration,
        unit: LatencyUnit,
    ) -> Self {
        Self {
            operation: operation.into(),
            path,
            value: unit.from_duration(elapsed),
            unit,
            recorded_at: Utc::now(),
        }
    }

    /// The same measurement re-expressed in `unit`.
    pub fn to_unit(&self, unit: LatencyUnit) -> Self {
        Self {
            value: self.value * self.unit.nanos_per_unit() / unit.nanos_per_unit(),
            unit,
            ..self.clone()
        }
    }

    /// Compare against another measurement in the same unit.
    ///
    /// Returns `None` when the units differ.
    pub fn partial_cmp_same_unit(&self, other: &Self) -> Option<std::cmp::Ordering> {
        if self.unit != other.unit {
            return None;
        }
        self.value.partial_cmp(&other.value)
    }

    /// Whether this call was faster than `other`. `None` across units.
    pub fn faster_than(&self, other: &Self) -> Option<bool> {
        self.partial_cmp_same_unit(other)
            .map(|ordering| ordering == std::cmp::Ordering::Less)
    }
}
