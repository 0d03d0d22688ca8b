//! Scan time normalization and the retention time filter.
use std::fmt::Display;
use std::str::FromStr;

use crate::error::ConfigurationError;

/// Units a scan time may be reported in, named after their UO terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeUnit {
    Millisecond,
    Second,
    Minute,
    Hour,
}

impl TimeUnit {
    pub fn from_name(name: &str) -> Result<TimeUnit, ConfigurationError> {
        match name {
            "millisecond" => Ok(Self::Millisecond),
            "second" => Ok(Self::Second),
            "minute" => Ok(Self::Minute),
            "hour" => Ok(Self::Hour),
            _ => Err(ConfigurationError::UnknownTimeUnit(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Millisecond => "millisecond",
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
        }
    }

    /// Convert `value`, expressed in this unit, to seconds
    pub fn to_seconds(&self, value: f64) -> f64 {
        match self {
            Self::Millisecond => value / 1000.0,
            Self::Second => value,
            Self::Minute => value * 60.0,
            Self::Hour => value * 3600.0,
        }
    }

    /// Convert `seconds` to this unit
    pub fn seconds_in_unit(&self, seconds: f64) -> f64 {
        match self {
            Self::Millisecond => seconds * 1000.0,
            Self::Second => seconds,
            Self::Minute => seconds / 60.0,
            Self::Hour => seconds / 3600.0,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Convert a time expressed in the unit named `unit` to seconds
pub fn time_to_seconds(time: f64, unit: &str) -> Result<f64, ConfigurationError> {
    Ok(TimeUnit::from_name(unit)?.to_seconds(time))
}

/// An inclusive retention time interval, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetentionTimeWindow {
    pub start: f64,
    pub stop: f64,
}

impl Default for RetentionTimeWindow {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl RetentionTimeWindow {
    pub fn new(start: f64, stop: f64) -> Result<Self, ConfigurationError> {
        if start.is_nan() {
            return Err(ConfigurationError::MalformedNumber {
                field: "rt_start".into(),
                value: start.to_string(),
            });
        }
        if stop.is_nan() {
            return Err(ConfigurationError::MalformedNumber {
                field: "rt_stop".into(),
                value: stop.to_string(),
            });
        }
        if start > stop {
            return Err(ConfigurationError::InvalidRetentionTimeWindow { start, stop });
        }
        Ok(Self { start, stop })
    }

    pub fn unbounded() -> Self {
        Self {
            start: f64::NEG_INFINITY,
            stop: f64::INFINITY,
        }
    }

    #[inline]
    pub fn contains(&self, seconds: f64) -> bool {
        self.start <= seconds && seconds <= self.stop
    }

    /// Test a time expressed in `unit`. The bounds are converted into `unit` rather than the
    /// time into seconds, so a reader that divided seconds into minutes lands exactly on a
    /// bound given in whole seconds.
    #[inline]
    pub fn contains_in(&self, time: f64, unit: TimeUnit) -> bool {
        unit.seconds_in_unit(self.start) <= time && time <= unit.seconds_in_unit(self.stop)
    }
}
