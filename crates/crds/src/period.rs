//! Period definitions
//!
//! User-declared time windows. Periods are evaluated in declaration order by
//! the controller; the first one that is active wins.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A time window with the resource state it requests.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSpec {
    /// Human-readable name (may be empty)
    #[serde(default)]
    pub name: String,

    /// Target state while this period is active
    #[serde(rename = "type")]
    pub period_type: PeriodType,

    /// When the period is active
    pub time: PeriodTime,
}

/// Target state requested by a period
///
/// Serializes lowercase ("up", "down", "restore", "noaction") to match the
/// values users write in manifests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    /// Resources running / scaled up
    Up,

    /// Resources stopped / scaled down
    Down,

    /// Resources returned to their original state
    #[default]
    Restore,

    /// Leave resources untouched
    #[serde(alias = "noAction", alias = "no-action")]
    NoAction,
}

impl PeriodType {
    /// Lowercase name as written in manifests
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Up => "up",
            PeriodType::Down => "down",
            PeriodType::Restore => "restore",
            PeriodType::NoAction => "noaction",
        }
    }
}

impl std::fmt::Display for PeriodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exactly one time definition: a weekly recurring window or an absolute one.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PeriodTime {
    /// Repeats on the selected weekdays
    Recurring(RecurringPeriod),

    /// Absolute window between two instants
    Fixed(FixedPeriod),
}

impl PeriodTime {
    /// Whether the period should run at most once per edited definition
    pub fn once(&self) -> bool {
        match self {
            PeriodTime::Recurring(recurring) => recurring.once,
            PeriodTime::Fixed(fixed) => fixed.once,
        }
    }

    /// Configured UTC offset, if any
    pub fn time_zone(&self) -> Option<&str> {
        match self {
            PeriodTime::Recurring(recurring) => recurring.time_zone.as_deref(),
            PeriodTime::Fixed(fixed) => fixed.time_zone.as_deref(),
        }
    }
}

/// Weekly window, e.g. weekdays 19:00 to 07:00
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringPeriod {
    /// Weekday names ("mon", "Tuesday", ...) or "all"
    pub days: Vec<String>,

    /// Start of the window (HH:MM)
    pub start_time: String,

    /// End of the window (HH:MM); earlier than start wraps past midnight
    pub end_time: String,

    /// Execute only once per edited definition
    #[serde(default)]
    pub once: bool,

    /// UTC offset the times are expressed in ("+02:00", "UTC"); defaults to UTC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Absolute window ("2025-12-24 18:00:00" or RFC 3339)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FixedPeriod {
    /// Start instant
    pub start_time: String,

    /// End instant
    pub end_time: String,

    /// Execute only once per edited definition
    #[serde(default)]
    pub once: bool,

    /// UTC offset applied to instants without one; defaults to UTC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}
