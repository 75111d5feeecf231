//! Severity scale and clamping.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity level for rule findings, ordered from least to most important.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Severity {
    /// Informational finding, typically a metric
    Info = 1,
    /// Potential issue
    Warning = 2,
    /// Rule violation
    #[default]
    Violation = 3,
    /// Violation that should block a change
    Critical = 4,
}

impl Severity {
    pub const MIN: Severity = Severity::Info;
    pub const MAX: Severity = Severity::Critical;

    /// Map a declared level onto the scale, clamping out-of-range values.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 | 1 => Severity::Info,
            2 => Severity::Warning,
            3 => Severity::Violation,
            _ => Severity::Critical,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    /// Whether `level` is on the scale without clamping.
    pub fn is_valid_level(level: u8) -> bool {
        (Self::MIN.level()..=Self::MAX.level()).contains(&level)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Violation => write!(f, "violation"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "note" | "metric" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "violation" | "error" => Ok(Severity::Violation),
            "critical" | "blocker" => Ok(Severity::Critical),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}
