use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pipeline a rule participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleContext {
    /// Violation detection only
    #[default]
    Scan,
    /// Metric counting only
    Measure,
    /// Both pipelines
    Both,
}

/// Which pipeline a scan pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanMode {
    Scan,
    Measure,
}

impl RuleContext {
    pub fn applies_to(self, mode: ScanMode) -> bool {
        matches!(
            (self, mode),
            (RuleContext::Both, _)
                | (RuleContext::Scan, ScanMode::Scan)
                | (RuleContext::Measure, ScanMode::Measure)
        )
    }
}

impl fmt::Display for RuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleContext::Scan => write!(f, "scan"),
            RuleContext::Measure => write!(f, "measure"),
            RuleContext::Both => write!(f, "both"),
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::Scan => write!(f, "scan"),
            ScanMode::Measure => write!(f, "measure"),
        }
    }
}

impl FromStr for RuleContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scan" => Ok(RuleContext::Scan),
            "measure" => Ok(RuleContext::Measure),
            "both" | "all" => Ok(RuleContext::Both),
            _ => Err(format!("Unknown rule context: {}", s)),
        }
    }
}
