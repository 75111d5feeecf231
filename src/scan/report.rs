//! Aggregation of scan results into metrics and severity counts.

use crate::rule::{Rule, ScanMode, Severity};
use crate::scan::result::ScanResult;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Count of results for one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metric {
    pub rule_id: String,
    pub name: String,
    pub category: String,
    pub count: usize,
}

/// Count results per rule, for every rule that participates in `mode`.
///
/// Rules without results are reported with a zero count. Order follows the
/// rule list.
pub fn metrics(rules: &[Arc<dyn Rule>], mode: ScanMode, results: &[ScanResult<'_>]) -> Vec<Metric> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for result in results {
        *counts.entry(result.rule_id()).or_default() += 1;
    }

    rules
        .iter()
        .map(|rule| rule.meta())
        .filter(|meta| meta.context().applies_to(mode))
        .map(|meta| Metric {
            rule_id: meta.id().to_string(),
            name: meta.name().to_string(),
            category: meta.category().to_string(),
            count: counts.get(meta.id()).copied().unwrap_or(0),
        })
        .collect()
}

/// Result counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub info: usize,
    pub warning: usize,
    pub violation: usize,
    pub critical: usize,
}

impl SeverityCounts {
    pub fn from_results(results: &[ScanResult<'_>]) -> Self {
        let mut counts = Self::default();
        for result in results {
            counts.add(result.severity());
        }
        counts
    }

    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Info => self.info += 1,
            Severity::Warning => self.warning += 1,
            Severity::Violation => self.violation += 1,
            Severity::Critical => self.critical += 1,
        }
    }

    pub fn merge(&mut self, other: SeverityCounts) {
        self.info += other.info;
        self.warning += other.warning;
        self.violation += other.violation;
        self.critical += other.critical;
    }

    pub fn total(&self) -> usize {
        self.info + self.warning + self.violation + self.critical
    }

    /// Most severe level present, if any.
    pub fn highest(&self) -> Option<Severity> {
        if self.critical > 0 {
            Some(Severity::Critical)
        } else if self.violation > 0 {
            Some(Severity::Violation)
        } else if self.warning > 0 {
            Some(Severity::Warning)
        } else if self.info > 0 {
            Some(Severity::Info)
        } else {
            None
        }
    }
}
