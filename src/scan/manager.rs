//! Core scan pass.
//!
//! Each rule runs inside its own failure boundary: query errors, rule logic
//! errors and panics are logged with the rule id, recorded as a
//! [`RuleFailure`] and contribute no results. The remaining rules are not
//! affected.
//!
//! Rules are independent of each other. `filter_results` only ever sees the
//! results of the rule that defines it, so evaluation order does not change
//! the outcome and rules may run in parallel.

use crate::cache;
use crate::pool;
use crate::rule::{Rule, RuleError, ScanMode, Severity};
use crate::scan::result::ScanResult;
use crate::ts::{queries, Language, ParsedSource, TreeSitterError};
use log::{debug, error, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Deserialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Execution settings for a scan pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Evaluate rules in parallel
    pub parallel: bool,
    /// Worker threads for parallel evaluation (0 = rayon's global pool)
    pub jobs: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            parallel: true,
            jobs: 0,
        }
    }
}

impl EngineSettings {
    /// Build the dedicated pool these settings ask for.
    ///
    /// `None` when evaluation is sequential, when `jobs` is 0 (rayon's global
    /// pool is used), or when the pool cannot be built.
    pub fn build_pool(&self) -> Option<Arc<ThreadPool>> {
        if !self.parallel || self.jobs == 0 {
            return None;
        }
        match ThreadPoolBuilder::new().num_threads(self.jobs).build() {
            Ok(pool) => Some(Arc::new(pool)),
            Err(e) => {
                warn!(
                    "failed to build a {}-thread pool, running rules sequentially: {}",
                    self.jobs, e
                );
                None
            }
        }
    }
}

/// A rule that failed during a pass.
#[derive(Debug)]
pub struct RuleFailure {
    pub rule_id: String,
    pub error: RuleError,
}

/// Results of one pass plus the rules that failed.
#[derive(Debug, Default)]
pub struct ScanOutcome<'tree> {
    pub results: Vec<ScanResult<'tree>>,
    pub failures: Vec<RuleFailure>,
}

impl ScanOutcome<'_> {
    pub fn is_clean(&self) -> bool {
        self.results.is_empty() && self.failures.is_empty()
    }
}

type RuleOutcome<'tree> = Result<Vec<ScanResult<'tree>>, RuleError>;

/// Runs a rule set against one parsed source.
pub struct ScanManager {
    parsed: ParsedSource,
    rules: Vec<Arc<dyn Rule>>,
    file_path: Option<PathBuf>,
    settings: EngineSettings,
    // Built on first parallel pass unless shared in via `with_thread_pool`.
    pool: OnceLock<Option<Arc<ThreadPool>>>,
}

impl ScanManager {
    /// Parse `source` with a pooled parser and bind it to `rules`.
    pub fn new(
        source: impl Into<String>,
        language: Language,
        rules: Vec<Arc<dyn Rule>>,
    ) -> Result<Self, TreeSitterError> {
        let source = source.into();
        let parsed = pool::with_parser(language, |parser| parser.parse_source(source))??;
        Ok(Self::from_parsed(parsed, rules))
    }

    pub fn from_parsed(parsed: ParsedSource, rules: Vec<Arc<dyn Rule>>) -> Self {
        Self {
            parsed,
            rules,
            file_path: None,
            settings: EngineSettings::default(),
            pool: OnceLock::new(),
        }
    }

    /// Path reported on every result.
    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Run parallel passes on `pool` instead of building one per manager.
    pub fn with_thread_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.pool = OnceLock::from(Some(pool));
        self
    }

    pub fn parsed(&self) -> &ParsedSource {
        &self.parsed
    }

    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Run every rule whose context includes scanning.
    pub fn scan(&self) -> Vec<ScanResult<'_>> {
        self.execute(ScanMode::Scan).results
    }

    /// Run every rule whose context includes measuring.
    pub fn measure(&self) -> Vec<ScanResult<'_>> {
        self.execute(ScanMode::Measure).results
    }

    /// Run the rules applicable to `mode` and keep failure records.
    pub fn execute(&self, mode: ScanMode) -> ScanOutcome<'_> {
        let rules: Vec<&Arc<dyn Rule>> = self
            .rules
            .iter()
            .filter(|rule| rule.meta().context().applies_to(mode))
            .collect();

        if self.parsed.source().trim().is_empty() {
            warn!("no source code to {}{}", mode, self.location());
            return ScanOutcome::default();
        }
        if rules.is_empty() {
            warn!("no {} rules to run{}", mode, self.location());
            return ScanOutcome::default();
        }

        let started = Instant::now();
        let per_rule = self.run_all(&rules);

        let mut outcome = ScanOutcome::default();
        for (rule, result) in rules.iter().zip(per_rule) {
            match result {
                Ok(results) => outcome.results.extend(results),
                Err(error) => {
                    let rule_id = rule.meta().id().to_string();
                    error!("skipping rule '{}'{}: {}", rule_id, self.location(), error);
                    outcome.failures.push(RuleFailure { rule_id, error });
                }
            }
        }

        debug!(
            "{} pass ran {} rules in {:?}: {} results, {} failures",
            mode,
            rules.len(),
            started.elapsed(),
            outcome.results.len(),
            outcome.failures.len()
        );
        outcome
    }

    /// Run an ad-hoc query and list the matches as a JSON array of
    /// `"@capture=text"` strings.
    ///
    /// An empty query falls back to [`queries::DEFAULT_DUMP_QUERY`], which
    /// lists parse errors.
    pub fn dump(&self, query: &str) -> Result<String, TreeSitterError> {
        let query = if query.trim().is_empty() {
            queries::DEFAULT_DUMP_QUERY
        } else {
            query
        };

        let engine = cache::get_or_compile_query(self.parsed.language(), query)?;
        let entries: Vec<String> = engine
            .captures(self.parsed.root_node(), self.parsed.source())
            .into_iter()
            .map(|capture| format!("@{}={}", capture.name, self.parsed.node_text(capture.node)))
            .collect();

        Ok(serde_json::Value::from(entries).to_string())
    }

    fn run_all<'a>(&'a self, rules: &[&'a Arc<dyn Rule>]) -> Vec<RuleOutcome<'a>> {
        if !self.settings.parallel || rules.len() < 2 {
            return rules.iter().map(|rule| self.run_rule(rule)).collect();
        }

        let run = || -> Vec<RuleOutcome<'a>> {
            rules.par_iter().map(|rule| self.run_rule(rule)).collect()
        };
        match self.thread_pool() {
            Some(pool) => pool.install(run),
            None if self.settings.jobs == 0 => run(),
            None => rules.iter().map(|rule| self.run_rule(rule)).collect(),
        }
    }

    fn thread_pool(&self) -> Option<&ThreadPool> {
        self.pool
            .get_or_init(|| self.settings.build_pool())
            .as_deref()
    }

    fn run_rule<'a>(&'a self, rule: &Arc<dyn Rule>) -> RuleOutcome<'a> {
        let meta = rule.meta();
        let severity = meta.effective_severity();
        if !Severity::is_valid_level(meta.declared_severity()) {
            debug!(
                "rule '{}' declares severity {}, reporting as {}",
                meta.id(),
                meta.declared_severity(),
                severity
            );
        }

        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> RuleOutcome<'a> {
            let results = rule
                .apply(&self.parsed)?
                .into_iter()
                .map(|matched| {
                    let text = self.parsed.node_text(matched.node);
                    ScanResult::new(
                        Arc::clone(rule),
                        severity,
                        matched,
                        text,
                        self.file_path.clone(),
                    )
                })
                .collect();
            Ok(rule.filter_results(results))
        }))
        .unwrap_or_else(|payload| {
            Err(RuleError::Panicked {
                rule_id: meta.id().to_string(),
                message: panic_message(payload.as_ref()),
            })
        });

        if let Ok(results) = &outcome {
            debug!(
                "rule '{}' produced {} results in {:?}",
                meta.id(),
                results.len(),
                started.elapsed()
            );
        }
        outcome
    }

    fn location(&self) -> String {
        self.file_path
            .as_ref()
            .map(|path| format!(" in {}", path.display()))
            .unwrap_or_default()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
