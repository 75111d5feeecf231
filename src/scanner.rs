//! File-level entry point: read a source, parse it once, run rules.

use crate::pool;
use crate::rule::{Rule, ScanMode};
use crate::scan::{EngineSettings, ScanManager, ScanOutcome, ScanResult};
use crate::ts::{Language, TreeSitterError};
use log::{debug, warn};
use rayon::ThreadPool;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("unable to read source {path}: {source}")]
    UnreadableSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot determine language for {path}")]
    UnsupportedLanguage { path: PathBuf },

    #[error("no rules configured for {path}")]
    NoRules { path: PathBuf },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: TreeSitterError,
    },
}

/// Options for [`Scanner::create`].
#[derive(Clone, Default)]
pub struct ScannerOptions {
    pub source_path: PathBuf,
    pub rules: Vec<Arc<dyn Rule>>,
    /// Grammar to use; detected from the file extension when `None`.
    pub language: Option<Language>,
    pub settings: EngineSettings,
    /// Pool shared by every scanner built from these options.
    pub thread_pool: Option<Arc<ThreadPool>>,
    /// Fail instead of producing an empty scan when `rules` is empty.
    pub require_rules: bool,
}

impl ScannerOptions {
    pub fn new(source_path: impl Into<PathBuf>, rules: Vec<Arc<dyn Rule>>) -> Self {
        Self {
            source_path: source_path.into(),
            rules,
            ..Self::default()
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_thread_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.thread_pool = Some(pool);
        self
    }

    pub fn require_rules(mut self) -> Self {
        self.require_rules = true;
        self
    }
}

/// One scan session over one source file.
pub struct Scanner {
    source_path: PathBuf,
    manager: ScanManager,
}

impl Scanner {
    /// Read and parse the source, then bind it to the rule set.
    ///
    /// Nothing is cached between calls; every `create` is a fresh session.
    pub fn create(options: ScannerOptions) -> Result<Self, ScanError> {
        let ScannerOptions {
            source_path,
            rules,
            language,
            settings,
            thread_pool,
            require_rules,
        } = options;

        if require_rules && rules.is_empty() {
            return Err(ScanError::NoRules { path: source_path });
        }

        let language = match language.or_else(|| Language::from_path(&source_path)) {
            Some(language) => language,
            None => return Err(ScanError::UnsupportedLanguage { path: source_path }),
        };

        let source = read_source(&source_path)?;
        let parsed = pool::with_parser(language, |parser| parser.parse_source(source))
            .and_then(|parsed| parsed)
            .map_err(|source| ScanError::Parse {
                path: source_path.clone(),
                source,
            })?;

        if parsed.has_errors() {
            let errors = parsed.error_nodes();
            warn!(
                "{} has {} syntax error(s); results may be incomplete",
                source_path.display(),
                errors.len()
            );
            for error in &errors {
                debug!(
                    "syntax error in {} at {}:{}",
                    source_path.display(),
                    error.start_point.row + 1,
                    error.start_point.column + 1
                );
            }
        }

        let mut manager = ScanManager::from_parsed(parsed, rules)
            .with_file_path(&source_path)
            .with_settings(settings);
        if let Some(pool) = thread_pool {
            manager = manager.with_thread_pool(pool);
        }

        Ok(Self {
            source_path,
            manager,
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn language(&self) -> Language {
        self.manager.parsed().language()
    }

    pub fn source(&self) -> &str {
        self.manager.parsed().source()
    }

    pub fn manager(&self) -> &ScanManager {
        &self.manager
    }

    /// Scan for violations.
    pub fn run(&self) -> Vec<ScanResult<'_>> {
        self.manager.scan()
    }

    /// Collect measurements.
    pub fn measure(&self) -> Vec<ScanResult<'_>> {
        self.manager.measure()
    }

    /// Run either pass and keep the failure records.
    pub fn execute(&self, mode: ScanMode) -> ScanOutcome<'_> {
        self.manager.execute(mode)
    }

    /// See [`ScanManager::dump`].
    pub fn dump(&self, query: &str) -> Result<String, TreeSitterError> {
        self.manager.dump(query)
    }
}

fn read_source(path: &Path) -> Result<String, ScanError> {
    fs::read_to_string(path).map_err(|source| ScanError::UnreadableSource {
        path: path.to_path_buf(),
        source,
    })
}
