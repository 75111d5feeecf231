//! treescan: rule-driven static analysis over tree-sitter syntax trees
//!
//! A source file is parsed once into an immutable concrete syntax tree. A set
//! of rules, each a tree-sitter query plus optional hooks, is evaluated against
//! that tree and every surviving match becomes a [`ScanResult`].
//!
//! # Architecture
//!
//! - [`ts`]: grammars, parsing and query execution
//! - [`rule`]: the [`Rule`] trait, rule metadata and the built-in rule kinds
//! - [`scan`]: the [`ScanManager`] that runs rules and isolates their failures
//! - [`scanner`]: file-level sessions ([`Scanner`])
//! - [`config`]: declarative rule sets loaded from TOML or JSON
//!
//! Parsers and compiled queries are reused per thread ([`pool`], [`cache`]).
//!
//! # Guarantees
//!
//! - A failing or panicking rule never aborts the pass; the other rules still report
//! - Declared severities are clamped into the supported scale, never rewritten
//! - Result order follows rule order, then match order
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use treescan::{NameLengthRule, Rule, RuleMeta, Scanner, ScannerOptions};
//!
//! let rule: Arc<dyn Rule> = Arc::new(NameLengthRule::new(
//!     RuleMeta::builder("short-variable")
//!         .query("(variable_declarator name: (identifier) @name)")
//!         .message("Variable '%name%' is too short")
//!         .build(),
//!     3,
//! ));
//!
//! let scanner = Scanner::create(ScannerOptions::new("src/Foo.java", vec![rule]))?;
//! for result in scanner.run() {
//!     println!("{}:{} {}", result.line(), result.column(), result.message());
//! }
//! # Ok::<(), treescan::ScanError>(())
//! ```

pub mod cache;
pub mod config;
pub mod pool;
pub mod rule;
pub mod scan;
pub mod scanner;
pub mod ts;

// Re-exports
pub use config::{
    load_from_path, load_from_str, load_json_str, ConfigError, RuleSetConfig, ValidationError,
};
pub use rule::{
    NameLengthRule, NodeFilter, QueryRule, Rule, RuleContext, RuleError, RuleMatch, RuleMeta,
    ScanMode, Severity,
};
pub use scan::{EngineSettings, Metric, ResultRecord, ScanManager, ScanOutcome, ScanResult};
pub use scanner::{ScanError, Scanner, ScannerOptions};
pub use ts::{Language, ParsedSource, QueryEngine, SourceParser, TreeSitterError};
