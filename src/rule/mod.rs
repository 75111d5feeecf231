//! Rule abstraction.
//!
//! A rule is a tree-sitter query plus immutable metadata ([`RuleMeta`]) and
//! optional hooks for logic a query cannot express. The default
//! [`Rule::apply`] runs the query, applies [`Rule::post_filter`] to each
//! capture and hands survivors to [`Rule::validate_node`]. Rules never catch
//! their own errors; containment is the scan manager's job.

pub mod builtin;
pub mod context;
pub mod errors;
pub mod filter;
pub mod meta;
pub mod severity;

pub use builtin::{NameLengthRule, QueryRule};
pub use context::{RuleContext, ScanMode};
pub use errors::RuleError;
pub use filter::{FilterError, NodeFilter};
pub use meta::{RuleMeta, RuleMetaBuilder};
pub use severity::Severity;

use crate::cache;
use crate::scan::ScanResult;
use crate::ts::{Capture, ParsedSource};
use tree_sitter::Node;

/// A node accepted by a rule, with metadata for message interpolation.
#[derive(Debug, Clone)]
pub struct RuleMatch<'tree> {
    pub node: Node<'tree>,
    pub metadata: Vec<(String, String)>,
}

impl<'tree> RuleMatch<'tree> {
    pub fn new(node: Node<'tree>) -> Self {
        Self {
            node,
            metadata: Vec::new(),
        }
    }

    /// Attach a `%key%` substitution value.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.push((key.into(), value.to_string()));
        self
    }
}

/// One analysis check.
///
/// Implementations must be shareable across threads: the same rule instance
/// may run in several scan sessions at once.
pub trait Rule: Send + Sync {
    fn meta(&self) -> &RuleMeta;

    /// Run the rule against a parsed source.
    fn apply<'tree>(
        &self,
        source: &'tree ParsedSource,
    ) -> Result<Vec<RuleMatch<'tree>>, RuleError> {
        let meta = self.meta();
        let engine = cache::get_or_compile_query(source.language(), meta.query())
            .map_err(|e| RuleError::query(meta.id(), e))?;

        let mut matches = Vec::new();
        for capture in engine.captures(source.root_node(), source.source()) {
            if meta.capture().is_some_and(|name| name != capture.name) {
                continue;
            }
            if !self.post_filter(capture.node, source) {
                continue;
            }
            matches.extend(self.validate_node(&capture, source)?);
        }

        Ok(matches)
    }

    /// Reject a capture before validation.
    fn post_filter(&self, _node: Node<'_>, _source: &ParsedSource) -> bool {
        true
    }

    /// Decide how many matches a capture produces. Defaults to one.
    fn validate_node<'tree>(
        &self,
        capture: &Capture<'tree>,
        _source: &'tree ParsedSource,
    ) -> Result<Vec<RuleMatch<'tree>>, RuleError> {
        Ok(vec![RuleMatch::new(capture.node)])
    }

    /// Filter this rule's own results after they are built.
    fn filter_results<'tree>(&self, results: Vec<ScanResult<'tree>>) -> Vec<ScanResult<'tree>> {
        results
    }
}
