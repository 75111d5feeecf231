//! Rule kinds that can be declared from configuration.

use crate::rule::filter::NodeFilter;
use crate::rule::meta::RuleMeta;
use crate::rule::{Rule, RuleError, RuleMatch};
use crate::ts::{Capture, ParsedSource};
use tree_sitter::Node;

/// A rule defined entirely by its query and an optional [`NodeFilter`].
#[derive(Debug, Clone)]
pub struct QueryRule {
    meta: RuleMeta,
    filter: Option<NodeFilter>,
}

impl QueryRule {
    pub fn new(meta: RuleMeta) -> Self {
        Self { meta, filter: None }
    }

    pub fn with_filter(mut self, filter: NodeFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn filter(&self) -> Option<&NodeFilter> {
        self.filter.as_ref()
    }
}

impl Rule for QueryRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn post_filter(&self, node: Node<'_>, source: &ParsedSource) -> bool {
        self.filter
            .as_ref()
            .map_or(true, |filter| filter.matches(node, source))
    }

    /// One match per capture, carrying the captured text under both `text`
    /// and the capture's own name (`@name` fills `%name%`).
    fn validate_node<'tree>(
        &self,
        capture: &Capture<'tree>,
        source: &'tree ParsedSource,
    ) -> Result<Vec<RuleMatch<'tree>>, RuleError> {
        let text = source.node_text(capture.node);
        let mut matched = RuleMatch::new(capture.node).with_meta("text", text);
        if capture.name != "text" {
            matched = matched.with_meta(capture.name.as_str(), text);
        }
        Ok(vec![matched])
    }
}

/// Flags captured names shorter than a minimum length.
///
/// Each match carries `name`, `length` and `minimum` metadata, so a message
/// like `"'%name%' is shorter than %minimum% characters"` renders fully.
#[derive(Debug, Clone)]
pub struct NameLengthRule {
    meta: RuleMeta,
    minimum: usize,
}

impl NameLengthRule {
    pub fn new(meta: RuleMeta, minimum: usize) -> Self {
        Self { meta, minimum }
    }

    pub fn minimum(&self) -> usize {
        self.minimum
    }
}

impl Rule for NameLengthRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn validate_node<'tree>(
        &self,
        capture: &Capture<'tree>,
        source: &'tree ParsedSource,
    ) -> Result<Vec<RuleMatch<'tree>>, RuleError> {
        if self.minimum == 0 {
            return Err(RuleError::logic(
                self.meta.id(),
                "minimum name length must be at least 1",
            ));
        }

        let name = source.node_text(capture.node);
        let length = name.chars().count();
        if length >= self.minimum {
            return Ok(Vec::new());
        }

        Ok(vec![RuleMatch::new(capture.node)
            .with_meta("name", name)
            .with_meta("length", length)
            .with_meta("minimum", self.minimum)])
    }
}
