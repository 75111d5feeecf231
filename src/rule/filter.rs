//! Declarative node filters for configured rules.
//!
//! A filter is written as `<target>;<op>;<argument>`:
//!
//! ```text
//! text;regex;System\.debug\(        node text matches a regex
//! text;not-contains;@description    node text lacks a substring
//! identifier;length;<=3             first `identifier` under the node is at most 3 chars
//! ```
//!
//! `text` targets the captured node itself. Any other target is a node kind,
//! resolved to the first named descendant of that kind (the node included).
//! A filter whose target cannot be resolved rejects the node.

use crate::ts::ParsedSource;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tree_sitter::Node;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid filter '{filter}': {reason}")]
pub struct FilterError {
    pub filter: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FilterTarget {
    Text,
    Kind(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    fn holds(self, left: usize, right: usize) -> bool {
        match self {
            Comparison::Lt => left < right,
            Comparison::Le => left <= right,
            Comparison::Gt => left > right,
            Comparison::Ge => left >= right,
            Comparison::Eq => left == right,
            Comparison::Ne => left != right,
        }
    }

    /// Split `<=3` into the comparison and the number. A bare number means `==`.
    fn parse_with_operand(arg: &str) -> Option<(Self, usize)> {
        let arg = arg.trim();
        let (cmp, rest) = if let Some(rest) = arg.strip_prefix("<=") {
            (Comparison::Le, rest)
        } else if let Some(rest) = arg.strip_prefix(">=") {
            (Comparison::Ge, rest)
        } else if let Some(rest) = arg.strip_prefix("==") {
            (Comparison::Eq, rest)
        } else if let Some(rest) = arg.strip_prefix("!=") {
            (Comparison::Ne, rest)
        } else if let Some(rest) = arg.strip_prefix('<') {
            (Comparison::Lt, rest)
        } else if let Some(rest) = arg.strip_prefix('>') {
            (Comparison::Gt, rest)
        } else {
            (Comparison::Eq, arg)
        };
        let operand = rest.trim().parse().ok()?;
        Some((cmp, operand))
    }
}

#[derive(Debug, Clone)]
enum FilterOp {
    Length(Comparison, usize),
    Regex(Regex),
    NotRegex(Regex),
    Contains(String),
    NotContains(String),
}

/// Predicate over a captured node, parsed from `<target>;<op>;<argument>`.
#[derive(Debug, Clone)]
pub struct NodeFilter {
    raw: String,
    target: FilterTarget,
    op: FilterOp,
}

impl NodeFilter {
    /// Whether `node` passes the filter.
    pub fn matches(&self, node: Node<'_>, source: &ParsedSource) -> bool {
        let target = match &self.target {
            FilterTarget::Text => Some(node),
            FilterTarget::Kind(kind) => find_descendant(node, kind),
        };
        let Some(target) = target else {
            return false;
        };
        let text = source.node_text(target);

        match &self.op {
            FilterOp::Length(cmp, operand) => cmp.holds(text.chars().count(), *operand),
            FilterOp::Regex(re) => re.is_match(text),
            FilterOp::NotRegex(re) => !re.is_match(text),
            FilterOp::Contains(needle) => text.contains(needle.as_str()),
            FilterOp::NotContains(needle) => !text.contains(needle.as_str()),
        }
    }
}

impl FromStr for NodeFilter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| FilterError {
            filter: s.to_string(),
            reason: reason.to_string(),
        };

        // The argument may itself contain ';' (regexes), so split at most twice.
        let mut parts = s.splitn(3, ';');
        let (Some(target), Some(op), Some(arg)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected <target>;<op>;<argument>"));
        };

        let target = match target.trim() {
            "" => return Err(invalid("empty target")),
            "text" => FilterTarget::Text,
            kind => FilterTarget::Kind(kind.to_string()),
        };

        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| FilterError {
                filter: s.to_string(),
                reason: e.to_string(),
            })
        };

        let op = match op.trim() {
            "length" => {
                let (cmp, operand) = Comparison::parse_with_operand(arg)
                    .ok_or_else(|| invalid("length expects a comparison such as <=3"))?;
                FilterOp::Length(cmp, operand)
            }
            "regex" => FilterOp::Regex(compile(arg)?),
            "not-regex" => FilterOp::NotRegex(compile(arg)?),
            "contains" => FilterOp::Contains(arg.to_string()),
            "not-contains" => FilterOp::NotContains(arg.to_string()),
            other => return Err(invalid(&format!("unknown operation '{other}'"))),
        };

        Ok(Self {
            raw: s.to_string(),
            target,
            op,
        })
    }
}

impl fmt::Display for NodeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn find_descendant<'tree>(node: Node<'tree>, kind: &str) -> Option<Node<'tree>> {
    if node.kind() == kind {
        return Some(node);
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if let Some(found) = find_descendant(child, kind) {
            return Some(found);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts::{Language, SourceParser};

    fn parse(source: &str) -> ParsedSource {
        SourceParser::new(Language::Java)
            .unwrap()
            .parse_source(source)
            .unwrap()
    }

    fn declarators(parsed: &ParsedSource) -> Vec<Node<'_>> {
        let engine = crate::ts::QueryEngine::new(Language::Java, "(variable_declarator) @decl")
            .unwrap();
        engine
            .captures(parsed.root_node(), parsed.source())
            .into_iter()
            .map(|c| c.node)
            .collect()
    }

    #[test]
    fn length_filter_on_descendant_kind() {
        let parsed = parse("class A { int ab = 1; int abcd = 2; }");
        let filter: NodeFilter = "identifier;length;<=3".parse().unwrap();

        let kept: Vec<_> = declarators(&parsed)
            .into_iter()
            .filter(|n| filter.matches(*n, &parsed))
            .map(|n| parsed.node_text(n).to_string())
            .collect();

        assert_eq!(kept, vec!["ab = 1"]);
    }

    #[test]
    fn text_filters() {
        let parsed = parse("class A { int logCount = 1; int total = 2; }");
        let nodes = declarators(&parsed);

        let regex: NodeFilter = "text;regex;^log".parse().unwrap();
        let not_contains: NodeFilter = "text;not-contains;log".parse().unwrap();

        assert!(regex.matches(nodes[0], &parsed));
        assert!(!regex.matches(nodes[1], &parsed));
        assert!(!not_contains.matches(nodes[0], &parsed));
        assert!(not_contains.matches(nodes[1], &parsed));
    }

    #[test]
    fn unresolved_target_rejects() {
        let parsed = parse("class A { int ab = 1; }");
        let nodes = declarators(&parsed);
        let filter: NodeFilter = "string_literal;length;>0".parse().unwrap();
        assert!(!filter.matches(nodes[0], &parsed));
    }

    #[test]
    fn regex_argument_may_contain_separator() {
        let filter: NodeFilter = "text;regex;a;b".parse().unwrap();
        assert_eq!(filter.to_string(), "text;regex;a;b");
    }

    #[test]
    fn comparisons() {
        assert_eq!(
            Comparison::parse_with_operand("<3"),
            Some((Comparison::Lt, 3))
        );
        assert_eq!(
            Comparison::parse_with_operand(" >= 10"),
            Some((Comparison::Ge, 10))
        );
        assert_eq!(Comparison::parse_with_operand("4"), Some((Comparison::Eq, 4)));
        assert_eq!(Comparison::parse_with_operand("<x"), None);
    }

    #[test]
    fn malformed_filters_are_rejected() {
        assert!("identifier;length".parse::<NodeFilter>().is_err());
        assert!(";length;<3".parse::<NodeFilter>().is_err());
        assert!("text;startswith;x".parse::<NodeFilter>().is_err());
        assert!("text;regex;(unclosed".parse::<NodeFilter>().is_err());
        assert!("text;length;short".parse::<NodeFilter>().is_err());
    }
}
