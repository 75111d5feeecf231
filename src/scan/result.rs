use crate::rule::{Rule, RuleMatch, Severity};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tree_sitter::Node;

/// One finding: a rule matched against one node.
///
/// The node is a handle into the parsed tree, so a result cannot outlive
/// the [`ParsedSource`](crate::ts::ParsedSource) it came from.
#[derive(Clone)]
pub struct ScanResult<'tree> {
    rule: Arc<dyn Rule>,
    node: Node<'tree>,
    text: &'tree str,
    file_path: Option<PathBuf>,
    metadata: Vec<(String, String)>,
    message: String,
    severity: Severity,
}

impl<'tree> ScanResult<'tree> {
    /// Build a result, rendering the rule's message with the match metadata.
    pub fn new(
        rule: Arc<dyn Rule>,
        severity: Severity,
        matched: RuleMatch<'tree>,
        text: &'tree str,
        file_path: Option<PathBuf>,
    ) -> Self {
        let message = interpolate(rule.meta().message(), &matched.metadata);
        Self {
            rule,
            node: matched.node,
            text,
            file_path,
            metadata: matched.metadata,
            message,
            severity,
        }
    }

    pub fn rule(&self) -> &dyn Rule {
        self.rule.as_ref()
    }

    pub fn rule_id(&self) -> &str {
        self.rule.meta().id()
    }

    pub fn node(&self) -> Node<'tree> {
        self.node
    }

    /// Source text of the matched node.
    pub fn text(&self) -> &'tree str {
        self.text
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn metadata(&self) -> &[(String, String)] {
        &self.metadata
    }

    /// Rendered message with placeholders substituted.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn suggestion(&self) -> &str {
        self.rule.meta().suggestion()
    }

    /// Effective (clamped) severity.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// 1-based line of the node start.
    pub fn line(&self) -> usize {
        self.node.start_position().row + 1
    }

    /// 1-based column of the node start.
    pub fn column(&self) -> usize {
        self.node.start_position().column + 1
    }

    /// Owned, serializable view of this result.
    pub fn to_record(&self) -> ResultRecord {
        let meta = self.rule.meta();
        ResultRecord {
            rule_id: meta.id().to_string(),
            name: meta.name().to_string(),
            category: meta.category().to_string(),
            severity: self.severity,
            message: self.message.clone(),
            suggestion: meta.suggestion().to_string(),
            file: self.file_path.clone(),
            line: self.line(),
            column: self.column(),
            kind: self.node.kind().to_string(),
            text: self.text.to_string(),
        }
    }
}

impl PartialEq for ScanResult<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.rule_id() == other.rule_id()
            && self.node == other.node
            && self.file_path == other.file_path
            && self.metadata == other.metadata
            && self.message == other.message
            && self.severity == other.severity
    }
}

impl fmt::Debug for ScanResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanResult")
            .field("rule", &self.rule_id())
            .field("node", &self.node)
            .field("text", &self.text)
            .field("file_path", &self.file_path)
            .field("metadata", &self.metadata)
            .field("message", &self.message)
            .field("severity", &self.severity)
            .finish()
    }
}

/// Serializable snapshot of a [`ScanResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    pub rule_id: String,
    pub name: String,
    pub category: String,
    pub severity: Severity,
    pub message: String,
    pub suggestion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    pub line: usize,
    pub column: usize,
    pub kind: String,
    pub text: String,
}

/// Replace every `%key%` in `template` with its metadata value.
///
/// Single left-to-right pass: substituted values are copied verbatim and never
/// scanned for placeholders. Placeholders without a matching key are left as
/// they are.
pub fn interpolate(template: &str, metadata: &[(String, String)]) -> String {
    let mut message = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('%') {
        message.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let Some(end) = after.find('%') else {
            message.push_str(&rest[start..]);
            return message;
        };

        let key = &after[..end];
        if !is_placeholder_key(key) {
            // Lone '%'; the next one may still open a placeholder.
            message.push('%');
            rest = after;
            continue;
        }

        match metadata.iter().find(|(k, _)| k == key) {
            Some((_, value)) => message.push_str(value),
            None => {
                message.push('%');
                message.push_str(key);
                message.push('%');
            }
        }
        rest = &after[end + 1..];
    }

    message.push_str(rest);
    message
}

fn is_placeholder_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{QueryRule, RuleMeta};
    use crate::ts::{Language, SourceParser};
    use proptest::prelude::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn interpolate_replaces_known_keys() {
        let message = interpolate(
            "Name '%name%' is %length% chars, minimum %minimum%",
            &pairs(&[("name", "a"), ("length", "1"), ("minimum", "3")]),
        );
        assert_eq!(message, "Name 'a' is 1 chars, minimum 3");
    }

    #[test]
    fn interpolate_leaves_unknown_placeholders() {
        let message = interpolate("%name% in %file%", &pairs(&[("name", "x")]));
        assert_eq!(message, "x in %file%");
    }

    #[test]
    fn interpolate_does_not_rescan_substituted_values() {
        let message = interpolate(
            "Found %text% as %s%",
            &pairs(&[("text", "\"%s%\""), ("s", "\"%text%\"")]),
        );
        assert_eq!(message, "Found \"%s%\" as \"%text%\"");
    }

    #[test]
    fn interpolate_keeps_literal_percent_signs() {
        let message = interpolate("100% of %name% at 5%", &pairs(&[("name", "x")]));
        assert_eq!(message, "100% of x at 5%");
        assert_eq!(interpolate("%%name%", &pairs(&[("name", "x")])), "%x");
    }

    #[test]
    fn query_rule_message_with_placeholder_in_captured_text() {
        let parsed = SourceParser::new(Language::Java)
            .unwrap()
            .parse_source(r#"class A { String x = "%s%"; }"#)
            .unwrap();
        let rule: Arc<dyn Rule> = Arc::new(QueryRule::new(
            RuleMeta::builder("strings")
                .query("(string_literal) @s")
                .message("Found %text%")
                .build(),
        ));

        let matched = rule.apply(&parsed).unwrap().remove(0);
        let text = parsed.node_text(matched.node);
        let result = ScanResult::new(rule, Severity::Info, matched, text, None);
        assert_eq!(result.message(), r#"Found "%s%""#);
    }

    #[test]
    fn interpolate_replaces_every_occurrence() {
        let message = interpolate("%k% and %k%", &pairs(&[("k", "v")]));
        assert_eq!(message, "v and v");
    }

    proptest! {
        #[test]
        fn interpolate_without_metadata_is_identity(template in ".*") {
            prop_assert_eq!(interpolate(&template, &[]), template);
        }

        #[test]
        fn interpolate_substitutes_single_key(
            key in "[a-z]{1,8}",
            value in "[A-Za-z0-9 ]{0,12}",
            prefix in "[a-z ]{0,10}",
        ) {
            let template = format!("{prefix}%{key}%");
            let rendered = interpolate(&template, &[(key.clone(), value.clone())]);
            prop_assert_eq!(rendered, format!("{prefix}{value}"));
        }
    }

    #[test]
    fn result_renders_message_and_position() {
        let parsed = SourceParser::new(Language::Java)
            .unwrap()
            .parse_source("class A {\n  int a;\n}")
            .unwrap();
        let rule: Arc<dyn Rule> = Arc::new(QueryRule::new(
            RuleMeta::builder("short")
                .name("Short name")
                .category("codestyle")
                .message("'%name%' is too short")
                .suggestion("Rename")
                .build(),
        ));

        let class = parsed.root_node().named_child(0).unwrap();
        let body = class.child_by_field_name("body").unwrap();
        let decl = body.named_child(0).unwrap();
        let matched = RuleMatch::new(decl).with_meta("name", "a");
        let result = ScanResult::new(
            rule,
            Severity::Warning,
            matched,
            parsed.node_text(decl),
            Some(PathBuf::from("A.java")),
        );

        assert_eq!(result.message(), "'a' is too short");
        assert_eq!(result.line(), 2);
        assert_eq!(result.column(), 3);
        assert_eq!(result.text(), "int a;");

        let record = result.to_record();
        assert_eq!(record.rule_id, "short");
        assert_eq!(record.severity, Severity::Warning);
        assert_eq!(record.kind, "field_declaration");
        assert_eq!(record.file, Some(PathBuf::from("A.java")));
    }
}
