use crate::ts::errors::TreeSitterError;
use crate::ts::lang::Language;
use tree_sitter::{Node, Parser, Tree};

/// Tree-sitter parser bound to one grammar.
pub struct SourceParser {
    parser: Parser,
    language: Language,
}

impl SourceParser {
    pub fn new(language: Language) -> Result<Self, TreeSitterError> {
        let mut parser = Parser::new();
        parser
            .set_language(&language.ts_language())
            .map_err(|_| TreeSitterError::LanguageSet { language })?;

        Ok(Self { parser, language })
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Parse source code into a tree-sitter Tree.
    pub fn parse(&mut self, source: &str) -> Result<Tree, TreeSitterError> {
        self.parser
            .parse(source, None)
            .ok_or(TreeSitterError::ParseFailed {
                language: self.language,
            })
    }

    /// Parse source code and keep the text alongside the tree.
    pub fn parse_source(
        &mut self,
        source: impl Into<String>,
    ) -> Result<ParsedSource, TreeSitterError> {
        let source = source.into();
        let tree = self.parse(&source)?;
        Ok(ParsedSource {
            source,
            tree,
            language: self.language,
        })
    }
}

/// A source text with its immutable syntax tree.
///
/// Nodes handed out by [`ParsedSource::root_node`] borrow from this value, so
/// anything holding a node cannot outlive the parse.
pub struct ParsedSource {
    source: String,
    tree: Tree,
    language: Language,
}

impl ParsedSource {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Check if the tree contains any ERROR or MISSING nodes.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Get all ERROR and MISSING nodes in the tree.
    pub fn error_nodes(&self) -> Vec<ErrorNode> {
        let mut errors = Vec::new();
        collect_error_nodes(self.tree.root_node(), &mut errors);
        errors
    }

    /// Extract text for a node's byte range.
    pub fn node_text<'a>(&'a self, node: Node<'_>) -> &'a str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }
}

/// Information about an ERROR node in the parse tree.
#[derive(Debug, Clone)]
pub struct ErrorNode {
    pub byte_start: usize,
    pub byte_end: usize,
    pub start_point: tree_sitter::Point,
    pub end_point: tree_sitter::Point,
}

fn collect_error_nodes(node: Node<'_>, errors: &mut Vec<ErrorNode>) {
    if node.is_error() || node.is_missing() {
        errors.push(ErrorNode {
            byte_start: node.start_byte(),
            byte_end: node.end_byte(),
            start_point: node.start_position(),
            end_point: node.end_position(),
        });
    }

    if !node.has_error() {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_nodes(child, errors);
    }
}
