use crate::ts::errors::TreeSitterError;
use crate::ts::lang::Language;
use tree_sitter::{Node, Query, QueryCursor, StreamingIterator};

/// A (capture name, node) pair produced by a query.
#[derive(Debug, Clone)]
pub struct Capture<'tree> {
    pub name: String,
    pub node: Node<'tree>,
}

/// Compiled tree-sitter query for one grammar.
pub struct QueryEngine {
    query: Query,
    capture_names: Vec<String>,
    language: Language,
}

impl QueryEngine {
    /// Compile a query string against a grammar.
    ///
    /// # Query Syntax
    ///
    /// Tree-sitter queries use S-expression syntax:
    /// ```text
    /// (variable_declarator
    ///   name: (identifier) @name
    ///   (#match? @name "^[a-z]{1,2}$"))
    /// ```
    ///
    /// Captures are prefixed with `@`. Text predicates (`#eq?`, `#match?`,
    /// `#any-of?` and their negations) are evaluated against the source text.
    pub fn new(language: Language, query_str: &str) -> Result<Self, TreeSitterError> {
        let query = Query::new(&language.ts_language(), query_str).map_err(|e| {
            TreeSitterError::InvalidQuery {
                message: e.to_string(),
            }
        })?;

        let capture_names = query.capture_names().iter().map(|s| s.to_string()).collect();

        Ok(Self {
            query,
            capture_names,
            language,
        })
    }

    /// Run the query under `node` and return every capture in document order.
    pub fn captures<'tree>(&self, node: Node<'tree>, source: &str) -> Vec<Capture<'tree>> {
        let mut cursor = QueryCursor::new();
        let mut captures = cursor.captures(&self.query, node, source.as_bytes());

        let mut results = Vec::new();

        // tree-sitter 0.25+ uses StreamingIterator
        while let Some((m, index)) = captures.next() {
            let capture = &m.captures[*index];
            results.push(Capture {
                name: self.capture_names[capture.index as usize].clone(),
                node: capture.node,
            });
        }

        results
    }

    /// Get capture names defined in the query.
    pub fn capture_names(&self) -> &[String] {
        &self.capture_names
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

/// Reusable queries.
pub mod queries {
    /// Used by `dump` when no query is given: lists every parse error.
    pub const DEFAULT_DUMP_QUERY: &str = "(ERROR) @error";

    /// Identifiers of Java local variables and fields.
    pub const JAVA_VARIABLE_NAMES: &str = "(variable_declarator name: (identifier) @name)";

    /// Java method names.
    pub const JAVA_METHOD_NAMES: &str = "(method_declaration name: (identifier) @name)";

    /// Java formal parameter names.
    pub const JAVA_PARAMETER_NAMES: &str = "(formal_parameter name: (identifier) @name)";
}
