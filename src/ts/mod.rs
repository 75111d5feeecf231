//! Tree-sitter integration: grammars, parsing and queries.
//!
//! This is the syntax-tree provider the rule engine runs on. Everything
//! above it only sees `parse(text) -> tree` and
//! `query(node, query) -> captures`.

pub mod errors;
pub mod lang;
pub mod parser;
pub mod query;

pub use errors::TreeSitterError;
pub use lang::Language;
pub use parser::{ErrorNode, ParsedSource, SourceParser};
pub use query::{queries, Capture, QueryEngine};
