//! Thread-local parser pooling.
//!
//! Keeps one parser per grammar per thread. A parser is created on first
//! use and reused for every later parse of the same language.

use crate::ts::{Language, SourceParser, TreeSitterError};
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static PARSERS: RefCell<HashMap<Language, SourceParser>> = RefCell::new(HashMap::new());
}

/// Execute function with a pooled parser for `language`.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use treescan::pool::with_parser;
/// use treescan::ts::Language;
///
/// let _parsed = with_parser(Language::Java, |parser| {
///     parser.parse_source("class A {}")
/// })??;
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(language: Language, f: F) -> Result<R, TreeSitterError>
where
    F: FnOnce(&mut SourceParser) -> R,
{
    PARSERS.with(|cell| {
        let mut parsers = cell.borrow_mut();
        let parser = match parsers.entry(language) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(SourceParser::new(language)?)
            }
        };
        Ok(f(parser))
    })
}
