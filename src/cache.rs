//! Thread-local cache of compiled tree-sitter queries.
//!
//! Rules are shared across scan sessions, so the same query string gets
//! compiled again for every file. Compiling once per thread avoids that.
//! Cache is capped at 256 entries; it is cleared when full.
//! Queries that fail to compile are never cached.

use crate::ts::{Language, QueryEngine, TreeSitterError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    // Key is "<language>:<query>" so the same query text compiled for two
    // grammars never collides.
    static QUERY_CACHE: RefCell<HashMap<String, Rc<QueryEngine>>> =
        RefCell::new(HashMap::new());
}

/// Get a compiled query from cache, or compile and cache it.
pub fn get_or_compile_query(
    language: Language,
    query_str: &str,
) -> Result<Rc<QueryEngine>, TreeSitterError> {
    let cache_key = format!("{language}:{query_str}");

    QUERY_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(engine) = cache.get(&cache_key) {
            return Ok(Rc::clone(engine));
        }

        let compiled = Rc::new(QueryEngine::new(language, query_str)?);

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }
        cache.insert(cache_key, Rc::clone(&compiled));
        Ok(compiled)
    })
}

/// Clear the query cache (mainly for testing).
pub fn clear_cache() {
    QUERY_CACHE.with(|cache| {
        cache.borrow_mut().clear();
    });
}

/// Number of cached queries on this thread.
pub fn cache_size() -> usize {
    QUERY_CACHE.with(|cache| cache.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiled_queries_are_reused() {
        clear_cache();
        let first = get_or_compile_query(Language::Java, "(identifier) @id").unwrap();
        let second = get_or_compile_query(Language::Java, "(identifier) @id").unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache_size(), 1);
    }

    #[test]
    fn same_query_is_keyed_per_language() {
        clear_cache();
        let java = get_or_compile_query(Language::Java, "(identifier) @id").unwrap();
        let rust = get_or_compile_query(Language::Rust, "(identifier) @id").unwrap();

        assert!(!Rc::ptr_eq(&java, &rust));
        assert_eq!(rust.language(), Language::Rust);
        assert_eq!(cache_size(), 2);
    }

    #[test]
    fn invalid_queries_are_not_cached() {
        clear_cache();
        assert!(get_or_compile_query(Language::Java, "(bogus_kind) @x").is_err());
        assert_eq!(cache_size(), 0);
    }
}
