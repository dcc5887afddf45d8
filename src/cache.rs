//! Thread-local cache of compiled ast-grep patterns.
//!
//! Capped at 256 entries; the whole cache is cleared when full.

use crate::pattern::{compile, PatternError};
use ast_grep_core::Pattern;
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    static PATTERN_CACHE: RefCell<HashMap<String, Vec<Pattern>>> =
        RefCell::new(HashMap::new());
}

/// Get the compiled readings of a Go pattern from the cache, or compile and
/// cache them. Invalid patterns are not cached.
pub fn get_or_compile_pattern(pattern: &str) -> Result<Vec<Pattern>, PatternError> {
    PATTERN_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(p) = cache.get(pattern) {
            return Ok(p.clone());
        }

        let compiled = compile(pattern)?;
        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }
        cache.insert(pattern.to_string(), compiled.clone());
        Ok(compiled)
    })
}

#[cfg(test)]
pub fn clear_cache() {
    PATTERN_CACHE.with(|cache| cache.borrow_mut().clear());
}

#[cfg(test)]
pub fn cache_size() -> usize {
    PATTERN_CACHE.with(|cache| cache.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_valid_patterns_only() {
        clear_cache();
        assert!(get_or_compile_pattern("fmt.Println($$$ARGS)").is_ok());
        assert!(get_or_compile_pattern("fmt.Println($$$ARGS)").is_ok());
        assert_eq!(cache_size(), 1);

        assert!(matches!(
            get_or_compile_pattern("   "),
            Err(PatternError::Empty)
        ));
        assert_eq!(cache_size(), 1);
    }

    #[test]
    fn evicts_when_full() {
        clear_cache();
        for i in 0..MAX_CACHE_ENTRIES {
            get_or_compile_pattern(&format!("x{i}")).unwrap();
        }
        assert_eq!(cache_size(), MAX_CACHE_ENTRIES);
        get_or_compile_pattern("overflow").unwrap();
        assert_eq!(cache_size(), 1);
    }
}
