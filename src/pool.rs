//! Thread-local parser pooling.
//!
//! A parser is created on first use per thread and reused for every later
//! FileSet construction on that thread.

use crate::error::Error;
use crate::syntax::GoParser;
use std::cell::RefCell;

thread_local! {
    static GO_PARSER: RefCell<Option<GoParser>> = const { RefCell::new(None) };
}

/// Execute `f` with the pooled parser of this thread.
///
/// # Example
///
/// ```
/// # fn main() -> Result<(), gogen::Error> {
/// use gogen::pool::with_parser;
///
/// let parsed = with_parser(|parser| parser.parse_tree("package p\n").is_some())?;
/// assert!(parsed);
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(f: F) -> Result<R, Error>
where
    F: FnOnce(&mut GoParser) -> R,
{
    GO_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        let parser = match slot.as_mut() {
            Some(parser) => parser,
            None => slot.insert(GoParser::new()?),
        };
        Ok(f(parser))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_is_reused() {
        let first = with_parser(|p| p as *const GoParser as usize).unwrap();
        let second = with_parser(|p| p as *const GoParser as usize).unwrap();
        assert_eq!(first, second);
    }
}
