//! Structural pattern search with ast-grep metavariables.
//!
//! - `$NAME` matches a single node and captures it
//! - `$$$NAME` matches zero or more nodes
//! - `$_` matches any single node without capturing
//!
//! ```text
//! fmt.Println($$$ARGS)          // calls to fmt.Println
//! func $NAME($$$P) error { $$$B }
//! if err != nil { return $ERR }
//! ```

use crate::cache::get_or_compile_pattern;
use crate::fileset::FileSet;
use crate::pos::{FileId, Pos};
use ast_grep_core::matcher::PatternNode;
use ast_grep_core::meta_var::MetaVariable;
use ast_grep_core::ops::Any;
use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_core::{AstGrep, Language, NodeMatch, Pattern};
use ast_grep_language::SupportLang;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("empty pattern")]
    Empty,

    #[error("invalid pattern {pattern:?}: {message}")]
    Invalid { pattern: String, message: String },
}

/// One match of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub file: FileId,
    /// Position of the first matched byte.
    pub pos: Pos,
    /// Byte range within the file.
    pub range: Range<usize>,
    pub text: String,
    /// Captured metavariables: name to text.
    pub captures: BTreeMap<String, String>,
}

impl FileSet {
    /// All matches of `pattern`, file by file in order, each file's matches
    /// in source order.
    pub fn find_pattern(&self, pattern: &str) -> Result<Vec<PatternMatch>, PatternError> {
        let compiled = Any::new(get_or_compile_pattern(pattern)?);

        let mut results = Vec::new();
        for file in self.ast_files() {
            let sg = AstGrep::new(file.source(), SupportLang::Go);
            results.extend(
                sg.root()
                    .find_all(&compiled)
                    .map(|m| to_pattern_match(file.id(), file.base(), m)),
            );
        }
        debug!(pattern, matches = results.len(), "pattern search");
        Ok(results)
    }
}

/// Compile every reading of a Go pattern.
///
/// On its own, `pkg.F(x)` also parses as a conversion of `x` to the type
/// `pkg.F`, which never matches a call in a function body. Such patterns
/// get a second, call-shaped reading.
pub(crate) fn compile(pattern: &str) -> Result<Vec<Pattern>, PatternError> {
    if pattern.trim().is_empty() {
        return Err(PatternError::Empty);
    }
    let plain = Pattern::try_new(pattern, SupportLang::Go).map_err(|err| PatternError::Invalid {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })?;
    let mut readings = vec![plain];
    readings.extend(call_reading(pattern.trim()));
    Ok(readings)
}

/// Parse `callee(arg)` as `callee(arg, $$$)`, which can only be a call,
/// then drop the added argument again.
fn call_reading(pattern: &str) -> Option<Pattern> {
    let (callee, arg) = split_single_arg_call(pattern)?;
    let lang = SupportLang::Go;
    let mut compiled = Pattern::try_new(&format!("{callee}({arg}, $$$)"), lang).ok()?;

    let call_kind = lang.kind_to_id("call_expression");
    let list_kind = lang.kind_to_id("argument_list");
    let PatternNode::Internal { kind_id, children } = &mut compiled.node else {
        return None;
    };
    if *kind_id != call_kind {
        return None;
    }
    let list = children
        .iter_mut()
        .rev()
        .find(|c| matches!(c, PatternNode::Internal { kind_id, .. } if *kind_id == list_kind))?;
    let PatternNode::Internal { children: items, .. } = list else {
        return None;
    };
    let added = items.iter().rposition(|n| {
        matches!(
            n,
            PatternNode::MetaVar {
                meta_var: MetaVariable::Multiple
            }
        )
    })?;
    let comma = added.checked_sub(1)?;
    if !matches!(&items[comma], PatternNode::Terminal { text, .. } if text == ",") {
        return None;
    }
    items.drain(comma..=added);
    Some(compiled)
}

/// Split `callee(arg)` with exactly one argument. The argument may itself
/// contain commas inside brackets or quotes.
fn split_single_arg_call(text: &str) -> Option<(&str, &str)> {
    if !text.ends_with(')') {
        return None;
    }
    let last = text.len() - 1;
    let mut opens = Vec::new();
    let mut commas = Vec::new();
    let mut open = None;
    let mut quote = None;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' && q != '`' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '[' | '{' => opens.push(i),
            ')' | ']' | '}' => {
                let start = opens.pop()?;
                if i == last {
                    open = Some(start);
                }
            }
            ',' => commas.push((i, opens.len())),
            _ => {}
        }
    }
    let open = open?;
    let callee = text[..open].trim_end();
    let arg = text[open + 1..last].trim();
    let callee_ends_name = callee
        .chars()
        .last()
        .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == ']');
    // Commas directly inside the outer parentheses separate arguments.
    let several = commas.iter().any(|(i, depth)| *i > open && *depth == 1);
    if !callee_ends_name || arg.is_empty() || several {
        return None;
    }
    Some((callee, arg))
}

fn to_pattern_match(file: FileId, base: Pos, m: NodeMatch<StrDoc<SupportLang>>) -> PatternMatch {
    let node = m.get_node();
    let range = node.range();
    let text = node.text().to_string();

    let env = m.get_env().clone();
    let captures: HashMap<String, String> = env.into();

    PatternMatch {
        file,
        pos: Pos(base.0 + range.start as u32),
        range,
        text,
        captures: captures.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fileset(texts: &[&str]) -> FileSet {
        FileSet::from_texts(texts.iter().copied()).unwrap()
    }

    #[test]
    fn finds_calls_across_files_in_order() {
        let fs = fileset(&[
            "package p\n\nimport \"fmt\"\n\nfunc a() { fmt.Println(\"a\", 1) }\n",
            "package p\n\nimport \"fmt\"\n\nfunc b() {\n\tfmt.Println(\"b\")\n\tfmt.Printf(\"%d\", 2)\n}\n",
        ]);

        let matches = fs.find_pattern("fmt.Println($$$ARGS)").unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].file, FileId(0));
        assert_eq!(matches[1].file, FileId(1));
        assert_eq!(matches[0].text, "fmt.Println(\"a\", 1)");

        let position = fs.position(matches[1].pos).unwrap();
        assert_eq!((position.line, position.column), (6, 2));
    }

    #[test]
    fn captures_single_metavariables() {
        let fs = fileset(&["package p\n\nfunc Add(a, b int) int { return a + b }\n"]);
        let matches = fs.find_pattern("$X + $Y").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].captures["X"], "a");
        assert_eq!(matches[0].captures["Y"], "b");
    }

    #[test]
    fn no_matches_is_empty() {
        let fs = fileset(&["package p\n\nvar x = 1\n"]);
        assert!(fs.find_pattern("panic($E)").unwrap().is_empty());
    }

    #[test]
    fn qualified_single_argument_calls_match() {
        let fs = fileset(&[
            "package p\n\nimport \"errors\"\n\nvar a = errors.New(\"a\")\n\nfunc f() error { return errors.New(\"b\" + \"c\") }\n",
        ]);
        let matches = fs.find_pattern("errors.New($MSG)").unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].captures["MSG"], "\"a\"");
        assert_eq!(matches[1].captures["MSG"], "\"b\" + \"c\"");

        assert_eq!(fs.find_pattern("errors.New($$$)").unwrap().len(), 2);
    }

    #[test]
    fn splits_single_argument_calls() {
        assert_eq!(split_single_arg_call("fmt.Println($$$ARGS)"), Some(("fmt.Println", "$$$ARGS")));
        assert_eq!(split_single_arg_call("f(g(a, b))"), Some(("f", "g(a, b)")));
        assert_eq!(split_single_arg_call("f(\"a, b\")"), Some(("f", "\"a, b\"")));
        assert_eq!(split_single_arg_call("F[int](x)"), Some(("F[int]", "x")));
        assert_eq!(split_single_arg_call("f(a, b)"), None);
        assert_eq!(split_single_arg_call("f()"), None);
        assert_eq!(split_single_arg_call("(x)"), None);
        assert_eq!(split_single_arg_call("x + 1"), None);
    }

    #[test]
    fn compile_adds_call_reading_only_for_single_argument_calls() {
        assert_eq!(compile("fmt.Println($$$ARGS)").unwrap().len(), 2);
        assert_eq!(compile("append($S, $$$REST)").unwrap().len(), 1);
        assert_eq!(compile("$X + $Y").unwrap().len(), 1);
    }

    #[test]
    fn empty_pattern_is_rejected() {
        let fs = fileset(&["package p\n"]);
        assert_eq!(fs.find_pattern(""), Err(PatternError::Empty));
    }
}
