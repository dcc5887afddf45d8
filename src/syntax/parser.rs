use crate::error::{Error, ParseError};
use crate::pos::{Pos, Position, PositionTable};
use crate::syntax::node::AstFile;
use ast_grep_language::{LanguageExt, SupportLang};
use tree_sitter::{Node, Parser, Tree};

/// Tree-sitter parser wrapper for Go source code.
pub struct GoParser {
    parser: Parser,
}

impl GoParser {
    /// Create a new Go parser.
    pub fn new() -> Result<Self, Error> {
        let mut parser = Parser::new();
        // Get the tree-sitter Language from ast-grep-language
        let ts_lang = SupportLang::Go.get_ts_language();
        parser.set_language(&ts_lang).map_err(|_| Error::LanguageSet)?;

        Ok(Self { parser })
    }

    /// Parse source code into a raw tree-sitter Tree, tolerating errors.
    pub fn parse_tree(&mut self, source: &str) -> Option<Tree> {
        self.parser.parse(source, None)
    }

    /// Register `source` under `name` in `table` and parse it.
    ///
    /// Any syntax error, as well as a file shape Go rejects (missing package
    /// clause, imports after declarations, statements at top level), is a
    /// parse failure reported at the offending position.
    pub fn parse_file(
        &mut self,
        table: &mut PositionTable,
        name: &str,
        source: String,
    ) -> Result<AstFile, ParseError> {
        let (id, base) = table.add_file(name, &source);

        let tree = match self.parser.parse(&source, None) {
            Some(tree) => tree,
            None => return Err(error_at(table, base, name, 0, "parse aborted".to_string())),
        };

        if let Some(error) = first_error_node(tree.root_node()) {
            let message = error.message(&source);
            return Err(error_at(table, base, name, error.byte_start, message));
        }
        if let Err((offset, message)) = check_file_shape(tree.root_node(), &source) {
            return Err(error_at(table, base, name, offset, message));
        }

        Ok(AstFile::new(id, name.to_string(), source, tree, base))
    }
}

fn error_at(
    table: &PositionTable,
    base: Pos,
    name: &str,
    offset: usize,
    message: String,
) -> ParseError {
    let position = table
        .position(Pos(base.0 + offset as u32))
        .unwrap_or_else(|| Position {
            filename: name.to_string(),
            offset,
            line: 1,
            column: 1,
        });
    ParseError { position, message }
}

/// Information about an ERROR or MISSING node in the parse tree.
#[derive(Debug, Clone)]
pub struct ErrorNode {
    pub byte_start: usize,
    pub byte_end: usize,
    pub start_point: tree_sitter::Point,
    pub missing: Option<&'static str>,
}

impl ErrorNode {
    fn message(&self, source: &str) -> String {
        if let Some(kind) = self.missing {
            return format!("syntax error: missing {kind}");
        }
        let snippet = source[self.byte_start..self.byte_end]
            .lines()
            .next()
            .unwrap_or("")
            .trim();
        if snippet.is_empty() {
            "syntax error: unexpected newline".to_string()
        } else {
            let short: String = snippet.chars().take(32).collect();
            format!("syntax error: unexpected {short}")
        }
    }
}

/// Find the first ERROR or MISSING node in source order.
///
/// A missing statement terminator directly before `)` or `}` is not an
/// error: Go allows the semicolon to be omitted there (`const (A; B)`).
pub fn first_error_node(node: Node<'_>) -> Option<ErrorNode> {
    if node.is_missing() && elided_terminator(node) {
        return None;
    }
    if node.is_error() || node.is_missing() {
        return Some(ErrorNode {
            byte_start: node.start_byte(),
            byte_end: node.end_byte(),
            start_point: node.start_position(),
            missing: node.is_missing().then(|| node.kind()),
        });
    }
    if !node.has_error() {
        return None;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error_node(child) {
            return Some(found);
        }
    }

    None
}

fn elided_terminator(node: Node<'_>) -> bool {
    matches!(node.kind(), ";" | "\n" | "\0")
        && node
            .next_sibling()
            .map_or(true, |next| matches!(next.kind(), ")" | "}"))
}

const TOP_LEVEL_DECLS: &[&str] = &[
    "function_declaration",
    "method_declaration",
    "const_declaration",
    "var_declaration",
    "type_declaration",
];

/// Go-specific constraints the grammar itself does not enforce.
fn check_file_shape(root: Node<'_>, source: &str) -> Result<(), (usize, String)> {
    let mut cursor = root.walk();
    let mut seen_package = false;
    let mut seen_decl = false;

    for child in root.named_children(&mut cursor) {
        let kind = child.kind();
        if kind == "comment" {
            continue;
        }
        if !seen_package {
            if kind != "package_clause" {
                let found = source[child.byte_range()].split_whitespace().next().unwrap_or("");
                return Err((child.start_byte(), format!("expected 'package', found {found}")));
            }
            seen_package = true;
            continue;
        }
        match kind {
            "package_clause" => {
                return Err((child.start_byte(), "expected declaration, found 'package'".to_string()))
            }
            "import_declaration" if seen_decl => {
                return Err((
                    child.start_byte(),
                    "imports must appear before other declarations".to_string(),
                ))
            }
            "import_declaration" => {}
            k if TOP_LEVEL_DECLS.contains(&k) => seen_decl = true,
            _ => {
                return Err((
                    child.start_byte(),
                    "non-declaration statement outside function body".to_string(),
                ))
            }
        }
    }

    if !seen_package {
        return Err((source.len(), "expected 'package', found EOF".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<AstFile, ParseError> {
        let mut parser = GoParser::new().unwrap();
        let mut table = PositionTable::new();
        parser.parse_file(&mut table, "t.go", source.to_string())
    }

    #[test]
    fn parse_valid_go() {
        let file = parse("package p\n\nfunc main() { println(\"hello\") }\n").unwrap();
        assert_eq!(file.root().kind(), "source_file");
        assert_eq!(file.package_name(), "p");
    }

    #[test]
    fn parse_invalid_go() {
        let err = parse("package p\n\nfunc main( { }\n").unwrap_err();
        assert!(err.message.starts_with("syntax error"), "{}", err.message);
        assert_eq!(err.position.filename, "t.go");
    }

    #[test]
    fn missing_package_clause() {
        let err = parse("func main() {}\n").unwrap_err();
        assert_eq!(err.message, "expected 'package', found func");
        assert_eq!(err.position.line, 1);
    }

    #[test]
    fn empty_file_has_no_package() {
        let err = parse("").unwrap_err();
        assert_eq!(err.message, "expected 'package', found EOF");
    }

    #[test]
    fn statement_at_top_level() {
        let err = parse("package p\nx := 1\n").unwrap_err();
        assert_eq!(err.message, "non-declaration statement outside function body");
        assert_eq!(err.position.line, 2);
    }

    #[test]
    fn import_after_declaration() {
        let err = parse("package p\nvar x = 1\nimport \"fmt\"\n").unwrap_err();
        assert_eq!(err.message, "imports must appear before other declarations");
    }

    #[test]
    fn semicolon_separated_file() {
        let file = parse("package p; type X struct { a string }").unwrap();
        assert_eq!(file.decls().len(), 1);
        assert_eq!(file.decls()[0].kind(), "type_declaration");
    }

    #[test]
    fn grouped_const_declaration() {
        let file = parse("package p\n\nconst (\n\tX = iota\n\tY\n\tZ\n)\n").unwrap();
        assert_eq!(file.decls().len(), 1);
        assert_eq!(file.decls()[0].kind(), "const_declaration");
    }
}
