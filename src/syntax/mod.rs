//! Go syntax trees built on tree-sitter.
//!
//! This module provides the position-aware node view every other layer
//! works with, typed views over declarations, and the parser that turns
//! source text into an [`AstFile`].

pub mod decl;
pub mod literal;
pub mod node;
pub mod parser;

pub use decl::{FuncDecl, GenDecl, ImportSpec, Spec, Token, TypeSpec, ValueSpec};
pub use node::{AstFile, AstNode, NodeKey};
pub use parser::{first_error_node, ErrorNode, GoParser};

/// Statements of a block or case clause, flattening the `statement_list`
/// wrapper newer grammars insert. A case clause's own expressions are not
/// statements and are left out.
pub fn statements<'a>(node: AstNode<'a>) -> Vec<AstNode<'a>> {
    let mut header = node.fields("value");
    header.extend(node.fields("type"));
    header.extend(node.fields("communication"));

    let mut out = Vec::new();
    for child in node.children() {
        if header.contains(&child) {
            continue;
        }
        if child.kind() == "statement_list" {
            out.extend(child.children());
        } else {
            out.push(child);
        }
    }
    out
}
