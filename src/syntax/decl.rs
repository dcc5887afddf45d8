//! Typed views over declaration nodes.
//!
//! Each view wraps an [`AstNode`] of a known kind and exposes the parts a
//! caller needs by name instead of by grammar field.

use crate::syntax::literal;
use crate::syntax::node::AstNode;
use std::fmt;

/// Keyword introducing a general declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Import,
    Const,
    Type,
    Var,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Token::Import => "import",
            Token::Const => "const",
            Token::Type => "type",
            Token::Var => "var",
        };
        f.write_str(s)
    }
}

/// An `import`, `const`, `type` or `var` declaration, grouped or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenDecl<'a>(AstNode<'a>);

impl<'a> GenDecl<'a> {
    pub fn cast(node: AstNode<'a>) -> Option<Self> {
        matches!(
            node.kind(),
            "import_declaration" | "const_declaration" | "type_declaration" | "var_declaration"
        )
        .then_some(Self(node))
    }

    pub fn node(&self) -> AstNode<'a> {
        self.0
    }

    pub fn tok(&self) -> Token {
        match self.0.kind() {
            "import_declaration" => Token::Import,
            "const_declaration" => Token::Const,
            "type_declaration" => Token::Type,
            _ => Token::Var,
        }
    }

    /// Whether the specs are enclosed in parentheses.
    pub fn is_grouped(&self) -> bool {
        self.0.has_token("(")
            || self
                .0
                .children()
                .iter()
                .any(|c| c.kind().ends_with("_spec_list"))
    }

    /// The specs of this declaration in source order.
    pub fn specs(&self) -> Vec<Spec<'a>> {
        let mut specs = Vec::new();
        for child in self.0.children() {
            if child.kind().ends_with("_spec_list") {
                specs.extend(child.children().into_iter().filter_map(Spec::cast));
            } else if let Some(spec) = Spec::cast(child) {
                specs.push(spec);
            }
        }
        specs
    }

    /// The value specs of a `const` or `var` declaration.
    pub fn value_specs(&self) -> Vec<ValueSpec<'a>> {
        self.specs()
            .into_iter()
            .filter_map(|s| match s {
                Spec::Value(v) => Some(v),
                _ => None,
            })
            .collect()
    }
}

/// One spec of a [`GenDecl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spec<'a> {
    Import(ImportSpec<'a>),
    Value(ValueSpec<'a>),
    Type(TypeSpec<'a>),
}

impl<'a> Spec<'a> {
    pub fn cast(node: AstNode<'a>) -> Option<Self> {
        ImportSpec::cast(node)
            .map(Spec::Import)
            .or_else(|| ValueSpec::cast(node).map(Spec::Value))
            .or_else(|| TypeSpec::cast(node).map(Spec::Type))
    }

    pub fn node(&self) -> AstNode<'a> {
        match self {
            Spec::Import(s) => s.node(),
            Spec::Value(s) => s.node(),
            Spec::Type(s) => s.node(),
        }
    }
}

/// `import name "path"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSpec<'a>(AstNode<'a>);

impl<'a> ImportSpec<'a> {
    pub fn cast(node: AstNode<'a>) -> Option<Self> {
        (node.kind() == "import_spec").then_some(Self(node))
    }

    pub fn node(&self) -> AstNode<'a> {
        self.0
    }

    /// The explicit local name: an identifier, `.` or `_`.
    pub fn name_node(&self) -> Option<AstNode<'a>> {
        self.0.field("name")
    }

    pub fn name(&self) -> Option<&'a str> {
        self.name_node().map(|n| n.text())
    }

    pub fn path_node(&self) -> Option<AstNode<'a>> {
        self.0.field("path")
    }

    /// The unquoted import path.
    pub fn path(&self) -> String {
        self.path_node()
            .and_then(|n| literal::unquote(n.text()))
            .unwrap_or_default()
    }
}

/// A `const` or `var` spec: one or more names with optional type and values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueSpec<'a>(AstNode<'a>);

impl<'a> ValueSpec<'a> {
    pub fn cast(node: AstNode<'a>) -> Option<Self> {
        matches!(node.kind(), "const_spec" | "var_spec").then_some(Self(node))
    }

    pub fn node(&self) -> AstNode<'a> {
        self.0
    }

    pub fn tok(&self) -> Token {
        if self.0.kind() == "const_spec" {
            Token::Const
        } else {
            Token::Var
        }
    }

    pub fn name_nodes(&self) -> Vec<AstNode<'a>> {
        self.0.fields("name")
    }

    /// Declared names in order; never empty for a well-formed spec.
    pub fn names(&self) -> Vec<&'a str> {
        self.name_nodes().into_iter().map(|n| n.text()).collect()
    }

    /// The first declared name.
    pub fn name(&self) -> &'a str {
        self.name_nodes().first().map(|n| n.text()).unwrap_or("")
    }

    pub fn type_node(&self) -> Option<AstNode<'a>> {
        self.0.field("type")
    }

    /// Initializer expressions, empty when the spec has none.
    pub fn values(&self) -> Vec<AstNode<'a>> {
        self.0
            .field("value")
            .map(|list| list.children())
            .unwrap_or_default()
    }
}

/// `type Name T`, `type Name[P any] T` or `type Name = T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSpec<'a>(AstNode<'a>);

impl<'a> TypeSpec<'a> {
    pub fn cast(node: AstNode<'a>) -> Option<Self> {
        matches!(node.kind(), "type_spec" | "type_alias").then_some(Self(node))
    }

    pub fn node(&self) -> AstNode<'a> {
        self.0
    }

    pub fn name_node(&self) -> Option<AstNode<'a>> {
        self.0.field("name")
    }

    pub fn name(&self) -> &'a str {
        self.name_node().map(|n| n.text()).unwrap_or("")
    }

    pub fn is_alias(&self) -> bool {
        self.0.kind() == "type_alias"
    }

    pub fn type_params(&self) -> Option<AstNode<'a>> {
        self.0.field("type_parameters")
    }

    /// The defining type expression.
    pub fn type_node(&self) -> Option<AstNode<'a>> {
        self.0.field("type")
    }

    /// Kind of the defining type expression, e.g. `struct_type`.
    pub fn type_kind(&self) -> Option<&'static str> {
        self.type_node().map(|n| n.kind())
    }
}

/// A function or method declaration. Both share this shape; a method has a
/// receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuncDecl<'a>(AstNode<'a>);

impl<'a> FuncDecl<'a> {
    pub fn cast(node: AstNode<'a>) -> Option<Self> {
        matches!(node.kind(), "function_declaration" | "method_declaration").then_some(Self(node))
    }

    pub fn node(&self) -> AstNode<'a> {
        self.0
    }

    pub fn name_node(&self) -> Option<AstNode<'a>> {
        self.0.field("name")
    }

    pub fn name(&self) -> &'a str {
        self.name_node().map(|n| n.text()).unwrap_or("")
    }

    /// The receiver parameter list of a method.
    pub fn receiver(&self) -> Option<AstNode<'a>> {
        self.0.field("receiver")
    }

    pub fn is_method(&self) -> bool {
        self.receiver().is_some()
    }

    /// Name of the receiver's base type: `T` for `(t *T)` or `(t T[K])`.
    pub fn receiver_type_name(&self) -> Option<&'a str> {
        let param = self.receiver()?.children().into_iter().next()?;
        let mut ty = param.field("type")?;
        loop {
            match ty.kind() {
                "pointer_type" | "parenthesized_type" => {
                    ty = ty.children().into_iter().next()?;
                }
                "generic_type" => ty = ty.field("type")?,
                "type_identifier" => return Some(ty.text()),
                _ => return None,
            }
        }
    }

    pub fn type_params(&self) -> Option<AstNode<'a>> {
        self.0.field("type_parameters")
    }

    pub fn params(&self) -> Option<AstNode<'a>> {
        self.0.field("parameters")
    }

    pub fn result(&self) -> Option<AstNode<'a>> {
        self.0.field("result")
    }

    /// The body block; absent for functions implemented outside Go.
    pub fn body(&self) -> Option<AstNode<'a>> {
        self.0.field("body")
    }
}
