use crate::pos::{FileId, Pos};
use std::fmt;
use tree_sitter::{Node, Tree};

/// Identity of a syntax node within a FileSet.
///
/// Trees are never edited after parsing, so tree-sitter's node id is stable
/// for the lifetime of the owning [`AstFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub file: FileId,
    pub id: usize,
}

/// One parsed Go source file.
pub struct AstFile {
    id: FileId,
    name: String,
    source: String,
    tree: Tree,
    base: Pos,
}

impl AstFile {
    pub(crate) fn new(id: FileId, name: String, source: String, tree: Tree, base: Pos) -> Self {
        Self {
            id,
            name,
            source,
            tree,
            base,
        }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Position of the first byte of the file.
    pub fn base(&self) -> Pos {
        self.base
    }

    /// The `source_file` node.
    pub fn root(&self) -> AstNode<'_> {
        AstNode::new(self, self.tree.root_node())
    }

    /// The `package_clause` node. Present in every successfully parsed file.
    pub fn package_clause(&self) -> Option<AstNode<'_>> {
        self.root()
            .children()
            .into_iter()
            .find(|n| n.kind() == "package_clause")
    }

    /// Name declared by the package clause.
    pub fn package_name(&self) -> &str {
        self.package_clause()
            .and_then(|clause| clause.children().into_iter().next())
            .map(|ident| ident.text())
            .unwrap_or("")
    }

    /// Top-level declarations in source order (package clause excluded).
    pub fn decls(&self) -> Vec<AstNode<'_>> {
        self.root()
            .children()
            .into_iter()
            .filter(|n| n.kind() != "package_clause")
            .collect()
    }
}

impl fmt::Debug for AstFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AstFile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("base", &self.base)
            .field("len", &self.source.len())
            .finish()
    }
}

/// A named syntax node together with the file that owns it.
#[derive(Clone, Copy)]
pub struct AstNode<'a> {
    file: &'a AstFile,
    raw: Node<'a>,
}

impl<'a> AstNode<'a> {
    pub(crate) fn new(file: &'a AstFile, raw: Node<'a>) -> Self {
        Self { file, raw }
    }

    /// Grammar kind, e.g. `type_spec` or `identifier`.
    pub fn kind(&self) -> &'static str {
        self.raw.kind()
    }

    pub fn key(&self) -> NodeKey {
        NodeKey {
            file: self.file.id,
            id: self.raw.id(),
        }
    }

    pub fn file(&self) -> &'a AstFile {
        self.file
    }

    /// The underlying tree-sitter node.
    pub fn raw(&self) -> Node<'a> {
        self.raw
    }

    pub fn text(&self) -> &'a str {
        &self.file.source[self.raw.byte_range()]
    }

    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.raw.byte_range()
    }

    pub fn pos(&self) -> Pos {
        Pos(self.file.base.0 + self.raw.start_byte() as u32)
    }

    pub fn end(&self) -> Pos {
        Pos(self.file.base.0 + self.raw.end_byte() as u32)
    }

    pub fn parent(&self) -> Option<AstNode<'a>> {
        self.raw.parent().map(|p| AstNode::new(self.file, p))
    }

    /// Child stored under a grammar field, e.g. `name` or `body`.
    pub fn field(&self, name: &str) -> Option<AstNode<'a>> {
        self.raw
            .child_by_field_name(name)
            .map(|n| AstNode::new(self.file, n))
    }

    /// All named children stored under a grammar field.
    pub fn fields(&self, name: &str) -> Vec<AstNode<'a>> {
        let mut cursor = self.raw.walk();
        let nodes: Vec<_> = self
            .raw
            .children_by_field_name(name, &mut cursor)
            .filter(|n| n.is_named() && n.kind() != "comment")
            .map(|n| AstNode::new(self.file, n))
            .collect();
        nodes
    }

    /// Named children, comments excluded.
    pub fn children(&self) -> Vec<AstNode<'a>> {
        let mut cursor = self.raw.walk();
        let nodes: Vec<_> = self
            .raw
            .named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .map(|n| AstNode::new(self.file, n))
            .collect();
        nodes
    }

    /// Anonymous token children, e.g. operators and keywords.
    pub fn tokens(&self) -> Vec<&'static str> {
        let mut cursor = self.raw.walk();
        let kinds: Vec<_> = self
            .raw
            .children(&mut cursor)
            .filter(|n| !n.is_named())
            .map(|n| n.kind())
            .collect();
        kinds
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.tokens().iter().any(|t| *t == token)
    }
}

impl PartialEq for AstNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for AstNode<'_> {}

impl fmt::Debug for AstNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{:?}",
            self.kind(),
            self.file.name,
            self.raw.byte_range()
        )
    }
}
