//! Pre-order traversal over every tree of a [`FileSet`].
//!
//! Three entry points share one driver:
//!
//! - [`FileSet::walk`] visits every node, no early exit.
//! - [`FileSet::inspect`] lets a predicate prune subtrees.
//! - [`FileSet::visit`] adds [`Flow::Stop`], which ends the whole traversal.
//!
//! Files are visited in FileSet order; within a file, nodes are visited
//! depth-first, parents before children, children left to right. Only named
//! nodes are offered; comments are skipped.

use crate::fileset::FileSet;
use crate::syntax::{AstFile, AstNode};

/// What the traversal does after a node has been offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Visit the node's children next.
    Descend,
    /// Skip the node's children, continue with its next sibling.
    Prune,
    /// End the traversal of all remaining nodes and files.
    Stop,
}

/// Receives every node during [`FileSet::walk`].
pub trait Visitor<'a> {
    fn visit(&mut self, node: AstNode<'a>);
}

impl<'a, F> Visitor<'a> for F
where
    F: FnMut(AstNode<'a>),
{
    fn visit(&mut self, node: AstNode<'a>) {
        self(node)
    }
}

impl FileSet {
    /// Call `visitor` on every node of every file, pre-order.
    pub fn walk<'a, V: Visitor<'a>>(&'a self, visitor: &mut V) {
        visit_files(self.ast_files(), |node| {
            visitor.visit(node);
            Flow::Descend
        });
    }

    /// Call `f` on every node, pre-order. When `f` returns `false` the
    /// node's children are skipped; traversal continues with its siblings.
    pub fn inspect<'a, F>(&'a self, mut f: F)
    where
        F: FnMut(AstNode<'a>) -> bool,
    {
        visit_files(self.ast_files(), |node| {
            if f(node) {
                Flow::Descend
            } else {
                Flow::Prune
            }
        });
    }

    /// Drive a traversal with full control. Returns `true` if `f` stopped it.
    pub fn visit<'a, F>(&'a self, f: F) -> bool
    where
        F: FnMut(AstNode<'a>) -> Flow,
    {
        visit_files(self.ast_files(), f)
    }
}

/// Traverse `files` in order. Returns `true` if the traversal was stopped.
pub fn visit_files<'a, F>(files: &'a [AstFile], mut f: F) -> bool
where
    F: FnMut(AstNode<'a>) -> Flow,
{
    files.iter().any(|file| visit_subtree(file.root(), &mut f))
}

/// Traverse the subtree rooted at `root`. Returns `true` if stopped.
pub fn visit_subtree<'a, F>(root: AstNode<'a>, f: &mut F) -> bool
where
    F: FnMut(AstNode<'a>) -> Flow,
{
    let file = root.file();
    let mut cursor = root.raw().walk();

    loop {
        let raw = cursor.node();
        let mut descend = false;
        if raw.is_named() && raw.kind() != "comment" {
            match f(AstNode::new(file, raw)) {
                Flow::Descend => descend = true,
                Flow::Prune => {}
                Flow::Stop => return true,
            }
        }

        if descend && cursor.goto_first_child() {
            continue;
        }

        // Climb until a sibling is found; the cursor cannot leave `root`.
        loop {
            if cursor.depth() == 0 {
                return false;
            }
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fileset(texts: &[&str]) -> FileSet {
        FileSet::from_texts(texts.iter().copied()).unwrap()
    }

    #[test]
    fn walk_and_inspect_agree() {
        let fs = fileset(&[
            "package p\n\ntype T struct{ a int }\n",
            "package p\n\n// doc\nfunc f(t T) int { return t.a }\n",
        ]);

        let mut walked = 0;
        fs.walk(&mut |_node: AstNode<'_>| walked += 1);

        let mut inspected = 0;
        fs.inspect(|_| {
            inspected += 1;
            true
        });

        assert!(walked > 10);
        assert_eq!(walked, inspected);
    }

    #[test]
    fn pre_order_across_files() {
        let fs = fileset(&["package p\nvar a = 1\n", "package p\nvar b = a\n"]);

        let mut roots = Vec::new();
        fs.walk(&mut |node: AstNode<'_>| {
            if node.kind() == "source_file" {
                roots.push(node.file().name().to_string());
            }
        });
        assert_eq!(roots, vec!["0.go", "1.go"]);

        let mut kinds = Vec::new();
        fs.walk(&mut |node: AstNode<'_>| kinds.push(node.kind()));
        let first_file = &kinds[..kinds.iter().skip(1).position(|k| *k == "source_file").unwrap() + 1];
        assert_eq!(
            first_file,
            &[
                "source_file",
                "package_clause",
                "package_identifier",
                "var_declaration",
                "var_spec",
                "identifier",
                "expression_list",
                "int_literal",
            ]
        );
    }

    #[test]
    fn inspect_prunes_only_the_subtree() {
        let fs = fileset(&["package p\n\nfunc f() { x := 1; _ = x }\n\nvar y = 2\n"]);

        let mut seen = Vec::new();
        fs.inspect(|node| {
            if node.kind() == "identifier" {
                seen.push(node.text().to_string());
            }
            node.kind() != "function_declaration"
        });

        assert_eq!(seen, vec!["y"]);
    }

    #[test]
    fn visit_stop_ends_all_files() {
        let fs = fileset(&["package p\nvar a = 1\n", "package p\nvar b = 2\n"]);

        let mut idents = Vec::new();
        let stopped = fs.visit(|node| {
            if node.kind() == "identifier" {
                idents.push(node.text().to_string());
                return Flow::Stop;
            }
            Flow::Descend
        });

        assert!(stopped);
        assert_eq!(idents, vec!["a"]);
    }

    #[test]
    fn visit_subtree_stays_inside_root() {
        let fs = fileset(&["package p\n\nfunc f() { g() }\n\nfunc g() {}\n"]);
        let file = &fs.ast_files()[0];
        let first = file.decls()[0];

        let mut names = Vec::new();
        let stopped = visit_subtree(first, &mut |node| {
            if node.kind() == "identifier" {
                names.push(node.text());
            }
            Flow::Descend
        });

        assert!(!stopped);
        assert_eq!(names, vec!["f", "g"]);
    }
}
