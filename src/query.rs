//! Declaration queries: filtered, early-terminable iteration over the type,
//! constant, variable and function declarations of a [`FileSet`].
//!
//! Every query is built on [`FileSet::visit`]. A callback returning `false`
//! stops the traversal on the spot: no later spec of the same declaration
//! group and no later node is offered. Matched declarations are still
//! descended into, so declarations nested inside a function body (a local
//! `type`, `const` or `var`) are offered too, after the enclosing function.

use crate::fileset::FileSet;
use crate::syntax::{AstNode, FuncDecl, GenDecl, Token, TypeSpec, ValueSpec};
use crate::walk::Flow;

/// Declaration category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Type,
    Const,
    Var,
    Func,
}

/// A located declaration of any category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decl<'a> {
    Type(TypeSpec<'a>),
    Const(ValueSpec<'a>),
    Var(ValueSpec<'a>),
    Func(FuncDecl<'a>),
}

impl<'a> Decl<'a> {
    pub fn kind(&self) -> DeclKind {
        match self {
            Decl::Type(_) => DeclKind::Type,
            Decl::Const(_) => DeclKind::Const,
            Decl::Var(_) => DeclKind::Var,
            Decl::Func(_) => DeclKind::Func,
        }
    }

    pub fn node(&self) -> AstNode<'a> {
        match self {
            Decl::Type(s) => s.node(),
            Decl::Const(s) | Decl::Var(s) => s.node(),
            Decl::Func(f) => f.node(),
        }
    }

    /// The declared names; a value spec may declare several.
    pub fn names(&self) -> Vec<&'a str> {
        match self {
            Decl::Type(s) => vec![s.name()],
            Decl::Const(s) | Decl::Var(s) => s.names(),
            Decl::Func(f) => vec![f.name()],
        }
    }
}

impl FileSet {
    /// Call `f` for each type spec, in traversal order, until it returns
    /// `false`.
    pub fn each_type<'a, F>(&'a self, mut f: F)
    where
        F: FnMut(TypeSpec<'a>) -> bool,
    {
        self.visit(|node| match TypeSpec::cast(node) {
            Some(spec) if !f(spec) => Flow::Stop,
            _ => Flow::Descend,
        });
    }

    /// Call `f` for each constant spec. Specs of a grouped declaration are
    /// offered one by one in declaration order.
    pub fn each_const<'a, F>(&'a self, f: F)
    where
        F: FnMut(ValueSpec<'a>) -> bool,
    {
        self.each_value_spec(Token::Const, f);
    }

    /// Call `f` for each variable spec. Specs of a grouped declaration are
    /// offered one by one in declaration order.
    pub fn each_var<'a, F>(&'a self, f: F)
    where
        F: FnMut(ValueSpec<'a>) -> bool,
    {
        self.each_value_spec(Token::Var, f);
    }

    /// Call `f` for each function and method declaration.
    pub fn each_func<'a, F>(&'a self, mut f: F)
    where
        F: FnMut(FuncDecl<'a>) -> bool,
    {
        self.visit(|node| match FuncDecl::cast(node) {
            Some(decl) if !f(decl) => Flow::Stop,
            _ => Flow::Descend,
        });
    }

    fn each_value_spec<'a, F>(&'a self, tok: Token, mut f: F)
    where
        F: FnMut(ValueSpec<'a>) -> bool,
    {
        self.visit(|node| {
            let Some(decl) = GenDecl::cast(node).filter(|d| d.tok() == tok) else {
                return Flow::Descend;
            };
            for spec in decl.value_specs() {
                if !f(spec) {
                    return Flow::Stop;
                }
            }
            Flow::Descend
        });
    }

    /// Call `f` for every declaration of every category, in traversal order.
    pub fn each_decl<'a, F>(&'a self, mut f: F)
    where
        F: FnMut(Decl<'a>) -> bool,
    {
        self.visit(|node| {
            let decls: Vec<Decl<'a>> = if let Some(spec) = TypeSpec::cast(node) {
                vec![Decl::Type(spec)]
            } else if let Some(func) = FuncDecl::cast(node) {
                vec![Decl::Func(func)]
            } else if let Some(decl) = GenDecl::cast(node) {
                let wrap = match decl.tok() {
                    Token::Const => Decl::Const,
                    Token::Var => Decl::Var,
                    _ => return Flow::Descend,
                };
                decl.value_specs().into_iter().map(wrap).collect()
            } else {
                Vec::new()
            };
            for decl in decls {
                if !f(decl) {
                    return Flow::Stop;
                }
            }
            Flow::Descend
        });
    }

    /// All type specs.
    pub fn types(&self) -> Vec<TypeSpec<'_>> {
        let mut out = Vec::new();
        self.each_type(|spec| {
            out.push(spec);
            true
        });
        out
    }

    /// All constant specs.
    pub fn consts(&self) -> Vec<ValueSpec<'_>> {
        let mut out = Vec::new();
        self.each_const(|spec| {
            out.push(spec);
            true
        });
        out
    }

    /// All variable specs.
    pub fn vars(&self) -> Vec<ValueSpec<'_>> {
        let mut out = Vec::new();
        self.each_var(|spec| {
            out.push(spec);
            true
        });
        out
    }

    /// All function and method declarations.
    pub fn funcs(&self) -> Vec<FuncDecl<'_>> {
        let mut out = Vec::new();
        self.each_func(|decl| {
            out.push(decl);
            true
        });
        out
    }

    /// The first declaration of `kind` declaring `name`. Methods are not
    /// matched by a plain name; use [`FileSet::methods_of`] for them.
    pub fn lookup(&self, kind: DeclKind, name: &str) -> Option<Decl<'_>> {
        let mut found = None;
        self.each_decl(|decl| {
            let matches = decl.kind() == kind
                && decl.names().contains(&name)
                && !matches!(decl, Decl::Func(f) if f.is_method());
            if matches {
                found = Some(decl);
            }
            !matches
        });
        found
    }

    /// Methods whose receiver base type is `type_name`.
    pub fn methods_of(&self, type_name: &str) -> Vec<FuncDecl<'_>> {
        let mut out = Vec::new();
        self.each_func(|decl| {
            if decl.receiver_type_name() == Some(type_name) {
                out.push(decl);
            }
            true
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fileset(src: &str) -> FileSet {
        FileSet::from_texts([src]).unwrap()
    }

    fn type_names(fs: &FileSet) -> Vec<String> {
        fs.types().iter().map(|s| s.name().to_string()).collect()
    }

    fn const_names(fs: &FileSet) -> Vec<String> {
        fs.consts().iter().map(|s| s.name().to_string()).collect()
    }

    fn func_names(fs: &FileSet) -> Vec<String> {
        fs.funcs().iter().map(|s| s.name().to_string()).collect()
    }

    #[test]
    fn each_type_single_struct() {
        let fs = fileset("package p\n\ntype X struct {\n\ta string\n}\n");
        assert_eq!(type_names(&fs), vec!["X"]);
    }

    #[test]
    fn each_type_interface() {
        let fs = fileset("package p\n\ntype Y interface {\n\ta()\n}\n");
        assert_eq!(type_names(&fs), vec!["Y"]);
    }

    #[test]
    fn each_type_grouped() {
        let fs = fileset(
            "package p\n\ntype (\n\tX interface {\n\t\ta()\n\t}\n\tY struct {\n\t\ta string\n\t}\n\tZ int\n)\n",
        );
        assert_eq!(type_names(&fs), vec!["X", "Y", "Z"]);
    }

    #[test]
    fn each_type_includes_aliases() {
        let fs = fileset("package p\n\ntype A = int\n");
        let types = fs.types();
        assert_eq!(types.len(), 1);
        assert!(types[0].is_alias());
    }

    #[test]
    fn nothing_found_in_var_only_unit() {
        let fs = fileset("package p\n\nvar x = 1\n");
        assert!(fs.types().is_empty());
        assert!(fs.consts().is_empty());
        assert!(fs.funcs().is_empty());
        assert_eq!(fs.vars().len(), 1);
    }

    #[test]
    fn each_const_variants() {
        assert_eq!(const_names(&fileset("package p\n\nconst X = 1\n")), vec!["X"]);
        assert_eq!(
            const_names(&fileset("package p\n\nconst (\n\tY = \"yes\"\n)\n")),
            vec!["Y"]
        );
        assert_eq!(
            const_names(&fileset("package p\n\nconst (\n\tX = iota\n\tY\n\tZ\n)\n")),
            vec!["X", "Y", "Z"]
        );
    }

    #[test]
    fn grouped_specs_are_offered_individually() {
        let fs = fileset("package p\n\nconst (\n\tA, B = 1, 2\n\tC = 3\n)\n");
        let mut calls = Vec::new();
        fs.each_const(|spec| {
            calls.push(spec.names());
            true
        });
        assert_eq!(calls, vec![vec!["A", "B"], vec!["C"]]);
    }

    #[test]
    fn each_var_grouped() {
        let fs = fileset("package p\n\nvar (\n\ta = 1\n\tb string\n)\n\nconst c = 2\n");
        let names: Vec<_> = fs.vars().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn each_func_includes_methods() {
        for src in [
            "package p\n\nfunc X() {}\n",
            "package p\n\nfunc X(a string) {}\n",
            "package p\n\nfunc X(string) bool { return false }\n",
            "package p\n\ntype A struct{}\n\nfunc (a A) X(string) bool { return false }\n",
        ] {
            assert_eq!(func_names(&fileset(src)), vec!["X"], "{src}");
        }
    }

    #[test]
    fn method_and_function_share_shape() {
        let fs = fileset("package p\n\ntype A struct{}\n\nfunc (a *A) M() {}\n\nfunc F() {}\n");
        let funcs = fs.funcs();
        assert_eq!(funcs.len(), 2);
        assert!(funcs[0].is_method());
        assert_eq!(funcs[0].receiver_type_name(), Some("A"));
        assert!(!funcs[1].is_method());
        assert_eq!(fs.methods_of("A").len(), 1);
    }

    #[test]
    fn early_termination_is_immediate() {
        let fs = fileset("package p\n\nconst (\n\tA = 1\n\tB = 2\n\tC = 3\n)\n\nconst D = 4\n");
        let mut seen = Vec::new();
        fs.each_const(|spec| {
            seen.push(spec.name());
            seen.len() < 2
        });
        assert_eq!(seen, vec!["A", "B"]);
    }

    #[test]
    fn early_termination_across_declarations() {
        let fs = fileset("package p\n\ntype A int\n\ntype B int\n\ntype C int\n");
        let mut seen = Vec::new();
        fs.each_type(|spec| {
            seen.push(spec.name());
            spec.name() != "B"
        });
        assert_eq!(seen, vec!["A", "B"]);
    }

    #[test]
    fn nested_declarations_are_found() {
        let fs = fileset(
            "package p\n\nfunc f() int {\n\ttype local struct{ n int }\n\tconst k = 2\n\tvar v = local{n: k}\n\treturn v.n\n}\n\ntype Top int\n",
        );
        assert_eq!(type_names(&fs), vec!["local", "Top"]);
        assert_eq!(const_names(&fs), vec!["k"]);
        assert_eq!(fs.vars().len(), 1);
    }

    #[test]
    fn lookup_by_kind_and_name() {
        let fs = fileset(
            "package p\n\ntype T struct{}\n\nfunc (T) Name() {}\n\nfunc Name() {}\n\nvar a, b = 1, 2\n",
        );
        let func = fs.lookup(DeclKind::Func, "Name").unwrap();
        match func {
            Decl::Func(f) => assert!(!f.is_method()),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(fs.lookup(DeclKind::Var, "b"), Some(Decl::Var(_))));
        assert!(fs.lookup(DeclKind::Const, "a").is_none());
        assert!(matches!(fs.lookup(DeclKind::Type, "T"), Some(Decl::Type(_))));
    }
}
