//! Type expressions.

use super::{Checker, Operand};
use crate::syntax::literal::unquote;
use crate::syntax::AstNode;
use crate::types::ids::{ObjectId, TypeId};
use crate::types::object::{is_exported, ObjectKind};
use crate::types::ty::{ChanDir, InterfaceType, NamedType, Signature, StructType, Term, Type, TypeTable};
use std::collections::HashSet;

/// Outcome of resolving `pkg.Name`.
pub(super) enum Qualified {
    /// The left operand does not denote an imported package.
    NotPackage,
    Resolved(ObjectId),
    /// Resolution failed and was reported.
    Failed,
}

impl<'a> Checker<'a> {
    /// Resolve a type expression. Generic types must be instantiated.
    pub(super) fn type_expr(&mut self, node: AstNode<'a>) -> TypeId {
        let ty = self.generic_type_expr(node);
        if let Type::Named(n) = self.info.ty(ty) {
            if !n.type_params.is_empty() && n.origin.is_none() {
                let message = format!(
                    "cannot use generic type {} without instantiation",
                    self.type_string(ty)
                );
                self.error(node, message);
                return TypeTable::invalid();
            }
        }
        ty
    }

    /// Resolve a type expression that may denote an uninstantiated generic
    /// type.
    pub(super) fn generic_type_expr(&mut self, node: AstNode<'a>) -> TypeId {
        let ty = self.type_expr_inner(node);
        self.record_type_expr(node, ty);
        ty
    }

    fn type_expr_inner(&mut self, node: AstNode<'a>) -> TypeId {
        let first = node.children().first().copied();
        match node.kind() {
            "type_identifier" | "identifier" => self.type_name(node),
            "qualified_type" => match (node.field("package"), node.field("name")) {
                (Some(pkg), Some(name)) => self.qualified_type(pkg, name),
                _ => TypeTable::invalid(),
            },
            "selector_expression" => match (node.field("operand"), node.field("field")) {
                (Some(pkg), Some(name)) => self.qualified_type(pkg, name),
                _ => TypeTable::invalid(),
            },
            "parenthesized_type" | "parenthesized_expression" => match first {
                Some(inner) => self.type_expr(inner),
                None => TypeTable::invalid(),
            },
            "type_elem" => match first {
                Some(inner) if node.children().len() == 1 && inner.kind() != "negated_type" => {
                    self.type_expr(inner)
                }
                _ => self.constraint(node),
            },
            "pointer_type" => match first {
                Some(elem) => {
                    let elem = self.type_expr(elem);
                    self.info.type_table.alloc(Type::Pointer(elem))
                }
                None => TypeTable::invalid(),
            },
            "unary_expression" if node.has_token("*") => match node.field("operand") {
                Some(elem) => {
                    let elem = self.type_expr(elem);
                    self.info.type_table.alloc(Type::Pointer(elem))
                }
                None => TypeTable::invalid(),
            },
            "slice_type" => {
                let elem = self.elem_type(node);
                self.info.type_table.alloc(Type::Slice(elem))
            }
            "array_type" => {
                let len = node.field("length").and_then(|n| self.array_length(n));
                let elem = self.elem_type(node);
                self.info.type_table.alloc(Type::Array { len, elem })
            }
            "implicit_length_array_type" => {
                self.error(node, "invalid use of [...] array (outside a composite literal)");
                let elem = self.elem_type(node);
                self.info.type_table.alloc(Type::Array { len: None, elem })
            }
            "map_type" => self.map_type(node),
            "channel_type" => {
                let elem = match node.field("value") {
                    Some(v) => self.type_expr(v),
                    None => TypeTable::invalid(),
                };
                let tokens = node.tokens();
                let dir = match tokens.as_slice() {
                    ["<-", "chan", ..] => ChanDir::Recv,
                    ["chan", "<-", ..] => ChanDir::Send,
                    _ => ChanDir::Both,
                };
                self.info.type_table.alloc(Type::Chan { dir, elem })
            }
            "function_type" => self.func_type(node),
            "struct_type" => self.struct_type(node),
            "interface_type" => self.interface_type(node),
            "generic_type" | "type_instantiation_expression" => self.generic_instance(node),
            "index_expression" => {
                let (Some(operand), Some(index)) = (node.field("operand"), node.field("index"))
                else {
                    return TypeTable::invalid();
                };
                let base = self.generic_type_expr(operand);
                let arg = self.type_expr(index);
                self.instantiate(node, base, vec![arg])
            }
            "negated_type" => match first {
                Some(inner) => self.type_expr(inner),
                None => TypeTable::invalid(),
            },
            "type_constraint" => self.constraint(node),
            _ => {
                let message = format!("{} is not a type", super::short_text(node.text()));
                self.error(node, message);
                TypeTable::invalid()
            }
        }
    }

    fn elem_type(&mut self, node: AstNode<'a>) -> TypeId {
        match node.field("element") {
            Some(elem) => self.type_expr(elem),
            None => TypeTable::invalid(),
        }
    }

    fn type_name(&mut self, ident: AstNode<'a>) -> TypeId {
        let name = ident.text();
        if name == "_" {
            self.error(ident, "cannot use _ as value or type");
            return TypeTable::invalid();
        }
        let obj = match self.lookup(name).or_else(|| self.dot_opaque_member(name)) {
            Some(obj) => obj,
            None => {
                self.error(ident, format!("undefined: {name}"));
                return TypeTable::invalid();
            }
        };
        self.record_use(ident, obj);
        self.object_type(ident, obj)
    }

    /// The type denoted by `obj`, which must be a type name.
    fn object_type(&mut self, node: AstNode<'a>, obj: ObjectId) -> TypeId {
        if let Some(import) = self.info.object(obj).import {
            if !matches!(self.info.object(obj).kind, ObjectKind::PkgName { .. }) {
                self.mark_import_used(import);
            }
        }
        match self.info.object(obj).kind {
            ObjectKind::TypeName { .. } => {
                if self.is_package_level(obj) {
                    self.obj_decl(obj);
                }
                self.info.object(obj).ty
            }
            ObjectKind::Opaque => self.info.object(obj).ty,
            ObjectKind::PkgName { import } => {
                self.mark_import_used(import);
                self.used.insert(obj);
                let message = format!("use of package {} without selector", node.text());
                self.error(node, message);
                TypeTable::invalid()
            }
            _ => {
                let message = format!("{} is not a type", node.text());
                self.error(node, message);
                TypeTable::invalid()
            }
        }
    }

    fn qualified_type(&mut self, pkg: AstNode<'a>, name: AstNode<'a>) -> TypeId {
        match self.qualified(pkg, name) {
            Qualified::Resolved(obj) => self.object_type(name, obj),
            Qualified::Failed => TypeTable::invalid(),
            Qualified::NotPackage => {
                let message = format!("{}.{} is not a type", pkg.text(), name.text());
                self.error(pkg, message);
                TypeTable::invalid()
            }
        }
    }

    /// Resolve `pkg.Name` where `pkg` may name an import.
    pub(super) fn qualified(&mut self, pkg: AstNode<'a>, name: AstNode<'a>) -> Qualified {
        if !matches!(pkg.kind(), "identifier" | "package_identifier") {
            return Qualified::NotPackage;
        }
        let Some(pkg_obj) = self.lookup(pkg.text()) else {
            return Qualified::NotPackage;
        };
        let ObjectKind::PkgName { import } = self.info.object(pkg_obj).kind else {
            return Qualified::NotPackage;
        };
        self.record_use(pkg, pkg_obj);
        self.used.insert(pkg_obj);

        let member = name.text();
        let pkg_name = self.imports[import].name.clone();
        if !is_exported(member) {
            self.error(name, format!("name {member} not exported by package {pkg_name}"));
            return Qualified::Failed;
        }
        match self.member_object(import, member) {
            Some(obj) => {
                self.record_use(name, obj);
                Qualified::Resolved(obj)
            }
            None => {
                self.error(name, format!("undefined: {}.{member}", pkg.text()));
                Qualified::Failed
            }
        }
    }

    /// Evaluate an array length, which must be a non-negative integer
    /// constant. `None` when unknown.
    fn array_length(&mut self, node: AstNode<'a>) -> Option<u64> {
        let x = self.expr(node);
        if x.is_invalid() {
            return None;
        }
        if !x.is_constant() {
            if !self.info.is_permissive(x.ty) {
                let message = format!("array length {} must be constant", self.describe(node, &x));
                self.error(node, message);
            }
            return None;
        }
        let value = x.val.as_ref()?;
        if value.is_unknown() {
            return None;
        }
        match value.as_int() {
            Some(n) if n >= 0 => u64::try_from(n).ok(),
            Some(_) => {
                self.error(node, format!("invalid array length {}", node.text()));
                None
            }
            None => {
                let message = format!("array length {} must be integer", self.describe(node, &x));
                self.error(node, message);
                None
            }
        }
    }

    fn map_type(&mut self, node: AstNode<'a>) -> TypeId {
        let key = match node.field("key") {
            Some(k) => {
                let key = self.type_expr(k);
                if !self.info.comparable(key) {
                    let message = format!("invalid map key type {}", self.type_string(key));
                    self.error(k, message);
                }
                key
            }
            None => TypeTable::invalid(),
        };
        let value = match node.field("value") {
            Some(v) => self.type_expr(v),
            None => TypeTable::invalid(),
        };
        self.info.type_table.alloc(Type::Map { key, value })
    }

    /// A function type; parameter names are not declared anywhere.
    fn func_type(&mut self, node: AstNode<'a>) -> TypeId {
        let (params, variadic) = match node.field("parameters") {
            Some(list) => self.params(list, false),
            None => (Vec::new(), false),
        };
        let results = self.results(node.field("result"), false);
        self.info.type_table.alloc(Type::Signature(Signature {
            recv: None,
            type_params: Vec::new(),
            params,
            results,
            variadic,
        }))
    }

    fn struct_type(&mut self, node: AstNode<'a>) -> TypeId {
        let mut fields = Vec::new();
        let mut tags = Vec::new();
        let mut seen = HashSet::new();
        let list = node
            .children()
            .into_iter()
            .find(|c| c.kind() == "field_declaration_list");
        let decls = list.map(|l| l.children()).unwrap_or_default();

        for decl in decls {
            let Some(type_node) = decl.field("type") else {
                continue;
            };
            let tag = decl.field("tag").and_then(|t| unquote(t.text()));
            let names = decl.fields("name");
            let mut ty = self.type_expr(type_node);

            if names.is_empty() {
                if decl.has_token("*") {
                    if self.info.is_interface(ty) {
                        self.error(type_node, "embedded field type cannot be a pointer to an interface");
                    }
                    ty = self.info.type_table.alloc(Type::Pointer(ty));
                }
                let Some(ident) = embedded_name(type_node) else {
                    continue;
                };
                let obj = self.new_object(
                    ident.text(),
                    ObjectKind::Var {
                        field: true,
                        embedded: true,
                    },
                    ident.pos(),
                    ty,
                );
                self.record_def(ident, Some(obj));
                self.add_field(ident, &mut seen);
                fields.push(obj);
                tags.push(tag);
                continue;
            }

            for ident in names {
                let obj = self.new_object(
                    ident.text(),
                    ObjectKind::Var {
                        field: true,
                        embedded: false,
                    },
                    ident.pos(),
                    ty,
                );
                self.record_def(ident, Some(obj));
                self.add_field(ident, &mut seen);
                fields.push(obj);
                tags.push(tag.clone());
            }
        }
        self.info
            .type_table
            .alloc(Type::Struct(StructType { fields, tags }))
    }

    fn add_field(&mut self, ident: AstNode<'a>, seen: &mut HashSet<String>) {
        let name = ident.text();
        if name != "_" && !seen.insert(name.to_string()) {
            self.error(ident, format!("{name} redeclared"));
        }
    }

    fn interface_type(&mut self, node: AstNode<'a>) -> TypeId {
        let mut methods: Vec<ObjectId> = Vec::new();
        let mut embeddeds = Vec::new();

        for elem in node.children() {
            match elem.kind() {
                "method_elem" => {
                    let Some(ident) = elem.field("name") else {
                        continue;
                    };
                    let sig = self.func_type(elem);
                    let obj = self.new_object(ident.text(), ObjectKind::Func, ident.pos(), sig);
                    self.record_def(ident, Some(obj));
                    let duplicate = methods
                        .iter()
                        .any(|m| self.info.object(*m).name == ident.text());
                    if duplicate {
                        self.error(ident, format!("duplicate method {}", ident.text()));
                        continue;
                    }
                    methods.push(obj);
                }
                "type_elem" | "constraint_elem" => {
                    let terms = elem.children();
                    if terms.len() == 1 && terms[0].kind() != "negated_type" {
                        let ty = self.type_expr(terms[0]);
                        embeddeds.push(ty);
                    } else {
                        let union = self.union(&terms);
                        embeddeds.push(union);
                    }
                }
                _ => {}
            }
        }
        self.info
            .type_table
            .alloc(Type::Interface(InterfaceType { methods, embeddeds }))
    }

    fn union(&mut self, terms: &[AstNode<'a>]) -> TypeId {
        let mut out = Vec::new();
        for term in terms {
            let tilde = term.kind() == "negated_type";
            let ty = self.type_expr(*term);
            out.push(Term { tilde, ty });
        }
        self.info.type_table.alloc(Type::Union(out))
    }

    /// A type parameter constraint. Non-interface constraints such as
    /// `~int | ~string` become implicit interfaces.
    pub(super) fn constraint(&mut self, node: AstNode<'a>) -> TypeId {
        let terms = if matches!(node.kind(), "type_constraint" | "type_elem") {
            node.children()
        } else {
            vec![node]
        };
        let embedded = match terms.as_slice() {
            [] => return self.info.any,
            [single] if single.kind() != "negated_type" => {
                let ty = self.type_expr(*single);
                if self.info.is_interface(ty) || self.info.is_permissive(ty) {
                    return ty;
                }
                ty
            }
            _ => self.union(&terms),
        };
        self.info.type_table.alloc(Type::Interface(InterfaceType {
            methods: Vec::new(),
            embeddeds: vec![embedded],
        }))
    }

    /// `List[int]` in a type position.
    fn generic_instance(&mut self, node: AstNode<'a>) -> TypeId {
        let Some(base_node) = node.field("type") else {
            return TypeTable::invalid();
        };
        let base = self.generic_type_expr(base_node);
        let arg_nodes = match node.field("type_arguments") {
            Some(list) => list.children(),
            None => node
                .children()
                .into_iter()
                .filter(|n| *n != base_node)
                .collect(),
        };
        let args = arg_nodes.into_iter().map(|a| self.type_expr(a)).collect();
        self.instantiate(node, base, args)
    }

    /// Instantiate a generic named type. Constraint satisfaction is not
    /// verified.
    pub(super) fn instantiate(&mut self, node: AstNode<'a>, generic: TypeId, args: Vec<TypeId>) -> TypeId {
        let (obj, expected) = match self.info.ty(generic) {
            Type::Named(n) if n.origin.is_none() => (n.obj, n.type_params.len()),
            _ if self.info.is_permissive(generic) => return generic,
            _ => {
                let message = format!("{} is not a generic type", self.type_string(generic));
                self.error(node, message);
                return TypeTable::invalid();
            }
        };
        if expected == 0 {
            let message = format!("{} is not a generic type", self.type_string(generic));
            self.error(node, message);
            return TypeTable::invalid();
        }
        if args.len() != expected {
            let which = if args.len() < expected {
                "not enough"
            } else {
                "too many"
            };
            let message = format!(
                "{which} type arguments for type {}: have {}, want {expected}",
                self.obj_name(obj),
                args.len()
            );
            self.error(node, message);
            return TypeTable::invalid();
        }
        self.info.type_table.alloc(Type::Named(NamedType {
            obj,
            underlying: None,
            methods: Vec::new(),
            type_params: Vec::new(),
            type_args: args,
            origin: Some(generic),
        }))
    }

    /// Evaluate `node` as a type if it denotes one, otherwise as a value.
    pub(super) fn expr_or_type(&mut self, node: AstNode<'a>) -> Operand {
        let x = self.expr_any(node);
        if x.mode == crate::types::Mode::TypeExpr {
            if let Type::Named(n) = self.info.ty(x.ty) {
                if !n.type_params.is_empty() && n.origin.is_none() && !is_instantiation_base(node) {
                    let message = format!(
                        "cannot use generic type {} without instantiation",
                        self.type_string(x.ty)
                    );
                    self.error(node, message);
                    return Operand::invalid();
                }
            }
        }
        x
    }
}

fn is_instantiation_base(node: AstNode<'_>) -> bool {
    node.parent().is_some_and(|p| {
        matches!(p.kind(), "index_expression" | "type_instantiation_expression" | "generic_type")
            && p.field("operand").or_else(|| p.field("type")) == Some(node)
    })
}

/// The identifier naming an embedded field: `T` for `T`, `*T`, `pkg.T` and
/// `T[int]`.
fn embedded_name(node: AstNode<'_>) -> Option<AstNode<'_>> {
    match node.kind() {
        "type_identifier" => Some(node),
        "qualified_type" => node.field("name"),
        "generic_type" => node.field("type").and_then(embedded_name),
        "pointer_type" => node.children().first().copied().and_then(embedded_name),
        _ => None,
    }
}
