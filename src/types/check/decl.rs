//! Resolution of declarations: constants, variables, types and functions.

use super::{Checker, DeclInfo, DeclState, Env, FuncBody, Operand};
use crate::syntax::{AstNode, FuncDecl, TypeSpec};
use crate::types::constant::Value;
use crate::types::ids::{ObjectId, ScopeId, TypeId};
use crate::types::object::ObjectKind;
use crate::types::scope::ScopeKind;
use crate::types::ty::{NamedType, Signature, Type, TypeTable};
use std::collections::HashSet;

impl<'a> Checker<'a> {
    /// Resolve every package-level object, types first so that methods are
    /// attached before values refer to them.
    pub(super) fn package_objects(&mut self) {
        let order = self.order.clone();
        let (types, others): (Vec<ObjectId>, Vec<ObjectId>) = order
            .into_iter()
            .partition(|obj| self.info.object(*obj).is_type_name());
        for obj in types.into_iter().chain(others) {
            self.obj_decl(obj);
        }

        self.report_pending();

        for method in self.method_decls.clone() {
            if self.attached.contains(&method) {
                continue;
            }
            self.obj_decl(method);
            if let Some(base) = self.receiver_base(method) {
                self.attach_method(base, method);
            }
        }
    }

    /// Check every collected function body.
    pub(super) fn function_bodies(&mut self) {
        let bodies = std::mem::take(&mut self.bodies);
        for body in bodies {
            self.func_body(body);
        }
    }

    /// Resolve one package-level object, unless already done.
    pub(super) fn obj_decl(&mut self, obj: ObjectId) {
        match self.state.get(&obj) {
            Some(DeclState::Done) => return,
            Some(DeclState::InProgress) => {
                self.cycle(obj);
                return;
            }
            None => {}
        }
        let Some(decl) = self.decls.get(&obj).cloned() else {
            return;
        };

        self.state.insert(obj, DeclState::InProgress);
        self.path.push(obj);
        let saved = self.env;
        let file_scope = decl.file_scope();
        self.env = Env {
            scope: file_scope,
            file_scope,
            iota: None,
        };

        match decl {
            DeclInfo::Const { typ, init, iota, .. } => {
                self.env.iota = Some(iota);
                self.const_decl(obj, typ, init);
            }
            DeclInfo::Var { lhs, typ, init, .. } => {
                for other in &lhs {
                    self.state.insert(*other, DeclState::InProgress);
                }
                let values: Vec<AstNode<'a>> = init.into_iter().collect();
                self.init_vars(&lhs, typ, &values, None);
                for other in &lhs {
                    self.state.insert(*other, DeclState::Done);
                }
            }
            DeclInfo::Type { spec, .. } => self.type_decl(obj, spec),
            DeclInfo::Func { decl, .. } => self.func_decl(obj, decl),
        }

        self.env = saved;
        self.path.pop();
        self.state.insert(obj, DeclState::Done);
    }

    /// Report a reference to an object whose declaration is in progress.
    fn cycle(&mut self, obj: ObjectId) {
        let object = self.info.object(obj);
        let message = match &object.kind {
            // A defined type may refer to itself through indirection; direct
            // cycles are found by `valid_type`.
            ObjectKind::TypeName { alias: false } | ObjectKind::Func => return,
            ObjectKind::TypeName { alias: true } => {
                format!("invalid recursive type {}", object.name)
            }
            _ if self.path.last() == Some(&obj) => {
                format!("initialization cycle: {} refers to itself", object.name)
            }
            _ => format!("initialization cycle for {}", object.name),
        };
        let pos = object.pos;
        if self.reported_cycles.insert(obj) {
            self.error_at(pos, message);
        }
    }

    pub(super) fn const_decl(
        &mut self,
        obj: ObjectId,
        typ: Option<AstNode<'a>>,
        init: Option<AstNode<'a>>,
    ) {
        let target = match typ {
            Some(t) => {
                let ty = self.type_expr(t);
                let valid = self.info.basic_kind(ty).is_some_and(|k| k.is_const_type())
                    || self.info.is_permissive(ty);
                if !valid {
                    let message = format!("invalid constant type {}", self.type_string(ty));
                    self.error(t, message);
                    return;
                }
                Some(ty)
            }
            None => None,
        };

        let Some(init) = init else {
            self.set_type(obj, target.unwrap_or(TypeTable::invalid()));
            return;
        };
        let mut x = self.expr(init);
        if x.is_invalid() {
            return;
        }
        if !x.is_constant() {
            let message = format!("{} is not constant", self.describe(init, &x));
            self.error(init, message);
            return;
        }
        if let Some(t) = target {
            self.assignment(init, &mut x, t, "constant declaration");
            if x.is_invalid() {
                return;
            }
        }
        let object = self.info.objects.get_mut(obj);
        object.ty = x.ty;
        object.kind = ObjectKind::Const {
            value: x.val.unwrap_or(Value::Unknown),
        };
    }

    /// Give types to `lhs` from an optional declared type and initializer
    /// list. Handles `var a, b = x, y` and `var a, b = f()`. A `scope`
    /// declares the variables once their initializers are checked.
    pub(super) fn init_vars(
        &mut self,
        lhs: &[ObjectId],
        typ: Option<AstNode<'a>>,
        values: &[AstNode<'a>],
        scope: Option<(ScopeId, &[AstNode<'a>])>,
    ) {
        let target = typ.map(|t| self.type_expr(t));
        if let Some(t) = target {
            for obj in lhs {
                self.set_type(*obj, t);
            }
        }

        if values.len() == lhs.len() {
            for (obj, value) in lhs.iter().zip(values) {
                let mut x = self.expr(*value);
                let ty = self.var_type(*value, &mut x, target, "variable declaration");
                self.set_type(*obj, ty);
            }
        } else if values.len() == 1 {
            let types = self.multi_value(values[0], lhs.len());
            for (obj, ty) in lhs.iter().zip(types) {
                match target {
                    Some(t) => self.check_assignable_type(values[0], ty, t, "variable declaration"),
                    None => {
                        let ty = self.default_type(ty);
                        self.set_type(*obj, ty);
                    }
                }
            }
        } else if !values.is_empty() {
            // Count mismatches are reported when the spec is collected.
            self.use_exprs(values);
        }

        if let Some((scope, names)) = scope {
            for (obj, ident) in lhs.iter().zip(names) {
                self.declare(scope, *ident, *obj);
            }
        }
    }

    /// The type a variable takes from its initializer `x`.
    pub(super) fn var_type(
        &mut self,
        node: AstNode<'a>,
        x: &mut Operand,
        target: Option<TypeId>,
        context: &str,
    ) -> TypeId {
        if x.is_invalid() {
            return target.unwrap_or(TypeTable::invalid());
        }
        if let Some(t) = target {
            self.assignment(node, x, t, context);
            return t;
        }
        if x.ty == TypeTable::basic(crate::types::ty::BasicKind::UntypedNil) {
            self.error(node, format!("use of untyped nil in {context}"));
            return TypeTable::invalid();
        }
        if self.info.is_untyped(x.ty) {
            let ty = self.default_type(x.ty);
            self.convert_untyped(x, ty).ok();
            self.record_operand(node, x);
            return ty;
        }
        x.ty
    }

    pub(super) fn type_decl(&mut self, obj: ObjectId, spec: TypeSpec<'a>) {
        let Some(rhs) = spec.type_node() else {
            return;
        };
        let name = spec.name();

        if spec.is_alias() {
            let ty = self.type_expr(rhs);
            self.set_type(obj, ty);
            return;
        }

        let named = self.info.type_table.alloc(Type::Named(NamedType {
            obj,
            underlying: None,
            methods: Vec::new(),
            type_params: Vec::new(),
            type_args: Vec::new(),
            origin: None,
        }));
        self.set_type(obj, named);

        let outer = self.env.scope;
        if let Some(tparams) = spec.type_params() {
            self.open_scope(spec.node(), ScopeKind::Block);
            let params = self.type_params(tparams);
            if let Type::Named(n) = self.info.type_table.get_mut(named) {
                n.type_params = params;
            }
        }

        let rhs_ty = self.type_expr(rhs);
        let underlying = match self.info.ty(rhs_ty) {
            // `type B A` while A is still being declared: B's underlying type
            // is only known once A's is.
            Type::Named(n) if n.underlying.is_none() && n.origin.is_none() => {
                let at = spec.name_node().unwrap_or(rhs);
                self.pending_underlying.push((named, rhs_ty, at));
                None
            }
            Type::TypeParam { .. } => {
                self.error(rhs, "cannot use a type parameter as RHS in type declaration");
                Some(TypeTable::invalid())
            }
            _ => Some(self.info.under(rhs_ty)),
        };
        self.close_scope(outer);

        if let Some(underlying) = underlying {
            self.set_underlying(named, underlying);
            self.resolve_pending();
            if !self.valid_type(named) {
                self.error(
                    spec.name_node().unwrap_or(rhs),
                    format!("invalid recursive type {name}"),
                );
                self.set_underlying(named, TypeTable::invalid());
            }
        }

        if self.info.object(obj).parent == Some(self.pkg_scope) {
            self.collect_methods(name, named);
        }
    }

    fn set_underlying(&mut self, named: TypeId, underlying: TypeId) {
        if let Type::Named(n) = self.info.type_table.get_mut(named) {
            n.underlying = Some(underlying);
        }
    }

    /// Settle types whose definition waited on another type's.
    fn resolve_pending(&mut self) {
        loop {
            let mut progress = false;
            for (named, rhs, at) in std::mem::take(&mut self.pending_underlying) {
                match self.info.ty(rhs) {
                    Type::Named(n) if n.underlying.is_some() => {
                        let underlying = self.info.under(rhs);
                        self.set_underlying(named, underlying);
                        progress = true;
                    }
                    _ => self.pending_underlying.push((named, rhs, at)),
                }
            }
            if !progress {
                break;
            }
        }
    }

    /// Types still waiting on another type's definition form a cycle.
    pub(super) fn report_pending(&mut self) {
        self.resolve_pending();
        for (named, _, at) in std::mem::take(&mut self.pending_underlying) {
            let message = format!("invalid recursive type {}", self.type_string(named));
            self.error(at, message);
            self.set_underlying(named, TypeTable::invalid());
        }
    }

    /// Whether `root` can be laid out: it must not contain itself except
    /// through a pointer, slice, map, channel, function or interface.
    fn valid_type(&self, root: TypeId) -> bool {
        let mut seen = HashSet::new();
        !self.contains_directly(root, self.info.under(root), &mut seen)
    }

    fn contains_directly(&self, root: TypeId, ty: TypeId, seen: &mut HashSet<TypeId>) -> bool {
        match self.info.ty(ty) {
            Type::Named(_) => {
                if ty == root {
                    return true;
                }
                if !seen.insert(ty) {
                    return false;
                }
                self.contains_directly(root, self.info.under(ty), seen)
            }
            Type::Array { elem, .. } => self.contains_directly(root, *elem, seen),
            Type::Struct(st) => st
                .fields
                .iter()
                .any(|f| self.contains_directly(root, self.info.object(*f).ty, seen)),
            _ => false,
        }
    }

    /// Resolve and attach the methods declared on package-level type `name`.
    fn collect_methods(&mut self, name: &str, named: TypeId) {
        let Some(methods) = self.methods.remove(name) else {
            return;
        };
        for method in methods {
            self.obj_decl(method);
            if self.receiver_base(method) == Some(named) {
                self.attach_method(named, method);
            }
        }
    }

    fn attach_method(&mut self, named: TypeId, method: ObjectId) {
        if !self.attached.insert(method) {
            return;
        }
        let name = self.obj_name(method);
        if name == "_" {
            return;
        }
        let pos = self.info.object(method).pos;
        let type_name = self.type_string(named);

        let duplicate = self
            .info
            .named_methods(named)
            .iter()
            .any(|m| self.info.object(*m).name == name);
        if duplicate {
            self.error_at(pos, format!("method {type_name}.{name} already declared"));
            return;
        }
        if let Type::Struct(st) = self.info.ty(self.info.under(named)) {
            if st.fields.iter().any(|f| self.info.object(*f).name == name) {
                self.error_at(pos, format!("field and method with the same name {name}"));
                return;
            }
        }
        if let Type::Named(n) = self.info.type_table.get_mut(named) {
            n.methods.push(method);
        }
    }

    /// The local named type a method's receiver is based on.
    fn receiver_base(&self, method: ObjectId) -> Option<TypeId> {
        let Type::Signature(sig) = self.info.ty(self.info.object(method).ty) else {
            return None;
        };
        let recv = self.info.object(sig.recv?).ty;
        let (base, _) = self.info.deref(recv);
        match self.info.ty(base) {
            Type::Named(n) => {
                let origin = n.origin.unwrap_or(base);
                let Type::Named(o) = self.info.ty(origin) else {
                    return None;
                };
                (self.info.object(o.obj).parent == Some(self.pkg_scope)).then_some(origin)
            }
            _ => None,
        }
    }

    fn func_decl(&mut self, obj: ObjectId, decl: FuncDecl<'a>) {
        let outer = self.open_scope(decl.node(), ScopeKind::Func);
        let scope = self.env.scope;

        let recv = decl.receiver().and_then(|list| self.receiver(list));
        let type_params = match decl.type_params() {
            Some(tp) => {
                if recv.is_some() {
                    self.error(tp, "methods cannot have type parameters");
                }
                self.type_params(tp)
            }
            None => Vec::new(),
        };
        let (params, variadic) = match decl.params() {
            Some(list) => self.params(list, true),
            None => (Vec::new(), false),
        };
        let results = self.results(decl.result(), true);
        let sig = self.info.type_table.alloc(Type::Signature(Signature {
            recv,
            type_params,
            params,
            results,
            variadic,
        }));
        self.set_type(obj, sig);
        self.close_scope(outer);

        if let Some(block) = decl.body() {
            if !self.config.ignore_func_bodies {
                self.bodies.push(FuncBody {
                    sig,
                    scope,
                    block,
                    file_scope: self.env.file_scope,
                });
            }
        }
    }

    /// Declare the receiver of a method and validate its base type.
    fn receiver(&mut self, list: AstNode<'a>) -> Option<ObjectId> {
        let params = list.children();
        let Some(param) = params.first().copied() else {
            self.error(list, "method has no receiver");
            return None;
        };
        if params.len() > 1 {
            self.error(params[1], "method has multiple receivers");
        }
        let type_node = param.field("type")?;
        let ty = self.receiver_type(type_node);

        let obj = match param.fields("name").first().copied() {
            Some(ident) => {
                let obj = self.new_var(ident, ty);
                let scope = self.env.scope;
                self.declare(scope, ident, obj);
                obj
            }
            None => self.new_object(
                "",
                ObjectKind::Var {
                    field: false,
                    embedded: false,
                },
                type_node.pos(),
                ty,
            ),
        };
        Some(obj)
    }

    fn receiver_type(&mut self, node: AstNode<'a>) -> TypeId {
        let mut inner = node;
        let mut pointer = false;
        while matches!(inner.kind(), "pointer_type" | "parenthesized_type") {
            if inner.kind() == "pointer_type" {
                pointer = true;
            }
            match inner.children().first() {
                Some(child) => inner = *child,
                None => return TypeTable::invalid(),
            }
        }

        let base = if inner.kind() == "generic_type" {
            self.generic_receiver(inner)
        } else {
            self.type_expr(inner)
        };
        self.validate_receiver_base(inner, base);

        let ty = if pointer {
            self.info.type_table.alloc(Type::Pointer(base))
        } else {
            base
        };
        self.record_type_expr(node, ty);
        ty
    }

    /// `(l List[T])`: declare the receiver type parameters and instantiate
    /// the base type with them.
    fn generic_receiver(&mut self, node: AstNode<'a>) -> TypeId {
        let Some(base_node) = node.field("type") else {
            return TypeTable::invalid();
        };
        let base = self.generic_type_expr(base_node);
        let constraints: Vec<TypeId> = match self.info.ty(base) {
            Type::Named(n) => n
                .type_params
                .iter()
                .map(|p| match self.info.ty(*p) {
                    Type::TypeParam { constraint, .. } => *constraint,
                    _ => self.info.any,
                })
                .collect(),
            _ => Vec::new(),
        };

        let mut args = Vec::new();
        let names = node
            .field("type_arguments")
            .map(|a| a.children())
            .unwrap_or_default();
        for (i, elem) in names.into_iter().enumerate() {
            let ident = match elem.children().first() {
                Some(ident) if elem.kind() == "type_elem" => *ident,
                _ => elem,
            };
            let constraint = constraints.get(i).copied().unwrap_or(self.info.any);
            let obj = self.new_object(
                ident.text(),
                ObjectKind::TypeName { alias: false },
                ident.pos(),
                TypeTable::invalid(),
            );
            let param = self
                .info
                .type_table
                .alloc(Type::TypeParam { obj, constraint });
            self.set_type(obj, param);
            let scope = self.env.scope;
            self.declare(scope, ident, obj);
            args.push(param);
        }
        self.instantiate(node, base, args)
    }

    fn validate_receiver_base(&mut self, node: AstNode<'a>, base: TypeId) {
        let message = match self.info.ty(base) {
            Type::Basic(crate::types::ty::BasicKind::Invalid) => return,
            Type::Named(n) => {
                let origin = n.origin.unwrap_or(base);
                let obj = match self.info.ty(origin) {
                    Type::Named(o) => o.obj,
                    _ => return,
                };
                if self.info.object(obj).parent != Some(self.pkg_scope) {
                    format!(
                        "cannot define new methods on non-local type {}",
                        self.type_string(base)
                    )
                } else if n.underlying.is_some()
                    && matches!(
                        self.info.ty(self.info.under(base)),
                        Type::Pointer(_) | Type::Interface(_)
                    )
                {
                    format!("invalid receiver type {}", self.type_string(base))
                } else {
                    return;
                }
            }
            Type::Basic(_) | Type::Opaque { .. } => format!(
                "cannot define new methods on non-local type {}",
                self.type_string(base)
            ),
            _ => format!("invalid receiver type {}", self.type_string(base)),
        };
        self.error(node, message);
    }

    /// Declare the type parameters of a list in the current scope. Every
    /// name is declared before any constraint is resolved, so constraints
    /// may refer to each other.
    pub(super) fn type_params(&mut self, list: AstNode<'a>) -> Vec<TypeId> {
        let mut params = Vec::new();
        let mut groups = Vec::new();
        for decl in list.children() {
            let mut group = Vec::new();
            for ident in decl.fields("name") {
                let obj = self.new_object(
                    ident.text(),
                    ObjectKind::TypeName { alias: false },
                    ident.pos(),
                    TypeTable::invalid(),
                );
                let param = self.info.type_table.alloc(Type::TypeParam {
                    obj,
                    constraint: self.info.any,
                });
                self.set_type(obj, param);
                let scope = self.env.scope;
                self.declare(scope, ident, obj);
                params.push(param);
                group.push(param);
            }
            groups.push((decl.field("type"), group));
        }
        for (constraint_node, group) in groups {
            let Some(node) = constraint_node else {
                continue;
            };
            let constraint = self.constraint(node);
            for param in group {
                if let Type::TypeParam { constraint: c, .. } = self.info.type_table.get_mut(param) {
                    *c = constraint;
                }
            }
        }
        params
    }

    /// Parameters of a list. With `declare`, named parameters are declared
    /// in the current scope.
    pub(super) fn params(&mut self, list: AstNode<'a>, declare: bool) -> (Vec<ObjectId>, bool) {
        let decls = list.children();
        let mut params = Vec::new();
        let mut variadic = false;

        for (i, decl) in decls.iter().enumerate() {
            let mut ty = match decl.field("type") {
                Some(t) => self.type_expr(t),
                None => TypeTable::invalid(),
            };
            if decl.kind() == "variadic_parameter_declaration" {
                if i + 1 != decls.len() {
                    self.error(*decl, "can only use ... with final parameter in list");
                }
                ty = self.info.type_table.alloc(Type::Slice(ty));
                variadic = true;
            }

            let names = decl.fields("name");
            if names.is_empty() {
                let obj = self.new_object(
                    "",
                    ObjectKind::Var {
                        field: false,
                        embedded: false,
                    },
                    decl.pos(),
                    ty,
                );
                params.push(obj);
                continue;
            }
            for ident in names {
                let obj = self.new_var(ident, ty);
                if declare {
                    let scope = self.env.scope;
                    self.declare(scope, ident, obj);
                } else {
                    self.record_def(ident, Some(obj));
                }
                params.push(obj);
            }
        }
        (params, variadic)
    }

    pub(super) fn results(&mut self, node: Option<AstNode<'a>>, declare: bool) -> Vec<ObjectId> {
        let Some(node) = node else {
            return Vec::new();
        };
        if node.kind() == "parameter_list" {
            return self.params(node, declare).0;
        }
        let ty = self.type_expr(node);
        vec![self.new_object(
            "",
            ObjectKind::Var {
                field: false,
                embedded: false,
            },
            node.pos(),
            ty,
        )]
    }

    /// Whether the signature's results are named.
    pub(super) fn named_results(&self, sig: TypeId) -> bool {
        match self.info.ty(sig) {
            Type::Signature(s) => s
                .results
                .first()
                .is_some_and(|r| !self.info.object(*r).name.is_empty()),
            _ => false,
        }
    }

    /// The type of `x` as a value of its own: untyped constants take their
    /// default type.
    pub(super) fn default_type(&self, ty: TypeId) -> TypeId {
        match self.info.basic_kind(ty) {
            Some(kind) if kind.is_untyped() => TypeTable::basic(kind.default_kind()),
            _ => ty,
        }
    }

    /// Check that one value of a multi-value expression can be assigned.
    pub(super) fn check_assignable_type(
        &mut self,
        node: AstNode<'a>,
        value: TypeId,
        target: TypeId,
        context: &str,
    ) {
        let value = self.default_type(value);
        if let Err(reason) = self.info.assignable(value, target) {
            let message = format!(
                "cannot use {} (value of type {}) as {} value in {context}{}",
                super::short_text(node.text()),
                self.type_string(value),
                self.type_string(target),
                if reason.is_empty() { String::new() } else { format!(": {reason}") }
            );
            self.error(node, message);
        }
    }
}
