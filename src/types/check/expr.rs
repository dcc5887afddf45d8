//! Expressions: operands, operators, selectors, literals and conversions
//! of untyped values.

use super::typexpr::Qualified;
use super::{Checker, FuncBody, Operand};
use crate::syntax::literal::{parse_float, parse_int, unquote, unquote_rune};
use crate::syntax::AstNode;
use crate::types::constant::{ConstError, Value};
use crate::types::ids::{ObjectId, TypeId};
use crate::types::object::ObjectKind;
use crate::types::scope::ScopeKind;
use crate::types::selection::{Lookup, Selection, SelectionKind};
use crate::types::ty::{BasicKind, ChanDir, Signature, Type, TypeTable};
use crate::types::Mode;

/// Why an untyped value could not take a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ConvError {
    Incompatible,
    Overflow,
    Truncated,
}

const NIL: TypeId = TypeTable::basic(BasicKind::UntypedNil);
const UNTYPED_BOOL: TypeId = TypeTable::basic(BasicKind::UntypedBool);

impl<'a> Checker<'a> {
    /// Evaluate and record `node` in whatever mode it has.
    pub(super) fn expr_any(&mut self, node: AstNode<'a>) -> Operand {
        let x = self.expr_raw(node);
        self.record_operand(node, &x);
        x
    }

    /// Evaluate `node` as a single value.
    pub(super) fn expr(&mut self, node: AstNode<'a>) -> Operand {
        let x = self.expr_any(node);
        self.single_value(node, x)
    }

    /// Evaluate `node`, allowing multi-value calls and comma-ok forms.
    pub(super) fn expr_multi(&mut self, node: AstNode<'a>) -> Operand {
        let x = self.expr_any(node);
        match x.mode {
            Mode::TypeExpr | Mode::NoValue | Mode::Builtin => self.single_value(node, x),
            _ => x,
        }
    }

    pub(super) fn single_value(&mut self, node: AstNode<'a>, mut x: Operand) -> Operand {
        let message = match x.mode {
            Mode::TypeExpr => format!("{} (type) is not an expression", super::short_text(node.text())),
            Mode::NoValue => format!("{} (no value) used as value", super::short_text(node.text())),
            Mode::Builtin => format!("{} (built-in) must be called", super::short_text(node.text())),
            Mode::Value if matches!(self.info.ty(x.ty), Type::Tuple(_)) => format!(
                "multiple-value {} (value of type {}) in single-value context",
                super::short_text(node.text()),
                self.type_string(x.ty)
            ),
            Mode::CommaOk | Mode::MapIndex => {
                if x.mode == Mode::CommaOk {
                    x.mode = Mode::Value;
                }
                return x;
            }
            _ => return x,
        };
        self.error(node, message);
        Operand::invalid()
    }

    /// Evaluate expressions only for their side effects on the model.
    pub(super) fn use_exprs(&mut self, nodes: &[AstNode<'a>]) {
        for node in nodes {
            self.expr_any(*node);
        }
    }

    /// The types of an expression assigned to `n` variables: a multi-value
    /// call, a comma-ok form, or a single value.
    pub(super) fn multi_value(&mut self, node: AstNode<'a>, n: usize) -> Vec<TypeId> {
        let x = self.expr_multi(node);
        if x.is_invalid() {
            return vec![TypeTable::invalid(); n];
        }
        if let Type::Tuple(items) = self.info.ty(x.ty) {
            if items.len() == n {
                return items.clone();
            }
            let message = format!(
                "assignment mismatch: {} but {} returns {}",
                super::plural(n, "variable"),
                super::short_text(node.text()),
                super::plural(items.len(), "value")
            );
            self.error(node, message);
            return vec![TypeTable::invalid(); n];
        }
        if self.opaque_call(node, &x) {
            return vec![TypeTable::OPAQUE; n];
        }
        if n == 2 && matches!(x.mode, Mode::CommaOk | Mode::MapIndex) {
            let tuple = self
                .info
                .type_table
                .alloc(Type::Tuple(vec![x.ty, UNTYPED_BOOL]));
            let tv = Operand::new(Mode::CommaOk, tuple);
            self.record_operand(node, &tv);
            return vec![x.ty, UNTYPED_BOOL];
        }
        let message = if node.kind() == "call_expression" {
            format!(
                "assignment mismatch: {} but {} returns 1 value",
                super::plural(n, "variable"),
                super::short_text(node.text())
            )
        } else {
            format!(
                "assignment mismatch: {} but 1 value",
                super::plural(n, "variable")
            )
        };
        self.error(node, message);
        vec![TypeTable::invalid(); n]
    }

    /// A call into an opaque package, whose result count is unknown.
    pub(super) fn opaque_call(&self, node: AstNode<'a>, x: &Operand) -> bool {
        node.kind() == "call_expression" && x.mode == Mode::Value && x.ty == TypeTable::OPAQUE
    }

    fn expr_raw(&mut self, node: AstNode<'a>) -> Operand {
        let untyped = |kind| TypeTable::basic(kind);
        match node.kind() {
            "identifier" => self.ident(node),
            "int_literal" => Operand::constant(
                untyped(BasicKind::UntypedInt),
                parse_int(node.text()).map_or(Value::Unknown, Value::Int),
            ),
            "float_literal" => Operand::constant(
                untyped(BasicKind::UntypedFloat),
                parse_float(node.text()).map_or(Value::Unknown, Value::Float),
            ),
            "imaginary_literal" => {
                Operand::constant(untyped(BasicKind::Complex128), Value::Unknown)
            }
            "rune_literal" => Operand::constant(
                untyped(BasicKind::UntypedRune),
                unquote_rune(node.text()).map_or(Value::Unknown, |c| Value::Int(c as i128)),
            ),
            "interpreted_string_literal" | "raw_string_literal" => Operand::constant(
                untyped(BasicKind::UntypedString),
                unquote(node.text()).map_or(Value::Unknown, Value::String),
            ),
            "true" => Operand::constant(UNTYPED_BOOL, Value::Bool(true)),
            "false" => Operand::constant(UNTYPED_BOOL, Value::Bool(false)),
            "nil" => Operand::new(Mode::Value, NIL),
            "iota" => match self.env.iota {
                Some(i) => Operand::constant(untyped(BasicKind::UntypedInt), Value::Int(i)),
                None => {
                    self.error(node, "cannot use iota outside constant declaration");
                    Operand::invalid()
                }
            },
            "parenthesized_expression" => match node.children().first() {
                Some(inner) => self.expr_any(*inner),
                None => Operand::invalid(),
            },
            "selector_expression" => self.selector(node),
            "index_expression" => self.index(node),
            "slice_expression" => self.slice(node),
            "type_assertion_expression" => self.type_assertion(node),
            "call_expression" => self.call(node),
            "type_conversion_expression" => {
                let (Some(type_node), Some(operand)) = (node.field("type"), node.field("operand"))
                else {
                    return Operand::invalid();
                };
                let target = self.type_expr(type_node);
                self.conversion(node, target, &[operand])
            }
            "type_instantiation_expression" => self.instantiation(node),
            "composite_literal" => self.composite_literal(node),
            "func_literal" => self.func_literal(node),
            "unary_expression" => self.unary(node),
            "binary_expression" => self.binary(node),
            "type_identifier" | "qualified_type" | "pointer_type" | "slice_type" | "array_type"
            | "map_type" | "channel_type" | "function_type" | "struct_type" | "interface_type"
            | "generic_type" | "parenthesized_type" => {
                let ty = self.generic_type_expr(node);
                Operand::new(Mode::TypeExpr, ty)
            }
            kind => {
                self.error(node, format!("unexpected {kind} in expression"));
                Operand::invalid()
            }
        }
    }

    fn ident(&mut self, node: AstNode<'a>) -> Operand {
        let name = node.text();
        if name == "_" {
            self.error(node, "cannot use _ as value");
            return Operand::invalid();
        }
        let Some(obj) = self.lookup(name).or_else(|| self.dot_opaque_member(name)) else {
            self.error(node, format!("undefined: {name}"));
            return Operand::invalid();
        };
        self.record_use(node, obj);
        self.object_operand(node, obj)
    }

    /// The operand an identifier denoting `obj` evaluates to.
    pub(super) fn object_operand(&mut self, node: AstNode<'a>, obj: ObjectId) -> Operand {
        let kind = self.info.object(obj).kind.clone();
        if let Some(import) = self.info.object(obj).import {
            if !matches!(kind, ObjectKind::PkgName { .. }) {
                self.mark_import_used(import);
            }
        }
        if self.is_package_level(obj) {
            self.obj_decl(obj);
        }
        let ty = self.info.object(obj).ty;

        match kind {
            ObjectKind::PkgName { import } => {
                self.used.insert(obj);
                self.mark_import_used(import);
                let message = format!("use of package {} without selector", node.text());
                self.error(node, message);
                Operand::invalid()
            }
            ObjectKind::Const { .. } => {
                if ty == TypeTable::invalid() {
                    return Operand::invalid();
                }
                match &self.info.object(obj).kind {
                    ObjectKind::Const { value } => Operand::constant(ty, value.clone()),
                    _ => Operand::invalid(),
                }
            }
            ObjectKind::TypeName { .. } => Operand::new(Mode::TypeExpr, ty),
            ObjectKind::Var { .. } => {
                self.used.insert(obj);
                Operand::new(Mode::Variable, ty)
            }
            ObjectKind::Func | ObjectKind::Opaque => Operand::new(Mode::Value, ty),
            ObjectKind::Builtin(builtin) => Operand {
                mode: Mode::Builtin,
                ty: TypeTable::invalid(),
                val: None,
                builtin: Some(builtin),
            },
            ObjectKind::Nil => Operand::new(Mode::Value, NIL),
            ObjectKind::Label => Operand::invalid(),
        }
    }

    fn selector(&mut self, node: AstNode<'a>) -> Operand {
        let (Some(operand), Some(field)) = (node.field("operand"), node.field("field")) else {
            return Operand::invalid();
        };
        match self.qualified(operand, field) {
            Qualified::Resolved(obj) => return self.object_operand(field, obj),
            Qualified::Failed => return Operand::invalid(),
            Qualified::NotPackage => {}
        }

        let x = self.expr_any(operand);
        let name = field.text();
        match x.mode {
            Mode::Invalid => return Operand::invalid(),
            Mode::TypeExpr => return self.method_expr(node, field, x.ty),
            Mode::NoValue | Mode::Builtin => {
                self.single_value(operand, x);
                return Operand::invalid();
            }
            _ => {}
        }
        if matches!(self.info.ty(x.ty), Type::Tuple(_)) {
            self.single_value(operand, x);
            return Operand::invalid();
        }

        let lookup_ty = match self.info.ty(self.info.under(x.ty)) {
            Type::TypeParam { constraint, .. } => *constraint,
            _ => x.ty,
        };
        match self.info.lookup_field_or_method(lookup_ty, name) {
            Lookup::Found {
                obj,
                index,
                indirect,
            } => {
                self.record_use(field, obj);
                let is_pointer = matches!(self.info.ty(x.ty), Type::Pointer(_));
                let field_ty = self.info.object(obj).ty;
                if self.info.object(obj).is_var() {
                    self.record_selection(
                        node,
                        Selection {
                            kind: SelectionKind::FieldVal,
                            recv: x.ty,
                            obj,
                            index,
                            indirect: indirect || is_pointer,
                        },
                    );
                    let mode = if x.mode == Mode::Variable || indirect || is_pointer {
                        Mode::Variable
                    } else {
                        Mode::Value
                    };
                    return Operand::new(mode, field_ty);
                }

                if self.info.has_pointer_receiver(obj)
                    && !indirect
                    && !is_pointer
                    && x.mode != Mode::Variable
                    && !self.info.is_interface(x.ty)
                {
                    let message = format!(
                        "cannot call pointer method {name} on {}",
                        self.type_string(x.ty)
                    );
                    self.error(field, message);
                    return Operand::invalid();
                }
                self.record_selection(
                    node,
                    Selection {
                        kind: SelectionKind::MethodVal,
                        recv: x.ty,
                        obj,
                        index,
                        indirect: indirect || is_pointer,
                    },
                );
                Operand::new(Mode::Value, field_ty)
            }
            Lookup::Ambiguous => {
                let message = format!("ambiguous selector {}", super::short_text(node.text()));
                self.error(field, message);
                Operand::invalid()
            }
            Lookup::NotFound
                if self.info.is_permissive(lookup_ty) || self.info.embeds_permissive(lookup_ty) =>
            {
                if x.ty == TypeTable::invalid() {
                    Operand::invalid()
                } else {
                    Operand::new(Mode::Variable, TypeTable::OPAQUE)
                }
            }
            Lookup::NotFound => {
                let (base, _) = self.info.deref(x.ty);
                let message = if base != x.ty && self.info.is_interface(base) {
                    format!(
                        "{} undefined (type {} is pointer to interface, not interface)",
                        super::short_text(node.text()),
                        self.type_string(x.ty)
                    )
                } else {
                    format!(
                        "{} undefined (type {} has no field or method {name})",
                        super::short_text(node.text()),
                        self.type_string(x.ty)
                    )
                };
                self.error(field, message);
                Operand::invalid()
            }
        }
    }

    /// `T.m`: a function whose first parameter is the receiver.
    fn method_expr(&mut self, node: AstNode<'a>, field: AstNode<'a>, recv: TypeId) -> Operand {
        let name = field.text();
        let found = match self.info.lookup_field_or_method(recv, name) {
            Lookup::Found { obj, index, indirect } if !self.info.object(obj).is_var() => {
                Some((obj, index, indirect))
            }
            _ => None,
        };
        let Some((obj, index, indirect)) = found else {
            if self.info.is_permissive(recv) || self.info.embeds_permissive(recv) {
                return Operand::new(Mode::Value, TypeTable::OPAQUE);
            }
            let message = format!(
                "{} undefined (type {} has no method {name})",
                super::short_text(node.text()),
                self.type_string(recv)
            );
            self.error(field, message);
            return Operand::invalid();
        };
        self.record_use(field, obj);

        let is_pointer = matches!(self.info.ty(recv), Type::Pointer(_));
        if self.info.has_pointer_receiver(obj) && !is_pointer && !indirect {
            let t = self.type_string(recv);
            let message =
                format!("invalid method expression {t}.{name} (needs pointer receiver (*{t}).{name})");
            self.error(field, message);
            return Operand::invalid();
        }
        self.record_selection(
            node,
            Selection {
                kind: SelectionKind::MethodExpr,
                recv,
                obj,
                index,
                indirect,
            },
        );

        let Type::Signature(sig) = self.info.ty(self.info.object(obj).ty).clone() else {
            return Operand::new(Mode::Value, TypeTable::OPAQUE);
        };
        let recv_param = self.new_object(
            "",
            ObjectKind::Var {
                field: false,
                embedded: false,
            },
            field.pos(),
            recv,
        );
        let mut params = vec![recv_param];
        params.extend(sig.params);
        let ty = self.info.type_table.alloc(Type::Signature(Signature {
            recv: None,
            type_params: Vec::new(),
            params,
            results: sig.results,
            variadic: sig.variadic,
        }));
        Operand::new(Mode::Value, ty)
    }

    fn index(&mut self, node: AstNode<'a>) -> Operand {
        let (Some(operand), Some(index)) = (node.field("operand"), node.field("index")) else {
            return Operand::invalid();
        };
        let x = self.expr_any(operand);
        match x.mode {
            Mode::Invalid => {
                self.use_exprs(&[index]);
                return Operand::invalid();
            }
            Mode::TypeExpr => {
                let arg = self.type_expr(index);
                let ty = self.instantiate(node, x.ty, vec![arg]);
                return Operand::new(Mode::TypeExpr, ty);
            }
            _ => {}
        }
        let x = self.single_value(operand, x);
        if x.is_invalid() {
            return Operand::invalid();
        }
        if let Type::Signature(sig) = self.info.ty(x.ty) {
            if !sig.type_params.is_empty() {
                self.type_expr(index);
                return Operand::new(Mode::Value, x.ty);
            }
        }

        let under = self.info.under(x.ty);
        match self.info.ty(under).clone() {
            Type::Basic(kind) if kind.is_string() => {
                self.index_value(index, None);
                Operand::new(Mode::Value, TypeTable::basic(BasicKind::Uint8))
            }
            Type::Array { len, elem } => {
                self.index_value(index, len);
                let mode = if x.mode == Mode::Variable {
                    Mode::Variable
                } else {
                    Mode::Value
                };
                Operand::new(mode, elem)
            }
            Type::Pointer(base) => match self.info.ty(self.info.under(base)).clone() {
                Type::Array { len, elem } => {
                    self.index_value(index, len);
                    Operand::new(Mode::Variable, elem)
                }
                _ => self.cannot_index(operand, &x, index),
            },
            Type::Slice(elem) => {
                self.index_value(index, None);
                Operand::new(Mode::Variable, elem)
            }
            Type::Map { key, value } => {
                let mut k = self.expr(index);
                self.assignment(index, &mut k, key, "map index");
                Operand::new(Mode::MapIndex, value)
            }
            _ if self.info.is_permissive(x.ty) => {
                self.use_exprs(&[index]);
                Operand::new(Mode::Variable, TypeTable::OPAQUE)
            }
            _ => self.cannot_index(operand, &x, index),
        }
    }

    fn cannot_index(&mut self, operand: AstNode<'a>, x: &Operand, index: AstNode<'a>) -> Operand {
        let message = format!("invalid operation: cannot index {}", self.describe(operand, x));
        self.error(operand, message);
        self.use_exprs(&[index]);
        Operand::invalid()
    }

    /// Check an index or slice bound: an integer, non-negative when
    /// constant, and below `len` when both are known.
    pub(super) fn index_value(&mut self, node: AstNode<'a>, len: Option<u64>) -> Option<i128> {
        let mut x = self.expr(node);
        if x.is_invalid() {
            return None;
        }
        if self.info.is_untyped(x.ty) {
            if self.convert_untyped(&mut x, TypeTable::basic(BasicKind::Int)).is_err() {
                let message = format!("invalid argument: index {} must be integer", self.describe(node, &x));
                self.error(node, message);
                return None;
            }
            self.record_operand(node, &x);
        }
        let integer = self.info.basic_kind(x.ty).is_some_and(|k| k.is_integer());
        if !integer && !self.info.is_permissive(x.ty) {
            let message = format!("invalid argument: index {} must be integer", self.describe(node, &x));
            self.error(node, message);
            return None;
        }
        let value = x.val.as_ref().and_then(|v| v.as_int())?;
        if value < 0 {
            let message = format!("invalid argument: index {} must not be negative", self.describe(node, &x));
            self.error(node, message);
            return None;
        }
        if let Some(len) = len {
            if value as u128 >= len as u128 {
                let message = format!(
                    "invalid argument: index {} out of bounds [0:{len}]",
                    node.text()
                );
                self.error(node, message);
            }
        }
        Some(value)
    }

    fn slice(&mut self, node: AstNode<'a>) -> Operand {
        let Some(operand) = node.field("operand") else {
            return Operand::invalid();
        };
        let x = self.expr(operand);
        let bounds: Vec<AstNode<'a>> = ["start", "end", "capacity"]
            .iter()
            .filter_map(|f| node.field(f))
            .collect();
        let full = node.field("capacity").is_some();
        if x.is_invalid() {
            self.use_exprs(&bounds);
            return Operand::invalid();
        }

        let under = self.info.under(x.ty);
        let (result, len) = match self.info.ty(under).clone() {
            Type::Basic(kind) if kind.is_string() => {
                if full {
                    self.error(node, "invalid operation: 3-index slice of string");
                }
                let ty = if kind.is_untyped() {
                    TypeTable::basic(BasicKind::String)
                } else {
                    x.ty
                };
                (ty, None)
            }
            Type::Array { len, elem } => {
                if x.mode != Mode::Variable {
                    let message = format!(
                        "invalid operation: {} (slice of unaddressable value)",
                        super::short_text(node.text())
                    );
                    self.error(node, message);
                }
                (self.info.type_table.alloc(Type::Slice(elem)), len.map(|l| l + 1))
            }
            Type::Pointer(base) => match self.info.ty(self.info.under(base)).clone() {
                Type::Array { len, elem } => {
                    (self.info.type_table.alloc(Type::Slice(elem)), len.map(|l| l + 1))
                }
                _ => return self.cannot_slice(operand, &x, &bounds),
            },
            Type::Slice(_) => (x.ty, None),
            _ if self.info.is_permissive(x.ty) => (x.ty, None),
            _ => return self.cannot_slice(operand, &x, &bounds),
        };

        let mut previous: Option<i128> = None;
        for bound in bounds {
            let value = self.index_value(bound, len);
            if let (Some(p), Some(v)) = (previous, value) {
                if v < p {
                    let message = format!("invalid slice indices: {v} < {p}");
                    self.error(bound, message);
                }
            }
            previous = value.or(previous);
        }
        Operand::new(Mode::Value, result)
    }

    fn cannot_slice(&mut self, operand: AstNode<'a>, x: &Operand, bounds: &[AstNode<'a>]) -> Operand {
        let message = format!("cannot slice {}", self.describe(operand, x));
        self.error(operand, message);
        self.use_exprs(bounds);
        Operand::invalid()
    }

    fn type_assertion(&mut self, node: AstNode<'a>) -> Operand {
        let (Some(operand), Some(type_node)) = (node.field("operand"), node.field("type")) else {
            return Operand::invalid();
        };
        let x = self.expr(operand);
        let target = self.type_expr(type_node);
        if x.is_invalid() {
            return Operand::invalid();
        }
        if !self.info.is_interface(x.ty) && !self.info.is_permissive(x.ty) {
            let message = format!(
                "invalid operation: {} is not an interface",
                self.describe(operand, &x)
            );
            self.error(operand, message);
            return Operand::invalid();
        }
        self.impossible_assertion(type_node, target, x.ty, "type assertion");
        Operand::new(Mode::CommaOk, target)
    }

    /// Report a concrete type that can never be stored in interface `iface`.
    pub(super) fn impossible_assertion(
        &mut self,
        at: AstNode<'a>,
        target: TypeId,
        iface: TypeId,
        what: &str,
    ) {
        if self.info.is_interface(target) || self.info.is_permissive(iface) {
            return;
        }
        if let Some(reason) = self.info.missing_method(target, iface) {
            let message = format!(
                "impossible {what}: {} does not implement {} ({reason})",
                self.type_string(target),
                self.type_string(iface)
            );
            self.error(at, message);
        }
    }

    /// `f[int, string]` or `List[int, string]` in expression position.
    fn instantiation(&mut self, node: AstNode<'a>) -> Operand {
        let Some(base_node) = node.field("type") else {
            return Operand::invalid();
        };
        let x = self.expr_any(base_node);
        let arg_nodes: Vec<AstNode<'a>> = node
            .children()
            .into_iter()
            .filter(|n| *n != base_node)
            .collect();
        let args: Vec<TypeId> = arg_nodes.into_iter().map(|a| self.type_expr(a)).collect();
        match x.mode {
            Mode::Invalid => Operand::invalid(),
            Mode::TypeExpr => {
                let ty = self.instantiate(node, x.ty, args);
                Operand::new(Mode::TypeExpr, ty)
            }
            _ => Operand::new(Mode::Value, x.ty),
        }
    }

    fn composite_literal(&mut self, node: AstNode<'a>) -> Operand {
        let Some(body) = node.field("body") else {
            return Operand::invalid();
        };
        let ty = match node.field("type") {
            Some(t) if t.kind() == "implicit_length_array_type" => {
                let elem = match t.field("element") {
                    Some(e) => self.type_expr(e),
                    None => TypeTable::invalid(),
                };
                let array = self.info.type_table.alloc(Type::Array { len: None, elem });
                let len = self.literal_value(body, array);
                let ty = self.info.type_table.alloc(Type::Array {
                    len: Some(len),
                    elem,
                });
                self.record_type_expr(t, ty);
                return Operand::new(Mode::Value, ty);
            }
            Some(t) => self.type_expr(t),
            None => TypeTable::invalid(),
        };
        self.literal_value(body, ty);
        if ty == TypeTable::invalid() {
            return Operand::invalid();
        }
        Operand::new(Mode::Value, ty)
    }

    /// Check the elements of `{...}` against type `ty`. Returns the length
    /// of an array or slice literal.
    fn literal_value(&mut self, body: AstNode<'a>, ty: TypeId) -> u64 {
        let elements = body.children();
        let under = self.info.under(ty);
        match self.info.ty(under).clone() {
            Type::Struct(st) => {
                self.struct_literal(body, ty, &st.fields, &elements);
                0
            }
            Type::Array { elem, len } => {
                let n = self.indexed_elements(&elements, elem, len, "array or slice literal");
                if len.is_none() {
                    self.record_type_expr(body, ty);
                }
                n
            }
            Type::Slice(elem) => self.indexed_elements(&elements, elem, None, "slice literal"),
            Type::Map { key, value } => {
                for element in elements {
                    if element.kind() != "keyed_element" {
                        self.error(element, "missing key in map literal");
                        self.element(element, value, "map literal");
                        continue;
                    }
                    let children = element.children();
                    if let [k, v] = children.as_slice() {
                        self.element(*k, key, "map literal");
                        self.element(*v, value, "map literal");
                    }
                }
                0
            }
            _ => {
                if !self.info.is_permissive(ty) {
                    let message = format!("invalid composite literal type {}", self.type_string(ty));
                    self.error(body, message);
                }
                for element in elements {
                    match element.kind() {
                        "keyed_element" => {
                            for part in element.children() {
                                self.element(part, TypeTable::invalid(), "composite literal");
                            }
                        }
                        _ => self.element(element, TypeTable::invalid(), "composite literal"),
                    }
                }
                0
            }
        }
    }

    fn struct_literal(
        &mut self,
        body: AstNode<'a>,
        ty: TypeId,
        fields: &[ObjectId],
        elements: &[AstNode<'a>],
    ) {
        let Some(first) = elements.first() else {
            return;
        };
        let type_name = self.type_string(ty);

        if first.kind() == "keyed_element" {
            let mut seen = std::collections::HashSet::new();
            for element in elements {
                let children = element.children();
                let [key, value] = children.as_slice() else {
                    self.error(*element, "mixture of field:value and value elements in struct literal");
                    continue;
                };
                let ident = match key.children().first() {
                    Some(ident) if ident.kind() == "identifier" => *ident,
                    _ => {
                        let message = format!("invalid field name {} in struct literal", key.text());
                        self.error(*key, message);
                        self.element(*value, TypeTable::invalid(), "struct literal");
                        continue;
                    }
                };
                let name = ident.text();
                let Some(field) = fields.iter().copied().find(|f| self.info.object(*f).name == name)
                else {
                    let message = format!("unknown field {name} in struct literal of type {type_name}");
                    self.error(ident, message);
                    self.element(*value, TypeTable::invalid(), "struct literal");
                    continue;
                };
                self.record_use(ident, field);
                if !seen.insert(name.to_string()) {
                    self.error(ident, format!("duplicate field name {name} in struct literal"));
                }
                let field_ty = self.info.object(field).ty;
                self.element(*value, field_ty, "struct literal");
            }
            return;
        }

        for (i, element) in elements.iter().enumerate() {
            if element.kind() == "keyed_element" {
                self.error(*element, "mixture of field:value and value elements in struct literal");
                continue;
            }
            match fields.get(i) {
                Some(field) => {
                    let field_ty = self.info.object(*field).ty;
                    self.element(*element, field_ty, "struct literal");
                }
                None => {
                    let message = format!("too many values in struct literal of type {type_name}");
                    self.error(*element, message);
                    self.element(*element, TypeTable::invalid(), "struct literal");
                }
            }
        }
        if elements.len() < fields.len() {
            let message = format!("too few values in struct literal of type {type_name}");
            self.error_at(crate::pos::Pos(body.end().0.saturating_sub(1)), message);
        }
    }

    /// Elements of an array or slice literal, with optional constant keys.
    fn indexed_elements(
        &mut self,
        elements: &[AstNode<'a>],
        elem: TypeId,
        len: Option<u64>,
        context: &str,
    ) -> u64 {
        let mut index: u64 = 0;
        let mut max: u64 = 0;
        for element in elements {
            let value = if element.kind() == "keyed_element" {
                let children = element.children();
                let [key, value] = children.as_slice() else {
                    continue;
                };
                let key_expr = key.children().first().copied().unwrap_or(*key);
                if let Some(i) = self.index_value(key_expr, len) {
                    index = i as u64;
                }
                *value
            } else {
                *element
            };
            if let Some(len) = len {
                if index >= len {
                    let message = format!("index {index} is out of bounds (>= {len})");
                    self.error(*element, message);
                }
            }
            self.element(value, elem, context);
            index += 1;
            max = max.max(index);
        }
        max
    }

    /// One element value: an expression or a nested `{...}` whose type is
    /// elided.
    fn element(&mut self, element: AstNode<'a>, ty: TypeId, context: &str) {
        let inner = match element.kind() {
            "literal_element" => match element.children().first() {
                Some(inner) => *inner,
                None => return,
            },
            _ => element,
        };
        if inner.kind() == "literal_value" {
            let base = match self.info.ty(self.info.under(ty)) {
                Type::Pointer(base) => *base,
                _ => ty,
            };
            self.literal_value(inner, base);
            return;
        }
        let mut x = self.expr(inner);
        if ty != TypeTable::invalid() {
            self.assignment(inner, &mut x, ty, context);
        }
    }

    fn func_literal(&mut self, node: AstNode<'a>) -> Operand {
        let outer = self.open_scope(node, ScopeKind::Func);
        let scope = self.env.scope;
        let (params, variadic) = match node.field("parameters") {
            Some(list) => self.params(list, true),
            None => (Vec::new(), false),
        };
        let results = self.results(node.field("result"), true);
        let sig = self.info.type_table.alloc(Type::Signature(Signature {
            recv: None,
            type_params: Vec::new(),
            params,
            results,
            variadic,
        }));
        self.close_scope(outer);

        if let Some(block) = node.field("body") {
            if !self.config.ignore_func_bodies {
                self.func_body(FuncBody {
                    sig,
                    scope,
                    block,
                    file_scope: self.env.file_scope,
                });
            }
        }
        Operand::new(Mode::Value, sig)
    }

    fn unary(&mut self, node: AstNode<'a>) -> Operand {
        let Some(operand) = node.field("operand") else {
            return Operand::invalid();
        };
        let op = node.field("operator").map(|o| o.kind()).unwrap_or("");
        match op {
            "&" => {
                let x = self.expr(operand);
                if x.is_invalid() {
                    return Operand::invalid();
                }
                if unparen(operand).kind() != "composite_literal" && x.mode != Mode::Variable {
                    let message = format!(
                        "invalid operation: cannot take address of {}",
                        self.describe(operand, &x)
                    );
                    self.error(node, message);
                    return Operand::invalid();
                }
                let ty = self.info.type_table.alloc(Type::Pointer(x.ty));
                Operand::new(Mode::Value, ty)
            }
            "*" => {
                let x = self.expr_or_type(operand);
                match x.mode {
                    Mode::Invalid => return Operand::invalid(),
                    Mode::TypeExpr => {
                        let ty = self.info.type_table.alloc(Type::Pointer(x.ty));
                        return Operand::new(Mode::TypeExpr, ty);
                    }
                    _ => {}
                }
                let x = self.single_value(operand, x);
                if x.is_invalid() {
                    return x;
                }
                if x.ty == NIL {
                    self.error(node, "invalid operation: cannot indirect nil");
                    return Operand::invalid();
                }
                match self.info.ty(self.info.under(x.ty)) {
                    Type::Pointer(elem) => Operand::new(Mode::Variable, *elem),
                    _ if self.info.is_permissive(x.ty) => {
                        Operand::new(Mode::Variable, TypeTable::OPAQUE)
                    }
                    _ => {
                        let message =
                            format!("invalid operation: cannot indirect {}", self.describe(operand, &x));
                        self.error(node, message);
                        Operand::invalid()
                    }
                }
            }
            "<-" => {
                let x = self.expr(operand);
                if x.is_invalid() {
                    return x;
                }
                match self.info.ty(self.info.under(x.ty)) {
                    Type::Chan { dir: ChanDir::Send, .. } => {
                        let message = format!(
                            "invalid operation: cannot receive from send-only channel {}",
                            self.describe(operand, &x)
                        );
                        self.error(node, message);
                        Operand::invalid()
                    }
                    Type::Chan { elem, .. } => Operand::new(Mode::CommaOk, *elem),
                    _ if self.info.is_permissive(x.ty) => {
                        Operand::new(Mode::CommaOk, TypeTable::OPAQUE)
                    }
                    _ => {
                        let message = format!(
                            "invalid operation: cannot receive from non-channel {}",
                            self.describe(operand, &x)
                        );
                        self.error(node, message);
                        Operand::invalid()
                    }
                }
            }
            _ => {
                let x = self.expr(operand);
                if x.is_invalid() {
                    return x;
                }
                if !self.op_allowed(op, x.ty) {
                    let message = format!(
                        "invalid operation: operator {op} not defined on {}",
                        self.describe(operand, &x)
                    );
                    self.error(node, message);
                    return Operand::invalid();
                }
                match (&x.val, self.info.basic_kind(x.ty)) {
                    (Some(v), Some(kind)) if x.is_constant() => {
                        let value = Value::unary(op, v, kind).unwrap_or(Value::Unknown);
                        self.check_overflow(node, x.ty, value)
                    }
                    _ => Operand::new(Mode::Value, x.ty),
                }
            }
        }
    }

    /// Whether operator `op` applies to operands of type `ty`.
    fn op_allowed(&self, op: &str, ty: TypeId) -> bool {
        if self.info.is_permissive(ty) {
            return true;
        }
        let Some(kind) = self.info.basic_kind(ty) else {
            return false;
        };
        match op {
            "+" => kind.is_numeric() || kind.is_string(),
            "-" | "*" | "/" => kind.is_numeric(),
            "%" | "&" | "|" | "^" | "&^" => kind.is_integer(),
            "!" | "&&" | "||" => kind.is_boolean(),
            _ => false,
        }
    }

    /// A constant result of type `ty`, reporting values that do not fit.
    fn check_overflow(&mut self, node: AstNode<'a>, ty: TypeId, value: Value) -> Operand {
        if let Some(kind) = self.info.basic_kind(ty) {
            if !kind.is_untyped() && !value.representable(kind) {
                let message = format!("constant {value} overflows {}", self.type_string(ty));
                self.error(node, message);
                return Operand::invalid();
            }
        }
        Operand::constant(ty, value)
    }

    fn binary(&mut self, node: AstNode<'a>) -> Operand {
        let (Some(left), Some(right)) = (node.field("left"), node.field("right")) else {
            return Operand::invalid();
        };
        let op = node.field("operator").map(|o| o.kind()).unwrap_or("");
        let x = self.expr(left);
        let y = self.expr(right);
        self.binary_op(node, op, (left, x), (right, y))
    }

    /// Apply binary operator `op` to evaluated operands. Also used for
    /// compound assignments such as `x += y`.
    pub(super) fn binary_op(
        &mut self,
        node: AstNode<'a>,
        op: &str,
        (left, mut x): (AstNode<'a>, Operand),
        (right, mut y): (AstNode<'a>, Operand),
    ) -> Operand {
        if x.is_invalid() || y.is_invalid() {
            return Operand::invalid();
        }
        if op == "<<" || op == ">>" {
            return self.shift(node, op, (left, x), (right, y));
        }

        let (x_nil, y_nil) = (x.ty == NIL, y.ty == NIL);
        if !self.match_types(&mut x, &mut y) {
            return self.mismatched(node, &x, &y);
        }
        self.record_operand(left, &x);
        self.record_operand(right, &y);

        if matches!(op, "==" | "!=" | "<" | "<=" | ">" | ">=") {
            return self.comparison(node, op, (left, x), (right, y), x_nil || y_nil);
        }

        let permissive = self.info.is_permissive(x.ty) || self.info.is_permissive(y.ty);
        if !permissive && !self.info.identical(x.ty, y.ty) {
            return self.mismatched(node, &x, &y);
        }
        let ty = if self.info.is_permissive(x.ty) && !self.info.is_permissive(y.ty) {
            y.ty
        } else {
            x.ty
        };
        if !self.op_allowed(op, ty) {
            let message = format!(
                "invalid operation: operator {op} not defined on {}",
                self.describe(left, &x)
            );
            self.error(node, message);
            return Operand::invalid();
        }

        let integer = self.info.basic_kind(ty).is_some_and(|k| k.is_integer());
        let zero_divisor = y.is_constant()
            && y.val
                .as_ref()
                .and_then(|v| v.as_float())
                .is_some_and(|f| f == 0.0);
        if matches!(op, "/" | "%") && zero_divisor && (x.is_constant() || integer) {
            self.error(node, "invalid operation: division by zero");
            return Operand::invalid();
        }

        match (&x.val, &y.val) {
            (Some(a), Some(b)) if x.is_constant() && y.is_constant() => {
                match Value::binary(op, a, b, integer) {
                    Ok(value) => self.check_overflow(node, ty, value),
                    Err(ConstError::DivisionByZero) => {
                        self.error(node, "invalid operation: division by zero");
                        Operand::invalid()
                    }
                    Err(ConstError::Mismatch) => Operand::constant(ty, Value::Unknown),
                }
            }
            _ => Operand::new(Mode::Value, ty),
        }
    }

    fn mismatched(&mut self, node: AstNode<'a>, x: &Operand, y: &Operand) -> Operand {
        let message = format!(
            "invalid operation: {} (mismatched types {} and {})",
            super::short_text(node.text()),
            self.type_string(x.ty),
            self.type_string(y.ty)
        );
        self.error(node, message);
        Operand::invalid()
    }

    /// Give untyped operands the type of the other side, or a common
    /// untyped kind when both are untyped.
    pub(super) fn match_types(&mut self, x: &mut Operand, y: &mut Operand) -> bool {
        let (xu, yu) = (self.info.is_untyped(x.ty), self.info.is_untyped(y.ty));
        match (xu, yu) {
            (true, false) => self.convert_untyped(x, y.ty).is_ok(),
            (false, true) => self.convert_untyped(y, x.ty).is_ok(),
            (true, true) => {
                let (Some(kx), Some(ky)) = (self.info.basic_kind(x.ty), self.info.basic_kind(y.ty))
                else {
                    return false;
                };
                if kx == ky {
                    return true;
                }
                if kx.is_numeric() && ky.is_numeric() {
                    let kind = if rank(kx) >= rank(ky) { kx } else { ky };
                    let target = TypeTable::basic(kind);
                    return self.convert_untyped(x, target).is_ok()
                        && self.convert_untyped(y, target).is_ok();
                }
                kx == BasicKind::UntypedNil || ky == BasicKind::UntypedNil
            }
            (false, false) => true,
        }
    }

    fn comparison(
        &mut self,
        node: AstNode<'a>,
        op: &str,
        (left, x): (AstNode<'a>, Operand),
        (_, y): (AstNode<'a>, Operand),
        with_nil: bool,
    ) -> Operand {
        let compatible = self.info.identical(x.ty, y.ty)
            || self.info.assignable(x.ty, y.ty).is_ok()
            || self.info.assignable(y.ty, x.ty).is_ok();
        if !compatible {
            return self.mismatched(node, &x, &y);
        }

        let text = super::short_text(node.text());
        if matches!(op, "==" | "!=") {
            if x.ty == NIL && y.ty == NIL {
                self.error(node, format!("invalid operation: {text} (operator {op} not defined on nil)"));
                return Operand::invalid();
            }
            if !with_nil && !self.info.comparable(x.ty) {
                let what = match self.info.ty(self.info.under(x.ty)) {
                    Type::Slice(_) => "slice can only be compared to nil".to_string(),
                    Type::Map { .. } => "map can only be compared to nil".to_string(),
                    Type::Signature(_) => "func can only be compared to nil".to_string(),
                    _ => format!("{} cannot be compared", self.type_string(x.ty)),
                };
                self.error(node, format!("invalid operation: {text} ({what})"));
                return Operand::invalid();
            }
        } else {
            let ordered = self.info.is_permissive(x.ty)
                || self.info.basic_kind(x.ty).is_some_and(|k| k.is_ordered());
            if !ordered {
                let message = format!(
                    "invalid operation: {text} (operator {op} not defined on {})",
                    self.describe(left, &x)
                );
                self.error(node, message);
                return Operand::invalid();
            }
        }

        match (&x.val, &y.val) {
            (Some(a), Some(b)) if x.is_constant() && y.is_constant() => {
                let value = Value::compare(op, a, b).map_or(Value::Unknown, Value::Bool);
                Operand::constant(UNTYPED_BOOL, value)
            }
            _ => Operand::new(Mode::Value, UNTYPED_BOOL),
        }
    }

    fn shift(
        &mut self,
        node: AstNode<'a>,
        op: &str,
        (left, mut x): (AstNode<'a>, Operand),
        (right, mut y): (AstNode<'a>, Operand),
    ) -> Operand {
        // The count must be a non-negative integer.
        if self.info.is_untyped(y.ty) {
            if self.convert_untyped(&mut y, TypeTable::basic(BasicKind::Uint)).is_err() {
                let message = format!("invalid shift count {}", self.describe(right, &y));
                self.error(right, message);
                return Operand::invalid();
            }
            self.record_operand(right, &y);
        } else if !self.info.is_permissive(y.ty)
            && !self.info.basic_kind(y.ty).is_some_and(|k| k.is_integer())
        {
            let message = format!(
                "invalid operation: shift count {} must be integer",
                self.describe(right, &y)
            );
            self.error(right, message);
            return Operand::invalid();
        }
        let count = y.val.as_ref().filter(|_| y.is_constant()).and_then(|v| v.as_int());
        if count.is_some_and(|c| c < 0) {
            let message = format!("invalid shift count {} (negative)", right.text());
            self.error(right, message);
            return Operand::invalid();
        }

        if self.info.is_untyped(x.ty) {
            let integral = x.val.as_ref().and_then(|v| v.as_int());
            if x.is_constant() && integral.is_none() && !x.val.as_ref().is_some_and(|v| v.is_unknown()) {
                let message = format!(
                    "invalid operation: shifted operand {} must be integer",
                    self.describe(left, &x)
                );
                self.error(left, message);
                return Operand::invalid();
            }
            if count.is_none() || !x.is_constant() {
                // A non-constant shift stays untyped; the operand takes its
                // type from the context the shift is used in.
                let kind = match self.info.basic_kind(x.ty) {
                    Some(BasicKind::UntypedRune) => BasicKind::UntypedRune,
                    _ => BasicKind::UntypedInt,
                };
                return Operand::new(Mode::Value, TypeTable::basic(kind));
            }
            x.ty = TypeTable::basic(BasicKind::UntypedInt);
            x.val = integral.map(Value::Int);
        } else if !self.info.is_permissive(x.ty)
            && !self.info.basic_kind(x.ty).is_some_and(|k| k.is_integer())
        {
            let message = format!(
                "invalid operation: shifted operand {} must be integer",
                self.describe(left, &x)
            );
            self.error(left, message);
            return Operand::invalid();
        }

        match (&x.val, count) {
            (Some(v), Some(count)) if x.is_constant() => {
                if count > 1023 {
                    let message = format!("invalid shift count {count}");
                    self.error(right, message);
                    return Operand::invalid();
                }
                let value = Value::shift(op, v, count as u32).unwrap_or(Value::Unknown);
                self.check_overflow(node, x.ty, value)
            }
            _ => Operand::new(Mode::Value, x.ty),
        }
    }

    /// Give an untyped operand the type `target`, converting constant
    /// values and checking representability.
    pub(super) fn convert_untyped(&mut self, x: &mut Operand, target: TypeId) -> Result<(), ConvError> {
        let Some(from) = self.info.basic_kind(x.ty).filter(|k| k.is_untyped()) else {
            return Ok(());
        };
        if target == TypeTable::invalid() || target == x.ty {
            return Ok(());
        }

        if let Some(to) = self.info.basic_kind(target).filter(|k| k.is_untyped()) {
            if from.is_numeric() && to.is_numeric() {
                x.ty = target;
                x.val = x.val.as_ref().map(|v| v.convert_to(to));
                return Ok(());
            }
            return Err(ConvError::Incompatible);
        }
        if self.info.is_permissive(target) {
            x.ty = target;
            return Ok(());
        }

        let under = self.info.under(target);
        match self.info.ty(under).clone() {
            Type::Basic(kind) => {
                let compatible = match from {
                    BasicKind::UntypedBool => kind.is_boolean(),
                    BasicKind::UntypedInt | BasicKind::UntypedRune | BasicKind::UntypedFloat => {
                        kind.is_numeric()
                    }
                    BasicKind::UntypedString => kind.is_string(),
                    BasicKind::UntypedNil => kind == BasicKind::UnsafePointer,
                    _ => false,
                };
                if !compatible {
                    return Err(ConvError::Incompatible);
                }
                if x.is_constant() {
                    if let Some(v) = x.val.clone() {
                        if !v.representable(kind) {
                            let truncated = kind.is_integer()
                                && v.as_float().is_some_and(|f| f.fract() != 0.0);
                            return Err(if truncated {
                                ConvError::Truncated
                            } else {
                                ConvError::Overflow
                            });
                        }
                        x.val = Some(v.convert_to(kind));
                    }
                }
                x.ty = target;
                Ok(())
            }
            Type::Interface(_) => {
                if from == BasicKind::UntypedNil {
                    x.ty = target;
                } else {
                    // The value is stored with its default type; the caller
                    // checks that type against the interface.
                    x.ty = TypeTable::basic(from.default_kind());
                }
                Ok(())
            }
            Type::Pointer(_) | Type::Slice(_) | Type::Map { .. } | Type::Chan { .. } | Type::Signature(_)
                if from == BasicKind::UntypedNil =>
            {
                x.ty = target;
                Ok(())
            }
            _ => Err(ConvError::Incompatible),
        }
    }

    /// Check that `x` may be assigned to a variable of type `target`,
    /// converting untyped values. Reports and invalidates `x` otherwise.
    pub(super) fn assignment(&mut self, node: AstNode<'a>, x: &mut Operand, target: TypeId, context: &str) {
        if x.is_invalid() || target == TypeTable::invalid() {
            return;
        }
        let desc = if x.ty == NIL {
            "nil".to_string()
        } else {
            self.describe(node, x)
        };
        let target_name = self.type_string(target);

        if self.info.is_untyped(x.ty) {
            if let Err(err) = self.convert_untyped(x, target) {
                let suffix = match err {
                    ConvError::Incompatible => "",
                    ConvError::Overflow => " (overflows)",
                    ConvError::Truncated => " (truncated)",
                };
                self.error(
                    node,
                    format!("cannot use {desc} as {target_name} value in {context}{suffix}"),
                );
                *x = Operand::invalid();
                return;
            }
            self.record_operand(node, x);
            if x.ty == target {
                return;
            }
        }

        if let Err(reason) = self.info.assignable(x.ty, target) {
            let reason = if reason.is_empty() {
                String::new()
            } else {
                format!(": {reason}")
            };
            self.error(
                node,
                format!("cannot use {desc} as {target_name} value in {context}{reason}"),
            );
            *x = Operand::invalid();
        }
    }
}

/// Untyped numeric kinds ordered by generality.
fn rank(kind: BasicKind) -> u8 {
    match kind {
        BasicKind::UntypedInt => 0,
        BasicKind::UntypedRune => 1,
        _ => 2,
    }
}

/// Strip enclosing parentheses.
pub(super) fn unparen(node: AstNode<'_>) -> AstNode<'_> {
    let mut node = node;
    while node.kind() == "parenthesized_expression" {
        match node.children().first() {
            Some(inner) => node = *inner,
            None => break,
        }
    }
    node
}
