//! Calls, conversions and builtin functions.

use super::{Checker, Operand};
use crate::pos::Pos;
use crate::syntax::AstNode;
use crate::types::constant::Value;
use crate::types::ids::TypeId;
use crate::types::object::Builtin;
use crate::types::ty::{BasicKind, ChanDir, Signature, Type, TypeTable};
use crate::types::Mode;

/// Arguments of a call with the `...` spread flag.
struct Args<'a> {
    nodes: Vec<AstNode<'a>>,
    spread: bool,
    /// Closing parenthesis, where missing arguments are reported.
    close: Pos,
}

impl<'a> Args<'a> {
    fn of(call: AstNode<'a>) -> Self {
        let Some(list) = call.field("arguments") else {
            return Args {
                nodes: Vec::new(),
                spread: false,
                close: call.end(),
            };
        };
        let mut spread = false;
        let nodes = list
            .children()
            .into_iter()
            .map(|arg| match arg.kind() {
                "variadic_argument" => {
                    spread = true;
                    arg.children().first().copied().unwrap_or(arg)
                }
                _ => arg,
            })
            .collect();
        Args {
            nodes,
            spread,
            close: Pos(list.end().0.saturating_sub(1)),
        }
    }
}

impl<'a> Checker<'a> {
    pub(super) fn call(&mut self, node: AstNode<'a>) -> Operand {
        let Some(function) = node.field("function") else {
            return Operand::invalid();
        };
        let args = Args::of(node);
        let type_args: Vec<TypeId> = match node.field("type_arguments") {
            Some(list) => list
                .children()
                .into_iter()
                .map(|t| self.type_expr(t))
                .collect(),
            None => Vec::new(),
        };

        let mut x = self.expr_or_type(function);
        if x.mode == Mode::TypeExpr && !type_args.is_empty() {
            x.ty = self.instantiate(function, x.ty, type_args);
            self.record_type_expr(function, x.ty);
        }
        match x.mode {
            Mode::Invalid => {
                self.use_exprs(&args.nodes);
                Operand::invalid()
            }
            Mode::TypeExpr => {
                if args.spread {
                    let message = format!(
                        "invalid use of ... in conversion to {}",
                        self.type_string(x.ty)
                    );
                    self.error(node, message);
                }
                self.conversion(node, x.ty, &args.nodes)
            }
            Mode::Builtin => match x.builtin {
                Some(builtin) => self.builtin(node, builtin, &args),
                None => Operand::invalid(),
            },
            _ => {
                let x = self.single_value(function, x);
                if x.is_invalid() {
                    self.use_exprs(&args.nodes);
                    return Operand::invalid();
                }
                let sig = match self.info.ty(self.info.under(x.ty)) {
                    Type::Signature(sig) => sig.clone(),
                    _ if self.info.is_permissive(x.ty) => {
                        self.use_exprs(&args.nodes);
                        return Operand::new(Mode::Value, TypeTable::OPAQUE);
                    }
                    _ => {
                        let message = format!(
                            "invalid operation: cannot call non-function {}",
                            self.describe(function, &x)
                        );
                        self.error(function, message);
                        self.use_exprs(&args.nodes);
                        return Operand::invalid();
                    }
                };
                self.arguments(function, &sig, &args);
                self.call_result(&sig)
            }
        }
    }

    fn call_result(&mut self, sig: &Signature) -> Operand {
        let types: Vec<TypeId> = sig
            .results
            .iter()
            .map(|r| self.uninferred(self.info.object(*r).ty))
            .collect();
        match types.as_slice() {
            [] => Operand::new(Mode::NoValue, TypeTable::invalid()),
            [one] => Operand::new(Mode::Value, *one),
            _ => {
                let tuple = self.info.type_table.alloc(Type::Tuple(types));
                Operand::new(Mode::Value, tuple)
            }
        }
    }

    /// Check call arguments against the parameters of `sig`.
    fn arguments(&mut self, function: AstNode<'a>, sig: &Signature, args: &Args<'a>) {
        let name = super::short_text(function.text());
        let context = format!("argument to {name}");
        let params: Vec<TypeId> = sig
            .params
            .iter()
            .map(|p| self.uninferred(self.info.object(*p).ty))
            .collect();
        if args.spread && !sig.variadic {
            let message = format!("have (...) but function {name} is not variadic");
            self.error(args.nodes[args.nodes.len() - 1], message);
            self.use_exprs(&args.nodes);
            return;
        }

        // f(g()) where g returns several values.
        if let [only] = args.nodes.as_slice() {
            if params.len() != 1 || sig.variadic {
                let x = self.expr_multi(*only);
                if x.is_invalid() {
                    return;
                }
                if let Type::Tuple(items) = self.info.ty(x.ty).clone() {
                    let targets = self.param_targets(sig, &params, items.len(), false);
                    if !self.argument_count(function, args, &params, sig.variadic, items.len()) {
                        return;
                    }
                    for (item, target) in items.into_iter().zip(targets) {
                        self.check_assignable_type(*only, item, target, &context);
                    }
                    return;
                }
                if self.opaque_call(*only, &x) && (params.len() > 1 || sig.variadic) {
                    return;
                }
                let mut x = self.single_value(*only, x);
                if !self.argument_count(function, args, &params, sig.variadic, 1) {
                    return;
                }
                let targets = self.param_targets(sig, &params, 1, args.spread);
                if let Some(target) = targets.first() {
                    self.assignment(*only, &mut x, *target, &context);
                }
                return;
            }
        }

        let mut operands: Vec<Operand> = args.nodes.iter().map(|a| self.expr(*a)).collect();
        if !self.argument_count(function, args, &params, sig.variadic, operands.len()) {
            return;
        }
        let targets = self.param_targets(sig, &params, operands.len(), args.spread);
        for ((node, x), target) in args.nodes.iter().zip(operands.iter_mut()).zip(targets) {
            self.assignment(*node, x, target, &context);
        }
    }

    /// Type arguments of calls are not inferred, so a parameter or result
    /// type built from type parameters, such as `[]T`, accepts anything.
    fn uninferred(&self, ty: TypeId) -> TypeId {
        if self.info.mentions_type_param(ty) {
            TypeTable::OPAQUE
        } else {
            ty
        }
    }

    /// Parameter type each of `n` arguments is assigned to.
    fn param_targets(&self, sig: &Signature, params: &[TypeId], n: usize, spread: bool) -> Vec<TypeId> {
        if !sig.variadic || spread {
            return params.to_vec();
        }
        let fixed = params.len().saturating_sub(1);
        let elem = match params.last().map(|t| (*t, self.info.ty(*t))) {
            Some((_, Type::Slice(elem))) => *elem,
            Some((t, _)) if self.info.is_permissive(t) => t,
            _ => TypeTable::invalid(),
        };
        (0..n)
            .map(|i| if i < fixed { params[i] } else { elem })
            .collect()
    }

    fn argument_count(
        &mut self,
        function: AstNode<'a>,
        args: &Args<'a>,
        params: &[TypeId],
        variadic: bool,
        n: usize,
    ) -> bool {
        let name = super::short_text(function.text());
        let (min, max) = if variadic && !args.spread {
            (params.len().saturating_sub(1), usize::MAX)
        } else {
            (params.len(), params.len())
        };
        if n < min {
            self.error_at(args.close, format!("not enough arguments in call to {name}"));
            return false;
        }
        if n > max {
            let at = args.nodes.get(max).copied().unwrap_or(function);
            self.error(at, format!("too many arguments in call to {name}"));
            return false;
        }
        true
    }

    /// `T(x)`.
    pub(super) fn conversion(&mut self, node: AstNode<'a>, target: TypeId, args: &[AstNode<'a>]) -> Operand {
        let t = self.type_string(target);
        let arg = match args {
            [arg] => *arg,
            [] => {
                self.error(node, format!("missing argument in conversion to {t}"));
                return Operand::invalid();
            }
            [_, extra, ..] => {
                self.error(*extra, format!("too many arguments in conversion to {t}"));
                self.use_exprs(args);
                return Operand::invalid();
            }
        };
        let mut x = self.expr(arg);
        if x.is_invalid() || target == TypeTable::invalid() {
            return Operand::invalid();
        }

        let target_kind = self
            .info
            .basic_kind(target)
            .filter(|k| k.is_const_type());
        if let (true, Some(kind), Some(value)) = (x.is_constant(), target_kind, x.val.clone()) {
            return self.constant_conversion(arg, x, target, kind, value);
        }

        if x.ty == TypeTable::basic(BasicKind::UntypedNil) {
            if !self.info.has_nil(target) {
                self.error(arg, format!("cannot convert nil to type {t}"));
                return Operand::invalid();
            }
            x.ty = target;
            self.record_operand(arg, &x);
            return Operand::new(Mode::Value, target);
        }
        if self.info.is_untyped(x.ty) {
            let ty = self.default_type(x.ty);
            self.convert_untyped(&mut x, ty).ok();
            self.record_operand(arg, &x);
        }
        if !self.convertible(x.ty, target) {
            let message = format!("cannot convert {} to type {t}", self.describe(arg, &x));
            self.error(arg, message);
            return Operand::invalid();
        }
        Operand::new(Mode::Value, target)
    }

    fn constant_conversion(
        &mut self,
        arg: AstNode<'a>,
        mut x: Operand,
        target: TypeId,
        kind: BasicKind,
        value: Value,
    ) -> Operand {
        let from = self.info.basic_kind(x.ty).unwrap_or(BasicKind::Invalid);
        let t = self.type_string(target);

        // string(rune)
        if kind.is_string() && from.is_integer() {
            let s = value
                .as_int()
                .and_then(|i| u32::try_from(i).ok())
                .and_then(char::from_u32)
                .unwrap_or('\u{FFFD}');
            return Operand::constant(target, Value::String(s.to_string()));
        }

        let compatible = (from.is_numeric() && kind.is_numeric())
            || (from.is_string() && kind.is_string())
            || (from.is_boolean() && kind.is_boolean());
        if !compatible {
            if !self.convertible(self.default_type(x.ty), target) {
                let message = format!("cannot convert {} to type {t}", self.describe(arg, &x));
                self.error(arg, message);
                return Operand::invalid();
            }
            return Operand::new(Mode::Value, target);
        }
        if !value.is_unknown() && !value.representable(kind) {
            let truncated = kind.is_integer() && value.as_float().is_some_and(|f| f.fract() != 0.0);
            let reason = if truncated { "truncated" } else { "overflows" };
            let message = format!(
                "cannot convert {} to type {t} ({reason})",
                self.describe(arg, &x)
            );
            self.error(arg, message);
            return Operand::invalid();
        }
        let converted = value.convert_to(kind);
        if self.info.is_untyped(x.ty) {
            x.ty = target;
            x.val = Some(converted.clone());
            self.record_operand(arg, &x);
        }
        Operand::constant(target, converted)
    }

    /// Whether a non-constant value of type `from` converts to `to`.
    fn convertible(&self, from: TypeId, to: TypeId) -> bool {
        if self.info.assignable(from, to).is_ok() {
            return true;
        }
        let (fu, tu) = (self.info.under(from), self.info.under(to));
        if self.info.identical(fu, tu) {
            return true;
        }
        match (self.info.ty(fu), self.info.ty(tu)) {
            (Type::Pointer(a), Type::Pointer(b)) => {
                self.info.identical(self.info.under(*a), self.info.under(*b))
            }
            (Type::Basic(a), Type::Basic(b)) => {
                (a.is_numeric() && b.is_numeric())
                    || (a.is_integer() && b.is_string())
                    || (a.is_string() && b.is_string())
                    || (*a == BasicKind::Uintptr && *b == BasicKind::UnsafePointer)
                    || (*a == BasicKind::UnsafePointer && *b == BasicKind::Uintptr)
            }
            (Type::Slice(elem), Type::Basic(b)) | (Type::Basic(b), Type::Slice(elem)) => {
                b.is_string() && self.is_byte_or_rune(*elem)
            }
            (Type::Slice(a), Type::Array { elem: b, .. }) => self.info.identical(*a, *b),
            (Type::Slice(a), Type::Pointer(p)) => match self.info.ty(self.info.under(*p)) {
                Type::Array { elem, .. } => self.info.identical(*a, *elem),
                _ => false,
            },
            (Type::Pointer(_), Type::Basic(BasicKind::UnsafePointer))
            | (Type::Basic(BasicKind::UnsafePointer), Type::Pointer(_)) => true,
            _ => false,
        }
    }

    fn is_byte_or_rune(&self, ty: TypeId) -> bool {
        matches!(
            self.info.basic_kind(ty),
            Some(BasicKind::Uint8 | BasicKind::Int32)
        )
    }

    fn builtin(&mut self, node: AstNode<'a>, builtin: Builtin, args: &Args<'a>) -> Operand {
        let call = super::short_text(node.text());
        let (min, variadic) = builtin.arity();
        let n = args.nodes.len();
        if n < min {
            let message = format!("not enough arguments for {call} (expected {min}, found {n})");
            self.error_at(args.close, message);
            self.builtin_args(builtin, &args.nodes);
            return Operand::invalid();
        }
        if !variadic && n > min {
            let message = format!("too many arguments for {call} (expected {min}, found {n})");
            self.error(args.nodes[min], message);
            self.builtin_args(builtin, &args.nodes);
            return Operand::invalid();
        }
        if args.spread && builtin != Builtin::Append {
            let message = format!("invalid operation: invalid use of ... with built-in {}", builtin.name());
            self.error(node, message);
            self.use_exprs(&args.nodes);
            return Operand::invalid();
        }

        let a = &args.nodes;
        match builtin {
            Builtin::Len | Builtin::Cap => self.len_cap(builtin, a[0]),
            Builtin::Append => self.append(a, args.spread),
            Builtin::Make => self.make(node, a),
            Builtin::New => {
                let t = self.type_expr(a[0]);
                let ty = self.info.type_table.alloc(Type::Pointer(t));
                Operand::new(Mode::Value, ty)
            }
            Builtin::Delete => {
                let m = self.expr(a[0]);
                let mut k = self.expr(a[1]);
                if m.is_invalid() {
                    return Operand::invalid();
                }
                match self.info.ty(self.info.under(m.ty)).clone() {
                    Type::Map { key, .. } => self.assignment(a[1], &mut k, key, "argument to delete"),
                    _ if self.info.is_permissive(m.ty) => {}
                    _ => {
                        let message = format!("invalid argument: {} is not a map", self.describe(a[0], &m));
                        self.error(a[0], message);
                        return Operand::invalid();
                    }
                }
                Operand::new(Mode::NoValue, TypeTable::invalid())
            }
            Builtin::Panic => {
                let mut x = self.expr(a[0]);
                let any = self.universe.any;
                self.assignment(a[0], &mut x, any, "argument to panic");
                Operand::new(Mode::NoValue, TypeTable::invalid())
            }
            Builtin::Print | Builtin::Println => {
                let context = format!("argument to built-in {}", builtin.name());
                for arg in a {
                    let mut x = self.expr(*arg);
                    self.var_type(*arg, &mut x, None, &context);
                }
                Operand::new(Mode::NoValue, TypeTable::invalid())
            }
            Builtin::Recover => Operand::new(Mode::Value, self.universe.any),
            Builtin::Copy => {
                let dst = self.expr(a[0]);
                let src = self.expr(a[1]);
                if dst.is_invalid() || src.is_invalid() {
                    return Operand::invalid();
                }
                let dst_ok = self.info.is_permissive(dst.ty)
                    || matches!(self.info.ty(self.info.under(dst.ty)), Type::Slice(_));
                let src_ok = self.info.is_permissive(src.ty)
                    || matches!(self.info.ty(self.info.under(src.ty)), Type::Slice(_))
                    || self.info.basic_kind(src.ty).is_some_and(|k| k.is_string());
                if !dst_ok || !src_ok {
                    let message = format!(
                        "invalid argument: copy expects slice arguments; found {} and {}",
                        self.describe(a[0], &dst),
                        self.describe(a[1], &src)
                    );
                    self.error(node, message);
                    return Operand::invalid();
                }
                Operand::new(Mode::Value, TypeTable::basic(BasicKind::Int))
            }
            Builtin::Close => {
                let x = self.expr(a[0]);
                if x.is_invalid() {
                    return x;
                }
                let problem = match self.info.ty(self.info.under(x.ty)) {
                    Type::Chan { dir: ChanDir::Recv, .. } => Some("cannot close receive-only channel"),
                    Type::Chan { .. } => None,
                    _ if self.info.is_permissive(x.ty) => None,
                    _ => Some("cannot close non-channel"),
                };
                if let Some(problem) = problem {
                    let message = format!("invalid operation: {problem} {}", self.describe(a[0], &x));
                    self.error(a[0], message);
                    return Operand::invalid();
                }
                Operand::new(Mode::NoValue, TypeTable::invalid())
            }
            Builtin::Clear => {
                let x = self.expr(a[0]);
                if x.is_invalid() {
                    return x;
                }
                let ok = self.info.is_permissive(x.ty)
                    || matches!(
                        self.info.ty(self.info.under(x.ty)),
                        Type::Map { .. } | Type::Slice(_)
                    );
                if !ok {
                    let message = format!(
                        "invalid argument: {} must be a map or slice",
                        self.describe(a[0], &x)
                    );
                    self.error(a[0], message);
                    return Operand::invalid();
                }
                Operand::new(Mode::NoValue, TypeTable::invalid())
            }
            Builtin::Complex => {
                let re = self.expr(a[0]);
                let im = self.expr(a[1]);
                if re.is_invalid() || im.is_invalid() {
                    return Operand::invalid();
                }
                let float32 = [re.ty, im.ty]
                    .iter()
                    .any(|t| self.info.basic_kind(*t) == Some(BasicKind::Float32));
                let kind = if float32 {
                    BasicKind::Complex64
                } else {
                    BasicKind::Complex128
                };
                for (arg, x) in [(a[0], &re), (a[1], &im)] {
                    let numeric = self.info.is_permissive(x.ty)
                        || self.info.basic_kind(x.ty).is_some_and(|k| k.is_numeric() && !k.is_complex());
                    if !numeric {
                        let message = format!(
                            "invalid argument: arguments have type {}, expected floating-point",
                            self.type_string(x.ty)
                        );
                        self.error(arg, message);
                        return Operand::invalid();
                    }
                }
                if re.is_constant() && im.is_constant() {
                    return Operand::constant(TypeTable::basic(kind), Value::Unknown);
                }
                Operand::new(Mode::Value, TypeTable::basic(kind))
            }
            Builtin::Real | Builtin::Imag => {
                let x = self.expr(a[0]);
                if x.is_invalid() {
                    return x;
                }
                let kind = match self.info.basic_kind(x.ty) {
                    Some(BasicKind::Complex64) => BasicKind::Float32,
                    Some(k) if k.is_complex() => BasicKind::Float64,
                    Some(k) if k.is_untyped() && k.is_numeric() => BasicKind::UntypedFloat,
                    _ if self.info.is_permissive(x.ty) => BasicKind::Float64,
                    _ => {
                        let message = format!(
                            "invalid argument: {} must be of complex type",
                            self.describe(a[0], &x)
                        );
                        self.error(a[0], message);
                        return Operand::invalid();
                    }
                };
                if x.is_constant() {
                    return Operand::constant(TypeTable::basic(kind), Value::Unknown);
                }
                Operand::new(Mode::Value, TypeTable::basic(kind))
            }
            Builtin::Min | Builtin::Max => self.min_max(node, builtin, a),
        }
    }

    /// Evaluate the arguments of a builtin call that already failed.
    fn builtin_args(&mut self, builtin: Builtin, args: &[AstNode<'a>]) {
        for (i, arg) in args.iter().enumerate() {
            if i == 0 && matches!(builtin, Builtin::Make | Builtin::New) {
                self.type_expr(*arg);
            } else {
                self.expr_any(*arg);
            }
        }
    }

    fn len_cap(&mut self, builtin: Builtin, arg: AstNode<'a>) -> Operand {
        let x = self.expr(arg);
        if x.is_invalid() {
            return x;
        }
        let int = TypeTable::basic(BasicKind::Int);
        let len = match self.info.ty(self.info.under(x.ty)).clone() {
            Type::Basic(kind) if kind.is_string() && builtin == Builtin::Len => {
                match (&x.val, x.is_constant()) {
                    (Some(Value::String(s)), true) => Some(s.len() as u64),
                    _ => None,
                }
            }
            Type::Array { len, .. } if !has_call_or_receive(arg) => len,
            Type::Pointer(base) => match self.info.ty(self.info.under(base)) {
                Type::Array { len, .. } if !has_call_or_receive(arg) => *len,
                Type::Array { .. } => None,
                _ => return self.invalid_len_arg(builtin, arg, &x),
            },
            Type::Array { .. } | Type::Slice(_) | Type::Chan { .. } => None,
            Type::Map { .. } if builtin == Builtin::Len => None,
            _ if self.info.is_permissive(x.ty) => None,
            _ => return self.invalid_len_arg(builtin, arg, &x),
        };
        match len {
            Some(len) => Operand::constant(int, Value::Int(len as i128)),
            None => Operand::new(Mode::Value, int),
        }
    }

    fn invalid_len_arg(&mut self, builtin: Builtin, arg: AstNode<'a>, x: &Operand) -> Operand {
        let message = format!(
            "invalid argument: {} for built-in {}",
            self.describe(arg, x),
            builtin.name()
        );
        self.error(arg, message);
        Operand::invalid()
    }

    fn append(&mut self, args: &[AstNode<'a>], spread: bool) -> Operand {
        let x = self.expr(args[0]);
        if x.is_invalid() {
            self.use_exprs(&args[1..]);
            return x;
        }
        if x.ty == TypeTable::basic(BasicKind::UntypedNil) {
            self.error(args[0], "first argument to append must be a typed slice; found untyped nil");
            self.use_exprs(&args[1..]);
            return Operand::invalid();
        }
        let elem = match self.info.ty(self.info.under(x.ty)) {
            Type::Slice(elem) => *elem,
            _ if self.info.is_permissive(x.ty) => {
                self.use_exprs(&args[1..]);
                return Operand::new(Mode::Value, x.ty);
            }
            _ => {
                let message = format!("invalid argument: {} is not a slice", self.describe(args[0], &x));
                self.error(args[0], message);
                self.use_exprs(&args[1..]);
                return Operand::invalid();
            }
        };

        if spread {
            if args.len() != 2 {
                self.error(args[args.len() - 1], "can only use ... with final argument in list");
                self.use_exprs(&args[1..]);
                return Operand::invalid();
            }
            let mut y = self.expr(args[1]);
            let bytes_from_string = self.info.basic_kind(elem) == Some(BasicKind::Uint8)
                && self.info.basic_kind(y.ty).is_some_and(|k| k.is_string());
            if !bytes_from_string {
                self.assignment(args[1], &mut y, x.ty, "argument to append");
            }
            return Operand::new(Mode::Value, x.ty);
        }

        for arg in &args[1..] {
            let mut y = self.expr(*arg);
            self.assignment(*arg, &mut y, elem, "argument to append");
        }
        Operand::new(Mode::Value, x.ty)
    }

    fn make(&mut self, node: AstNode<'a>, args: &[AstNode<'a>]) -> Operand {
        let t = self.type_expr(args[0]);
        if t == TypeTable::invalid() {
            self.use_exprs(&args[1..]);
            return Operand::invalid();
        }
        let (min, max) = match self.info.ty(self.info.under(t)) {
            Type::Slice(_) => (2, 3),
            Type::Map { .. } | Type::Chan { .. } => (1, 2),
            _ if self.info.is_permissive(t) => (1, 3),
            _ => {
                let message = format!(
                    "invalid argument: cannot make {}; type must be slice, map, or channel",
                    super::short_text(args[0].text())
                );
                self.error(args[0], message);
                self.use_exprs(&args[1..]);
                return Operand::invalid();
            }
        };
        let call = super::short_text(node.text());
        if args.len() < min || args.len() > max {
            let message = format!(
                "invalid operation: {call} expects {min} or {} arguments; found {}",
                min + 1,
                args.len()
            );
            self.error(node, message);
            self.use_exprs(&args[1..]);
            return Operand::invalid();
        }
        let sizes: Vec<Option<i128>> = args[1..].iter().map(|a| self.index_value(*a, None)).collect();
        if let [Some(len), Some(cap)] = sizes.as_slice() {
            if len > cap {
                self.error(args[1], "invalid argument: length and capacity swapped");
            }
        }
        Operand::new(Mode::Value, t)
    }

    fn min_max(&mut self, node: AstNode<'a>, builtin: Builtin, args: &[AstNode<'a>]) -> Operand {
        let mut acc = self.expr(args[0]);
        if acc.is_invalid() {
            self.use_exprs(&args[1..]);
            return acc;
        }
        let mut operands = vec![(args[0], acc.clone())];
        for arg in &args[1..] {
            let mut y = self.expr(*arg);
            if y.is_invalid() {
                return Operand::invalid();
            }
            let matched = self.match_types(&mut acc, &mut y);
            let mismatched = !self.info.identical(acc.ty, y.ty)
                && !self.info.is_permissive(acc.ty)
                && !self.info.is_permissive(y.ty);
            if !matched || mismatched {
                let message = format!(
                    "invalid argument: mismatched types {} (previous argument) and {} (type of {})",
                    self.type_string(acc.ty),
                    self.type_string(y.ty),
                    super::short_text(arg.text())
                );
                self.error(*arg, message);
                return Operand::invalid();
            }
            operands.push((*arg, y.clone()));
            // Fold constants as we go; a non-constant makes the result one.
            acc = match (&acc.val, &y.val, acc.is_constant() && y.is_constant()) {
                (Some(a), Some(b), true) => {
                    let take_y = match builtin {
                        Builtin::Min => Value::compare("<", b, a),
                        _ => Value::compare(">", b, a),
                    };
                    match take_y {
                        Some(true) => Operand::constant(acc.ty, b.clone()),
                        Some(false) => acc.clone(),
                        None => Operand::constant(acc.ty, Value::Unknown),
                    }
                }
                _ => Operand::new(Mode::Value, acc.ty),
            };
        }

        let ordered = self.info.is_permissive(acc.ty)
            || self.info.basic_kind(acc.ty).is_some_and(|k| k.is_ordered());
        if !ordered {
            let message = format!(
                "invalid argument: {} cannot be ordered",
                self.describe(args[0], &operands[0].1)
            );
            self.error(node, message);
            return Operand::invalid();
        }
        for (arg, mut x) in operands {
            if self.info.is_untyped(x.ty) && !self.info.is_untyped(acc.ty) {
                self.convert_untyped(&mut x, acc.ty).ok();
            }
            self.record_operand(arg, &x);
        }
        acc
    }
}

/// Whether `len(x)` must be evaluated at run time.
fn has_call_or_receive(node: AstNode<'_>) -> bool {
    if node.kind() == "call_expression"
        || (node.kind() == "unary_expression"
            && node.field("operator").is_some_and(|op| op.kind() == "<-"))
    {
        return true;
    }
    node.children().into_iter().any(has_call_or_receive)
}
