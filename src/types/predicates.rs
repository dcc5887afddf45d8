//! Type predicates: underlying types, identity, assignability, method sets
//! and display.

use crate::types::ids::{ObjectId, TypeId};
use crate::types::selection::Lookup;
use crate::types::ty::{BasicKind, ChanDir, Type, TypeTable};
use crate::types::TypeInfo;
use std::collections::HashSet;

impl TypeInfo {
    /// The underlying type. Named types resolve to their definition
    /// (instantiations to their origin's), everything else to itself.
    pub fn under(&self, ty: TypeId) -> TypeId {
        match self.ty(ty) {
            Type::Named(named) => named
                .underlying
                .or_else(|| {
                    named.origin.and_then(|origin| match self.ty(origin) {
                        Type::Named(o) => o.underlying,
                        _ => None,
                    })
                })
                .unwrap_or(TypeTable::invalid()),
            _ => ty,
        }
    }

    pub fn basic_kind(&self, ty: TypeId) -> Option<BasicKind> {
        match self.ty(self.under(ty)) {
            Type::Basic(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_untyped(&self, ty: TypeId) -> bool {
        matches!(self.ty(ty), Type::Basic(kind) if kind.is_untyped())
    }

    pub fn is_interface(&self, ty: TypeId) -> bool {
        matches!(self.ty(self.under(ty)), Type::Interface(_))
    }

    /// Types every operation is accepted on: opaque imports, type
    /// parameters and invalid types.
    pub fn is_permissive(&self, ty: TypeId) -> bool {
        matches!(
            self.ty(self.under(ty)),
            Type::Opaque { .. } | Type::TypeParam { .. } | Type::Basic(BasicKind::Invalid)
        )
    }

    /// Whether a type parameter occurs anywhere in `ty`. Named types are
    /// inspected through their type arguments only.
    pub fn mentions_type_param(&self, ty: TypeId) -> bool {
        match self.ty(ty) {
            Type::TypeParam { .. } => true,
            Type::Basic(_) | Type::Opaque { .. } => false,
            Type::Pointer(elem) | Type::Slice(elem) | Type::Chan { elem, .. } => {
                self.mentions_type_param(*elem)
            }
            Type::Array { elem, .. } => self.mentions_type_param(*elem),
            Type::Map { key, value } => {
                self.mentions_type_param(*key) || self.mentions_type_param(*value)
            }
            Type::Signature(sig) => sig
                .params
                .iter()
                .chain(&sig.results)
                .any(|v| self.mentions_type_param(self.object(*v).ty)),
            Type::Struct(st) => st
                .fields
                .iter()
                .any(|f| self.mentions_type_param(self.object(*f).ty)),
            Type::Interface(iface) => {
                iface
                    .methods
                    .iter()
                    .any(|m| self.mentions_type_param(self.object(*m).ty))
                    || iface.embeddeds.iter().any(|e| self.mentions_type_param(*e))
            }
            Type::Tuple(items) => items.iter().any(|t| self.mentions_type_param(*t)),
            Type::Named(named) => named.type_args.iter().any(|t| self.mentions_type_param(*t)),
            Type::Union(terms) => terms.iter().any(|t| self.mentions_type_param(t.ty)),
        }
    }

    /// A defined type: named types and the predeclared basic types.
    pub fn is_named(&self, ty: TypeId) -> bool {
        matches!(
            self.ty(ty),
            Type::Named(_) | Type::Basic(_) | Type::TypeParam { .. } | Type::Opaque { name: Some(_) }
        )
    }

    /// Strip one pointer: `(*T -> T, true)`, `(T -> T, false)`.
    pub fn deref(&self, ty: TypeId) -> (TypeId, bool) {
        match self.ty(ty) {
            Type::Pointer(elem) => (*elem, true),
            _ => (ty, false),
        }
    }

    /// Methods declared on a named type or its generic origin.
    pub fn named_methods(&self, ty: TypeId) -> &[ObjectId] {
        match self.ty(ty) {
            Type::Named(named) => match named.origin.map(|o| self.ty(o)) {
                Some(Type::Named(origin)) => &origin.methods,
                _ => &named.methods,
            },
            _ => &[],
        }
    }

    /// The full method set of an interface, embedded interfaces included,
    /// in declaration order.
    pub fn interface_methods(&self, ty: TypeId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut names = HashSet::new();
        let mut visited = HashSet::new();
        self.collect_interface_methods(ty, &mut out, &mut names, &mut visited);
        out
    }

    fn collect_interface_methods(
        &self,
        ty: TypeId,
        out: &mut Vec<ObjectId>,
        names: &mut HashSet<String>,
        visited: &mut HashSet<TypeId>,
    ) {
        if !visited.insert(ty) {
            return;
        }
        let Type::Interface(iface) = self.ty(self.under(ty)) else {
            return;
        };
        for method in &iface.methods {
            if names.insert(self.object(*method).name.clone()) {
                out.push(*method);
            }
        }
        for embedded in &iface.embeddeds {
            self.collect_interface_methods(*embedded, out, names, visited);
        }
    }

    /// Whether the interface `ty` is a constraint-only interface (has
    /// type terms), which cannot be used as a value type.
    pub fn is_constraint_interface(&self, ty: TypeId) -> bool {
        match self.ty(self.under(ty)) {
            Type::Interface(iface) => iface.embeddeds.iter().any(|e| {
                matches!(self.ty(*e), Type::Union(_))
                    || !matches!(self.ty(self.under(*e)), Type::Interface(_))
                    || self.is_constraint_interface(*e)
            }),
            _ => false,
        }
    }

    /// Type identity.
    pub fn identical(&self, x: TypeId, y: TypeId) -> bool {
        if x == y {
            return true;
        }
        match (self.ty(x), self.ty(y)) {
            (Type::Basic(a), Type::Basic(b)) => a == b,
            (Type::Pointer(a), Type::Pointer(b)) | (Type::Slice(a), Type::Slice(b)) => {
                self.identical(*a, *b)
            }
            (Type::Array { len: la, elem: ea }, Type::Array { len: lb, elem: eb }) => {
                la == lb && self.identical(*ea, *eb)
            }
            (Type::Map { key: ka, value: va }, Type::Map { key: kb, value: vb }) => {
                self.identical(*ka, *kb) && self.identical(*va, *vb)
            }
            (Type::Chan { dir: da, elem: ea }, Type::Chan { dir: db, elem: eb }) => {
                da == db && self.identical(*ea, *eb)
            }
            (Type::Signature(a), Type::Signature(b)) => {
                a.variadic == b.variadic
                    && a.type_params.len() == b.type_params.len()
                    && self.identical_vars(&a.params, &b.params)
                    && self.identical_vars(&a.results, &b.results)
            }
            (Type::Struct(a), Type::Struct(b)) => {
                a.fields.len() == b.fields.len()
                    && a.tags == b.tags
                    && a.fields.iter().zip(&b.fields).all(|(fa, fb)| {
                        let (fa, fb) = (self.object(*fa), self.object(*fb));
                        fa.name == fb.name
                            && fa.is_embedded() == fb.is_embedded()
                            && self.identical(fa.ty, fb.ty)
                    })
            }
            (Type::Interface(_), Type::Interface(_)) => {
                let mut ma = self.interface_methods(x);
                let mut mb = self.interface_methods(y);
                if ma.len() != mb.len() {
                    return false;
                }
                ma.sort_by(|a, b| self.object(*a).name.cmp(&self.object(*b).name));
                mb.sort_by(|a, b| self.object(*a).name.cmp(&self.object(*b).name));
                ma.iter().zip(&mb).all(|(a, b)| {
                    let (a, b) = (self.object(*a), self.object(*b));
                    a.name == b.name && self.identical(a.ty, b.ty)
                })
            }
            (Type::Tuple(a), Type::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| self.identical(*x, *y))
            }
            (Type::Named(a), Type::Named(b)) => {
                a.obj == b.obj
                    && a.type_args.len() == b.type_args.len()
                    && a.type_args
                        .iter()
                        .zip(&b.type_args)
                        .all(|(x, y)| self.identical(*x, *y))
            }
            (Type::Union(a), Type::Union(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| x.tilde == y.tilde && self.identical(x.ty, y.ty))
            }
            (Type::Opaque { name: Some(a) }, Type::Opaque { name: Some(b) }) => a == b,
            _ => false,
        }
    }

    fn identical_vars(&self, a: &[ObjectId], b: &[ObjectId]) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b)
                .all(|(x, y)| self.identical(self.object(*x).ty, self.object(*y).ty))
    }

    /// Whether values of `ty` support `==`.
    pub fn comparable(&self, ty: TypeId) -> bool {
        self.comparable_in(ty, &mut HashSet::new())
    }

    fn comparable_in(&self, ty: TypeId, seen: &mut HashSet<TypeId>) -> bool {
        if !seen.insert(ty) {
            return true;
        }
        match self.ty(self.under(ty)) {
            Type::Basic(kind) => *kind != BasicKind::UntypedNil,
            Type::Pointer(_) | Type::Chan { .. } | Type::Interface(_) => true,
            Type::Struct(st) => st
                .fields
                .iter()
                .all(|f| self.comparable_in(self.object(*f).ty, seen)),
            Type::Array { elem, .. } => self.comparable_in(*elem, seen),
            Type::Opaque { .. } | Type::TypeParam { .. } => true,
            _ => false,
        }
    }

    /// Types that may hold `nil`.
    pub fn has_nil(&self, ty: TypeId) -> bool {
        matches!(
            self.ty(self.under(ty)),
            Type::Pointer(_)
                | Type::Slice(_)
                | Type::Map { .. }
                | Type::Chan { .. }
                | Type::Signature(_)
                | Type::Interface(_)
                | Type::Basic(BasicKind::UnsafePointer)
                | Type::Opaque { .. }
                | Type::TypeParam { .. }
        )
    }

    /// Why `ty` does not implement interface `iface`, or `None` if it does.
    pub fn missing_method(&self, ty: TypeId, iface: TypeId) -> Option<String> {
        if self.is_permissive(ty) {
            return None;
        }
        let ty_is_iface = self.is_interface(ty);
        let own = if ty_is_iface {
            self.interface_methods(ty)
        } else {
            Vec::new()
        };

        for method in self.interface_methods(iface) {
            let want = self.object(method);
            if ty_is_iface {
                match own.iter().find(|m| self.object(**m).name == want.name) {
                    None => return Some(format!("missing method {}", want.name)),
                    Some(m) if !self.identical(self.object(*m).ty, want.ty) => {
                        return Some(format!("wrong type for method {}", want.name))
                    }
                    Some(_) => continue,
                }
            }
            match self.lookup_field_or_method(ty, &want.name) {
                Lookup::Found { obj, .. } if self.object(obj).is_var() => {
                    return Some(format!("missing method {}", want.name));
                }
                Lookup::Found { obj, indirect, .. } => {
                    if !self.identical(self.object(obj).ty, want.ty) {
                        return Some(format!("wrong type for method {}", want.name));
                    }
                    let is_ptr = matches!(self.ty(ty), Type::Pointer(_));
                    if self.has_pointer_receiver(obj) && !is_ptr && !indirect {
                        return Some(format!(
                            "method {} has pointer receiver",
                            want.name
                        ));
                    }
                }
                _ => return Some(format!("missing method {}", want.name)),
            }
        }
        None
    }

    /// Assignability of a typed value of type `value` to `target`. Untyped
    /// constants are handled by the checker before calling this.
    pub fn assignable(&self, value: TypeId, target: TypeId) -> Result<(), String> {
        if self.identical(value, target) || self.is_permissive(value) || self.is_permissive(target)
        {
            return Ok(());
        }
        let (vu, tu) = (self.under(value), self.under(target));
        if self.identical(vu, tu) && (!self.is_named(value) || !self.is_named(target)) {
            return Ok(());
        }
        if self.is_interface(target) {
            return match self.missing_method(value, target) {
                None => Ok(()),
                Some(reason) => Err(format!(
                    "{} does not implement {} ({reason})",
                    self.type_string(value),
                    self.type_string(target)
                )),
            };
        }
        if let (Type::Chan { dir: ChanDir::Both, elem: ve }, Type::Chan { elem: te, .. }) =
            (self.ty(vu), self.ty(tu))
        {
            if self.identical(*ve, *te) && (!self.is_named(value) || !self.is_named(target)) {
                return Ok(());
            }
        }
        Err(String::new())
    }

    /// Render a type the way Go diagnostics do.
    pub fn type_string(&self, ty: TypeId) -> String {
        let mut out = String::new();
        self.write_type(&mut out, ty, 0);
        out
    }

    fn write_type(&self, out: &mut String, ty: TypeId, depth: usize) {
        if depth > 16 {
            out.push_str("...");
            return;
        }
        let d = depth + 1;
        match self.ty(ty) {
            Type::Basic(kind) => out.push_str(kind.name()),
            Type::Pointer(elem) => {
                out.push('*');
                self.write_type(out, *elem, d);
            }
            Type::Slice(elem) => {
                out.push_str("[]");
                self.write_type(out, *elem, d);
            }
            Type::Array { len, elem } => {
                match len {
                    Some(n) => out.push_str(&format!("[{n}]")),
                    None => out.push_str("[?]"),
                }
                self.write_type(out, *elem, d);
            }
            Type::Map { key, value } => {
                out.push_str("map[");
                self.write_type(out, *key, d);
                out.push(']');
                self.write_type(out, *value, d);
            }
            Type::Chan { dir, elem } => {
                out.push_str(match dir {
                    ChanDir::Both => "chan ",
                    ChanDir::Send => "chan<- ",
                    ChanDir::Recv => "<-chan ",
                });
                self.write_type(out, *elem, d);
            }
            Type::Signature(_) => {
                out.push_str("func");
                self.write_signature(out, ty, d);
            }
            Type::Struct(st) => {
                out.push_str("struct{");
                for (i, field) in st.fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str("; ");
                    }
                    let field = self.object(*field);
                    if !field.is_embedded() {
                        out.push_str(&field.name);
                        out.push(' ');
                    }
                    self.write_type(out, field.ty, d);
                }
                out.push('}');
            }
            Type::Interface(iface) => {
                if ty == self.any {
                    out.push_str("any");
                    return;
                }
                out.push_str("interface{");
                let mut first = true;
                for method in &iface.methods {
                    if !first {
                        out.push_str("; ");
                    }
                    first = false;
                    let method = self.object(*method);
                    out.push_str(&method.name);
                    self.write_signature(out, method.ty, d);
                }
                for embedded in &iface.embeddeds {
                    if !first {
                        out.push_str("; ");
                    }
                    first = false;
                    self.write_type(out, *embedded, d);
                }
                out.push('}');
            }
            Type::Tuple(items) => {
                out.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_type(out, *item, d);
                }
                out.push(')');
            }
            Type::Named(named) => {
                let obj = self.object(named.obj);
                if let Some(import) = obj.import {
                    if let Some(pkg) = self.import_names.get(import) {
                        out.push_str(pkg);
                        out.push('.');
                    }
                }
                out.push_str(&obj.name);
                if !named.type_args.is_empty() {
                    out.push('[');
                    for (i, arg) in named.type_args.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        self.write_type(out, *arg, d);
                    }
                    out.push(']');
                }
            }
            Type::TypeParam { obj, .. } => out.push_str(&self.object(*obj).name),
            Type::Union(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" | ");
                    }
                    if term.tilde {
                        out.push('~');
                    }
                    self.write_type(out, term.ty, d);
                }
            }
            Type::Opaque { name } => out.push_str(name.as_deref().unwrap_or("opaque")),
        }
    }

    fn write_signature(&self, out: &mut String, ty: TypeId, depth: usize) {
        let Type::Signature(sig) = self.ty(ty) else {
            out.push_str("()");
            return;
        };
        out.push('(');
        for (i, param) in sig.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let param_ty = self.object(*param).ty;
            if sig.variadic && i + 1 == sig.params.len() {
                out.push_str("...");
                let elem = match self.ty(param_ty) {
                    Type::Slice(elem) => *elem,
                    _ => param_ty,
                };
                self.write_type(out, elem, depth);
            } else {
                self.write_type(out, param_ty, depth);
            }
        }
        out.push(')');
        match sig.results.as_slice() {
            [] => {}
            [only] if self.object(*only).name.is_empty() => {
                out.push(' ');
                self.write_type(out, self.object(*only).ty, depth);
            }
            results => {
                out.push_str(" (");
                for (i, result) in results.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_type(out, self.object(*result).ty, depth);
                }
                out.push(')');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ty::InterfaceType;

    #[test]
    fn composite_identity_is_structural() {
        let mut info = TypeInfo::new();
        let int = TypeTable::basic(BasicKind::Int);
        let a = info.type_table.alloc(Type::Slice(int));
        let b = info.type_table.alloc(Type::Slice(int));
        let c = info.type_table.alloc(Type::Slice(TypeTable::basic(BasicKind::String)));
        assert!(info.identical(a, b));
        assert!(!info.identical(a, c));
        assert_eq!(info.type_string(a), "[]int");
    }

    #[test]
    fn map_and_chan_display() {
        let mut info = TypeInfo::new();
        let string = TypeTable::basic(BasicKind::String);
        let int = TypeTable::basic(BasicKind::Int);
        let map = info.type_table.alloc(Type::Map { key: string, value: int });
        let chan = info.type_table.alloc(Type::Chan {
            dir: ChanDir::Recv,
            elem: map,
        });
        assert_eq!(info.type_string(chan), "<-chan map[string]int");
    }

    #[test]
    fn empty_interface_accepts_everything() {
        let mut info = TypeInfo::new();
        let iface = info.type_table.alloc(Type::Interface(InterfaceType {
            methods: Vec::new(),
            embeddeds: Vec::new(),
        }));
        let int = TypeTable::basic(BasicKind::Int);
        assert!(info.assignable(int, iface).is_ok());
        assert!(info.assignable(iface, int).is_err());
    }
}
