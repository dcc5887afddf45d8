//! Field and method selection, including promotion through embedded fields.

use crate::types::ids::{ObjectId, TypeId};
use crate::types::ty::Type;
use crate::types::TypeInfo;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    /// `x.f` selecting a struct field.
    FieldVal,
    /// `x.m` selecting a method of a value.
    MethodVal,
    /// `T.m` selecting a method of a type.
    MethodExpr,
}

/// Resolution of a selector expression `x.f`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub kind: SelectionKind,
    /// Type of `x`.
    pub recv: TypeId,
    /// The selected field or method.
    pub obj: ObjectId,
    /// Path of field indices from `x` to `f`; the last entry indexes the
    /// field list or method list holding `f`.
    pub index: Vec<usize>,
    /// Whether a pointer was dereferenced on the way to `f`.
    pub indirect: bool,
}

/// Outcome of a field or method lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found {
        obj: ObjectId,
        index: Vec<usize>,
        indirect: bool,
    },
    /// More than one candidate at the shallowest depth.
    Ambiguous,
    NotFound,
}

struct Entry {
    ty: TypeId,
    index: Vec<usize>,
    indirect: bool,
}

impl TypeInfo {
    /// Find the field or method `name` of `ty`, searching embedded fields
    /// breadth first so shallower names shadow deeper ones.
    pub fn lookup_field_or_method(&self, ty: TypeId, name: &str) -> Lookup {
        if name == "_" {
            return Lookup::NotFound;
        }

        let (start, indirect) = self.deref(ty);
        let mut current = vec![Entry {
            ty: start,
            index: Vec::new(),
            indirect,
        }];
        let mut seen = HashSet::new();

        while !current.is_empty() {
            let mut next = Vec::new();
            let mut found: Option<(ObjectId, Vec<usize>, bool)> = None;
            let mut count = 0;

            for entry in &current {
                let mut ty = entry.ty;
                if let Type::Named(named) = self.ty(ty) {
                    if !seen.insert(named.origin.unwrap_or(ty)) {
                        continue;
                    }
                    let methods = self.named_methods(ty);
                    if let Some(i) = methods.iter().position(|m| self.object(*m).name == name) {
                        count += 1;
                        found = Some((methods[i], extend(&entry.index, i), entry.indirect));
                        continue;
                    }
                    ty = self.under(ty);
                }

                match self.ty(ty) {
                    Type::Struct(st) => {
                        for (i, field_id) in st.fields.iter().enumerate() {
                            let field = self.object(*field_id);
                            if field.name == name {
                                count += 1;
                                found = Some((*field_id, extend(&entry.index, i), entry.indirect));
                                continue;
                            }
                            if field.is_embedded() {
                                let (embedded, is_ptr) = self.deref(field.ty);
                                next.push(Entry {
                                    ty: embedded,
                                    index: extend(&entry.index, i),
                                    indirect: entry.indirect || is_ptr,
                                });
                            }
                        }
                    }
                    Type::Interface(_) => {
                        let methods = self.interface_methods(ty);
                        if let Some(i) = methods.iter().position(|m| self.object(*m).name == name) {
                            count += 1;
                            found = Some((methods[i], extend(&entry.index, i), entry.indirect));
                        }
                    }
                    _ => {}
                }
            }

            if count > 1 {
                return Lookup::Ambiguous;
            }
            if let Some((obj, index, indirect)) = found {
                return Lookup::Found {
                    obj,
                    index,
                    indirect,
                };
            }
            current = next;
        }

        Lookup::NotFound
    }

    /// Whether `ty` embeds, at any depth, a type whose members are unknown.
    /// A failed lookup on such a type may name a promoted member.
    pub fn embeds_permissive(&self, ty: TypeId) -> bool {
        let mut stack = vec![self.deref(ty).0];
        let mut seen = HashSet::new();
        while let Some(ty) = stack.pop() {
            if !seen.insert(ty) {
                continue;
            }
            match self.ty(self.under(ty)) {
                Type::Struct(st) => {
                    for field in &st.fields {
                        let field = self.object(*field);
                        if field.is_embedded() {
                            stack.push(self.deref(field.ty).0);
                        }
                    }
                }
                Type::Interface(iface) => stack.extend(iface.embeddeds.iter().copied()),
                _ if self.is_permissive(ty) => return true,
                _ => {}
            }
        }
        false
    }

    /// Whether method `obj` is declared with a pointer receiver.
    pub fn has_pointer_receiver(&self, method: ObjectId) -> bool {
        match self.ty(self.object(method).ty) {
            Type::Signature(sig) => sig
                .recv
                .is_some_and(|recv| matches!(self.ty(self.object(recv).ty), Type::Pointer(_))),
            _ => false,
        }
    }
}

fn extend(index: &[usize], i: usize) -> Vec<usize> {
    let mut out = index.to_vec();
    out.push(i);
    out
}
