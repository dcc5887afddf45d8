//! Named language entities: packages, constants, types, variables,
//! functions, labels and builtins.

use crate::pos::Pos;
use crate::types::constant::Value;
use crate::types::ids::{ObjectId, ScopeId, TypeId};
use std::fmt;

/// Predeclared functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Append,
    Cap,
    Clear,
    Close,
    Complex,
    Copy,
    Delete,
    Imag,
    Len,
    Make,
    Max,
    Min,
    New,
    Panic,
    Print,
    Println,
    Real,
    Recover,
}

impl Builtin {
    pub const ALL: [Builtin; 18] = [
        Builtin::Append,
        Builtin::Cap,
        Builtin::Clear,
        Builtin::Close,
        Builtin::Complex,
        Builtin::Copy,
        Builtin::Delete,
        Builtin::Imag,
        Builtin::Len,
        Builtin::Make,
        Builtin::Max,
        Builtin::Min,
        Builtin::New,
        Builtin::Panic,
        Builtin::Print,
        Builtin::Println,
        Builtin::Real,
        Builtin::Recover,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Append => "append",
            Builtin::Cap => "cap",
            Builtin::Clear => "clear",
            Builtin::Close => "close",
            Builtin::Complex => "complex",
            Builtin::Copy => "copy",
            Builtin::Delete => "delete",
            Builtin::Imag => "imag",
            Builtin::Len => "len",
            Builtin::Make => "make",
            Builtin::Max => "max",
            Builtin::Min => "min",
            Builtin::New => "new",
            Builtin::Panic => "panic",
            Builtin::Print => "print",
            Builtin::Println => "println",
            Builtin::Real => "real",
            Builtin::Recover => "recover",
        }
    }

    /// Fixed argument count, or the minimum for variadic builtins.
    pub(crate) fn arity(self) -> (usize, bool) {
        match self {
            Builtin::Append => (1, true),
            Builtin::Cap | Builtin::Len => (1, false),
            Builtin::Clear | Builtin::Close => (1, false),
            Builtin::Complex => (2, false),
            Builtin::Copy | Builtin::Delete => (2, false),
            Builtin::Imag | Builtin::Real => (1, false),
            Builtin::Make => (1, true),
            Builtin::Max | Builtin::Min => (1, true),
            Builtin::New | Builtin::Panic => (1, false),
            Builtin::Print | Builtin::Println => (0, true),
            Builtin::Recover => (0, false),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    /// An imported package; indexes [`Package::imports`](super::Package).
    PkgName { import: usize },
    Const { value: Value },
    TypeName { alias: bool },
    Var { field: bool, embedded: bool },
    Func,
    Label,
    Builtin(Builtin),
    Nil,
    /// A member of an imported package whose declaration is unknown.
    Opaque,
}

#[derive(Debug, Clone)]
pub struct Object {
    pub name: String,
    pub kind: ObjectKind,
    /// Position of the declaring identifier; `Pos::NONE` for predeclared
    /// and imported objects.
    pub pos: Pos,
    pub ty: TypeId,
    /// Scope the object was declared in, if any. Fields, methods and
    /// imported members have none.
    pub parent: Option<ScopeId>,
    /// Index of the importing package for imported members.
    pub import: Option<usize>,
}

impl Object {
    pub fn exported(&self) -> bool {
        is_exported(&self.name)
    }

    pub fn is_type_name(&self) -> bool {
        matches!(self.kind, ObjectKind::TypeName { .. })
    }

    pub fn is_var(&self) -> bool {
        matches!(self.kind, ObjectKind::Var { .. })
    }

    pub fn is_field(&self) -> bool {
        matches!(self.kind, ObjectKind::Var { field: true, .. })
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self.kind, ObjectKind::Var { embedded: true, .. })
    }

    /// Short category name used in diagnostics.
    pub fn category(&self) -> &'static str {
        match self.kind {
            ObjectKind::PkgName { .. } => "package",
            ObjectKind::Const { .. } => "const",
            ObjectKind::TypeName { .. } => "type",
            ObjectKind::Var { field: true, .. } => "field",
            ObjectKind::Var { .. } => "var",
            ObjectKind::Func => "func",
            ObjectKind::Label => "label",
            ObjectKind::Builtin(_) => "builtin",
            ObjectKind::Nil => "nil",
            ObjectKind::Opaque => "member",
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.category(), self.name)
    }
}

pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Owner of every [`Object`] created for one unit.
#[derive(Debug, Clone, Default)]
pub struct ObjectTable {
    objects: Vec<Object>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, object: Object) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(object);
        id
    }

    pub fn get(&self, id: ObjectId) -> &Object {
        &self.objects[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> &mut Object {
        &mut self.objects[id.index()]
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (ObjectId(i as u32), o))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exported_names() {
        assert!(is_exported("Println"));
        assert!(!is_exported("println"));
        assert!(!is_exported("_X"));
        assert!(!is_exported(""));
    }
}
