//! Whole-package semantic resolution.
//!
//! [`check`] resolves every identifier of a unit against one shared package
//! scope, computes the type of every expression, and records the results in
//! a [`TypeInfo`]. Resolution is atomic: either the whole unit checks and a
//! complete `TypeInfo` plus [`Package`] are returned, or a
//! [`ResolveError`](crate::error::ResolveError) carrying every diagnostic.

mod check;
pub mod constant;
pub mod ids;
pub mod importer;
pub mod object;
mod predicates;
pub mod scope;
pub mod selection;
pub mod ty;
mod universe;

pub use check::check;
pub use constant::Value;
pub use ids::{ObjectId, ScopeId, TypeId};
pub use importer::{ImportError, ImportedPackage, Importer, MemberKind, Members, StubImporter};
pub use object::{Builtin, Object, ObjectKind, ObjectTable};
pub use scope::{Scope, ScopeKind, ScopeTable};
pub use selection::{Selection, SelectionKind};
pub use ty::{BasicKind, ChanDir, Type, TypeTable};

use crate::syntax::{AstNode, NodeKey};
use std::collections::HashMap;

/// How an expression may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Invalid,
    /// A call without results.
    NoValue,
    Builtin,
    TypeExpr,
    Constant,
    /// Addressable value.
    Variable,
    /// `m[k]`: assignable but not addressable.
    MapIndex,
    Value,
    /// A value that may be used in a two-value assignment (`v, ok`).
    CommaOk,
}

/// Type and, for constants, value of one expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAndValue {
    pub mode: Mode,
    pub ty: TypeId,
    pub value: Option<Value>,
}

impl TypeAndValue {
    pub fn is_type(&self) -> bool {
        self.mode == Mode::TypeExpr
    }

    pub fn is_value(&self) -> bool {
        matches!(
            self.mode,
            Mode::Constant | Mode::Variable | Mode::MapIndex | Mode::Value | Mode::CommaOk
        )
    }
}

/// The semantic model of one unit.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// Expression to its type and value.
    pub types: HashMap<NodeKey, TypeAndValue>,
    /// Defining identifier to the object it declares. The package clause
    /// name and symbolic type-switch variables map to `None`.
    pub defs: HashMap<NodeKey, Option<ObjectId>>,
    /// Identifier to the object it denotes.
    pub uses: HashMap<NodeKey, ObjectId>,
    /// Import specs without an explicit name, and type-switch case clauses,
    /// to the object they declare implicitly.
    pub implicits: HashMap<NodeKey, ObjectId>,
    /// Selector expression to its field or method resolution. Qualified
    /// identifiers (`pkg.Name`) are recorded in `uses` instead.
    pub selections: HashMap<NodeKey, Selection>,
    /// Scope-introducing node to its scope.
    pub scopes: HashMap<NodeKey, ScopeId>,
    pub objects: ObjectTable,
    pub type_table: TypeTable,
    pub scope_table: ScopeTable,
    /// The predeclared `any` interface.
    pub(crate) any: TypeId,
    /// Local names of imported packages, by import index.
    pub(crate) import_names: Vec<String>,
}

impl TypeInfo {
    pub(crate) fn new() -> Self {
        Self {
            types: HashMap::new(),
            defs: HashMap::new(),
            uses: HashMap::new(),
            implicits: HashMap::new(),
            selections: HashMap::new(),
            scopes: HashMap::new(),
            objects: ObjectTable::new(),
            type_table: TypeTable::new(),
            scope_table: ScopeTable::new(),
            any: TypeTable::invalid(),
            import_names: Vec::new(),
        }
    }

    pub fn object(&self, id: ObjectId) -> &Object {
        self.objects.get(id)
    }

    pub fn ty(&self, id: TypeId) -> &Type {
        self.type_table.get(id)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        self.scope_table.get(id)
    }

    /// Type of an expression, or of the object an identifier denotes.
    pub fn type_of(&self, node: AstNode<'_>) -> Option<TypeId> {
        if let Some(tv) = self.types.get(&node.key()) {
            return Some(tv.ty);
        }
        self.object_of(node).map(|obj| self.object(obj).ty)
    }

    /// Object an identifier defines or uses.
    pub fn object_of(&self, node: AstNode<'_>) -> Option<ObjectId> {
        let key = node.key();
        self.defs
            .get(&key)
            .copied()
            .flatten()
            .or_else(|| self.uses.get(&key).copied())
    }

    /// The innermost scope recorded for `node` or one of its ancestors.
    pub fn scope_of(&self, node: AstNode<'_>) -> Option<ScopeId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(scope) = self.scopes.get(&n.key()) {
                return Some(*scope);
            }
            current = n.parent();
        }
        None
    }
}

/// The resolved unit.
#[derive(Debug, Clone)]
pub struct Package {
    /// Unit identity, normally the package directory.
    pub path: String,
    pub name: String,
    pub scope: ScopeId,
    pub universe: ScopeId,
    /// Imported packages in first import order.
    pub imports: Vec<ImportedPackage>,
}

impl Package {
    /// Package-level object declared under `name`.
    pub fn lookup(&self, info: &TypeInfo, name: &str) -> Option<ObjectId> {
        info.scope(self.scope).lookup(name)
    }
}
