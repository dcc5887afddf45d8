//! Lexical scopes.

use crate::types::ids::{ObjectId, ScopeId};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Universe,
    Package,
    File,
    Func,
    Block,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    names: BTreeMap<String, ObjectId>,
    /// A file scope with a dot-import of a package whose members are unknown.
    pub(crate) dot_opaque: Vec<usize>,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            names: BTreeMap::new(),
            dot_opaque: Vec::new(),
        }
    }

    /// Object declared under `name` in this scope only.
    pub fn lookup(&self, name: &str) -> Option<ObjectId> {
        self.names.get(name).copied()
    }

    /// Declared names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Owner for all scopes of one unit.
#[derive(Debug, Clone, Default)]
pub struct ScopeTable {
    scopes: Vec<Scope>,
}

impl ScopeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(kind, parent));
        if let Some(parent) = parent {
            self.scopes[parent.index()].children.push(id);
        }
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    /// Insert `obj` under `name`. Returns the already declared object and
    /// leaves the scope unchanged if the name is taken.
    pub fn insert(&mut self, scope: ScopeId, name: &str, obj: ObjectId) -> Option<ObjectId> {
        let names = &mut self.scopes[scope.index()].names;
        if let Some(existing) = names.get(name) {
            return Some(*existing);
        }
        names.insert(name.to_string(), obj);
        None
    }

    /// Resolve `name` starting at `scope` and walking outwards. Returns the
    /// scope it was found in as well.
    pub fn lookup_parent(&self, mut scope: ScopeId, name: &str) -> Option<(ScopeId, ObjectId)> {
        loop {
            let current = self.get(scope);
            if let Some(obj) = current.lookup(name) {
                return Some((scope, obj));
            }
            scope = current.parent?;
        }
    }

    /// The nearest enclosing scope of `kind`, `scope` included.
    pub fn enclosing(&self, mut scope: ScopeId, kind: ScopeKind) -> Option<ScopeId> {
        loop {
            let current = self.get(scope);
            if current.kind == kind {
                return Some(scope);
            }
            scope = current.parent?;
        }
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outwards_and_shadows() {
        let mut table = ScopeTable::new();
        let outer = table.alloc(ScopeKind::Package, None);
        let inner = table.alloc(ScopeKind::Block, Some(outer));

        assert_eq!(table.insert(outer, "x", ObjectId(1)), None);
        assert_eq!(table.lookup_parent(inner, "x"), Some((outer, ObjectId(1))));

        assert_eq!(table.insert(inner, "x", ObjectId(2)), None);
        assert_eq!(table.lookup_parent(inner, "x"), Some((inner, ObjectId(2))));
        assert_eq!(table.lookup_parent(inner, "y"), None);
        assert_eq!(table.get(outer).children, vec![inner]);
    }

    #[test]
    fn duplicate_insert_keeps_first() {
        let mut table = ScopeTable::new();
        let scope = table.alloc(ScopeKind::Block, None);
        table.insert(scope, "a", ObjectId(7));
        assert_eq!(table.insert(scope, "a", ObjectId(8)), Some(ObjectId(7)));
        assert_eq!(table.get(scope).lookup("a"), Some(ObjectId(7)));
    }
}
