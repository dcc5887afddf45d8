//! The resolver: one pass over every file of a unit.
//!
//! Checking runs in phases. All package-level names of every file are
//! collected first so that declaration order across files does not matter.
//! Package-level objects are then resolved lazily in source order, each on
//! first reference, which finds initialization and type cycles. Function
//! bodies are checked last, once every package-level signature is known.

mod call;
mod collect;
mod decl;
mod expr;
mod stmt;
mod typexpr;

use crate::config::CheckConfig;
use crate::error::{Diagnostic, ResolveError};
use crate::pos::{Pos, Position, PositionTable};
use crate::syntax::{AstFile, AstNode, FuncDecl, ImportSpec, TypeSpec};
use crate::types::constant::Value;
use crate::types::ids::{ObjectId, ScopeId, TypeId};
use crate::types::importer::{ImportError, ImportedPackage, Importer, MemberKind};
use crate::types::object::{Object, ObjectKind};
use crate::types::scope::ScopeKind;
use crate::types::selection::Selection;
use crate::types::ty::{Type, TypeTable};
use crate::types::universe::{self, Universe};
use crate::types::{Mode, Package, TypeAndValue, TypeInfo};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Resolve a whole unit.
///
/// `path` is the unit identity recorded in [`Package::path`]. The package
/// name is taken from the first file; every other file must agree.
pub fn check(
    path: &str,
    files: &[AstFile],
    positions: &PositionTable,
    config: &CheckConfig,
    importer: &dyn Importer,
) -> Result<(Package, TypeInfo), ResolveError> {
    let mut checker = Checker::new(files, positions, config, importer);
    checker.collect_objects();
    checker.package_objects();
    checker.function_bodies();
    checker.report_pending();
    checker.unused_imports();

    let diagnostics = checker.diagnostics();
    if !diagnostics.is_empty() {
        debug!(
            path,
            errors = diagnostics.len(),
            "resolution failed"
        );
        return Err(ResolveError { diagnostics });
    }

    let Checker {
        mut info,
        universe,
        pkg_scope,
        pkg_name,
        imports,
        ..
    } = checker;
    info.import_names = imports.iter().map(|i| i.name.clone()).collect();
    debug!(
        path,
        package = %pkg_name,
        objects = info.objects.len(),
        types = info.type_table.len(),
        "resolved package"
    );

    let package = Package {
        path: path.to_string(),
        name: pkg_name,
        scope: pkg_scope,
        universe: universe.scope,
        imports,
    };
    Ok((package, info))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclState {
    InProgress,
    Done,
}

/// What is needed to resolve one package-level object on demand.
#[derive(Debug, Clone)]
enum DeclInfo<'a> {
    Const {
        typ: Option<AstNode<'a>>,
        init: Option<AstNode<'a>>,
        iota: i128,
        file_scope: ScopeId,
    },
    Var {
        /// Every variable initialized by `init`; more than one for
        /// `var a, b = f()`.
        lhs: Vec<ObjectId>,
        typ: Option<AstNode<'a>>,
        init: Option<AstNode<'a>>,
        file_scope: ScopeId,
    },
    Type {
        spec: TypeSpec<'a>,
        file_scope: ScopeId,
    },
    Func {
        decl: FuncDecl<'a>,
        file_scope: ScopeId,
    },
}

impl DeclInfo<'_> {
    fn file_scope(&self) -> ScopeId {
        match self {
            DeclInfo::Const { file_scope, .. }
            | DeclInfo::Var { file_scope, .. }
            | DeclInfo::Type { file_scope, .. }
            | DeclInfo::Func { file_scope, .. } => *file_scope,
        }
    }
}

/// Lexical environment of the expression being checked.
#[derive(Debug, Clone, Copy)]
struct Env {
    scope: ScopeId,
    file_scope: ScopeId,
    /// Value of `iota` inside a constant declaration.
    iota: Option<i128>,
}

/// A function body waiting for the body pass.
#[derive(Debug, Clone, Copy)]
struct FuncBody<'a> {
    sig: TypeId,
    scope: ScopeId,
    block: AstNode<'a>,
    file_scope: ScopeId,
}

/// Per-function state while checking a body.
#[derive(Debug)]
struct FuncCtx {
    sig: TypeId,
    locals: Vec<ObjectId>,
    labels: HashMap<String, ObjectId>,
    used_labels: HashSet<ObjectId>,
    loops: usize,
    breakables: usize,
    /// Labels of the enclosing labeled statements, innermost last, with
    /// whether each labels a loop (`Some(true)`), a switch or select
    /// (`Some(false)`) or something else.
    label_targets: Vec<(String, Option<bool>)>,
    fallthrough_ok: bool,
}

impl FuncCtx {
    fn new(sig: TypeId) -> Self {
        Self {
            sig,
            locals: Vec::new(),
            labels: HashMap::new(),
            used_labels: HashSet::new(),
            loops: 0,
            breakables: 0,
            label_targets: Vec::new(),
            fallthrough_ok: false,
        }
    }
}

/// An import that must be used somewhere in its file.
#[derive(Debug, Clone, Copy)]
struct FileImport<'a> {
    obj: ObjectId,
    spec: ImportSpec<'a>,
}

/// The value of an expression as seen by the checker.
#[derive(Debug, Clone)]
struct Operand {
    mode: Mode,
    ty: TypeId,
    val: Option<Value>,
    /// The builtin denoted by a [`Mode::Builtin`] operand.
    builtin: Option<crate::types::object::Builtin>,
}

impl Operand {
    fn invalid() -> Self {
        Self::new(Mode::Invalid, TypeTable::invalid())
    }

    fn new(mode: Mode, ty: TypeId) -> Self {
        Self {
            mode,
            ty,
            val: None,
            builtin: None,
        }
    }

    fn constant(ty: TypeId, val: Value) -> Self {
        Self {
            mode: Mode::Constant,
            ty,
            val: Some(val),
            builtin: None,
        }
    }

    fn is_invalid(&self) -> bool {
        self.mode == Mode::Invalid
    }

    fn is_constant(&self) -> bool {
        self.mode == Mode::Constant
    }
}

pub(super) struct Checker<'a> {
    files: &'a [AstFile],
    positions: &'a PositionTable,
    config: &'a CheckConfig,
    importer: &'a dyn Importer,
    info: TypeInfo,
    universe: Universe,
    pkg_scope: ScopeId,
    pkg_name: String,
    imports: Vec<ImportedPackage>,
    import_index: HashMap<String, usize>,
    diagnostics: Vec<(Pos, String)>,
    decls: HashMap<ObjectId, DeclInfo<'a>>,
    /// Package-level objects in source order.
    order: Vec<ObjectId>,
    state: HashMap<ObjectId, DeclState>,
    /// Objects currently being resolved, innermost last.
    path: Vec<ObjectId>,
    reported_cycles: HashSet<ObjectId>,
    /// Defined types whose underlying type waits on another, with the
    /// node to report a cycle at.
    pending_underlying: Vec<(TypeId, TypeId, AstNode<'a>)>,
    /// Method declarations keyed by receiver base type name.
    methods: HashMap<String, Vec<ObjectId>>,
    method_decls: Vec<ObjectId>,
    attached: HashSet<ObjectId>,
    bodies: Vec<FuncBody<'a>>,
    used: HashSet<ObjectId>,
    file_imports: Vec<FileImport<'a>>,
    /// Objects standing for members of imported packages.
    members: HashMap<(usize, String), ObjectId>,
    env: Env,
    funcs: Vec<FuncCtx>,
}

impl<'a> Checker<'a> {
    fn new(
        files: &'a [AstFile],
        positions: &'a PositionTable,
        config: &'a CheckConfig,
        importer: &'a dyn Importer,
    ) -> Self {
        let mut info = TypeInfo::new();
        let universe = universe::build(&mut info);
        info.any = universe.any;
        let pkg_scope = info
            .scope_table
            .alloc(ScopeKind::Package, Some(universe.scope));
        let pkg_name = files
            .first()
            .map(|f| f.package_name().to_string())
            .unwrap_or_default();

        Self {
            files,
            positions,
            config,
            importer,
            info,
            universe,
            pkg_scope,
            pkg_name,
            imports: Vec::new(),
            import_index: HashMap::new(),
            diagnostics: Vec::new(),
            decls: HashMap::new(),
            order: Vec::new(),
            state: HashMap::new(),
            path: Vec::new(),
            reported_cycles: HashSet::new(),
            pending_underlying: Vec::new(),
            methods: HashMap::new(),
            method_decls: Vec::new(),
            attached: HashSet::new(),
            bodies: Vec::new(),
            used: HashSet::new(),
            file_imports: Vec::new(),
            members: HashMap::new(),
            env: Env {
                scope: pkg_scope,
                file_scope: pkg_scope,
                iota: None,
            },
            funcs: Vec::new(),
        }
    }

    /// Sorted, deduplicated diagnostics.
    fn diagnostics(&mut self) -> Vec<Diagnostic> {
        let mut raw = std::mem::take(&mut self.diagnostics);
        raw.sort_by_key(|(pos, _)| *pos);
        raw.dedup();
        raw.into_iter()
            .map(|(pos, message)| Diagnostic {
                position: self.positions.position(pos).unwrap_or_else(|| Position {
                    filename: String::new(),
                    offset: 0,
                    line: 0,
                    column: 0,
                }),
                message,
            })
            .collect()
    }

    fn error(&mut self, node: AstNode<'_>, message: impl Into<String>) {
        self.error_at(node.pos(), message);
    }

    fn error_at(&mut self, pos: Pos, message: impl Into<String>) {
        self.diagnostics.push((pos, message.into()));
    }

    // Recording.

    fn record_def(&mut self, ident: AstNode<'_>, obj: Option<ObjectId>) {
        self.info.defs.insert(ident.key(), obj);
    }

    fn record_use(&mut self, ident: AstNode<'_>, obj: ObjectId) {
        self.info.uses.insert(ident.key(), obj);
    }

    fn record_implicit(&mut self, node: AstNode<'_>, obj: ObjectId) {
        self.info.implicits.insert(node.key(), obj);
    }

    fn record_selection(&mut self, node: AstNode<'_>, selection: Selection) {
        self.info.selections.insert(node.key(), selection);
    }

    fn record_operand(&mut self, node: AstNode<'_>, x: &Operand) {
        if x.is_invalid() {
            return;
        }
        self.info.types.insert(
            node.key(),
            TypeAndValue {
                mode: x.mode,
                ty: x.ty,
                value: x.val.clone(),
            },
        );
    }

    fn record_type_expr(&mut self, node: AstNode<'_>, ty: TypeId) {
        self.info.types.insert(
            node.key(),
            TypeAndValue {
                mode: Mode::TypeExpr,
                ty,
                value: None,
            },
        );
    }

    // Objects and scopes.

    fn new_object(&mut self, name: &str, kind: ObjectKind, pos: Pos, ty: TypeId) -> ObjectId {
        self.info.objects.alloc(Object {
            name: name.to_string(),
            kind,
            pos,
            ty,
            parent: None,
            import: None,
        })
    }

    fn new_var(&mut self, ident: AstNode<'_>, ty: TypeId) -> ObjectId {
        self.new_object(
            ident.text(),
            ObjectKind::Var {
                field: false,
                embedded: false,
            },
            ident.pos(),
            ty,
        )
    }

    fn set_type(&mut self, obj: ObjectId, ty: TypeId) {
        self.info.objects.get_mut(obj).ty = ty;
    }

    fn obj_name(&self, obj: ObjectId) -> String {
        self.info.object(obj).name.clone()
    }

    /// Declare `obj` under the identifier's name in `scope`. Blank names are
    /// recorded as definitions but not declared.
    fn declare(&mut self, scope: ScopeId, ident: AstNode<'_>, obj: ObjectId) {
        self.record_def(ident, Some(obj));
        self.declare_name(scope, ident.text(), ident.pos(), obj);
    }

    fn declare_name(&mut self, scope: ScopeId, name: &str, pos: Pos, obj: ObjectId) {
        if name == "_" {
            return;
        }
        if self.info.scope_table.insert(scope, name, obj).is_some() {
            self.error_at(pos, format!("{name} redeclared in this block"));
            return;
        }
        self.info.objects.get_mut(obj).parent = Some(scope);
    }

    /// Open a block scope for `node` and make it current. Returns the scope
    /// to restore.
    fn open_scope(&mut self, node: AstNode<'_>, kind: ScopeKind) -> ScopeId {
        let outer = self.env.scope;
        let scope = self.info.scope_table.alloc(kind, Some(outer));
        self.info.scopes.insert(node.key(), scope);
        self.env.scope = scope;
        outer
    }

    fn close_scope(&mut self, outer: ScopeId) {
        self.env.scope = outer;
    }

    fn lookup(&self, name: &str) -> Option<ObjectId> {
        self.info
            .scope_table
            .lookup_parent(self.env.scope, name)
            .map(|(_, obj)| obj)
    }

    fn is_package_level(&self, obj: ObjectId) -> bool {
        self.decls.contains_key(&obj)
    }

    // Imports.

    fn import_package(&mut self, path: &str) -> Result<usize, ImportError> {
        if let Some(index) = self.import_index.get(path) {
            return Ok(*index);
        }
        let package = self.importer.import(path)?;
        let index = self.imports.len();
        self.info.import_names.push(package.name.clone());
        self.imports.push(package);
        self.import_index.insert(path.to_string(), index);
        Ok(index)
    }

    /// The object standing for member `name` of an imported package, or
    /// `None` when a stub package does not declare it.
    fn member_object(&mut self, import: usize, name: &str) -> Option<ObjectId> {
        if let Some(obj) = self.members.get(&(import, name.to_string())) {
            return Some(*obj);
        }
        let package = &self.imports[import];
        let qualified = format!("{}.{}", package.name, name);
        let kind = match &package.members {
            Some(members) => Some(members.kind_of(name)?),
            None => None,
        };

        let opaque = self.info.type_table.alloc(Type::Opaque {
            name: Some(qualified),
        });
        let (kind, ty) = match kind {
            Some(MemberKind::Type) => (ObjectKind::TypeName { alias: false }, opaque),
            Some(MemberKind::Func) => (ObjectKind::Func, TypeTable::OPAQUE),
            Some(MemberKind::Var) => (
                ObjectKind::Var {
                    field: false,
                    embedded: false,
                },
                TypeTable::OPAQUE,
            ),
            Some(MemberKind::Const) => (
                ObjectKind::Const {
                    value: Value::Unknown,
                },
                TypeTable::OPAQUE,
            ),
            None => (ObjectKind::Opaque, opaque),
        };
        let obj = self.info.objects.alloc(Object {
            name: name.to_string(),
            kind,
            pos: Pos::NONE,
            ty,
            parent: None,
            import: Some(import),
        });
        self.members.insert((import, name.to_string()), obj);
        Some(obj)
    }

    /// Resolve `name` through an opaque dot-import of the current file.
    fn dot_opaque_member(&mut self, name: &str) -> Option<ObjectId> {
        if !crate::types::object::is_exported(name) {
            return None;
        }
        let import = *self
            .info
            .scope(self.env.file_scope)
            .dot_opaque
            .first()?;
        self.mark_import_used(import);
        self.member_object(import, name)
    }

    fn mark_import_used(&mut self, import: usize) {
        let file_scope = self.env.file_scope;
        let used: Vec<ObjectId> = self
            .file_imports
            .iter()
            .filter(|fi| {
                matches!(self.info.object(fi.obj).kind, ObjectKind::PkgName { import: i } if i == import)
                    && self.info.object(fi.obj).parent == Some(file_scope)
            })
            .map(|fi| fi.obj)
            .collect();
        self.used.extend(used);
    }

    fn unused_imports(&mut self) {
        if !self.config.report_unused || self.config.ignore_func_bodies {
            return;
        }
        let imports = self.file_imports.clone();
        for FileImport { obj, spec } in imports {
            if self.used.contains(&obj) {
                continue;
            }
            let path = spec.path();
            let name = self.obj_name(obj);
            let declared = match self.info.object(obj).kind {
                ObjectKind::PkgName { import } => self.imports[import].name.clone(),
                _ => name.clone(),
            };
            let message = if spec.name().is_some() && name != declared {
                format!("{path:?} imported as {name} and not used")
            } else {
                format!("{path:?} imported and not used")
            };
            self.error(spec.node(), message);
        }
    }

    // Display.

    fn type_string(&self, ty: TypeId) -> String {
        self.info.type_string(ty)
    }

    /// Describe an operand the way Go diagnostics do, e.g.
    /// `x (variable of type int)`.
    fn describe(&self, node: AstNode<'_>, x: &Operand) -> String {
        let text = short_text(node.text());
        let ty = self.type_string(x.ty);
        match x.mode {
            Mode::Invalid => format!("{text} (invalid operand)"),
            Mode::NoValue => format!("{text} (no value)"),
            Mode::Builtin => format!("{text} (built-in)"),
            Mode::TypeExpr => format!("{text} (type)"),
            Mode::Constant if self.info.is_untyped(x.ty) => {
                let kind = ty.strip_prefix("untyped ").unwrap_or(&ty);
                match &x.val {
                    Some(v) if !v.is_unknown() && v.to_string() != text => {
                        format!("{text} (untyped {kind} constant {v})")
                    }
                    _ => format!("{text} (untyped {kind} constant)"),
                }
            }
            Mode::Constant => match &x.val {
                Some(v) if !v.is_unknown() && v.to_string() != text => {
                    format!("{text} (constant {v} of type {ty})")
                }
                _ => format!("{text} (constant of type {ty})"),
            },
            Mode::Variable => format!("{text} (variable of type {ty})"),
            Mode::MapIndex => format!("{text} (map index expression of type {ty})"),
            Mode::CommaOk => format!("{text} (comma, ok expression of type {ty})"),
            Mode::Value if self.info.is_untyped(x.ty) => format!("{text} ({ty} value)"),
            Mode::Value => format!("{text} (value of type {ty})"),
        }
    }
}

/// Expression text for diagnostics, collapsed to one line and shortened.
fn short_text(text: &str) -> String {
    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > 40 {
        let head: String = collapsed.chars().take(37).collect();
        format!("{head}...")
    } else {
        collapsed
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

#[cfg(test)]
mod tests;
