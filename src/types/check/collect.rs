//! Collection of package-level objects across all files.

use super::{Checker, DeclInfo, FileImport};
use crate::syntax::{AstNode, FuncDecl, GenDecl, ImportSpec, Spec, Token, TypeSpec, ValueSpec};
use crate::types::constant::Value;
use crate::types::ids::{ObjectId, ScopeId};
use crate::types::object::{is_exported, ObjectKind};
use crate::types::scope::ScopeKind;
use crate::types::ty::TypeTable;

/// One constant name with the spec entry that initializes it.
#[derive(Debug, Clone, Copy)]
pub(super) struct ConstEntry<'a> {
    pub name: AstNode<'a>,
    pub typ: Option<AstNode<'a>>,
    pub init: Option<AstNode<'a>>,
    pub iota: i128,
}

impl<'a> Checker<'a> {
    pub(super) fn collect_objects(&mut self) {
        let files = self.files;
        for file in files {
            let root = file.root();
            let file_scope = self
                .info
                .scope_table
                .alloc(ScopeKind::File, Some(self.pkg_scope));
            self.info.scopes.insert(root.key(), file_scope);

            if let Some(clause) = file.package_clause() {
                self.package_clause(clause);
            }
            for decl in file.decls() {
                self.collect_decl(decl, file_scope);
            }
        }
        self.import_conflicts();
    }

    fn package_clause(&mut self, clause: AstNode<'a>) {
        let Some(ident) = clause.children().into_iter().next() else {
            return;
        };
        self.record_def(ident, None);
        let name = ident.text();
        if name == "_" {
            self.error(ident, "invalid package name _");
        } else if name != self.pkg_name {
            let message = format!("package {name}; expected package {}", self.pkg_name);
            self.error(ident, message);
        }
    }

    fn collect_decl(&mut self, node: AstNode<'a>, file_scope: ScopeId) {
        if let Some(func) = FuncDecl::cast(node) {
            self.collect_func(func, file_scope);
            return;
        }
        let Some(decl) = GenDecl::cast(node) else {
            return;
        };
        match decl.tok() {
            Token::Import => {
                for spec in decl.specs() {
                    if let Spec::Import(spec) = spec {
                        self.collect_import(spec, file_scope);
                    }
                }
            }
            Token::Const => {
                for entry in self.const_entries(decl) {
                    let obj = self.new_object(
                        entry.name.text(),
                        ObjectKind::Const {
                            value: Value::Unknown,
                        },
                        entry.name.pos(),
                        TypeTable::invalid(),
                    );
                    self.declare_package(entry.name, obj);
                    self.decls.insert(
                        obj,
                        DeclInfo::Const {
                            typ: entry.typ,
                            init: entry.init,
                            iota: entry.iota,
                            file_scope,
                        },
                    );
                    self.order.push(obj);
                }
            }
            Token::Var => {
                for spec in decl.value_specs() {
                    self.collect_var_spec(spec, file_scope);
                }
            }
            Token::Type => {
                for spec in decl.specs() {
                    if let Spec::Type(spec) = spec {
                        self.collect_type(spec, file_scope);
                    }
                }
            }
        }
    }

    /// Expand a const group into one entry per name, applying implicit
    /// repetition of the last spec with values.
    pub(super) fn const_entries(&mut self, decl: GenDecl<'a>) -> Vec<ConstEntry<'a>> {
        let mut out = Vec::new();
        let mut last: Option<ValueSpec<'a>> = None;

        for (iota, spec) in decl.value_specs().into_iter().enumerate() {
            let source = if !spec.values().is_empty() {
                last = Some(spec);
                Some(spec)
            } else if spec.type_node().is_some() {
                None
            } else {
                last
            };
            let names = spec.name_nodes();
            let (typ, inits) = match source {
                Some(s) => (s.type_node(), s.values()),
                None => (spec.type_node(), Vec::new()),
            };

            if inits.len() < names.len() {
                let at = names.get(inits.len()).copied().unwrap_or(spec.node());
                self.error(at, "missing init expr for const declaration");
            } else if inits.len() > names.len() {
                let at = if source == Some(spec) {
                    inits[names.len()]
                } else {
                    spec.node()
                };
                self.error(at, "extra init expr");
            }

            for (i, name) in names.into_iter().enumerate() {
                out.push(ConstEntry {
                    name,
                    typ,
                    init: inits.get(i).copied(),
                    iota: iota as i128,
                });
            }
        }
        out
    }

    fn collect_var_spec(&mut self, spec: ValueSpec<'a>, file_scope: ScopeId) {
        let names = spec.name_nodes();
        let values = spec.values();
        let typ = spec.type_node();

        let objs: Vec<ObjectId> = names
            .iter()
            .map(|n| self.new_var(*n, TypeTable::invalid()))
            .collect();
        for (name, obj) in names.iter().zip(&objs) {
            self.declare_package(*name, *obj);
        }

        let shared = values.len() == 1 && names.len() > 1;
        if !values.is_empty() && !shared && values.len() != names.len() {
            let message = format!(
                "assignment mismatch: {} but {}",
                super::plural(names.len(), "variable"),
                super::plural(values.len(), "value")
            );
            self.error(spec.node(), message);
        }

        for (i, obj) in objs.iter().enumerate() {
            let (lhs, init) = if shared {
                (objs.clone(), values.first().copied())
            } else if values.len() == names.len() {
                (vec![*obj], Some(values[i]))
            } else {
                (vec![*obj], None)
            };
            self.decls.insert(
                *obj,
                DeclInfo::Var {
                    lhs,
                    typ,
                    init,
                    file_scope,
                },
            );
            self.order.push(*obj);
        }
    }

    fn collect_type(&mut self, spec: TypeSpec<'a>, file_scope: ScopeId) {
        let Some(name) = spec.name_node() else {
            return;
        };
        let obj = self.new_object(
            name.text(),
            ObjectKind::TypeName {
                alias: spec.is_alias(),
            },
            name.pos(),
            TypeTable::invalid(),
        );
        self.declare_package(name, obj);
        self.decls.insert(obj, DeclInfo::Type { spec, file_scope });
        self.order.push(obj);
    }

    fn collect_func(&mut self, func: FuncDecl<'a>, file_scope: ScopeId) {
        let Some(name_node) = func.name_node() else {
            return;
        };
        let name = func.name();
        let obj = self.new_object(name, ObjectKind::Func, name_node.pos(), TypeTable::invalid());
        self.decls.insert(obj, DeclInfo::Func { decl: func, file_scope });

        if func.is_method() {
            self.record_def(name_node, Some(obj));
            self.method_decls.push(obj);
            if let Some(base) = func.receiver_type_name() {
                self.methods.entry(base.to_string()).or_default().push(obj);
            }
            return;
        }

        let special = name == "init" || (name == "main" && self.pkg_name == "main");
        if special {
            if func.type_params().is_some() {
                self.error(name_node, format!("func {name} must have no type parameters"));
            }
            let has_params = func.params().is_some_and(|p| !p.children().is_empty());
            if has_params || func.result().is_some() {
                self.error(
                    name_node,
                    format!("func {name} must have no arguments and no return values"),
                );
            }
        }
        if name == "init" {
            if func.body().is_none() {
                self.error(name_node, "missing function body");
            }
            // init functions cannot be referred to.
            self.record_def(name_node, Some(obj));
        } else {
            self.declare_package(name_node, obj);
        }
        self.order.push(obj);
    }

    fn collect_import(&mut self, spec: ImportSpec<'a>, file_scope: ScopeId) {
        let path = spec.path();
        let at = spec.path_node().unwrap_or(spec.node());
        let import = match self.import_package(&path) {
            Ok(import) => import,
            Err(err) => {
                self.error(at, err.to_string());
                return;
            }
        };
        let declared_name = self.imports[import].name.clone();
        let name_node = spec.name_node();
        let local_name = match name_node {
            Some(n) if n.kind() == "package_identifier" => n.text().to_string(),
            _ => declared_name,
        };
        let pos = name_node.unwrap_or(at).pos();
        let obj = self.new_object(
            &local_name,
            ObjectKind::PkgName { import },
            pos,
            TypeTable::invalid(),
        );
        self.info.objects.get_mut(obj).import = Some(import);

        match name_node {
            Some(n) if n.kind() == "blank_identifier" => {
                self.record_def(n, Some(obj));
            }
            Some(n) if n.kind() == "dot" => {
                self.record_def(n, Some(obj));
                self.info.objects.get_mut(obj).parent = Some(file_scope);
                self.dot_import(import, file_scope, n.pos());
                self.file_imports.push(FileImport { obj, spec });
            }
            Some(n) => {
                self.declare(file_scope, n, obj);
                self.file_imports.push(FileImport { obj, spec });
            }
            None => {
                self.record_implicit(spec.node(), obj);
                self.declare_name(file_scope, &local_name, spec.node().pos(), obj);
                self.file_imports.push(FileImport { obj, spec });
            }
        }
    }

    fn dot_import(&mut self, import: usize, file_scope: ScopeId, pos: crate::pos::Pos) {
        let names: Vec<String> = match &self.imports[import].members {
            Some(members) => members
                .all()
                .into_iter()
                .map(|(name, _)| name.to_string())
                .filter(|name| is_exported(name))
                .collect(),
            None => {
                self.info
                    .scope_table
                    .get_mut(file_scope)
                    .dot_opaque
                    .push(import);
                return;
            }
        };
        for name in names {
            if let Some(member) = self.member_object(import, &name) {
                if self
                    .info
                    .scope_table
                    .insert(file_scope, &name, member)
                    .is_some()
                {
                    self.error_at(pos, format!("{name} redeclared in this block"));
                }
            }
        }
    }

    /// Declare a package-level object.
    fn declare_package(&mut self, ident: AstNode<'a>, obj: ObjectId) {
        let scope = self.pkg_scope;
        self.declare(scope, ident, obj);
    }

    /// A file-scope name may not also be declared at package level.
    fn import_conflicts(&mut self) {
        let files = self.files;
        for file in files {
            let Some(file_scope) = self.info.scopes.get(&file.root().key()).copied() else {
                continue;
            };
            let names: Vec<(String, ObjectId)> = self
                .info
                .scope(file_scope)
                .names()
                .filter_map(|n| Some((n.to_string(), self.info.scope(file_scope).lookup(n)?)))
                .collect();
            for (name, file_obj) in names {
                let Some(pkg_obj) = self.info.scope(self.pkg_scope).lookup(&name) else {
                    continue;
                };
                let import = match self.info.object(file_obj).import {
                    Some(import) => import,
                    None => continue,
                };
                let path = self.imports[import].path.clone();
                let pos = self.info.object(pkg_obj).pos;
                self.error_at(
                    pos,
                    format!("{name} already declared through import of package {path:?}"),
                );
            }
        }
    }
}
