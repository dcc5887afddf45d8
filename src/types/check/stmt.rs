//! Function bodies and statements.

use super::expr::unparen;
use super::{Checker, Env, FuncBody, FuncCtx, Operand};
use crate::pos::Pos;
use crate::syntax::{statements, AstNode, GenDecl, Spec, Token};
use crate::types::ids::{ObjectId, TypeId};
use crate::types::object::{Builtin, ObjectKind};
use crate::types::scope::ScopeKind;
use crate::types::ty::{BasicKind, ChanDir, Type, TypeTable};
use crate::types::Mode;
use crate::walk::{visit_subtree, Flow};
use std::collections::HashSet;

impl<'a> Checker<'a> {
    pub(super) fn func_body(&mut self, body: FuncBody<'a>) {
        let saved = self.env;
        self.env = Env {
            scope: body.scope,
            file_scope: body.file_scope,
            iota: None,
        };
        self.funcs.push(FuncCtx::new(body.sig));
        self.collect_labels(body.block);

        let stmts = statements(body.block);
        self.stmt_list(&stmts, false);

        let has_results = matches!(
            self.info.ty(body.sig),
            Type::Signature(sig) if !sig.results.is_empty()
        );
        if has_results && !self.is_terminating_list(&stmts, None) {
            self.error_at(Pos(body.block.end().0.saturating_sub(1)), "missing return");
        }

        if let Some(ctx) = self.funcs.pop() {
            if self.config.report_unused {
                for local in &ctx.locals {
                    if !self.used.contains(local) {
                        let object = self.info.object(*local);
                        let (pos, message) = (object.pos, format!("declared and not used: {}", object.name));
                        self.error_at(pos, message);
                    }
                }
                for (name, label) in &ctx.labels {
                    if !ctx.used_labels.contains(label) {
                        let pos = self.info.object(*label).pos;
                        self.error_at(pos, format!("label {name} defined and not used"));
                    }
                }
            }
        }
        self.env = saved;
    }

    /// Labels have function scope, so they are declared before the body is
    /// checked. Function literals have labels of their own.
    fn collect_labels(&mut self, block: AstNode<'a>) {
        let mut found = Vec::new();
        visit_subtree(block, &mut |node: AstNode<'a>| match node.kind() {
            "func_literal" => Flow::Prune,
            "labeled_statement" => {
                if let Some(label) = node.field("label") {
                    found.push(label);
                }
                Flow::Descend
            }
            _ => Flow::Descend,
        });

        for label in found {
            let name = label.text();
            let obj = self.new_object(name, ObjectKind::Label, label.pos(), TypeTable::invalid());
            self.record_def(label, Some(obj));
            let defined = self.funcs.last().is_some_and(|ctx| ctx.labels.contains_key(name));
            if defined {
                self.error(label, format!("label {name} already defined"));
                continue;
            }
            if let Some(ctx) = self.ctx() {
                ctx.labels.insert(name.to_string(), obj);
            }
        }
    }

    fn ctx(&mut self) -> Option<&mut FuncCtx> {
        self.funcs.last_mut()
    }

    /// Check a statement list. With `fallthrough`, the last statement may be
    /// a `fallthrough`.
    fn stmt_list(&mut self, stmts: &[AstNode<'a>], fallthrough: bool) {
        for (i, stmt) in stmts.iter().enumerate() {
            let last = i + 1 == stmts.len();
            if let Some(ctx) = self.ctx() {
                ctx.fallthrough_ok = fallthrough && last;
            }
            self.stmt(*stmt);
        }
    }

    fn block(&mut self, node: AstNode<'a>) {
        let outer = self.open_scope(node, ScopeKind::Block);
        let stmts = statements(node);
        self.stmt_list(&stmts, false);
        self.close_scope(outer);
    }

    fn stmt(&mut self, node: AstNode<'a>) {
        let fallthrough_ok = self
            .ctx()
            .map(|ctx| std::mem::take(&mut ctx.fallthrough_ok))
            .unwrap_or(false);

        match node.kind() {
            "empty_statement" => {}
            "expression_statement" => {
                if let Some(e) = node.children().first() {
                    self.expression_stmt(*e);
                }
            }
            "send_statement" => self.send(node),
            "inc_statement" | "dec_statement" => self.inc_dec(node),
            "assignment_statement" => self.assign_stmt(node),
            "short_var_declaration" => self.short_var_decl(node),
            "var_declaration" | "const_declaration" | "type_declaration" => self.local_decl(node),
            "return_statement" => self.return_stmt(node),
            "go_statement" | "defer_statement" => {
                let Some(e) = node.children().first().copied() else {
                    return;
                };
                let keyword = if node.kind() == "go_statement" { "go" } else { "defer" };
                if unparen(e).kind() != "call_expression" {
                    self.error(e, format!("expression in {keyword} must be function call"));
                }
                self.expr_any(e);
            }
            "block" => self.block(node),
            "if_statement" => self.if_stmt(node),
            "for_statement" => self.for_stmt(node),
            "expression_switch_statement" => self.switch_stmt(node),
            "type_switch_statement" => self.type_switch(node),
            "select_statement" => self.select_stmt(node),
            "labeled_statement" => {
                let label = node.field("label");
                let Some(inner) = node.children().into_iter().find(|c| Some(*c) != label) else {
                    return;
                };
                let target = match inner.kind() {
                    "for_statement" => Some(true),
                    "expression_switch_statement" | "type_switch_statement" | "select_statement" => {
                        Some(false)
                    }
                    _ => None,
                };
                let name = label.map(|l| l.text().to_string()).unwrap_or_default();
                if let Some(ctx) = self.ctx() {
                    ctx.label_targets.push((name, target));
                    ctx.fallthrough_ok = fallthrough_ok;
                }
                self.stmt(inner);
                if let Some(ctx) = self.ctx() {
                    ctx.label_targets.pop();
                }
            }
            "break_statement" | "continue_statement" => self.branch(node),
            "goto_statement" => {
                if let Some(label) = node.children().first().copied() {
                    self.use_label(label);
                }
            }
            "fallthrough_statement" => {
                if !fallthrough_ok {
                    self.error(node, "fallthrough statement out of place");
                }
            }
            kind => self.error(node, format!("unexpected {kind}")),
        }
    }

    fn expression_stmt(&mut self, e: AstNode<'a>) {
        let x = self.expr_any(e);
        if matches!(x.mode, Mode::Invalid | Mode::NoValue) {
            return;
        }
        let inner = unparen(e);
        let is_receive = inner.kind() == "unary_expression"
            && inner.field("operator").is_some_and(|op| op.kind() == "<-");
        if inner.kind() == "call_expression" || is_receive {
            return;
        }
        let message = format!("{} is not used", self.describe(e, &x));
        self.error(e, message);
    }

    fn send(&mut self, node: AstNode<'a>) {
        let (Some(channel), Some(value)) = (node.field("channel"), node.field("value")) else {
            return;
        };
        let ch = self.expr(channel);
        let mut v = self.expr(value);
        if ch.is_invalid() || v.is_invalid() {
            return;
        }
        match self.info.ty(self.info.under(ch.ty)).clone() {
            Type::Chan { dir: ChanDir::Recv, .. } => {
                let message = format!(
                    "invalid operation: cannot send to receive-only channel {}",
                    self.describe(channel, &ch)
                );
                self.error(node, message);
            }
            Type::Chan { elem, .. } => self.assignment(value, &mut v, elem, "send"),
            _ if self.info.is_permissive(ch.ty) => {}
            _ => {
                let message = format!(
                    "invalid operation: cannot send to non-channel {}",
                    self.describe(channel, &ch)
                );
                self.error(node, message);
            }
        }
    }

    fn inc_dec(&mut self, node: AstNode<'a>) {
        let Some(e) = node.children().first().copied() else {
            return;
        };
        let x = self.lhs_expr(e);
        if x.is_invalid() {
            return;
        }
        let numeric = self.info.is_permissive(x.ty)
            || self.info.basic_kind(x.ty).is_some_and(|k| k.is_numeric());
        if !numeric {
            let op = if node.kind() == "inc_statement" { "++" } else { "--" };
            let message = format!(
                "invalid operation: {}{op} (non-numeric type {})",
                super::short_text(e.text()),
                self.type_string(x.ty)
            );
            self.error(node, message);
            return;
        }
        self.assignable_target(e, &x);
    }

    /// Evaluate the target of an assignment. Assigning to a local variable
    /// does not count as using it.
    fn lhs_expr(&mut self, node: AstNode<'a>) -> Operand {
        let ident = unparen(node);
        if ident.kind() != "identifier" || ident.text() == "_" {
            return self.expr(node);
        }
        let Some(obj) = self.lookup(ident.text()) else {
            return self.expr(node);
        };
        if !self.info.object(obj).is_var() || self.is_package_level(obj) {
            return self.expr(node);
        }
        self.record_use(ident, obj);
        let x = Operand::new(Mode::Variable, self.info.object(obj).ty);
        self.record_operand(ident, &x);
        if ident != node {
            self.record_operand(node, &x);
        }
        x
    }

    /// Report targets that can not be assigned to.
    fn assignable_target(&mut self, node: AstNode<'a>, x: &Operand) -> bool {
        if matches!(x.mode, Mode::Variable | Mode::MapIndex) || self.info.is_permissive(x.ty) {
            return true;
        }
        let message = format!(
            "cannot assign to {} (neither addressable nor a map index expression)",
            self.describe(node, x)
        );
        self.error(node, message);
        false
    }

    /// The type a value assigned to `node` must have; `None` for the blank
    /// identifier.
    fn lhs_var(&mut self, node: AstNode<'a>) -> Option<TypeId> {
        if node.kind() == "identifier" && node.text() == "_" {
            self.record_def(node, None);
            return None;
        }
        let x = self.lhs_expr(node);
        if x.is_invalid() || !self.assignable_target(node, &x) {
            return Some(TypeTable::invalid());
        }
        Some(x.ty)
    }

    fn assign_stmt(&mut self, node: AstNode<'a>) {
        let lhs = node.field("left").map(|l| l.children()).unwrap_or_default();
        let rhs = node.field("right").map(|r| r.children()).unwrap_or_default();
        let op = node.field("operator").map(|o| o.kind()).unwrap_or("=");

        if op != "=" {
            let (Some(l), Some(r)) = (lhs.first().copied(), rhs.first().copied()) else {
                return;
            };
            if lhs.len() != 1 || rhs.len() != 1 {
                self.error(node, format!("assignment operation {op} requires single-valued expressions"));
                return;
            }
            let x = self.lhs_expr(l);
            let y = self.expr(r);
            let binary = op.trim_end_matches('=');
            let result = self.binary_op(node, binary, (l, x.clone()), (r, y));
            if !result.is_invalid() {
                self.assignable_target(l, &x);
            }
            return;
        }

        if lhs.len() == rhs.len() {
            for (l, r) in lhs.iter().zip(&rhs) {
                let target = self.lhs_var(*l);
                let mut x = self.expr(*r);
                match target {
                    Some(t) => self.assignment(*r, &mut x, t, "assignment"),
                    None => {
                        self.var_type(*r, &mut x, None, "assignment");
                    }
                }
            }
            return;
        }
        if let [r] = rhs.as_slice() {
            let targets: Vec<Option<TypeId>> = lhs.iter().map(|l| self.lhs_var(*l)).collect();
            let types = self.multi_value(*r, lhs.len());
            for (target, ty) in targets.into_iter().zip(types) {
                if let Some(t) = target {
                    self.check_assignable_type(*r, ty, t, "assignment");
                }
            }
            return;
        }
        let message = format!(
            "assignment mismatch: {} but {}",
            super::plural(lhs.len(), "variable"),
            super::plural(rhs.len(), "value")
        );
        self.error(node, message);
        for l in &lhs {
            self.lhs_var(*l);
        }
        self.use_exprs(&rhs);
    }

    fn short_var_decl(&mut self, node: AstNode<'a>) {
        let lhs = node.field("left").map(|l| l.children()).unwrap_or_default();
        let rhs = node.field("right").map(|r| r.children()).unwrap_or_default();
        let targets = self.short_var_targets(node, &lhs);
        self.define_vars(node, &lhs, &targets, &rhs);
    }

    /// Resolve the left side of `:=`: existing variables of the current
    /// scope are reused, other names get new variables.
    fn short_var_targets(&mut self, node: AstNode<'a>, lhs: &[AstNode<'a>]) -> Vec<(ObjectId, bool)> {
        let scope = self.env.scope;
        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        let mut any_new = false;
        for ident in lhs {
            if ident.kind() != "identifier" {
                let message = format!("non-name {} on left side of :=", super::short_text(ident.text()));
                self.error(*ident, message);
                let obj = self.new_var(*ident, TypeTable::invalid());
                targets.push((obj, false));
                continue;
            }
            let name = ident.text();
            if name != "_" && !seen.insert(name) {
                self.error(*ident, format!("{name} repeated on left side of :="));
            }
            let existing = (name != "_")
                .then(|| self.info.scope(scope).lookup(name))
                .flatten()
                .filter(|obj| self.info.object(*obj).is_var());
            match existing {
                Some(obj) => {
                    self.record_use(*ident, obj);
                    targets.push((obj, false));
                }
                None => {
                    let obj = self.new_var(*ident, TypeTable::invalid());
                    any_new |= name != "_";
                    targets.push((obj, true));
                }
            }
        }
        let all_blank = lhs.iter().all(|l| l.text() == "_");
        if !any_new && !all_blank {
            self.error(node, "no new variables on left side of :=");
        }
        targets
    }

    /// Give the targets of `:=` their types from `rhs`, then declare the new
    /// ones.
    fn define_vars(
        &mut self,
        node: AstNode<'a>,
        lhs: &[AstNode<'a>],
        targets: &[(ObjectId, bool)],
        rhs: &[AstNode<'a>],
    ) {
        if lhs.len() == rhs.len() {
            for ((obj, new), r) in targets.iter().zip(rhs) {
                let mut x = self.expr(*r);
                if *new {
                    let ty = self.var_type(*r, &mut x, None, "assignment");
                    self.set_type(*obj, ty);
                } else {
                    let ty = self.info.object(*obj).ty;
                    self.assignment(*r, &mut x, ty, "assignment");
                }
            }
        } else if let [r] = rhs {
            let types = self.multi_value(*r, lhs.len());
            for ((obj, new), ty) in targets.iter().zip(types) {
                if *new {
                    let ty = self.default_type(ty);
                    self.set_type(*obj, ty);
                } else {
                    let target = self.info.object(*obj).ty;
                    self.check_assignable_type(*r, ty, target, "assignment");
                }
            }
        } else {
            let message = format!(
                "assignment mismatch: {} but {}",
                super::plural(lhs.len(), "variable"),
                super::plural(rhs.len(), "value")
            );
            self.error(node, message);
            self.use_exprs(rhs);
        }
        self.declare_locals(lhs, targets);
    }

    fn declare_locals(&mut self, idents: &[AstNode<'a>], targets: &[(ObjectId, bool)]) {
        let scope = self.env.scope;
        for (ident, (obj, new)) in idents.iter().zip(targets) {
            if !*new {
                continue;
            }
            self.declare(scope, *ident, *obj);
            if ident.text() != "_" {
                if let Some(ctx) = self.ctx() {
                    ctx.locals.push(*obj);
                }
            }
        }
    }

    fn local_decl(&mut self, node: AstNode<'a>) {
        let Some(decl) = GenDecl::cast(node) else {
            return;
        };
        let scope = self.env.scope;
        match decl.tok() {
            Token::Var => {
                for spec in decl.value_specs() {
                    let names = spec.name_nodes();
                    let values = spec.values();
                    let shared = values.len() == 1 && names.len() > 1;
                    if !values.is_empty() && !shared && values.len() != names.len() {
                        let message = format!(
                            "assignment mismatch: {} but {}",
                            super::plural(names.len(), "variable"),
                            super::plural(values.len(), "value")
                        );
                        self.error(spec.node(), message);
                    }
                    let objs: Vec<ObjectId> = names
                        .iter()
                        .map(|n| self.new_var(*n, TypeTable::invalid()))
                        .collect();
                    self.init_vars(&objs, spec.type_node(), &values, Some((scope, names.as_slice())));
                    for (name, obj) in names.iter().zip(&objs) {
                        if name.text() != "_" {
                            if let Some(ctx) = self.ctx() {
                                ctx.locals.push(*obj);
                            }
                        }
                    }
                }
            }
            Token::Const => {
                for entry in self.const_entries(decl) {
                    let obj = self.new_object(
                        entry.name.text(),
                        ObjectKind::Const {
                            value: crate::types::constant::Value::Unknown,
                        },
                        entry.name.pos(),
                        TypeTable::invalid(),
                    );
                    let saved = self.env.iota;
                    self.env.iota = Some(entry.iota);
                    self.const_decl(obj, entry.typ, entry.init);
                    self.env.iota = saved;
                    self.declare(scope, entry.name, obj);
                }
            }
            Token::Type => {
                for spec in decl.specs() {
                    let Spec::Type(spec) = spec else {
                        continue;
                    };
                    let Some(name) = spec.name_node() else {
                        continue;
                    };
                    let obj = self.new_object(
                        name.text(),
                        ObjectKind::TypeName {
                            alias: spec.is_alias(),
                        },
                        name.pos(),
                        TypeTable::invalid(),
                    );
                    self.declare(scope, name, obj);
                    self.type_decl(obj, spec);
                }
            }
            Token::Import => {}
        }
    }

    /// `case nil:` in a type switch. The grammar reads `nil` there as a
    /// type name, so it is nil only while the universe `nil` is in scope.
    fn case_nil(&mut self, t: AstNode<'a>) -> bool {
        match t.kind() {
            "nil" => true,
            "type_identifier" if t.text() == "nil" => {
                let Some(obj) = self.lookup("nil") else {
                    return false;
                };
                if !matches!(self.info.object(obj).kind, ObjectKind::Nil) {
                    return false;
                }
                self.record_use(t, obj);
                true
            }
            _ => false,
        }
    }

    fn return_stmt(&mut self, node: AstNode<'a>) {
        let Some(sig) = self.funcs.last().map(|ctx| ctx.sig) else {
            return;
        };
        let results: Vec<TypeId> = match self.info.ty(sig) {
            Type::Signature(s) => s.results.iter().map(|r| self.info.object(*r).ty).collect(),
            _ => Vec::new(),
        };
        let exprs = node
            .children()
            .first()
            .map(|list| list.children())
            .unwrap_or_default();

        if exprs.is_empty() {
            if !results.is_empty() && !self.named_results(sig) {
                self.error(node, "not enough return values");
            }
            return;
        }
        if results.is_empty() {
            self.error(exprs[0], "too many return values");
            self.use_exprs(&exprs);
            return;
        }

        if let [only] = exprs.as_slice() {
            if results.len() > 1 {
                let x = self.expr_multi(*only);
                if x.is_invalid() {
                    return;
                }
                match self.info.ty(x.ty).clone() {
                    Type::Tuple(items) if items.len() == results.len() => {
                        for (item, target) in items.into_iter().zip(results) {
                            self.check_assignable_type(*only, item, target, "return statement");
                        }
                    }
                    Type::Tuple(items) if items.len() > results.len() => {
                        self.error(*only, "too many return values");
                    }
                    _ if self.opaque_call(*only, &x) => {}
                    _ => self.error(node, "not enough return values"),
                }
                return;
            }
        }

        if exprs.len() < results.len() {
            self.error(node, "not enough return values");
            self.use_exprs(&exprs);
            return;
        }
        if exprs.len() > results.len() {
            self.error(exprs[results.len()], "too many return values");
            self.use_exprs(&exprs);
            return;
        }
        for (e, target) in exprs.iter().zip(results) {
            let mut x = self.expr(*e);
            self.assignment(*e, &mut x, target, "return statement");
        }
    }

    fn simple_stmt(&mut self, node: Option<AstNode<'a>>) {
        if let Some(node) = node {
            self.stmt(node);
        }
    }

    fn condition(&mut self, node: AstNode<'a>, statement: &str) {
        let x = self.expr(node);
        if x.is_invalid() {
            return;
        }
        let boolean = self.info.is_permissive(x.ty)
            || self.info.basic_kind(x.ty).is_some_and(|k| k.is_boolean());
        if !boolean {
            let message = format!(
                "non-boolean condition in {statement} statement"
            );
            self.error(node, message);
        }
    }

    fn if_stmt(&mut self, node: AstNode<'a>) {
        let outer = self.open_scope(node, ScopeKind::Block);
        self.simple_stmt(node.field("initializer"));
        if let Some(cond) = node.field("condition") {
            self.condition(cond, "if");
        }
        if let Some(block) = node.field("consequence") {
            self.block(block);
        }
        if let Some(alt) = node.field("alternative") {
            self.stmt(alt);
        }
        self.close_scope(outer);
    }

    fn enter_breakable(&mut self, is_loop: bool) {
        if let Some(ctx) = self.ctx() {
            ctx.breakables += 1;
            if is_loop {
                ctx.loops += 1;
            }
        }
    }

    fn leave_breakable(&mut self, is_loop: bool) {
        if let Some(ctx) = self.ctx() {
            ctx.breakables -= 1;
            if is_loop {
                ctx.loops -= 1;
            }
        }
    }

    fn for_stmt(&mut self, node: AstNode<'a>) {
        let outer = self.open_scope(node, ScopeKind::Block);
        let body = node.field("body");
        for child in node.children() {
            if Some(child) == body {
                continue;
            }
            match child.kind() {
                "for_clause" => {
                    self.simple_stmt(child.field("initializer"));
                    if let Some(cond) = child.field("condition") {
                        self.condition(cond, "for");
                    }
                    self.simple_stmt(child.field("update"));
                }
                "range_clause" => self.range_clause(child),
                _ => self.condition(child, "for"),
            }
        }
        self.enter_breakable(true);
        if let Some(body) = body {
            self.block(body);
        }
        self.leave_breakable(true);
        self.close_scope(outer);
    }

    fn range_clause(&mut self, node: AstNode<'a>) {
        let Some(right) = node.field("right") else {
            return;
        };
        let lhs = node.field("left").map(|l| l.children()).unwrap_or_default();
        let x = self.expr(right);

        let (key, value) = if x.is_invalid() {
            (Some(TypeTable::invalid()), Some(TypeTable::invalid()))
        } else {
            match self.range_types(&x) {
                Some(types) => types,
                None => {
                    let message = format!("cannot range over {}", self.describe(right, &x));
                    self.error(right, message);
                    (Some(TypeTable::invalid()), Some(TypeTable::invalid()))
                }
            }
        };

        if lhs.len() > 2 {
            self.error(lhs[2], "range clause permits at most two iteration variables");
        }
        let available = usize::from(key.is_some()) + usize::from(value.is_some());
        if lhs.len() > available && lhs.len() <= 2 && !x.is_invalid() {
            let message = format!(
                "range over {} permits only {} iteration variable{}",
                self.describe(right, &x),
                available,
                if available == 1 { "" } else { "s" }
            );
            self.error(lhs[available], message);
        }
        let types = [key, value];

        if node.has_token(":=") {
            let mut targets = Vec::new();
            for (i, ident) in lhs.iter().enumerate() {
                let ty = types.get(i).copied().flatten().unwrap_or(TypeTable::invalid());
                if ident.kind() != "identifier" {
                    let message = format!("non-name {} on left side of :=", super::short_text(ident.text()));
                    self.error(*ident, message);
                }
                targets.push((self.new_var(*ident, ty), ident.kind() == "identifier"));
            }
            self.declare_locals(&lhs, &targets);
            return;
        }
        for (i, l) in lhs.iter().enumerate() {
            let ty = types.get(i).copied().flatten().unwrap_or(TypeTable::invalid());
            if let Some(target) = self.lhs_var(*l) {
                self.check_assignable_type(right, ty, target, "range");
            }
        }
    }

    /// Key and value types of a range expression; `None` for a missing
    /// iteration value, or overall when `x` can not be ranged over.
    fn range_types(&self, x: &Operand) -> Option<(Option<TypeId>, Option<TypeId>)> {
        let int = TypeTable::basic(BasicKind::Int);
        let under = self.info.under(x.ty);
        let types = match self.info.ty(under) {
            Type::Basic(kind) if kind.is_string() => {
                (Some(int), Some(TypeTable::basic(BasicKind::Int32)))
            }
            Type::Basic(kind) if kind.is_integer() => {
                let ty = if kind.is_untyped() { int } else { x.ty };
                (Some(ty), None)
            }
            Type::Array { elem, .. } | Type::Slice(elem) => (Some(int), Some(*elem)),
            Type::Pointer(base) => match self.info.ty(self.info.under(*base)) {
                Type::Array { elem, .. } => (Some(int), Some(*elem)),
                _ => return None,
            },
            Type::Map { key, value } => (Some(*key), Some(*value)),
            Type::Chan { dir, elem } if *dir != ChanDir::Send => (Some(*elem), None),
            Type::Signature(sig) => self.range_func(sig)?,
            _ if self.info.is_permissive(x.ty) => (Some(TypeTable::OPAQUE), Some(TypeTable::OPAQUE)),
            _ => return None,
        };
        Some(types)
    }

    /// Iterator functions: `func(yield func(K, V) bool)`.
    fn range_func(
        &self,
        sig: &crate::types::ty::Signature,
    ) -> Option<(Option<TypeId>, Option<TypeId>)> {
        let [param] = sig.params.as_slice() else {
            return None;
        };
        if !sig.results.is_empty() {
            return None;
        }
        let Type::Signature(yield_sig) = self.info.ty(self.info.under(self.info.object(*param).ty)) else {
            return None;
        };
        let returns_bool = match yield_sig.results.as_slice() {
            [r] => self.info.basic_kind(self.info.object(*r).ty) == Some(BasicKind::Bool),
            _ => false,
        };
        if !returns_bool || yield_sig.params.len() > 2 {
            return None;
        }
        let mut types = yield_sig.params.iter().map(|p| self.info.object(*p).ty);
        Some((types.next(), types.next()))
    }

    fn switch_stmt(&mut self, node: AstNode<'a>) {
        let outer = self.open_scope(node, ScopeKind::Block);
        self.simple_stmt(node.field("initializer"));

        let tag = node.field("value").map(|value| {
            let mut x = self.expr(value);
            if !x.is_invalid() {
                let ty = self.var_type(value, &mut x, None, "switch expression");
                x.ty = ty;
                if ty != TypeTable::invalid() && !self.info.comparable(ty) && !self.info.is_permissive(ty) {
                    let message = format!(
                        "cannot switch on {}",
                        self.describe(value, &x)
                    );
                    self.error(value, message);
                    x = Operand::invalid();
                }
            }
            (value, x)
        });

        self.enter_breakable(false);
        let clauses: Vec<AstNode<'a>> = node
            .children()
            .into_iter()
            .filter(|c| matches!(c.kind(), "expression_case" | "default_case"))
            .collect();
        self.check_defaults(&clauses, "switch");
        let mut seen: Vec<(crate::types::constant::Value, TypeId)> = Vec::new();

        for (i, clause) in clauses.iter().enumerate() {
            let clause_outer = self.open_scope(*clause, ScopeKind::Block);
            let values = clause.field("value").map(|v| v.children()).unwrap_or_default();
            for value in values {
                self.case_value(value, tag.as_ref(), &mut seen);
            }
            let last_clause = i + 1 == clauses.len();
            let stmts = statements(*clause);
            self.stmt_list(&stmts, !last_clause);
            self.close_scope(clause_outer);
        }
        self.leave_breakable(false);
        self.close_scope(outer);
    }

    fn check_defaults(&mut self, clauses: &[AstNode<'a>], statement: &str) {
        let defaults: Vec<&AstNode<'a>> = clauses.iter().filter(|c| c.kind() == "default_case").collect();
        if let Some(second) = defaults.get(1) {
            self.error(**second, format!("multiple defaults in {statement}"));
        }
    }

    fn case_value(
        &mut self,
        value: AstNode<'a>,
        tag: Option<&(AstNode<'a>, Operand)>,
        seen: &mut Vec<(crate::types::constant::Value, TypeId)>,
    ) {
        let mut y = self.expr(value);
        if y.is_invalid() {
            return;
        }
        let Some((tag_node, tag)) = tag else {
            let boolean = self.info.is_permissive(y.ty)
                || self.info.basic_kind(y.ty).is_some_and(|k| k.is_boolean());
            if !boolean {
                let message = format!(
                    "invalid case {} in switch (mismatched types {} and bool)",
                    super::short_text(value.text()),
                    self.type_string(y.ty)
                );
                self.error(value, message);
            }
            return;
        };
        if tag.is_invalid() {
            return;
        }
        let mut x = tag.clone();
        let compatible = self.match_types(&mut y, &mut x)
            && (self.info.assignable(y.ty, x.ty).is_ok() || self.info.assignable(x.ty, y.ty).is_ok());
        if !compatible {
            let message = format!(
                "invalid case {} in switch on {} (mismatched types {} and {})",
                super::short_text(value.text()),
                super::short_text(tag_node.text()),
                self.type_string(y.ty),
                self.type_string(tag.ty)
            );
            self.error(value, message);
            return;
        }
        self.record_operand(value, &y);
        if let (true, Some(v)) = (y.is_constant(), y.val.clone()) {
            if v.is_unknown() {
                return;
            }
            if seen.iter().any(|(s, t)| *s == v && self.info.identical(*t, y.ty)) {
                let message = format!("duplicate case {} in expression switch", super::short_text(value.text()));
                self.error(value, message);
                return;
            }
            seen.push((v, y.ty));
        }
    }

    fn type_switch(&mut self, node: AstNode<'a>) {
        let outer = self.open_scope(node, ScopeKind::Block);
        self.simple_stmt(node.field("initializer"));

        let alias = node
            .field("alias")
            .and_then(|list| list.children().first().copied());
        if let Some(ident) = alias {
            self.record_def(ident, None);
            if ident.text() == "_" {
                self.error(ident, "no new variable on left side of :=");
            }
        }

        let mut x = match node.field("value") {
            Some(value) => {
                let x = self.expr(value);
                if !x.is_invalid() && !self.info.is_interface(x.ty) && !self.info.is_permissive(x.ty) {
                    let message = format!("{} is not an interface", self.describe(value, &x));
                    self.error(value, message);
                    Operand::invalid()
                } else {
                    x
                }
            }
            None => Operand::invalid(),
        };
        if x.is_invalid() {
            x.ty = TypeTable::invalid();
        }

        self.enter_breakable(false);
        let clauses: Vec<AstNode<'a>> = node
            .children()
            .into_iter()
            .filter(|c| matches!(c.kind(), "type_case" | "default_case"))
            .collect();
        self.check_defaults(&clauses, "type switch");

        let mut seen: Vec<TypeId> = Vec::new();
        let mut clause_vars = Vec::new();
        for clause in &clauses {
            let clause_outer = self.open_scope(*clause, ScopeKind::Block);
            let mut case_types = Vec::new();
            for t in clause.fields("type") {
                let ty = if self.case_nil(t) {
                    let nil = TypeTable::basic(BasicKind::UntypedNil);
                    self.record_operand(t, &Operand::new(Mode::Value, nil));
                    nil
                } else {
                    let ty = self.type_expr(t);
                    if ty != TypeTable::invalid() && !x.is_invalid() {
                        self.impossible_assertion(t, ty, x.ty, "type switch case");
                    }
                    ty
                };
                if ty != TypeTable::invalid() {
                    if seen.iter().any(|s| self.info.identical(*s, ty)) {
                        let message = format!("duplicate case {} in type switch", super::short_text(t.text()));
                        self.error(t, message);
                    } else {
                        seen.push(ty);
                    }
                }
                case_types.push(ty);
            }

            if let Some(ident) = alias.filter(|i| i.text() != "_") {
                let ty = match case_types.as_slice() {
                    [only] if *only != TypeTable::basic(BasicKind::UntypedNil) => *only,
                    _ => x.ty,
                };
                let obj = self.new_var(ident, ty);
                let scope = self.env.scope;
                self.declare_name(scope, ident.text(), ident.pos(), obj);
                self.record_implicit(*clause, obj);
                clause_vars.push(obj);
            }
            let stmts = statements(*clause);
            self.stmt_list(&stmts, false);
            self.close_scope(clause_outer);
        }
        self.leave_breakable(false);

        if let Some(ident) = alias.filter(|i| i.text() != "_") {
            let used = clause_vars.iter().any(|v| self.used.contains(v));
            if self.config.report_unused && !used {
                self.error(ident, format!("declared and not used: {}", ident.text()));
            }
        }
        self.close_scope(outer);
    }

    fn select_stmt(&mut self, node: AstNode<'a>) {
        self.enter_breakable(false);
        let clauses: Vec<AstNode<'a>> = node
            .children()
            .into_iter()
            .filter(|c| matches!(c.kind(), "communication_case" | "default_case"))
            .collect();
        self.check_defaults(&clauses, "select");

        for clause in clauses {
            let outer = self.open_scope(clause, ScopeKind::Block);
            if let Some(comm) = clause.field("communication") {
                match comm.kind() {
                    "send_statement" => self.send(comm),
                    _ => self.receive_case(comm),
                }
            }
            let stmts = statements(clause);
            self.stmt_list(&stmts, false);
            self.close_scope(outer);
        }
        self.leave_breakable(false);
    }

    /// `case v, ok := <-ch:` and its assignment and expression forms.
    fn receive_case(&mut self, comm: AstNode<'a>) {
        let Some(right) = comm.field("right") else {
            return;
        };
        let inner = unparen(right);
        let is_receive = inner.kind() == "unary_expression"
            && inner.field("operator").is_some_and(|op| op.kind() == "<-");
        if !is_receive {
            self.error(right, "select case must be receive, send or assign recv");
        }
        let lhs = comm.field("left").map(|l| l.children()).unwrap_or_default();
        if lhs.is_empty() {
            self.expr_multi(right);
            return;
        }
        if lhs.len() > 2 {
            let message = format!(
                "assignment mismatch: {} but {} returns 2 values",
                super::plural(lhs.len(), "variable"),
                super::short_text(right.text())
            );
            self.error(comm, message);
        }
        if comm.has_token(":=") {
            let targets = self.short_var_targets(comm, &lhs);
            self.define_vars(comm, &lhs, &targets, &[right]);
            return;
        }
        let targets: Vec<Option<TypeId>> = lhs.iter().map(|l| self.lhs_var(*l)).collect();
        let types = self.multi_value(right, lhs.len());
        for (target, ty) in targets.into_iter().zip(types) {
            if let Some(t) = target {
                self.check_assignable_type(right, ty, t, "assignment");
            }
        }
    }

    fn branch(&mut self, node: AstNode<'a>) {
        let is_break = node.kind() == "break_statement";
        let keyword = if is_break { "break" } else { "continue" };
        let Some(ctx) = self.funcs.last() else {
            return;
        };

        if let Some(label) = node.children().first().copied() {
            let name = label.text();
            let target = ctx
                .label_targets
                .iter()
                .rev()
                .find(|(n, _)| n == name)
                .map(|(_, t)| *t);
            let defined = ctx.labels.contains_key(name);
            let valid = match target {
                Some(Some(true)) => true,
                Some(Some(false)) => is_break,
                _ => false,
            };
            if defined {
                self.use_label(label);
            }
            if !defined {
                self.error(label, format!("{keyword} label not defined: {name}"));
            } else if !valid {
                self.error(label, format!("invalid {keyword} label {name}"));
            }
            return;
        }

        if is_break && ctx.breakables == 0 {
            self.error(node, "break is not in a loop, switch, or select");
        } else if !is_break && ctx.loops == 0 {
            self.error(node, "continue is not in a loop");
        }
    }

    fn use_label(&mut self, label: AstNode<'a>) {
        let name = label.text();
        let Some(obj) = self.funcs.last().and_then(|ctx| ctx.labels.get(name).copied()) else {
            self.error(label, format!("label {name} not defined"));
            return;
        };
        self.record_use(label, obj);
        if let Some(ctx) = self.ctx() {
            ctx.used_labels.insert(obj);
        }
    }

    // Termination analysis.

    fn is_terminating_list(&self, stmts: &[AstNode<'a>], label: Option<&str>) -> bool {
        stmts
            .iter()
            .rev()
            .find(|s| s.kind() != "empty_statement")
            .is_some_and(|s| self.is_terminating(*s, label))
    }

    /// Whether `node` ends control flow. `label` names the labeled statement
    /// wrapping `node`, if any.
    fn is_terminating(&self, node: AstNode<'a>, label: Option<&str>) -> bool {
        match node.kind() {
            "return_statement" | "goto_statement" => true,
            "expression_statement" => node
                .children()
                .first()
                .is_some_and(|e| self.is_panic_call(*e)),
            "block" => self.is_terminating_list(&statements(node), None),
            "if_statement" => {
                let (Some(then), Some(alt)) = (node.field("consequence"), node.field("alternative"))
                else {
                    return false;
                };
                self.is_terminating(then, None) && self.is_terminating(alt, None)
            }
            "for_statement" => {
                let body = node.field("body");
                let has_condition = node
                    .children()
                    .into_iter()
                    .filter(|c| Some(*c) != body)
                    .any(|c| match c.kind() {
                        "for_clause" => c.field("condition").is_some(),
                        _ => true,
                    });
                !has_condition && body.is_some_and(|b| !has_break(b, label))
            }
            "expression_switch_statement" | "type_switch_statement" | "select_statement" => {
                let clauses: Vec<AstNode<'a>> = node
                    .children()
                    .into_iter()
                    .filter(|c| {
                        matches!(
                            c.kind(),
                            "expression_case" | "type_case" | "default_case" | "communication_case"
                        )
                    })
                    .collect();
                let has_default = clauses.iter().any(|c| c.kind() == "default_case");
                if node.kind() != "select_statement" && !has_default {
                    return false;
                }
                clauses.iter().all(|clause| {
                    let stmts = statements(*clause);
                    let ends = stmts
                        .last()
                        .is_some_and(|s| s.kind() == "fallthrough_statement")
                        || self.is_terminating_list(&stmts, None);
                    ends && !has_break(*clause, label)
                })
            }
            "labeled_statement" => {
                let label_node = node.field("label");
                let name = label_node.map(|l| l.text());
                node.children()
                    .into_iter()
                    .find(|c| Some(*c) != label_node)
                    .is_some_and(|inner| self.is_terminating(inner, name))
            }
            _ => false,
        }
    }

    fn is_panic_call(&self, e: AstNode<'a>) -> bool {
        let call = unparen(e);
        if call.kind() != "call_expression" {
            return false;
        }
        let Some(function) = call.field("function").map(unparen) else {
            return false;
        };
        function.kind() == "identifier"
            && self
                .info
                .uses
                .get(&function.key())
                .is_some_and(|obj| self.info.object(*obj).kind == ObjectKind::Builtin(Builtin::Panic))
    }
}

/// Whether a `break` inside `node` leaves the statement labeled `label` (or
/// the unlabeled statement whose body `node` is).
fn has_break(node: AstNode<'_>, label: Option<&str>) -> bool {
    let mut found = false;
    let mut nested: Vec<AstNode<'_>> = Vec::new();
    visit_subtree(node, &mut |n: AstNode<'_>| {
        // Leave nested statements we have finished with.
        while nested.last().is_some_and(|outer| n.pos() >= outer.end()) {
            nested.pop();
        }
        match n.kind() {
            "func_literal" => Flow::Prune,
            "for_statement" | "expression_switch_statement" | "type_switch_statement"
            | "select_statement"
                if n != node =>
            {
                nested.push(n);
                Flow::Descend
            }
            "break_statement" => {
                let target = n.children().first().map(|l| l.text());
                let hit = match target {
                    Some(name) => Some(name) == label,
                    None => nested.is_empty(),
                };
                if hit {
                    found = true;
                    Flow::Stop
                } else {
                    Flow::Prune
                }
            }
            _ => Flow::Descend,
        }
    });
    found
}
