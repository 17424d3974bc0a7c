//! Pass C: attach a semantic type to every expression.
//!
//! Checking is organized the way the language runs: a scoped local
//! environment over parameters, the locals group, and block
//! declarations; then the enclosing class's field table; then the
//! file-scope functions. Errors are collected into the shared
//! diagnostic list; the first fatal error in a top-level declaration
//! aborts that declaration's checking (via `Result`), and the next
//! declaration is still checked so several errors surface per run.

use std::collections::HashMap;

use crate::ast::*;
use crate::diag::{Diagnostic, Pos};
use crate::symbols::{GlobalEnv, TypeEntry, TypedefState};
use crate::types::{
    ClassId, TypeId, TypeKind, TypeTable, BOOLEAN, FLOAT, INT, LONG, NULL, STRING, VOID,
};

type CheckResult<T> = Result<T, ()>;

pub fn check_program(
    program: &mut Program,
    table: &mut TypeTable,
    env: &GlobalEnv,
    diags: &mut Vec<Diagnostic>,
) {
    for decl in &mut program.decls {
        match decl {
            Decl::Function(f) => {
                let mut ck = Checker::new(table, env, diags);
                let _ = ck.check_function(f, None);
            }
            Decl::Class(c) => {
                let Some(cid) = c.id else { continue };
                let mut ck = Checker::new(table, env, diags);
                let _ = ck.check_class(c, cid);
            }
            Decl::Typedef(_) => {}
        }
    }
}

struct Checker<'a> {
    table: &'a mut TypeTable,
    env: &'a GlobalEnv,
    diags: &'a mut Vec<Diagnostic>,
    scopes: Vec<HashMap<String, TypeId>>,
    current_class: Option<ClassId>,
    rettype: TypeId,
    in_loop: bool,
}

impl<'a> Checker<'a> {
    fn new(table: &'a mut TypeTable, env: &'a GlobalEnv, diags: &'a mut Vec<Diagnostic>) -> Self {
        Self {
            table,
            env,
            diags,
            scopes: vec![HashMap::new()],
            current_class: None,
            rettype: VOID,
            in_loop: false,
        }
    }

    /// Report a fatal type error and abort the enclosing declaration.
    fn fatal<T>(&mut self, pos: Pos, message: String) -> CheckResult<T> {
        self.diags.push(Diagnostic::type_error(pos, message));
        Err(())
    }

    fn warn_symbol(&mut self, pos: Pos, message: String) {
        self.diags.push(Diagnostic::symbol(pos, message));
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare_local(&mut self, name: &Ident, ty: TypeId, kind: &str) {
        if self.lookup_local(&name.raw).is_some() {
            self.warn_symbol(name.pos, format!("redeclaration of {kind} {}", name.raw));
        }
        self.scopes
            .last_mut()
            .expect("checker always has a scope")
            .insert(name.raw.clone(), ty);
    }

    fn lookup_local(&self, name: &str) -> Option<TypeId> {
        for scope in self.scopes.iter().rev() {
            if let Some(ty) = scope.get(name) {
                return Some(*ty);
            }
        }
        None
    }

    fn check_class(&mut self, class: &mut ClassDecl, cid: ClassId) -> CheckResult<()> {
        // Field defaults are checked without a receiver in scope: they
        // may build objects and call free functions, not read fields.
        for field in &mut class.fields {
            if let Some(default) = &mut field.default {
                self.current_class = None;
                self.scopes = vec![HashMap::new()];
                let field_ty = field.ty.resolved.unwrap_or(INT);
                let t = self.check_expr(default)?;
                annotate_null(self.table, default, field_ty);
                if !self.table.is_assignable(t, field_ty) {
                    let (got, want) = (self.table.name(t), self.table.name(field_ty));
                    return self.fatal(
                        default.pos,
                        format!(
                            "default value of type {got} is not implicitly convertible to field type {want}"
                        ),
                    );
                }
            }
        }
        for method in &mut class.methods {
            self.check_function(method, Some(cid))?;
        }
        Ok(())
    }

    fn check_function(&mut self, f: &mut FunctionDecl, cid: Option<ClassId>) -> CheckResult<()> {
        self.current_class = cid;
        self.rettype = f.ret.resolved.unwrap_or(VOID);
        self.scopes = vec![HashMap::new()];
        self.in_loop = false;

        for param in &f.params {
            let ty = param.ty.resolved.unwrap_or(INT);
            self.declare_local(&param.name, ty, "parameter");
        }
        for local in &f.locals {
            let ty = local.ty.resolved.unwrap_or(INT);
            self.declare_local(&local.name, ty, "variable");
        }

        self.check_block(&mut f.body)?;

        if self.rettype != VOID && !block_returns(&f.body) {
            let name = f.name.raw.clone();
            return self.fatal(
                f.name.pos,
                format!("function {name} does not return a value on every control path"),
            );
        }
        Ok(())
    }

    fn check_block(&mut self, block: &mut Block) -> CheckResult<()> {
        self.push_scope();
        for stmt in &mut block.stmts {
            self.check_stmt(stmt)?;
        }
        self.pop_scope();
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) -> CheckResult<()> {
        match stmt {
            Stmt::Block(b) => self.check_block(b),
            Stmt::If(s) => {
                self.check_condition(&mut s.test)?;
                self.check_block(&mut s.then_block)?;
                if let Some(else_block) = &mut s.else_block {
                    self.check_block(else_block)?;
                }
                Ok(())
            }
            Stmt::While(s) => {
                self.check_condition(&mut s.test)?;
                self.check_loop_body(&mut s.body)
            }
            Stmt::For(s) => {
                self.push_scope();
                match &mut s.init {
                    Some(ForInit::Decl(v)) => self.check_var_decl(v)?,
                    Some(ForInit::Expr(e)) => {
                        self.check_expr(e)?;
                    }
                    None => {}
                }
                if let Some(test) = &mut s.test {
                    self.check_condition(test)?;
                }
                if let Some(update) = &mut s.update {
                    self.check_expr(update)?;
                }
                self.check_loop_body(&mut s.body)?;
                self.pop_scope();
                Ok(())
            }
            Stmt::Return(s) => self.check_return(s),
            Stmt::Break(pos) => {
                if !self.in_loop {
                    let pos = *pos;
                    self.diags.push(Diagnostic::type_error(
                        pos,
                        "break statement must occur within a loop".to_string(),
                    ));
                }
                Ok(())
            }
            Stmt::Continue(pos) => {
                if !self.in_loop {
                    let pos = *pos;
                    self.diags.push(Diagnostic::type_error(
                        pos,
                        "continue statement must occur within a loop".to_string(),
                    ));
                }
                Ok(())
            }
            Stmt::Decl(v) => self.check_var_decl(v),
            Stmt::Expr(s) => {
                self.check_expr(&mut s.expr)?;
                Ok(())
            }
        }
    }

    fn check_loop_body(&mut self, body: &mut Block) -> CheckResult<()> {
        let saved = self.in_loop;
        self.in_loop = true;
        let result = self.check_block(body);
        self.in_loop = saved;
        result
    }

    fn check_condition(&mut self, test: &mut Expr) -> CheckResult<()> {
        let t = self.check_expr(test)?;
        if t != BOOLEAN {
            let got = self.table.name(t);
            return self.fatal(
                test.pos,
                format!("type of test expression must be boolean, but was given {got}"),
            );
        }
        Ok(())
    }

    fn check_var_decl(&mut self, v: &mut VarDecl) -> CheckResult<()> {
        let ty = v.ty.resolved.unwrap_or(INT);
        self.declare_local(&v.name, ty, "variable");
        if let Some(init) = &mut v.init {
            let t = self.check_expr(init)?;
            annotate_null(self.table, init, ty);
            if !self.table.is_assignable(t, ty) {
                let (got, want) = (self.table.name(t), self.table.name(ty));
                return self.fatal(
                    init.pos,
                    format!("initializer of type {got} is not implicitly convertible to {want}"),
                );
            }
        }
        Ok(())
    }

    fn check_return(&mut self, s: &mut ReturnStmt) -> CheckResult<()> {
        match &mut s.expr {
            Some(expr) => {
                if self.rettype == VOID {
                    return self.fatal(
                        s.pos,
                        "function should not return a value, as its return type is void"
                            .to_string(),
                    );
                }
                let t = self.check_expr(expr)?;
                annotate_null(self.table, expr, self.rettype);
                if !self.table.is_assignable(t, self.rettype) {
                    let (want, got) = (self.table.name(self.rettype), self.table.name(t));
                    return self.fatal(
                        s.pos,
                        format!("function requires return type {want} but got {got}"),
                    );
                }
                Ok(())
            }
            None => {
                if self.rettype != VOID {
                    let want = self.table.name(self.rettype);
                    return self.fatal(
                        s.pos,
                        format!("function requires a return value of type {want}"),
                    );
                }
                Ok(())
            }
        }
    }

    fn check_expr(&mut self, e: &mut Expr) -> CheckResult<TypeId> {
        let ty = match &mut e.kind {
            ExprKind::IntLit(text) => {
                if text.ends_with('l') || text.ends_with('L') {
                    LONG
                } else {
                    INT
                }
            }
            ExprKind::FloatLit(_) => FLOAT,
            ExprKind::StrLit(_) => STRING,
            ExprKind::BoolLit(_) => BOOLEAN,
            ExprKind::Null => NULL,
            ExprKind::Name { .. } => self.check_name(e)?,
            ExprKind::FieldAccess { .. } => self.check_field_access(e)?,
            ExprKind::Index { .. } => self.check_index(e)?,
            ExprKind::Call { .. } => self.check_call(e)?,
            ExprKind::MethodCall { .. } => self.check_method_call(e)?,
            ExprKind::New { .. } => self.check_new(e)?,
            ExprKind::NewArray { .. } => self.check_new_array(e)?,
            ExprKind::Unary { .. } => self.check_unary(e)?,
            ExprKind::Binary { .. } => self.check_binary(e)?,
        };
        e.ty = Some(ty);
        Ok(ty)
    }

    fn check_name(&mut self, e: &mut Expr) -> CheckResult<TypeId> {
        let pos = e.pos;
        let ExprKind::Name { name, binding } = &mut e.kind else { unreachable!() };

        if let Some(ty) = self.lookup_local(&name.raw) {
            *binding = Some(Binding::Local);
            return Ok(ty);
        }
        if let Some(cid) = self.current_class {
            if let Some(field) = self.table.lookup_field(cid, &name.raw) {
                let ty = field.ty;
                *binding = Some(Binding::Field);
                return Ok(ty);
            }
        }
        if let Some(sigs) = self.env.overloads(&name.raw) {
            let (params, ret) = (sigs[0].params.clone(), sigs[0].ret);
            *binding = Some(Binding::Function);
            return Ok(self.table.function_of(params, ret));
        }
        let name = name.raw.clone();
        self.fatal(pos, format!("undefined variable {name}"))
    }

    fn check_field_access(&mut self, e: &mut Expr) -> CheckResult<TypeId> {
        let pos = e.pos;
        let ExprKind::FieldAccess { recv, field, .. } = &mut e.kind else { unreachable!() };
        let recv_ty = self.check_expr(recv)?;
        let field_name = field.raw.clone();

        let recv_kind = self.table.kind(recv_ty).clone();
        let (length, ty) = match recv_kind {
            TypeKind::Class(cid) => match self.table.lookup_field(cid, &field_name).map(|f| f.ty) {
                Some(field_ty) => {
                    let length =
                        if field_name == "length" { Some(LengthKind::ClassField) } else { None };
                    (length, field_ty)
                }
                None => {
                    let class = self.table.class(cid).name.clone();
                    return self.fatal(pos, format!("class {class} has no field {field_name}"));
                }
            },
            TypeKind::Array(_) => {
                if field_name == "length" {
                    (Some(LengthKind::ArrayLength), INT)
                } else {
                    let got = self.table.name(recv_ty);
                    return self.fatal(pos, format!("type {got} has no field {field_name}"));
                }
            }
            _ => {
                let got = self.table.name(recv_ty);
                return self.fatal(
                    pos,
                    format!("receiver must be a class or array type, but was {got}"),
                );
            }
        };

        let ExprKind::FieldAccess { length: slot, .. } = &mut e.kind else { unreachable!() };
        *slot = length;
        Ok(ty)
    }

    fn check_index(&mut self, e: &mut Expr) -> CheckResult<TypeId> {
        let pos = e.pos;
        let ExprKind::Index { recv, index } = &mut e.kind else { unreachable!() };
        let recv_ty = self.check_expr(recv)?;
        let index_ty = self.check_expr(index)?;
        let recv_kind = self.table.kind(recv_ty).clone();
        let TypeKind::Array(elem) = recv_kind else {
            let got = self.table.name(recv_ty);
            return self.fatal(pos, format!("cannot index into non-array type {got}"));
        };
        if index_ty != INT {
            let got = self.table.name(index_ty);
            return self.fatal(pos, format!("array index expects type int, but got type {got}"));
        }
        Ok(elem)
    }

    fn check_call(&mut self, e: &mut Expr) -> CheckResult<TypeId> {
        let pos = e.pos;
        let ExprKind::Call { callee, args, .. } = &mut e.kind else { unreachable!() };
        let name = callee.raw.clone();

        let mut arg_tys = Vec::with_capacity(args.len());
        for arg in args.iter_mut() {
            arg_tys.push(self.check_expr(arg)?);
        }

        // Inside a class, methods of the receiver shadow free functions.
        let mut target = CallTarget::Function;
        let candidates: Vec<(Vec<TypeId>, TypeId)> = match self.current_class {
            Some(cid) if !self.table.lookup_methods(cid, &name).is_empty() => {
                target = CallTarget::Method;
                self.table
                    .lookup_methods(cid, &name)
                    .into_iter()
                    .map(|sig| (sig.params.clone(), sig.ret))
                    .collect()
            }
            _ => match self.env.overloads(&name) {
                Some(sigs) => sigs.iter().map(|s| (s.params.clone(), s.ret)).collect(),
                None => return self.fatal(pos, format!("undefined function {name}")),
            },
        };

        let ExprKind::Call { args, target: slot, .. } = &mut e.kind else { unreachable!() };
        *slot = Some(target);
        self.resolve_overload(pos, &name, &candidates, args, &arg_tys)
    }

    fn check_method_call(&mut self, e: &mut Expr) -> CheckResult<TypeId> {
        let pos = e.pos;
        let ExprKind::MethodCall { recv, method, args } = &mut e.kind else { unreachable!() };
        let recv_ty = self.check_expr(recv)?;
        let method_name = method.raw.clone();

        let recv_kind = self.table.kind(recv_ty).clone();
        let TypeKind::Class(cid) = recv_kind else {
            let got = self.table.name(recv_ty);
            return self.fatal(
                pos,
                format!("method receiver must be a class type, but was {got}"),
            );
        };

        let mut arg_tys = Vec::with_capacity(args.len());
        for arg in args.iter_mut() {
            arg_tys.push(self.check_expr(arg)?);
        }

        let candidates: Vec<(Vec<TypeId>, TypeId)> = self
            .table
            .lookup_methods(cid, &method_name)
            .into_iter()
            .map(|sig| (sig.params.clone(), sig.ret))
            .collect();
        if candidates.is_empty() {
            let class = self.table.class(cid).name.clone();
            return self.fatal(pos, format!("unknown method {class}.{method_name}"));
        }

        let ExprKind::MethodCall { args, .. } = &mut e.kind else { unreachable!() };
        self.resolve_overload(pos, &method_name, &candidates, args, &arg_tys)
    }

    /// Pointwise overload resolution: a candidate is viable when every
    /// argument is assignable to its parameter; an exact match on all
    /// parameter types wins, otherwise a unique most-specific viable
    /// candidate wins.
    fn resolve_overload(
        &mut self,
        pos: Pos,
        name: &str,
        candidates: &[(Vec<TypeId>, TypeId)],
        args: &mut [Expr],
        arg_tys: &[TypeId],
    ) -> CheckResult<TypeId> {
        let viable: Vec<&(Vec<TypeId>, TypeId)> = candidates
            .iter()
            .filter(|(params, _)| {
                params.len() == arg_tys.len()
                    && params
                        .iter()
                        .zip(arg_tys)
                        .all(|(p, a)| self.table.is_assignable(*a, *p))
            })
            .collect();

        if viable.is_empty() {
            if candidates.len() == 1 {
                let (params, _) = &candidates[0];
                if params.len() != arg_tys.len() {
                    return self.fatal(
                        pos,
                        format!(
                            "function {name} expected {} argument(s), but got {}",
                            params.len(),
                            arg_tys.len()
                        ),
                    );
                }
                for (p, a) in params.iter().zip(arg_tys) {
                    if !self.table.is_assignable(*a, *p) {
                        let (got, want) = (self.table.name(*a), self.table.name(*p));
                        return self.fatal(
                            pos,
                            format!(
                                "type {got} of argument is not compatible with parameter of type {want}"
                            ),
                        );
                    }
                }
            }
            return self.fatal(pos, format!("no matching overload for {name}"));
        }

        let winner = if let Some(exact) =
            viable.iter().copied().find(|(params, _)| params.as_slice() == arg_tys)
        {
            exact
        } else if viable.len() == 1 {
            viable[0]
        } else {
            // Most specific: every parameter assignable to the other
            // candidate's corresponding parameter.
            let le = |a: &[TypeId], b: &[TypeId]| {
                a.iter().zip(b).all(|(x, y)| self.table.is_assignable(*x, *y))
            };
            let minimal: Vec<&(Vec<TypeId>, TypeId)> = viable
                .iter()
                .copied()
                .filter(|(params, _)| viable.iter().all(|(other, _)| le(params, other)))
                .collect();
            if minimal.len() != 1 {
                return self.fatal(pos, format!("ambiguous call to {name}"));
            }
            minimal[0]
        };

        let (params, ret) = (winner.0.clone(), winner.1);
        for (arg, param) in args.iter_mut().zip(&params) {
            annotate_null(self.table, arg, *param);
        }
        Ok(ret)
    }

    fn check_new(&mut self, e: &mut Expr) -> CheckResult<TypeId> {
        let pos = e.pos;
        let ExprKind::New { class, args } = &mut e.kind else { unreachable!() };
        let name = class.raw.clone();

        let cid = match self.env.lookup_type(&name) {
            Some(TypeEntry::Class(cid)) => cid,
            Some(TypeEntry::Primitive(_)) => {
                return self.fatal(pos, "simple allocations of primitives are not allowed".into());
            }
            Some(TypeEntry::Typedef(idx)) => match self.env.typedefs[idx].state {
                TypedefState::Resolved(id) => match self.table.kind(id).clone() {
                    TypeKind::Class(cid) => cid,
                    TypeKind::Primitive(_) => {
                        return self.fatal(
                            pos,
                            "simple allocations of primitives are not allowed".into(),
                        );
                    }
                    _ => {
                        let got = self.table.name(id);
                        return self.fatal(pos, format!("new requires a class type, but got {got}"));
                    }
                },
                _ => return self.fatal(pos, format!("undefined type {name}")),
            },
            None => return self.fatal(pos, format!("undefined type {name}")),
        };

        let mut arg_tys = Vec::with_capacity(args.len());
        for arg in args.iter_mut() {
            arg_tys.push(self.check_expr(arg)?);
        }

        // Constructors are implicit: the zero-argument default and the
        // positional one over the full field table, inherited first.
        let class_ty = self.table.class_type(cid);
        let field_tys: Vec<TypeId> =
            self.table.class(cid).field_table.iter().map(|f| f.ty).collect();
        let mut candidates: Vec<(Vec<TypeId>, TypeId)> = vec![(Vec::new(), class_ty)];
        if !field_tys.is_empty() {
            candidates.push((field_tys, class_ty));
        }

        let display = format!("constructor of class {name}");
        let ExprKind::New { args, .. } = &mut e.kind else { unreachable!() };
        self.resolve_overload(pos, &display, &candidates, args, &arg_tys)
    }

    fn check_new_array(&mut self, e: &mut Expr) -> CheckResult<TypeId> {
        let pos = e.pos;
        let ExprKind::NewArray { elem, size } = &mut e.kind else { unreachable!() };
        let elem_ty = elem.resolved.unwrap_or(INT);
        if let Some(size) = size {
            let t = self.check_expr(size)?;
            if t != INT {
                let got = self.table.name(t);
                return self.fatal(pos, format!("array size expects type int, but got type {got}"));
            }
        }
        Ok(self.table.array_of(elem_ty))
    }

    fn check_unary(&mut self, e: &mut Expr) -> CheckResult<TypeId> {
        let pos = e.pos;
        let ExprKind::Unary { op, expr } = &mut e.kind else { unreachable!() };
        let op = *op;
        let t = self.check_expr(expr)?;
        match op {
            UnOp::Not => {
                if t != BOOLEAN {
                    let got = self.table.name(t);
                    return self.fatal(
                        pos,
                        format!("subexpression given is of type {got}, but must be boolean"),
                    );
                }
                Ok(BOOLEAN)
            }
            UnOp::Plus | UnOp::Minus => {
                if !self.table.is_numeric(t) {
                    let got = self.table.name(t);
                    return self.fatal(
                        pos,
                        format!("subexpression given is of type {got}, but must be numeric"),
                    );
                }
                Ok(t)
            }
            UnOp::PreInc | UnOp::PreDec => {
                let ExprKind::Unary { expr, .. } = &e.kind else { unreachable!() };
                if !(is_lvalue(expr) && self.table.is_numeric(t)) {
                    return self.fatal(pos, "subexpression must be a numeric l-value".into());
                }
                Ok(t)
            }
            UnOp::ObjectId => {
                if !self.table.is_reference(t) {
                    let got = self.table.name(t);
                    return self.fatal(
                        pos,
                        format!("subexpression was of type {got}, but must be of reference type"),
                    );
                }
                Ok(LONG)
            }
        }
    }

    fn check_binary(&mut self, e: &mut Expr) -> CheckResult<TypeId> {
        let pos = e.pos;
        let ExprKind::Binary { op, lhs, rhs, .. } = &mut e.kind else { unreachable!() };
        let op = *op;
        let tl = self.check_expr(lhs)?;
        let tr = self.check_expr(rhs)?;

        let ty = match op {
            BinOp::Assign => {
                let ExprKind::Binary { lhs, rhs, .. } = &mut e.kind else { unreachable!() };
                annotate_null(self.table, rhs, tl);
                if !self.table.is_assignable(tr, tl) {
                    let (got, want) = (self.table.name(tr), self.table.name(tl));
                    return self.fatal(
                        pos,
                        format!("rhs of type {got} is not implicitly convertible to lhs of type {want}"),
                    );
                }
                if !is_lvalue(lhs) {
                    return self.fatal(pos, "lhs operand must produce an l-value".into());
                }
                tl
            }
            BinOp::Add => {
                let overload = if self.table.is_numeric(tl) && self.table.is_numeric(tr) {
                    AddKind::Numeric
                } else if (tl == STRING && is_concatenable(self.table, tr))
                    || (tr == STRING && is_concatenable(self.table, tl))
                {
                    AddKind::Concat
                } else if tl == BOOLEAN {
                    return self.fatal(
                        pos,
                        "lhs operand is of type boolean, so rhs must be of type string".into(),
                    );
                } else if tr == BOOLEAN {
                    return self.fatal(
                        pos,
                        "rhs operand is of type boolean, so lhs must be of type string".into(),
                    );
                } else {
                    let (l, r) = (self.table.name(tl), self.table.name(tr));
                    return self.fatal(
                        pos,
                        format!("invalid operands of types {l} and {r} to operator +"),
                    );
                };
                let ExprKind::Binary { overload: slot, .. } = &mut e.kind else { unreachable!() };
                *slot = Some(overload);
                match overload {
                    AddKind::Numeric => self
                        .table
                        .join_numeric(tl, tr)
                        .expect("numeric join exists for numeric operands"),
                    AddKind::Concat => STRING,
                }
            }
            BinOp::Sub | BinOp::Mul | BinOp::Div => {
                match self.table.join_numeric(tl, tr) {
                    Some(ty) => ty,
                    None => {
                        return self.fatal(pos, "lhs and rhs must be of numeric type".into());
                    }
                }
            }
            BinOp::Mod => {
                if !(self.table.is_integral(tl) && self.table.is_integral(tr)) {
                    return self.fatal(pos, "lhs and rhs must be of type int or long".into());
                }
                self.table
                    .join_numeric(tl, tr)
                    .expect("integral operands always join")
            }
            BinOp::Push => {
                let lhs_kind = self.table.kind(tl).clone();
                let TypeKind::Array(elem) = lhs_kind else {
                    return self.fatal(pos, "lhs operand must be an array type".into());
                };
                let ExprKind::Binary { rhs, .. } = &mut e.kind else { unreachable!() };
                annotate_null(self.table, rhs, elem);
                if !self.table.is_assignable(tr, elem) {
                    let (got, want) = (self.table.name(tr), self.table.name(elem));
                    return self.fatal(
                        pos,
                        format!("rhs of type {got} is not implicitly convertible to element type {want}"),
                    );
                }
                tl
            }
            BinOp::Pop => {
                let lhs_kind = self.table.kind(tl).clone();
                let TypeKind::Array(elem) = lhs_kind else {
                    return self.fatal(pos, "lhs operand must be an array type".into());
                };
                let ExprKind::Binary { rhs, .. } = &mut e.kind else { unreachable!() };
                let rhs_ok = tr == NULL
                    || (is_lvalue(rhs) && self.table.is_assignable(elem, tr));
                if !rhs_ok {
                    return self.fatal(
                        pos,
                        "rhs operand must be null or an l-value the element type converts to"
                            .into(),
                    );
                }
                tl
            }
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let numeric = self.table.is_numeric(tl) && self.table.is_numeric(tr);
                let strings = tl == STRING && tr == STRING;
                if !(numeric || strings) {
                    return self.fatal(pos, "lhs and rhs must be both numeric or both strings".into());
                }
                BOOLEAN
            }
            BinOp::Eq | BinOp::Ne => {
                if !self.table.is_comparable(tl, tr) {
                    let (l, r) = (self.table.name(tl), self.table.name(tr));
                    return self.fatal(pos, format!("values of types {l} and {r} cannot be compared"));
                }
                let ExprKind::Binary { lhs, rhs, .. } = &mut e.kind else { unreachable!() };
                annotate_null(self.table, lhs, tr);
                annotate_null(self.table, rhs, tl);
                BOOLEAN
            }
            BinOp::And | BinOp::Or => {
                if !(tl == BOOLEAN && tr == BOOLEAN) {
                    return self.fatal(pos, "lhs and rhs operands must be of type boolean".into());
                }
                BOOLEAN
            }
        };
        Ok(ty)
    }
}

/// Primitive types that `+` may concatenate with a string.
fn is_concatenable(table: &TypeTable, t: TypeId) -> bool {
    table.is_numeric(t) || t == STRING || t == BOOLEAN
}

/// The null literal takes its concrete type from context so the backend
/// can lower it to a default-constructed reference of the right type.
fn annotate_null(table: &TypeTable, e: &mut Expr, target: TypeId) {
    if matches!(e.kind, ExprKind::Null) && table.is_reference(target) {
        e.ty = Some(target);
    }
}

/// Whether the expression designates an assignable place: a variable, a
/// field (including a class `length` field, but not the built-in length
/// of an array), or an array element.
fn is_lvalue(e: &Expr) -> bool {
    match &e.kind {
        ExprKind::Name { binding, .. } => {
            matches!(binding, Some(Binding::Local) | Some(Binding::Field))
        }
        ExprKind::Index { .. } => true,
        ExprKind::FieldAccess { length, .. } => !matches!(length, Some(LengthKind::ArrayLength)),
        _ => false,
    }
}

/// Conservative all-paths-return analysis: a block returns if its last
/// statement returns; an if/else returns if both branches return.
fn block_returns(block: &Block) -> bool {
    block.stmts.last().map(stmt_returns).unwrap_or(false)
}

fn stmt_returns(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(_) => true,
        Stmt::Block(b) => block_returns(b),
        Stmt::If(s) => match &s.else_block {
            Some(else_block) => block_returns(&s.then_block) && block_returns(else_block),
            None => false,
        },
        _ => false,
    }
}
