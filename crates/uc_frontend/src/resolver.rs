// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

//! Pass B: resolve every syntactic type reference to a semantic type.
//!
//! Typedefs are transparent and memoized; entering an alias that is
//! already being unwound is a cycle. After type references are resolved
//! the pass establishes superclass links, computes each class's field
//! table (inherited first, shadowing disallowed) and method signatures,
//! and registers free-function signatures in the global environment.

use crate::ast::*;
use crate::diag::Diagnostic;
use crate::symbols::{FuncSig, GlobalEnv, TypeEntry, TypedefState};
use crate::types::{ClassId, Field, MethodSig, TypeId, TypeKind, TypeTable, INT, VOID};

pub fn resolve_types(
    program: &mut Program,
    table: &mut TypeTable,
    env: &mut GlobalEnv,
    diags: &mut Vec<Diagnostic>,
) {
    // Unwind every typedef up front so later lookups are memoized hits.
    for idx in 0..env.typedefs.len() {
        resolve_typedef(idx, env, table, diags);
    }

    link_superclasses(program, table, env, diags);
    cut_inheritance_cycles(table, diags);
    cache_ancestors(table);

    resolve_class_members(program, table, env, diags);
    build_field_tables(table, diags);
    check_overrides(table, diags);
    register_functions(program, table, env, diags);

    // Type references inside bodies: declaration statements, for-loop
    // inits, and new-array element types. Typedef declarations copy
    // their memoized resolution back onto the AST node for the
    // backend's alias emission.
    for decl in &mut program.decls {
        match decl {
            Decl::Function(f) => resolve_in_function(f, env, table, diags),
            Decl::Class(c) => {
                for field in &mut c.fields {
                    if let Some(default) = &mut field.default {
                        resolve_in_expr(default, env, table, diags);
                    }
                }
                for m in &mut c.methods {
                    resolve_in_function(m, env, table, diags);
                }
            }
            Decl::Typedef(td) => {
                if let Some(TypeEntry::Typedef(idx)) = env.lookup_type(&td.name.raw) {
                    if let TypedefState::Resolved(id) = env.typedefs[idx].state {
                        td.aliased.resolved = Some(id);
                    }
                }
            }
        }
    }
}

/// Resolve a type reference, reporting unknown names. Falls back to
/// `int` so checking can continue past an error.
pub fn resolve_type_expr(
    te: &mut TypeExpr,
    env: &mut GlobalEnv,
    table: &mut TypeTable,
    diags: &mut Vec<Diagnostic>,
) -> TypeId {
    let id = match &mut te.kind {
        TypeExprKind::Named(name) => match env.lookup_type(name) {
            Some(TypeEntry::Primitive(id)) => id,
            Some(TypeEntry::Class(cid)) => table.class_type(cid),
            Some(TypeEntry::Typedef(idx)) => resolve_typedef(idx, env, table, diags),
            None => {
                diags.push(Diagnostic::type_error(te.pos, format!("undefined type {name}")));
                INT
            }
        },
        TypeExprKind::Array(elem) => {
            let elem_ty = resolve_type_expr(elem, env, table, diags);
            table.array_of(elem_ty)
        }
        TypeExprKind::Function { ret, params } => {
            let ret_ty = resolve_type_expr(ret, env, table, diags);
            let param_tys: Vec<TypeId> = params
                .iter_mut()
                .map(|p| resolve_type_expr(p, env, table, diags))
                .collect();
            table.function_of(param_tys, ret_ty)
        }
    };
    te.resolved = Some(id);
    id
}

fn resolve_typedef(
    idx: usize,
    env: &mut GlobalEnv,
    table: &mut TypeTable,
    diags: &mut Vec<Diagnostic>,
) -> TypeId {
    match env.typedefs[idx].state {
        TypedefState::Resolved(id) => id,
        TypedefState::InProgress => {
            let pos = env.typedefs[idx].pos;
            let name = env.typedefs[idx].name.clone();
            diags.push(Diagnostic::type_error(
                pos,
                format!("typedef cycle detected involving {name}"),
            ));
            env.typedefs[idx].state = TypedefState::Resolved(INT);
            INT
        }
        TypedefState::Unresolved => {
            env.typedefs[idx].state = TypedefState::InProgress;
            let mut aliased = env.typedefs[idx].aliased.clone();
            let id = resolve_type_expr(&mut aliased, env, table, diags);
            env.typedefs[idx].aliased = aliased;
            // A cycle through this alias resolves it to the fallback;
            // keep that result rather than overwriting it.
            if env.typedefs[idx].state == TypedefState::InProgress {
                env.typedefs[idx].state = TypedefState::Resolved(id);
            }
            match env.typedefs[idx].state {
                TypedefState::Resolved(id) => id,
                _ => id,
            }
        }
    }
}

/// Resolve a type used for a field, parameter, or variable: `void` and
/// function types are only legal as return types (function types never
/// have a value representation at all).
fn resolve_value_type(
    te: &mut TypeExpr,
    env: &mut GlobalEnv,
    table: &mut TypeTable,
    diags: &mut Vec<Diagnostic>,
) -> TypeId {
    let id = resolve_type_expr(te, env, table, diags);
    if id == VOID {
        diags.push(Diagnostic::type_error(te.pos, "void can only be used as a return type"));
        te.resolved = Some(INT);
        return INT;
    }
    if matches!(table.kind(id), TypeKind::Function { .. }) {
        diags.push(Diagnostic::type_error(
            te.pos,
            "a function type cannot be used for a variable, field, or parameter",
        ));
        te.resolved = Some(INT);
        return INT;
    }
    id
}

fn resolve_return_type(
    te: &mut TypeExpr,
    env: &mut GlobalEnv,
    table: &mut TypeTable,
    diags: &mut Vec<Diagnostic>,
) -> TypeId {
    let id = resolve_type_expr(te, env, table, diags);
    if matches!(table.kind(id), TypeKind::Function { .. }) {
        diags.push(Diagnostic::type_error(te.pos, "a function type cannot be returned"));
        te.resolved = Some(INT);
        return INT;
    }
    id
}

fn link_superclasses(
    program: &Program,
    table: &mut TypeTable,
    env: &mut GlobalEnv,
    diags: &mut Vec<Diagnostic>,
) {
    for decl in &program.decls {
        let Decl::Class(class) = decl else { continue };
        let Some(cid) = class.id else { continue };
        let Some(super_name) = &class.superclass else { continue };

        let super_id = match env.lookup_type(&super_name.raw) {
            Some(TypeEntry::Class(sid)) => Some(sid),
            Some(TypeEntry::Typedef(idx)) => {
                let resolved = resolve_typedef(idx, env, table, diags);
                match table.kind(resolved) {
                    TypeKind::Class(sid) => Some(*sid),
                    _ => {
                        diags.push(Diagnostic::type_error(
                            super_name.pos,
                            format!("superclass {} is not a class", super_name.raw),
                        ));
                        None
                    }
                }
            }
            Some(TypeEntry::Primitive(_)) => {
                diags.push(Diagnostic::type_error(
                    super_name.pos,
                    format!("superclass {} is not a class", super_name.raw),
                ));
                None
            }
            None => {
                diags.push(Diagnostic::type_error(
                    super_name.pos,
                    format!("undefined type {}", super_name.raw),
                ));
                None
            }
        };
        table.class_mut(cid).superclass = super_id;
    }
}

/// Detect inheritance cycles and cut the offending link so the rest of
/// the pipeline sees a finite chain.
fn cut_inheritance_cycles(table: &mut TypeTable, diags: &mut Vec<Diagnostic>) {
    for idx in 0..table.class_count() {
        let start = ClassId::from_index(idx);
        let mut seen = vec![start];
        let mut cur = start;
        while let Some(parent) = table.class(cur).superclass {
            if seen.contains(&parent) {
                let info = table.class(start);
                diags.push(Diagnostic::type_error(
                    info.pos,
                    format!("inheritance cycle detected involving class {}", info.name),
                ));
                table.class_mut(cur).superclass = None;
                break;
            }
            seen.push(parent);
            cur = parent;
        }
    }
}

fn cache_ancestors(table: &mut TypeTable) {
    for idx in 0..table.class_count() {
        let cid = ClassId::from_index(idx);
        let mut ancestors = Vec::new();
        let mut cur = table.class(cid).superclass;
        while let Some(parent) = cur {
            ancestors.push(parent);
            cur = table.class(parent).superclass;
        }
        table.class_mut(cid).ancestors = ancestors;
    }
}

fn resolve_class_members(
    program: &mut Program,
    table: &mut TypeTable,
    env: &mut GlobalEnv,
    diags: &mut Vec<Diagnostic>,
) {
    for decl in &mut program.decls {
        let Decl::Class(class) = decl else { continue };
        let Some(cid) = class.id else { continue };

        let mut fields: Vec<Field> = Vec::new();
        for field in &mut class.fields {
            let ty = resolve_value_type(&mut field.ty, env, table, diags);
            if fields.iter().any(|f| f.name == field.name.raw) {
                diags.push(Diagnostic::symbol(
                    field.name.pos,
                    format!("redeclaration of field {}", field.name.raw),
                ));
                continue;
            }
            fields.push(Field { name: field.name.raw.clone(), pos: field.name.pos, ty });
        }
        table.class_mut(cid).fields = fields;

        let mut sigs: Vec<MethodSig> = Vec::new();
        for method in &mut class.methods {
            let ret = resolve_return_type(&mut method.ret, env, table, diags);
            let params: Vec<TypeId> = method
                .params
                .iter_mut()
                .map(|p| resolve_value_type(&mut p.ty, env, table, diags))
                .collect();
            if sigs.iter().any(|s| s.name == method.name.raw && s.params == params) {
                diags.push(Diagnostic::symbol(
                    method.name.pos,
                    format!(
                        "redefinition of method {}.{}",
                        class.name.raw, method.name.raw
                    ),
                ));
                continue;
            }
            sigs.push(MethodSig {
                name: method.name.raw.clone(),
                pos: method.name.pos,
                params,
                ret,
            });
        }
        table.class_mut(cid).methods = sigs;
    }
}

fn build_field_tables(table: &mut TypeTable, diags: &mut Vec<Diagnostic>) {
    for idx in 0..table.class_count() {
        let cid = ClassId::from_index(idx);
        let mut inherited: Vec<Field> = Vec::new();
        for anc in table.class(cid).ancestors.clone().into_iter().rev() {
            inherited.extend(table.class(anc).fields.iter().cloned());
        }
        let mut full = inherited.clone();
        for field in table.class(cid).fields.clone() {
            if inherited.iter().any(|f| f.name == field.name) {
                diags.push(Diagnostic::symbol(
                    field.pos,
                    format!(
                        "field {} in class {} redeclares an inherited field",
                        field.name,
                        table.class(cid).name
                    ),
                ));
                continue;
            }
            full.push(field);
        }
        table.class_mut(cid).field_table = full;
    }
}

/// An override (same name and parameter list as an inherited method)
/// must keep the return type: the emitted C++ relies on virtual
/// dispatch.
fn check_overrides(table: &TypeTable, diags: &mut Vec<Diagnostic>) {
    for idx in 0..table.class_count() {
        let cid = ClassId::from_index(idx);
        let class = table.class(cid);
        for sig in &class.methods {
            for anc in &class.ancestors {
                if let Some(inherited) = table
                    .class(*anc)
                    .methods
                    .iter()
                    .find(|m| m.name == sig.name && m.params == sig.params)
                {
                    if inherited.ret != sig.ret {
                        diags.push(Diagnostic::type_error(
                            sig.pos,
                            format!(
                                "invalid override of method {}.{}: return type differs from the inherited method",
                                class.name, sig.name
                            ),
                        ));
                    }
                    break;
                }
            }
        }
    }
}

fn register_functions(
    program: &mut Program,
    table: &mut TypeTable,
    env: &mut GlobalEnv,
    diags: &mut Vec<Diagnostic>,
) {
    for decl in &mut program.decls {
        let Decl::Function(func) = decl else { continue };
        let ret = resolve_return_type(&mut func.ret, env, table, diags);
        let params: Vec<TypeId> = func
            .params
            .iter_mut()
            .map(|p| resolve_value_type(&mut p.ty, env, table, diags))
            .collect();

        let name = func.name.raw.clone();
        let existing = env.functions.entry(name.clone()).or_default();
        if existing.iter().any(|s| s.params == params) {
            diags.push(Diagnostic::symbol(
                func.name.pos,
                format!("redefinition of function {name}"),
            ));
            continue;
        }
        existing.push(FuncSig { name, pos: func.name.pos, params, ret, builtin: false });
    }
}

fn resolve_in_function(
    func: &mut FunctionDecl,
    env: &mut GlobalEnv,
    table: &mut TypeTable,
    diags: &mut Vec<Diagnostic>,
) {
    for local in &mut func.locals {
        resolve_value_type(&mut local.ty, env, table, diags);
    }
    resolve_in_block(&mut func.body, env, table, diags);
}

fn resolve_in_block(
    block: &mut Block,
    env: &mut GlobalEnv,
    table: &mut TypeTable,
    diags: &mut Vec<Diagnostic>,
) {
    for stmt in &mut block.stmts {
        resolve_in_stmt(stmt, env, table, diags);
    }
}

fn resolve_in_stmt(
    stmt: &mut Stmt,
    env: &mut GlobalEnv,
    table: &mut TypeTable,
    diags: &mut Vec<Diagnostic>,
) {
    match stmt {
        Stmt::Block(b) => resolve_in_block(b, env, table, diags),
        Stmt::If(s) => {
            resolve_in_expr(&mut s.test, env, table, diags);
            resolve_in_block(&mut s.then_block, env, table, diags);
            if let Some(else_block) = &mut s.else_block {
                resolve_in_block(else_block, env, table, diags);
            }
        }
        Stmt::While(s) => {
            resolve_in_expr(&mut s.test, env, table, diags);
            resolve_in_block(&mut s.body, env, table, diags);
        }
        Stmt::For(s) => {
            match &mut s.init {
                Some(ForInit::Decl(v)) => {
                    resolve_value_type(&mut v.ty, env, table, diags);
                    if let Some(init) = &mut v.init {
                        resolve_in_expr(init, env, table, diags);
                    }
                }
                Some(ForInit::Expr(e)) => resolve_in_expr(e, env, table, diags),
                None => {}
            }
            if let Some(test) = &mut s.test {
                resolve_in_expr(test, env, table, diags);
            }
            if let Some(update) = &mut s.update {
                resolve_in_expr(update, env, table, diags);
            }
            resolve_in_block(&mut s.body, env, table, diags);
        }
        Stmt::Return(s) => {
            if let Some(expr) = &mut s.expr {
                resolve_in_expr(expr, env, table, diags);
            }
        }
        Stmt::Break(_) | Stmt::Continue(_) => {}
        Stmt::Decl(v) => {
            resolve_value_type(&mut v.ty, env, table, diags);
            if let Some(init) = &mut v.init {
                resolve_in_expr(init, env, table, diags);
            }
        }
        Stmt::Expr(s) => resolve_in_expr(&mut s.expr, env, table, diags),
    }
}

fn resolve_in_expr(
    expr: &mut Expr,
    env: &mut GlobalEnv,
    table: &mut TypeTable,
    diags: &mut Vec<Diagnostic>,
) {
    match &mut expr.kind {
        ExprKind::NewArray { elem, size } => {
            resolve_value_type(elem, env, table, diags);
            if let Some(size) = size {
                resolve_in_expr(size, env, table, diags);
            }
        }
        ExprKind::FieldAccess { recv, .. } => resolve_in_expr(recv, env, table, diags),
        ExprKind::Index { recv, index } => {
            resolve_in_expr(recv, env, table, diags);
            resolve_in_expr(index, env, table, diags);
        }
        ExprKind::Call { args, .. } | ExprKind::New { args, .. } => {
            for arg in args {
                resolve_in_expr(arg, env, table, diags);
            }
        }
        ExprKind::MethodCall { recv, args, .. } => {
            resolve_in_expr(recv, env, table, diags);
            for arg in args {
                resolve_in_expr(arg, env, table, diags);
            }
        }
        ExprKind::Unary { expr: inner, .. } => resolve_in_expr(inner, env, table, diags),
        ExprKind::Binary { lhs, rhs, .. } => {
            resolve_in_expr(lhs, env, table, diags);
            resolve_in_expr(rhs, env, table, diags);
        }
        ExprKind::IntLit(_)
        | ExprKind::FloatLit(_)
        | ExprKind::StrLit(_)
        | ExprKind::BoolLit(_)
        | ExprKind::Null
        | ExprKind::Name { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse_program;
    use crate::symbols::collect_symbols;
    use crate::types::{BOOLEAN, STRING};

    fn resolve(src: &str) -> (Program, TypeTable, GlobalEnv, Vec<Diagnostic>) {
        let toks = lex(src).unwrap();
        let mut prog = parse_program(&toks).unwrap();
        let mut table = TypeTable::new();
        let mut env = GlobalEnv::new();
        let mut diags = Vec::new();
        collect_symbols(&mut prog, &mut table, &mut env, &mut diags);
        resolve_types(&mut prog, &mut table, &mut env, &mut diags);
        (prog, table, env, diags)
    }

    fn class_id(env: &GlobalEnv, name: &str) -> ClassId {
        match env.lookup_type(name) {
            Some(TypeEntry::Class(cid)) => cid,
            other => panic!("expected class {name}, got {other:?}"),
        }
    }

    #[test]
    fn forward_references_resolve() {
        let (_, table, env, diags) = resolve("class foo { baz b; } class baz { string s; }");
        assert!(diags.is_empty(), "{diags:?}");
        let foo = class_id(&env, "foo");
        let baz = class_id(&env, "baz");
        assert_eq!(table.class(foo).fields[0].ty, table.class_type(baz));
    }

    #[test]
    fn typedef_chains_unwrap_transparently() {
        let (_, _, env, diags) = resolve("typedef int t1; typedef t1 t2; class c { t2 x; }");
        assert!(diags.is_empty(), "{diags:?}");
        match env.typedefs[1].state {
            TypedefState::Resolved(id) => assert_eq!(id, INT),
            other => panic!("expected resolved typedef, got {other:?}"),
        }
    }

    #[test]
    fn typedef_cycle_is_reported() {
        let (_, _, _, diags) = resolve("typedef a b; typedef b a;");
        assert!(diags.iter().any(|d| d.message.contains("typedef cycle")));
    }

    #[test]
    fn unknown_type_is_reported() {
        let (_, _, _, diags) = resolve("class c { mystery x; }");
        assert!(diags.iter().any(|d| d.message.contains("undefined type mystery")));
    }

    #[test]
    fn field_table_puts_inherited_fields_first() {
        let (_, table, env, diags) =
            resolve("class base { int a; } class derived : base { string b; }");
        assert!(diags.is_empty(), "{diags:?}");
        let derived = class_id(&env, "derived");
        let names: Vec<&str> =
            table.class(derived).field_table.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(table.class(derived).field_table[1].ty, STRING);
    }

    #[test]
    fn shadowing_an_inherited_field_is_an_error() {
        let (_, _, _, diags) =
            resolve("class base { int a; } class derived : base { int a; }");
        assert!(diags.iter().any(|d| d.message.contains("redeclares an inherited field")));
    }

    #[test]
    fn inheritance_cycle_is_cut_and_reported() {
        let (_, table, env, diags) = resolve("class a : b { } class b : a { }");
        assert!(diags.iter().any(|d| d.message.contains("inheritance cycle")));
        let a = class_id(&env, "a");
        // ancestors stay finite after the cut
        assert!(table.class(a).ancestors.len() <= 1);
    }

    #[test]
    fn void_fields_are_rejected() {
        let (_, _, _, diags) = resolve("class c { void x; }");
        assert!(diags.iter().any(|d| d.message.contains("void can only be used as a return type")));
    }

    #[test]
    fn functions_register_with_overloads() {
        let (_, _, env, diags) =
            resolve("int f(int x)() { return x; } int f(string s)() { return 0; }");
        assert!(diags.is_empty(), "{diags:?}");
        let sigs = env.overloads("f").unwrap();
        assert_eq!(sigs.len(), 2);
    }

    #[test]
    fn exact_duplicate_function_is_an_error() {
        let (_, _, _, diags) =
            resolve("int f(int x)() { return x; } int f(int y)() { return y; }");
        assert!(diags.iter().any(|d| d.message.contains("redefinition of function f")));
    }

    #[test]
    fn redefining_a_builtin_signature_is_an_error() {
        let (_, _, _, diags) = resolve("void print(string s)() { }");
        assert!(diags.iter().any(|d| d.message.contains("redefinition of function print")));
    }

    #[test]
    fn override_with_matching_signature_is_allowed() {
        let (_, _, _, diags) = resolve(
            "class base { int get() { return 0; } } \
             class derived : base { int get() { return 1; } }",
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn override_changing_return_type_is_an_error() {
        let (_, _, _, diags) = resolve(
            "class base { int get() { return 0; } } \
             class derived : base { boolean get() { return true; } }",
        );
        assert!(diags.iter().any(|d| d.message.contains("invalid override")));
    }

    #[test]
    fn method_signatures_are_recorded() {
        let (_, table, env, diags) =
            resolve("class c { boolean test(int x, string s) { return true; } }");
        assert!(diags.is_empty(), "{diags:?}");
        let c = class_id(&env, "c");
        let sig = &table.class(c).methods[0];
        assert_eq!(sig.name, "test");
        assert_eq!(sig.params, vec![INT, STRING]);
        assert_eq!(sig.ret, BOOLEAN);
    }
}
