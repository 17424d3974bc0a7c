// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

//! Lowering from the typed uC AST to C++ text.
//!
//! - Class definitions: field layouts, the implicit constructors, the
//!   structural `==`/`!=` operators, and (phase 2 on) method signatures
//! - Function and method definitions with statement bodies (phase 3)
//! - Expression lowering onto the runtime-header vocabulary (`uc_add`,
//!   `uc_length_field`, `uc_make_object`, `uc_make_array_of`,
//!   `uc_array_index`, `uc_array_push`, `uc_array_pop`, `uc_id`)

use uc_frontend::ast::*;
use uc_frontend::types::{ClassId, TypeId, NULL};

use crate::emit::{param_text, Writer};
use crate::mangle;
use crate::{Codegen, Phase};

/// Full type definitions: the class struct bodies, in source order.
pub fn gen_type_defs(cg: &Codegen<'_>, program: &Program, w: &mut Writer) {
    w.indent = 1;
    w.line("// Full type definitions");
    w.blank();
    for decl in &program.decls {
        if let Decl::Class(class) = decl {
            gen_class_def(cg, class, w);
        }
    }
}

/// Full function definitions: free functions and out-of-line method
/// bodies, in source order.
pub fn gen_function_defs(cg: &Codegen<'_>, program: &Program, w: &mut Writer) {
    w.indent = 1;
    w.line("// Full function definitions");
    w.blank();
    for decl in &program.decls {
        match decl {
            Decl::Function(func) => gen_function_def(cg, func, None, w),
            Decl::Class(class) => {
                for method in &class.methods {
                    gen_function_def(cg, method, Some(&class.name.raw), w);
                }
            }
            Decl::Typedef(_) => {}
        }
    }
}

fn gen_class_def(cg: &Codegen<'_>, class: &ClassDecl, w: &mut Writer) {
    let cid = class.id.expect("class without an id after analysis");
    let info = cg.table.class(cid);
    let struct_name = mangle::type_def(&class.name.raw);

    match info.superclass {
        Some(sid) => w.line(format!(
            "struct {} : {} {{",
            struct_name,
            mangle::type_def(&cg.table.class(sid).name)
        )),
        None => w.line(format!("struct {} {{", struct_name)),
    }
    w.indent += 1;

    // declared fields, with their default values as member initializers
    for field in &class.fields {
        let ty = field.ty.resolved.expect("field type unresolved after analysis");
        let ty_text = mangle::mangle_type(cg.table, ty);
        match &field.default {
            Some(default) => w.line(format!(
                "{} {} = {};",
                ty_text,
                mangle::var(&field.name.raw),
                expr_text(cg, default)
            )),
            None => w.line(format!("{} {};", ty_text, mangle::var(&field.name.raw))),
        }
    }

    // default constructor
    w.line(format!("{struct_name}() = default;"));

    // positional constructor over the full field table, inherited first
    if !info.field_table.is_empty() {
        let params: Vec<String> = info
            .field_table
            .iter()
            .enumerate()
            .map(|(i, f)| format!("const {} &var{i}", mangle::mangle_type(cg.table, f.ty)))
            .collect();
        w.line(format!("{struct_name}({}) {{", params.join(", ")));
        w.indent += 1;
        for (i, f) in info.field_table.iter().enumerate() {
            w.line(format!("{} = var{i};", mangle::var(&f.name)));
        }
        w.indent -= 1;
        w.line("}");
    }

    // structural equality over the full field table
    w.line(format!(
        "UC_PRIMITIVE(boolean) operator==(const {struct_name} &rhs) const {{"
    ));
    w.indent += 1;
    if info.field_table.is_empty() {
        w.line("return true;");
    } else {
        let cmps: Vec<String> = info
            .field_table
            .iter()
            .map(|f| {
                let v = mangle::var(&f.name);
                format!("{v} == rhs.{v}")
            })
            .collect();
        w.line(format!("return {};", cmps.join(" && ")));
    }
    w.indent -= 1;
    w.line("}");

    w.line(format!(
        "UC_PRIMITIVE(boolean) operator!=(const {struct_name} &rhs) const {{"
    ));
    w.indent += 1;
    w.line("return !((*this)==rhs);");
    w.indent -= 1;
    w.line("}");

    if cg.phase >= Phase::Signatures {
        gen_method_decls(cg, class, cid, w);
    }

    w.indent -= 1;
    w.line("};");
    w.blank();
}

/// Method signatures inside the class body. A derived declaration hides
/// every inherited overload of the same name in C++, so a using
/// declaration re-exposes the ones the checker keeps visible.
fn gen_method_decls(cg: &Codegen<'_>, class: &ClassDecl, cid: ClassId, w: &mut Writer) {
    let info = cg.table.class(cid);
    if let Some(sid) = info.superclass {
        let super_struct = mangle::type_def(&cg.table.class(sid).name);
        let mut seen: Vec<&str> = Vec::new();
        for method in &class.methods {
            let name = method.name.raw.as_str();
            if seen.contains(&name) {
                continue;
            }
            seen.push(name);
            let own: Vec<&[TypeId]> = info
                .methods
                .iter()
                .filter(|m| m.name == name)
                .map(|m| m.params.as_slice())
                .collect();
            let hidden = info.ancestors.iter().any(|anc| {
                cg.table
                    .class(*anc)
                    .methods
                    .iter()
                    .any(|m| m.name == name && !own.contains(&m.params.as_slice()))
            });
            if hidden {
                w.line(format!("using {super_struct}::{};", mangle::var(name)));
            }
        }
    }

    for method in &class.methods {
        let ret = method.ret.resolved.expect("return type unresolved after analysis");
        w.line(format!(
            "virtual {} {}({});",
            mangle::mangle_type(cg.table, ret),
            mangle::var(&method.name.raw),
            param_text(cg, method)
        ));
    }
}

/// A free function, or an out-of-line method body when `receiver` names
/// the enclosing class.
fn gen_function_def(cg: &Codegen<'_>, func: &FunctionDecl, receiver: Option<&str>, w: &mut Writer) {
    let ret = func.ret.resolved.expect("return type unresolved after analysis");
    w.indent = 1;
    w.line(mangle::mangle_type(cg.table, ret));
    w.indent += 1;

    let name = match receiver {
        Some(class_name) => {
            format!("{}::{}", mangle::type_def(class_name), mangle::var(&func.name.raw))
        }
        None => mangle::function(&func.name.raw),
    };
    w.line(format!("{}({}) {{", name, param_text(cg, func)));

    w.indent += 1;
    for local in &func.locals {
        let ty = local.ty.resolved.expect("local type unresolved after analysis");
        w.line(format!(
            "{} {};",
            mangle::mangle_type(cg.table, ty),
            mangle::var(&local.name.raw)
        ));
    }
    gen_block_inner(cg, &func.body, w);

    w.indent = 1;
    w.line("}");
    w.blank();
}

fn gen_block_inner(cg: &Codegen<'_>, block: &Block, w: &mut Writer) {
    for stmt in &block.stmts {
        gen_stmt(cg, stmt, w);
    }
}

fn gen_stmt(cg: &Codegen<'_>, stmt: &Stmt, w: &mut Writer) {
    match stmt {
        Stmt::Block(b) => {
            w.line("{");
            w.indent += 1;
            gen_block_inner(cg, b, w);
            w.indent -= 1;
            w.line("}");
        }
        Stmt::If(s) => {
            w.line(format!("if ({}) {{", expr_text(cg, &s.test)));
            w.indent += 1;
            gen_block_inner(cg, &s.then_block, w);
            w.indent -= 1;
            match &s.else_block {
                Some(else_block) => {
                    w.line("} else {");
                    w.indent += 1;
                    gen_block_inner(cg, else_block, w);
                    w.indent -= 1;
                    w.line("}");
                }
                None => w.line("}"),
            }
        }
        Stmt::While(s) => {
            w.line(format!("while ({}) {{", expr_text(cg, &s.test)));
            w.indent += 1;
            gen_block_inner(cg, &s.body, w);
            w.indent -= 1;
            w.line("}");
        }
        Stmt::For(s) => {
            let init = match &s.init {
                Some(ForInit::Decl(v)) => var_decl_text(cg, v),
                Some(ForInit::Expr(e)) => expr_text(cg, e),
                None => String::new(),
            };
            let test = s.test.as_ref().map(|e| expr_text(cg, e)).unwrap_or_default();
            let update = s.update.as_ref().map(|e| expr_text(cg, e)).unwrap_or_default();
            w.line(format!("for ({init}; {test}; {update}) {{"));
            w.indent += 1;
            gen_block_inner(cg, &s.body, w);
            w.indent -= 1;
            w.line("}");
        }
        Stmt::Return(s) => match &s.expr {
            Some(expr) => w.line(format!("return {};", expr_text(cg, expr))),
            None => w.line("return;"),
        },
        Stmt::Break(_) => w.line("break;"),
        Stmt::Continue(_) => w.line("continue;"),
        Stmt::Decl(v) => w.line(format!("{};", var_decl_text(cg, v))),
        Stmt::Expr(s) => w.line(format!("{};", expr_text(cg, &s.expr))),
    }
}

fn var_decl_text(cg: &Codegen<'_>, v: &VarDecl) -> String {
    let ty = v.ty.resolved.expect("variable type unresolved after analysis");
    let decl = format!("{} {}", mangle::mangle_type(cg.table, ty), mangle::var(&v.name.raw));
    match &v.init {
        Some(init) => format!("{decl} = {}", expr_text(cg, init)),
        None => decl,
    }
}

pub fn expr_text(cg: &Codegen<'_>, e: &Expr) -> String {
    match &e.kind {
        ExprKind::IntLit(text) | ExprKind::FloatLit(text) => text.clone(),
        ExprKind::StrLit(text) => format!("{text}s"),
        ExprKind::BoolLit(b) => b.to_string(),
        ExprKind::Null => match e.ty {
            // the checker gives a contextual null its reference type;
            // it lowers to a default-constructed handle of that type
            Some(ty) if ty != NULL => format!("{}{{}}", mangle::mangle_type(cg.table, ty)),
            _ => "nullptr".to_string(),
        },
        ExprKind::Name { name, binding } => match binding {
            Some(Binding::Function) => mangle::function(&name.raw),
            _ => mangle::var(&name.raw),
        },
        ExprKind::FieldAccess { recv, field, .. } => {
            if field.raw == "length" {
                format!("uc_length_field({})", expr_text(cg, recv))
            } else {
                format!("{}->{}", operand_text(cg, recv), mangle::var(&field.raw))
            }
        }
        ExprKind::Index { recv, index } => {
            format!("uc_array_index({}, {})", expr_text(cg, recv), expr_text(cg, index))
        }
        ExprKind::Call { callee, args, target } => {
            let callee_text = match target {
                Some(CallTarget::Method) => mangle::var(&callee.raw),
                _ => mangle::function(&callee.raw),
            };
            format!("{callee_text}({})", args_text(cg, args))
        }
        ExprKind::MethodCall { recv, method, args } => format!(
            "{}->{}({})",
            operand_text(cg, recv),
            mangle::var(&method.raw),
            args_text(cg, args)
        ),
        ExprKind::New { args, .. } => {
            let ty = e.ty.expect("new expression untyped after checking");
            format!(
                "uc_make_object<{}>({})",
                mangle::mangle_type(cg.table, ty),
                args_text(cg, args)
            )
        }
        ExprKind::NewArray { elem, size } => {
            let elem_ty = elem.resolved.expect("element type unresolved after analysis");
            let size_text = size.as_ref().map(|s| expr_text(cg, s)).unwrap_or_default();
            format!("uc_make_array_of<{}>({size_text})", mangle::mangle_type(cg.table, elem_ty))
        }
        ExprKind::Unary { op: UnOp::ObjectId, expr } => {
            format!("uc_id({})", expr_text(cg, expr))
        }
        ExprKind::Unary { op, expr } => format!("{}({})", op.op_str(), expr_text(cg, expr)),
        ExprKind::Binary { op, lhs, rhs, .. } => {
            let (l, r) = (expr_text(cg, lhs), expr_text(cg, rhs));
            match op {
                BinOp::Add => format!("uc_add({l}, {r})"),
                BinOp::Push => format!("uc_array_push({l}, {r})"),
                BinOp::Pop => format!("uc_array_pop({l}, {r})"),
                BinOp::Assign => format!("{l} = {r}"),
                _ => format!("({l}) {} ({r})", op.op_str()),
            }
        }
    }
}

fn args_text(cg: &Codegen<'_>, args: &[Expr]) -> String {
    let args: Vec<String> = args.iter().map(|a| expr_text(cg, a)).collect();
    args.join(", ")
}

/// A receiver of `->` must not glue onto an operator expression.
fn operand_text(cg: &Codegen<'_>, e: &Expr) -> String {
    let text = expr_text(cg, e);
    match e.kind {
        ExprKind::Binary { .. } | ExprKind::Unary { .. } => format!("({text})"),
        _ => text,
    }
}
