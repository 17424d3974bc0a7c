// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

use chumsky::prelude::*;
use chumsky::{extra, pratt};

use crate::ast::*;
use crate::diag::{Diagnostic, Pos};
use crate::lexer::{Tok, Tokens};

/// chumsky 0.12 errors are lifetime-parameterized
pub type ParseError<'src> = chumsky::error::Rich<'src, Tok>;
pub type PExtra<'src> = extra::Err<ParseError<'src>>;

/// Spans produced by slice input are token-index ranges; this carries the
/// side table that maps a token index back to a source position.
#[derive(Clone, Copy)]
pub struct PCtx<'src> {
    positions: &'src [Pos],
    eof: Pos,
}

impl<'src> PCtx<'src> {
    fn at(self, span: SimpleSpan) -> Pos {
        self.positions.get(span.start).copied().unwrap_or(self.eof)
    }
}

/// Public API: parse a lexed token stream into a Program.
pub fn parse_program(tokens: &Tokens) -> Result<Program, Vec<Diagnostic>> {
    let ctx = PCtx { positions: &tokens.positions, eof: tokens.eof };
    match program_parser(ctx).parse(tokens.toks.as_slice()).into_result() {
        Ok(program) => Ok(program),
        Err(errs) => Err(errs.into_iter().map(|e| render_error(e, ctx)).collect()),
    }
}

fn render_error(err: ParseError<'_>, ctx: PCtx<'_>) -> Diagnostic {
    let pos = ctx.at(*err.span());
    let found = match err.found() {
        Some(tok) => tok.to_string(),
        None => "end of input".to_string(),
    };
    let mut expected: Vec<String> = err.expected().map(|p| p.to_string()).collect();
    expected.sort();
    expected.dedup();
    let message = if expected.is_empty() {
        format!("unexpected {found}")
    } else {
        format!("expected {}, got {found}", expected.join(" or "))
    };
    Diagnostic::syntax(pos, message)
}

pub fn program_parser<'src>(
    ctx: PCtx<'src>,
) -> impl Parser<'src, &'src [Tok], Program, PExtra<'src>> {
    let decl = choice((
        typedef_decl(ctx).map(Decl::Typedef),
        class_decl(ctx).map(Decl::Class),
        function_decl(ctx).map(Decl::Function),
    ));

    decl.recover_with(skip_then_retry_until(any().ignored(), end()))
        .repeated()
        .collect::<Vec<_>>()
        .map(|decls| Program { decls })
        .then_ignore(end())
}

fn ident<'src>(ctx: PCtx<'src>) -> impl Parser<'src, &'src [Tok], Ident, PExtra<'src>> + Clone {
    select! { Tok::Ident(s) => s }
        .map_with(move |raw, e| Ident { pos: ctx.at(e.span()), raw })
}

/// A primitive or class name, without array suffixes.
fn type_base<'src>(
    ctx: PCtx<'src>,
) -> impl Parser<'src, &'src [Tok], TypeExpr, PExtra<'src>> + Clone {
    select! {
        Tok::KwInt => String::from("int"),
        Tok::KwLong => String::from("long"),
        Tok::KwFloat => String::from("float"),
        Tok::KwBoolean => String::from("boolean"),
        Tok::KwString => String::from("string"),
        Tok::KwVoid => String::from("void"),
        Tok::Ident(s) => s,
    }
    .map_with(move |name, e| TypeExpr::new(ctx.at(e.span()), TypeExprKind::Named(name)))
}

/// A type reference: a base name followed by any number of `[]` suffixes.
fn type_expr<'src>(
    ctx: PCtx<'src>,
) -> impl Parser<'src, &'src [Tok], TypeExpr, PExtra<'src>> + Clone {
    let suffix = just(Tok::LBracket).ignore_then(just(Tok::RBracket)).ignored();
    type_base(ctx)
        .then(suffix.repeated().collect::<Vec<_>>())
        .map(|(base, suffixes)| {
            suffixes.into_iter().fold(base, |elem, ()| {
                let pos = elem.pos;
                TypeExpr::new(pos, TypeExprKind::Array(Box::new(elem)))
            })
        })
}

fn typedef_decl<'src>(
    ctx: PCtx<'src>,
) -> impl Parser<'src, &'src [Tok], TypedefDecl, PExtra<'src>> + Clone {
    // An optional parenthesized parameter-type list after the aliased
    // type makes it a function type: `typedef int(int, int) binop;`.
    let fn_params = just(Tok::LParen)
        .ignore_then(
            type_expr(ctx)
                .separated_by(just(Tok::Comma))
                .allow_trailing()
                .collect::<Vec<_>>()
                .or_not()
                .map(|opt| opt.unwrap_or_default()),
        )
        .then_ignore(just(Tok::RParen));

    just(Tok::KwTypedef)
        .ignore_then(type_expr(ctx))
        .then(fn_params.or_not())
        .then(ident(ctx))
        .then_ignore(just(Tok::Semi))
        .map_with(move |((base, fn_params), name), e| {
            let aliased = match fn_params {
                Some(params) => {
                    let pos = base.pos;
                    TypeExpr::new(pos, TypeExprKind::Function { ret: Box::new(base), params })
                }
                None => base,
            };
            TypedefDecl { pos: ctx.at(e.span()), aliased, name }
        })
}

fn param_list<'src>(
    ctx: PCtx<'src>,
) -> impl Parser<'src, &'src [Tok], Vec<Param>, PExtra<'src>> + Clone {
    let param = type_expr(ctx)
        .then(ident(ctx))
        .map(|(ty, name)| Param { pos: ty.pos, ty, name });

    just(Tok::LParen)
        .ignore_then(
            param
                .separated_by(just(Tok::Comma))
                .allow_trailing()
                .collect::<Vec<_>>()
                .or_not()
                .map(|opt| opt.unwrap_or_default()),
        )
        .then_ignore(just(Tok::RParen))
}

/// The optional second parenthesized group declaring locals, as in
/// `void main(string[] args)() { ... }`.
fn locals_group<'src>(
    ctx: PCtx<'src>,
) -> impl Parser<'src, &'src [Tok], Vec<VarDecl>, PExtra<'src>> + Clone {
    let local = type_expr(ctx)
        .then(ident(ctx))
        .map(|(ty, name)| VarDecl { pos: ty.pos, ty, name, init: None });

    just(Tok::LParen)
        .ignore_then(
            local
                .separated_by(just(Tok::Comma))
                .allow_trailing()
                .collect::<Vec<_>>()
                .or_not()
                .map(|opt| opt.unwrap_or_default()),
        )
        .then_ignore(just(Tok::RParen))
}

fn function_decl<'src>(
    ctx: PCtx<'src>,
) -> impl Parser<'src, &'src [Tok], FunctionDecl, PExtra<'src>> + Clone {
    type_expr(ctx)
        .then(ident(ctx))
        .then(param_list(ctx))
        .then(locals_group(ctx).or_not())
        .then(block(ctx))
        .map_with(move |((((ret, name), params), locals), body), e| FunctionDecl {
            pos: ctx.at(e.span()),
            ret,
            name,
            params,
            locals: locals.unwrap_or_default(),
            body,
        })
}

enum MemberRest {
    Method { params: Vec<Param>, locals: Vec<VarDecl>, body: Block },
    Field { default: Option<Expr> },
}

enum Member {
    Field(FieldDecl),
    Method(FunctionDecl),
}

fn class_decl<'src>(
    ctx: PCtx<'src>,
) -> impl Parser<'src, &'src [Tok], ClassDecl, PExtra<'src>> + Clone {
    let method_rest = param_list(ctx)
        .then(locals_group(ctx).or_not())
        .then(block(ctx))
        .map(|((params, locals), body)| MemberRest::Method {
            params,
            locals: locals.unwrap_or_default(),
            body,
        });

    let field_rest = just(Tok::Assign)
        .ignore_then(expr_parser(ctx))
        .or_not()
        .then_ignore(just(Tok::Semi))
        .map(|default| MemberRest::Field { default });

    let member = type_expr(ctx)
        .then(ident(ctx))
        .then(method_rest.or(field_rest))
        .map(|((ty, name), rest)| match rest {
            MemberRest::Method { params, locals, body } => Member::Method(FunctionDecl {
                pos: ty.pos,
                ret: ty,
                name,
                params,
                locals,
                body,
            }),
            MemberRest::Field { default } => {
                Member::Field(FieldDecl { pos: ty.pos, ty, name, default })
            }
        });

    just(Tok::KwClass)
        .ignore_then(ident(ctx))
        .then(just(Tok::Colon).ignore_then(ident(ctx)).or_not())
        .then(
            just(Tok::LBrace)
                .ignore_then(member.repeated().collect::<Vec<_>>())
                .then_ignore(just(Tok::RBrace)),
        )
        .map_with(move |((name, superclass), members), e| {
            let mut fields = Vec::new();
            let mut methods = Vec::new();
            for m in members {
                match m {
                    Member::Field(f) => fields.push(f),
                    Member::Method(m) => methods.push(m),
                }
            }
            ClassDecl { pos: ctx.at(e.span()), name, superclass, fields, methods, id: None }
        })
}

fn block<'src>(ctx: PCtx<'src>) -> impl Parser<'src, &'src [Tok], Block, PExtra<'src>> + Clone {
    let expr = expr_parser(ctx);

    recursive(move |blk| {
        let vardecl = type_expr(ctx)
            .then(ident(ctx))
            .then(just(Tok::Assign).ignore_then(expr.clone()).or_not())
            .map(|((ty, name), init)| VarDecl { pos: ty.pos, ty, name, init });

        let decl_stmt = vardecl
            .clone()
            .then_ignore(just(Tok::Semi))
            .map(Stmt::Decl);

        let if_stmt = recursive(|ifs| {
            let else_block = blk.clone().or(ifs.map(|s: IfStmt| {
                let pos = s.pos;
                Block { pos, stmts: vec![Stmt::If(s)] }
            }));

            just(Tok::KwIf)
                .ignore_then(just(Tok::LParen))
                .ignore_then(expr.clone())
                .then_ignore(just(Tok::RParen))
                .then(blk.clone())
                .then(just(Tok::KwElse).ignore_then(else_block).or_not())
                .map_with(move |((test, then_block), else_block), e| IfStmt {
                    pos: ctx.at(e.span()),
                    test,
                    then_block,
                    else_block,
                })
        });

        let while_stmt = just(Tok::KwWhile)
            .ignore_then(just(Tok::LParen))
            .ignore_then(expr.clone())
            .then_ignore(just(Tok::RParen))
            .then(blk.clone())
            .map_with(move |(test, body), e| {
                Stmt::While(WhileStmt { pos: ctx.at(e.span()), test, body })
            });

        let for_init = vardecl
            .clone()
            .map(ForInit::Decl)
            .or(expr.clone().map(ForInit::Expr));

        let for_stmt = just(Tok::KwFor)
            .ignore_then(just(Tok::LParen))
            .ignore_then(for_init.or_not())
            .then_ignore(just(Tok::Semi))
            .then(expr.clone().or_not())
            .then_ignore(just(Tok::Semi))
            .then(expr.clone().or_not())
            .then_ignore(just(Tok::RParen))
            .then(blk.clone())
            .map_with(move |(((init, test), update), body), e| {
                Stmt::For(ForStmt { pos: ctx.at(e.span()), init, test, update, body })
            });

        let return_stmt = just(Tok::KwReturn)
            .ignore_then(expr.clone().or_not())
            .then_ignore(just(Tok::Semi))
            .map_with(move |expr, e| Stmt::Return(ReturnStmt { pos: ctx.at(e.span()), expr }));

        let break_stmt = just(Tok::KwBreak)
            .then_ignore(just(Tok::Semi))
            .map_with(move |_, e| Stmt::Break(ctx.at(e.span())));

        let continue_stmt = just(Tok::KwContinue)
            .then_ignore(just(Tok::Semi))
            .map_with(move |_, e| Stmt::Continue(ctx.at(e.span())));

        let expr_stmt = expr
            .clone()
            .then_ignore(just(Tok::Semi))
            .map_with(move |expr, e| Stmt::Expr(ExprStmt { pos: ctx.at(e.span()), expr }));

        let stmt = choice((
            blk.clone().map(Stmt::Block),
            if_stmt.map(Stmt::If),
            while_stmt,
            for_stmt,
            return_stmt,
            break_stmt,
            continue_stmt,
            decl_stmt,
            expr_stmt,
        ));

        just(Tok::LBrace)
            .ignore_then(stmt.repeated().collect::<Vec<_>>())
            .then_ignore(just(Tok::RBrace))
            .map_with(move |stmts, e| Block { pos: ctx.at(e.span()), stmts })
    })
}

pub fn expr_parser<'src>(
    ctx: PCtx<'src>,
) -> impl Parser<'src, &'src [Tok], Expr, PExtra<'src>> + Clone {
    recursive(move |expr| {
        // args: ( [expr (, expr)*]? )
        let args = just(Tok::LParen)
            .ignore_then(
                expr.clone()
                    .separated_by(just(Tok::Comma))
                    .allow_trailing()
                    .collect::<Vec<_>>()
                    .or_not()
                    .map(|opt| opt.unwrap_or_default()),
            )
            .then_ignore(just(Tok::RParen));

        let literal = select! {
            Tok::IntLit(s) => ExprKind::IntLit(s),
            Tok::FloatLit(s) => ExprKind::FloatLit(s),
            Tok::StrLit(s) => ExprKind::StrLit(s),
            Tok::KwTrue => ExprKind::BoolLit(true),
            Tok::KwFalse => ExprKind::BoolLit(false),
            Tok::KwNull => ExprKind::Null,
        }
        .map_with(move |kind, e| Expr::new(ctx.at(e.span()), kind));

        let paren = just(Tok::LParen)
            .ignore_then(expr.clone())
            .then_ignore(just(Tok::RParen));

        // new foo(args) | new T[n] | new T[]
        let new_object = ident(ctx)
            .then(args.clone())
            .map_with(move |(class, args), e| {
                Expr::new(ctx.at(e.span()), ExprKind::New { class, args })
            });

        let bracket_group = just(Tok::LBracket)
            .ignore_then(expr.clone().or_not())
            .then_ignore(just(Tok::RBracket));

        let new_array = type_base(ctx)
            .then(bracket_group.repeated().at_least(1).collect::<Vec<_>>())
            .try_map(move |(base, mut groups), span| {
                let size = groups.pop().unwrap_or(None);
                let mut elem = base;
                for group in groups {
                    if group.is_some() {
                        return Err(ParseError::custom(
                            span,
                            "only the last bracket of a new-array expression may carry a size",
                        ));
                    }
                    let pos = elem.pos;
                    elem = TypeExpr::new(pos, TypeExprKind::Array(Box::new(elem)));
                }
                Ok(Expr::new(
                    ctx.at(span),
                    ExprKind::NewArray { elem, size: size.map(Box::new) },
                ))
            });

        let new_expr = just(Tok::KwNew).ignore_then(new_object.or(new_array));

        let call = ident(ctx)
            .then(args.clone())
            .map_with(move |(callee, args), e| {
                Expr::new(ctx.at(e.span()), ExprKind::Call { callee, args, target: None })
            });

        let name_expr = ident(ctx).map_with(move |name, e| {
            Expr::new(ctx.at(e.span()), ExprKind::Name { name, binding: None })
        });

        let atom = choice((literal, new_expr, paren, call, name_expr));

        // postfix: .m(args) | .field | [index]
        enum Post {
            Method(Ident, Vec<Expr>),
            Field(Ident),
            Index(Expr),
        }

        let method_step = just(Tok::Dot)
            .ignore_then(ident(ctx))
            .then(args.clone())
            .map(|(method, args)| Post::Method(method, args));

        let field_step = just(Tok::Dot).ignore_then(ident(ctx)).map(Post::Field);

        let index_step = just(Tok::LBracket)
            .ignore_then(expr.clone())
            .then_ignore(just(Tok::RBracket))
            .map(Post::Index);

        let postfix = atom
            .then(
                choice((method_step, field_step, index_step))
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map_with(move |(base, steps), e| {
                let pos = ctx.at(e.span());
                steps.into_iter().fold(base, |recv, step| {
                    let kind = match step {
                        Post::Method(method, args) => ExprKind::MethodCall {
                            recv: Box::new(recv),
                            method,
                            args,
                        },
                        Post::Field(field) => ExprKind::FieldAccess {
                            recv: Box::new(recv),
                            field,
                            length: None,
                        },
                        Post::Index(index) => ExprKind::Index {
                            recv: Box::new(recv),
                            index: Box::new(index),
                        },
                    };
                    Expr::new(pos, kind)
                })
            });

        let unary_op = select! {
            Tok::Bang => UnOp::Not,
            Tok::Minus => UnOp::Minus,
            Tok::Plus => UnOp::Plus,
            Tok::Inc => UnOp::PreInc,
            Tok::Dec => UnOp::PreDec,
            Tok::Hash => UnOp::ObjectId,
        };
        let mul_op = select! {
            Tok::Star => BinOp::Mul,
            Tok::Slash => BinOp::Div,
            Tok::Percent => BinOp::Mod,
        };
        let add_op = select! {
            Tok::Plus => BinOp::Add,
            Tok::Minus => BinOp::Sub,
        };
        let shift_op = select! {
            Tok::Shl => BinOp::Push,
            Tok::Shr => BinOp::Pop,
        };
        let rel_op = select! {
            Tok::Lt => BinOp::Lt,
            Tok::Le => BinOp::Le,
            Tok::Gt => BinOp::Gt,
            Tok::Ge => BinOp::Ge,
        };
        let eq_op = select! {
            Tok::EqEq => BinOp::Eq,
            Tok::NotEq => BinOp::Ne,
        };
        let and_op = select! { Tok::AndAnd => BinOp::And };
        let or_op = select! { Tok::OrOr => BinOp::Or };
        let assign_op = select! { Tok::Assign => BinOp::Assign };

        let bin = move |lhs: Expr, op: BinOp, rhs: Expr, e: &mut chumsky::input::MapExtra<'src, '_, &'src [Tok], PExtra<'src>>| {
            Expr::new(
                ctx.at(e.span()),
                ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), overload: None },
            )
        };

        // Pratt fold signatures: prefix |op, rhs, extra|, infix |lhs, op, rhs, extra|.
        // Higher binding power binds tighter.
        postfix
            .pratt((
                pratt::prefix(9, unary_op, move |op: UnOp, rhs: Expr, e: &mut chumsky::input::MapExtra<'src, '_, &'src [Tok], PExtra<'src>>| {
                    Expr::new(ctx.at(e.span()), ExprKind::Unary { op, expr: Box::new(rhs) })
                }),
                pratt::infix(pratt::left(8), mul_op, bin),
                pratt::infix(pratt::left(7), add_op, bin),
                pratt::infix(pratt::left(6), shift_op, bin),
                pratt::infix(pratt::left(5), rel_op, bin),
                pratt::infix(pratt::left(4), eq_op, bin),
                pratt::infix(pratt::left(3), and_op, bin),
                pratt::infix(pratt::left(2), or_op, bin),
                pratt::infix(pratt::right(1), assign_op, bin),
            ))
            .boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse(src: &str) -> Program {
        let toks = lex(src).unwrap();
        parse_program(&toks).unwrap()
    }

    fn parse_err(src: &str) -> Vec<Diagnostic> {
        let toks = lex(src).unwrap();
        parse_program(&toks).unwrap_err()
    }

    #[test]
    fn parses_hello_world() {
        let prog = parse(r#"void main(string[] args)() { println("Hello world!"); }"#);
        assert_eq!(prog.decls.len(), 1);
        match &prog.decls[0] {
            Decl::Function(f) => {
                assert_eq!(f.name.raw, "main");
                assert_eq!(f.params.len(), 1);
                assert!(matches!(f.params[0].ty.kind, TypeExprKind::Array(_)));
                assert!(f.locals.is_empty());
                assert_eq!(f.body.stmts.len(), 1);
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn parses_function_without_locals_group() {
        let prog = parse("int zero() { return 0; }");
        match &prog.decls[0] {
            Decl::Function(f) => assert!(f.locals.is_empty()),
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn parses_locals_group() {
        let prog = parse("int sum(int a, int b)(int tmp, int other) { return a; }");
        match &prog.decls[0] {
            Decl::Function(f) => {
                assert_eq!(f.params.len(), 2);
                assert_eq!(f.locals.len(), 2);
                assert_eq!(f.locals[0].name.raw, "tmp");
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn parses_class_with_fields_and_defaults() {
        let prog = parse("class foo { int x; string s = \"hi\"; }");
        match &prog.decls[0] {
            Decl::Class(c) => {
                assert_eq!(c.name.raw, "foo");
                assert!(c.superclass.is_none());
                assert_eq!(c.fields.len(), 2);
                assert!(c.fields[0].default.is_none());
                assert!(c.fields[1].default.is_some());
            }
            other => panic!("expected class, got {other:?}"),
        }
    }

    #[test]
    fn parses_class_with_superclass_and_method() {
        let prog = parse("class circle : shape { int r; int area() { return r; } }");
        match &prog.decls[0] {
            Decl::Class(c) => {
                assert_eq!(c.superclass.as_ref().unwrap().raw, "shape");
                assert_eq!(c.fields.len(), 1);
                assert_eq!(c.methods.len(), 1);
                assert_eq!(c.methods[0].name.raw, "area");
            }
            other => panic!("expected class, got {other:?}"),
        }
    }

    #[test]
    fn parses_typedef_and_function_typedef() {
        let prog = parse("typedef int[] row; typedef int(int, int) binop;");
        match &prog.decls[0] {
            Decl::Typedef(t) => {
                assert_eq!(t.name.raw, "row");
                assert!(matches!(t.aliased.kind, TypeExprKind::Array(_)));
            }
            other => panic!("expected typedef, got {other:?}"),
        }
        match &prog.decls[1] {
            Decl::Typedef(t) => {
                assert_eq!(t.name.raw, "binop");
                match &t.aliased.kind {
                    TypeExprKind::Function { params, .. } => assert_eq!(params.len(), 2),
                    other => panic!("expected function type, got {other:?}"),
                }
            }
            other => panic!("expected typedef, got {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let prog = parse("int f() { return 1 + 2 * 3; }");
        let Decl::Function(f) = &prog.decls[0] else { panic!() };
        let Stmt::Return(ret) = &f.body.stmts[0] else { panic!() };
        match &ret.expr.as_ref().unwrap().kind {
            ExprKind::Binary { op: BinOp::Add, rhs, .. } => {
                assert!(matches!(rhs.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("expected addition at the root, got {other:?}"),
        }
    }

    #[test]
    fn assignment_is_right_associative() {
        let prog = parse("void f()() { a = b = 1; }");
        let Decl::Function(f) = &prog.decls[0] else { panic!() };
        let Stmt::Expr(es) = &f.body.stmts[0] else { panic!() };
        match &es.expr.kind {
            ExprKind::Binary { op: BinOp::Assign, rhs, .. } => {
                assert!(matches!(rhs.kind, ExprKind::Binary { op: BinOp::Assign, .. }));
            }
            other => panic!("expected assignment at the root, got {other:?}"),
        }
    }

    #[test]
    fn declaration_vs_expression_statement() {
        let prog = parse("void f()() { foo x; x = y; a[0] = 1; }");
        let Decl::Function(f) = &prog.decls[0] else { panic!() };
        assert!(matches!(f.body.stmts[0], Stmt::Decl(_)));
        assert!(matches!(f.body.stmts[1], Stmt::Expr(_)));
        assert!(matches!(f.body.stmts[2], Stmt::Expr(_)));
    }

    #[test]
    fn parses_new_object_and_new_array() {
        let prog = parse("void f()() { x = new foo(1, 2); a = new int[5]; b = new string[]; }");
        let Decl::Function(f) = &prog.decls[0] else { panic!() };
        let exprs: Vec<_> = f
            .body
            .stmts
            .iter()
            .map(|s| match s {
                Stmt::Expr(es) => match &es.expr.kind {
                    ExprKind::Binary { rhs, .. } => &rhs.kind,
                    other => panic!("expected assignment, got {other:?}"),
                },
                other => panic!("expected expression statement, got {other:?}"),
            })
            .collect();
        assert!(matches!(exprs[0], ExprKind::New { args, .. } if args.len() == 2));
        assert!(matches!(exprs[1], ExprKind::NewArray { size: Some(_), .. }));
        assert!(matches!(exprs[2], ExprKind::NewArray { size: None, .. }));
    }

    #[test]
    fn rejects_size_in_inner_array_dimension() {
        let errs = parse_err("void f()() { a = new int[3][]; }");
        assert!(!errs.is_empty());
    }

    #[test]
    fn parses_postfix_chain() {
        let prog = parse("void f()() { x.field.m(1)[2] = 3; }");
        let Decl::Function(f) = &prog.decls[0] else { panic!() };
        let Stmt::Expr(es) = &f.body.stmts[0] else { panic!() };
        let ExprKind::Binary { lhs, .. } = &es.expr.kind else { panic!() };
        let ExprKind::Index { recv, .. } = &lhs.kind else {
            panic!("expected index at the top of the chain")
        };
        assert!(matches!(recv.kind, ExprKind::MethodCall { .. }));
    }

    #[test]
    fn parses_else_if_chain() {
        let prog = parse("void f(int x)() { if (x < 0) { } else if (x > 0) { } else { } }");
        let Decl::Function(f) = &prog.decls[0] else { panic!() };
        let Stmt::If(ifs) = &f.body.stmts[0] else { panic!() };
        let else_block = ifs.else_block.as_ref().unwrap();
        assert!(matches!(else_block.stmts[0], Stmt::If(_)));
    }

    #[test]
    fn parses_for_loop_with_decl_init() {
        let prog = parse("void f()() { for (int i = 0; i < 10; ++i) { continue; } }");
        let Decl::Function(f) = &prog.decls[0] else { panic!() };
        let Stmt::For(fs) = &f.body.stmts[0] else { panic!() };
        assert!(matches!(fs.init, Some(ForInit::Decl(_))));
        assert!(fs.test.is_some());
        assert!(fs.update.is_some());
    }

    #[test]
    fn parses_push_pop_and_id_operators() {
        let prog = parse("void f()() { a << 1; a >> null; x = #a; }");
        let Decl::Function(f) = &prog.decls[0] else { panic!() };
        let Stmt::Expr(push) = &f.body.stmts[0] else { panic!() };
        assert!(matches!(push.expr.kind, ExprKind::Binary { op: BinOp::Push, .. }));
        let Stmt::Expr(pop) = &f.body.stmts[1] else { panic!() };
        assert!(matches!(pop.expr.kind, ExprKind::Binary { op: BinOp::Pop, .. }));
        let Stmt::Expr(id) = &f.body.stmts[2] else { panic!() };
        let ExprKind::Binary { rhs, .. } = &id.expr.kind else { panic!() };
        assert!(matches!(rhs.kind, ExprKind::Unary { op: UnOp::ObjectId, .. }));
    }

    #[test]
    fn reports_position_of_syntax_error() {
        let errs = parse_err("class foo { int }");
        assert!(!errs.is_empty());
        assert_eq!(errs[0].pos.line, 1);
        assert!(errs[0].message.contains("got"));
    }

    #[test]
    fn recovers_at_next_top_level_declaration() {
        // The first declaration is malformed; the second should still
        // parse far enough for its own errors (if any) to be reported,
        // i.e. we get at least one error rather than a panic.
        let toks = lex("int broken( { } class ok { int x; }").unwrap();
        let result = parse_program(&toks);
        assert!(result.is_err());
    }

    #[test]
    fn parses_length_field_access() {
        let prog = parse("int f(int[] a)() { return a.length; }");
        let Decl::Function(f) = &prog.decls[0] else { panic!() };
        let Stmt::Return(ret) = &f.body.stmts[0] else { panic!() };
        match &ret.expr.as_ref().unwrap().kind {
            ExprKind::FieldAccess { field, .. } => assert_eq!(field.raw, "length"),
            other => panic!("expected field access, got {other:?}"),
        }
    }

    #[test]
    fn parses_empty_program() {
        let prog = parse("");
        assert!(prog.decls.is_empty());
    }
}
