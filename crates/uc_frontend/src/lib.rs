// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

pub mod ast;
pub mod diag;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod symbols;
pub mod typechecker;
pub mod types;

pub use ast::Program;
pub use diag::{DiagKind, Diagnostic, Pos};
pub use lexer::{lex, Tok, Tokens};
pub use parser::{parse_program, ParseError};
pub use symbols::GlobalEnv;
pub use types::TypeTable;

/// The semantic results of the analysis passes, consumed by the backend.
pub struct Analysis {
    pub table: TypeTable,
    pub env: GlobalEnv,
}

/// Run passes A (symbol collection), B (type resolution), and C (type
/// checking) over a parsed program. On success every expression in the
/// AST carries a type; on failure all collected diagnostics are returned
/// in source order.
pub fn analyze_program(program: &mut Program) -> Result<Analysis, Vec<Diagnostic>> {
    let mut table = TypeTable::new();
    let mut env = GlobalEnv::new();
    let mut diags = Vec::new();

    symbols::collect_symbols(program, &mut table, &mut env, &mut diags);
    resolver::resolve_types(program, &mut table, &mut env, &mut diags);
    typechecker::check_program(program, &mut table, &env, &mut diags);

    if diags.is_empty() {
        Ok(Analysis { table, env })
    } else {
        diags.sort_by_key(|d| d.pos);
        Err(diags)
    }
}

/// Lex, parse, and analyze a source string in one step.
pub fn compile_frontend(source: &str) -> Result<(Program, Analysis), Vec<Diagnostic>> {
    let toks = lex(source).map_err(|d| vec![d])?;
    let mut program = parse_program(&toks)?;
    let analysis = analyze_program(&mut program)?;
    Ok((program, analysis))
}
