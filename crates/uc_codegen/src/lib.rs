// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

//! The phase-selectable C++17 backend.
//!
//! The emitter consumes a type-checked AST; it never diagnoses user
//! errors. A panic here means an internal invariant was violated (an
//! untyped expression, an unresolved type reference) and is a compiler
//! bug by definition.

pub mod emit;
pub mod lowering;
pub mod mangle;

use uc_frontend::ast::Program;
use uc_frontend::types::TypeTable;

/// A stopping point in the backend. Phase 1 emits type declarations and
/// definitions only; phase 2 adds function and method signatures; the
/// full phase 3 adds bodies and the bootstrap entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Types = 1,
    Signatures = 2,
    Full = 3,
}

impl Phase {
    pub fn from_number(n: u32) -> Option<Self> {
        match n {
            1 => Some(Phase::Types),
            2 => Some(Phase::Signatures),
            3 => Some(Phase::Full),
            _ => None,
        }
    }

    pub fn number(self) -> u32 {
        self as u32
    }
}

pub struct Codegen<'a> {
    pub table: &'a TypeTable,
    pub phase: Phase,
}

impl<'a> Codegen<'a> {
    pub fn new(table: &'a TypeTable, phase: Phase) -> Self {
        Self { table, phase }
    }

    /// Serialize the typed AST to C++ text for the selected phase.
    pub fn generate(&self, program: &Program) -> String {
        let mut w = emit::Writer::new();
        emit::gen_header(&mut w);
        emit::gen_type_decls(self, program, &mut w);
        if self.phase >= Phase::Signatures {
            emit::gen_function_decls(self, program, &mut w);
        }
        lowering::gen_type_defs(self, program, &mut w);
        if self.phase >= Phase::Full {
            lowering::gen_function_defs(self, program, &mut w);
        }
        emit::gen_footer(&mut w, self.phase);
        w.finish()
    }
}
