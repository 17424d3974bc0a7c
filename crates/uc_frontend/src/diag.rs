// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

//! Diagnostics shared by every compiler pass.

use std::fmt;
use thiserror::Error;

/// A 1-based line/column pair in the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// The category of a diagnostic, printed between the position and the
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagKind {
    Lexical,
    Syntax,
    Symbol,
    Type,
}

impl fmt::Display for DiagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagKind::Lexical => "lexical",
            DiagKind::Syntax => "syntax",
            DiagKind::Symbol => "symbol",
            DiagKind::Type => "type",
        };
        f.write_str(s)
    }
}

/// A single compiler diagnostic. The driver prefixes the file name when
/// printing, producing `file:line:col: kind: message`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{pos}: {kind}: {message}")]
pub struct Diagnostic {
    pub kind: DiagKind,
    pub pos: Pos,
    pub message: String,
}

impl Diagnostic {
    pub fn lexical(pos: Pos, message: impl Into<String>) -> Self {
        Self { kind: DiagKind::Lexical, pos, message: message.into() }
    }

    pub fn syntax(pos: Pos, message: impl Into<String>) -> Self {
        Self { kind: DiagKind::Syntax, pos, message: message.into() }
    }

    pub fn symbol(pos: Pos, message: impl Into<String>) -> Self {
        Self { kind: DiagKind::Symbol, pos, message: message.into() }
    }

    pub fn type_error(pos: Pos, message: impl Into<String>) -> Self {
        Self { kind: DiagKind::Type, pos, message: message.into() }
    }
}
