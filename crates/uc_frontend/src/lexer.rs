// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

use std::fmt;

use logos::Logos;

use crate::diag::{Diagnostic, Pos};

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Tok {
    // Keywords
    #[token("class")]
    KwClass,
    #[token("typedef")]
    KwTypedef,
    #[token("if")]
    KwIf,
    #[token("else")]
    KwElse,
    #[token("while")]
    KwWhile,
    #[token("for")]
    KwFor,
    #[token("return")]
    KwReturn,
    #[token("break")]
    KwBreak,
    #[token("continue")]
    KwContinue,
    #[token("new")]
    KwNew,
    #[token("null")]
    KwNull,
    #[token("true")]
    KwTrue,
    #[token("false")]
    KwFalse,

    // Primitive type names
    #[token("int")]
    KwInt,
    #[token("long")]
    KwLong,
    #[token("float")]
    KwFloat,
    #[token("boolean")]
    KwBoolean,
    #[token("string")]
    KwString,
    #[token("void")]
    KwVoid,

    // Punctuation
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,

    // Operators
    #[token("=")]
    Assign,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("++")]
    Inc,
    #[token("--")]
    Dec,
    #[token("#")]
    Hash,

    // Literals. The lexeme is kept verbatim: the backend emits it as-is
    // (an `l`/`L` suffix marks a long literal, string lexemes keep their
    // quotes and escapes).
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().to_string())]
    FloatLit(String),

    #[regex(r"[0-9]+[lL]?", |lex| lex.slice().to_string())]
    IntLit(String),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| lex.slice().to_string())]
    StrLit(String),

    // Identifiers
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tok::KwClass => write!(f, "'class'"),
            Tok::KwTypedef => write!(f, "'typedef'"),
            Tok::KwIf => write!(f, "'if'"),
            Tok::KwElse => write!(f, "'else'"),
            Tok::KwWhile => write!(f, "'while'"),
            Tok::KwFor => write!(f, "'for'"),
            Tok::KwReturn => write!(f, "'return'"),
            Tok::KwBreak => write!(f, "'break'"),
            Tok::KwContinue => write!(f, "'continue'"),
            Tok::KwNew => write!(f, "'new'"),
            Tok::KwNull => write!(f, "'null'"),
            Tok::KwTrue => write!(f, "'true'"),
            Tok::KwFalse => write!(f, "'false'"),
            Tok::KwInt => write!(f, "'int'"),
            Tok::KwLong => write!(f, "'long'"),
            Tok::KwFloat => write!(f, "'float'"),
            Tok::KwBoolean => write!(f, "'boolean'"),
            Tok::KwString => write!(f, "'string'"),
            Tok::KwVoid => write!(f, "'void'"),
            Tok::LBrace => write!(f, "'{{'"),
            Tok::RBrace => write!(f, "'}}'"),
            Tok::LParen => write!(f, "'('"),
            Tok::RParen => write!(f, "')'"),
            Tok::LBracket => write!(f, "'['"),
            Tok::RBracket => write!(f, "']'"),
            Tok::Semi => write!(f, "';'"),
            Tok::Comma => write!(f, "','"),
            Tok::Dot => write!(f, "'.'"),
            Tok::Colon => write!(f, "':'"),
            Tok::Assign => write!(f, "'='"),
            Tok::EqEq => write!(f, "'=='"),
            Tok::NotEq => write!(f, "'!='"),
            Tok::Lt => write!(f, "'<'"),
            Tok::Le => write!(f, "'<='"),
            Tok::Gt => write!(f, "'>'"),
            Tok::Ge => write!(f, "'>='"),
            Tok::Plus => write!(f, "'+'"),
            Tok::Minus => write!(f, "'-'"),
            Tok::Star => write!(f, "'*'"),
            Tok::Slash => write!(f, "'/'"),
            Tok::Percent => write!(f, "'%'"),
            Tok::AndAnd => write!(f, "'&&'"),
            Tok::OrOr => write!(f, "'||'"),
            Tok::Bang => write!(f, "'!'"),
            Tok::Shl => write!(f, "'<<'"),
            Tok::Shr => write!(f, "'>>'"),
            Tok::Inc => write!(f, "'++'"),
            Tok::Dec => write!(f, "'--'"),
            Tok::Hash => write!(f, "'#'"),
            Tok::FloatLit(s) => write!(f, "float literal '{s}'"),
            Tok::IntLit(s) => write!(f, "integer literal '{s}'"),
            Tok::StrLit(s) => write!(f, "string literal {s}"),
            Tok::Ident(s) => write!(f, "identifier '{s}'"),
        }
    }
}

/// The lexed token stream plus a parallel table of source positions, one
/// per token, and the position of end-of-file. Tokens only live for the
/// duration of parsing; diagnostics keep positions, not tokens.
#[derive(Debug)]
pub struct Tokens {
    pub toks: Vec<Tok>,
    pub positions: Vec<Pos>,
    pub eof: Pos,
}

/// Tracks line/column while walking forward through byte offsets.
struct PosTracker<'a> {
    source: &'a str,
    offset: usize,
    line: u32,
    col: u32,
}

impl<'a> PosTracker<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, offset: 0, line: 1, col: 1 }
    }

    /// Position of the given byte offset. Offsets must be visited in
    /// nondecreasing order, which the lexer loop guarantees.
    fn pos_at(&mut self, offset: usize) -> Pos {
        for c in self.source[self.offset..offset].chars() {
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        self.offset = offset;
        Pos::new(self.line, self.col)
    }
}

/// Scan for a block comment left open at end of input, honoring string
/// literals and line comments. Terminated comments are skipped by the
/// lexer itself; logos would otherwise tokenize the orphan `/*` as
/// division and multiplication.
fn unterminated_block_comment(source: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' && bytes[i] != b'\n' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => {
                let start = i;
                i += 2;
                loop {
                    if i + 1 >= bytes.len() {
                        return Some(start);
                    }
                    if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    None
}

/// Lex uC input into tokens with source positions. The first lexical
/// error terminates compilation.
pub fn lex(source: &str) -> Result<Tokens, Diagnostic> {
    if let Some(offset) = unterminated_block_comment(source) {
        let mut tracker = PosTracker::new(source);
        let pos = tracker.pos_at(offset);
        return Err(Diagnostic::lexical(pos, "unterminated block comment"));
    }

    let mut toks = Vec::new();
    let mut positions = Vec::new();
    let mut tracker = PosTracker::new(source);
    let mut lx = Tok::lexer(source);

    while let Some(res) = lx.next() {
        let span = lx.span();
        let pos = tracker.pos_at(span.start);
        match res {
            Ok(tok) => {
                toks.push(tok);
                positions.push(pos);
            }
            Err(()) => {
                let rest = &source[span.start..];
                let message = if rest.starts_with('"') {
                    "unterminated string literal".to_string()
                } else {
                    let c = rest.chars().next().unwrap_or('\u{fffd}');
                    format!("unrecognized character '{c}'")
                };
                return Err(Diagnostic::lexical(pos, message));
            }
        }
    }

    let eof = tracker.pos_at(source.len());
    Ok(Tokens { toks, positions, eof })
}
