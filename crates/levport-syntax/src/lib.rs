//! Front end for Lua level descriptions.
//!
//! `levport-syntax` turns source text into a syntax tree. It covers the
//! subset of Lua 5.4 used by dungeon level files and rejects the rest
//! (labels, `goto`, bitwise operators) with a fatal [`Diagnostic`].
//!
//! # Architecture
//!
//! ```text
//! source ──> Lexer ──> Vec<Token> ──> Parser ──> Chunk (ast.rs)
//!              │                        │
//!              └──── Diagnostic ────────┘
//! ```
//!
//! The [`Diagnostics`] sink defined here is shared by every later stage of
//! the pipeline.

pub mod ast;
pub mod diagnostic;
pub mod lexer;
pub mod parser;
pub mod structure_eq;
pub mod token;

// Re-exports: syntax tree
pub use ast::{
    BinaryOp, Block, Chunk, Expression, ExpressionKind, Field, FunctionBody, FunctionName,
    Statement, StatementKind, UnaryOp,
};

// Re-exports: diagnostics
pub use diagnostic::{Diagnostic, Diagnostics, Severity, Stage};

pub use lexer::{Lexer, tokenize};
pub use parser::Parser;
pub use structure_eq::StructureEq;
pub use token::{Keyword, Symbol, Token, TokenKind};

/// Lex and parse a whole file.
pub fn parse_source(source: &str) -> Result<Chunk, Diagnostic> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse_chunk()
}
