//! Frontend compilation pipeline
//!
//! This module contains the lexer, the parser, the parse snapshot used
//! by the shell's completeness check and the compiler driver that turns
//! source text into an executable [`parser::ast::Program`].

pub mod compiler;
pub mod lexer;
pub mod parser;
pub mod snapshot;

pub use compiler::{CompileError, Compiler};
pub use lexer::ExprState;
pub use snapshot::{snapshot, Diagnostic, DiagnosticKind, LexerSnapshot};
