//! Parser module
//!
//! A Pratt parser over the lexer's tokens. Prefix forms live in `nud`,
//! infix operators in `led` and statements and compound constructs in
//! `stmt`. The parser stops at the first error; the error variant tells
//! whether more input could still complete the statement.

pub mod ast;
mod led;
mod nud;
mod state;
mod stmt;

pub use state::{PResult, ParserState, BP_LOWEST};

use crate::frontend::lexer::{self, LexError, Token};
use crate::util::span::Span;
use ast::Program;
use std::collections::HashSet;

/// Parse error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// Input ended where the grammar needs more.
    #[error("syntax error, unexpected end-of-input{}", expecting_suffix(.expecting))]
    UnexpectedEof {
        expecting: Option<String>,
        span: Span,
    },

    /// An `end` with nothing open.
    #[error("syntax error, unexpected 'end'")]
    UnexpectedEnd { span: Span },

    /// A literal opened where it cannot start an expression.
    #[error("syntax error, unexpected {found}{}", expecting_suffix(.expecting))]
    UnexpectedLiteral {
        found: String,
        expecting: Option<String>,
        span: Span,
    },

    #[error("syntax error, unexpected {found}{}", expecting_suffix(.expecting))]
    UnexpectedToken {
        found: String,
        expecting: Option<String>,
        span: Span,
    },

    #[error("syntax error, method name expected after 'def'")]
    MissingMethodName { span: Span },

    #[error("{message}")]
    Invalid { message: String, span: Span },

    #[error(transparent)]
    Lex(#[from] LexError),
}

fn expecting_suffix(expecting: &Option<String>) -> String {
    match expecting {
        Some(what) => format!(", expecting {}", what),
        None => String::new(),
    }
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedEof { span, .. }
            | ParseError::UnexpectedEnd { span }
            | ParseError::UnexpectedLiteral { span, .. }
            | ParseError::UnexpectedToken { span, .. }
            | ParseError::MissingMethodName { span }
            | ParseError::Invalid { span, .. } => *span,
            ParseError::Lex(error) => {
                let at = error.position();
                Span::new(at, at)
            }
        }
    }

    /// Re-frame an error raised while parsing the body of `#{...}`. The
    /// enclosing literal is already closed, so no such error can be
    /// completed by more input.
    pub fn inside_interpolation(self) -> ParseError {
        match self {
            ParseError::UnexpectedEof { expecting, span } => ParseError::UnexpectedToken {
                found: "'}'".to_string(),
                expecting,
                span,
            },
            ParseError::UnexpectedEnd { span } => ParseError::UnexpectedToken {
                found: "'end'".to_string(),
                expecting: None,
                span,
            },
            ParseError::UnexpectedLiteral {
                found,
                expecting,
                span,
            } => ParseError::UnexpectedToken {
                found,
                expecting,
                span,
            },
            ParseError::MissingMethodName { span } => ParseError::Invalid {
                message: "syntax error, method name expected after 'def'".to_string(),
                span,
            },
            other => other,
        }
    }
}

/// Parse a token stream. `locals` are the variables already defined at
/// the top level.
pub fn parse_tokens(
    tokens: &[Token],
    locals: &HashSet<String>,
) -> Result<Program, ParseError> {
    let mut state = ParserState::new(tokens, locals);
    state.parse_program()
}

/// Lex and parse `source`. A lexer error wins over anything the parser
/// would report for the truncated token stream.
pub fn parse_source(
    source: &str,
    locals: &HashSet<String>,
) -> Result<Program, ParseError> {
    let lexed = lexer::tokenize(source, locals);
    if let Some(error) = lexed.error {
        return Err(ParseError::Lex(error));
    }
    parse_tokens(&lexed.tokens, locals)
}

#[cfg(test)]
mod tests;
