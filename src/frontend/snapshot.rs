//! Diagnostic bundle from one parse attempt
//!
//! A [`LexerSnapshot`] is what the shell sees of a parse: the errors the
//! parser recorded, whether input ended inside an open literal, and the
//! lexer's expression-boundary state after the last token. Nothing is
//! executed to produce one.

use super::lexer::{self, ExprState, LexError};
use super::parser::{self, ParseError};
use crate::util::span::Span;
use std::collections::HashSet;
use tracing::trace;

/// Structured status code of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// The token stream ended where the grammar needed more.
    UnexpectedEof,
    /// An `end` keyword in a position where it cannot appear.
    UnexpectedEnd,
    /// A literal opened where no expression may start.
    UnexpectedLiteralStart,
    /// `def` with nothing after it.
    MissingMethodName,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Span,
}

impl From<&ParseError> for Diagnostic {
    fn from(error: &ParseError) -> Self {
        let kind = match error {
            ParseError::UnexpectedEof { .. } => DiagnosticKind::UnexpectedEof,
            ParseError::UnexpectedEnd { .. } => DiagnosticKind::UnexpectedEnd,
            ParseError::UnexpectedLiteral { .. } => DiagnosticKind::UnexpectedLiteralStart,
            ParseError::MissingMethodName { .. } => DiagnosticKind::MissingMethodName,
            ParseError::UnexpectedToken { .. }
            | ParseError::Invalid { .. }
            | ParseError::Lex(_) => DiagnosticKind::Other,
        };
        Diagnostic {
            kind,
            message: error.to_string(),
            span: error.span(),
        }
    }
}

impl From<&LexError> for Diagnostic {
    fn from(error: &LexError) -> Self {
        let at = error.position();
        Diagnostic {
            kind: DiagnosticKind::Other,
            message: error.to_string(),
            span: Span::new(at, at),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexerSnapshot {
    /// Recorded errors, in the order they were found.
    pub diagnostics: Vec<Diagnostic>,
    /// Input ended inside a string, symbol, regexp, heredoc or interpolation.
    pub in_literal: bool,
    /// Expression-boundary state after the last token.
    pub state: ExprState,
}

impl LexerSnapshot {
    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.diagnostics.first()
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Lex and parse `source` and report what happened. `locals` are the
/// variables already defined at the top level.
pub fn snapshot(
    source: &str,
    locals: &HashSet<String>,
) -> LexerSnapshot {
    let lexed = lexer::tokenize(source, locals);
    let mut diagnostics = Vec::new();
    if let Some(error) = &lexed.error {
        diagnostics.push(Diagnostic::from(error));
    } else if !lexed.in_literal {
        if let Err(error) = parser::parse_tokens(&lexed.tokens, locals) {
            diagnostics.push(Diagnostic::from(&error));
        }
    }
    trace!(
        errors = diagnostics.len(),
        in_literal = lexed.in_literal,
        state = %lexed.state,
        "parse snapshot"
    );
    LexerSnapshot {
        diagnostics,
        in_literal: lexed.in_literal,
        state: lexed.state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(source: &str) -> LexerSnapshot {
        snapshot(source, &HashSet::new())
    }

    #[test]
    fn test_complete_statement_has_no_diagnostics() {
        let s = snap("1 + 1");
        assert!(!s.has_errors());
        assert!(!s.in_literal);
        assert_eq!(s.state, ExprState::End);
    }

    #[test]
    fn test_diagnostic_kinds() {
        let kind = |src| snap(src).first_error().map(|d| d.kind);
        assert_eq!(kind("if true"), Some(DiagnosticKind::UnexpectedEof));
        assert_eq!(kind("end"), Some(DiagnosticKind::UnexpectedEnd));
        assert_eq!(kind("class /x/"), Some(DiagnosticKind::UnexpectedLiteralStart));
        assert_eq!(kind("def"), Some(DiagnosticKind::MissingMethodName));
        assert_eq!(kind("1 = 2"), Some(DiagnosticKind::Other));
        assert_eq!(kind("\"#{1 +}\""), Some(DiagnosticKind::Other));
    }

    #[test]
    fn test_open_literal_skips_parse() {
        let s = snap("puts \"abc");
        assert!(s.in_literal);
        assert!(!s.has_errors());
    }

    #[test]
    fn test_lex_error_is_other() {
        let s = snap("1 + `");
        let first = s.first_error().unwrap();
        assert_eq!(first.kind, DiagnosticKind::Other);
        assert!(first.message.contains('`'));
    }

    #[test]
    fn test_message_is_parser_text() {
        let s = snap("end");
        assert_eq!(s.first_error().unwrap().message, "syntax error, unexpected 'end'");
    }
}
