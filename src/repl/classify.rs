//! Statement completeness
//!
//! After every line the accumulated statement is parsed once and the
//! outcome is read off the [`LexerSnapshot`]: an open literal or a parse
//! that ran out of tokens means more input is needed; any other parse
//! error is final; otherwise the lexer's expression state decides.
//!
//! There is no backtracking and nothing already typed is parsed
//! differently later, so a statement only ever moves from `NeedsMore` to
//! `Ready` or `SyntaxError`.

use super::backend_trait::ReplBackend;
use crate::frontend::lexer::ExprState;
use crate::frontend::snapshot::{DiagnosticKind, LexerSnapshot};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The statement is open; show the continuation prompt.
    NeedsMore,
    /// Complete; hand it to the evaluator.
    Ready,
    /// Closed but malformed; carries the parser's first message.
    SyntaxError(String),
}

impl fmt::Display for Classification {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Classification::NeedsMore => write!(f, "needs more"),
            Classification::Ready => write!(f, "ready"),
            Classification::SyntaxError(message) => write!(f, "syntax error: {}", message),
        }
    }
}

pub fn classify(snapshot: &LexerSnapshot) -> Classification {
    if snapshot.in_literal {
        return Classification::NeedsMore;
    }
    if let Some(error) = snapshot.first_error() {
        return match error.kind {
            DiagnosticKind::UnexpectedEof => Classification::NeedsMore,
            // `end` swallowed into a bad position, a literal where a name
            // belongs and a nameless `def` are errors however the line goes on
            DiagnosticKind::UnexpectedEnd
            | DiagnosticKind::UnexpectedLiteralStart
            | DiagnosticKind::MissingMethodName
            | DiagnosticKind::Other => Classification::SyntaxError(error.message.clone()),
        };
    }
    match snapshot.state {
        ExprState::Beg
        | ExprState::Dot
        | ExprState::Class
        | ExprState::Fname
        | ExprState::Value => Classification::NeedsMore,
        ExprState::Arg => Classification::Ready,
        // Unsure: assume the line was meant to finish the statement.
        ExprState::CmdArg
        | ExprState::End
        | ExprState::EndArg
        | ExprState::EndFn
        | ExprState::Mid
        | ExprState::Terminated => Classification::Ready,
    }
}

/// Parse `source` with `backend` and classify the result.
pub fn classify_source<B: ReplBackend>(
    backend: &B,
    source: &str,
) -> Classification {
    let snapshot = backend.parse(source);
    let verdict = classify(&snapshot);
    debug!(
        state = %snapshot.state,
        in_literal = snapshot.in_literal,
        errors = snapshot.diagnostics.len(),
        verdict = %verdict,
        "classified statement"
    );
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::snapshot::{snapshot, Diagnostic};
    use crate::util::span::Span;
    use std::collections::HashSet;

    fn check(source: &str) -> Classification {
        classify(&snapshot(source, &HashSet::new()))
    }

    fn is_error(c: Classification) -> bool {
        matches!(c, Classification::SyntaxError(_))
    }

    #[test]
    fn test_single_line_statements_are_ready() {
        for source in [
            "1 + 1",
            "puts \"hi\"",
            "x = 1;",
            "[1, 2].map { |v| v * 2 }",
            "def f; 1; end",
            "class Foo; end",
            "foo.bar(1)",
            "return",
            "p",
        ] {
            assert_eq!(check(source), Classification::Ready, "{:?}", source);
        }
    }

    #[test]
    fn test_open_constructs_need_more() {
        for source in [
            "if true",
            "1 +",
            "foo(1,",
            "[1,",
            "x = {a: 1,",
            "\"a #{",
            "'abc",
            "x = <<EOS\nbody",
            "class Foo",
            "module Foo",
            "def f(a)",
            "foo.",
            "while true do",
            "[1].each do |v|",
            "begin\n  raise 'x'\nrescue",
            "x = 1 + \\",
            "a = 1 \\",
        ] {
            assert_eq!(check(source), Classification::NeedsMore, "{:?}", source);
        }
    }

    #[test]
    fn test_closing_line_makes_it_ready() {
        assert_eq!(check("if true"), Classification::NeedsMore);
        assert_eq!(check("if true\nend"), Classification::Ready);
        assert_eq!(check("x = <<EOS\nbody\nEOS"), Classification::Ready);
        assert_eq!(check("1 +\n2"), Classification::Ready);
        assert_eq!(check("module M"), Classification::NeedsMore);
        assert_eq!(check("module M\nend"), Classification::Ready);
        assert_eq!(check("a = 1 \\\n+ 2"), Classification::Ready);
    }

    #[test]
    fn test_genuine_errors() {
        assert!(is_error(check("end")));
        assert!(is_error(check("def")));
        assert!(is_error(check("class /x/")));
        assert!(is_error(check("def m(/x/)")));
        assert!(is_error(check("1 = 2")));
        assert_eq!(
            check("end"),
            Classification::SyntaxError("syntax error, unexpected 'end'".to_string())
        );
    }

    #[test]
    fn test_open_literal_wins_over_errors() {
        let s = LexerSnapshot {
            diagnostics: vec![Diagnostic {
                kind: DiagnosticKind::Other,
                message: "boom".into(),
                span: Span::default(),
            }],
            in_literal: true,
            state: ExprState::End,
        };
        assert_eq!(classify(&s), Classification::NeedsMore);
    }

    #[test]
    fn test_every_state_is_classified() {
        let verdict = |state| {
            classify(&LexerSnapshot {
                diagnostics: Vec::new(),
                in_literal: false,
                state,
            })
        };
        for state in [
            ExprState::Beg,
            ExprState::Dot,
            ExprState::Class,
            ExprState::Fname,
            ExprState::Value,
        ] {
            assert_eq!(verdict(state), Classification::NeedsMore);
        }
        for state in [
            ExprState::Arg,
            ExprState::CmdArg,
            ExprState::End,
            ExprState::EndArg,
            ExprState::EndFn,
            ExprState::Mid,
            ExprState::Terminated,
        ] {
            assert_eq!(verdict(state), Classification::Ready);
        }
    }
}
