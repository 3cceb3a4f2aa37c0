//! Parser tests module

mod basic;
mod errors;

use super::ast::*;
use super::*;

pub(crate) fn parse(source: &str) -> Result<Program, ParseError> {
    parse_source(source, &HashSet::new())
}

pub(crate) fn parse_with(
    source: &str,
    locals: &[&str],
) -> Result<Program, ParseError> {
    let locals: HashSet<String> = locals.iter().map(|s| s.to_string()).collect();
    parse_source(source, &locals)
}

/// Single statement program
pub(crate) fn stmt(source: &str) -> ExprKind {
    let program = parse(source).unwrap();
    assert_eq!(program.body.len(), 1, "expected one statement in {:?}", source);
    program.body.into_iter().next().unwrap().kind
}

pub(crate) fn call_of(kind: ExprKind) -> CallExpr {
    match kind {
        ExprKind::Call(call) => *call,
        other => panic!("expected call, got {:?}", other),
    }
}
